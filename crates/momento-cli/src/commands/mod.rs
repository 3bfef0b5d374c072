//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Core commands (init) and shared utilities (open_db, load_config)
//! - `process` - One-off synchronous processing of a diary
//! - `serve` - Web server command
//! - `status` - Database and processing status
//! - `users` - User management and access tokens

pub mod core;
pub mod process;
pub mod serve;
pub mod status;
pub mod users;

// Re-export command functions for main.rs
pub use core::*;
pub use process::*;
pub use serve::*;
pub use status::*;
pub use users::*;
