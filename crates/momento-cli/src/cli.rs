//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Momento - Diary journaling with AI emotion analysis
#[derive(Parser)]
#[command(name = "momento")]
#[command(about = "Self-hosted diary service with AI emotion analysis", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "momento.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for production)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set MOMENTO_DB_KEY environment variable with your passphrase.
    /// Use --no-encrypt only for development or testing.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Start the web server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Directory containing static files to serve (e.g., ui/dist)
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },

    /// Manage users and issue access tokens
    Users {
        #[command(subcommand)]
        action: Option<UsersAction>,
    },

    /// Show database and processing status
    Status,

    /// Re-process one diary now, waiting for the run to finish
    Process {
        /// Diary ID
        diary_id: i64,
    },
}

#[derive(Subcommand)]
pub enum UsersAction {
    /// List users
    List,

    /// Create a user and print an access token
    Add {
        /// Email address (unique)
        email: String,

        /// Display name (defaults to the part of the email before '@')
        #[arg(short, long)]
        nickname: Option<String>,
    },

    /// Issue a fresh access token for an existing user
    Token {
        /// Email address of the user
        email: String,
    },
}
