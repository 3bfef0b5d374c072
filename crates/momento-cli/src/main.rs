//! Momento CLI - Diary journaling with AI emotion analysis
//!
//! Usage:
//!   momento init                         Initialize database
//!   momento users add me@example.com     Create a user and print a token
//!   momento serve --port 3000            Start web server
//!   momento process 42                   Re-process one diary

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db, cli.no_encrypt),
        Commands::Serve {
            port,
            host,
            static_dir,
        } => {
            commands::cmd_serve(&cli.db, &host, port, cli.no_encrypt, static_dir.as_deref()).await
        }
        Commands::Users { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                None | Some(UsersAction::List) => commands::cmd_users_list(&db),
                Some(UsersAction::Add { email, nickname }) => {
                    let config = commands::load_config()?;
                    commands::cmd_users_add(
                        &db,
                        config.require_auth()?,
                        &email,
                        nickname.as_deref(),
                    )
                }
                Some(UsersAction::Token { email }) => {
                    let config = commands::load_config()?;
                    commands::cmd_users_token(&db, config.require_auth()?, &email)
                }
            }
        }
        Commands::Status => commands::cmd_status(&cli.db, cli.no_encrypt),
        Commands::Process { diary_id } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let config = commands::load_config()?;
            commands::cmd_process(&db, &config, diary_id).await
        }
    }
}
