//! Finwise CLI - Personal finance backend
//!
//! Usage:
//!   finwise init                  Initialize database
//!   finwise create-user ...       Create a user account
//!   finwise train categorizer     Train the transaction categorizer
//!   finwise serve --port 8000     Start web server

mod cli;
mod commands;


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
        Commands::Serve { port, host } => {
            commands::cmd_serve(&cli.db, &host, port, cli.no_encrypt).await
        }
        Commands::CreateUser {
            username,
            email,
            password,
            phone,
            income,
            admin,
        } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_create_user(
                &db,
                &username,
                &email,
                &password,
                phone.as_deref(),
                income,
                admin,
            )
        }
        Commands::Train { task, models_dir } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_train(&db, &task, models_dir.as_deref())
        }
        Commands::Status => commands::cmd_status(&cli.db, cli.no_encrypt),
    }
}
