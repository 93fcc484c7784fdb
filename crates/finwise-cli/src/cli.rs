//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI
//! arguments. The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Finwise - Personal finance backend
#[derive(Parser)]
#[command(name = "finwise")]
#[command(about = "Self-hosted personal finance backend", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "finwise.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for production)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set FINWISE_DB_KEY environment variable with your passphrase.
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
        #[arg(short, long, default_value = "8000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// Create a user account
    CreateUser {
        /// Username
        #[arg(short, long)]
        username: String,

        /// Email address
        #[arg(short, long)]
        email: String,

        /// Password (min 8 characters)
        #[arg(short, long)]
        password: String,

        /// Phone number
        #[arg(long)]
        phone: Option<String>,

        /// Monthly income
        #[arg(long)]
        income: Option<rust_decimal::Decimal>,

        /// Grant the admin role
        #[arg(long)]
        admin: bool,
    },

    /// Train model artifacts from stored transactions
    Train {
        #[command(subcommand)]
        task: TrainTask,

        /// Directory holding model artifacts
        ///
        /// Defaults to FINWISE_MODELS_DIR, falling back to "models".
        #[arg(long, global = true)]
        models_dir: Option<PathBuf>,
    },

    /// Show database status (encryption, size, counts)
    Status,
}

#[derive(Subcommand)]
pub enum TrainTask {
    /// Train the transaction categorizer from the labelled sample CSV
    Categorizer,

    /// Train per-category spending forecasters, pooled across users
    Spending,

    /// Train per-user monthly expense forecasters plus the global fallback
    Insights,

    /// Run all training jobs
    All,
}
