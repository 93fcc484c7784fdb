//! Server command implementation

use std::path::Path;

use anyhow::Result;
use finwise_server::ServerConfig;

use super::open_db;

pub async fn cmd_serve(db_path: &Path, host: &str, port: u16, no_encrypt: bool) -> Result<()> {
    println!("🚀 Starting Finwise web server...");
    println!("   Database: {}", db_path.display());
    println!("   Listening: http://{}:{}", host, port);

    let config = ServerConfig::from_env()?;
    println!("   Models: {}", config.models_dir.display());
    if config.allowed_origins.is_empty() {
        println!("   CORS: same-origin only");
    } else {
        println!("   CORS: {}", config.allowed_origins.join(", "));
    }

    let db = open_db(db_path, no_encrypt)?;
    finwise_server::serve(db, host, port, config).await
}
