//!
//! portal server binary
//! --------------------
//! Command-line entry point for the tuition portal HTTP server. Supports
//! configuration via CLI flags and environment variables.

use anyhow::Result;
use std::env;

use tuition_portal::config::{has_flag, PortalConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();

    let args: Vec<String> = env::args().collect();

    if has_flag(&args, "--help") || has_flag(&args, "-h") {
        println!("tuition portal server\n\nUSAGE:\n  portal_server [--http-port N] [--data-dir PATH] [--access-file PATH]\n\nOPTIONS:\n  --http-port N         HTTP API port (env: PORTAL_HTTP_PORT, default 8080)\n  --data-dir PATH       Balance snapshot folder (env: PORTAL_DATA_DIR; in-memory when unset)\n  --access-file PATH    JSON route policy and navigation (env: PORTAL_ACCESS_FILE)\n\nIDENTITY BACKEND:\n  PORTAL_IDENTITY_ENDPOINT, PORTAL_IDENTITY_PROJECT, PORTAL_IDENTITY_API_KEY\n");
        return Ok(());
    }

    let config = PortalConfig::from_args_and_env(&args)?;
    println!("portal starting: http={}, data_dir={:?}", config.http_port, config.data_dir);
    tracing::info!(http_port = config.http_port, data_dir = ?config.data_dir, access_file = ?config.access_file, "portal configuration");
    tuition_portal::server::run(config).await
}
