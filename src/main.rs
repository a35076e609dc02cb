//! WebSocket Chat Hub - Entry Point
//!
//! Parses configuration, starts the hub and runs the accept loop until
//! Ctrl-C.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use chat_hub::{Config, Server};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging with environment filter
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=chat_hub=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("chat_hub=info")),
        )
        .init();

    let config = Config::parse();

    let server = Server::bind(&config).await?;
    server.run_until_ctrl_c().await?;

    Ok(())
}
