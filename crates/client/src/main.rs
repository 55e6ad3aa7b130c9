//! Rock-paper-scissors match client binary.
//!
//! # Usage
//!
//! ```bash
//! MATCH_TOKEN=... MATCH_PLAYER=alice chifoumi <match id>
//! ```
//!
//! Configuration is read from the environment (and `.env`); see
//! [`ClientConfig::from_env`](chifoumi_client::config::ClientConfig::from_env).

use anyhow::{Context, Result};
use chifoumi_client::Client;
use chifoumi_client::config::ClientConfig;
use chifoumi_client::logging;
use tokio::io::BufReader;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let config = ClientConfig::from_env();
    let _log_guard = logging::setup_logging(config.session_id.as_deref())?;

    let match_id = std::env::args()
        .nth(1)
        .context("usage: chifoumi <match id>")?;

    tracing::info!("Starting client for match {}", match_id);
    tracing::info!("Match server: {}", config.sync.api_url);

    let client = Client::builder()
        .config(config)
        .match_id(match_id)
        .build()?;

    client
        .run(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
        .await?;

    tracing::info!("Client shutdown complete");
    Ok(())
}
