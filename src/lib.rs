//! Library root for `relay-bot`.
//!
//! Relay-bot is an OpenAI-powered assistant for Slack designed to:
//! - Answer whenever it is @-mentioned in a channel or thread
//! - Carry the thread's earlier messages as conversation history
//! - Route messages with an attached image to a vision-capable model
//!
//! Slack delivers events over the Events API (HTTP webhooks). Each mention is
//! acknowledged immediately and answered on its own task. The architecture is
//! built around traits that allow different chat and LLM implementations.

pub mod base;
pub mod interaction;
pub mod runtime;
pub mod server;
pub mod service;

use base::{config::Config, types::Void};
use rustls::crypto;
use tracing::info;

/// Public async entry for the binary crate.
///
/// Sets up necessary services and starts the relay-bot runtime:
/// - Initializes the crypto provider
/// - Creates the runtime context with the LLM and chat clients
/// - Serves the Slack events endpoint
pub async fn start(config: Config) -> Void {
    info!("Starting relay-bot ...");

    // Start the crypto provider.
    crypto::ring::default_provider().install_default().map_err(|_| anyhow::anyhow!("Failed to install the rustls crypto provider."))?;

    // Initialize the runtime.
    let runtime = runtime::Runtime::new(config).await?;

    // Start the runtime.
    runtime.start().await?;

    Ok(())
}
