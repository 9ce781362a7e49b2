//! Event handling and user interactions for relay-bot.
//!
//! This module turns inbound Slack events into replies:
//! - Classifying webhook payloads (verification, ignorable, actionable)
//! - Rebuilding the conversation context from a thread transcript
//! - Running the out-of-band mention pipeline (context, model, reply)

pub mod app_mention;
pub mod classifier;
pub mod context;
