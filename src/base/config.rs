//! Load configuration via `config` crate with env-override support.

use std::{ops::Deref, sync::Arc, time::Duration};

use serde::Deserialize;

use crate::base::prompts;

use super::types::{Res, Void};

/// Default OpenAI model for threaded text conversations.
fn default_openai_chat_model() -> String {
    "gpt-4.1-mini".to_string()
}

/// Default OpenAI model used when the user attached an image.
fn default_openai_vision_model() -> String {
    "gpt-4.1".to_string()
}

/// Default sampling temperature for OpenAI models.
fn default_openai_temperature() -> f32 {
    0.7
}

/// Default max output tokens for OpenAI model
fn default_openai_max_tokens() -> u32 {
    4096
}

fn default_openai_timeout_secs() -> u64 {
    120
}

/// Default system directive for the assistant.
fn default_system_directive() -> String {
    prompts::ASSISTANT_SYSTEM_DIRECTIVE.to_string()
}

fn default_listen_address() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_events_path() -> String {
    "/".to_string()
}

/// Overall deadline for answering a single mention.
fn default_pipeline_timeout_secs() -> u64 {
    180
}

/// How far around the mention to look for an attached image.
fn default_image_window_secs() -> i64 {
    60
}

/// Upper bound for `image_window_secs` (one day).
const MAX_IMAGE_WINDOW_SECS: i64 = 86_400;

/// Configuration for the relay-bot application.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub inner: Arc<ConfigInner>,
}

impl Deref for Config {
    type Target = ConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ConfigInner {
    /// OpenAI API key (`OPENAI_API_KEY`).
    pub openai_api_key: String,
    /// OpenAI model for text conversations (`OPENAI_CHAT_MODEL`).
    #[serde(default = "default_openai_chat_model")]
    pub openai_chat_model: String,
    /// OpenAI model for image + text prompts (`OPENAI_VISION_MODEL`).
    #[serde(default = "default_openai_vision_model")]
    pub openai_vision_model: String,
    /// Sampling temperature (`OPENAI_TEMPERATURE`).
    /// Value between 0 and 2. Only sent to `gpt` models; reasoning models reject it.
    #[serde(default = "default_openai_temperature")]
    pub openai_temperature: f32,
    /// Max output tokens for OpenAI model (`OPENAI_MAX_TOKENS`).
    #[serde(default = "default_openai_max_tokens")]
    pub openai_max_tokens: u32,
    /// Per-call timeout for the OpenAI API, in seconds (`OPENAI_TIMEOUT_SECS`).
    #[serde(default = "default_openai_timeout_secs")]
    pub openai_timeout_secs: u64,
    /// Optional custom system directive to override the default (`SYSTEM_DIRECTIVE`).
    #[serde(default = "default_system_directive")]
    pub system_directive: String,
    /// Slack bot token (`SLACK_BOT_TOKEN`).
    pub slack_bot_token: String,
    /// Socket address the webhook server binds to (`LISTEN_ADDRESS`).
    #[serde(default = "default_listen_address")]
    pub listen_address: String,
    /// Path Slack posts events to (`EVENTS_PATH`).
    #[serde(default = "default_events_path")]
    pub events_path: String,
    /// Deadline for fetching context, calling the model and replying (`PIPELINE_TIMEOUT_SECS`).
    #[serde(default = "default_pipeline_timeout_secs")]
    pub pipeline_timeout_secs: u64,
    /// Seconds on either side of the mention to search for images (`IMAGE_WINDOW_SECS`).
    #[serde(default = "default_image_window_secs")]
    pub image_window_secs: i64,
}

impl ConfigInner {
    pub fn pipeline_timeout(&self) -> Duration {
        Duration::from_secs(self.pipeline_timeout_secs)
    }

    pub fn openai_timeout(&self) -> Duration {
        Duration::from_secs(self.openai_timeout_secs)
    }

    /// Reject values that would only fail later, per request.
    pub fn validate(&self) -> Void {
        if self.openai_api_key.trim().is_empty() {
            return Err(anyhow::anyhow!("OpenAI API key must be set."));
        }

        if self.slack_bot_token.trim().is_empty() {
            return Err(anyhow::anyhow!("Slack bot token must be set."));
        }

        if self.openai_temperature < 0.0 || self.openai_temperature > 2.0 {
            return Err(anyhow::anyhow!("OpenAI temperature must be between 0 and 2."));
        }

        if self.openai_max_tokens < 1 || self.openai_max_tokens > 128000 {
            return Err(anyhow::anyhow!("OpenAI max tokens must be between 1 and 128000."));
        }

        if self.pipeline_timeout_secs == 0 {
            return Err(anyhow::anyhow!("Pipeline timeout must be greater than 0."));
        }

        if !(0..=MAX_IMAGE_WINDOW_SECS).contains(&self.image_window_secs) {
            return Err(anyhow::anyhow!("Image window must be between 0 and {} seconds.", MAX_IMAGE_WINDOW_SECS));
        }

        if !self.events_path.starts_with('/') {
            return Err(anyhow::anyhow!("Events path must start with `/`."));
        }

        Ok(())
    }
}

impl Config {
    pub fn load(explicit_path: Option<&std::path::Path>) -> Res<Self> {
        let mut cfg = config::Config::builder().add_source(config::Environment::default().prefix("RELAY_BOT"));

        if let Some(p) = explicit_path {
            cfg = cfg.add_source(config::File::from(p.to_path_buf()));
        } else if std::path::Path::new(".hidden/config.toml").exists() {
            cfg = cfg.add_source(config::File::with_name(".hidden/config.toml"));
        }

        let result = Config {
            inner: Arc::new(cfg.build()?.try_deserialize()?),
        };

        result.validate()?;

        Ok(result)
    }
}

impl From<ConfigInner> for Config {
    fn from(inner: ConfigInner) -> Self {
        Self { inner: Arc::new(inner) }
    }
}

// Tests.
