//! Slack implementation of the chat service.
//!
//! Thread history and posting go through `slack-morphism`; file lookup and
//! private file downloads use plain `reqwest` calls authenticated with the
//! bot token.

use crate::base::{
    config::Config,
    types::{ImageAttachment, RawMessage, Res, Void},
};
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::connect::HttpConnector;
use serde::Deserialize;
use slack_morphism::{errors::SlackClientError, prelude::*};
use tracing::{debug, info, instrument, warn};

use std::sync::Arc;

use super::{ChatClient, GenericChatClient};

// Type aliases.

type FullClient = slack_morphism::SlackClient<SlackClientHyperConnector<HttpsConnector<HttpConnector>>>;

const SLACK_API_BASE: &str = "https://slack.com/api";

// Extra methods on `ChatClient` applied by the slack implementation.

impl ChatClient {
    /// Creates a new Slack chat client.
    pub async fn slack(config: &Config) -> Res<Self> {
        let client = SlackChatClient::new(config).await?;
        Ok(Self { inner: Arc::new(client) })
    }
}

impl From<SlackChatClient> for ChatClient {
    fn from(client: SlackChatClient) -> Self {
        Self { inner: Arc::new(client) }
    }
}

// Structs.

/// Slack client implementation.
#[derive(Clone)]
pub struct SlackChatClient {
    bot_token: SlackApiToken,
    bot_token_value: String,
    client: Arc<FullClient>,
    http: reqwest::Client,
    image_window: TimeDelta,
}

impl SlackChatClient {
    /// Create a new Slack chat client.
    ///
    /// Calls `auth.test` so that a bad token fails at startup rather than on the first mention.
    #[instrument(name = "SlackChatClient::new", skip_all)]
    pub async fn new(config: &Config) -> Res<Self> {
        let bot_token = SlackApiToken::new(SlackApiTokenValue(config.slack_bot_token.clone()));

        // Initialize the Slack client.

        let https_connector = HttpsConnector::<HttpConnector>::builder().with_native_roots()?.https_only().enable_all_versions().build();
        let connector = SlackClientHyperConnector::with_connector(https_connector);
        let client = Arc::new(slack_morphism::SlackClient::new(connector));

        // Verify the token.

        let session = client.open_session(&bot_token);
        let bot_user = session.auth_test().await?;

        info!("Slack bot user ID: {}", bot_user.user_id.0);

        Ok(Self {
            bot_token,
            bot_token_value: config.slack_bot_token.clone(),
            client,
            http: reqwest::Client::new(),
            image_window: TimeDelta::try_seconds(config.image_window_secs).ok_or_else(|| anyhow::anyhow!("Image window of {}s is out of range.", config.image_window_secs))?,
        })
    }

    /// Lists files the user shared in the channel between `from` and `to`.
    async fn list_files(&self, channel_id: &str, user_id: &str, from: DateTime<Utc>, to: DateTime<Utc>) -> Res<Vec<SlackFileRecord>> {
        let response = self
            .http
            .get(format!("{SLACK_API_BASE}/files.list"))
            .bearer_auth(&self.bot_token_value)
            .query(&[
                ("channel", channel_id.to_string()),
                ("user", user_id.to_string()),
                ("ts_from", from.timestamp().to_string()),
                ("ts_to", to.timestamp().to_string()),
                ("types", "images".to_string()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json::<FilesListResponse>()
            .await?;

        response.into_files()
    }

    /// Downloads a private file using the bot token.
    async fn download(&self, url: &str) -> Res<Vec<u8>> {
        let bytes = self.http.get(url).bearer_auth(&self.bot_token_value).send().await?.error_for_status()?.bytes().await?;

        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl GenericChatClient for SlackChatClient {
    #[instrument(skip(self))]
    async fn get_thread_replies(&self, channel_id: &str, thread_ts: &str) -> Res<Vec<RawMessage>> {
        let request = SlackApiConversationsRepliesRequest::new(SlackChannelId(channel_id.to_string()), SlackTs(thread_ts.to_string()));
        let session = self.client.open_session(&self.bot_token);

        let response = session.conversations_replies(&request).await;

        let response = if let Err(e) = &response
            && let SlackClientError::ApiError(ae) = e
            && ae.code == "thread_not_found"
        {
            // The message may have been deleted already; there is simply no history.
            warn!("Thread `{thread_ts}` not found in `{channel_id}`.");
            return Ok(Vec::new());
        } else {
            response?
        };

        let transcript = response
            .messages
            .into_iter()
            .map(|message| RawMessage {
                author: message.sender.user.map(|u| u.0).unwrap_or_default(),
                text: message.content.text.unwrap_or_default(),
            })
            .collect::<Vec<_>>();

        debug!("Fetched {} thread replies.", transcript.len());

        Ok(transcript)
    }

    #[instrument(skip(self))]
    async fn get_recent_image(&self, channel_id: &str, user_id: &str, message_ts: &str) -> Res<Option<ImageAttachment>> {
        let (from, to) = search_window(message_ts, self.image_window)?;
        let files = self.list_files(channel_id, user_id, from, to).await?;

        let Some(file) = files.into_iter().find(SlackFileRecord::is_image) else {
            return Ok(None);
        };

        let Some(url) = file.url_private.as_deref().or(file.url_private_download.as_deref()) else {
            warn!("Image file has no private URL.");
            return Ok(None);
        };

        let mime_type = file.mime_type().unwrap_or_default();
        let data = self.download(url).await?;

        info!("Downloaded {} byte image ({}).", data.len(), mime_type);

        Ok(Some(ImageAttachment { mime_type, data }))
    }

    #[instrument(skip(self, text))]
    async fn send_message(&self, channel_id: &str, thread_ts: &str, text: &str) -> Void {
        let message = SlackMessageContent::new().with_text(text.to_string());

        let request = SlackApiChatPostMessageRequest::new(SlackChannelId(channel_id.to_string()), message)
            .with_thread_ts(SlackTs(thread_ts.to_string()))
            .with_link_names(true);

        let session = self.client.open_session(&self.bot_token);

        let _ = session.chat_post_message(&request).await.map_err(|e| anyhow::anyhow!("Failed to send message: {}", e))?;

        Ok(())
    }
}

// Web API payloads not covered by `slack-morphism`.

/// Response of `files.list`.
#[derive(Debug, Deserialize)]
struct FilesListResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    files: Vec<SlackFileRecord>,
}

impl FilesListResponse {
    fn into_files(self) -> Res<Vec<SlackFileRecord>> {
        if !self.ok {
            return Err(anyhow::anyhow!("files.list failed: {}", self.error.as_deref().unwrap_or("unknown error")));
        }

        Ok(self.files)
    }
}

/// The subset of a Slack file object we use.
#[derive(Debug, Deserialize)]
struct SlackFileRecord {
    #[serde(default)]
    mimetype: Option<String>,
    #[serde(default)]
    filetype: Option<String>,
    #[serde(default)]
    url_private: Option<String>,
    #[serde(default)]
    url_private_download: Option<String>,
}

impl SlackFileRecord {
    fn is_image(&self) -> bool {
        self.mime_type().is_some()
    }

    /// The image MIME type, falling back to the short file type (e.g., `png`).
    fn mime_type(&self) -> Option<String> {
        if let Some(mime) = self.mimetype.as_deref().filter(|m| !m.is_empty()) {
            return mime.starts_with("image/").then(|| mime.to_string());
        }

        match self.filetype.as_deref()?.to_lowercase().as_str() {
            "jpg" | "jpeg" => Some("image/jpeg".to_string()),
            "png" => Some("image/png".to_string()),
            "gif" => Some("image/gif".to_string()),
            "webp" => Some("image/webp".to_string()),
            _ => None,
        }
    }
}

// Helpers.

/// Parses a Slack timestamp (`"1700000000.000200"`) to second precision.
fn parse_slack_ts(ts: &str) -> Res<DateTime<Utc>> {
    let seconds = ts.split('.').next().unwrap_or_default().parse::<i64>().map_err(|e| anyhow::anyhow!("Invalid Slack timestamp `{ts}`: {e}"))?;

    DateTime::<Utc>::from_timestamp(seconds, 0).ok_or_else(|| anyhow::anyhow!("Slack timestamp `{ts}` out of range"))
}

/// The `[ts - window, ts + window]` range to search for files in.
fn search_window(ts: &str, window: TimeDelta) -> Res<(DateTime<Utc>, DateTime<Utc>)> {
    let at = parse_slack_ts(ts)?;

    let from = at.checked_sub_signed(window).ok_or_else(|| anyhow::anyhow!("Search window before `{ts}` is out of range"))?;
    let to = at.checked_add_signed(window).ok_or_else(|| anyhow::anyhow!("Search window after `{ts}` is out of range"))?;

    Ok((from, to))
}

// Tests.
