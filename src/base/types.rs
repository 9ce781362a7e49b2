use serde::{Deserialize, Serialize};

pub type Err = anyhow::Error;
pub type Res<T> = Result<T, Err>;
pub type Void = Res<()>;

// Webhook wire types.

/// The Events API envelope as posted by Slack.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventEnvelope {
    /// Verification string (only on `url_verification`).
    #[serde(default)]
    pub challenge: Option<String>,
    /// Envelope kind (e.g., `url_verification`, `event_callback`).
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    /// The inner event record.
    #[serde(default)]
    pub event: Option<EnvelopeEvent>,
    /// Installations this event is delivered to; the first one identifies the bot.
    #[serde(default)]
    pub authorizations: Vec<Authorization>,
}

/// The inner event record of an [`EventEnvelope`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EnvelopeEvent {
    pub text: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub ts: String,
    pub thread_ts: String,
    pub event_ts: String,
    pub channel: String,
    pub user: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Authorization {
    #[serde(default)]
    pub user_id: String,
}

/// Body echoed back for `url_verification` pings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChallengeResponse {
    pub challenge: String,
}

// Classification.

/// Errors raised while classifying an inbound webhook.
///
/// These are reported synchronously to the caller, before any work is spawned.
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
    #[error("event not found")]
    MissingEvent,
}

/// A validated `app_mention` that must be answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionableMention {
    pub channel_id: String,
    /// Thread root, or the message itself when it is not in a thread.
    pub thread_anchor_ts: String,
    /// Timestamp the reply is anchored to.
    pub event_ts: String,
    pub requester_id: String,
    /// Event text with the bot's own mention marker removed.
    pub mention_text: String,
    pub bot_id: String,
}

// Conversation.

/// One transcript entry as returned by the chat platform.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawMessage {
    pub author: String,
    pub text: String,
}

impl RawMessage {
    pub fn new(author: impl Into<String>, text: impl Into<String>) -> Self {
        Self { author: author.into(), text: text.into() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One role-attributed, merged unit of context handed to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self { role, text: text.into() }
    }
}

/// Output of the context builder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationContext {
    /// Settled history, oldest first; never ends on a user turn.
    pub history: Vec<Turn>,
    /// Everything the user said since the last assistant reply.
    pub new_input_text: String,
}

/// An image the requester shared alongside the mention.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageAttachment {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl std::fmt::Debug for ImageAttachment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageAttachment").field("mime_type", &self.mime_type).field("bytes", &self.data.len()).finish()
    }
}
