pub mod slack;

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;

use crate::base::types::{ImageAttachment, RawMessage, Res, Void};

// Traits.

/// Generic "chat" trait that clients must implement.
///
/// This trait defines the few calls the relay needs from a chat platform
/// like Slack. Implementing this trait allows different chat services to be used
/// with the relay-bot.
#[async_trait]
pub trait GenericChatClient: Send + Sync + 'static {
    /// Get the replies of a thread, oldest first.
    ///
    /// The thread root (or the lone message, for a top-level mention) is part
    /// of the result, and the triggering message is its last entry.
    async fn get_thread_replies(&self, channel_id: &str, thread_ts: &str) -> Res<Vec<RawMessage>>;

    /// Find an image the user shared in the channel around `message_ts`.
    async fn get_recent_image(&self, channel_id: &str, user_id: &str, message_ts: &str) -> Res<Option<ImageAttachment>>;

    /// Send a message to a channel thread.
    async fn send_message(&self, channel_id: &str, thread_ts: &str, text: &str) -> Void;
}

// Structs.

/// Chat client for the application.
///
/// It is designed to be trivially cloneable, allowing it to be passed around
/// without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct ChatClient {
    inner: Arc<dyn GenericChatClient>,
}

impl Deref for ChatClient {
    type Target = dyn GenericChatClient;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl ChatClient {
    pub fn new(inner: Arc<dyn GenericChatClient>) -> Self {
        Self { inner }
    }
}
