pub mod openai;

use crate::base::types::{ConversationContext, ImageAttachment, Res};
use async_trait::async_trait;
use std::ops::Deref;
use std::sync::Arc;

// Traits.

/// Generic LLM client trait that clients must implement.
///
/// This trait defines the core functionality for interacting with large language models.
/// Implementing this trait allows different LLM providers to be used with the relay-bot.
#[async_trait]
pub trait GenericLlmClient: Send + Sync + 'static {
    /// Generate a reply to a threaded text conversation.
    ///
    /// The history alternates between user and assistant turns and, when
    /// non-empty, ends on an assistant turn. The new input is what the user
    /// said since the last reply.
    async fn get_chat_response(&self, context: &ConversationContext) -> Res<String>;

    /// Generate a reply to a single image plus a text prompt.
    async fn get_vision_response(&self, image: &ImageAttachment, prompt: &str) -> Res<String>;
}

// Structs.

/// LLM client for the application.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct LlmClient {
    inner: Arc<dyn GenericLlmClient>,
}

impl Deref for LlmClient {
    type Target = dyn GenericLlmClient;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl LlmClient {
    pub fn new(inner: Arc<dyn GenericLlmClient>) -> Self {
        Self { inner }
    }
}
