//! OpenAI implementation of the LLM service.
//!
//! Text conversations map the rebuilt thread onto chat-completion messages;
//! image prompts send a single user message carrying a text part and the
//! image as a base64 data URL.

use std::sync::Arc;

use crate::base::{
    config::Config,
    types::{ConversationContext, ImageAttachment, Res, Role as TurnRole},
};
use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage, ChatCompletionRequestMessageContentPartImageArgs, ChatCompletionRequestMessageContentPartTextArgs,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs, ChatCompletionRequestUserMessageContentPart, CreateChatCompletionRequest,
        CreateChatCompletionRequestArgs, CreateChatCompletionResponse, ImageDetail, ImageUrlArgs,
    },
};
use async_trait::async_trait;
use base64::Engine as _;
use tokio::time::timeout;
use tracing::{info, instrument};

use super::{GenericLlmClient, LlmClient};

// Extra methods on `LlmClient` applied by the openai implementation.

impl LlmClient {
    pub fn openai(config: &Config) -> Self {
        let client = OpenAiLlmClient::new(config);
        Self { inner: Arc::new(client) }
    }
}

// Specific implementations.

/// OpenAI LLM client implementation.
#[derive(Clone)]
pub struct OpenAiLlmClient {
    client: Client<OpenAIConfig>,
    config: Config,
}

impl OpenAiLlmClient {
    /// Create a new OpenAI LLM client.
    #[instrument(name = "OpenAiLlmClient::new", skip_all)]
    pub fn new(config: &Config) -> Self {
        let cfg = OpenAIConfig::new().with_api_key(config.openai_api_key.clone());

        Self {
            client: Client::with_config(cfg),
            config: config.clone(),
        }
    }

    /// Build a request for `model`, applying the shared sampling settings.
    fn build_request(&self, model: &str, messages: Vec<ChatCompletionRequestMessage>) -> Res<CreateChatCompletionRequest> {
        let mut request = CreateChatCompletionRequestArgs::default();

        request.model(model).max_completion_tokens(self.config.openai_max_tokens).messages(messages);

        // Add the temperature for the non-reasoning models.
        if model.starts_with("gpt") {
            request.temperature(self.config.openai_temperature);
        }

        Ok(request.build()?)
    }

    /// Make a single OpenAI API call bounded by the configured timeout.
    async fn call_openai_api(&self, request: CreateChatCompletionRequest) -> Res<CreateChatCompletionResponse> {
        let limit = self.config.openai_timeout();

        match timeout(limit, self.client.chat().create(request)).await {
            Ok(Ok(response)) => {
                if let Some(usage) = &response.usage {
                    info!("OpenAI usage: prompt={}, completion={}, total={}", usage.prompt_tokens, usage.completion_tokens, usage.total_tokens);
                }

                Ok(response)
            }
            Ok(Err(err)) => Err(anyhow::anyhow!("OpenAI API call failed: {err}")),
            Err(_) => Err(anyhow::anyhow!("OpenAI API call timed out after {}s", limit.as_secs())),
        }
    }
}

#[async_trait]
impl GenericLlmClient for OpenAiLlmClient {
    #[instrument(name = "OpenAiLlmClient::get_chat_response", skip_all)]
    async fn get_chat_response(&self, context: &ConversationContext) -> Res<String> {
        let messages = build_chat_messages(&self.config.system_directive, context)?;

        info!("Sending {} history turns to `{}`.", context.history.len(), self.config.openai_chat_model);

        let request = self.build_request(&self.config.openai_chat_model, messages)?;
        let response = self.call_openai_api(request).await?;

        parse_openai_response(&response)
    }

    #[instrument(name = "OpenAiLlmClient::get_vision_response", skip_all)]
    async fn get_vision_response(&self, image: &ImageAttachment, prompt: &str) -> Res<String> {
        let messages = build_vision_messages(&self.config.system_directive, image, prompt)?;

        info!("Sending {image:?} to `{}`.", self.config.openai_vision_model);

        let request = self.build_request(&self.config.openai_vision_model, messages)?;
        let response = self.call_openai_api(request).await?;

        parse_openai_response(&response)
    }
}

/// Build the chat messages for a text conversation.
pub fn build_chat_messages(system_directive: &str, context: &ConversationContext) -> Res<Vec<ChatCompletionRequestMessage>> {
    let mut messages = Vec::with_capacity(context.history.len() + 2);

    messages.push(ChatCompletionRequestSystemMessageArgs::default().content(system_directive.to_string()).build()?.into());

    for turn in &context.history {
        let message = match turn.role {
            TurnRole::User => ChatCompletionRequestUserMessageArgs::default().content(turn.text.clone()).build()?.into(),
            TurnRole::Assistant => ChatCompletionRequestAssistantMessageArgs::default().content(turn.text.clone()).build()?.into(),
        };

        messages.push(message);
    }

    messages.push(ChatCompletionRequestUserMessageArgs::default().content(context.new_input_text.clone()).build()?.into());

    Ok(messages)
}

/// Build the chat messages for an image prompt.
pub fn build_vision_messages(system_directive: &str, image: &ImageAttachment, prompt: &str) -> Res<Vec<ChatCompletionRequestMessage>> {
    let parts: Vec<ChatCompletionRequestUserMessageContentPart> = vec![
        ChatCompletionRequestMessageContentPartTextArgs::default().text(prompt.to_string()).build()?.into(),
        ChatCompletionRequestMessageContentPartImageArgs::default()
            .image_url(ImageUrlArgs::default().url(image_data_url(image)).detail(ImageDetail::Auto).build()?)
            .build()?
            .into(),
    ];

    Ok(vec![
        ChatCompletionRequestSystemMessageArgs::default().content(system_directive.to_string()).build()?.into(),
        ChatCompletionRequestUserMessageArgs::default().content(parts).build()?.into(),
    ])
}

/// Encode an image as a `data:` URL.
pub fn image_data_url(image: &ImageAttachment) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(&image.data);

    format!("data:{};base64,{encoded}", image.mime_type)
}

/// Extract the reply text from a chat completion.
#[instrument(skip_all)]
pub fn parse_openai_response(response: &CreateChatCompletionResponse) -> Res<String> {
    let choice = response.choices.first().ok_or_else(|| anyhow::anyhow!("OpenAI response has no choices."))?;

    if let Some(reason) = &choice.message.refusal {
        return Err(anyhow::anyhow!("Request refused: {reason}"));
    }

    match choice.message.content.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => Ok(text.to_string()),
        _ => Err(anyhow::anyhow!("OpenAI response has no content.")),
    }
}

// Tests.
