//! services/api/src/adapters/chat_llm.rs
//!
//! This module contains the adapter for the persona chat LLM.
//! It implements the `ModelService` port from the `core` crate.
//!
//! Conversation requests go through Chat Completions; single-shot prompts go
//! through the Responses API. Either way the raw reply is handed back as JSON
//! for the core to interpret.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::{
        chat::{
            ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
            ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
            CreateChatCompletionRequestArgs,
        },
        responses::CreateResponseArgs,
    },
    Client,
};
use async_trait::async_trait;
use emotionverse_core::domain::{Message, Role};
use emotionverse_core::ports::{ModelRequest, ModelResponse, ModelService, PortError, PortResult};
use tracing::debug;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `ModelService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiChatAdapter {
    client: Client<OpenAIConfig>,
    chat_model: String,
    single_shot_model: String,
}

impl OpenAiChatAdapter {
    /// Creates a new `OpenAiChatAdapter`.
    pub fn new(client: Client<OpenAIConfig>, chat_model: String, single_shot_model: String) -> Self {
        Self {
            client,
            chat_model,
            single_shot_model,
        }
    }

    async fn chat(&self, system_prompt: &str, messages: &[Message]) -> PortResult<ModelResponse> {
        let mut request_messages: Vec<ChatCompletionRequestMessage> =
            Vec::with_capacity(messages.len() + 1);
        request_messages.push(
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system_prompt)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        );

        for message in messages {
            let request_message: ChatCompletionRequestMessage = match message.role {
                Role::User => ChatCompletionRequestUserMessageArgs::default()
                    .content(message.content.as_str())
                    .build()
                    .map_err(|e| PortError::Unexpected(e.to_string()))?
                    .into(),
                Role::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
                    .content(message.content.as_str())
                    .build()
                    .map_err(|e| PortError::Unexpected(e.to_string()))?
                    .into(),
            };
            request_messages.push(request_message);
        }

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.chat_model)
            .messages(request_messages)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        // Call the API and manually map the error if it occurs, which respects the orphan rule.
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        let body = serde_json::to_value(&response)
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(ModelResponse { body })
    }

    async fn single_shot(&self, prompt: &str) -> PortResult<ModelResponse> {
        let request = CreateResponseArgs::default()
            .model(&self.single_shot_model)
            .input(prompt.to_string())
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let response = self
            .client
            .responses()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        let body = serde_json::to_value(&response)
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(ModelResponse { body })
    }
}

//=========================================================================================
// `ModelService` Trait Implementation
//=========================================================================================

#[async_trait]
impl ModelService for OpenAiChatAdapter {
    async fn complete(&self, request: &ModelRequest) -> PortResult<ModelResponse> {
        match request {
            ModelRequest::Conversation {
                system_prompt,
                messages,
            } => {
                debug!("Chat completion with {} messages", messages.len());
                self.chat(system_prompt, messages).await
            }
            ModelRequest::SingleShot { prompt } => {
                debug!("Single-shot response request");
                self.single_shot(prompt).await
            }
        }
    }
}
