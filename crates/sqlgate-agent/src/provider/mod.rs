//! Model provider seam.
//!
//! [`ModelProvider`] is the only way the agent reaches a language model. The
//! default implementation is [`openai::OpenAiProvider`], which speaks the
//! OpenAI chat-completions protocol against Azure OpenAI or any compatible
//! endpoint. Tests substitute a scripted provider.

pub mod openai;
pub mod sse;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::Value;

use crate::error::ProviderError;
use crate::types::ChatMessage;

/// Lazy, finite, non-restartable sequence of generated text fragments.
///
/// Dropping the stream cancels the underlying generation.
pub type TextStream = BoxStream<'static, Result<String, ProviderError>>;

/// A named JSON Schema for structured-output generation.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSchema {
    pub name: String,
    pub schema: Value,
}

#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Run the classification model on `prompt`, constraining the answer to
    /// `schema`. Returns the raw JSON object; validation is the caller's job.
    async fn classify(&self, prompt: &str, schema: &OutputSchema) -> Result<Value, ProviderError>;

    /// Start a streamed answer from the chat model. `system_prompt` is sent
    /// ahead of `messages`.
    async fn stream_generate(
        &self,
        system_prompt: &str,
        messages: &[ChatMessage],
    ) -> Result<TextStream, ProviderError>;
}
