//! OpenAI-compatible chat-completions provider.
//!
//! Works against Azure OpenAI deployments (`api-key` header, deployment name
//! in the URL) and against plain OpenAI-style endpoints (bearer token, model
//! in the body). Classification uses `response_format: json_schema`; answers
//! are streamed over SSE.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt, future, stream};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};
use tracing::debug;

use super::sse::SseDecoder;
use super::{ModelProvider, OutputSchema, TextStream};
use crate::error::ProviderError;
use crate::types::ChatMessage;

const DONE_MARKER: &str = "[DONE]";

/// Which dialect of the chat-completions API to speak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ApiFlavor {
    Azure,
    OpenAi,
}

/// Where requests are sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// `https://{resource_name}.openai.azure.com/openai/deployments/{model}/…`
    Azure { resource_name: String, api_version: String },
    /// `{base_url}/chat/completions`, e.g. `https://api.openai.com/v1`.
    OpenAi { base_url: String },
}

impl Endpoint {
    pub fn chat_completions_url(&self, model: &str) -> String {
        match self {
            Endpoint::Azure { resource_name, api_version } => format!(
                "https://{resource_name}.openai.azure.com/openai/deployments/{model}/chat/completions?api-version={api_version}"
            ),
            Endpoint::OpenAi { base_url } => {
                format!("{}/chat/completions", base_url.trim_end_matches('/'))
            }
        }
    }
}

/// Settings for [`OpenAiProvider`].
#[derive(Clone)]
pub struct ProviderConfig {
    pub endpoint: Endpoint,
    pub api_key: String,
    /// Cheap model (or Azure deployment) used for intent classification.
    pub classifier_model: String,
    /// Model (or Azure deployment) used for the streamed answer.
    pub chat_model: String,
    /// Upper bound on a single upstream call, body included.
    pub timeout: Duration,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .field("classifier_model", &self.classifier_model)
            .field("chat_model", &self.chat_model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

pub struct OpenAiProvider {
    client: reqwest::Client,
    endpoint: Endpoint,
    api_key: String,
    classifier_model: String,
    chat_model: String,
}

impl OpenAiProvider {
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        if config.api_key.trim().is_empty() {
            return Err(ProviderError::Config("API key is empty".into()));
        }
        if config.classifier_model.is_empty() || config.chat_model.is_empty() {
            return Err(ProviderError::Config("model names must not be empty".into()));
        }
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(config.timeout)
            .build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint,
            api_key: config.api_key,
            classifier_model: config.classifier_model,
            chat_model: config.chat_model,
        })
    }

    fn post(&self, model: &str) -> reqwest::RequestBuilder {
        let builder = self.client.post(self.endpoint.chat_completions_url(model));
        match self.endpoint {
            Endpoint::Azure { .. } => builder.header("api-key", &self.api_key),
            Endpoint::OpenAi { .. } => builder.bearer_auth(&self.api_key),
        }
    }
}

#[async_trait]
impl ModelProvider for OpenAiProvider {
    async fn classify(&self, prompt: &str, schema: &OutputSchema) -> Result<Value, ProviderError> {
        let body = CompletionRequest {
            model: &self.classifier_model,
            messages: vec![WireMessage { role: "user", content: prompt }],
            response_format: Some(ResponseFormat::JsonSchema {
                json_schema: JsonSchemaFormat { name: &schema.name, schema: &schema.schema, strict: false },
            }),
            stream: false,
        };
        debug!(model = %self.classifier_model, "requesting structured classification");

        let response = self.post(&self.classifier_model).json(&body).send().await?;
        let bytes = ensure_success(response).await?.bytes().await?;
        let completion: Completion = serde_json::from_slice(&bytes)?;
        structured_content(completion)
    }

    async fn stream_generate(
        &self,
        system_prompt: &str,
        messages: &[ChatMessage],
    ) -> Result<TextStream, ProviderError> {
        let mut wire = Vec::with_capacity(messages.len() + 1);
        wire.push(WireMessage { role: "system", content: system_prompt });
        wire.extend(messages.iter().map(|m| WireMessage { role: m.role.as_ref(), content: &m.content }));

        let body = CompletionRequest { model: &self.chat_model, messages: wire, response_format: None, stream: true };
        debug!(model = %self.chat_model, history = messages.len(), "starting streamed generation");

        let response = self.post(&self.chat_model).json(&body).send().await?;
        let response = ensure_success(response).await?;
        Ok(delta_stream(response.bytes_stream()))
    }
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::Status { status: status.as_u16(), body })
}

fn structured_content(completion: Completion) -> Result<Value, ProviderError> {
    let message = completion
        .choices
        .into_iter()
        .next()
        .map(|c| c.message)
        .ok_or(ProviderError::EmptyResponse)?;
    if let Some(refusal) = message.refusal {
        return Err(ProviderError::Refused(refusal));
    }
    let content = message
        .content
        .filter(|c| !c.trim().is_empty())
        .ok_or(ProviderError::EmptyResponse)?;
    Ok(serde_json::from_str(&content)?)
}

/// Turn an SSE body of `chat.completion.chunk` events into text deltas.
///
/// Ends at `[DONE]` or at the end of the body, whichever comes first.
pub(crate) fn delta_stream<S, E>(body: S) -> TextStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Into<ProviderError> + Send + 'static,
{
    let mut decoder = SseDecoder::default();
    body.map(move |chunk| match chunk {
        Ok(bytes) => decoder.push(&bytes).into_iter().map(Ok).collect::<Vec<_>>(),
        Err(e) => vec![Err(e.into())],
    })
    .flat_map(stream::iter)
    .take_while(|event| future::ready(!matches!(event, Ok(data) if data == DONE_MARKER)))
    .filter_map(|event| {
        future::ready(match event {
            Ok(data) => parse_delta(&data).transpose(),
            Err(e) => Some(Err(e)),
        })
    })
    .boxed()
}

fn parse_delta(data: &str) -> Result<Option<String>, ProviderError> {
    let chunk: CompletionChunk = serde_json::from_str(data)?;
    if let Some(error) = chunk.error {
        return Err(ProviderError::Stream(error.to_string()));
    }
    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.delta.content)
        .filter(|text| !text.is_empty()))
}

// ── Wire types ────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat<'a>>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ResponseFormat<'a> {
    JsonSchema { json_schema: JsonSchemaFormat<'a> },
}

#[derive(Serialize)]
struct JsonSchemaFormat<'a> {
    name: &'a str,
    schema: &'a Value,
    strict: bool,
}

#[derive(Deserialize)]
struct Completion {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: AssistantMessage,
}

#[derive(Deserialize)]
struct AssistantMessage {
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

#[derive(Deserialize)]
struct CompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Deserialize, Default)]
struct Delta {
    content: Option<String>,
}

// ── Tests ──────────────────────────────────────────────────────────────────────
