//! Scripted [`ModelProvider`] for tests.
//!
//! Answers classification requests with a fixed JSON value and generation
//! requests with a fixed list of fragments. Every call is recorded, and the
//! provider notices when a generated stream is dropped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::{self, BoxStream};
use serde_json::{Value, json};

use crate::error::ProviderError;
use crate::provider::{ModelProvider, OutputSchema, TextStream};
use crate::types::ChatMessage;

/// One recorded `stream_generate` call.
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    pub system_prompt: String,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug)]
pub struct ScriptedProvider {
    classification: Result<Value, String>,
    classify_delay: Option<Duration>,
    chunks: Vec<Result<String, String>>,
    generation_error: Option<String>,
    hang: bool,
    classify_prompts: Mutex<Vec<String>>,
    generations: Mutex<Vec<Generation>>,
    stream_dropped: Arc<AtomicBool>,
}

impl ScriptedProvider {
    fn new(classification: Result<Value, String>) -> Self {
        Self {
            classification,
            classify_delay: None,
            chunks: Vec::new(),
            generation_error: None,
            hang: false,
            classify_prompts: Mutex::new(Vec::new()),
            generations: Mutex::new(Vec::new()),
            stream_dropped: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Classifies every prompt as `value`; generations yield nothing.
    pub fn classifying(value: Value) -> Self {
        Self::new(Ok(value))
    }

    /// Every classification fails with a 503.
    pub fn failing_classification(message: &str) -> Self {
        Self::new(Err(message.to_owned()))
    }

    /// SQL-related with no domains; generations yield `chunks`.
    pub fn streaming(chunks: &[&str]) -> Self {
        Self::classifying(classification_json(true, &[])).with_chunks(chunks)
    }

    pub fn with_chunks(mut self, chunks: &[&str]) -> Self {
        self.chunks = chunks.iter().map(|c| Ok((*c).to_owned())).collect();
        self
    }

    /// Append a mid-stream provider error after the scripted chunks.
    pub fn with_stream_error(mut self, message: &str) -> Self {
        self.chunks.push(Err(message.to_owned()));
        self
    }

    /// `stream_generate` fails before any stream is returned.
    pub fn fail_generation(mut self, message: &str) -> Self {
        self.generation_error = Some(message.to_owned());
        self
    }

    /// Generated streams never end after the scripted chunks.
    pub fn hanging(mut self) -> Self {
        self.hang = true;
        self
    }

    /// Classification waits `delay` before answering.
    pub fn with_classify_delay(mut self, delay: Duration) -> Self {
        self.classify_delay = Some(delay);
        self
    }

    pub fn classify_calls(&self) -> usize {
        self.classify_prompts().len()
    }

    pub fn classify_prompts(&self) -> Vec<String> {
        self.classify_prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn generations(&self) -> Vec<Generation> {
        self.generations.lock().map(|g| g.clone()).unwrap_or_default()
    }

    /// True once a stream returned by `stream_generate` has been dropped.
    pub fn stream_dropped(&self) -> bool {
        self.stream_dropped.load(Ordering::SeqCst)
    }
}

struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl ModelProvider for ScriptedProvider {
    async fn classify(&self, prompt: &str, _schema: &OutputSchema) -> Result<Value, ProviderError> {
        if let Ok(mut prompts) = self.classify_prompts.lock() {
            prompts.push(prompt.to_owned());
        }
        if let Some(delay) = self.classify_delay {
            tokio::time::sleep(delay).await;
        }
        self.classification
            .clone()
            .map_err(|body| ProviderError::Status { status: 503, body })
    }

    async fn stream_generate(
        &self,
        system_prompt: &str,
        messages: &[ChatMessage],
    ) -> Result<TextStream, ProviderError> {
        if let Ok(mut generations) = self.generations.lock() {
            generations.push(Generation {
                system_prompt: system_prompt.to_owned(),
                messages: messages.to_vec(),
            });
        }
        if let Some(body) = &self.generation_error {
            return Err(ProviderError::Status { status: 500, body: body.clone() });
        }

        let items: Vec<Result<String, ProviderError>> = self
            .chunks
            .iter()
            .map(|c| c.clone().map_err(ProviderError::Stream))
            .collect();
        let tail: BoxStream<'static, Result<String, ProviderError>> =
            if self.hang { stream::pending().boxed() } else { stream::empty().boxed() };

        let guard = DropFlag(self.stream_dropped.clone());
        Ok(stream::iter(items)
            .chain(tail)
            .map(move |item| {
                let _alive = &guard;
                item
            })
            .boxed())
    }
}

/// Build a classification object in the wire shape. Every domain is a
/// `system` workspace.
pub fn classification_json(is_sql_related: bool, domains: &[(&str, f64)]) -> Value {
    let business_domains: Vec<Value> = domains
        .iter()
        .map(|(domain, relevance)| json!({ "domain": domain, "relevance": relevance, "workspaceType": "system" }))
        .collect();
    json!({
        "isSqlRelated": is_sql_related,
        "confidence": 0.9,
        "businessDomains": business_domains,
        "reasoning": if is_sql_related { "asks for data from a database" } else { "not about data" },
    })
}
