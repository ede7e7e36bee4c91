//! Per-request chat pipeline: classify, filter, dispatch.

use std::sync::Arc;

use tracing::{info, warn};

use crate::classifier::IntentClassifier;
use crate::dispatcher::{ChatReply, Dispatcher, RefusalMode};
use crate::domains::{DEFAULT_RELEVANCE_THRESHOLD, relevant_domains};
use crate::error::AgentError;
use crate::prompts::PromptSet;
use crate::provider::ModelProvider;
use crate::types::ChatMessage;

/// Runtime knobs of the agent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgentSettings {
    pub relevance_threshold: f64,
    pub refusal_mode: RefusalMode,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self { relevance_threshold: DEFAULT_RELEVANCE_THRESHOLD, refusal_mode: RefusalMode::default() }
    }
}

/// Stateless chat agent; one instance serves every request.
pub struct SqlAgent {
    classifier: IntentClassifier,
    dispatcher: Dispatcher,
    settings: AgentSettings,
}

impl SqlAgent {
    pub fn new(
        provider: Arc<dyn ModelProvider>,
        prompts: Arc<PromptSet>,
        settings: AgentSettings,
    ) -> Result<Self, AgentError> {
        prompts.check()?;
        let classifier = IntentClassifier::new(provider.clone(), prompts.clone())?;
        let dispatcher = Dispatcher::new(provider, prompts, settings.refusal_mode);
        Ok(Self { classifier, dispatcher, settings })
    }

    /// Handle one chat turn. Only the last message is classified; the whole
    /// history is forwarded to the chat model.
    pub async fn process_chat(&self, messages: &[ChatMessage]) -> Result<ChatReply, AgentError> {
        let user_text = messages.last().map(|m| m.content.as_str()).unwrap_or_default();

        let classification = self.classifier.classify(user_text).await.inspect_err(|e| {
            warn!(error = %e, "intent classification failed");
        })?;
        info!(
            is_sql_related = classification.is_sql_related,
            confidence = classification.confidence,
            domains = ?classification.domain_names(),
            reasoning = %classification.reasoning,
            "intent classified"
        );

        let relevant = if classification.is_sql_related {
            let relevant = relevant_domains(&classification, self.settings.relevance_threshold);
            info!(
                threshold = self.settings.relevance_threshold,
                relevant_domains = ?relevant,
                "relevant domains selected"
            );
            relevant
        } else {
            Vec::new()
        };

        let mut reply = self.dispatcher.dispatch(&classification, messages).await?;
        reply.relevant_domains = relevant;
        info!(branch = %reply.branch, "reply dispatched");
        Ok(reply)
    }
}
