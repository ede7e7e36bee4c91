//! Response dispatcher.
//!
//! Picks the system prompt for a classified turn and produces the reply
//! stream: either a domain-scoped generation from the chat model or the
//! refusal sentence.

use std::fmt;
use std::sync::Arc;

use futures::{StreamExt, future, stream};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::{debug, warn};

use crate::error::AgentError;
use crate::prompts::PromptSet;
use crate::provider::{ModelProvider, TextStream};
use crate::types::{BusinessDomain, ChatMessage, IntentClassification};

/// How a non-SQL question is answered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum RefusalMode {
    /// Emit the refusal sentence without calling a model.
    #[default]
    Static,
    /// Ask the chat model to refuse, using the non-SQL system prompt.
    Model,
}

/// Which path produced a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Branch {
    Sql,
    Refusal,
}

/// Outcome of one chat turn.
pub struct ChatReply {
    pub branch: Branch,
    /// Domains above the relevance threshold. Empty on the refusal branch.
    pub relevant_domains: Vec<BusinessDomain>,
    pub stream: TextStream,
}

impl fmt::Debug for ChatReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatReply")
            .field("branch", &self.branch)
            .field("relevant_domains", &self.relevant_domains)
            .finish_non_exhaustive()
    }
}

pub struct Dispatcher {
    provider: Arc<dyn ModelProvider>,
    prompts: Arc<PromptSet>,
    refusal_mode: RefusalMode,
}

impl Dispatcher {
    pub fn new(provider: Arc<dyn ModelProvider>, prompts: Arc<PromptSet>, refusal_mode: RefusalMode) -> Self {
        Self { provider, prompts, refusal_mode }
    }

    /// System prompt for a classified turn. SQL prompts name every domain
    /// the classifier returned, not only the relevant ones.
    pub fn system_prompt(&self, classification: &IntentClassification) -> Result<String, AgentError> {
        if classification.is_sql_related {
            self.prompts.sql_system_prompt(&classification.domain_names())
        } else {
            Ok(self.prompts.non_sql.clone())
        }
    }

    /// Produce the reply stream. Makes at most one generative call.
    ///
    /// A generation that fails to start is reported inside the stream, the
    /// same way as a failure after the first fragment. Only prompt rendering
    /// errors are returned as `Err`.
    pub async fn dispatch(
        &self,
        classification: &IntentClassification,
        messages: &[ChatMessage],
    ) -> Result<ChatReply, AgentError> {
        let branch = if classification.is_sql_related { Branch::Sql } else { Branch::Refusal };

        if branch == Branch::Refusal && self.refusal_mode == RefusalMode::Static {
            debug!("emitting static refusal");
            let refusal = self.prompts.refusal.clone();
            return Ok(ChatReply {
                branch,
                relevant_domains: Vec::new(),
                stream: stream::once(future::ready(Ok(refusal))).boxed(),
            });
        }

        let system_prompt = self.system_prompt(classification)?;
        debug!(%branch, history = messages.len(), "starting generation");
        let stream = match self.provider.stream_generate(&system_prompt, messages).await {
            Ok(stream) => stream,
            Err(e) => {
                warn!(error = %e, %branch, "generation failed to start");
                stream::once(future::ready(Err(e))).boxed()
            }
        };
        Ok(ChatReply { branch, relevant_domains: Vec::new(), stream })
    }
}
