//! sqlgate-agent – intent classification and reply dispatch.
//!
//! A chat turn flows through four stages:
//! 1. [`IntentClassifier`] asks the classification model whether the latest
//!    message is SQL-related and which business domains it touches.
//! 2. [`relevant_domains`] reduces the classification to the domains above a
//!    relevance threshold.
//! 3. [`Dispatcher`] either streams a domain-scoped answer from the chat model
//!    or emits the canned refusal.
//! 4. [`SqlAgent`] wires the stages together for one request.
//!
//! All model access goes through the [`ModelProvider`] trait so any backend
//! can be substituted.

pub mod classifier;
pub mod dispatcher;
pub mod domains;
pub mod error;
pub mod orchestrator;
pub mod prompts;
pub mod provider;
pub mod types;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use classifier::IntentClassifier;
pub use dispatcher::{Branch, ChatReply, Dispatcher, RefusalMode};
pub use domains::{DEFAULT_RELEVANCE_THRESHOLD, relevant_domains};
pub use error::{AgentError, ProviderError};
pub use orchestrator::{AgentSettings, SqlAgent};
pub use prompts::PromptSet;
pub use provider::{ModelProvider, OutputSchema, TextStream};
pub use types::{BusinessDomain, BusinessDomainScore, ChatMessage, IntentClassification, Role, WorkspaceType};
