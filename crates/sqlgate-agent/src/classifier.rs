//! Intent classifier.
//!
//! Sends the classification prompt to the provider with the JSON Schema of
//! [`IntentClassification`] and refuses anything that does not conform.
//! There is no retry and no fallback classification.

use std::sync::Arc;

use jsonschema::Validator;
use serde_json::Value;
use tracing::debug;

use crate::error::AgentError;
use crate::prompts::PromptSet;
use crate::provider::{ModelProvider, OutputSchema};
use crate::types::IntentClassification;

pub const SCHEMA_NAME: &str = "intent_classification";

pub struct IntentClassifier {
    provider: Arc<dyn ModelProvider>,
    prompts: Arc<PromptSet>,
    schema: OutputSchema,
    validator: Validator,
}

impl IntentClassifier {
    pub fn new(provider: Arc<dyn ModelProvider>, prompts: Arc<PromptSet>) -> Result<Self, AgentError> {
        let schema = classification_schema();
        let validator = jsonschema::validator_for(&schema.schema)
            .map_err(|e| AgentError::InvalidClassification(format!("intent schema does not compile: {e}")))?;
        Ok(Self { provider, prompts, schema, validator })
    }

    /// Classify one user utterance. Empty text is classified like any other.
    pub async fn classify(&self, user_text: &str) -> Result<IntentClassification, AgentError> {
        let prompt = self.prompts.classification_prompt(user_text);
        debug!(prompt_len = prompt.len(), "classifying intent");
        let raw = self.provider.classify(&prompt, &self.schema).await?;
        self.validate(raw)
    }

    /// Schema check, typed decode, then bounds check.
    fn validate(&self, raw: Value) -> Result<IntentClassification, AgentError> {
        let violations: Vec<String> = self.validator.iter_errors(&raw).map(|e| e.to_string()).collect();
        if !violations.is_empty() {
            return Err(AgentError::InvalidClassification(violations.join("; ")));
        }
        let classification: IntentClassification =
            serde_json::from_value(raw).map_err(|e| AgentError::InvalidClassification(e.to_string()))?;
        classification.check_bounds()?;
        Ok(classification)
    }
}

/// JSON Schema of [`IntentClassification`], derived from the Rust type.
pub fn classification_schema() -> OutputSchema {
    let mut schema = schemars::schema_for!(IntentClassification).to_value();
    if let Some(object) = schema.as_object_mut() {
        // Providers reject the meta-schema keyword inside `response_format`.
        object.remove("$schema");
    }
    OutputSchema { name: SCHEMA_NAME.to_owned(), schema }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedProvider, classification_json};
    use crate::types::BusinessDomain;
    use serde_json::json;

    fn classifier(provider: ScriptedProvider) -> (IntentClassifier, Arc<ScriptedProvider>) {
        let provider = Arc::new(provider);
        let classifier = IntentClassifier::new(provider.clone(), Arc::new(PromptSet::default())).unwrap();
        (classifier, provider)
    }

    #[test]
    fn schema_lists_every_field_and_domain() {
        let schema = classification_schema().schema;
        let text = schema.to_string();
        for field in ["isSqlRelated", "confidence", "businessDomains", "reasoning", "workspaceType"] {
            assert!(text.contains(field), "schema is missing {field}");
        }
        for domain in ["finance", "customer-service", "custom"] {
            assert!(text.contains(&format!("\"{domain}\"")), "schema is missing {domain}");
        }
        assert!(schema.get("$schema").is_none());
    }

    #[tokio::test]
    async fn valid_classification_is_returned_typed() {
        let (classifier, provider) =
            classifier(ScriptedProvider::classifying(classification_json(true, &[("sales", 0.8), ("finance", 0.3)])));
        let c = classifier.classify("Show me total revenue by region last quarter").await.unwrap();
        assert!(c.is_sql_related);
        assert_eq!(c.business_domains[0].domain, BusinessDomain::Sales);
        assert_eq!(provider.classify_calls(), 1);
        assert!(provider.classify_prompts()[0].ends_with("User Question: \"Show me total revenue by region last quarter\""));
    }

    #[tokio::test]
    async fn empty_text_is_still_classified() {
        let (classifier, provider) = classifier(ScriptedProvider::classifying(classification_json(false, &[])));
        let c = classifier.classify("").await.unwrap();
        assert!(!c.is_sql_related);
        assert!(provider.classify_prompts()[0].ends_with("User Question: \"\""));
    }

    #[tokio::test]
    async fn out_of_range_confidence_is_rejected_not_clamped() {
        let mut raw = classification_json(true, &[("sales", 0.8)]);
        raw["confidence"] = json!(1.5);
        let (classifier, _) = classifier(ScriptedProvider::classifying(raw));
        let err = classifier.classify("q").await.unwrap_err();
        assert!(matches!(err, AgentError::InvalidClassification(_)));
    }

    #[tokio::test]
    async fn negative_relevance_is_rejected() {
        let (classifier, _) = classifier(ScriptedProvider::classifying(classification_json(true, &[("hr", -0.1)])));
        assert!(matches!(classifier.classify("q").await, Err(AgentError::InvalidClassification(_))));
    }

    #[tokio::test]
    async fn missing_field_is_rejected() {
        let (classifier, _) = classifier(ScriptedProvider::classifying(json!({
            "isSqlRelated": true,
            "confidence": 0.9,
            "businessDomains": []
        })));
        let err = classifier.classify("q").await.unwrap_err();
        assert!(err.to_string().contains("reasoning"));
    }

    #[tokio::test]
    async fn provider_failure_propagates_without_retry() {
        let (classifier, provider) = classifier(ScriptedProvider::failing_classification("upstream 503"));
        let err = classifier.classify("q").await.unwrap_err();
        assert!(matches!(err, AgentError::Provider(_)));
        assert_eq!(provider.classify_calls(), 1);
    }
}
