//! Conversation and intent-classification types.
//!
//! The JSON shape of [`IntentClassification`] is the structured-output
//! contract with the classification model: field names are camelCase and the
//! JSON Schema handed to the provider is derived from these definitions.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString, IntoStaticStr};

use crate::error::AgentError;

// ── Conversation ─────────────────────────────────────────────────────────────

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// One entry of a conversation. Order within a conversation is significant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self { role, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }
}

// ── Intent classification ────────────────────────────────────────────────────

/// Business domain / workspace vocabulary known to the classifier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Display, AsRefStr, EnumString,
    IntoStaticStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum BusinessDomain {
    Finance,
    Sales,
    Marketing,
    Hr,
    Operations,
    Inventory,
    CustomerService,
    Analytics,
    Custom,
}

/// Whether a domain is predefined or user-defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Display, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum WorkspaceType {
    System,
    Custom,
}

/// Relevance of one business domain to the user question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BusinessDomainScore {
    /// Business domain/workspace
    pub domain: BusinessDomain,
    /// Relevance score for this domain
    #[schemars(range(min = 0.0, max = 1.0))]
    pub relevance: f64,
    /// Type of workspace - system (predefined) or custom (user-defined)
    pub workspace_type: WorkspaceType,
}

/// Structured verdict of the classification model for one chat turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IntentClassification {
    /// Whether the user question is related to SQL, databases, or data queries
    pub is_sql_related: bool,
    /// Confidence score for the classification
    #[schemars(range(min = 0.0, max = 1.0))]
    pub confidence: f64,
    /// Relevant business domains if SQL-related
    pub business_domains: Vec<BusinessDomainScore>,
    /// Brief explanation of the classification decision
    pub reasoning: String,
}

impl IntentClassification {
    /// Domains named by the classification, in the order the model gave them.
    pub fn domain_names(&self) -> Vec<&'static str> {
        self.business_domains.iter().map(|d| d.domain.into()).collect()
    }

    /// Reject scores outside `[0, 1]` (including NaN). Never clamps.
    pub fn check_bounds(&self) -> Result<(), AgentError> {
        if !in_unit_interval(self.confidence) {
            return Err(AgentError::InvalidClassification(format!(
                "confidence {} is outside [0, 1]",
                self.confidence
            )));
        }
        if let Some(bad) = self.business_domains.iter().find(|d| !in_unit_interval(d.relevance)) {
            return Err(AgentError::InvalidClassification(format!(
                "relevance {} for domain '{}' is outside [0, 1]",
                bad.relevance, bad.domain
            )));
        }
        Ok(())
    }
}

fn in_unit_interval(value: f64) -> bool {
    (0.0..=1.0).contains(&value)
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn score(domain: BusinessDomain, relevance: f64) -> BusinessDomainScore {
        BusinessDomainScore { domain, relevance, workspace_type: WorkspaceType::System }
    }

    #[test]
    fn classification_uses_camel_case_fields() {
        let value = json!({
            "isSqlRelated": true,
            "confidence": 0.9,
            "businessDomains": [
                { "domain": "customer-service", "relevance": 0.7, "workspaceType": "system" }
            ],
            "reasoning": "support ticket counts"
        });
        let parsed: IntentClassification = serde_json::from_value(value).expect("valid classification");
        assert!(parsed.is_sql_related);
        assert_eq!(parsed.business_domains[0].domain, BusinessDomain::CustomerService);
        assert_eq!(parsed.domain_names(), vec!["customer-service"]);
    }

    #[test]
    fn unknown_domain_is_rejected() {
        let value = json!({
            "isSqlRelated": true,
            "confidence": 0.9,
            "businessDomains": [{ "domain": "weather", "relevance": 0.7, "workspaceType": "system" }],
            "reasoning": ""
        });
        assert!(serde_json::from_value::<IntentClassification>(value).is_err());
    }

    #[test]
    fn bounds_accept_closed_interval() {
        let c = IntentClassification {
            is_sql_related: true,
            confidence: 1.0,
            business_domains: vec![score(BusinessDomain::Sales, 0.0), score(BusinessDomain::Hr, 1.0)],
            reasoning: String::new(),
        };
        assert!(c.check_bounds().is_ok());
    }

    #[test]
    fn bounds_reject_out_of_range_relevance() {
        let c = IntentClassification {
            is_sql_related: true,
            confidence: 0.5,
            business_domains: vec![score(BusinessDomain::Finance, 1.2)],
            reasoning: String::new(),
        };
        let err = c.check_bounds().unwrap_err();
        assert!(err.to_string().contains("finance"));
    }

    #[test]
    fn bounds_reject_nan_confidence() {
        let c = IntentClassification {
            is_sql_related: false,
            confidence: f64::NAN,
            business_domains: vec![],
            reasoning: String::new(),
        };
        assert!(c.check_bounds().is_err());
    }

    #[test]
    fn serde_and_strum_agree_on_domain_names() {
        for domain in [
            BusinessDomain::Finance,
            BusinessDomain::CustomerService,
            BusinessDomain::Hr,
            BusinessDomain::Custom,
        ] {
            let wire = serde_json::to_value(domain).unwrap();
            assert_eq!(wire, json!(<&'static str>::from(domain)));
            assert_eq!(domain.to_string().parse::<BusinessDomain>().ok(), Some(domain));
        }
    }

    #[test]
    fn roles_round_trip_lowercase() {
        let msg: ChatMessage = serde_json::from_value(json!({ "role": "assistant", "content": "hi" })).unwrap();
        assert_eq!(msg, ChatMessage::assistant("hi"));
        assert!(serde_json::from_value::<ChatMessage>(json!({ "role": "tool", "content": "x" })).is_err());
    }
}
