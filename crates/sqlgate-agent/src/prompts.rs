//! Prompt templates.
//!
//! A [`PromptSet`] is built once at startup (built-in defaults, optionally
//! overridden from a TOML file) and shared read-only by the classifier and
//! the dispatcher.

use std::path::Path;

use minijinja::{Environment, context};
use serde::{Deserialize, Serialize};

use crate::error::AgentError;

pub const CLASSIFICATION_PROMPT: &str = r#"You are an expert at classifying user questions and mapping them to business domains for SQL query assistance.

Your task is to:
1. Determine if the user's question is SQL-related (involves databases, data queries, analytics, reporting, etc.)
2. If SQL-related, identify which business domains/workspaces are most relevant
3. Classify workspaces as either "system" (predefined business areas) or "custom" (user-specific domains)

Available business domains:
- finance: Financial data, accounting, budgets, revenue, expenses
- sales: Sales performance, leads, deals, customer acquisition
- marketing: Campaigns, leads, conversion rates, marketing metrics
- hr: Employee data, payroll, performance, recruitment
- operations: Business processes, logistics, supply chain
- inventory: Stock levels, product management, warehousing
- customer-service: Support tickets, customer satisfaction, service metrics
- analytics: General data analysis, reporting, dashboards
- custom: User-specific or industry-specific domains not covered above

Guidelines:
- Mark as SQL-related if the question involves: data retrieval, database queries, reporting, analytics, data analysis, table operations
- For system workspaces: use predefined domains that clearly match the question
- For custom workspaces: when the domain is very specific to user's business or not well covered by system domains
- Provide relevance scores (0-1) for each domain
- Include confidence score for overall classification
- Be concise but clear in reasoning

Analyze this user question and classify it:"#;

/// Rendered with `domains`, the list of domain names from the classification.
pub const SQL_ASSISTANT_TEMPLATE: &str = "You are a SQL assistant. The user's question has been classified as \
SQL-related with these relevant business domains: {{ domains | join(\", \") }}. Focus your responses on these areas.";

pub const REFUSAL_SENTENCE: &str = "Sorry, I can only assist with SQL-related questions.";

pub const NON_SQL_PROMPT: &str =
    "The user's question is not SQL-related. Always reply, \"Sorry, I can only assist with SQL-related questions.\"";

/// The full set of instruction strings used by one agent.
///
/// Every field is optional in the TOML override; missing keys keep the
/// built-in text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptSet {
    /// Intent-classification instruction; the user question is appended.
    pub classification: String,
    /// minijinja template for the SQL-assistant system prompt.
    pub sql_assistant: String,
    /// System prompt used when the question is not SQL-related.
    pub non_sql: String,
    /// Sentence emitted verbatim when refusing without a model call.
    pub refusal: String,
}

impl Default for PromptSet {
    fn default() -> Self {
        Self {
            classification: CLASSIFICATION_PROMPT.to_owned(),
            sql_assistant: SQL_ASSISTANT_TEMPLATE.to_owned(),
            non_sql: NON_SQL_PROMPT.to_owned(),
            refusal: REFUSAL_SENTENCE.to_owned(),
        }
    }
}

impl PromptSet {
    /// Parse a prompt set from TOML and compile its template.
    pub fn from_toml_str(source: &str) -> Result<Self, AgentError> {
        let prompts: Self = toml::from_str(source)?;
        prompts.check()?;
        Ok(prompts)
    }

    /// Load a prompt override file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, AgentError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| AgentError::PromptFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Compile the SQL-assistant template so a broken override fails at
    /// startup instead of on the first SQL question.
    pub fn check(&self) -> Result<(), AgentError> {
        Environment::new().template_from_str(&self.sql_assistant)?;
        Ok(())
    }

    /// Classification instruction with the user question appended.
    pub fn classification_prompt(&self, user_text: &str) -> String {
        format!("{}\n\nUser Question: \"{}\"", self.classification, user_text)
    }

    /// System prompt for a SQL-related question touching `domains`.
    pub fn sql_system_prompt(&self, domains: &[&str]) -> Result<String, AgentError> {
        let env = Environment::new();
        Ok(env.render_str(&self.sql_assistant, context! { domains => domains })?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sql_prompt_joins_domains_with_commas() {
        let prompt = PromptSet::default().sql_system_prompt(&["finance", "sales"]).unwrap();
        assert_eq!(
            prompt,
            "You are a SQL assistant. The user's question has been classified as SQL-related with these \
             relevant business domains: finance, sales. Focus your responses on these areas."
        );
    }

    #[test]
    fn sql_prompt_with_no_domains_leaves_list_empty() {
        let prompt = PromptSet::default().sql_system_prompt(&[]).unwrap();
        assert!(prompt.contains("business domains: . Focus"));
    }

    #[test]
    fn non_sql_prompt_quotes_the_refusal_sentence() {
        let prompts = PromptSet::default();
        assert!(prompts.non_sql.contains(&format!("\"{}\"", prompts.refusal)));
    }

    #[test]
    fn classification_prompt_appends_quoted_question() {
        let prompt = PromptSet::default().classification_prompt("total revenue?");
        assert!(prompt.starts_with("You are an expert at classifying"));
        assert!(prompt.ends_with("classify it:\n\nUser Question: \"total revenue?\""));
    }

    #[test]
    fn toml_override_keeps_missing_keys() {
        let prompts = PromptSet::from_toml_str("refusal = \"Only SQL, sorry.\"\n").unwrap();
        assert_eq!(prompts.refusal, "Only SQL, sorry.");
        assert_eq!(prompts.classification, CLASSIFICATION_PROMPT);
        assert_eq!(prompts.sql_assistant, SQL_ASSISTANT_TEMPLATE);
    }

    #[test]
    fn broken_template_is_rejected_at_load() {
        let err = PromptSet::from_toml_str("sql_assistant = \"{{ domains | join(\"\n").unwrap_err();
        assert!(matches!(err, AgentError::PromptParse(_) | AgentError::Template(_)));

        let err = PromptSet::from_toml_str("sql_assistant = \"{% if %}\"\n").unwrap_err();
        assert!(matches!(err, AgentError::Template(_)));
    }

    #[test]
    fn missing_prompt_file_reports_path() {
        let err = PromptSet::from_toml_file("/nonexistent/sqlgate-prompts.toml").unwrap_err();
        assert!(err.to_string().contains("sqlgate-prompts.toml"));
    }
}
