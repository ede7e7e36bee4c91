use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while talking to a model provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The HTTP request failed (network error, timeout, broken body stream).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-2xx status.
    #[error("provider returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// The provider response could not be decoded.
    #[error("failed to decode provider response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The provider reported an error inside an otherwise healthy stream.
    #[error("provider stream error: {0}")]
    Stream(String),

    /// The model declined to produce the structured output.
    #[error("model refused the request: {0}")]
    Refused(String),

    /// The provider returned a completion without any content.
    #[error("provider returned an empty completion")]
    EmptyResponse,

    /// The provider could not be constructed from the given settings.
    #[error("provider misconfigured: {0}")]
    Config(String),
}

/// Errors that can occur while processing one chat turn.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Propagated from the model provider.
    #[error("model provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The classification did not conform to the intent schema.
    #[error("classification rejected: {0}")]
    InvalidClassification(String),

    /// A prompt template failed to compile or render.
    #[error("prompt template error: {0}")]
    Template(#[from] minijinja::Error),

    /// The prompt override file could not be read.
    #[error("failed to read prompt file {}: {source}", path.display())]
    PromptFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The prompt override file is not valid TOML for a prompt set.
    #[error("invalid prompt file: {0}")]
    PromptParse(#[from] toml::de::Error),
}
