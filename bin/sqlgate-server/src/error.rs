//! Unified server error type.
//!
//! Handlers return `Result<T, ServerError>`; [`IntoResponse`] turns the
//! error into a JSON body with the matching status code.
//!
//! Agent failures are logged with full detail, but clients
//! only ever see a generic message.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use sqlgate_agent::AgentError;
use thiserror::Error;
use tracing::error;

/// Error code reported for any failure while processing a chat turn.
pub const CHAT_ERROR_CODE: &str = "bad_request:chat";

/// Message returned for chat failures; the detail stays in the logs.
pub const CHAT_ERROR_MESSAGE: &str = "The request couldn't be processed. Please check your input and try again.";

#[derive(Debug, Error)]
pub enum ServerError {
    /// The request body is malformed. No model was called.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Classification failed or the reply prompt could not be rendered.
    #[error("chat error: {0}")]
    Chat(#[from] AgentError),

    /// The request deadline passed before the reply started streaming.
    #[error("request timed out")]
    Timeout,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            // Client-facing: expose the message directly.
            ServerError::BadRequest(m) => (StatusCode::BAD_REQUEST, json!({ "error": m })),
            ServerError::Chat(e) => {
                error!(error = %e, "chat request failed");
                (StatusCode::BAD_REQUEST, json!({ "error": CHAT_ERROR_CODE, "message": CHAT_ERROR_MESSAGE }))
            }
            ServerError::Timeout => {
                error!("chat request exceeded its deadline");
                (StatusCode::GATEWAY_TIMEOUT, json!({ "error": "request timed out" }))
            }
        };
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ServerError {
    fn from(rejection: JsonRejection) -> Self {
        ServerError::BadRequest(rejection.body_text())
    }
}
