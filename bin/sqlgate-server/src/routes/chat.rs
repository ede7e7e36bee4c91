//! `POST /api/chat`: classify the latest message and stream the reply.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderName, HeaderValue, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use tokio::time::Instant;
use tracing::info;

use crate::data_stream::{self, STREAM_HEADER, STREAM_VERSION};
use crate::error::ServerError;
use crate::schemas::chat::ChatRequest;
use crate::state::AppState;

#[cfg(feature = "swagger")]
#[derive(utoipa::OpenApi)]
#[openapi(
    paths(chat),
    components(schemas(ChatRequest, crate::schemas::chat::ChatMessageBody, crate::schemas::chat::MessageRole))
)]
pub struct ChatApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/api/chat", post(chat))
}

/// Answer a chat turn.
///
/// SQL-related questions stream an answer scoped to the detected business
/// domains; anything else receives the refusal sentence. Both arrive in the
/// data-stream format.
#[cfg_attr(feature = "swagger", utoipa::path(
    post,
    path = "/api/chat",
    tag = "chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Data-stream reply", content_type = "text/plain", body = String),
        (status = 400, description = "Malformed request or failed classification"),
        (status = 504, description = "The reply did not start before the deadline")
    )
))]
pub async fn chat(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Response, ServerError> {
    let Json(request) = payload?;
    let messages = request.into_messages();
    info!(messages = messages.len(), "chat request received");

    let deadline = Instant::now() + state.config.max_duration;
    let reply = tokio::time::timeout_at(deadline, state.agent.process_chat(&messages))
        .await
        .map_err(|_| ServerError::Timeout)??;

    let body = Body::from_stream(data_stream::encode(reply.stream, reply.branch, deadline));
    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(data_stream::CONTENT_TYPE)),
            (HeaderName::from_static(STREAM_HEADER), HeaderValue::from_static(STREAM_VERSION)),
        ],
        body,
    )
        .into_response())
}
