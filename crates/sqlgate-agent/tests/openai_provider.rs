//! `OpenAiProvider` against a local OpenAI-compatible upstream.

use std::convert::Infallible;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use futures::{StreamExt, stream};
use serde_json::{Value, json};
use sqlgate_agent::classifier::classification_schema;
use sqlgate_agent::provider::openai::{Endpoint, OpenAiProvider, ProviderConfig};
use sqlgate_agent::{ChatMessage, ModelProvider, ProviderError};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// What the upstream answers to every completion request.
#[derive(Clone)]
enum Reply {
    Completion(Value),
    /// SSE body, sent as one chunk per entry.
    Events(Vec<&'static str>),
    Status(StatusCode, &'static str),
}

#[derive(Clone)]
struct Seen {
    headers: HeaderMap,
    body: Value,
}

#[derive(Clone)]
struct UpstreamState {
    reply: Reply,
    seen: Arc<Mutex<Vec<Seen>>>,
}

struct Upstream {
    base_url: String,
    seen: Arc<Mutex<Vec<Seen>>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl Upstream {
    async fn start(reply: Reply) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new()
            .route("/v1/chat/completions", post(chat_completions))
            .with_state(UpstreamState { reply, seen: seen.clone() });

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await
                .unwrap();
        });

        Self { base_url: format!("http://{addr}/v1"), seen, shutdown_tx: Some(shutdown_tx) }
    }

    fn provider(&self) -> OpenAiProvider {
        OpenAiProvider::new(ProviderConfig {
            endpoint: Endpoint::OpenAi { base_url: self.base_url.clone() },
            api_key: "sk-local".into(),
            classifier_model: "mini".into(),
            chat_model: "full".into(),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    fn seen(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }
}

impl Drop for Upstream {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

async fn chat_completions(
    State(state): State<UpstreamState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.seen.lock().unwrap().push(Seen { headers, body });
    match state.reply {
        Reply::Completion(completion) => Json(completion).into_response(),
        Reply::Events(chunks) => {
            let body = Body::from_stream(stream::iter(chunks.into_iter().map(Ok::<_, Infallible>)));
            ([(header::CONTENT_TYPE, "text/event-stream")], body).into_response()
        }
        Reply::Status(status, text) => (status, text).into_response(),
    }
}

fn completion(content: &str) -> Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [{ "index": 0, "message": { "role": "assistant", "content": content }, "finish_reason": "stop" }]
    })
}

#[tokio::test]
async fn classify_posts_json_schema_and_parses_content() {
    let verdict = json!({ "isSqlRelated": true, "confidence": 0.8, "businessDomains": [], "reasoning": "count" });
    let upstream = Upstream::start(Reply::Completion(completion(&verdict.to_string()))).await;

    let value = upstream.provider().classify("How many orders?", &classification_schema()).await.unwrap();
    assert_eq!(value, verdict);

    let seen = upstream.seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].headers["authorization"], "Bearer sk-local");
    let body = &seen[0].body;
    assert_eq!(body["model"], "mini");
    assert_eq!(body["messages"], json!([{ "role": "user", "content": "How many orders?" }]));
    assert_eq!(body["response_format"]["type"], "json_schema");
    assert_eq!(body["response_format"]["json_schema"]["name"], "intent_classification");
    assert!(body.get("stream").is_none());
}

#[tokio::test]
async fn classify_reports_refusal() {
    let refused = json!({
        "choices": [{ "index": 0, "message": { "role": "assistant", "content": null, "refusal": "cannot help" } }]
    });
    let upstream = Upstream::start(Reply::Completion(refused)).await;

    let err = upstream.provider().classify("q", &classification_schema()).await.unwrap_err();
    assert!(matches!(err, ProviderError::Refused(ref reason) if reason == "cannot help"));
}

#[tokio::test]
async fn non_success_status_keeps_upstream_body() {
    let upstream = Upstream::start(Reply::Status(StatusCode::TOO_MANY_REQUESTS, "rate limited")).await;

    let err = upstream.provider().classify("q", &classification_schema()).await.unwrap_err();
    match err {
        ProviderError::Status { status, body } => {
            assert_eq!(status, 429);
            assert_eq!(body, "rate limited");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn stream_generate_reads_deltas_across_chunk_boundaries() {
    let upstream = Upstream::start(Reply::Events(vec![
        "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\ndata: {\"choices\":[{\"delta\":{\"content\":\"SEL",
        "ECT 1\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\";\"}}]}\n\ndata: [DONE]\n\n",
    ]))
    .await;

    let history = [
        ChatMessage::system("Answer in ANSI SQL."),
        ChatMessage::user("one row please"),
    ];
    let stream = upstream.provider().stream_generate("You write SQL.", &history).await.unwrap();
    let chunks: Vec<String> = stream.map(|chunk| chunk.unwrap()).collect().await;
    assert_eq!(chunks, vec!["SELECT 1", ";"]);

    let body = &upstream.seen()[0].body;
    assert_eq!(body["model"], "full");
    assert_eq!(body["stream"], true);
    assert!(body.get("response_format").is_none());
    assert_eq!(
        body["messages"],
        json!([
            { "role": "system", "content": "You write SQL." },
            { "role": "system", "content": "Answer in ANSI SQL." },
            { "role": "user", "content": "one row please" }
        ])
    );
}

#[tokio::test]
async fn stream_generate_fails_before_first_chunk_on_error_status() {
    let upstream = Upstream::start(Reply::Status(StatusCode::INTERNAL_SERVER_ERROR, "boom")).await;

    let result = upstream.provider().stream_generate("sys", &[ChatMessage::user("q")]).await;
    match result {
        Err(ProviderError::Status { status: 500, body }) => assert_eq!(body, "boom"),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected a status error"),
    }
}
