//! Data-stream wire encoding for chat replies.
//!
//! Every part is one line, `<code>:<json>\n`:
//! - `0:` a text fragment (JSON string),
//! - `3:` an error message (JSON string),
//! - `d:` the finish part, sent once after a clean end.
//!
//! When generation fails or the deadline passes mid-stream, an error part is
//! written and the body then ends with an error, so the client sees an
//! aborted response instead of a hang.

use bytes::Bytes;
use futures::StreamExt;
use futures::stream::{self, BoxStream};
use serde_json::json;
use sqlgate_agent::{Branch, TextStream};
use thiserror::Error;
use tokio::time::Instant;
use tracing::{Instrument, Span, debug, error, info, warn};

pub const STREAM_HEADER: &str = "x-vercel-ai-data-stream";
pub const STREAM_VERSION: &str = "v1";
pub const CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Client-facing text of the error part.
pub const GENERATION_FAILED: &str = "An error occurred while generating the response.";

#[derive(Debug, Error)]
#[error("reply stream aborted: {0}")]
pub struct StreamAborted(String);

pub fn text_part(text: &str) -> Bytes {
    Bytes::from(format!("0:{}\n", json!(text)))
}

pub fn error_part(message: &str) -> Bytes {
    Bytes::from(format!("3:{}\n", json!(message)))
}

pub fn finish_part() -> Bytes {
    Bytes::from(format!("d:{}\n", json!({ "finishReason": "stop" })))
}

enum Phase {
    Streaming,
    Abort(String),
    Done,
}

/// Logs replies whose body was dropped before the last part went out.
struct DisconnectGuard {
    branch: Branch,
    fragments: usize,
    finished: bool,
    span: Span,
}

impl Drop for DisconnectGuard {
    fn drop(&mut self) {
        let _entered = self.span.enter();
        if self.finished {
            debug!(branch = %self.branch, fragments = self.fragments, "reply stream closed");
        } else {
            info!(
                branch = %self.branch,
                fragments = self.fragments,
                "client went away before the reply finished; generation cancelled"
            );
        }
    }
}

struct Encoder {
    stream: TextStream,
    deadline: Instant,
    phase: Phase,
    guard: DisconnectGuard,
}

/// Frame `stream` as a data-stream body, aborting at `deadline`.
///
/// Nothing is spawned: the body polls the upstream stream directly, so
/// dropping the body cancels the generation.
pub fn encode(stream: TextStream, branch: Branch, deadline: Instant) -> BoxStream<'static, Result<Bytes, StreamAborted>> {
    let span = Span::current();
    let encoder = Encoder {
        stream,
        deadline,
        phase: Phase::Streaming,
        guard: DisconnectGuard { branch, fragments: 0, finished: false, span },
    };
    stream::unfold(encoder, |encoder| {
        let span = encoder.guard.span.clone();
        next_part(encoder).instrument(span)
    })
    .boxed()
}

async fn next_part(mut enc: Encoder) -> Option<(Result<Bytes, StreamAborted>, Encoder)> {
    match std::mem::replace(&mut enc.phase, Phase::Done) {
        Phase::Done => None,
        Phase::Abort(reason) => Some((Err(StreamAborted(reason)), enc)),
        Phase::Streaming => loop {
            match tokio::time::timeout_at(enc.deadline, enc.stream.next()).await {
                Err(_) => {
                    warn!(fragments = enc.guard.fragments, "reply deadline passed mid-stream");
                    enc.guard.finished = true;
                    enc.phase = Phase::Abort("deadline exceeded".to_owned());
                    return Some((Ok(error_part(GENERATION_FAILED)), enc));
                }
                Ok(Some(Ok(text))) if text.is_empty() => continue,
                Ok(Some(Ok(text))) => {
                    enc.guard.fragments += 1;
                    enc.phase = Phase::Streaming;
                    return Some((Ok(text_part(&text)), enc));
                }
                Ok(Some(Err(e))) => {
                    error!(error = %e, fragments = enc.guard.fragments, "generation failed mid-stream");
                    enc.guard.finished = true;
                    enc.phase = Phase::Abort(e.to_string());
                    return Some((Ok(error_part(GENERATION_FAILED)), enc));
                }
                Ok(None) => {
                    enc.guard.finished = true;
                    return Some((Ok(finish_part()), enc));
                }
            }
        },
    }
}
