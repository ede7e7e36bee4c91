//! sqlgate-server – entry point.
//!
//! Startup order:
//! 1. Parse configuration from environment variables.
//! 2. Initialise structured tracing (stdout, optionally a rolling file).
//! 3. Load prompts and build the model provider and agent.
//! 4. Build the Axum router and start the HTTP server with graceful shutdown.

mod config;
mod data_stream;
mod error;
mod middleware;
mod routes;
mod schemas;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use sqlgate_agent::provider::openai::OpenAiProvider;
use sqlgate_agent::{PromptSet, SqlAgent};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::Config;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Configuration ───────────────────────────────────────────────────────
    let cfg = Config::from_env();

    // ── 2. Tracing ─────────────────────────────────────────────────────────────
    let _log_guard = init_tracing(&cfg)?;
    info!(version = env!("CARGO_PKG_VERSION"), "sqlgate-server starting");

    // ── 3. Prompts, provider, agent ────────────────────────────────────────────
    let prompts = match &cfg.prompts_file {
        Some(path) => {
            let prompts = PromptSet::from_toml_file(path)?;
            info!(path = %path.display(), "prompt overrides loaded");
            prompts
        }
        None => PromptSet::default(),
    };

    let provider_config = cfg.provider_config()?;
    info!(
        provider = %cfg.provider,
        classifier_model = %provider_config.classifier_model,
        chat_model = %provider_config.chat_model,
        "model provider configured"
    );
    let provider = OpenAiProvider::new(provider_config).context("failed to build model provider")?;

    let settings = cfg.agent_settings()?;
    let agent = SqlAgent::new(Arc::new(provider), Arc::new(prompts), settings)?;
    info!(
        relevance_threshold = settings.relevance_threshold,
        refusal_mode = %settings.refusal_mode,
        "agent ready"
    );

    let state = Arc::new(AppState { config: Arc::new(cfg.clone()), agent: Arc::new(agent) });

    // ── 4. HTTP server with graceful shutdown ──────────────────────────────────
    let app = routes::build(Arc::clone(&state));
    let addr: SocketAddr = cfg
        .bind_address
        .parse()
        .with_context(|| format!("SQLGATE_BIND='{}' is not a socket address", cfg.bind_address))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "HTTP server listening");

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    info!("sqlgate-server stopped");
    Ok(())
}

/// Install the global subscriber. The returned guard flushes the file sink
/// and must live until shutdown.
fn init_tracing(cfg: &Config) -> anyhow::Result<Option<WorkerGuard>> {
    // RUST_LOG wins over SQLGATE_LOG; an invalid filter falls back to `info`.
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => match cfg.log_level.parse::<EnvFilter>() {
            Ok(f) => f,
            Err(e) => {
                eprintln!(
                    "WARN: SQLGATE_LOG='{}' is not a valid tracing filter ({}); falling back to 'info'",
                    cfg.log_level, e
                );
                EnvFilter::new("info")
            }
        },
    };

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(true).with_thread_ids(true);
    let stdout_layer = if cfg.log_json { stdout_layer.json().boxed() } else { stdout_layer.boxed() };

    let mut guard = None;
    let file_layer = match &cfg.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create log directory {}", dir.display()))?;
            let appender = RollingFileAppender::new(Rotation::DAILY, dir, "sqlgate-server.log");
            let (writer, worker_guard) = tracing_appender::non_blocking(appender);
            guard = Some(worker_guard);
            let layer = tracing_subscriber::fmt::layer().with_ansi(false).with_writer(writer);
            Some(if cfg.log_json { layer.json().boxed() } else { layer.boxed() })
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .context("failed to install tracing subscriber")?;
    Ok(guard)
}

/// Returns a future that resolves when SIGINT (Ctrl-C) or SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install CTRL+C signal handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => warn!(error = %e, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown signal received; starting graceful shutdown");
}
