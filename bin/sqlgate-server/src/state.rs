//! Shared application state injected into every Axum handler.

use std::fmt;
use std::sync::Arc;

use sqlgate_agent::SqlAgent;

use crate::config::Config;

/// State shared across all HTTP handlers. Everything in it is read-only.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration (env-derived).
    pub config: Arc<Config>,
    /// Classify-then-dispatch pipeline.
    pub agent: Arc<SqlAgent>,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState").field("config", &self.config).finish_non_exhaustive()
    }
}
