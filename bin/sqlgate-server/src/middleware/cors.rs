use axum::http::{HeaderName, HeaderValue};
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::data_stream::STREAM_HEADER;
use crate::middleware::trace::X_TRACE_ID;

pub fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .as_deref()
        .map(|list| list.split(',').filter_map(|s| s.trim().parse().ok()).collect())
        .unwrap_or_default();

    let layer = if origins.is_empty() {
        // Wildcard; set SQLGATE_CORS_ORIGINS in production.
        CorsLayer::new().allow_origin(Any)
    } else {
        CorsLayer::new().allow_origin(origins)
    };

    // Browsers hide non-safelisted response headers unless exposed.
    layer
        .allow_headers(Any)
        .allow_methods(Any)
        .expose_headers([HeaderName::from_static(X_TRACE_ID), HeaderName::from_static(STREAM_HEADER)])
}
