//! Axum router construction.
//!
//! [`build`] assembles the complete application router:
//! - middleware layers (CORS, per-request trace id)
//! - optional Swagger UI / OpenAPI document (`SQLGATE_ENABLE_SWAGGER=false` disables it)
//! - `/health`
//! - `/api/chat`

pub mod chat;
#[cfg(feature = "swagger")]
pub mod doc;
mod health;

use std::sync::Arc;

use axum::{Router, middleware};

use crate::middleware::{cors, trace};
use crate::state::AppState;

/// Build the complete Axum [`Router`] for the application.
pub fn build(state: Arc<AppState>) -> Router {
    let app = Router::new().merge(health::router()).merge(chat::router());

    mount_swagger(app, state.config.enable_swagger)
        // Outermost layers execute first on the way in.
        .layer(cors::cors_layer(&state.config))
        .layer(middleware::from_fn(trace::trace_middleware))
        .with_state(state)
}

#[cfg(feature = "swagger")]
fn mount_swagger(app: Router<Arc<AppState>>, enabled: bool) -> Router<Arc<AppState>> {
    use utoipa_swagger_ui::SwaggerUi;

    if !enabled {
        return app;
    }
    app.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", doc::get_docs()))
}

#[cfg(not(feature = "swagger"))]
fn mount_swagger(app: Router<Arc<AppState>>, _enabled: bool) -> Router<Arc<AppState>> {
    app
}
