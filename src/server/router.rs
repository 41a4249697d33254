//! REST router assembly
//!
//! Resource routes are served at `/{plural}` and again under the
//! configured API prefix (`/api/{plural}` by default).

use crate::server::host::AdminHost;
use anyhow::Result;
use axum::{Json, Router, routing::get};
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;

/// Build the complete router from a host
pub fn build_router(host: &AdminHost) -> Result<Router> {
    let resources = host.entity_registry()?.build_routes();

    let mut app = health_routes().merge(resources.clone());
    if let Some(prefix) = host.config.normalized_prefix() {
        app = app.nest(&prefix, resources);
    }

    Ok(app.layer(TraceLayer::new_for_http()))
}

/// Build health check routes
fn health_routes() -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/healthz", get(health_check))
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "useradmin"
    }))
}
