use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::database::DocumentStore;
use crate::resources;

/// GET / - service description (public)
pub async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");
    let endpoints: Vec<String> = resources::ALL
        .iter()
        .map(|schema| format!("/v1/{}[/:id] (protected)", schema.kind))
        .collect();

    Json(json!({
        "success": true,
        "data": {
            "name": "Budget planner",
            "description": "We think ahead",
            "version": version,
            "endpoints": endpoints,
        }
    }))
}

/// GET /health - store connectivity (public)
pub async fn health(State(store): State<Arc<dyn DocumentStore>>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "database unavailable",
                    "data": {
                        "status": "degraded",
                        "timestamp": now,
                    }
                })),
            )
        }
    }
}
