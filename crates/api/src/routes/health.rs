//! Health check endpoint.

use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use herald_queue::store::ListStore;

use crate::state::AppState;

pub fn router<S>() -> Router<AppState<S>>
where
    S: ListStore + Clone + 'static,
{
    Router::new().route("/health", get(health_check))
}

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": "board-herald-api",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
