use axum::{response::IntoResponse, routing::get, Json, Router};
use serde_json::json;

use crate::AppState;

pub fn create_router(app_state: AppState) -> Router {
    Router::new().route("/", get(index)).with_state(app_state)
}

async fn index() -> impl IntoResponse {
    Json(json!({ "status": "ok", "service": "garita-server" }))
}
