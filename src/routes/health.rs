//! Health routes

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
struct RootResponse {
    ok: bool,
    msg: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    ocr_engine: &'static str,
    ocr_engine_available: bool,
}

/// Create the health router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
}

/// GET /
async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        ok: true,
        msg: "OCR backend running",
    })
}

/// GET /health
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let engine = state.pipeline().recognizer().engine();

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        ocr_engine: engine.name(),
        ocr_engine_available: engine.is_available().await,
    })
}
