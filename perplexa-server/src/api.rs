//! HTTP endpoints

use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, State, rejection::BytesRejection},
    response::IntoResponse,
    routing::{get, post},
};
use perplexa_engine::{Assessment, Label, PerplexityScorer};
use serde::Serialize;
use serde_json::Value;
use tower_http::cors::{Any, CorsLayer};

use crate::error::ApiError;
use crate::state::AppState;

/// Path of the scoring endpoint
pub const SCORE_PATH: &str = "/api/score";

/// Successful scoring response
#[derive(Debug, Serialize)]
pub struct ScoreResponse {
    pub score: f64,
    pub label: Label,
}

impl From<Assessment> for ScoreResponse {
    fn from(assessment: Assessment) -> Self {
        Self {
            score: assessment.score,
            label: assessment.label,
        }
    }
}

/// Build the application router.
pub fn router(state: AppState, body_limit_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(SCORE_PATH, post(score_handler))
        .route("/health", get(health_handler))
        .layer(DefaultBodyLimit::max(body_limit_bytes))
        .layer(cors)
        .with_state(state)
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "perplexa-server",
        "model_loaded": state.model.is_loaded(),
        "model": state.model.loaded_model_name(),
    }))
}

/// Pull a usable `text` field out of a parsed request body.
///
/// A body that is not a JSON object has no `text` field.
fn extract_text(body: &Value, min_chars: usize) -> Result<&str, ApiError> {
    match body.get("text").and_then(Value::as_str) {
        Some(text) if !text.is_empty() && text.trim().chars().count() >= min_chars => Ok(text),
        _ => Err(ApiError::InvalidText { min_chars }),
    }
}

/// The body is read as raw bytes so malformed JSON (or a missing
/// `Content-Type`) gets the `Invalid JSON` response rather than axum's rejection.
/// A body that cannot be buffered (over the size limit) keeps axum's status
/// but is reported in the JSON error shape.
async fn score_handler(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<ScoreResponse>, ApiError> {
    tracing::info!("Received request for AI score");

    let body = body?;
    let body: Value = serde_json::from_slice(&body).map_err(|e| {
        tracing::debug!("JSON parse error: {}", e);
        ApiError::InvalidJson
    })?;
    tracing::debug!("Request JSON parsed successfully");

    let text = extract_text(&body, state.scoring.min_text_chars)?.to_owned();

    let model = state.model.get().await.map_err(ApiError::internal)?;
    let scorer = PerplexityScorer::with_stride(model, state.scoring.stride);

    let assessment = tokio::task::spawn_blocking(move || scorer.assess(&text))
        .await
        .map_err(ApiError::internal)?
        .map_err(ApiError::internal)?;

    Ok(Json(assessment.into()))
}
