//! HTTP handlers for scoring, health and metrics

use super::AppState;
use crate::error::{ScoringError, ScoringResult};
use crate::metrics::MetricsSnapshot;
use crate::service::ScoringService;
use crate::types::{Assessment, ModelKind, ScoreResult};
use axum::{body::Bytes, extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct RootResponse {
    message: &'static str,
    status: &'static str,
    model_loaded: bool,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    model_loaded: bool,
    model_type: ModelKind,
    model_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    fallback_reason: Option<String>,
    loaded_at: DateTime<Utc>,
}

pub async fn root(State(state): State<AppState>) -> Json<RootResponse> {
    Json(RootResponse {
        message: "Fraud Scoring API",
        status: "healthy",
        model_loaded: state.service.health().loaded,
    })
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = state.service.health();
    Json(HealthResponse {
        status: "healthy",
        model_loaded: status.loaded,
        model_type: status.active,
        model_path: status.source_path.clone(),
        fallback_reason: status.fallback_reason.clone(),
        loaded_at: status.loaded_at,
    })
}

pub async fn score(
    State(state): State<AppState>,
    body: Bytes,
) -> ScoringResult<Json<ScoreResult>> {
    let result = run_blocking(state.service, move |service| service.score_payload(&body)).await?;
    Ok(Json(result))
}

pub async fn assess(
    State(state): State<AppState>,
    body: Bytes,
) -> ScoringResult<Json<Assessment>> {
    let result = run_blocking(state.service, move |service| service.assess_payload(&body)).await?;
    Ok(Json(result))
}

pub async fn metrics(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.service.metrics().snapshot())
}

/// Run CPU-bound scoring off the async workers, tagged with a request id
async fn run_blocking<T, F>(service: Arc<ScoringService>, f: F) -> ScoringResult<T>
where
    T: Send + 'static,
    F: FnOnce(&ScoringService) -> ScoringResult<T> + Send + 'static,
{
    let span = tracing::info_span!("score_request", request_id = %Uuid::new_v4());

    tokio::task::spawn_blocking(move || {
        let _entered = span.enter();
        f(&service)
    })
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "Scoring task failed");
        ScoringError::Inference(format!("scoring task failed: {}", e))
    })?
}
