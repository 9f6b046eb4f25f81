pub mod rate_limit;

use crate::backend::BackendStatsSnapshot;
use crate::cache::CacheStats;
use crate::model::{FeedbackStyle, Language, PerformanceSnapshot};
use crate::service::GenerationService;
use axum::{
    body::Body,
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use rate_limit::{client_id, RateLimiter};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

pub struct AppState {
    pub service: Arc<GenerationService>,
    pub limiter: RateLimiter,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRequest {
    pub snapshot: Option<PerformanceSnapshot>,
    pub template: Option<String>,
    pub language: Option<String>,
    pub requested_by: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheReport {
    pub cache: CacheStats,
    pub backend: String,
    pub backend_stats: BackendStatsSnapshot,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/reports/generate-feedback", post(handle_generate))
        .route("/api/reports/generate-feedback/stream", post(handle_stream))
        .route(
            "/api/reports/feedback-cache",
            axum::routing::get(handle_cache_stats).delete(handle_cache_clear),
        )
        .with_state(state)
}

fn json_error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "success": false, "error": message.into() }))).into_response()
}

struct Validated {
    snapshot: PerformanceSnapshot,
    style: FeedbackStyle,
    language: Language,
    requested_by: String,
}

// Shared front half of both generation routes: rate limit, then input checks.
fn admit(
    state: &AppState,
    headers: &HeaderMap,
    body: Result<Json<FeedbackRequest>, JsonRejection>,
) -> Result<Validated, Response> {
    let client = client_id(headers);
    if !state.limiter.check(&client) {
        warn!(client = %client, "rate limit exceeded");
        return Err(json_error(
            StatusCode::TOO_MANY_REQUESTS,
            "Rate limit exceeded. Please try again later.",
        ));
    }

    let Json(req) = body.map_err(|rejection| {
        warn!(client = %client, error = %rejection, "malformed feedback request");
        json_error(StatusCode::BAD_REQUEST, "Missing required data")
    })?;
    let snapshot = req
        .snapshot
        .ok_or_else(|| json_error(StatusCode::BAD_REQUEST, "Missing required data"))?;
    let style = match req.template.as_deref() {
        None => FeedbackStyle::default(),
        Some(raw) => raw
            .parse()
            .map_err(|_| json_error(StatusCode::BAD_REQUEST, "Invalid template"))?,
    };
    let language = match req.language.as_deref() {
        None => Language::default(),
        Some(raw) => raw
            .parse()
            .map_err(|_| json_error(StatusCode::BAD_REQUEST, "Invalid language"))?,
    };

    Ok(Validated {
        snapshot,
        style,
        language,
        requested_by: req.requested_by.unwrap_or_else(|| "Unknown User".to_string()),
    })
}

pub async fn handle_generate(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Json<FeedbackRequest>, JsonRejection>,
) -> Response {
    let req = match admit(&state, &headers, body) {
        Ok(req) => req,
        Err(resp) => return resp,
    };
    let start = Instant::now();
    info!(
        student = %req.snapshot.student.name,
        template = %req.style,
        language = %req.language,
        requested_by = %req.requested_by,
        grade_average = req.snapshot.metrics.overall.grade_average,
        "feedback requested"
    );

    let outcome = state
        .service
        .generate(&req.snapshot, req.style, req.language)
        .await;
    info!(success = outcome.success, elapsed = ?start.elapsed(), "feedback request finished");

    let status = if outcome.success {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(outcome)).into_response()
}

pub async fn handle_stream(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Json<FeedbackRequest>, JsonRejection>,
) -> Response {
    let req = match admit(&state, &headers, body) {
        Ok(req) => req,
        Err(resp) => return resp,
    };
    info!(
        student = %req.snapshot.student.name,
        template = %req.style,
        language = %req.language,
        requested_by = %req.requested_by,
        "streaming feedback requested"
    );

    match state
        .service
        .generate_stream(&req.snapshot, req.style, req.language)
        .await
    {
        Ok(stream) => (
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            Body::from_stream(stream),
        )
            .into_response(),
        Err(e) => json_error(StatusCode::INTERNAL_SERVER_ERROR, e.user_message()),
    }
}

pub async fn handle_cache_stats(State(state): State<Arc<AppState>>) -> Json<CacheReport> {
    Json(CacheReport {
        cache: state.service.cache_stats(),
        backend: state.service.backend_name().to_string(),
        backend_stats: state.service.backend_stats(),
    })
}

pub async fn handle_cache_clear(State(state): State<Arc<AppState>>) -> StatusCode {
    state.service.clear_cache();
    StatusCode::NO_CONTENT
}
