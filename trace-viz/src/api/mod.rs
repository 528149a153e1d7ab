//! HTTP API for the trace visualizer
//!
//! Producers POST events to `/events`; viewers follow the same stream on
//! `GET /events` and read aggregated views from `/api/*`. Every handler goes
//! through the session actor, so a read never races an in-flight apply.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::json;
use std::sync::Arc;

pub mod events;
pub mod stats;
pub mod traces;
pub mod views;

use crate::actors::SessionError;
use crate::app_state::AppState;
use crate::sse::DecodeError;

#[derive(Clone)]
pub struct ApiState {
    pub app_state: Arc<AppState>,
}

/// Configure all API routes
pub fn router() -> Router<ApiState> {
    Router::new()
        .route("/health", get(health_check))
        // Event stream
        .route(
            "/events",
            get(events::stream_events).post(events::ingest_event),
        )
        // Trace tree
        .route("/api/traces", get(traces::list_roots))
        .route("/api/traces/{id}", get(traces::get_trace))
        .route("/api/traces/{id}/children", get(traces::get_children))
        // Statistics
        .route("/api/stats", get(stats::get_stats))
        .route("/api/stats/latency", get(stats::get_latency))
        .route("/api/stats/operations", get(stats::get_operation_stats))
        .route("/api/filter", put(stats::set_filter))
        .route("/api/reset", post(stats::reset_session))
        // Views
        .route("/api/layout", get(views::get_layout))
        .route("/api/gantt", get(views::get_gantt))
        .route("/api/timeline", get(views::get_timeline))
}

/// Health check endpoint
pub async fn health_check(State(state): State<ApiState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "trace-viz",
            "version": env!("CARGO_PKG_VERSION"),
            "subscribers": state.app_state.subscriber_count(),
        })),
    )
}

// ============================================================================
// Errors
// ============================================================================

/// Error codes for machine-readable error responses
#[derive(Debug)]
pub enum ApiError {
    InvalidEvent(DecodeError),
    NotFound(String),
    SessionUnavailable(SessionError),
}

impl ApiError {
    fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidEvent(_) => "INVALID_EVENT",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::SessionUnavailable(_) => "SESSION_UNAVAILABLE",
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidEvent(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::SessionUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::InvalidEvent(e) => e.to_string(),
            ApiError::NotFound(id) => format!("Span not found: {id}"),
            ApiError::SessionUnavailable(e) => e.to_string(),
        }
    }
}

impl<T> From<ractor::RactorErr<T>> for ApiError {
    fn from(e: ractor::RactorErr<T>) -> Self {
        ApiError::SessionUnavailable(SessionError::from(e))
    }
}

impl From<DecodeError> for ApiError {
    fn from(e: DecodeError) -> Self {
        ApiError::InvalidEvent(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::SessionUnavailable(e) = &self {
            tracing::error!(error = %e, "Trace session RPC failed");
        }
        let body = Json(json!({
            "error": self.message(),
            "code": self.code(),
        }));
        (self.status_code(), body).into_response()
    }
}
