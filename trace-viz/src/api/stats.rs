//! Counters, latency and session control

use std::collections::BTreeMap;

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use trace_types::{LatencyStats, OperationFilter, StatsSnapshot};

use super::{ApiError, ApiState};
use crate::actors::TraceSessionMsg;

#[derive(Debug, Deserialize)]
pub struct LatencyQuery {
    pub operation: Option<String>,
}

/// GET /api/stats - counters plus latency for the selected operation
pub async fn get_stats(State(state): State<ApiState>) -> Result<Json<StatsSnapshot>, ApiError> {
    let session = state.app_state.session();
    let snapshot = ractor::call!(session, |reply| TraceSessionMsg::GetStats { reply })?;
    Ok(Json(snapshot))
}

/// GET /api/stats/latency?operation=
///
/// Without `operation` (or with an empty one) this covers every sample.
pub async fn get_latency(
    State(state): State<ApiState>,
    Query(query): Query<LatencyQuery>,
) -> Result<Json<LatencyStats>, ApiError> {
    let operation = query.operation.filter(|op| !op.is_empty());
    let session = state.app_state.session();
    let latency = ractor::call!(session, |reply| TraceSessionMsg::GetLatency {
        operation,
        reply
    })?;
    Ok(Json(latency))
}

/// GET /api/stats/operations
pub async fn get_operation_stats(
    State(state): State<ApiState>,
) -> Result<Json<BTreeMap<String, LatencyStats>>, ApiError> {
    let session = state.app_state.session();
    let stats = ractor::call!(session, |reply| TraceSessionMsg::GetOperationStats { reply })?;
    Ok(Json(stats))
}

/// PUT /api/filter
pub async fn set_filter(
    State(state): State<ApiState>,
    Json(filter): Json<OperationFilter>,
) -> Result<Json<StatsSnapshot>, ApiError> {
    let session = state.app_state.session();
    let snapshot = ractor::call!(session, |reply| TraceSessionMsg::SetOperationFilter {
        operation: filter.operation,
        reply
    })?;
    Ok(Json(snapshot))
}

/// POST /api/reset
pub async fn reset_session(State(state): State<ApiState>) -> Result<Json<Value>, ApiError> {
    let session = state.app_state.session();
    let session_id = ractor::call!(session, |reply| TraceSessionMsg::Reset { reply })?;
    Ok(Json(json!({ "sessionId": session_id })))
}
