//! Rendered views: tree layout, Gantt chart, raw timeline

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use trace_types::{GanttChart, TimelineEntry, TreeLayout};

use super::{ApiError, ApiState};
use crate::actors::TraceSessionMsg;
use crate::engine::gantt::DEFAULT_SCALE;

#[derive(Debug, Deserialize)]
pub struct GanttQuery {
    /// Pixels per millisecond
    pub scale: Option<f64>,
}

pub async fn get_layout(State(state): State<ApiState>) -> Result<Json<TreeLayout>, ApiError> {
    let session = state.app_state.session();
    let layout = ractor::call!(session, |reply| TraceSessionMsg::GetLayout { reply })?;
    Ok(Json(layout))
}

pub async fn get_gantt(
    State(state): State<ApiState>,
    Query(query): Query<GanttQuery>,
) -> Result<Json<GanttChart>, ApiError> {
    let scale = query.scale.unwrap_or(DEFAULT_SCALE);
    let session = state.app_state.session();
    let chart = ractor::call!(session, |reply| TraceSessionMsg::GetGantt { scale, reply })?;
    Ok(Json(chart))
}

pub async fn get_timeline(
    State(state): State<ApiState>,
) -> Result<Json<Vec<TimelineEntry>>, ApiError> {
    let session = state.app_state.session();
    let entries = ractor::call!(session, |reply| TraceSessionMsg::GetTimeline { reply })?;
    Ok(Json(entries))
}
