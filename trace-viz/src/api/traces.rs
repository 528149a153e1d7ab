//! Trace tree endpoints

use axum::extract::{Path, State};
use axum::Json;
use trace_types::{NodeDetails, TraceNode};

use super::{ApiError, ApiState};
use crate::actors::TraceSessionMsg;

/// GET /api/traces - roots ordered by start offset
pub async fn list_roots(State(state): State<ApiState>) -> Result<Json<Vec<TraceNode>>, ApiError> {
    let session = state.app_state.session();
    let roots = ractor::call!(session, |reply| TraceSessionMsg::GetRoots { reply })?;
    Ok(Json(roots))
}

/// GET /api/traces/{id}
pub async fn get_trace(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<NodeDetails>, ApiError> {
    let session = state.app_state.session();
    let details = ractor::call!(session, |reply| TraceSessionMsg::GetNode {
        id: id.clone(),
        reply
    })?;
    details.map(Json).ok_or(ApiError::NotFound(id))
}

/// GET /api/traces/{id}/children
pub async fn get_children(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<TraceNode>>, ApiError> {
    let session = state.app_state.session();
    let children = ractor::call!(session, |reply| TraceSessionMsg::GetChildren {
        id: id.clone(),
        reply
    })?;
    children.map(Json).ok_or(ApiError::NotFound(id))
}
