//! Event ingestion and the live SSE stream

use std::convert::Infallible;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures_util::{stream, Stream};
use tokio::sync::broadcast::error::RecvError;
use trace_types::TraceEvent;

use super::{ApiError, ApiState};
use crate::actors::TraceSessionMsg;
use crate::sse::{decode_frame, sse_event, DecodeError};

/// POST /events
///
/// Body is one event as JSON, or one SSE frame (`data: {...}`).
pub async fn ingest_event(
    State(state): State<ApiState>,
    body: String,
) -> Result<Response, ApiError> {
    let event = parse_event(&body)?;
    let session = state.app_state.session();
    let applied = ractor::call!(session, |reply| TraceSessionMsg::Apply { event, reply })?;

    Ok((StatusCode::ACCEPTED, Json(applied)).into_response())
}

fn parse_event(body: &str) -> Result<TraceEvent, DecodeError> {
    if body.trim_start().starts_with("data:") {
        decode_frame(body)
    } else {
        Ok(serde_json::from_str(body)?)
    }
}

/// GET /events
///
/// Streams every event applied after the subscription, one SSE message each,
/// with periodic keep-alive comments while the session is idle. A subscriber
/// that falls behind the broadcast buffer skips the overflow rather than
/// holding up the others.
pub async fn stream_events(
    State(state): State<ApiState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let receiver = state.app_state.subscribe();
    tracing::debug!(
        subscribers = state.app_state.subscriber_count(),
        "SSE subscriber connected"
    );

    let events = stream::unfold(receiver, |mut receiver| async move {
        loop {
            match receiver.recv().await {
                Ok(event) => match sse_event(&event) {
                    Ok(message) => return Some((Ok::<_, Infallible>(message), receiver)),
                    Err(e) => {
                        tracing::warn!(span_id = %event.id, error = %e, "Failed to encode event");
                    }
                },
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "SSE subscriber lagged; events skipped");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}
