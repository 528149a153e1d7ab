//! Server-Sent Events framing for trace events.
//!
//! Each event travels as one frame: `data: <json>\n\n`. The decoder accepts
//! arbitrary chunk boundaries, so it can sit directly on a byte stream.

use axum::response::sse::Event;
use trace_types::TraceEvent;

/// Errors raised while turning SSE frames back into events
#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum DecodeError {
    #[error("Invalid event JSON: {0}")]
    InvalidJson(String),

    #[error("Frame has no data lines")]
    EmptyFrame,
}

impl From<serde_json::Error> for DecodeError {
    fn from(e: serde_json::Error) -> Self {
        DecodeError::InvalidJson(e.to_string())
    }
}

/// One event as an SSE message whose data line is the event JSON.
pub fn sse_event(event: &TraceEvent) -> Result<Event, serde_json::Error> {
    Ok(Event::default().data(serde_json::to_string(event)?))
}

/// Parse the payload of one frame (the text between blank lines).
pub fn decode_frame(frame: &str) -> Result<TraceEvent, DecodeError> {
    let data: Vec<&str> = frame
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|value| value.strip_prefix(' ').unwrap_or(value))
        .collect();

    if data.is_empty() {
        return Err(DecodeError::EmptyFrame);
    }
    Ok(serde_json::from_str(&data.join("\n"))?)
}

/// Incremental decoder over a chunked SSE body.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: String,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return every frame it completed. Comment-only frames
    /// (keep-alives) are skipped silently.
    pub fn push(&mut self, chunk: &str) -> Vec<Result<TraceEvent, DecodeError>> {
        self.buffer.push_str(&chunk.replace("\r\n", "\n"));

        let mut decoded = Vec::new();
        while let Some(end) = self.buffer.find("\n\n") {
            let frame: String = self.buffer.drain(..end + 2).collect();
            match decode_frame(&frame) {
                Err(DecodeError::EmptyFrame) => {}
                result => {
                    if let Err(e) = &result {
                        tracing::warn!(error = %e, "Dropping undecodable SSE frame");
                    }
                    decoded.push(result);
                }
            }
        }
        decoded
    }

    /// Bytes held back waiting for a frame terminator.
    pub fn pending(&self) -> &str {
        &self.buffer
    }
}
