//! Shared types between the trace engine, the server and the UI
//!
//! These types are used by both:
//! - the aggregation engine and its HTTP/SSE server (native Rust)
//! - browser consumers (TypeScript bindings generated with ts-rs)
//!
//! Serializable with serde for JSON over SSE/HTTP. Field names on the wire are
//! camelCase, matching the span exporter's event schema.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ============================================================================
// Core Types
// ============================================================================

/// Unique identifier for one aggregation session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, TS)]
#[ts(export, export_to = "trace-types.ts")]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(ulid::Ulid::new().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Wire Events
// ============================================================================

/// Lifecycle event kind (`type` on the wire)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "trace-types.ts")]
pub enum EventKind {
    Started,
    Completed,
    Failed,
    Cancelled,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Started => "started",
            EventKind::Completed => "completed",
            EventKind::Failed => "failed",
            EventKind::Cancelled => "cancelled",
        }
    }
}

/// Span lifecycle event as emitted by the producer.
///
/// `timestamp` is a monotonic clock reading in nanoseconds. Optional fields
/// default when absent so older producers still decode.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "trace-types.ts")]
pub struct TraceEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub id: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    pub operation: String,
    pub status: String,
    #[serde(default)]
    pub duration_ms: f64,
    #[serde(default)]
    pub dispatcher: String,
    #[ts(type = "number")]
    pub timestamp: i64,
    #[serde(default)]
    pub source_file: String,
    #[serde(default)]
    pub line_number: i32,
    #[serde(default)]
    pub is_unstructured: bool,
}

impl TraceEvent {
    /// A `started` event with every optional field at its default.
    pub fn started(
        id: impl Into<String>,
        parent_id: Option<&str>,
        operation: impl Into<String>,
        timestamp: i64,
    ) -> Self {
        Self {
            kind: EventKind::Started,
            id: id.into(),
            parent_id: parent_id.map(ToString::to_string),
            operation: operation.into(),
            status: TraceStatus::Running.as_str().to_string(),
            duration_ms: 0.0,
            dispatcher: String::new(),
            timestamp,
            source_file: String::new(),
            line_number: 0,
            is_unstructured: false,
        }
    }

    /// A terminal event for `id`. `status` carries the same word as `kind`.
    pub fn finished(id: impl Into<String>, kind: EventKind, duration_ms: f64, timestamp: i64) -> Self {
        Self {
            kind,
            id: id.into(),
            parent_id: None,
            operation: String::new(),
            status: kind.as_str().to_string(),
            duration_ms,
            dispatcher: String::new(),
            timestamp,
            source_file: String::new(),
            line_number: 0,
            is_unstructured: false,
        }
    }

    pub fn completed(id: impl Into<String>, duration_ms: f64, timestamp: i64) -> Self {
        Self::finished(id, EventKind::Completed, duration_ms, timestamp)
    }

    pub fn failed(id: impl Into<String>, duration_ms: f64, timestamp: i64) -> Self {
        Self::finished(id, EventKind::Failed, duration_ms, timestamp)
    }

    pub fn cancelled(id: impl Into<String>, duration_ms: f64, timestamp: i64) -> Self {
        Self::finished(id, EventKind::Cancelled, duration_ms, timestamp)
    }

    pub fn with_dispatcher(mut self, dispatcher: impl Into<String>) -> Self {
        self.dispatcher = dispatcher.into();
        self
    }

    pub fn with_source(mut self, source_file: impl Into<String>, line_number: i32) -> Self {
        self.source_file = source_file.into();
        self.line_number = line_number;
        self
    }

    pub fn unstructured(mut self) -> Self {
        self.is_unstructured = true;
        self
    }
}

// ============================================================================
// Tree Model
// ============================================================================

/// Span status after ingestion. The wire keeps a free-text string.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "trace-types.ts")]
pub enum TraceStatus {
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl TraceStatus {
    /// Lenient parse used at ingestion: case-insensitive, anything unknown is Running.
    pub fn from_wire(value: &str) -> Self {
        value.parse().unwrap_or(TraceStatus::Running)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TraceStatus::Running => "running",
            TraceStatus::Completed => "completed",
            TraceStatus::Failed => "failed",
            TraceStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for TraceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TraceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "running" => Ok(TraceStatus::Running),
            "completed" => Ok(TraceStatus::Completed),
            "failed" => Ok(TraceStatus::Failed),
            "cancelled" => Ok(TraceStatus::Cancelled),
            _ => Err(format!("unknown status: {}", s)),
        }
    }
}

/// One span in the tree. Children are held as ids and resolved through the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "trace-types.ts")]
pub struct TraceNode {
    pub id: String,
    pub parent_id: Option<String>,
    pub operation: String,
    pub status: TraceStatus,
    pub duration_ms: f64,
    pub dispatcher: String,
    /// Milliseconds since the session baseline
    pub start_offset_ms: f64,
    pub source_file: String,
    pub line_number: i32,
    pub is_unstructured: bool,
    pub child_ids: Vec<String>,
}

impl TraceNode {
    /// Label shown on a node: the operation, or the id for anonymous spans.
    pub fn display_label(&self) -> &str {
        if self.operation.is_empty() || self.operation == "coroutine" {
            &self.id
        } else {
            &self.operation
        }
    }

    /// Directory part of `source_file`, if it has one.
    pub fn package_path(&self) -> Option<&str> {
        self.source_file
            .rsplit_once('/')
            .map(|(dir, _)| dir)
            .filter(|dir| !dir.is_empty())
    }

    /// Trailing segment of a dotted dispatcher name (`Dispatchers.IO` -> `IO`).
    pub fn dispatcher_short(&self) -> &str {
        self.dispatcher
            .rsplit_once('.')
            .map(|(_, tail)| tail)
            .unwrap_or(&self.dispatcher)
    }
}

/// Format milliseconds the way every view prints them.
pub fn format_ms(value: f64, decimals: usize) -> String {
    format!("{:.*}ms", decimals, value)
}

// ============================================================================
// Statistics
// ============================================================================

/// Lifecycle counters maintained on every applied event
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, TS)]
#[ts(export, export_to = "trace-types.ts")]
pub struct TraceCounts {
    #[ts(type = "number")]
    pub running: i64,
    #[ts(type = "number")]
    pub completed: i64,
    #[ts(type = "number")]
    pub failed: i64,
    #[ts(type = "number")]
    pub cancelled: i64,
    #[ts(type = "number")]
    pub unstructured: i64,
}

/// Latency summary over a set of completed-span durations (milliseconds)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, TS)]
#[ts(export, export_to = "trace-types.ts")]
pub struct LatencyStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub p50: f64,
    pub p90: f64,
    pub p99: f64,
    pub count: usize,
}

/// Stats bar payload: counters plus the latency of the selected operation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "trace-types.ts")]
pub struct StatsSnapshot {
    pub session_id: SessionId,
    pub counts: TraceCounts,
    pub latency: LatencyStats,
    pub operation_filter: Option<String>,
    pub operations: Vec<String>,
}

// ============================================================================
// Layout
// ============================================================================

/// Placed node in the left-to-right tree graph
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
#[ts(export, export_to = "trace-types.ts")]
pub struct NodePosition {
    pub node: TraceNode,
    pub x: i32,
    pub y: i32,
    pub level: u32,
}

/// Connector from a parent's right edge to a child's left edge
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "trace-types.ts")]
pub struct Connection {
    pub from_x: i32,
    pub from_y: i32,
    pub to_x: i32,
    pub to_y: i32,
}

impl Connection {
    /// X of the vertical segment.
    pub fn mid_x(&self) -> i32 {
        (self.from_x + self.to_x) / 2
    }

    /// The three orthogonal segments: out of the parent, vertical, into the child.
    /// The vertical one is degenerate when both ends share a Y.
    pub fn segments(&self) -> [((i32, i32), (i32, i32)); 3] {
        let mid_x = self.mid_x();
        [
            ((self.from_x, self.from_y), (mid_x, self.from_y)),
            ((mid_x, self.from_y), (mid_x, self.to_y)),
            ((mid_x, self.to_y), (self.to_x, self.to_y)),
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, TS)]
#[ts(export, export_to = "trace-types.ts")]
pub struct TreeLayout {
    pub positions: Vec<NodePosition>,
    pub connections: Vec<Connection>,
    /// Canvas extent including the trailing margin
    pub width: i32,
    pub height: i32,
}

// ============================================================================
// Gantt / Timeline / Details
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
#[ts(export, export_to = "trace-types.ts")]
pub struct GanttRow {
    pub node: TraceNode,
    pub depth: u32,
    /// Bar offset in pixels
    pub left: f64,
    /// Bar width in pixels
    pub width: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "trace-types.ts")]
pub struct GanttChart {
    pub rows: Vec<GanttRow>,
    pub max_time_ms: f64,
    /// Pixels per millisecond
    pub scale: f64,
    pub tick_step_ms: f64,
    pub ticks: Vec<f64>,
}

/// One line in the raw event log
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "trace-types.ts")]
pub struct TimelineEntry {
    pub event: TraceEvent,
    pub offset_ms: f64,
    /// Offset rendered as `+12.5ms`
    pub time_offset: String,
    pub detail: String,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "trace-types.ts")]
pub struct NodeDetails {
    pub node: TraceNode,
    /// Operation, or the id for anonymous spans
    pub label: String,
    /// Directory of the source file, when it has one
    pub package_path: Option<String>,
    /// `IO` for `Dispatchers.IO`
    pub dispatcher_short: String,
    pub child_count: usize,
    /// Nearest parent first
    pub ancestors: Vec<String>,
}

impl NodeDetails {
    pub fn new(node: TraceNode, child_count: usize, ancestors: Vec<String>) -> Self {
        Self {
            label: node.display_label().to_string(),
            package_path: node.package_path().map(ToString::to_string),
            dispatcher_short: node.dispatcher_short().to_string(),
            node,
            child_count,
            ancestors,
        }
    }
}

// ============================================================================
// API Types
// ============================================================================

/// Body of `PUT /api/filter`
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq, TS)]
#[ts(export, export_to = "trace-types.ts")]
pub struct OperationFilter {
    pub operation: Option<String>,
}

// ============================================================================
// Tests
// ============================================================================
