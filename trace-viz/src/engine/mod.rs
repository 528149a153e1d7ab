//! Trace aggregation engine
//!
//! `TraceSession` owns everything one live trace needs: the clock baseline,
//! the node arena, the counters and latency samples, and the raw event log.
//! Events are applied one at a time through [`TraceSession::apply`]; every
//! read returns either a borrow (inside the owner) or an owned clone (across
//! the actor boundary), never a half-applied state.
//!
//! # Example
//!
//! ```rust
//! use trace_types::TraceEvent;
//! use trace_viz::engine::TraceSession;
//!
//! let mut session = TraceSession::new();
//! session.apply(&TraceEvent::started("a", None, "root", 1_000));
//! session.apply(&TraceEvent::completed("a", 12.0, 13_000_000));
//! assert_eq!(session.counts().completed, 1);
//! ```

pub mod clock;
pub mod gantt;
pub mod layout;
pub mod stats;
pub mod timeline;
pub mod tree;

use std::collections::BTreeMap;

use serde::Serialize;
use trace_types::{
    EventKind, GanttChart, LatencyStats, NodeDetails, SessionId, StatsSnapshot, TimelineEntry,
    TraceCounts, TraceEvent, TraceNode, TraceStatus, TreeLayout,
};

pub use clock::ClockBaseline;
pub use stats::StatsAggregator;
pub use timeline::Timeline;
pub use tree::{StartOutcome, TreeStore};

/// What [`TraceSession::apply`] did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Applied {
    /// New node; `attached` when its parent was already known.
    Started { attached: bool },
    /// Repeated `started` for a known id, merged into the existing node.
    Merged,
    /// Terminal event applied to a known node.
    Transitioned { status: TraceStatus },
    /// Terminal event for an id that was never started.
    Dropped,
}

#[derive(Debug, Clone)]
pub struct TraceSession {
    id: SessionId,
    clock: ClockBaseline,
    tree: TreeStore,
    stats: StatsAggregator,
    timeline: Timeline,
    operation_filter: Option<String>,
}

impl Default for TraceSession {
    fn default() -> Self {
        Self::new()
    }
}

impl TraceSession {
    pub fn new() -> Self {
        Self::with_timeline_limit(timeline::DEFAULT_TIMELINE_LIMIT)
    }

    pub fn with_timeline_limit(limit: usize) -> Self {
        Self {
            id: SessionId::new(),
            clock: ClockBaseline::new(),
            tree: TreeStore::new(),
            stats: StatsAggregator::new(),
            timeline: Timeline::new(limit),
            operation_filter: None,
        }
    }

    /// Drop all state and start over under a fresh session id.
    pub fn reset(&mut self) {
        let limit = self.timeline_limit();
        *self = Self::with_timeline_limit(limit);
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    fn timeline_limit(&self) -> usize {
        self.timeline.limit()
    }

    // ------------------------------------------------------------------------
    // Ingestion
    // ------------------------------------------------------------------------

    /// Apply one decoded event. Never fails: unknown ids and unknown status
    /// strings degrade to a no-op or a default.
    pub fn apply(&mut self, event: &TraceEvent) -> Applied {
        let offset_ms = self.clock.offset_ms(event.timestamp);
        self.timeline.record(event, offset_ms);

        match event.kind {
            EventKind::Started => self.apply_started(event, offset_ms),
            EventKind::Completed | EventKind::Failed | EventKind::Cancelled => {
                self.apply_finished(event)
            }
        }
    }

    fn apply_started(&mut self, event: &TraceEvent, offset_ms: f64) -> Applied {
        let node = TraceNode {
            id: event.id.clone(),
            parent_id: event.parent_id.clone(),
            operation: event.operation.clone(),
            status: TraceStatus::Running,
            duration_ms: 0.0,
            dispatcher: event.dispatcher.clone(),
            start_offset_ms: offset_ms,
            source_file: event.source_file.clone(),
            line_number: event.line_number,
            is_unstructured: event.is_unstructured,
            child_ids: Vec::new(),
        };

        match self.tree.upsert_on_start(node) {
            StartOutcome::Inserted { attached } => {
                self.stats.record_started(event.is_unstructured);
                if !attached && event.parent_id.is_some() {
                    tracing::debug!(
                        span_id = %event.id,
                        parent_id = ?event.parent_id,
                        "Parent not yet known; span registered as root"
                    );
                }
                Applied::Started { attached }
            }
            StartOutcome::Merged => {
                tracing::warn!(
                    span_id = %event.id,
                    operation = %event.operation,
                    "Duplicate started event merged into existing span"
                );
                Applied::Merged
            }
        }
    }

    fn apply_finished(&mut self, event: &TraceEvent) -> Applied {
        let status = TraceStatus::from_wire(&event.status);
        let Some(node) = self.tree.transition(&event.id, status, event.duration_ms) else {
            tracing::debug!(
                span_id = %event.id,
                kind = event.kind.as_str(),
                "Terminal event for unknown span dropped"
            );
            return Applied::Dropped;
        };

        if status == TraceStatus::Running {
            tracing::warn!(
                span_id = %event.id,
                status = %event.status,
                "Unrecognised status; span left running"
            );
        }

        let operation = node.operation.clone();
        self.stats
            .record_finished(status, &operation, event.duration_ms);
        Applied::Transitioned { status }
    }

    // ------------------------------------------------------------------------
    // Tree queries
    // ------------------------------------------------------------------------

    pub fn tree(&self) -> &TreeStore {
        &self.tree
    }

    pub fn get(&self, id: &str) -> Option<&TraceNode> {
        self.tree.get(id)
    }

    /// Roots in no guaranteed order.
    pub fn roots(&self) -> Vec<&TraceNode> {
        self.tree.roots()
    }

    /// Roots ordered by start offset, then id.
    pub fn sorted_roots(&self) -> Vec<&TraceNode> {
        self.tree.sorted_roots()
    }

    pub fn children_of(&self, id: &str) -> Vec<&TraceNode> {
        self.tree.children_of(id)
    }

    pub fn node_details(&self, id: &str) -> Option<NodeDetails> {
        let node = self.tree.get(id)?;
        Some(NodeDetails::new(
            node.clone(),
            self.tree.children_of(id).len(),
            self.tree.ancestors(id),
        ))
    }

    // ------------------------------------------------------------------------
    // Statistics
    // ------------------------------------------------------------------------

    pub fn counts(&self) -> TraceCounts {
        self.stats.counts()
    }

    pub fn latency(&self, operation: Option<&str>) -> LatencyStats {
        self.stats.latency(operation)
    }

    /// Latency for the operation currently selected in the filter.
    pub fn current_latency(&self) -> LatencyStats {
        self.stats.latency(self.operation_filter.as_deref())
    }

    pub fn operation_stats(&self) -> BTreeMap<String, LatencyStats> {
        self.stats.operation_stats()
    }

    pub fn operations(&self) -> &[String] {
        self.stats.operations()
    }

    pub fn set_operation_filter(&mut self, operation: Option<String>) {
        self.operation_filter = operation.filter(|op| !op.is_empty());
    }

    pub fn operation_filter(&self) -> Option<&str> {
        self.operation_filter.as_deref()
    }

    pub fn stats_snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            session_id: self.id.clone(),
            counts: self.counts(),
            latency: self.current_latency(),
            operation_filter: self.operation_filter.clone(),
            operations: self.operations().to_vec(),
        }
    }

    // ------------------------------------------------------------------------
    // Views
    // ------------------------------------------------------------------------

    pub fn layout(&self) -> TreeLayout {
        layout::layout_store(&self.tree)
    }

    pub fn gantt(&self, scale: f64) -> GanttChart {
        gantt::chart(&self.tree, scale)
    }

    pub fn timeline(&self) -> Vec<TimelineEntry> {
        self.timeline.entries()
    }
}
