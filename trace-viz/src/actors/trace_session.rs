//! TraceSessionActor - single owner of the live trace session
//!
//! Every mutation of the session goes through this actor's mailbox, so events
//! are applied strictly one at a time in delivery order. Reads are answered
//! from the same mailbox with owned snapshots; a reader never sees a node
//! between its status and duration updates.
//!
//! Applied events are re-published on a broadcast channel in the same order
//! they were applied, which is what the SSE endpoint streams.
//!
//! # Example
//!
//! ```rust,ignore
//! use ractor::{Actor, call};
//!
//! let (session, _handle) = Actor::spawn(
//!     None,
//!     TraceSessionActor,
//!     TraceSessionArguments::default(),
//! ).await?;
//!
//! ractor::cast!(session, TraceSessionMsg::Ingest { event })?;
//! let counts = call!(session, |reply| TraceSessionMsg::GetCounts { reply })?;
//! ```

use std::collections::BTreeMap;

use async_trait::async_trait;
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use tokio::sync::broadcast;
use trace_types::{
    GanttChart, LatencyStats, NodeDetails, SessionId, StatsSnapshot, TimelineEntry, TraceCounts,
    TraceEvent, TraceNode, TreeLayout,
};

use crate::engine::{Applied, TraceSession};

/// Actor that owns the [`TraceSession`]
#[derive(Debug, Default)]
pub struct TraceSessionActor;

/// Arguments for spawning TraceSessionActor
#[derive(Debug, Clone)]
pub struct TraceSessionArguments {
    /// Most recent raw events kept for the timeline view
    pub timeline_limit: usize,
    /// Fan-out of applied events; `None` disables publishing
    pub events: Option<broadcast::Sender<TraceEvent>>,
}

impl Default for TraceSessionArguments {
    fn default() -> Self {
        Self {
            timeline_limit: crate::engine::timeline::DEFAULT_TIMELINE_LIMIT,
            events: None,
        }
    }
}

/// State for TraceSessionActor
pub struct TraceSessionState {
    session: TraceSession,
    events: Option<broadcast::Sender<TraceEvent>>,
}

// ============================================================================
// Messages
// ============================================================================

/// Messages handled by TraceSessionActor
#[derive(Debug)]
pub enum TraceSessionMsg {
    /// Apply an event without waiting for the outcome
    Ingest { event: TraceEvent },
    /// Apply an event and report what happened to it
    Apply {
        event: TraceEvent,
        reply: RpcReplyPort<Applied>,
    },
    /// Roots ordered by start offset
    GetRoots { reply: RpcReplyPort<Vec<TraceNode>> },
    GetNode {
        id: String,
        reply: RpcReplyPort<Option<NodeDetails>>,
    },
    /// `None` when the parent id itself is unknown
    GetChildren {
        id: String,
        reply: RpcReplyPort<Option<Vec<TraceNode>>>,
    },
    GetCounts { reply: RpcReplyPort<TraceCounts> },
    GetStats { reply: RpcReplyPort<StatsSnapshot> },
    GetLatency {
        operation: Option<String>,
        reply: RpcReplyPort<LatencyStats>,
    },
    GetOperationStats {
        reply: RpcReplyPort<BTreeMap<String, LatencyStats>>,
    },
    GetLayout { reply: RpcReplyPort<TreeLayout> },
    GetGantt {
        scale: f64,
        reply: RpcReplyPort<GanttChart>,
    },
    GetTimeline {
        reply: RpcReplyPort<Vec<TimelineEntry>>,
    },
    SetOperationFilter {
        operation: Option<String>,
        reply: RpcReplyPort<StatsSnapshot>,
    },
    /// Discard everything and start a new session
    Reset { reply: RpcReplyPort<SessionId> },
}

// ============================================================================
// Error Types
// ============================================================================

/// Errors surfaced to callers of the session actor
#[derive(Debug, thiserror::Error, Clone)]
pub enum SessionError {
    #[error("Session actor unavailable: {0}")]
    Unavailable(String),
}

impl<T> From<ractor::RactorErr<T>> for SessionError {
    fn from(e: ractor::RactorErr<T>) -> Self {
        SessionError::Unavailable(e.to_string())
    }
}

#[async_trait]
impl Actor for TraceSessionActor {
    type Msg = TraceSessionMsg;
    type State = TraceSessionState;
    type Arguments = TraceSessionArguments;

    async fn pre_start(
        &self,
        myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        let session = TraceSession::with_timeline_limit(args.timeline_limit);
        tracing::info!(
            actor_id = %myself.get_id(),
            session_id = %session.id(),
            timeline_limit = args.timeline_limit,
            "TraceSessionActor starting"
        );

        Ok(TraceSessionState {
            session,
            events: args.events,
        })
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            TraceSessionMsg::Ingest { event } => {
                self.handle_apply(event, state);
            }
            TraceSessionMsg::Apply { event, reply } => {
                let applied = self.handle_apply(event, state);
                let _ = reply.send(applied);
            }
            TraceSessionMsg::GetRoots { reply } => {
                let roots = state
                    .session
                    .sorted_roots()
                    .into_iter()
                    .cloned()
                    .collect();
                let _ = reply.send(roots);
            }
            TraceSessionMsg::GetNode { id, reply } => {
                let _ = reply.send(state.session.node_details(&id));
            }
            TraceSessionMsg::GetChildren { id, reply } => {
                let children = state.session.get(&id).map(|_| {
                    state
                        .session
                        .children_of(&id)
                        .into_iter()
                        .cloned()
                        .collect()
                });
                let _ = reply.send(children);
            }
            TraceSessionMsg::GetCounts { reply } => {
                let _ = reply.send(state.session.counts());
            }
            TraceSessionMsg::GetStats { reply } => {
                let _ = reply.send(state.session.stats_snapshot());
            }
            TraceSessionMsg::GetLatency { operation, reply } => {
                let _ = reply.send(state.session.latency(operation.as_deref()));
            }
            TraceSessionMsg::GetOperationStats { reply } => {
                let _ = reply.send(state.session.operation_stats());
            }
            TraceSessionMsg::GetLayout { reply } => {
                let _ = reply.send(state.session.layout());
            }
            TraceSessionMsg::GetGantt { scale, reply } => {
                let _ = reply.send(state.session.gantt(scale));
            }
            TraceSessionMsg::GetTimeline { reply } => {
                let _ = reply.send(state.session.timeline());
            }
            TraceSessionMsg::SetOperationFilter { operation, reply } => {
                state.session.set_operation_filter(operation);
                let _ = reply.send(state.session.stats_snapshot());
            }
            TraceSessionMsg::Reset { reply } => {
                let previous = state.session.id().clone();
                state.session.reset();
                tracing::info!(
                    previous_session_id = %previous,
                    session_id = %state.session.id(),
                    "Trace session reset"
                );
                let _ = reply.send(state.session.id().clone());
            }
        }
        Ok(())
    }

    async fn post_stop(
        &self,
        myself: ActorRef<Self::Msg>,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        tracing::info!(
            actor_id = %myself.get_id(),
            session_id = %state.session.id(),
            spans = state.session.tree().len(),
            "TraceSessionActor stopped"
        );
        Ok(())
    }
}

// ============================================================================
// Message Handlers
// ============================================================================

impl TraceSessionActor {
    fn handle_apply(&self, event: TraceEvent, state: &mut TraceSessionState) -> Applied {
        let applied = state.session.apply(&event);
        tracing::trace!(span_id = %event.id, kind = event.kind.as_str(), ?applied, "Event applied");

        if let Some(events) = &state.events {
            // No receivers is not an error: nobody is watching yet.
            let _ = events.send(event);
        }
        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trace_types::TraceStatus;

    async fn spawn_session(
        events: Option<broadcast::Sender<TraceEvent>>,
    ) -> ActorRef<TraceSessionMsg> {
        let (session, _handle) = Actor::spawn(
            None,
            TraceSessionActor,
            TraceSessionArguments {
                timeline_limit: 100,
                events,
            },
        )
        .await
        .unwrap();
        session
    }

    #[tokio::test]
    async fn test_cast_events_applied_in_order() {
        let session = spawn_session(None).await;

        ractor::cast!(
            session,
            TraceSessionMsg::Ingest {
                event: TraceEvent::started("a", None, "root", 1_000)
            }
        )
        .unwrap();
        ractor::cast!(
            session,
            TraceSessionMsg::Ingest {
                event: TraceEvent::started("b", Some("a"), "child", 1_500)
            }
        )
        .unwrap();
        ractor::cast!(
            session,
            TraceSessionMsg::Ingest {
                event: TraceEvent::completed("b", 50.0, 2_000)
            }
        )
        .unwrap();

        let counts = ractor::call!(session, |reply| TraceSessionMsg::GetCounts { reply }).unwrap();
        assert_eq!(counts.running, 1);
        assert_eq!(counts.completed, 1);

        let children = ractor::call!(session, |reply| TraceSessionMsg::GetChildren {
            id: "a".to_string(),
            reply
        })
        .unwrap()
        .unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].status, TraceStatus::Completed);

        let missing = ractor::call!(session, |reply| TraceSessionMsg::GetChildren {
            id: "nope".to_string(),
            reply
        })
        .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_apply_reports_outcome_and_publishes() {
        let (tx, mut rx) = broadcast::channel(16);
        let session = spawn_session(Some(tx)).await;

        let applied = ractor::call!(session, |reply| TraceSessionMsg::Apply {
            event: TraceEvent::completed("ghost", 1.0, 1),
            reply
        })
        .unwrap();
        assert_eq!(applied, Applied::Dropped);

        // Dropped events are still relayed, as the producer sent them
        let relayed = rx.recv().await.unwrap();
        assert_eq!(relayed.id, "ghost");
    }

    #[tokio::test]
    async fn test_extreme_timestamps_keep_actor_alive() {
        let session = spawn_session(None).await;

        for event in [
            TraceEvent::started("a", None, "root", i64::MIN),
            TraceEvent::started("b", None, "root", i64::MAX),
        ] {
            ractor::cast!(session, TraceSessionMsg::Ingest { event }).unwrap();
        }

        let counts = ractor::call!(session, |reply| TraceSessionMsg::GetCounts { reply }).unwrap();
        assert_eq!(counts.running, 2);

        let gantt = ractor::call!(session, |reply| TraceSessionMsg::GetGantt {
            scale: 0.1,
            reply
        })
        .unwrap();
        assert_eq!(gantt.rows.len(), 2);
        assert!(gantt.ticks.len() <= crate::engine::gantt::MAX_TICKS);
    }

    #[tokio::test]
    async fn test_reset_issues_new_session_id() {
        let session = spawn_session(None).await;
        let before = ractor::call!(session, |reply| TraceSessionMsg::GetStats { reply })
            .unwrap()
            .session_id;

        let after = ractor::call!(session, |reply| TraceSessionMsg::Reset { reply }).unwrap();
        assert_ne!(before, after);
    }
}
