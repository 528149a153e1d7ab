use ractor::{Actor, ActorRef, SpawnErr};
use std::sync::Arc;
use tokio::sync::broadcast;
use trace_types::TraceEvent;

use crate::actors::{TraceSessionActor, TraceSessionArguments, TraceSessionMsg};
use crate::config::Config;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    session: ActorRef<TraceSessionMsg>,
    events: broadcast::Sender<TraceEvent>,
}

impl AppState {
    pub fn new(session: ActorRef<TraceSessionMsg>, events: broadcast::Sender<TraceEvent>) -> Self {
        Self {
            inner: Arc::new(AppStateInner { session, events }),
        }
    }

    /// Spawn the session actor wired to a fresh broadcast channel.
    pub async fn spawn(config: &Config) -> Result<Self, SpawnErr> {
        let (events, _) = broadcast::channel(config.broadcast_capacity.max(1));
        let (session, _handle) = Actor::spawn(
            Some(format!("trace_session:{}", ulid::Ulid::new())),
            TraceSessionActor,
            TraceSessionArguments {
                timeline_limit: config.timeline_limit,
                events: Some(events.clone()),
            },
        )
        .await?;

        Ok(Self::new(session, events))
    }

    pub fn session(&self) -> ActorRef<TraceSessionMsg> {
        self.inner.session.clone()
    }

    /// New receiver for every event applied from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<TraceEvent> {
        self.inner.events.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.events.receiver_count()
    }
}
