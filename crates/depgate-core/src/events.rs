use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use serde::Serialize;
use tokio::sync::mpsc;

use crate::types::{Decision, DependencyKey};

// ---------------------------------------------------------------------------
// EngineEvent
// ---------------------------------------------------------------------------

/// Notifications emitted by the engine to its caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    /// One per decision transition of a dependency.
    DecisionChanged {
        key: DependencyKey,
        decision: Decision,
        message: Option<String>,
    },
    /// Aggregate reachability of the validation service flipped.
    ConnectivityChanged { reachable: bool },
    /// The connection-retry budget for `key` ran out.
    ConnectionTimeout { key: DependencyKey, attempts: u32 },
    /// An observation was dropped because no credential is configured.
    CredentialRequired { key: DependencyKey },
}

impl EngineEvent {
    pub fn key(&self) -> Option<&DependencyKey> {
        match self {
            EngineEvent::DecisionChanged { key, .. }
            | EngineEvent::ConnectionTimeout { key, .. }
            | EngineEvent::CredentialRequired { key } => Some(key),
            EngineEvent::ConnectivityChanged { .. } => None,
        }
    }
}

// ---------------------------------------------------------------------------
// EventStream
// ---------------------------------------------------------------------------

/// Receiving side of the engine's notifications.
///
/// Backed by an unbounded channel so emitting never blocks a monitor task
/// and no event is dropped while the stream is alive.
pub struct EventStream {
    rx: mpsc::UnboundedReceiver<EngineEvent>,
}

impl EventStream {
    pub(crate) fn channel() -> (mpsc::UnboundedSender<EngineEvent>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self { rx })
    }

    pub async fn recv(&mut self) -> Option<EngineEvent> {
        self.rx.recv().await
    }

    /// Next event if one is already queued.
    pub fn try_recv(&mut self) -> Option<EngineEvent> {
        self.rx.try_recv().ok()
    }
}

impl Stream for EventStream {
    type Item = EngineEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}
