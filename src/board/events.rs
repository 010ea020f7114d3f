//! Change notifications fanned out to real-time clients.
//!
//! Stores receive an `Arc<dyn Broadcaster>` at construction and report every
//! mutation through it. The server wires in [`WsBroadcaster`]; offline tools
//! such as `migrate` use [`NoopBroadcaster`].

use serde::Serialize;
use tokio::sync::broadcast;

/// Kinds of board change events.
///
/// The batched variants share a wire type with their single-record
/// counterparts and are distinguished by their payload (`reorder` /
/// `rerank` flags).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    TaskCreated,
    TaskUpdated,
    TaskMoved,
    TaskDeleted,
    TasksReordered,
    UpgradeCreated,
    UpgradeUpdated,
    UpgradeDeleted,
    UpgradesReranked,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TaskCreated => "task.created",
            Self::TaskUpdated | Self::TasksReordered => "task.updated",
            Self::TaskMoved => "task.moved",
            Self::TaskDeleted => "task.deleted",
            Self::UpgradeCreated => "upgrade.created",
            Self::UpgradeUpdated | Self::UpgradesReranked => "upgrade.updated",
            Self::UpgradeDeleted => "upgrade.deleted",
        }
    }
}

/// Accepts an event kind and payload and delivers it to whoever listens.
pub trait Broadcaster: Send + Sync {
    fn broadcast(&self, kind: EventKind, payload: serde_json::Value);
}

#[derive(Serialize)]
struct Envelope<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    payload: serde_json::Value,
}

/// Serialize an event into the `{type, payload}` wire form.
pub fn encode_event(kind: EventKind, payload: serde_json::Value) -> serde_json::Result<String> {
    serde_json::to_string(&Envelope {
        kind: kind.as_str(),
        payload,
    })
}

/// Handshake sent to each socket on connect. Clients ignore it for state.
pub fn connected_message() -> String {
    serde_json::json!({"type": "connected"}).to_string()
}

/// Publishes events onto the broadcast channel every WebSocket subscribes to.
#[derive(Clone)]
pub struct WsBroadcaster {
    tx: broadcast::Sender<String>,
}

impl WsBroadcaster {
    pub fn new(tx: broadcast::Sender<String>) -> Self {
        Self { tx }
    }
}

impl Broadcaster for WsBroadcaster {
    fn broadcast(&self, kind: EventKind, payload: serde_json::Value) {
        match encode_event(kind, payload) {
            Ok(json) => {
                // No receivers just means no client is connected right now.
                let _ = self.tx.send(json);
            }
            Err(e) => {
                tracing::error!(event = kind.as_str(), error = %e, "failed to serialize board event");
            }
        }
    }
}

/// Drops every event.
pub struct NoopBroadcaster;

impl Broadcaster for NoopBroadcaster {
    fn broadcast(&self, _kind: EventKind, _payload: serde_json::Value) {}
}
