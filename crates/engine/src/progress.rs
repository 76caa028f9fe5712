//! Progress Bus (spec §4.9) — per-execution publish/subscribe "rooms".
//!
//! Grounded on the `tokio::sync::broadcast` idiom for in-process pub/sub: a
//! room-per-execution registry of broadcast channels. The `api` crate's
//! websocket handler owns turning [`ProgressEvent`] into the wire messages
//! of spec §4.9's table and replaying current `StepLog` rows on join.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

const ROOM_CAPACITY: usize = 256;

/// One lifecycle event destined for an execution's subscriber room.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    ExecutionStart {
        execution_id: Uuid,
        workflow_id: Uuid,
        workflow_name: String,
        started_at: DateTime<Utc>,
    },
    StepStart {
        execution_id: Uuid,
        node_id: String,
        node_name: String,
        status: &'static str,
    },
    StepComplete {
        execution_id: Uuid,
        node_id: String,
        node_name: String,
        status: String,
        output: Option<Value>,
        error: Option<String>,
        duration_ms: Option<i64>,
        retry_attempts: Option<i32>,
    },
    ExecutionComplete {
        execution_id: Uuid,
        workflow_id: Uuid,
        status: String,
        output: Option<Value>,
        error: Option<String>,
        finished_at: DateTime<Utc>,
        total_duration_ms: i64,
    },
}

/// Per-execution pub/sub registry, keyed `execution:<id>` conceptually
/// (the room key here is just the `Uuid`; the `api` crate prefixes it for
/// the websocket `join`/`leave` protocol).
#[derive(Default)]
pub struct ProgressBus {
    rooms: Mutex<HashMap<Uuid, tokio::sync::broadcast::Sender<ProgressEvent>>>,
}

impl ProgressBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to an execution's room, creating it if this is the first
    /// subscriber. `join` is idempotent — repeated calls just hand back a
    /// fresh receiver on the same (or a newly created) channel.
    pub fn join(&self, execution_id: Uuid) -> tokio::sync::broadcast::Receiver<ProgressEvent> {
        let mut rooms = self.rooms.lock().unwrap();
        rooms
            .entry(execution_id)
            .or_insert_with(|| tokio::sync::broadcast::channel(ROOM_CAPACITY).0)
            .subscribe()
    }

    /// Publish an event to an execution's room. A no-op if nobody is
    /// subscribed (the broadcast channel's only error case) — progress
    /// events are best-effort, never load-bearing for correctness.
    pub fn publish(&self, execution_id: Uuid, event: ProgressEvent) {
        let rooms = self.rooms.lock().unwrap();
        if let Some(sender) = rooms.get(&execution_id) {
            let _ = sender.send(event);
        }
    }

    /// Drop a room once an execution reaches a terminal state and nobody
    /// is expected to join late. Cheap housekeeping only — a late `join`
    /// on a dropped room simply creates a fresh, empty one.
    pub fn close(&self, execution_id: Uuid) {
        self.rooms.lock().unwrap().remove(&execution_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_after_join_is_observed() {
        let bus = ProgressBus::new();
        let execution_id = Uuid::new_v4();
        let mut rx = bus.join(execution_id);

        bus.publish(
            execution_id,
            ProgressEvent::ExecutionStart {
                execution_id,
                workflow_id: Uuid::new_v4(),
                workflow_name: "wf".into(),
                started_at: Utc::now(),
            },
        );

        let event = rx.recv().await.unwrap();
        assert!(matches!(event, ProgressEvent::ExecutionStart { .. }));
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        let bus = ProgressBus::new();
        bus.publish(
            Uuid::new_v4(),
            ProgressEvent::StepStart {
                execution_id: Uuid::new_v4(),
                node_id: "n".into(),
                node_name: "n".into(),
                status: "running",
            },
        );
    }
}
