//! Types shared by every `JobQueue` caller (spec §4.6).

use std::time::Duration;

use serde_json::Value;

pub use db::models::JobRow;

/// Options accepted by [`crate::queue::JobQueue::enqueue`].
#[derive(Debug, Clone)]
pub struct EnqueueOptions {
    /// Idempotency key. A second `enqueue` with the same key is a no-op
    /// (spec §4.6) — the orchestrator uses the execution id here so a
    /// crashed-and-retried ingress request never double-queues a run.
    pub job_id: Option<String>,
    /// Delay before the job becomes eligible to run.
    pub delay: Option<Duration>,
    /// Job-level retry attempts (separate from node-level retry, spec
    /// §4.6): default 3.
    pub attempts: u32,
    /// Backoff applied between job-level retry attempts.
    pub backoff: BackoffPolicy,
}

impl Default for EnqueueOptions {
    fn default() -> Self {
        Self {
            job_id: None,
            delay: None,
            attempts: 3,
            backoff: BackoffPolicy::default(),
        }
    }
}

impl EnqueueOptions {
    /// Enqueue with a specific idempotency key and otherwise-default policy
    /// — the common case for ingress-created executions.
    pub fn with_job_id(job_id: impl Into<String>) -> Self {
        Self {
            job_id: Some(job_id.into()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    pub initial: Duration,
    pub multiplier: f64,
    pub max: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(1),
            multiplier: 2.0,
            max: Duration::from_secs(3600),
        }
    }
}

/// A factory invoked on every cron fire to produce a fresh job payload
/// (spec §4.6 `upsertRepeatable`'s `payloadFactory`).
pub type PayloadFactory = std::sync::Arc<dyn Fn() -> Value + Send + Sync>;
