//! Node-level error type.

use thiserror::Error;

/// Errors returned by a node's `execute` method.
///
/// The engine uses the variant to decide retry behaviour:
/// - `Retryable` — the job is re-queued with exponential back-off.
/// - `Fatal`     — the execution is immediately marked as failed.
#[derive(Debug, Error, Clone)]
pub enum NodeError {
    /// Transient failure; the engine should re-try the job.
    #[error("retryable node error: {0}")]
    Retryable(String),

    /// Permanent failure; no retry should be attempted.
    #[error("fatal node error: {0}")]
    Fatal(String),
}

impl NodeError {
    /// Message carried by either variant, for StepLog persistence.
    pub fn message(&self) -> &str {
        match self {
            Self::Retryable(m) | Self::Fatal(m) => m,
        }
    }

    /// The error used when a cooperative cancellation signal is observed.
    pub fn cancelled() -> Self {
        Self::Fatal("cancelled".into())
    }
}
