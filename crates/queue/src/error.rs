//! Queue-level error type.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("database error: {0}")]
    Database(#[from] db::DbError),

    #[error("invalid cron pattern '{0}'")]
    InvalidCron(String),

    #[error("no repeatable registration found for key '{0}'")]
    UnknownRepeatable(String),

    /// A job's payload didn't deserialize into the shape its handler expects.
    #[error("invalid job payload: {0}")]
    InvalidPayload(String),

    /// A job handler (e.g. the execution orchestrator) returned an error.
    #[error("job handler failed: {0}")]
    Handler(String),
}
