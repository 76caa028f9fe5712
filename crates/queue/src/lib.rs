//! `queue` crate — the durable job queue (spec §4.6) and the cron-based
//! scheduler built on top of it (spec §4.7).

pub mod backoff;
pub mod error;
pub mod job;
pub mod queue;
pub mod retention;
pub mod scheduler;

pub use error::QueueError;
pub use job::{BackoffPolicy, EnqueueOptions, JobRow, PayloadFactory};
pub use queue::{log_worker_start, JobQueue, WorkerHandle};
pub use scheduler::Scheduler;
