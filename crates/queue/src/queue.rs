//! The durable job queue (spec §4.6).
//!
//! Backed by `db::repository::jobs` (a Postgres table polled with `SELECT …
//! FOR UPDATE SKIP LOCKED`). A `tokio::sync::Notify` wakes idle workers as
//! soon as something is enqueued, avoiding a busy-poll loop between polls.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use serde_json::Value;
use tracing::{error, info, instrument, warn};

use db::DbPool;
use nodes::cancellation::CancellationToken;

use crate::error::QueueError;
use crate::job::{EnqueueOptions, JobRow};

/// How long an idle worker waits for a wakeup before polling anyway — a
/// safety net against a missed `Notify` (e.g. a delayed job becoming due
/// with nobody enqueuing in the meantime).
const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(500);

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Durable, polymorphic job queue with bounded-concurrency workers.
pub struct JobQueue {
    pool: DbPool,
    notify: Arc<tokio::sync::Notify>,
    cancellations: Mutex<HashMap<String, CancellationToken>>,
}

impl JobQueue {
    pub fn new(pool: DbPool) -> Arc<Self> {
        Arc::new(Self {
            pool,
            notify: Arc::new(tokio::sync::Notify::new()),
            cancellations: Mutex::new(HashMap::new()),
        })
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Enqueue a job (spec §4.6). Returns the row id — the same row if
    /// `opts.job_id` collided with an existing job.
    #[instrument(skip(self, payload), fields(job_name))]
    pub async fn enqueue(
        &self,
        job_name: &str,
        payload: Value,
        opts: EnqueueOptions,
    ) -> Result<JobRow, QueueError> {
        let run_at = Utc::now() + chrono::Duration::from_std(opts.delay.unwrap_or_default()).unwrap_or_default();

        let row = db::repository::jobs::enqueue_job(
            &self.pool,
            job_name,
            payload,
            opts.job_id.as_deref(),
            run_at,
            opts.attempts as i32,
            opts.backoff.initial.as_millis() as i64,
            opts.backoff.multiplier,
            opts.backoff.max.as_millis() as i64,
        )
        .await?;

        self.notify.notify_waiters();
        Ok(row)
    }

    pub async fn get_job(&self, job_id: &str) -> Result<Option<JobRow>, QueueError> {
        Ok(db::repository::jobs::get_job_by_job_id(&self.pool, job_id).await?)
    }

    /// Remove a still-pending job (spec §5: cancelling a PENDING
    /// execution). A no-op (returns `false`) once the job has been picked
    /// up — use [`Self::cancellation_token`] for a running job instead.
    pub async fn remove_job(&self, job_id: &str) -> Result<bool, QueueError> {
        Ok(db::repository::jobs::remove_pending_job_by_job_id(&self.pool, job_id).await?)
    }

    /// The cooperative cancellation signal for a job currently being
    /// processed by one of this queue's workers, if any. `None` once the
    /// job has finished (the handle is dropped on completion).
    pub fn cancellation_token(&self, job_id: &str) -> Option<CancellationToken> {
        self.cancellations.lock().unwrap().get(job_id).cloned()
    }

    /// Housekeeping sweep — retains only the most recent 1000 completed
    /// and 5000 dead-lettered rows (spec §4.6 retention).
    pub async fn trim_retention(&self) -> Result<(), QueueError> {
        db::repository::jobs::trim_retention(&self.pool, 1000, 5000).await?;
        Ok(())
    }

    /// Spawn `concurrency` workers processing jobs named `job_name`. Each
    /// worker runs one job to completion before polling for the next
    /// (spec §5: "each worker processes one execution to completion before
    /// starting the next").
    pub fn worker<F>(self: &Arc<Self>, job_name: &str, concurrency: usize, handler: F) -> WorkerHandle
    where
        F: Fn(JobRow, CancellationToken) -> BoxFuture<'static, Result<(), QueueError>> + Send + Sync + 'static,
    {
        let handler = Arc::new(handler);
        let mut tasks = Vec::with_capacity(concurrency);

        for worker_idx in 0..concurrency {
            let queue = Arc::clone(self);
            let job_name = job_name.to_string();
            let handler = Arc::clone(&handler);

            tasks.push(tokio::spawn(async move {
                queue.run_worker_loop(worker_idx, &job_name, handler).await;
            }));
        }

        WorkerHandle { tasks }
    }

    async fn run_worker_loop(
        self: Arc<Self>,
        worker_idx: usize,
        job_name: &str,
        handler: Arc<
            dyn Fn(JobRow, CancellationToken) -> BoxFuture<'static, Result<(), QueueError>> + Send + Sync,
        >,
    ) {
        loop {
            let job = match db::repository::jobs::fetch_next_job(&self.pool, job_name).await {
                Ok(Some(job)) => job,
                Ok(None) => {
                    let notified = self.notify.notified();
                    tokio::select! {
                        _ = notified => {}
                        _ = tokio::time::sleep(IDLE_POLL_INTERVAL) => {}
                    }
                    continue;
                }
                Err(err) => {
                    error!(worker_idx, %err, "job queue poll failed");
                    tokio::time::sleep(IDLE_POLL_INTERVAL).await;
                    continue;
                }
            };

            self.process_job(job, &handler).await;
        }
    }

    #[instrument(skip(self, handler, job), fields(job_name = %job.job_name, job_id = ?job.job_id))]
    async fn process_job(
        &self,
        job: JobRow,
        handler: &(dyn Fn(JobRow, CancellationToken) -> BoxFuture<'static, Result<(), QueueError>> + Send + Sync),
    ) {
        let token = CancellationToken::new();
        let registry_key = job.job_id.clone().unwrap_or_else(|| job.id.to_string());
        self.cancellations.lock().unwrap().insert(registry_key.clone(), token.clone());

        let id = job.id;
        let attempts = job.attempts;
        let max_attempts = job.max_attempts;
        let backoff_initial_ms = job.backoff_initial_ms;
        let backoff_multiplier = job.backoff_multiplier;
        let backoff_max_ms = job.backoff_max_ms;
        let result = handler(job, token).await;

        self.cancellations.lock().unwrap().remove(&registry_key);

        match result {
            Ok(()) => {
                if let Err(err) = db::repository::jobs::complete_job(&self.pool, id).await {
                    error!(%err, "failed to mark job completed");
                }
            }
            Err(err) => {
                warn!(%err, attempts, max_attempts, "job handler failed");
                let delay = crate::backoff::exponential(
                    Duration::from_millis(backoff_initial_ms as u64),
                    backoff_multiplier,
                    attempts.max(1) as u32,
                    Duration::from_millis(backoff_max_ms as u64),
                );
                let next_run_at = Utc::now() + chrono::Duration::from_std(delay).unwrap_or_default();
                if let Err(err) = db::repository::jobs::fail_job(&self.pool, id, next_run_at).await {
                    error!(%err, "failed to record job failure");
                }
            }
        }
    }
}

/// Handle to a running worker pool. Dropping it does not stop the workers
/// — call [`Self::stop`] explicitly (matches the teacher's explicit
/// shutdown style rather than relying on destructors for I/O).
pub struct WorkerHandle {
    tasks: Vec<tokio::task::JoinHandle<()>>,
}

impl WorkerHandle {
    pub fn stop(self) {
        for task in self.tasks {
            task.abort();
        }
    }
}

/// Log the worker pool starting — called from `cli worker` once per
/// registered job name, kept here so the log line carries the same fields
/// regardless of call site.
pub fn log_worker_start(job_name: &str, concurrency: usize) {
    info!(job_name, concurrency, "starting job queue workers");
}
