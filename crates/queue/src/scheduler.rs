//! Cron-based scheduler (spec §4.7) — a thin adapter over [`crate::JobQueue`]
//! that materialises a new job on every cron fire.
//!
//! Grounded on the `cron` crate (already a workspace dependency) for
//! 6-field (sec min hour day month weekday) schedule parsing, the
//! idiomatic choice for cron-pattern parsing in the pack's job-queue
//! examples rather than a hand-rolled cron parser.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use cron::Schedule;
use regex::Regex;
use tracing::{info, warn};

use crate::error::QueueError;
use crate::job::{EnqueueOptions, PayloadFactory};
use crate::queue::JobQueue;

/// Each cron field must look like `*`, `*/N`, or a comma/dash/slash list of
/// digits — validated before handing the pattern to `cron::Schedule` so a
/// malformed pattern fails with a clear field-level error (spec §4.7).
fn field_pattern() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\*(/\d+)?|[0-9,\-/]+)$").expect("static regex"))
}

/// Validate a 6-field cron pattern (spec §4.7). Rejects the pattern if any
/// field fails the per-field regex, or if `cron::Schedule` itself can't
/// parse it.
pub fn validate_cron(pattern: &str) -> Result<(), QueueError> {
    let fields: Vec<&str> = pattern.split_whitespace().collect();
    if fields.len() != 6 {
        return Err(QueueError::InvalidCron(pattern.to_string()));
    }
    for field in &fields {
        if !field_pattern().is_match(field) {
            return Err(QueueError::InvalidCron(pattern.to_string()));
        }
    }
    Schedule::from_str(pattern).map_err(|_| QueueError::InvalidCron(pattern.to_string()))?;
    Ok(())
}

/// Deterministic next-fire time for a cron pattern/timezone pair, used by
/// callers for UI display.
pub fn next_fire(pattern: &str, timezone: Option<&str>) -> Result<DateTime<Utc>, QueueError> {
    let schedule = Schedule::from_str(pattern).map_err(|_| QueueError::InvalidCron(pattern.to_string()))?;

    match timezone.and_then(|tz| tz.parse::<Tz>().ok()) {
        Some(tz) => {
            let next = schedule.upcoming(tz).next().ok_or_else(|| QueueError::InvalidCron(pattern.to_string()))?;
            Ok(next.with_timezone(&Utc))
        }
        None => schedule
            .upcoming(Utc)
            .next()
            .ok_or_else(|| QueueError::InvalidCron(pattern.to_string())),
    }
}

struct Registration {
    task: tokio::task::JoinHandle<()>,
}

/// Registry of active repeatable-job registrations (spec §4.7). One
/// background task per registration sleeps until its next fire, enqueues a
/// job, persists `last_fired_at`, and reschedules itself.
pub struct Scheduler {
    queue: Arc<JobQueue>,
    registrations: Mutex<HashMap<String, Registration>>,
}

impl Scheduler {
    pub fn new(queue: Arc<JobQueue>) -> Arc<Self> {
        Arc::new(Self {
            queue,
            registrations: Mutex::new(HashMap::new()),
        })
    }

    /// Register (or replace) a repeatable job under `key`. Persists the
    /// registration so a restart can recover it, then spawns the ticking
    /// task.
    pub async fn upsert_repeatable(
        self: &Arc<Self>,
        key: &str,
        job_name: &str,
        cron_pattern: &str,
        timezone: Option<String>,
        payload_factory: PayloadFactory,
    ) -> Result<(), QueueError> {
        validate_cron(cron_pattern)?;

        db::repository::repeatable_jobs::upsert_repeatable(
            self.queue.pool(),
            key,
            job_name,
            cron_pattern,
            timezone.as_deref(),
        )
        .await?;

        self.spawn_ticker(key.to_string(), job_name.to_string(), cron_pattern.to_string(), timezone, payload_factory);
        Ok(())
    }

    /// Remove a registration: stop its background task and delete the
    /// persisted row. The underlying trigger row is retained by the caller
    /// (spec §4.7) — this only tears down the scheduling side.
    pub async fn remove_repeatable(&self, key: &str) -> Result<(), QueueError> {
        if let Some(reg) = self.registrations.lock().unwrap().remove(key) {
            reg.task.abort();
        }
        db::repository::repeatable_jobs::remove_repeatable(self.queue.pool(), key).await?;
        Ok(())
    }

    fn spawn_ticker(
        self: &Arc<Self>,
        key: String,
        job_name: String,
        cron_pattern: String,
        timezone: Option<String>,
        payload_factory: PayloadFactory,
    ) {
        if let Some(old) = self.registrations.lock().unwrap().remove(&key) {
            old.task.abort();
        }

        let queue = Arc::clone(&self.queue);
        let pool = queue.pool().clone();
        let task_key = key.clone();

        let task = tokio::spawn(async move {
            let schedule = match Schedule::from_str(&cron_pattern) {
                Ok(s) => s,
                Err(err) => {
                    warn!(key = %task_key, %err, "repeatable job has an unparseable cron pattern; not ticking");
                    return;
                }
            };
            let tz: Option<Tz> = timezone.as_deref().and_then(|tz| tz.parse().ok());

            loop {
                let next = match tz {
                    Some(tz) => schedule.upcoming(tz).next().map(|dt| dt.with_timezone(&Utc)),
                    None => schedule.upcoming(Utc).next(),
                };
                let Some(next) = next else {
                    warn!(key = %task_key, "cron schedule produced no next fire time; stopping");
                    return;
                };

                let now = Utc::now();
                if next > now {
                    tokio::time::sleep((next - now).to_std().unwrap_or_default()).await;
                }

                let payload = payload_factory();
                let fire_id = format!("{task_key}:{}", Utc::now().timestamp_nanos_opt().unwrap_or_default());
                if let Err(err) = queue
                    .enqueue(&job_name, payload, EnqueueOptions::with_job_id(fire_id))
                    .await
                {
                    warn!(key = %task_key, %err, "repeatable job failed to enqueue");
                }
                if let Err(err) = db::repository::repeatable_jobs::mark_fired(&pool, &task_key, Utc::now()).await {
                    warn!(key = %task_key, %err, "failed to record repeatable job fire time");
                }
            }
        });

        self.registrations.lock().unwrap().insert(key, Registration { task });
    }

    /// Re-arm every persisted registration's background ticker — called
    /// once at engine startup (spec §4.7: "on engine startup, enumerate all
    /// SCHEDULE triggers … and register them"). The caller supplies
    /// `payload_factory_for` to rebuild each registration's payload
    /// factory, since closures aren't persisted.
    pub async fn recover_all(
        self: &Arc<Self>,
        payload_factory_for: impl Fn(&str) -> PayloadFactory,
    ) -> Result<usize, QueueError> {
        let rows = db::repository::repeatable_jobs::list_repeatables(self.queue.pool()).await?;
        let count = rows.len();
        for row in rows {
            info!(key = %row.key, cron = %row.cron_pattern, "recovering repeatable job registration");
            let factory = payload_factory_for(&row.key);
            self.spawn_ticker(row.key, row.job_name, row.cron_pattern, row.timezone, factory);
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_cron_accepts_every_second() {
        assert!(validate_cron("*/1 * * * * *").is_ok());
    }

    #[test]
    fn validate_cron_rejects_wrong_field_count() {
        assert!(validate_cron("* * * * *").is_err());
    }

    #[test]
    fn validate_cron_rejects_garbage_field() {
        assert!(validate_cron("* * * * * garbage!").is_err());
    }

    #[test]
    fn next_fire_is_in_the_future() {
        let next = next_fire("0 0 0 1 1 *", None).unwrap();
        assert!(next > Utc::now());
    }
}
