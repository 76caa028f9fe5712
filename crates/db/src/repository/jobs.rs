//! Job queue repository functions (spec §4.6).
//!
//! The durable queue is a plain `job_queue` table polled with `SELECT …
//! FOR UPDATE SKIP LOCKED`. Jobs are polymorphic (`job_name` dispatches the
//! handler) and idempotent: a second `enqueue_job` call with the same
//! `job_id` is a no-op that still returns the original row.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{models::JobRow, DbError};

/// Enqueue a job. When `job_id` is `Some` and a row with that idempotency
/// key already exists, the insert is a no-op and the existing row is
/// returned (spec §4.6: "a second enqueue with the same id is a no-op").
#[allow(clippy::too_many_arguments)]
pub async fn enqueue_job(
    pool: &PgPool,
    job_name: &str,
    payload: serde_json::Value,
    job_id: Option<&str>,
    run_at: DateTime<Utc>,
    max_attempts: i32,
    backoff_initial_ms: i64,
    backoff_multiplier: f64,
    backoff_max_ms: i64,
) -> Result<JobRow, DbError> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    let row = sqlx::query_as!(
        JobRow,
        r#"
        INSERT INTO job_queue
            (id, job_id, job_name, payload, status, attempts, max_attempts,
             backoff_initial_ms, backoff_multiplier, backoff_max_ms, run_at, created_at, updated_at)
        VALUES ($1, $2, $3, $4, 'pending', 0, $5, $6, $7, $8, $9, $10, $10)
        ON CONFLICT (job_id) DO UPDATE SET job_id = excluded.job_id
        RETURNING id, job_id, job_name, payload, status, attempts, max_attempts,
                  backoff_initial_ms, backoff_multiplier, backoff_max_ms, run_at, created_at, updated_at
        "#,
        id,
        job_id,
        job_name,
        payload,
        max_attempts,
        backoff_initial_ms,
        backoff_multiplier,
        backoff_max_ms,
        run_at,
        now,
    )
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Atomically fetch the oldest due, pending job for `job_name` and mark it
/// `processing`. `FOR UPDATE SKIP LOCKED` lets multiple worker processes
/// poll the same table without contending on the same row.
pub async fn fetch_next_job(pool: &PgPool, job_name: &str) -> Result<Option<JobRow>, DbError> {
    let mut tx = pool.begin().await?;

    let row = sqlx::query_as!(
        JobRow,
        r#"
        SELECT id, job_id, job_name, payload, status, attempts, max_attempts,
               backoff_initial_ms, backoff_multiplier, backoff_max_ms, run_at, created_at, updated_at
        FROM job_queue
        WHERE job_name = $1 AND status = 'pending' AND run_at <= now()
        ORDER BY run_at ASC
        LIMIT 1
        FOR UPDATE SKIP LOCKED
        "#,
        job_name,
    )
    .fetch_optional(&mut *tx)
    .await?;

    if let Some(ref job) = row {
        let now = Utc::now();
        sqlx::query!(
            r#"UPDATE job_queue SET status = 'processing', attempts = attempts + 1, updated_at = $1 WHERE id = $2"#,
            now,
            job.id,
        )
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
    } else {
        tx.rollback().await?;
    }

    Ok(row)
}

/// Mark a job completed.
pub async fn complete_job(pool: &PgPool, id: Uuid) -> Result<(), DbError> {
    sqlx::query!(
        "UPDATE job_queue SET status = 'completed', updated_at = $1 WHERE id = $2",
        Utc::now(),
        id,
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// Record a failed attempt: re-queue at `next_run_at` if attempts remain
/// under `max_attempts`, otherwise dead-letter it (spec §4.6 job-level
/// retry: attempts=3, exponential backoff from 1s — distinct from the
/// in-node retry of spec §4.5).
pub async fn fail_job(pool: &PgPool, id: Uuid, next_run_at: DateTime<Utc>) -> Result<(), DbError> {
    sqlx::query!(
        r#"
        UPDATE job_queue
        SET status = CASE WHEN attempts >= max_attempts THEN 'dead_lettered' ELSE 'pending' END,
            run_at = $1,
            updated_at = $2
        WHERE id = $3
        "#,
        next_run_at,
        Utc::now(),
        id,
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// Look up a job by its caller-supplied idempotency key.
pub async fn get_job_by_job_id(pool: &PgPool, job_id: &str) -> Result<Option<JobRow>, DbError> {
    let row = sqlx::query_as!(
        JobRow,
        r#"SELECT id, job_id, job_name, payload, status, attempts, max_attempts,
                  backoff_initial_ms, backoff_multiplier, backoff_max_ms, run_at, created_at, updated_at
           FROM job_queue WHERE job_id = $1"#,
        job_id,
    )
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Delete a still-pending job outright (spec §5 cancellation of a PENDING
/// execution). Returns `true` if a row was removed; a job already picked
/// up (`processing`) is left alone — cancellation of a running job is a
/// cooperative in-process signal, not a row mutation.
pub async fn remove_pending_job_by_job_id(pool: &PgPool, job_id: &str) -> Result<bool, DbError> {
    let result = sqlx::query!(
        "DELETE FROM job_queue WHERE job_id = $1 AND status = 'pending'",
        job_id,
    )
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Housekeeping sweep (spec §4.6 retention): keep only the most recent
/// `keep_completed` completed rows and `keep_failed` dead-lettered rows.
/// Observability only — never load-bearing for correctness.
pub async fn trim_retention(pool: &PgPool, keep_completed: i64, keep_failed: i64) -> Result<(), DbError> {
    sqlx::query!(
        r#"
        DELETE FROM job_queue
        WHERE id IN (
            SELECT id FROM (
                SELECT id, row_number() OVER (ORDER BY updated_at DESC) AS rn
                FROM job_queue WHERE status = 'completed'
            ) ranked WHERE rn > $1
        )
        "#,
        keep_completed,
    )
    .execute(pool)
    .await?;

    sqlx::query!(
        r#"
        DELETE FROM job_queue
        WHERE id IN (
            SELECT id FROM (
                SELECT id, row_number() OVER (ORDER BY updated_at DESC) AS rn
                FROM job_queue WHERE status = 'dead_lettered'
            ) ranked WHERE rn > $1
        )
        "#,
        keep_failed,
    )
    .execute(pool)
    .await?;

    Ok(())
}
