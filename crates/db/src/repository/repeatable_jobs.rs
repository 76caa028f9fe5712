//! Repeatable (cron) job registration repository functions (spec §4.7).
//!
//! Persisted so a restarted engine can recover its schedule registrations
//! on startup rather than relying purely on in-process state.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::{models::RepeatableJobRow, DbError};

pub async fn upsert_repeatable(
    pool: &PgPool,
    key: &str,
    job_name: &str,
    cron_pattern: &str,
    timezone: Option<&str>,
) -> Result<RepeatableJobRow, DbError> {
    let row = sqlx::query_as!(
        RepeatableJobRow,
        r#"
        INSERT INTO repeatable_jobs (key, job_name, cron_pattern, timezone, created_at)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (key) DO UPDATE
            SET job_name = excluded.job_name, cron_pattern = excluded.cron_pattern, timezone = excluded.timezone
        RETURNING key, job_name, cron_pattern, timezone, last_fired_at, created_at
        "#,
        key,
        job_name,
        cron_pattern,
        timezone,
        Utc::now(),
    )
    .fetch_one(pool)
    .await?;

    Ok(row)
}

pub async fn remove_repeatable(pool: &PgPool, key: &str) -> Result<(), DbError> {
    sqlx::query!("DELETE FROM repeatable_jobs WHERE key = $1", key)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn list_repeatables(pool: &PgPool) -> Result<Vec<RepeatableJobRow>, DbError> {
    let rows = sqlx::query_as!(
        RepeatableJobRow,
        r#"SELECT key, job_name, cron_pattern, timezone, last_fired_at, created_at FROM repeatable_jobs"#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn mark_fired(pool: &PgPool, key: &str, fired_at: DateTime<Utc>) -> Result<(), DbError> {
    sqlx::query!("UPDATE repeatable_jobs SET last_fired_at = $2 WHERE key = $1", key, fired_at)
        .execute(pool)
        .await?;
    Ok(())
}
