//! Step-log repository functions.
//!
//! Step logs are insert-only: each lifecycle transition for a node within an
//! execution (`running`, then `success`/`error`/`skipped`) is a new row, and
//! the latest row by `created_at` for a given `(execution_id, node_id)` is
//! the authoritative one (spec §3).

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{DbError, models::StepLogRow};

#[allow(clippy::too_many_arguments)]
pub async fn insert_step_log(
    pool: &PgPool,
    execution_id: Uuid,
    node_id: &str,
    node_name: &str,
    status: &str,
    input: Option<serde_json::Value>,
    output: Option<serde_json::Value>,
    error: Option<&str>,
    duration_ms: Option<i64>,
    retry_attempts: Option<i32>,
) -> Result<StepLogRow, DbError> {
    let id = Uuid::new_v4();

    let row = sqlx::query_as!(
        StepLogRow,
        r#"
        INSERT INTO step_logs
            (id, execution_id, node_id, node_name, status, input, output, error, duration_ms, retry_attempts, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING id, execution_id, node_id, node_name, status, input, output, error, duration_ms, retry_attempts, created_at
        "#,
        id,
        execution_id,
        node_id,
        node_name,
        status,
        input,
        output,
        error,
        duration_ms,
        retry_attempts,
        Utc::now(),
    )
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// The latest row (by `created_at`) per distinct `node_id` for an execution
/// — what the API's execution-detail endpoint and the websocket `replay`
/// message send to a newly-joined subscriber.
pub async fn list_latest_step_logs(pool: &PgPool, execution_id: Uuid) -> Result<Vec<StepLogRow>, DbError> {
    let rows = sqlx::query_as!(
        StepLogRow,
        r#"
        SELECT DISTINCT ON (node_id)
            id, execution_id, node_id, node_name, status, input, output, error, duration_ms, retry_attempts, created_at
        FROM step_logs
        WHERE execution_id = $1
        ORDER BY node_id, created_at DESC
        "#,
        execution_id,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
