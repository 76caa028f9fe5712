//! Execution repository functions (spec §3 `Execution` entity).

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{DbError, models::ExecutionRow};

/// Create a new execution record in `PENDING` status.
pub async fn create_execution(
    pool: &PgPool,
    workflow_id: Uuid,
    input: serde_json::Value,
) -> Result<ExecutionRow, DbError> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    let row = sqlx::query_as!(
        ExecutionRow,
        r#"
        INSERT INTO executions (id, workflow_id, status, input, started_at)
        VALUES ($1, $2, 'PENDING', $3, $4)
        RETURNING id, workflow_id, status, input, output, error, started_at, finished_at
        "#,
        id,
        workflow_id,
        input,
        now,
    )
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Transition an execution into `RUNNING`.
pub async fn mark_running(pool: &PgPool, id: Uuid) -> Result<(), DbError> {
    sqlx::query!("UPDATE executions SET status = 'RUNNING' WHERE id = $1", id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Terminal success: records `output` and `finished_at`.
pub async fn mark_success(pool: &PgPool, id: Uuid, output: serde_json::Value) -> Result<(), DbError> {
    sqlx::query!(
        r#"UPDATE executions SET status = 'SUCCESS', output = $2, finished_at = $3 WHERE id = $1"#,
        id,
        output,
        Utc::now(),
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// Terminal failure: records `error` and `finished_at`.
pub async fn mark_failed(pool: &PgPool, id: Uuid, error: &str) -> Result<(), DbError> {
    sqlx::query!(
        r#"UPDATE executions SET status = 'FAILED', error = $2, finished_at = $3 WHERE id = $1"#,
        id,
        error,
        Utc::now(),
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// Fetch a single execution by its primary key.
pub async fn get_execution(pool: &PgPool, id: Uuid) -> Result<ExecutionRow, DbError> {
    let row = sqlx::query_as!(
        ExecutionRow,
        r#"SELECT id, workflow_id, status, input, output, error, started_at, finished_at
           FROM executions WHERE id = $1"#,
        id,
    )
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Page through a workflow's executions, newest first.
pub async fn list_executions(
    pool: &PgPool,
    workflow_id: Uuid,
    limit: i64,
    offset: i64,
) -> Result<Vec<ExecutionRow>, DbError> {
    let rows = sqlx::query_as!(
        ExecutionRow,
        r#"
        SELECT id, workflow_id, status, input, output, error, started_at, finished_at
        FROM executions
        WHERE workflow_id = $1
        ORDER BY started_at DESC
        LIMIT $2 OFFSET $3
        "#,
        workflow_id,
        limit,
        offset,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Filters accepted by the paginated `/executions` listing (spec §6).
#[derive(Debug, Default)]
pub struct ExecutionFilter {
    pub workflow_id: Option<Uuid>,
    pub status: Option<String>,
    pub started_after: Option<DateTime<Utc>>,
    pub started_before: Option<DateTime<Utc>>,
    pub skip: i64,
    pub take: i64,
}

/// Page through executions with an arbitrary combination of filters.
/// Built with a query builder rather than `query_as!` because the `WHERE`
/// clause shape varies per request.
pub async fn list_executions_filtered(pool: &PgPool, filter: &ExecutionFilter) -> Result<Vec<ExecutionRow>, DbError> {
    let mut qb = sqlx::QueryBuilder::new(
        "SELECT id, workflow_id, status, input, output, error, started_at, finished_at FROM executions WHERE 1 = 1",
    );

    if let Some(workflow_id) = filter.workflow_id {
        qb.push(" AND workflow_id = ").push_bind(workflow_id);
    }
    if let Some(status) = &filter.status {
        qb.push(" AND status = ").push_bind(status.clone());
    }
    if let Some(started_after) = filter.started_after {
        qb.push(" AND started_at >= ").push_bind(started_after);
    }
    if let Some(started_before) = filter.started_before {
        qb.push(" AND started_at <= ").push_bind(started_before);
    }

    qb.push(" ORDER BY started_at DESC LIMIT ")
        .push_bind(filter.take)
        .push(" OFFSET ")
        .push_bind(filter.skip);

    let rows = qb.build_query_as::<ExecutionRow>().fetch_all(pool).await?;
    Ok(rows)
}

/// Per-status execution counts and average duration across every workflow
/// (spec §6 `/executions/stats`).
pub struct ExecutionStats {
    pub status: String,
    pub count: i64,
    pub avg_duration_seconds: Option<f64>,
}

pub async fn global_execution_stats(pool: &PgPool) -> Result<Vec<ExecutionStats>, DbError> {
    let rows = sqlx::query_as!(
        ExecutionStats,
        r#"
        SELECT
            status as "status!",
            count(*) as "count!",
            avg(extract(epoch from (finished_at - started_at))) as avg_duration_seconds
        FROM executions
        GROUP BY status
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
