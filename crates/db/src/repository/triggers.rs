//! Trigger repository functions (spec §3 `Trigger` entity, §4.10 ingress).
//!
//! Each workflow has at most one trigger row (enforced by the `UNIQUE
//! (workflow_id)` constraint) — swapping a workflow's trigger type is an
//! upsert, not a separate create/delete dance.

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{DbError, models::TriggerRow};

pub async fn upsert_trigger(
    pool: &PgPool,
    workflow_id: Uuid,
    trigger_type: &str,
    config: serde_json::Value,
    token: Option<&str>,
) -> Result<TriggerRow, DbError> {
    let id = Uuid::new_v4();

    let row = sqlx::query_as!(
        TriggerRow,
        r#"
        INSERT INTO triggers (id, workflow_id, trigger_type, config, token, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (workflow_id) DO UPDATE
            SET trigger_type = excluded.trigger_type, config = excluded.config, token = excluded.token
        RETURNING id, workflow_id, trigger_type, config, token, created_at
        "#,
        id,
        workflow_id,
        trigger_type,
        config,
        token,
        Utc::now(),
    )
    .fetch_one(pool)
    .await?;

    Ok(row)
}

pub async fn get_trigger_for_workflow(pool: &PgPool, workflow_id: Uuid) -> Result<Option<TriggerRow>, DbError> {
    let row = sqlx::query_as!(
        TriggerRow,
        r#"SELECT id, workflow_id, trigger_type, config, token, created_at
           FROM triggers WHERE workflow_id = $1"#,
        workflow_id,
    )
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Resolve an incoming webhook (or email-token) request to its owning
/// trigger — the lookup the `api` crate's ingress handlers run on every
/// request (spec §4.10).
pub async fn get_trigger_by_token(pool: &PgPool, token: &str) -> Result<Option<TriggerRow>, DbError> {
    let row = sqlx::query_as!(
        TriggerRow,
        r#"SELECT id, workflow_id, trigger_type, config, token, created_at
           FROM triggers WHERE token = $1"#,
        token,
    )
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// All `SCHEDULE` triggers, loaded once at worker startup to seed the
/// scheduler's repeatable-job registrations (spec §4.7).
pub async fn list_schedule_triggers(pool: &PgPool) -> Result<Vec<TriggerRow>, DbError> {
    let rows = sqlx::query_as!(
        TriggerRow,
        r#"SELECT id, workflow_id, trigger_type, config, token, created_at
           FROM triggers WHERE trigger_type = 'SCHEDULE'"#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
