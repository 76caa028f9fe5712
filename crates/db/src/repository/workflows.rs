//! Workflow CRUD operations.

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{DbError, models::WorkflowRow};

/// Insert a new workflow into the database.
///
/// `definition` must be a valid JSON `WorkflowDefinition` produced by the
/// `engine` crate's domain type.
pub async fn create_workflow(
    pool: &PgPool,
    owner_id: Uuid,
    name: &str,
    definition: serde_json::Value,
    notification_email: Option<&str>,
) -> Result<WorkflowRow, DbError> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    let row = sqlx::query_as!(
        WorkflowRow,
        r#"
        INSERT INTO workflows (id, owner_id, name, is_active, definition, notification_email, created_at, updated_at)
        VALUES ($1, $2, $3, false, $4, $5, $6, $6)
        RETURNING id, owner_id, name, is_active, definition, notification_email, created_at, updated_at
        "#,
        id,
        owner_id,
        name,
        definition,
        notification_email,
        now,
    )
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Fetch a single workflow by its primary key.
pub async fn get_workflow(pool: &PgPool, id: Uuid) -> Result<WorkflowRow, DbError> {
    let row = sqlx::query_as!(
        WorkflowRow,
        r#"SELECT id, owner_id, name, is_active, definition, notification_email, created_at, updated_at
           FROM workflows WHERE id = $1"#,
        id,
    )
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Return all workflows owned by `owner_id`, newest first.
pub async fn list_workflows(pool: &PgPool, owner_id: Uuid) -> Result<Vec<WorkflowRow>, DbError> {
    let rows = sqlx::query_as!(
        WorkflowRow,
        r#"SELECT id, owner_id, name, is_active, definition, notification_email, created_at, updated_at
           FROM workflows WHERE owner_id = $1 ORDER BY created_at DESC"#,
        owner_id,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Overwrite a workflow's name/definition/notification email. Bumps `updated_at`.
pub async fn update_workflow(
    pool: &PgPool,
    id: Uuid,
    name: &str,
    definition: serde_json::Value,
    notification_email: Option<&str>,
) -> Result<WorkflowRow, DbError> {
    let row = sqlx::query_as!(
        WorkflowRow,
        r#"
        UPDATE workflows
        SET name = $2, definition = $3, notification_email = $4, updated_at = $5
        WHERE id = $1
        RETURNING id, owner_id, name, is_active, definition, notification_email, created_at, updated_at
        "#,
        id,
        name,
        definition,
        notification_email,
        Utc::now(),
    )
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Flip a workflow's `is_active` flag (spec §6 activate/deactivate).
pub async fn set_active(pool: &PgPool, id: Uuid, is_active: bool) -> Result<WorkflowRow, DbError> {
    let row = sqlx::query_as!(
        WorkflowRow,
        r#"
        UPDATE workflows SET is_active = $2, updated_at = $3 WHERE id = $1
        RETURNING id, owner_id, name, is_active, definition, notification_email, created_at, updated_at
        "#,
        id,
        is_active,
        Utc::now(),
    )
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Permanently delete a workflow by its primary key (cascades to triggers,
/// credentials, and executions).
pub async fn delete_workflow(pool: &PgPool, id: Uuid) -> Result<(), DbError> {
    let result = sqlx::query!("DELETE FROM workflows WHERE id = $1", id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}
