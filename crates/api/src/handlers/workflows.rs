//! Workflow CRUD (spec §6) — the minimal surface needed to drive the
//! engine. Definitions are validated against the DAG invariants (spec §3)
//! at write time; the orchestrator never re-validates.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Placeholder tenant id used everywhere an `ownerId` is required — the
/// authentication layer is an external collaborator out of scope (spec §1).
pub const DEFAULT_OWNER_ID: Uuid = Uuid::nil();

#[derive(Deserialize)]
pub struct WorkflowDto {
    pub name: String,
    pub definition: Value,
    #[serde(default, rename = "notificationEmail")]
    pub notification_email: Option<String>,
}

fn parse_and_validate(definition: &Value) -> ApiResult<()> {
    let parsed: engine::WorkflowDefinition =
        serde_json::from_value(definition.clone()).map_err(|e| ApiError::BadRequest(format!("invalid workflow definition: {e}")))?;
    engine::validate_definition(&parsed)?;
    Ok(())
}

pub async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<db::models::WorkflowRow>>> {
    let workflows = db::repository::workflows::list_workflows(&state.pool, DEFAULT_OWNER_ID).await?;
    Ok(Json(workflows))
}

pub async fn get(Path(id): Path<Uuid>, State(state): State<AppState>) -> ApiResult<Json<db::models::WorkflowRow>> {
    let workflow = db::repository::workflows::get_workflow(&state.pool, id).await?;
    Ok(Json(workflow))
}

pub async fn create(
    State(state): State<AppState>,
    Json(payload): Json<WorkflowDto>,
) -> ApiResult<(StatusCode, Json<db::models::WorkflowRow>)> {
    parse_and_validate(&payload.definition)?;

    let workflow = db::repository::workflows::create_workflow(
        &state.pool,
        DEFAULT_OWNER_ID,
        &payload.name,
        payload.definition,
        payload.notification_email.as_deref(),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(workflow)))
}

pub async fn update(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(payload): Json<WorkflowDto>,
) -> ApiResult<Json<db::models::WorkflowRow>> {
    parse_and_validate(&payload.definition)?;

    let workflow = db::repository::workflows::update_workflow(
        &state.pool,
        id,
        &payload.name,
        payload.definition,
        payload.notification_email.as_deref(),
    )
    .await?;

    Ok(Json(workflow))
}

pub async fn delete(Path(id): Path<Uuid>, State(state): State<AppState>) -> ApiResult<StatusCode> {
    db::repository::workflows::delete_workflow(&state.pool, id).await?;
    Ok(StatusCode::OK)
}

/// Build the repeatable-job payload factory for a workflow's `SCHEDULE`
/// trigger — rebuilt identically on every (re)registration since closures
/// aren't persisted (spec §4.7).
fn schedule_payload_factory(trigger: &db::models::TriggerRow, owner_id: Uuid) -> queue::PayloadFactory {
    let trigger_id = trigger.id;
    let workflow_id = trigger.workflow_id;
    std::sync::Arc::new(move || {
        serde_json::json!({
            "triggerId": trigger_id,
            "workflowId": workflow_id,
            "ownerId": owner_id,
        })
    })
}

pub async fn activate(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> ApiResult<Json<db::models::WorkflowRow>> {
    let workflow = db::repository::workflows::set_active(&state.pool, id, true).await?;

    if let Some(trigger) = db::repository::triggers::get_trigger_for_workflow(&state.pool, id).await? {
        if trigger.trigger_type == "SCHEDULE" {
            let cron = trigger.config.get("cron").and_then(Value::as_str).unwrap_or_default().to_string();
            let timezone = trigger.config.get("timezone").and_then(Value::as_str).map(str::to_string);
            let factory = schedule_payload_factory(&trigger, workflow.owner_id);
            state
                .scheduler
                .upsert_repeatable(&format!("schedule-trigger:{}", trigger.id), "scheduled-execution", &cron, timezone, factory)
                .await?;
        }
    }

    Ok(Json(workflow))
}

pub async fn deactivate(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> ApiResult<Json<db::models::WorkflowRow>> {
    let workflow = db::repository::workflows::set_active(&state.pool, id, false).await?;
    if let Some(trigger) = db::repository::triggers::get_trigger_for_workflow(&state.pool, id).await? {
        state.scheduler.remove_repeatable(&format!("schedule-trigger:{}", trigger.id)).await.ok();
    }
    Ok(Json(workflow))
}

#[derive(Deserialize, Default)]
pub struct TestExecutionDto {
    #[serde(default)]
    pub input: Value,
}

/// Create a one-off execution without a real trigger firing — the `test`
/// button the UI calls (spec §6).
pub async fn test(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    body: Option<Json<TestExecutionDto>>,
) -> ApiResult<(StatusCode, Json<db::models::ExecutionRow>)> {
    db::repository::workflows::get_workflow(&state.pool, id).await?;

    let input = body.map(|Json(dto)| dto.input).unwrap_or(Value::Null);
    let execution = db::repository::executions::create_execution(&state.pool, id, input.clone()).await?;

    state
        .queue
        .enqueue(
            "execute",
            serde_json::json!({ "executionId": execution.id }),
            queue::EnqueueOptions::with_job_id(execution.id.to_string()),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(execution)))
}
