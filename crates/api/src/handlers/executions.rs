//! Execution read/control surface (spec §6): paginated listing, detail
//! with step logs, replay, cancel, and aggregate stats.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use db::repository::executions::ExecutionFilter;
use engine::ProgressEvent;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListExecutionsQuery {
    pub workflow_id: Option<Uuid>,
    pub status: Option<String>,
    pub started_after: Option<DateTime<Utc>>,
    pub started_before: Option<DateTime<Utc>>,
    pub skip: Option<i64>,
    pub take: Option<i64>,
}

pub async fn list(
    Query(query): Query<ListExecutionsQuery>,
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<db::models::ExecutionRow>>> {
    let filter = ExecutionFilter {
        workflow_id: query.workflow_id,
        status: query.status,
        started_after: query.started_after,
        started_before: query.started_before,
        skip: query.skip.unwrap_or(0).max(0),
        take: query.take.unwrap_or(50).clamp(1, 500),
    };

    let executions = db::repository::executions::list_executions_filtered(&state.pool, &filter).await?;
    Ok(Json(executions))
}

#[derive(Serialize)]
pub struct ExecutionDetail {
    #[serde(flatten)]
    pub execution: db::models::ExecutionRow,
    pub step_logs: Vec<db::models::StepLogRow>,
}

pub async fn get(Path(id): Path<Uuid>, State(state): State<AppState>) -> ApiResult<Json<ExecutionDetail>> {
    let execution = db::repository::executions::get_execution(&state.pool, id).await?;
    let step_logs = db::repository::step_logs::list_latest_step_logs(&state.pool, id).await?;
    Ok(Json(ExecutionDetail { execution, step_logs }))
}

pub async fn replay(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> ApiResult<(StatusCode, Json<db::models::ExecutionRow>)> {
    let previous = db::repository::executions::get_execution(&state.pool, id).await?;
    let execution =
        db::repository::executions::create_execution(&state.pool, previous.workflow_id, previous.input).await?;

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

pub async fn cancel(Path(id): Path<Uuid>, State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let execution = db::repository::executions::get_execution(&state.pool, id).await?;

    match execution.status.as_str() {
        "PENDING" => {
            state.queue.remove_job(&id.to_string()).await?;
            db::repository::executions::mark_failed(&state.pool, id, "Execution cancelled by user").await?;
            state.progress.publish(
                id,
                ProgressEvent::ExecutionComplete {
                    execution_id: id,
                    workflow_id: execution.workflow_id,
                    status: "FAILED".into(),
                    output: None,
                    error: Some("Execution cancelled by user".into()),
                    finished_at: Utc::now(),
                    total_duration_ms: 0,
                },
            );
            state.progress.close(id);
        }
        "RUNNING" => match state.queue.cancellation_token(&id.to_string()) {
            Some(token) => token.cancel(),
            None => return Err(ApiError::BadRequest("execution is not currently running on any worker".into())),
        },
        other => {
            return Err(ApiError::BadRequest(format!("cannot cancel execution in terminal state '{other}'")));
        }
    }

    Ok(Json(serde_json::json!({ "success": true })))
}

#[derive(Serialize)]
pub struct ExecutionStatsEntry {
    pub status: String,
    pub count: i64,
    pub avg_duration_seconds: Option<f64>,
}

pub async fn stats(State(state): State<AppState>) -> ApiResult<Json<Vec<ExecutionStatsEntry>>> {
    let rows = db::repository::executions::global_execution_stats(&state.pool).await?;
    let entries = rows
        .into_iter()
        .map(|r| ExecutionStatsEntry {
            status: r.status,
            count: r.count,
            avg_duration_seconds: r.avg_duration_seconds,
        })
        .collect();
    Ok(Json(entries))
}
