//! Execution Orchestrator (spec §4.8) — the job handler for both `execute`
//! (from an ingress adapter) and `scheduled-execution` (from the
//! scheduler). Owns the execution state machine end to end: init context,
//! traverse, persist step logs, honour condition skip-sets, finalise
//! status, and fan out progress events.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde_json::Value;
use tracing::{info, instrument, trace, warn};
use uuid::Uuid;

use db::models::WorkflowRow;
use db::DbPool;
use nodes::action_client::EmailClient;
use nodes::cancellation::CancellationToken;
use nodes::credentials::CredentialLookup;
use nodes::registry::NodeRegistry;

use crate::dag::{nodes_to_skip, topological_order};
use crate::executor::execute_step;
use crate::models::WorkflowDefinition;
use crate::progress::{ProgressBus, ProgressEvent};
use crate::EngineError;

/// The shared, process-wide services every orchestrator run dispatches
/// through. Built once in `cli worker` and handed to every job.
pub struct OrchestratorServices {
    pub pool: DbPool,
    pub registry: Arc<NodeRegistry>,
    pub credentials: Arc<dyn CredentialLookup>,
    pub progress: Arc<ProgressBus>,
    /// Used for the "dispatch error email if workflow.notificationEmail is
    /// set" step (spec §4.8). `None` degrades to a logged no-op — the
    /// concrete email side effect is an external collaborator either way.
    pub notifier: Option<Arc<dyn EmailClient>>,
}

/// Payload of an `"execute"` job (spec §4.6/§4.10): the execution already
/// exists in `PENDING` status, created by the ingress adapter.
#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteJobPayload {
    pub execution_id: Uuid,
}

/// Payload of a `"scheduled-execution"` job (spec §4.7).
#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledExecutionPayload {
    pub trigger_id: Uuid,
    pub workflow_id: Uuid,
    #[serde(default)]
    pub owner_id: Option<Uuid>,
    #[serde(default)]
    pub is_scheduled: bool,
}

/// Handle an `"execute"` job: the execution row already exists.
#[instrument(skip(services, cancellation), fields(execution_id = %payload.execution_id))]
pub async fn run_execute_job(
    services: &OrchestratorServices,
    payload: ExecuteJobPayload,
    cancellation: CancellationToken,
) -> Result<(), EngineError> {
    let execution = db::repository::executions::get_execution(&services.pool, payload.execution_id).await?;
    let workflow = db::repository::workflows::get_workflow(&services.pool, execution.workflow_id).await?;
    run_execution(services, &workflow, execution.id, execution.input, cancellation).await
}

/// Handle a `"scheduled-execution"` job (spec §4.8): reload the workflow
/// first; a missing or inactive workflow is a benign no-op (no `Execution`
/// row is created), matching spec's "returns a benign failure without
/// creating an execution".
#[instrument(skip(services, cancellation), fields(workflow_id = %payload.workflow_id))]
pub async fn run_scheduled_execution_job(
    services: &OrchestratorServices,
    payload: ScheduledExecutionPayload,
    cancellation: CancellationToken,
) -> Result<(), EngineError> {
    let workflow = match db::repository::workflows::get_workflow(&services.pool, payload.workflow_id).await {
        Ok(wf) => wf,
        Err(db::DbError::NotFound) => {
            info!("scheduled workflow no longer exists; skipping fire");
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };

    if !workflow.is_active {
        info!("scheduled workflow is inactive; skipping fire");
        return Ok(());
    }

    let trigger_input = serde_json::json!({
        "triggerId": payload.trigger_id,
        "workflowId": payload.workflow_id,
        "ownerId": payload.owner_id,
        "isScheduled": true,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    let execution = db::repository::executions::create_execution(&services.pool, workflow.id, trigger_input.clone()).await?;
    run_execution(services, &workflow, execution.id, trigger_input, cancellation).await
}

/// The state machine and loop of spec §4.8, shared by both job kinds once
/// an `Execution(PENDING)` row exists.
async fn run_execution(
    services: &OrchestratorServices,
    workflow: &WorkflowRow,
    execution_id: Uuid,
    input: Value,
    cancellation: CancellationToken,
) -> Result<(), EngineError> {
    let definition: WorkflowDefinition = serde_json::from_value(workflow.definition.clone())
        .map_err(|e| EngineError::InvalidDefinition(e.to_string()))?;

    db::repository::executions::mark_running(&services.pool, execution_id).await?;
    let started_at = chrono::Utc::now();
    services.progress.publish(
        execution_id,
        ProgressEvent::ExecutionStart {
            execution_id,
            workflow_id: workflow.id,
            workflow_name: workflow.name.clone(),
            started_at,
        },
    );

    let order = topological_order(&definition);
    let mut context = serde_json::json!({ "trigger": input.clone() });
    let mut skip_set: HashSet<String> = HashSet::new();
    let mut last_output = input.clone();
    let nodes_by_id: HashMap<&str, &crate::models::Node> =
        definition.nodes.iter().map(|n| (n.id.as_str(), n)).collect();
    let total = order.len().max(1);

    for (i, ordered) in order.iter().enumerate() {
        if cancellation.is_cancelled() {
            let error = "Execution cancelled by user".to_string();
            db::repository::executions::mark_failed(&services.pool, execution_id, &error).await?;
            let total_duration_ms = (chrono::Utc::now() - started_at).num_milliseconds();
            services.progress.publish(
                execution_id,
                ProgressEvent::ExecutionComplete {
                    execution_id,
                    workflow_id: workflow.id,
                    status: "FAILED".into(),
                    output: None,
                    error: Some(error),
                    finished_at: chrono::Utc::now(),
                    total_duration_ms,
                },
            );
            services.progress.close(execution_id);
            return Ok(());
        }

        let Some(node) = nodes_by_id.get(ordered.id.as_str()) else { continue };
        let node_name = node.id.clone();

        if skip_set.contains(&ordered.id) {
            db::repository::step_logs::insert_step_log(
                &services.pool,
                execution_id,
                &ordered.id,
                &node_name,
                "skipped",
                None,
                None,
                None,
                Some(0),
                None,
            )
            .await?;
            services.progress.publish(
                execution_id,
                ProgressEvent::StepComplete {
                    execution_id,
                    node_id: ordered.id.clone(),
                    node_name: node_name.clone(),
                    status: "skipped".into(),
                    output: None,
                    error: None,
                    duration_ms: Some(0),
                    retry_attempts: None,
                },
            );
            continue;
        }

        let step_input = if crate::models::is_trigger_kind(&ordered.node_type) {
            Some(input.clone())
        } else if let Some(first_dep) = ordered.depends_on.first() {
            context.get(first_dep).cloned().or_else(|| Some(context.clone()))
        } else {
            Some(context.clone())
        };

        db::repository::step_logs::insert_step_log(
            &services.pool,
            execution_id,
            &ordered.id,
            &node_name,
            "running",
            step_input,
            None,
            None,
            None,
            None,
        )
        .await?;
        services.progress.publish(
            execution_id,
            ProgressEvent::StepStart {
                execution_id,
                node_id: ordered.id.clone(),
                node_name: node_name.clone(),
                status: "running",
            },
        );

        let exec_ctx = nodes::traits::ExecutionContext {
            workflow_id: workflow.id,
            execution_id,
            input: input.clone(),
            context: context.clone(),
            secrets: HashMap::new(),
            credentials: Arc::clone(&services.credentials),
            cancellation: cancellation.clone(),
        };

        let result = execute_step(&services.registry, node, &exec_ctx).await;

        let status = if result.success { "success" } else { "error" };
        db::repository::step_logs::insert_step_log(
            &services.pool,
            execution_id,
            &ordered.id,
            &node_name,
            status,
            None,
            result.output.clone(),
            result.error.as_deref(),
            Some(result.duration_ms),
            Some(result.retry_attempts as i32),
        )
        .await?;
        services.progress.publish(
            execution_id,
            ProgressEvent::StepComplete {
                execution_id,
                node_id: ordered.id.clone(),
                node_name: node_name.clone(),
                status: status.into(),
                output: result.output.clone(),
                error: result.error.clone(),
                duration_ms: Some(result.duration_ms),
                retry_attempts: Some(result.retry_attempts as i32),
            },
        );

        if !result.success {
            let error = result.error.unwrap_or_else(|| "unknown error".to_string());
            db::repository::executions::mark_failed(&services.pool, execution_id, &error).await?;
            let total_duration_ms = (chrono::Utc::now() - started_at).num_milliseconds();
            services.progress.publish(
                execution_id,
                ProgressEvent::ExecutionComplete {
                    execution_id,
                    workflow_id: workflow.id,
                    status: "FAILED".into(),
                    output: None,
                    error: Some(error.clone()),
                    finished_at: chrono::Utc::now(),
                    total_duration_ms,
                },
            );
            notify_failure(services, workflow, execution_id, &error).await;
            services.progress.close(execution_id);
            return Ok(());
        }

        if let Some(output) = result.output.clone() {
            context[&ordered.id] = output.clone();
            last_output = output.clone();

            if ordered.node_type == "condition" {
                if let Some(branch_result) = output.get("result").and_then(Value::as_bool) {
                    skip_set.extend(nodes_to_skip(&ordered.id, branch_result, &definition));
                }
            }
        }

        let progress_pct = ((i + 1) as f64 / total as f64) * 100.0;
        trace!(execution_id = %execution_id, progress_pct, "execution progressed");
    }

    db::repository::executions::mark_success(&services.pool, execution_id, last_output.clone()).await?;
    let total_duration_ms = (chrono::Utc::now() - started_at).num_milliseconds();
    services.progress.publish(
        execution_id,
        ProgressEvent::ExecutionComplete {
            execution_id,
            workflow_id: workflow.id,
            status: "SUCCESS".into(),
            output: Some(last_output),
            error: None,
            finished_at: chrono::Utc::now(),
            total_duration_ms,
        },
    );
    services.progress.close(execution_id);

    Ok(())
}

async fn notify_failure(services: &OrchestratorServices, workflow: &WorkflowRow, execution_id: Uuid, error: &str) {
    let Some(email) = workflow.notification_email.as_deref() else { return };
    let Some(notifier) = services.notifier.as_ref() else {
        warn!(execution_id = %execution_id, "workflow has a notification email but no email client is configured");
        return;
    };

    let subject = format!("Workflow '{}' failed", workflow.name);
    let body = format!("Execution {execution_id} failed: {error}");
    if let Err(err) = notifier.send(email, &subject, &body).await {
        warn!(execution_id = %execution_id, %err, "failed to send execution-failure notification email");
    }
}
