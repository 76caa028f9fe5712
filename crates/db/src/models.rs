//! Row structs that map 1-to-1 onto database tables.
//!
//! These are *persistence* models — they carry no business logic. Domain
//! types (the in-memory `Workflow`/`Node`/`Edge` shapes the engine walks)
//! live in the `engine` crate and round-trip through `WorkflowRow.definition`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// workflows
// ---------------------------------------------------------------------------

/// A persisted workflow row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WorkflowRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub is_active: bool,
    /// Full JSON `WorkflowDefinition` (nodes, edges, variables).
    pub definition: serde_json::Value,
    pub notification_email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// triggers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TriggerRow {
    pub id: Uuid,
    pub workflow_id: Uuid,
    /// "WEBHOOK" | "SCHEDULE" | "EMAIL"
    pub trigger_type: String,
    /// Type-specific config: `{secret?, token}`, `{cron, timezone?}`, `{address}`.
    pub config: serde_json::Value,
    /// Webhook token / email local-part token. `None` for schedule triggers.
    pub token: Option<String>,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// credentials
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CredentialRow {
    pub id: Uuid,
    pub workflow_id: Uuid,
    pub name: String,
    /// `"iv:authTag:ciphertext"`, all base64 — see `crate::crypto`.
    pub encrypted_data: String,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// executions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Success,
    Failed,
    Paused,
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
            Self::Paused => "PAUSED",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for ExecutionStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "RUNNING" => Ok(Self::Running),
            "SUCCESS" => Ok(Self::Success),
            "FAILED" => Ok(Self::Failed),
            "PAUSED" => Ok(Self::Paused),
            other => Err(format!("unknown execution status: {other}")),
        }
    }
}

/// A persisted execution row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ExecutionRow {
    pub id: Uuid,
    pub workflow_id: Uuid,
    pub status: String,
    pub input: serde_json::Value,
    pub output: Option<serde_json::Value>,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// step_logs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Running,
    Success,
    Error,
    Skipped,
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Success => "success",
            Self::Error => "error",
            Self::Skipped => "skipped",
        };
        write!(f, "{s}")
    }
}

/// A persisted step-log row. At most one *live* (latest-by-`created_at`)
/// row is authoritative per `(execution_id, node_id)` (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StepLogRow {
    pub id: Uuid,
    pub execution_id: Uuid,
    pub node_id: String,
    pub node_name: String,
    pub status: String,
    pub input: Option<serde_json::Value>,
    pub output: Option<serde_json::Value>,
    pub error: Option<String>,
    pub duration_ms: Option<i64>,
    pub retry_attempts: Option<i32>,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// job_queue
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    DeadLettered,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::DeadLettered => "dead_lettered",
        };
        write!(f, "{s}")
    }
}

/// A job row fetched from the durable queue table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobRow {
    pub id: Uuid,
    pub job_id: Option<String>,
    pub job_name: String,
    pub payload: serde_json::Value,
    pub status: String,
    pub attempts: i32,
    pub max_attempts: i32,
    /// The retry backoff policy this job was enqueued with (spec §4.6
    /// `EnqueueOptions.backoff`), persisted per-row so a worker's retry
    /// delay honors the caller's policy rather than a single global one.
    pub backoff_initial_ms: i64,
    pub backoff_multiplier: f64,
    pub backoff_max_ms: i64,
    pub run_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// repeatable_jobs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RepeatableJobRow {
    pub key: String,
    pub job_name: String,
    pub cron_pattern: String,
    pub timezone: Option<String>,
    pub last_fired_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
