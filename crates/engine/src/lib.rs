//! `engine` crate — core domain models, DAG traversal, per-node execution,
//! the execution orchestrator, and the in-process progress bus.

pub mod models;
pub mod error;
pub mod dag;
pub mod executor;
pub mod progress;
pub mod orchestrator;

pub use models::{Edge, Node, RetryConfig, WorkflowDefinition};
pub use error::EngineError;
pub use dag::{nodes_to_skip, topological_order, validate_definition, OrderedNode};
pub use executor::{execute_step, StepResult};
pub use progress::{ProgressBus, ProgressEvent};
pub use orchestrator::{
    run_execute_job, run_scheduled_execution_job, ExecuteJobPayload, OrchestratorServices, ScheduledExecutionPayload,
};
