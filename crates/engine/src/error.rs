//! Engine-level error types.

use thiserror::Error;

/// Errors produced by the workflow engine (definition validation +
/// execution-loop infrastructure failures).
///
/// Action failures are *data*, not errors — a failing node is captured as
/// `StepLog{status: error}` / `Execution{status: FAILED}` and never raises
/// out of the orchestrator (spec §7). Only infrastructure problems —
/// invalid definitions rejected at write time, or a database error hit
/// mid-execution — surface through this type.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Two or more nodes share the same ID.
    #[error("duplicate node ID: '{0}'")]
    DuplicateNodeId(String),

    /// An edge references a node ID that doesn't exist in the workflow.
    #[error("edge references unknown node '{node_id}' ({side} side)")]
    UnknownNodeReference { node_id: String, side: &'static str },

    /// No node has in-degree zero — there is no entry point to start from.
    #[error("workflow definition has no root node (every node has an incoming edge)")]
    NoRootNode,

    /// A node names a type with no registered `ExecutableNode`.
    #[error("no implementation registered for node type '{0}'")]
    NodeNotRegistered(String),

    /// A persisted `WorkflowRow.definition` failed to deserialize into
    /// `WorkflowDefinition` — a corrupt or hand-edited row, since the write
    /// path always validates before storing.
    #[error("invalid workflow definition: {0}")]
    InvalidDefinition(String),

    /// Persistence error from the db crate.
    #[error("database error: {0}")]
    Database(#[from] db::DbError),
}
