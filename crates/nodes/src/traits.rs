//! The `ExecutableNode` trait — the contract every node must fulfil.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::cancellation::CancellationToken;
use crate::credentials::{CredentialLookup, NoCredentials};
use crate::NodeError;

/// Shared services passed to every node during execution.
///
/// Defined here (in the nodes crate) so both the engine and individual node
/// implementations can import it without a circular dependency. This is the
/// `engineServices` handle spec §4.4 refers to for I/O-bound node kinds;
/// pure nodes (condition, transform) and trigger pass-throughs ignore most
/// of it.
#[derive(Clone)]
pub struct ExecutionContext {
    /// ID of the parent workflow.
    pub workflow_id: uuid::Uuid,
    /// ID of the current execution run.
    pub execution_id: uuid::Uuid,
    /// The trigger payload this execution was started with.
    pub input: Value,
    /// The live accumulated execution context (`{trigger: …, nodeId: output, …}`),
    /// as of just before this node runs. Most nodes never touch it — it
    /// exists for `transform`'s typed (non-stringifying) dot-path mode.
    pub context: Value,
    /// Decrypted secrets scoped to this workflow (flat string map, for nodes
    /// that only need simple lookups).
    pub secrets: std::collections::HashMap<String, String>,
    /// Credential store lookup, used by HTTP/email/Telegram/DB/AI nodes.
    pub credentials: Arc<dyn CredentialLookup>,
    /// Cooperative cancellation signal, observed between retry attempts.
    pub cancellation: CancellationToken,
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("workflow_id", &self.workflow_id)
            .field("execution_id", &self.execution_id)
            .field("input", &self.input)
            .finish_non_exhaustive()
    }
}

impl ExecutionContext {
    /// Build a minimal context for tests — no credentials wired, no
    /// cancellation pending.
    pub fn for_test(workflow_id: uuid::Uuid, execution_id: uuid::Uuid, input: Value) -> Self {
        Self {
            workflow_id,
            execution_id,
            context: serde_json::json!({ "trigger": input }),
            input,
            secrets: Default::default(),
            credentials: Arc::new(NoCredentials),
            cancellation: CancellationToken::new(),
        }
    }
}

/// The core node trait.
///
/// All built-in nodes and WASM plugins must implement this. Adding a new
/// node kind requires only a new registration (see `crate::registry`) — this
/// trait, and the step executor that dispatches through it, are closed to
/// modification.
#[async_trait]
pub trait ExecutableNode: Send + Sync {
    /// Execute the node, receive the already-template-resolved node `data`
    /// as `input`, and return this node's JSON output.
    async fn execute(
        &self,
        input: Value,
        ctx: &ExecutionContext,
    ) -> Result<Value, NodeError>;
}
