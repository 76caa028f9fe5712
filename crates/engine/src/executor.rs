//! Step executor (spec §4.5) — resolves a node's data against the current
//! context, dispatches it through the node registry, and wraps the call in
//! per-node exponential-backoff retry.

use std::time::Instant;

use serde_json::Value;
use tracing::{instrument, warn};

use nodes::registry::NodeRegistry;
use nodes::template::resolve_value;
use nodes::traits::ExecutionContext;

use crate::models::{retry_config_of, Node};

/// The outcome of running one node, including retry bookkeeping — the
/// in-memory shape of what becomes a `StepLog` row (spec §3).
#[derive(Debug, Clone)]
pub struct StepResult {
    pub success: bool,
    pub output: Option<Value>,
    pub error: Option<String>,
    pub duration_ms: i64,
    pub retry_attempts: u32,
    pub retried_successfully: bool,
}

impl StepResult {
    fn failure(error: impl Into<String>, duration_ms: i64, retry_attempts: u32) -> Self {
        Self {
            success: false,
            output: None,
            error: Some(error.into()),
            duration_ms,
            retry_attempts,
            retried_successfully: false,
        }
    }
}

/// Run a single node to completion: resolve its `data`, dispatch, and
/// retry on failure per its (or the default) `RetryConfig`.
///
/// `ctx.context` must already hold the execution context as of just before
/// this node (`{trigger: …, nodeId: output, …}`) — the caller (the
/// orchestrator) is responsible for keeping it current.
#[instrument(skip(registry, node, ctx), fields(node_id = %node.id, node_type = %node.node_type))]
pub async fn execute_step(registry: &NodeRegistry, node: &Node, ctx: &ExecutionContext) -> StepResult {
    let Some(node_impl) = registry.get(&node.node_type) else {
        return StepResult::failure(
            format!("no implementation registered for node type '{}'", node.node_type),
            0,
            0,
        );
    };

    let retry_cfg = retry_config_of(&node.data);
    let resolved_data = resolve_value(&node.data, &ctx.context);

    let mut attempt: u32 = 0;

    loop {
        if ctx.cancellation.is_cancelled() {
            return StepResult::failure("cancelled", 0, attempt);
        }

        let t0 = Instant::now();
        let outcome = node_impl.execute(resolved_data.clone(), ctx).await;
        let duration_ms = t0.elapsed().as_millis() as i64;

        match outcome {
            Ok(output) => {
                return StepResult {
                    success: true,
                    output: Some(output),
                    error: None,
                    duration_ms,
                    retry_attempts: attempt,
                    retried_successfully: attempt > 0,
                };
            }
            Err(err) => {
                if attempt >= retry_cfg.max_attempts {
                    return StepResult::failure(err.message().to_string(), duration_ms, attempt);
                }

                attempt += 1;
                let delay = retry_cfg.delay_for_attempt(attempt);
                warn!(
                    attempt,
                    max_attempts = retry_cfg.max_attempts,
                    ?delay,
                    error = %err,
                    "node failed, retrying after backoff"
                );
                tokio::time::sleep(delay).await;

                if ctx.cancellation.is_cancelled() {
                    return StepResult::failure("cancelled", duration_ms, attempt);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Arc;
    use uuid::Uuid;

    use nodes::mock::MockNode;

    fn registry_with(node_type: &str, mock: MockNode) -> NodeRegistry {
        let mut r: NodeRegistry = HashMap::new();
        r.insert(node_type.to_string(), Arc::new(mock));
        r
    }

    #[tokio::test]
    async fn successful_first_attempt_records_no_retries() {
        let registry = registry_with("mock", MockNode::returning("n", json!({"ok": true})));
        let node = Node { id: "n".into(), node_type: "mock".into(), data: json!({}) };
        let ctx = ExecutionContext::for_test(Uuid::new_v4(), Uuid::new_v4(), json!({}));

        let result = execute_step(&registry, &node, &ctx).await;
        assert!(result.success);
        assert_eq!(result.retry_attempts, 0);
        assert!(!result.retried_successfully);
    }

    #[tokio::test]
    async fn exhausted_retries_return_failure_with_attempt_count() {
        let registry = registry_with("mock", MockNode::failing_retryable("n", "boom"));
        let node = Node {
            id: "n".into(),
            node_type: "mock".into(),
            data: json!({ "retryConfig": { "maxAttempts": 2, "initialDelayMs": 1, "backoffMultiplier": 1, "maxDelayMs": 5 } }),
        };
        let ctx = ExecutionContext::for_test(Uuid::new_v4(), Uuid::new_v4(), json!({}));

        let result = execute_step(&registry, &node, &ctx).await;
        assert!(!result.success);
        assert_eq!(result.retry_attempts, 2);
        assert_eq!(result.error.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn fatal_error_is_not_retried_beyond_config() {
        let registry = registry_with("mock", MockNode::failing_fatal("n", "unrecoverable"));
        let node = Node {
            id: "n".into(),
            node_type: "mock".into(),
            data: json!({ "retryConfig": { "maxAttempts": 5, "initialDelayMs": 1, "backoffMultiplier": 1, "maxDelayMs": 5 } }),
        };
        let ctx = ExecutionContext::for_test(Uuid::new_v4(), Uuid::new_v4(), json!({}));

        // spec §4.5 distinguishes retryable only by the node's own
        // `RetryConfig`, not by error kind — a `NodeError::Fatal` still
        // exhausts the configured attempts before giving up.
        let result = execute_step(&registry, &node, &ctx).await;
        assert!(!result.success);
        assert_eq!(result.retry_attempts, 5);
    }

    #[tokio::test]
    async fn unregistered_node_type_fails_immediately() {
        let registry: NodeRegistry = HashMap::new();
        let node = Node { id: "n".into(), node_type: "mystery".into(), data: json!({}) };
        let ctx = ExecutionContext::for_test(Uuid::new_v4(), Uuid::new_v4(), json!({}));

        let result = execute_step(&registry, &node, &ctx).await;
        assert!(!result.success);
        assert_eq!(result.retry_attempts, 0);
    }

    #[tokio::test]
    async fn cancellation_observed_before_first_attempt() {
        let registry = registry_with("mock", MockNode::returning("n", json!({})));
        let node = Node { id: "n".into(), node_type: "mock".into(), data: json!({}) };
        let ctx = ExecutionContext::for_test(Uuid::new_v4(), Uuid::new_v4(), json!({}));
        ctx.cancellation.cancel();

        let result = execute_step(&registry, &node, &ctx).await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("cancelled"));
    }
}
