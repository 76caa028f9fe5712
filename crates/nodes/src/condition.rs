//! The `condition` node kind — a pure, no-I/O boolean gate.
//!
//! By the time `execute` runs, the step executor has already template
//! resolved `data.expression` against the execution context (§4.1), so
//! this only has to parse and evaluate the literal expression (§4.2).

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::expression::evaluate;
use crate::traits::{ExecutableNode, ExecutionContext};
use crate::NodeError;

#[derive(Debug, Deserialize)]
struct ConditionData {
    expression: String,
}

#[derive(Debug, Default)]
pub struct ConditionNode;

#[async_trait]
impl ExecutableNode for ConditionNode {
    async fn execute(&self, input: Value, _ctx: &ExecutionContext) -> Result<Value, NodeError> {
        let data: ConditionData = serde_json::from_value(input)
            .map_err(|e| NodeError::Fatal(format!("invalid condition node data: {e}")))?;

        let result = evaluate(&data.expression);
        Ok(json!({ "result": result }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn evaluates_resolved_expression() {
        let ctx = ExecutionContext::for_test(Uuid::new_v4(), Uuid::new_v4(), Value::Null);
        let out = ConditionNode
            .execute(json!({ "expression": "200 === 200" }), &ctx)
            .await
            .unwrap();
        assert_eq!(out, json!({ "result": true }));
    }

    #[tokio::test]
    async fn invalid_data_is_fatal() {
        let ctx = ExecutionContext::for_test(Uuid::new_v4(), Uuid::new_v4(), Value::Null);
        let err = ConditionNode.execute(json!({}), &ctx).await.unwrap_err();
        assert!(matches!(err, NodeError::Fatal(_)));
    }
}
