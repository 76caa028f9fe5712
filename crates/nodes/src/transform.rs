//! The `transform` node kind — a pure, no-I/O data reshaper.
//!
//! `data.expression` is either:
//! - a bare dot-path (`trigger.items.0.name`) — resolved with its JSON
//!   type preserved (`detectExpressionType` → `"jsonpath"`), or
//! - anything else — resolved as an ordinary template string, which
//!   stringifies the substituted values (`"expression"` mode).
//!
//! There is no third, executable mode: the legacy source's `"javascript"`
//! classification named a real `eval` path that has no place here — see
//! `DESIGN.md`.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::template::{is_bare_path, resolve_path, resolve_str};
use crate::traits::{ExecutableNode, ExecutionContext};
use crate::NodeError;

#[derive(Debug, Deserialize)]
struct TransformData {
    expression: String,
}

#[derive(Debug, Default)]
pub struct TransformNode;

#[async_trait]
impl ExecutableNode for TransformNode {
    async fn execute(&self, input: Value, ctx: &ExecutionContext) -> Result<Value, NodeError> {
        let data: TransformData = serde_json::from_value(input)
            .map_err(|e| NodeError::Fatal(format!("invalid transform node data: {e}")))?;

        if is_bare_path(&data.expression) {
            Ok(resolve_path(&data.expression, &ctx.context))
        } else {
            Ok(Value::String(resolve_str(&data.expression, &ctx.context)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    fn ctx_with(context: Value) -> ExecutionContext {
        let mut c = ExecutionContext::for_test(Uuid::new_v4(), Uuid::new_v4(), json!({}));
        c.context = context;
        c
    }

    #[tokio::test]
    async fn jsonpath_mode_preserves_type() {
        let ctx = ctx_with(json!({ "trigger": { "x": 42 } }));
        let out = TransformNode
            .execute(json!({ "expression": "trigger.x" }), &ctx)
            .await
            .unwrap();
        assert_eq!(out, json!(42));
    }

    #[tokio::test]
    async fn expression_mode_stringifies() {
        let ctx = ctx_with(json!({ "trigger": { "x": 42 } }));
        let out = TransformNode
            .execute(json!({ "expression": "value: {{trigger.x}}" }), &ctx)
            .await
            .unwrap();
        assert_eq!(out, json!("value: 42"));
    }
}
