//! Trigger node kinds — `webhookTrigger`, `scheduleTrigger`, `emailTrigger`.
//!
//! Triggers never run as a "step" in the ordinary sense: they are the
//! ingress point for the execution's input. Registered as pass-through
//! actions so the step executor can treat them uniformly with every other
//! node — they simply hand back the trigger payload captured in the
//! execution context.

use async_trait::async_trait;
use serde_json::Value;

use crate::traits::{ExecutableNode, ExecutionContext};
use crate::NodeError;

macro_rules! passthrough_trigger {
    ($name:ident) => {
        #[derive(Debug, Default)]
        pub struct $name;

        #[async_trait]
        impl ExecutableNode for $name {
            async fn execute(&self, _input: Value, ctx: &ExecutionContext) -> Result<Value, NodeError> {
                Ok(ctx.input.clone())
            }
        }
    };
}

passthrough_trigger!(WebhookTrigger);
passthrough_trigger!(ScheduleTrigger);
passthrough_trigger!(EmailTrigger);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    #[tokio::test]
    async fn webhook_trigger_passes_through_input() {
        let ctx = ExecutionContext::for_test(Uuid::new_v4(), Uuid::new_v4(), json!({"x": 1}));
        let out = WebhookTrigger.execute(Value::Null, &ctx).await.unwrap();
        assert_eq!(out, json!({"x": 1}));
    }
}
