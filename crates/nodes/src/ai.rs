//! The `aiRequest` node kind.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use crate::action_client::AiClient;
use crate::traits::{ExecutableNode, ExecutionContext};
use crate::NodeError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AiRequestData {
    prompt: String,
    #[serde(default)]
    system_prompt: Option<String>,
    #[serde(default)]
    output_schema: Option<Value>,
    #[serde(default)]
    temperature: Option<f64>,
    #[serde(default)]
    max_tokens: Option<u32>,
    #[serde(default)]
    credential_id: Option<Uuid>,
}

pub struct AiRequestNode {
    client: Arc<dyn AiClient>,
}

impl AiRequestNode {
    pub fn new(client: Arc<dyn AiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ExecutableNode for AiRequestNode {
    async fn execute(&self, input: Value, ctx: &ExecutionContext) -> Result<Value, NodeError> {
        let data: AiRequestData = serde_json::from_value(input)
            .map_err(|e| NodeError::Fatal(format!("invalid aiRequest node data: {e}")))?;

        // The API key credential is mandatory (spec §7).
        match data.credential_id {
            Some(credential_id) => match ctx.credentials.get(credential_id).await {
                Ok(Some(_)) => {}
                Ok(None) => {
                    return Err(NodeError::Fatal(format!(
                        "AI credential '{credential_id}' not found"
                    )))
                }
                Err(_) => return Err(NodeError::Fatal("Failed to decrypt data".into())),
            },
            None => return Err(NodeError::Fatal("aiRequest requires a credentialId".into())),
        }

        self.client
            .complete(
                &data.prompt,
                data.system_prompt.as_deref(),
                data.output_schema.as_ref(),
                data.temperature,
                data.max_tokens,
            )
            .await
    }
}
