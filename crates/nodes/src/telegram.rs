//! The `sendTelegram` node kind.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use crate::action_client::TelegramClient;
use crate::traits::{ExecutableNode, ExecutionContext};
use crate::NodeError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendTelegramData {
    chat_id: String,
    message: String,
    #[serde(default)]
    credential_id: Option<Uuid>,
}

pub struct SendTelegramNode {
    client: Arc<dyn TelegramClient>,
}

impl SendTelegramNode {
    pub fn new(client: Arc<dyn TelegramClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ExecutableNode for SendTelegramNode {
    async fn execute(&self, input: Value, ctx: &ExecutionContext) -> Result<Value, NodeError> {
        let data: SendTelegramData = serde_json::from_value(input)
            .map_err(|e| NodeError::Fatal(format!("invalid sendTelegram node data: {e}")))?;

        // Mandatory credential (the bot token) — decrypt/lookup failure is
        // a fatal ActionFailure, not a graceful degrade (spec §7).
        if let Some(credential_id) = data.credential_id {
            match ctx.credentials.get(credential_id).await {
                Ok(Some(_)) => {}
                Ok(None) => {
                    return Err(NodeError::Fatal(format!(
                        "telegram credential '{credential_id}' not found"
                    )))
                }
                Err(_) => return Err(NodeError::Fatal("Failed to decrypt data".into())),
            }
        } else {
            return Err(NodeError::Fatal("sendTelegram requires a credentialId".into()));
        }

        self.client.send_message(&data.chat_id, &data.message).await
    }
}
