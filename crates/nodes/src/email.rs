//! The `sendEmail` node kind.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use crate::action_client::EmailClient;
use crate::traits::{ExecutableNode, ExecutionContext};
use crate::NodeError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendEmailData {
    to: String,
    subject: String,
    body: String,
    #[serde(default)]
    credential_id: Option<Uuid>,
}

pub struct SendEmailNode {
    client: Arc<dyn EmailClient>,
}

impl SendEmailNode {
    pub fn new(client: Arc<dyn EmailClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ExecutableNode for SendEmailNode {
    async fn execute(&self, input: Value, ctx: &ExecutionContext) -> Result<Value, NodeError> {
        let data: SendEmailData = serde_json::from_value(input)
            .map_err(|e| NodeError::Fatal(format!("invalid sendEmail node data: {e}")))?;

        // The email credential is mandatory: a lookup failure is a fatal
        // ActionFailure, not a silent degrade (spec §7).
        if let Some(credential_id) = data.credential_id {
            match ctx.credentials.get(credential_id).await {
                Ok(Some(_)) => {}
                Ok(None) => {
                    return Err(NodeError::Fatal(format!(
                        "email credential '{credential_id}' not found"
                    )))
                }
                Err(_) => return Err(NodeError::Fatal("Failed to decrypt data".into())),
            }
        } else {
            return Err(NodeError::Fatal("sendEmail requires a credentialId".into()));
        }

        self.client.send(&data.to, &data.subject, &data.body).await
    }
}
