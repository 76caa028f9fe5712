//! The `databaseQuery` node kind.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use crate::action_client::DatabaseClient;
use crate::traits::{ExecutableNode, ExecutionContext};
use crate::NodeError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DatabaseQueryData {
    query: String,
    #[serde(default)]
    credential_id: Option<Uuid>,
}

pub struct DatabaseQueryNode {
    client: Arc<dyn DatabaseClient>,
}

impl DatabaseQueryNode {
    pub fn new(client: Arc<dyn DatabaseClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ExecutableNode for DatabaseQueryNode {
    async fn execute(&self, input: Value, ctx: &ExecutionContext) -> Result<Value, NodeError> {
        let data: DatabaseQueryData = serde_json::from_value(input)
            .map_err(|e| NodeError::Fatal(format!("invalid databaseQuery node data: {e}")))?;

        // The connection credential is mandatory (spec §7).
        match data.credential_id {
            Some(credential_id) => match ctx.credentials.get(credential_id).await {
                Ok(Some(_)) => {}
                Ok(None) => {
                    return Err(NodeError::Fatal(format!(
                        "database credential '{credential_id}' not found"
                    )))
                }
                Err(_) => return Err(NodeError::Fatal("Failed to decrypt data".into())),
            },
            None => return Err(NodeError::Fatal("databaseQuery requires a credentialId".into())),
        }

        self.client.query(&data.query).await
    }
}
