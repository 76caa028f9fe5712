//! The `httpRequest` node kind.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::action_client::HttpClient;
use crate::traits::{ExecutableNode, ExecutionContext};
use crate::NodeError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HttpRequestData {
    method: String,
    url: String,
    #[serde(default)]
    headers: HashMap<String, String>,
    #[serde(default)]
    body: Option<Value>,
    #[serde(default)]
    credential_id: Option<Uuid>,
}

pub struct HttpRequestNode {
    client: Arc<dyn HttpClient>,
}

impl HttpRequestNode {
    pub fn new(client: Arc<dyn HttpClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ExecutableNode for HttpRequestNode {
    async fn execute(&self, input: Value, ctx: &ExecutionContext) -> Result<Value, NodeError> {
        let data: HttpRequestData = serde_json::from_value(input)
            .map_err(|e| NodeError::Fatal(format!("invalid httpRequest node data: {e}")))?;

        let mut headers = data.headers;

        // A credential lookup failure degrades gracefully here: HTTP auth
        // is optional, so we proceed unauthenticated rather than failing
        // the step (spec §7).
        if let Some(credential_id) = data.credential_id {
            if let Ok(Some(cred)) = ctx.credentials.get(credential_id).await {
                if let Some(token) = cred.get("token") {
                    headers
                        .entry("Authorization".to_string())
                        .or_insert_with(|| format!("Bearer {token}"));
                }
            }
        }

        self.client
            .request(&data.method, &data.url, &headers, data.body.as_ref())
            .await
    }
}
