//! Builds the default node-type → `ExecutableNode` registry.
//!
//! Adding a new node kind only requires inserting a new entry here; nothing
//! else in the engine needs to change (spec §4.4 / §9).

use std::collections::HashMap;
use std::sync::Arc;

use crate::action_client::{AiClient, DatabaseClient, EmailClient, HttpClient, NotConfigured, TelegramClient};
use crate::ai::AiRequestNode;
use crate::condition::ConditionNode;
use crate::database::DatabaseQueryNode;
use crate::email::SendEmailNode;
use crate::http::HttpRequestNode;
use crate::telegram::SendTelegramNode;
use crate::traits::ExecutableNode;
use crate::transform::TransformNode;
use crate::triggers::{EmailTrigger, ScheduleTrigger, WebhookTrigger};

/// The concrete clients each I/O-bound node dispatches through. Defaults to
/// `NotConfigured` stubs so a registry can always be built, even in tests
/// or before the surrounding deployment wires real integrations in.
pub struct ClientBundle {
    pub http: Arc<dyn HttpClient>,
    pub email: Arc<dyn EmailClient>,
    pub telegram: Arc<dyn TelegramClient>,
    pub database: Arc<dyn DatabaseClient>,
    pub ai: Arc<dyn AiClient>,
}

impl Default for ClientBundle {
    fn default() -> Self {
        Self {
            http: Arc::new(NotConfigured),
            email: Arc::new(NotConfigured),
            telegram: Arc::new(NotConfigured),
            database: Arc::new(NotConfigured),
            ai: Arc::new(NotConfigured),
        }
    }
}

pub type NodeRegistry = HashMap<String, Arc<dyn ExecutableNode>>;

/// Build the registry of every built-in node kind named in spec §3.
pub fn build(clients: ClientBundle) -> NodeRegistry {
    let mut registry: NodeRegistry = HashMap::new();

    registry.insert("webhookTrigger".into(), Arc::new(WebhookTrigger));
    registry.insert("scheduleTrigger".into(), Arc::new(ScheduleTrigger));
    registry.insert("emailTrigger".into(), Arc::new(EmailTrigger));

    registry.insert("condition".into(), Arc::new(ConditionNode));
    registry.insert("transform".into(), Arc::new(TransformNode));

    registry.insert("httpRequest".into(), Arc::new(HttpRequestNode::new(clients.http)));
    registry.insert("sendEmail".into(), Arc::new(SendEmailNode::new(clients.email)));
    registry.insert("sendTelegram".into(), Arc::new(SendTelegramNode::new(clients.telegram)));
    registry.insert("databaseQuery".into(), Arc::new(DatabaseQueryNode::new(clients.database)));
    registry.insert("aiRequest".into(), Arc::new(AiRequestNode::new(clients.ai)));

    registry
}

/// `true` for the three trigger kinds — the orchestrator treats these
/// specially when recording a `StepLog`'s input snapshot (spec §4.8).
pub fn is_trigger_kind(node_type: &str) -> bool {
    matches!(node_type, "webhookTrigger" | "scheduleTrigger" | "emailTrigger")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_covers_every_spec_node_kind() {
        let registry = build(ClientBundle::default());
        for kind in [
            "webhookTrigger",
            "scheduleTrigger",
            "emailTrigger",
            "condition",
            "transform",
            "httpRequest",
            "sendEmail",
            "sendTelegram",
            "databaseQuery",
            "aiRequest",
        ] {
            assert!(registry.contains_key(kind), "missing registration for {kind}");
        }
    }
}
