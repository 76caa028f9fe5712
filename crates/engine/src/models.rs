//! Core domain models for the workflow engine (spec §3).
//!
//! These are the in-memory shapes the DAG traverser and step executor walk.
//! They round-trip through the JSONB `definition` column of the `workflows`
//! table (`db::models::WorkflowRow::definition`).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A complete workflow graph: nodes, edges, and optional named variables.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WorkflowDefinition {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub variables: HashMap<String, String>,
}

/// A single step in the workflow graph.
///
/// `node_type` dispatches through `nodes::registry::NodeRegistry`; `data`
/// is type-specific configuration resolved against the execution context
/// before dispatch (spec §4.1) and may additionally carry a `retryConfig`
/// object honored by the step executor (spec §4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub data: Value,
}

/// Directed edge from one node to another.
///
/// `source_handle` partitions a `condition` node's outgoing edges into the
/// true-branch (`"true"`), false-branch (`"false"`), or default (`None`)
/// group (spec §3 / §4.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default, rename = "sourceHandle")]
    pub source_handle: Option<String>,
}

/// Per-node retry configuration (spec §4.5). Absent on a node's `data`
/// means the default — no retries.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RetryConfig {
    #[serde(default)]
    pub max_attempts: u32,
    #[serde(default = "RetryConfig::default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "RetryConfig::default_backoff_multiplier")]
    pub backoff_multiplier: f64,
    #[serde(default = "RetryConfig::default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl RetryConfig {
    fn default_initial_delay_ms() -> u64 {
        1000
    }
    fn default_backoff_multiplier() -> f64 {
        2.0
    }
    fn default_max_delay_ms() -> u64 {
        30_000
    }

    /// The delay before the `attempt`-th retry (1-based), per spec §4.5:
    /// `min(initialDelayMs * backoffMultiplier^(attempt-1), maxDelayMs)`.
    pub fn delay_for_attempt(&self, attempt: u32) -> std::time::Duration {
        let exp = self.backoff_multiplier.powi((attempt.saturating_sub(1)) as i32);
        let millis = (self.initial_delay_ms as f64 * exp).min(self.max_delay_ms as f64);
        std::time::Duration::from_millis(millis.max(0.0) as u64)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 0,
            initial_delay_ms: Self::default_initial_delay_ms(),
            backoff_multiplier: Self::default_backoff_multiplier(),
            max_delay_ms: Self::default_max_delay_ms(),
        }
    }
}

/// Extract a node's `retryConfig` from its raw (pre-resolution) `data`,
/// falling back to the default (no retries) when absent or malformed.
pub fn retry_config_of(data: &Value) -> RetryConfig {
    data.get("retryConfig")
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or_default()
}

/// The three trigger node kinds named in spec §3. The orchestrator treats
/// these specially when recording a `StepLog`'s input snapshot, and they
/// never have predecessors in a well-formed definition.
pub fn is_trigger_kind(node_type: &str) -> bool {
    nodes::registry::is_trigger_kind(node_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_delay_backs_off_and_caps() {
        let cfg = RetryConfig {
            max_attempts: 5,
            initial_delay_ms: 100,
            backoff_multiplier: 2.0,
            max_delay_ms: 300,
        };
        assert_eq!(cfg.delay_for_attempt(1).as_millis(), 100);
        assert_eq!(cfg.delay_for_attempt(2).as_millis(), 200);
        assert_eq!(cfg.delay_for_attempt(3).as_millis(), 300); // would be 400, capped
        assert_eq!(cfg.delay_for_attempt(4).as_millis(), 300);
    }

    #[test]
    fn retry_config_defaults_to_no_retries() {
        let cfg = retry_config_of(&serde_json::json!({}));
        assert_eq!(cfg, RetryConfig::default());
        assert_eq!(cfg.max_attempts, 0);
    }

    #[test]
    fn retry_config_parsed_from_node_data() {
        let cfg = retry_config_of(&serde_json::json!({
            "retryConfig": { "maxAttempts": 3, "initialDelayMs": 10, "backoffMultiplier": 2, "maxDelayMs": 1000 }
        }));
        assert_eq!(cfg.max_attempts, 3);
        assert_eq!(cfg.initial_delay_ms, 10);
    }
}
