//! Graph traversal — topological ordering and condition-branch skip sets
//! (spec §4.3).
//!
//! Two separate concerns live here, deliberately not unified:
//! - [`validate_definition`] enforces the *write-time* invariants (unique
//!   node ids, edges referencing real nodes, at least one root) — called
//!   from the workflow create/update handlers, never from the hot
//!   execution path.
//! - [`topological_order`] is what the orchestrator calls on every run. It
//!   must not depend on `validate_definition` having run (spec §9: "an
//!   integrity check at write time is recommended but the engine must not
//!   depend on it") — a cycle is tolerated by logging a warning and
//!   silently dropping the unreached nodes, never by erroring.

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::warn;

use crate::models::{Edge, WorkflowDefinition};
use crate::EngineError;

/// One node in execution order, with its direct predecessors (the incoming
/// edges' sources — not a spanning tree) per spec §4.3.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderedNode {
    pub id: String,
    pub node_type: String,
    pub depends_on: Vec<String>,
}

/// Validate the structural invariants of a workflow definition (spec §3).
/// Intended for the write path (workflow create/update); the orchestrator
/// does not call this.
pub fn validate_definition(def: &WorkflowDefinition) -> Result<(), EngineError> {
    let mut seen: HashSet<&str> = HashSet::new();
    for node in &def.nodes {
        if !seen.insert(node.id.as_str()) {
            return Err(EngineError::DuplicateNodeId(node.id.clone()));
        }
    }

    let node_set: HashSet<&str> = def.nodes.iter().map(|n| n.id.as_str()).collect();
    for edge in &def.edges {
        if !node_set.contains(edge.source.as_str()) {
            return Err(EngineError::UnknownNodeReference {
                node_id: edge.source.clone(),
                side: "source",
            });
        }
        if !node_set.contains(edge.target.as_str()) {
            return Err(EngineError::UnknownNodeReference {
                node_id: edge.target.clone(),
                side: "target",
            });
        }
    }

    if !def.nodes.is_empty() {
        let mut has_incoming: HashSet<&str> = HashSet::new();
        for edge in &def.edges {
            has_incoming.insert(edge.target.as_str());
        }
        if def.nodes.iter().all(|n| has_incoming.contains(n.id.as_str())) {
            return Err(EngineError::NoRootNode);
        }
    }

    Ok(())
}

/// Topologically order the definition's nodes (Kahn's algorithm), tolerant
/// of malformed input: edges pointing at unknown nodes are ignored, and a
/// cycle simply leaves the unreachable tail out of the result (logged).
pub fn topological_order(def: &WorkflowDefinition) -> Vec<OrderedNode> {
    let node_set: HashSet<&str> = def.nodes.iter().map(|n| n.id.as_str()).collect();

    let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
    let mut in_degree: HashMap<&str, usize> = HashMap::new();
    let mut depends_on: HashMap<&str, Vec<String>> = HashMap::new();

    for node in &def.nodes {
        adjacency.entry(node.id.as_str()).or_default();
        in_degree.entry(node.id.as_str()).or_insert(0);
        depends_on.entry(node.id.as_str()).or_default();
    }

    for edge in &def.edges {
        if !node_set.contains(edge.source.as_str()) || !node_set.contains(edge.target.as_str()) {
            continue;
        }
        adjacency.entry(edge.source.as_str()).or_default().push(edge.target.as_str());
        *in_degree.entry(edge.target.as_str()).or_insert(0) += 1;
        depends_on.entry(edge.target.as_str()).or_default().push(edge.source.clone());
    }

    // Seed with in-degree-0 nodes, in definition order for determinism.
    let mut queue: VecDeque<&str> = def
        .nodes
        .iter()
        .map(|n| n.id.as_str())
        .filter(|id| in_degree.get(id).copied().unwrap_or(0) == 0)
        .collect();

    let node_type_of: HashMap<&str, &str> =
        def.nodes.iter().map(|n| (n.id.as_str(), n.node_type.as_str())).collect();

    let mut order: Vec<OrderedNode> = Vec::with_capacity(def.nodes.len());

    while let Some(id) = queue.pop_front() {
        order.push(OrderedNode {
            id: id.to_string(),
            node_type: node_type_of.get(id).copied().unwrap_or("").to_string(),
            depends_on: depends_on.get(id).cloned().unwrap_or_default(),
        });

        if let Some(neighbours) = adjacency.get(id) {
            for &next in neighbours {
                let deg = in_degree.entry(next).or_insert(0);
                *deg = deg.saturating_sub(1);
                if *deg == 0 {
                    queue.push_back(next);
                }
            }
        }
    }

    if order.len() != def.nodes.len() {
        warn!(
            visited = order.len(),
            total = def.nodes.len(),
            "workflow graph contains a cycle; unreached nodes dropped"
        );
    }

    order
}

/// Every node reachable from `start`, including `start` itself.
///
/// Spec §4.3 defines `descendants(v)` as "every node reachable from v via
/// any edge" without settling whether `v` itself counts. We resolve that
/// ambiguity reflexively (see DESIGN.md): this is what makes a condition's
/// immediately-dropped branch target actually land in the skip set for the
/// simple non-diamond case (spec §8 scenario 2), while the diamond-merge
/// subtraction (scenario 6) still works because a merge node is reachable
/// from the keep branch too.
fn reachable_inclusive(start: &str, def: &WorkflowDefinition) -> HashSet<String> {
    let mut seen = HashSet::new();
    seen.insert(start.to_string());
    let mut queue = VecDeque::new();
    queue.push_back(start.to_string());

    while let Some(current) = queue.pop_front() {
        for edge in &def.edges {
            if edge.source == current && seen.insert(edge.target.clone()) {
                queue.push_back(edge.target.clone());
            }
        }
    }

    seen
}

/// Compute the set of nodes that must be marked `skipped` because they lie
/// only on the dropped branch of a condition node (spec §4.3).
pub fn nodes_to_skip(condition_node_id: &str, result: bool, def: &WorkflowDefinition) -> HashSet<String> {
    let active = result.to_string();
    let inactive = (!result).to_string();

    let outgoing: Vec<&Edge> = def.edges.iter().filter(|e| e.source == condition_node_id).collect();

    let mut keep: Vec<&Edge> = outgoing
        .iter()
        .copied()
        .filter(|e| e.source_handle.as_deref() == Some(active.as_str()))
        .collect();
    if keep.is_empty() {
        keep = outgoing.iter().copied().filter(|e| e.source_handle.is_none()).collect();
    }
    let drop: Vec<&Edge> = outgoing
        .iter()
        .copied()
        .filter(|e| e.source_handle.as_deref() == Some(inactive.as_str()))
        .collect();

    let mut skip_set: HashSet<String> = HashSet::new();
    for edge in &drop {
        skip_set.extend(reachable_inclusive(&edge.target, def));
    }
    for edge in &keep {
        for node in reachable_inclusive(&edge.target, def) {
            skip_set.remove(&node);
        }
    }

    skip_set
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Node;

    fn node(id: &str) -> Node {
        Node { id: id.into(), node_type: "mock".into(), data: serde_json::Value::Null }
    }

    fn edge(id: &str, source: &str, target: &str, handle: Option<&str>) -> Edge {
        Edge {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            source_handle: handle.map(str::to_string),
        }
    }

    #[test]
    fn linear_definition_orders_and_tracks_dependencies() {
        let def = WorkflowDefinition {
            nodes: vec![node("a"), node("b"), node("c")],
            edges: vec![edge("e1", "a", "b", None), edge("e2", "b", "c", None)],
            variables: Default::default(),
        };
        let order = topological_order(&def);
        let ids: Vec<&str> = order.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(order[2].depends_on, vec!["b".to_string()]);
    }

    #[test]
    fn diamond_definition_orders_root_first_merge_last() {
        let def = WorkflowDefinition {
            nodes: vec![node("a"), node("b"), node("c"), node("d")],
            edges: vec![
                edge("e1", "a", "b", None),
                edge("e2", "a", "c", None),
                edge("e3", "b", "d", None),
                edge("e4", "c", "d", None),
            ],
            variables: Default::default(),
        };
        let order = topological_order(&def);
        assert_eq!(order.first().unwrap().id, "a");
        assert_eq!(order.last().unwrap().id, "d");
        assert_eq!(order.len(), 4);
    }

    #[test]
    fn cycle_is_tolerated_and_drops_unreached_nodes() {
        let def = WorkflowDefinition {
            nodes: vec![node("a"), node("b"), node("c")],
            edges: vec![
                edge("e1", "a", "b", None),
                edge("e2", "b", "c", None),
                edge("e3", "c", "a", None),
            ],
            variables: Default::default(),
        };
        let order = topological_order(&def);
        assert!(order.is_empty()); // every node has an incoming edge
    }

    #[test]
    fn validate_definition_rejects_duplicate_ids() {
        let def = WorkflowDefinition {
            nodes: vec![node("a"), node("a")],
            edges: vec![],
            variables: Default::default(),
        };
        assert!(matches!(validate_definition(&def), Err(EngineError::DuplicateNodeId(id)) if id == "a"));
    }

    #[test]
    fn validate_definition_rejects_unknown_edge_endpoint() {
        let def = WorkflowDefinition {
            nodes: vec![node("a")],
            edges: vec![edge("e1", "a", "ghost", None)],
            variables: Default::default(),
        };
        assert!(matches!(
            validate_definition(&def),
            Err(EngineError::UnknownNodeReference { node_id, .. }) if node_id == "ghost"
        ));
    }

    #[test]
    fn validate_definition_rejects_no_root() {
        let def = WorkflowDefinition {
            nodes: vec![node("a"), node("b")],
            edges: vec![edge("e1", "a", "b", None), edge("e2", "b", "a", None)],
            variables: Default::default(),
        };
        assert!(matches!(validate_definition(&def), Err(EngineError::NoRootNode)));
    }

    // --- condition branch skipping (spec §4.3 / §8 scenarios 2 and 6) ---

    #[test]
    fn simple_true_branch_skips_false_target() {
        // T -> C -> A (true), C -> B (false)
        let def = WorkflowDefinition {
            nodes: vec![node("t"), node("c"), node("a"), node("b")],
            edges: vec![
                edge("e1", "t", "c", None),
                edge("e2", "c", "a", Some("true")),
                edge("e3", "c", "b", Some("false")),
            ],
            variables: Default::default(),
        };
        let skip = nodes_to_skip("c", true, &def);
        assert_eq!(skip, HashSet::from(["b".to_string()]));
    }

    #[test]
    fn diamond_merge_is_not_skipped() {
        // T -> C -> A (true) -> M ; C -> B (false) -> M
        let def = WorkflowDefinition {
            nodes: vec![node("t"), node("c"), node("a"), node("b"), node("m")],
            edges: vec![
                edge("e1", "t", "c", None),
                edge("e2", "c", "a", Some("true")),
                edge("e3", "c", "b", Some("false")),
                edge("e4", "a", "m", None),
                edge("e5", "b", "m", None),
            ],
            variables: Default::default(),
        };
        let skip = nodes_to_skip("c", true, &def);
        assert_eq!(skip, HashSet::from(["b".to_string()]));
        assert!(!skip.contains("m"));
    }

    #[test]
    fn no_matching_handle_falls_back_to_default_edges() {
        let def = WorkflowDefinition {
            nodes: vec![node("c"), node("d")],
            edges: vec![edge("e1", "c", "d", None)],
            variables: Default::default(),
        };
        let skip = nodes_to_skip("c", true, &def);
        assert!(skip.is_empty());
    }
}
