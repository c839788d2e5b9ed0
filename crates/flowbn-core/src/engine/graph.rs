//! Attack-flow extraction.
//!
//! Turns a raw scenario graph into deduplicated adjacency maps keyed by
//! node id. Extraction is tolerant: self-loops and edges referencing
//! unknown nodes are skipped with a warning rather than failing the
//! whole compilation. Only nodes that participate in at least one kept
//! edge become model variables downstream.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::engine::errors::CompileError;

/// Kind of a scenario-graph node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Action,
    Condition,
    Operator,
    Asset,
    #[serde(other)]
    Other,
}

/// Combination semantics declared on an operator node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicKind {
    And,
    Or,
    #[serde(other)]
    Unknown,
}

/// One node of the input scenario graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowNode {
    pub id: String,
    pub kind: NodeKind,
    #[serde(default)]
    pub tactic_id: Option<String>,
    #[serde(default)]
    pub technique_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Only meaningful on operator nodes.
    #[serde(default)]
    pub logic: Option<LogicKind>,
}

/// One directed edge of the input scenario graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowEdge {
    pub source: String,
    pub target: String,
}

/// The raw scenario graph as supplied by callers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlowGraph {
    #[serde(default)]
    pub nodes: Vec<FlowNode>,
    #[serde(default)]
    pub edges: Vec<FlowEdge>,
}

/// Deduplicated adjacency view of a flow, the input to every later
/// compilation phase.
#[derive(Debug)]
pub struct ExtractedGraph {
    nodes: FxHashMap<String, FlowNode>,
    /// Kept edges in first-appearance order, deduplicated.
    pub edges: Vec<(String, String)>,
    parent_map: FxHashMap<String, Vec<String>>,
    child_map: FxHashMap<String, Vec<String>>,
    /// Node ids participating in at least one kept edge, in
    /// first-appearance order.
    pub used_ids: Vec<String>,
    /// Operator nodes that declared combination logic.
    pub logic_nodes: FxHashMap<String, LogicKind>,
}

impl ExtractedGraph {
    pub fn node(&self, id: &str) -> Option<&FlowNode> {
        self.nodes.get(id)
    }

    /// Parents of `id` in first-appearance order.
    pub fn parents_of(&self, id: &str) -> &[String] {
        self.parent_map.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Children of `id` in first-appearance order.
    pub fn children_of(&self, id: &str) -> &[String] {
        self.child_map.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Display name of a node: explicit name, then technique id, then
    /// the raw node id.
    pub fn display_name<'a>(&'a self, id: &'a str) -> &'a str {
        match self.nodes.get(id) {
            Some(node) => node
                .name
                .as_deref()
                .or(node.technique_id.as_deref())
                .unwrap_or(id),
            None => id,
        }
    }
}

/// Extracts adjacency maps from a raw flow.
///
/// Fails only when the flow carries no nodes or no edges; malformed
/// individual edges are skipped with a warning.
pub fn extract(flow: &FlowGraph) -> Result<ExtractedGraph, CompileError> {
    if flow.nodes.is_empty() {
        return Err(CompileError::EmptyGraph("flow has no nodes"));
    }
    if flow.edges.is_empty() {
        return Err(CompileError::EmptyGraph("flow has no edges"));
    }

    let mut nodes = FxHashMap::default();
    for node in &flow.nodes {
        if nodes.insert(node.id.clone(), node.clone()).is_some() {
            warn!(id = %node.id, "duplicate node id, keeping the last definition");
        }
    }

    let mut edges: Vec<(String, String)> = Vec::with_capacity(flow.edges.len());
    let mut parent_map: FxHashMap<String, Vec<String>> = FxHashMap::default();
    let mut child_map: FxHashMap<String, Vec<String>> = FxHashMap::default();
    let mut used_ids: Vec<String> = Vec::new();

    for edge in &flow.edges {
        if edge.source == edge.target {
            warn!(id = %edge.source, "skipping self-loop edge");
            continue;
        }
        if !nodes.contains_key(&edge.source) || !nodes.contains_key(&edge.target) {
            warn!(source = %edge.source, target = %edge.target, "skipping edge with unknown endpoint");
            continue;
        }
        let pair = (edge.source.clone(), edge.target.clone());
        if edges.contains(&pair) {
            continue;
        }

        let parents = parent_map.entry(edge.target.clone()).or_default();
        if !parents.contains(&edge.source) {
            parents.push(edge.source.clone());
        }
        let children = child_map.entry(edge.source.clone()).or_default();
        if !children.contains(&edge.target) {
            children.push(edge.target.clone());
        }
        for id in [&edge.source, &edge.target] {
            if !used_ids.iter().any(|u| u == id) {
                used_ids.push(id.clone());
            }
        }
        edges.push(pair);
    }

    if edges.is_empty() {
        return Err(CompileError::EmptyGraph("flow has no usable edges"));
    }

    // Conditions combine their parents just like operators do; a
    // missing declaration means unknown logic, not no logic.
    let logic_nodes = used_ids
        .iter()
        .filter_map(|id| {
            let node = &nodes[id];
            match node.kind {
                NodeKind::Operator | NodeKind::Condition => {
                    Some((id.clone(), node.logic.unwrap_or(LogicKind::Unknown)))
                }
                _ => None,
            }
        })
        .collect();

    Ok(ExtractedGraph {
        nodes,
        edges,
        parent_map,
        child_map,
        used_ids,
        logic_nodes,
    })
}
