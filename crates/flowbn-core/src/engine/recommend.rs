//! Structural treatment recommendations.
//!
//! Each node used by the flow receives a recommendation: partition its
//! parents when fan-in is high, divorce its children when fan-out is
//! high, and honor declared operator logic. Recommendations are advisory
//! inputs to grouping; logic always takes precedence over partitioning
//! there.

use serde::Serialize;

use crate::engine::graph::{ExtractedGraph, LogicKind};

/// Fan-in at or above which a node's parents are partitioned.
pub const PARTITION_FAN_IN: usize = 3;

/// Fan-out at or above which a node's children are divorced behind a hub.
pub const DIVORCE_FAN_OUT: usize = 3;

/// The treatments recommended for one node.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct RecommendedActions {
    pub partition: bool,
    pub divorce: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logic: Option<LogicKind>,
}

/// A node id paired with its recommended treatments.
#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub node_id: String,
    pub actions: RecommendedActions,
    pub parent_count: usize,
    pub child_count: usize,
}

/// Recommends treatments in extraction order.
///
/// Only nodes meeting at least one trigger appear; partition and divorce
/// are independent and may both fire on the same node.
pub fn recommend(extracted: &ExtractedGraph) -> Vec<Recommendation> {
    extracted
        .used_ids
        .iter()
        .filter_map(|id| {
            let parent_count = extracted.parents_of(id).len();
            let child_count = extracted.children_of(id).len();
            let logic = extracted.logic_nodes.get(id.as_str()).copied();
            // Partition is recorded whenever the fan-in trigger fires;
            // grouping gives logic precedence when both apply.
            let actions = RecommendedActions {
                partition: parent_count >= PARTITION_FAN_IN,
                divorce: child_count >= DIVORCE_FAN_OUT,
                logic,
            };
            if !actions.partition && !actions.divorce && actions.logic.is_none() {
                return None;
            }
            Some(Recommendation {
                node_id: id.clone(),
                actions,
                parent_count,
                child_count,
            })
        })
        .collect()
}
