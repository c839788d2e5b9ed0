//! Group materialization.
//!
//! Converts recommendations into concrete structures:
//! - partition groups split a high fan-in node's parents into chunks
//!   with semantic affinity, each fed through an intermediate gate
//! - divorce groups route a high fan-out node's children behind a hub
//! - logic groups record operator semantics, resolving unknown logic
//!   through the configured default
//!
//! Logic takes precedence over partitioning: an operator's parents are
//! never split, no matter the fan-in.

use serde::Serialize;

use crate::config::{CompileConfig, SemanticBucket};
use crate::engine::graph::{ExtractedGraph, LogicKind};
use crate::engine::recommend::Recommendation;

/// Resolved combination semantics of an operator node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicOp {
    And,
    Or,
}

impl LogicOp {
    /// Resolves declared logic, mapping `Unknown` to the configured
    /// default.
    pub fn resolve(kind: LogicKind, unknown_default: LogicOp) -> LogicOp {
        match kind {
            LogicKind::And => LogicOp::And,
            LogicKind::Or => LogicOp::Or,
            LogicKind::Unknown => unknown_default,
        }
    }
}

/// Parents of one node split into gate-sized chunks.
#[derive(Debug, Clone, Serialize)]
pub struct PartitionGroup {
    pub node_id: String,
    pub groups: Vec<Vec<String>>,
}

/// Children of one node routed behind a divorce hub.
#[derive(Debug, Clone, Serialize)]
pub struct DivorceGroup {
    pub node_id: String,
    pub children: Vec<String>,
}

/// An operator node with resolved logic over its parents.
#[derive(Debug, Clone, Serialize)]
pub struct LogicGroup {
    pub node_id: String,
    pub op: LogicOp,
    pub parents: Vec<String>,
}

/// Every materialized group of one compilation run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Groups {
    pub partitions: Vec<PartitionGroup>,
    pub divorces: Vec<DivorceGroup>,
    pub logics: Vec<LogicGroup>,
}

/// Materializes groups from recommendations.
pub fn compute_groups(
    extracted: &ExtractedGraph,
    recommendations: &[Recommendation],
    config: &CompileConfig,
) -> Groups {
    let mut groups = Groups::default();
    for rec in recommendations {
        if let Some(kind) = rec.actions.logic {
            groups.logics.push(LogicGroup {
                node_id: rec.node_id.clone(),
                op: LogicOp::resolve(kind, config.unknown_logic),
                parents: extracted.parents_of(&rec.node_id).to_vec(),
            });
        } else if rec.actions.partition {
            groups.partitions.push(PartitionGroup {
                node_id: rec.node_id.clone(),
                groups: partition_parents(
                    extracted,
                    extracted.parents_of(&rec.node_id),
                    config.max_group_size,
                    config.bucket,
                ),
            });
        }
        if rec.actions.divorce {
            groups.divorces.push(DivorceGroup {
                node_id: rec.node_id.clone(),
                children: extracted.children_of(&rec.node_id).to_vec(),
            });
        }
    }
    groups
}

fn bucket_key<'a>(
    extracted: &'a ExtractedGraph,
    id: &str,
    bucket: SemanticBucket,
) -> &'a str {
    let node = match extracted.node(id) {
        Some(n) => n,
        None => return "UNKNOWN",
    };
    let key = match bucket {
        SemanticBucket::TacticId => node.tactic_id.as_deref(),
        SemanticBucket::TechniqueId => node.technique_id.as_deref(),
        SemanticBucket::None => None,
    };
    key.unwrap_or("UNKNOWN")
}

/// Splits `parents` into at most `max_size` groups of at most
/// `max_size` members each.
///
/// Parents sharing a semantic key stay adjacent: each key bucket is
/// chunked in insertion order, then the two smallest groups are merged
/// repeatedly until the group count fits. Every parent appears in
/// exactly one group.
pub fn partition_parents(
    extracted: &ExtractedGraph,
    parents: &[String],
    max_size: usize,
    bucket: SemanticBucket,
) -> Vec<Vec<String>> {
    let max_size = max_size.max(1);

    // Insertion-ordered buckets keyed by semantic affinity.
    let mut buckets: Vec<(&str, Vec<String>)> = Vec::new();
    for parent in parents {
        let key = bucket_key(extracted, parent, bucket);
        match buckets.iter_mut().find(|(k, _)| *k == key) {
            Some((_, members)) => members.push(parent.clone()),
            None => buckets.push((key, vec![parent.clone()])),
        }
    }

    let mut groups: Vec<Vec<String>> = Vec::new();
    for (_, members) in buckets {
        for chunk in members.chunks(max_size) {
            groups.push(chunk.to_vec());
        }
    }

    // Merge the two smallest groups until the count fits.
    while groups.len() > max_size {
        groups.sort_by_key(Vec::len);
        let mut merged = groups.remove(0);
        let second = groups.remove(0);
        merged.extend(second);
        groups.push(merged);
    }
    groups
}
