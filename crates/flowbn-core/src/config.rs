//! Compilation configuration.

use rustc_hash::FxHashMap;

use crate::engine::grouping::LogicOp;

/// Semantic key used to bucket parents before partitioning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SemanticBucket {
    /// Bucket by MITRE ATT&CK tactic identifier.
    TacticId,
    /// Bucket by ATT&CK technique identifier.
    TechniqueId,
    /// No semantic affinity; chunk parents in insertion order only.
    None,
}

/// Knobs controlling one compilation run.
#[derive(Debug, Clone)]
pub struct CompileConfig {
    /// Maximum parents per partition group and maximum group count.
    pub max_group_size: usize,
    /// Affinity key for grouping parents of high fan-in nodes.
    pub bucket: SemanticBucket,
    /// Combination semantics applied to operators whose logic is unknown.
    pub unknown_logic: LogicOp,
    /// Per-node fuzzy parameter overrides, keyed by node id then
    /// parameter name. Values are clamped to 0..=100 at evaluation.
    pub fuzzy_overrides: FxHashMap<String, FxHashMap<String, f64>>,
}

impl Default for CompileConfig {
    fn default() -> Self {
        Self {
            max_group_size: 3,
            bucket: SemanticBucket::TacticId,
            unknown_logic: LogicOp::Or,
            fuzzy_overrides: FxHashMap::default(),
        }
    }
}

impl CompileConfig {
    pub fn with_max_group_size(mut self, size: usize) -> Self {
        self.max_group_size = size.max(1);
        self
    }
}
