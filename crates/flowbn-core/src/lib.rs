//! # flowbn-core
//!
//! Compilation engine turning attack-flow scenario graphs into
//! probabilistic networks.
//!
//! The pipeline runs in fixed phases:
//! 1. extract the raw flow into parent/child adjacency (`engine::graph`)
//! 2. recommend structural treatments per node (`engine::recommend`)
//! 3. materialize partition, divorce, and logic groups (`engine::grouping`)
//! 4. synthesize variables, gates, and CPTs (`engine::synth`)
//! 5. assign a layered layout (`engine::layout`)

pub mod config;
pub mod engine;

pub use config::{CompileConfig, SemanticBucket};
pub use engine::errors::CompileError;
pub use engine::graph::{FlowGraph, FlowNode, LogicKind, NodeKind};
pub use engine::grouping::{Groups, LogicOp};
pub use engine::recommend::Recommendation;

use flowbn_model::Network;

/// Result of compiling one attack flow.
#[derive(Debug)]
pub struct CompiledModel {
    /// The synthesized probabilistic network.
    pub network: Network,
    /// Per-node structural recommendations that drove synthesis.
    pub recommendations: Vec<Recommendation>,
    /// The materialized groups behind gates and hubs.
    pub groups: Groups,
}

/// Compiles an attack flow into a probabilistic network.
///
/// # Arguments
/// * `flow` - the scenario graph to compile
/// * `config` - grouping and fuzzy-parameter knobs
///
/// # Returns
/// The compiled network with every variable carrying either a CPT or
/// noisy-max strengths, plus the recommendations and groups that shaped
/// it.
pub fn compile(flow: &FlowGraph, config: &CompileConfig) -> Result<CompiledModel, CompileError> {
    let extracted = engine::graph::extract(flow)?;
    let recommendations = engine::recommend::recommend(&extracted);
    let groups = engine::grouping::compute_groups(&extracted, &recommendations, config);
    let mut network = engine::synth::synthesize(&extracted, &groups, config)?;
    engine::layout::assign_layout(&mut network)?;
    Ok(CompiledModel {
        network,
        recommendations,
        groups,
    })
}
