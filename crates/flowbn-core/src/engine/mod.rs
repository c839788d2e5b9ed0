//! The compilation engine for flowbn.
//!
//! This module provides:
//! - **errors**: Error types for compilation failures
//! - **graph**: Attack-flow extraction into adjacency maps
//! - **recommend**: Per-node structural treatment recommendations
//! - **grouping**: Partition, divorce, and logic group materialization
//! - **cpt**: Mixed-radix CPT row decoding and normalization helpers
//! - **synth**: Network synthesis from groups and fuzzy memberships
//! - **layout**: Layered BFS positioning of synthesized variables

pub mod cpt;
pub mod errors;
pub mod graph;
pub mod grouping;
pub mod layout;
pub mod recommend;
pub mod synth;
