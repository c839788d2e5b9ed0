//! # flowbn-model
//!
//! Probabilistic network definitions produced by the flowbn compiler and
//! handed to an external exact-inference engine.
//!
//! This crate deliberately knows nothing about attack flows or fuzzy logic:
//! it is the boundary contract. A [`Network`] is an ordered sequence of
//! variable creations, an arc list, and a flat conditional probability
//! table (CPT) per variable, plus cosmetic annotations (display name,
//! description, 2D layout rectangle).
//!
//! ## CPT row ordering
//!
//! For a variable with parents `p1..pk` of cardinalities `c1..ck` in
//! arc-insertion order, row `r` decodes to the parent-state tuple
//! `(r mod c1, (r / c1) mod c2, ...)`: the first-listed parent is the
//! least-significant digit of a mixed-radix number. Every row is a
//! probability vector over this variable's own states.

pub mod errors;
pub mod network;

pub use errors::ModelError;
pub use network::{Network, Rect, StateSpace, Variable, VariableKind, PROB_TOLERANCE};
