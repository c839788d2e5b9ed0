//! # flowbn-fuzzy
//!
//! Fuzzy-logic estimation of adversary success likelihood per MITRE
//! ATT&CK tactic.
//!
//! Each tactic owns a fixed Mamdani-style rule set over a small, static
//! set of named posture parameters (attacker skill, defender monitoring,
//! exposure, and so on, all on a 0–100 scale). Evaluation clamps the
//! supplied parameters, fires the tactic's rules (AND = min), aggregates
//! clipped consequents (max), and defuzzifies by centroid over the 0–100
//! universe. The crisp value is then graded against five overlapping
//! triangular success terms and renormalized into a probability vector
//! ordered `[VeryLow, Low, Medium, High, VeryHigh]`.
//!
//! The parameter schema per tactic is declared statically. Callers query
//! [`TacticEvaluator::default_params`] instead of introspecting rule
//! internals, and parameters a tactic does not consume are silently
//! ignored.

pub mod eval;
pub mod rules;
pub mod tactic;

pub use eval::{FuzzyError, TacticEvaluator, MEMBERSHIP_STATES, NEUTRAL_SCALAR};
pub use rules::{RuleSet, Trimf};
pub use tactic::Tactic;
