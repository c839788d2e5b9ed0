//! Mamdani evaluation of tactic rule sets.
//!
//! - rule activation is the minimum grade over its antecedents
//! - each consequent term is clipped at its activation, aggregation is max
//! - the crisp output is the centroid over the integer universe 0..=100
//! - the crisp output is graded against the five success terms and
//!   renormalized into a probability vector

use rustc_hash::FxHashMap;

use crate::rules::{rule_set_for, RuleSet, Trimf};
use crate::tactic::Tactic;

/// Success-likelihood state labels, lowest to highest.
pub const MEMBERSHIP_STATES: [&str; 5] = ["very_low", "low", "medium", "high", "very_high"];

/// Crisp value used when no rule fires for the supplied parameters.
pub const NEUTRAL_SCALAR: f64 = 50.0;

/// Triangular terms of the success-likelihood output variable.
const OUTPUT_TERMS: [Trimf; 5] = [
    Trimf::new(0.0, 0.0, 20.0),
    Trimf::new(10.0, 25.0, 40.0),
    Trimf::new(30.0, 50.0, 70.0),
    Trimf::new(60.0, 75.0, 90.0),
    Trimf::new(80.0, 100.0, 100.0),
];

/// Errors raised during fuzzy evaluation.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum FuzzyError {
    /// No rule produced a nonzero activation, so the aggregated output
    /// surface is empty and has no centroid.
    #[error("no fuzzy rule fired for tactic {0}")]
    NoRuleFired(&'static str),
}

/// Evaluates tactic success likelihood from posture parameters.
///
/// Rule sets are built once at construction and reused across calls.
pub struct TacticEvaluator {
    systems: FxHashMap<Tactic, RuleSet>,
}

impl Default for TacticEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl TacticEvaluator {
    pub fn new() -> Self {
        let systems = Tactic::ALL
            .into_iter()
            .map(|t| (t, rule_set_for(t)))
            .collect();
        Self { systems }
    }

    /// The parameter names and defaults a tactic consumes.
    pub fn default_params(&self, tactic: Tactic) -> Vec<(&'static str, f64)> {
        self.systems[&tactic].defaults()
    }

    /// Crisp success score in 0..=100 for `tactic` under `params`.
    ///
    /// Parameters missing from `params` take the tactic's defaults;
    /// supplied values are clamped to the 0–100 universe. Parameters the
    /// tactic does not consume are ignored.
    pub fn scalar(
        &self,
        tactic: Tactic,
        params: &FxHashMap<String, f64>,
    ) -> Result<f64, FuzzyError> {
        let system = &self.systems[&tactic];
        let values: Vec<f64> = system
            .inputs
            .iter()
            .map(|input| {
                params
                    .get(input.name)
                    .copied()
                    .unwrap_or(input.default)
                    .clamp(0.0, 100.0)
            })
            .collect();
        defuzzify(system, &values).ok_or(FuzzyError::NoRuleFired(tactic.code()))
    }

    /// Five-state success membership for `tactic` under `params`.
    ///
    /// Always produces a valid distribution: if no rule fires the neutral
    /// scalar is bucketed instead, and a crisp value that grades to zero
    /// against every output term falls back to its coarse bucket.
    pub fn membership(&self, tactic: Tactic, params: &FxHashMap<String, f64>) -> [f64; 5] {
        let scalar = match self.scalar(tactic, params) {
            Ok(v) => v,
            Err(_) => return bucket_fallback(NEUTRAL_SCALAR),
        };
        let mut grades = [0.0f64; 5];
        let mut total = 0.0;
        for (g, term) in grades.iter_mut().zip(OUTPUT_TERMS.iter()) {
            *g = term.grade(scalar);
            total += *g;
        }
        if total <= f64::EPSILON {
            return bucket_fallback(scalar);
        }
        for g in &mut grades {
            *g /= total;
        }
        grades
    }

    /// Five-state membership keyed by an ATT&CK tactic code.
    ///
    /// Unrecognized codes yield a uniform distribution.
    pub fn membership_for_code(&self, code: &str, params: &FxHashMap<String, f64>) -> [f64; 5] {
        match Tactic::from_code(code) {
            Some(tactic) => self.membership(tactic, params),
            None => [0.2; 5],
        }
    }

    /// Scalar success score mapped onto 0..=1, with a neutral fallback
    /// when no rule fires.
    pub fn success_probability(&self, tactic: Tactic, params: &FxHashMap<String, f64>) -> f64 {
        match self.scalar(tactic, params) {
            Ok(v) => v / 100.0,
            Err(_) => 0.5,
        }
    }
}

/// Coarse membership for a crisp score when term grading is unavailable.
fn bucket_fallback(scalar: f64) -> [f64; 5] {
    if scalar <= 20.0 {
        [0.8, 0.15, 0.05, 0.0, 0.0]
    } else if scalar <= 40.0 {
        [0.2, 0.6, 0.2, 0.0, 0.0]
    } else if scalar <= 60.0 {
        [0.05, 0.25, 0.4, 0.25, 0.05]
    } else if scalar <= 80.0 {
        [0.0, 0.0, 0.2, 0.6, 0.2]
    } else {
        [0.0, 0.0, 0.05, 0.15, 0.8]
    }
}

/// Centroid defuzzification of `system` at the crisp input `values`.
///
/// Returns `None` when the aggregated output surface is identically
/// zero, which happens only when no rule fires.
fn defuzzify(system: &RuleSet, values: &[f64]) -> Option<f64> {
    let mut activations = [0.0f64; 5];
    for rule in &system.rules {
        let mut strength = f64::INFINITY;
        for &(input_idx, term_idx) in &rule.when {
            let grade = system.inputs[input_idx].terms[term_idx].mf.grade(values[input_idx]);
            strength = strength.min(grade);
        }
        if strength > activations[rule.then] {
            activations[rule.then] = strength;
        }
    }

    let mut num = 0.0;
    let mut den = 0.0;
    for x in 0..=100u32 {
        let x = f64::from(x);
        let mut mu = 0.0f64;
        for (term, &act) in OUTPUT_TERMS.iter().zip(activations.iter()) {
            mu = mu.max(term.grade(x).min(act));
        }
        num += x * mu;
        den += mu;
    }
    if den <= f64::EPSILON {
        None
    } else {
        Some(num / den)
    }
}
