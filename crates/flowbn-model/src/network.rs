//! The network definition assembled by the compiler.
//!
//! A [`Network`] keeps variables in creation order (the external engine
//! replays them in sequence) with an `FxHashMap` index for O(1) lookup,
//! mirroring the arcs it accepted in insertion order. Arc insertion
//! rejects self-loops, duplicates, missing endpoints, and anything that
//! would create a directed cycle; CPT assignment validates shape and
//! row-wise probability mass.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::errors::ModelError;

/// Tolerance for CPT row sums: every row must sum to 1 within this bound.
pub const PROB_TOLERANCE: f64 = 1e-6;

/// State space of a variable.
///
/// Binary variables model plain occurrence (False/True). Five-state
/// variables carry an ordinal success-likelihood scale and are used for
/// tactic-bearing nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateSpace {
    Binary,
    Ordinal5,
}

impl StateSpace {
    /// Number of states.
    pub fn cardinality(self) -> usize {
        match self {
            StateSpace::Binary => 2,
            StateSpace::Ordinal5 => 5,
        }
    }

    /// Stable state labels, lowest state first.
    pub fn state_labels(self) -> &'static [&'static str] {
        match self {
            StateSpace::Binary => &["False", "True"],
            StateSpace::Ordinal5 => &["Very_Low", "Low", "Medium", "High", "Very_High"],
        }
    }
}

/// How the external engine should treat the variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableKind {
    /// A plain CPT node: its table fully specifies the conditional.
    Cpt,
    /// A noisy-max gate: per-parent strength orderings weight the
    /// aggregation; the attached table is the fallback expansion.
    NoisyMax,
}

/// Layout rectangle in pixels: purely cosmetic, no semantic effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

/// A probabilistic variable in the synthesized network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variable {
    /// Unique, solver-safe identifier.
    pub id: String,
    pub kind: VariableKind,
    pub states: StateSpace,
    /// Human-readable display name.
    pub name: Option<String>,
    /// Human-readable annotation block.
    pub description: Option<String>,
    /// Parent ids in arc-insertion order; this order defines the CPT
    /// radix (first parent = least-significant digit).
    pub parents: Vec<String>,
    /// Flat row-major conditional probability table.
    pub cpt: Option<Vec<f64>>,
    /// Per-parent strength orderings for noisy-max gates.
    pub strengths: Vec<(String, Vec<u8>)>,
    pub position: Option<Rect>,
}

impl Variable {
    fn new(id: String, kind: VariableKind, states: StateSpace) -> Self {
        Self {
            id,
            kind,
            states,
            name: None,
            description: None,
            parents: Vec::new(),
            cpt: None,
            strengths: Vec::new(),
            position: None,
        }
    }
}

/// The assembled network definition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Network {
    variables: Vec<Variable>,
    arcs: Vec<(String, String)>,
    #[serde(skip)]
    index: FxHashMap<String, usize>,
    #[serde(skip)]
    children: FxHashMap<String, Vec<String>>,
}

impl Network {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a variable with the given kind and state space.
    pub fn add_variable(
        &mut self,
        id: &str,
        kind: VariableKind,
        states: StateSpace,
    ) -> Result<(), ModelError> {
        if self.index.contains_key(id) {
            return Err(ModelError::DuplicateVariable(id.to_string()));
        }
        self.index.insert(id.to_string(), self.variables.len());
        self.variables
            .push(Variable::new(id.to_string(), kind, states));
        Ok(())
    }

    /// Replaces an existing variable's kind and state space in place.
    ///
    /// Used when an operator-type conflict forces a node-kind change:
    /// the variable keeps its id and outgoing arcs but loses its incoming
    /// arcs, table, and strength metadata.
    pub fn replace_variable(
        &mut self,
        id: &str,
        kind: VariableKind,
        states: StateSpace,
    ) -> Result<(), ModelError> {
        let idx = self.lookup(id)?;
        let old_parents = std::mem::take(&mut self.variables[idx].parents);
        for parent in &old_parents {
            if let Some(kids) = self.children.get_mut(parent) {
                kids.retain(|c| c != id);
            }
        }
        self.arcs.retain(|(_, dst)| dst != id);
        let var = &mut self.variables[idx];
        var.kind = kind;
        var.states = states;
        var.cpt = None;
        var.strengths.clear();
        Ok(())
    }

    /// Adds a directed arc `src -> dst`.
    ///
    /// Fails on self-loops, duplicates, missing endpoints, and arcs that
    /// would close a directed cycle. On success the parent is appended to
    /// `dst`'s parent list, fixing its position in the CPT radix.
    pub fn add_arc(&mut self, src: &str, dst: &str) -> Result<(), ModelError> {
        if src == dst {
            return Err(ModelError::SelfLoop(src.to_string()));
        }
        self.lookup(src)?;
        let dst_idx = self.lookup(dst)?;
        if self.variables[dst_idx].parents.iter().any(|p| p == src) {
            return Err(ModelError::DuplicateArc {
                src: src.to_string(),
                dst: dst.to_string(),
            });
        }
        if self.reaches(dst, src) {
            return Err(ModelError::CycleDetected {
                src: src.to_string(),
                dst: dst.to_string(),
            });
        }
        self.variables[dst_idx].parents.push(src.to_string());
        self.children
            .entry(src.to_string())
            .or_default()
            .push(dst.to_string());
        self.arcs.push((src.to_string(), dst.to_string()));
        Ok(())
    }

    /// Assigns the flat row-major CPT of a variable.
    ///
    /// The table must contain one probability vector of the variable's own
    /// cardinality per parent-state combination, each summing to 1 within
    /// [`PROB_TOLERANCE`].
    pub fn set_cpt(&mut self, id: &str, table: Vec<f64>) -> Result<(), ModelError> {
        let idx = self.lookup(id)?;
        let own_card = self.variables[idx].states.cardinality();
        let rows: usize = self.variables[idx]
            .parents
            .iter()
            .map(|p| self.cardinality(p).unwrap_or(0))
            .product();
        let expected = rows * own_card;
        if table.len() != expected {
            return Err(ModelError::InvalidCpt {
                variable: id.to_string(),
                reason: format!("expected {} entries, got {}", expected, table.len()),
            });
        }
        for (row_idx, row) in table.chunks(own_card).enumerate() {
            if row.iter().any(|&p| !(p >= 0.0) || !p.is_finite()) {
                return Err(ModelError::InvalidCpt {
                    variable: id.to_string(),
                    reason: format!("row {} contains a negative or non-finite entry", row_idx),
                });
            }
            let sum: f64 = row.iter().sum();
            if (sum - 1.0).abs() > PROB_TOLERANCE {
                return Err(ModelError::InvalidCpt {
                    variable: id.to_string(),
                    reason: format!("row {} sums to {} (expected 1.0)", row_idx, sum),
                });
            }
        }
        self.variables[idx].cpt = Some(table);
        Ok(())
    }

    /// Configures the strength ordering of one parent of a noisy-max gate.
    ///
    /// The strengths vector must have one entry per parent state; the
    /// convention used by the compiler is the full index range
    /// `[0..cardinality-1]`.
    pub fn set_noisy_strengths(
        &mut self,
        id: &str,
        parent: &str,
        strengths: Vec<u8>,
    ) -> Result<(), ModelError> {
        let idx = self.lookup(id)?;
        if self.variables[idx].kind != VariableKind::NoisyMax {
            return Err(ModelError::InvalidStrengths {
                variable: id.to_string(),
                reason: "variable is not a noisy-max gate".into(),
            });
        }
        if !self.variables[idx].parents.iter().any(|p| p == parent) {
            return Err(ModelError::InvalidStrengths {
                variable: id.to_string(),
                reason: format!("'{}' is not a wired parent", parent),
            });
        }
        let parent_card = self
            .cardinality(parent)
            .ok_or_else(|| ModelError::UnknownVariable(parent.to_string()))?;
        if strengths.len() != parent_card {
            return Err(ModelError::InvalidStrengths {
                variable: id.to_string(),
                reason: format!(
                    "expected {} strengths for parent '{}', got {}",
                    parent_card,
                    parent,
                    strengths.len()
                ),
            });
        }
        let var = &mut self.variables[idx];
        if let Some(entry) = var.strengths.iter_mut().find(|(p, _)| p == parent) {
            entry.1 = strengths;
        } else {
            var.strengths.push((parent.to_string(), strengths));
        }
        Ok(())
    }

    /// Sets the display name of a variable.
    pub fn set_name(&mut self, id: &str, name: &str) -> Result<(), ModelError> {
        let idx = self.lookup(id)?;
        self.variables[idx].name = Some(name.to_string());
        Ok(())
    }

    /// Sets the description annotation of a variable.
    pub fn set_description(&mut self, id: &str, description: &str) -> Result<(), ModelError> {
        let idx = self.lookup(id)?;
        self.variables[idx].description = Some(description.to_string());
        Ok(())
    }

    /// Returns the current description annotation, if any.
    pub fn description(&self, id: &str) -> Option<&str> {
        self.variable(id).and_then(|v| v.description.as_deref())
    }

    /// Sets the layout rectangle of a variable.
    pub fn set_position(&mut self, id: &str, rect: Rect) -> Result<(), ModelError> {
        let idx = self.lookup(id)?;
        self.variables[idx].position = Some(rect);
        Ok(())
    }

    /// All variables in creation order.
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// All accepted arcs in insertion order.
    pub fn arcs(&self) -> &[(String, String)] {
        &self.arcs
    }

    /// Looks up a variable by id.
    pub fn variable(&self, id: &str) -> Option<&Variable> {
        self.index.get(id).map(|&idx| &self.variables[idx])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Parent ids of a variable in arc-insertion (CPT radix) order.
    pub fn parents_of(&self, id: &str) -> Option<&[String]> {
        self.variable(id).map(|v| v.parents.as_slice())
    }

    /// Cardinality of a variable's own state space.
    pub fn cardinality(&self, id: &str) -> Option<usize> {
        self.variable(id).map(|v| v.states.cardinality())
    }

    /// Parent cardinalities of a variable in CPT radix order.
    pub fn parent_cardinalities(&self, id: &str) -> Option<SmallVec<[usize; 8]>> {
        let parents = self.parents_of(id)?;
        parents.iter().map(|p| self.cardinality(p)).collect()
    }

    /// Rebuilds the lookup indexes after deserialization.
    pub fn rebuild_index(&mut self) {
        self.index = self
            .variables
            .iter()
            .enumerate()
            .map(|(idx, v)| (v.id.clone(), idx))
            .collect();
        self.children.clear();
        for (src, dst) in &self.arcs {
            self.children.entry(src.clone()).or_default().push(dst.clone());
        }
    }

    fn lookup(&self, id: &str) -> Result<usize, ModelError> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| ModelError::UnknownVariable(id.to_string()))
    }

    /// Depth-first reachability along existing arcs.
    fn reaches(&self, from: &str, to: &str) -> bool {
        let mut stack: SmallVec<[&str; 16]> = SmallVec::new();
        let mut seen: SmallVec<[&str; 16]> = SmallVec::new();
        stack.push(from);
        while let Some(current) = stack.pop() {
            if current == to {
                return true;
            }
            if seen.contains(&current) {
                continue;
            }
            seen.push(current);
            if let Some(kids) = self.children.get(current) {
                stack.extend(kids.iter().map(String::as_str));
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binary_net(ids: &[&str]) -> Network {
        let mut net = Network::new();
        for id in ids {
            net.add_variable(id, VariableKind::Cpt, StateSpace::Binary)
                .unwrap();
        }
        net
    }

    #[test]
    fn add_arc_records_parent_order() {
        let mut net = binary_net(&["a", "b", "c"]);
        net.add_arc("a", "c").unwrap();
        net.add_arc("b", "c").unwrap();
        assert_eq!(net.parents_of("c").unwrap(), &["a", "b"]);
        assert_eq!(net.arcs().len(), 2);
    }

    #[test]
    fn add_arc_rejects_cycle() {
        let mut net = binary_net(&["a", "b", "c"]);
        net.add_arc("a", "b").unwrap();
        net.add_arc("b", "c").unwrap();
        let err = net.add_arc("c", "a").unwrap_err();
        assert!(matches!(err, ModelError::CycleDetected { .. }));
        // Network unchanged by the rejected arc.
        assert_eq!(net.arcs().len(), 2);
    }

    #[test]
    fn add_arc_rejects_duplicate_and_self_loop() {
        let mut net = binary_net(&["a", "b"]);
        net.add_arc("a", "b").unwrap();
        assert!(matches!(
            net.add_arc("a", "b"),
            Err(ModelError::DuplicateArc { .. })
        ));
        assert!(matches!(net.add_arc("a", "a"), Err(ModelError::SelfLoop(_))));
    }

    #[test]
    fn set_cpt_validates_shape_and_mass() {
        let mut net = binary_net(&["a", "b"]);
        net.add_arc("a", "b").unwrap();
        // Two rows of two entries.
        net.set_cpt("b", vec![0.7, 0.3, 0.1, 0.9]).unwrap();
        assert!(matches!(
            net.set_cpt("b", vec![0.7, 0.3]),
            Err(ModelError::InvalidCpt { .. })
        ));
        assert!(matches!(
            net.set_cpt("b", vec![0.7, 0.4, 0.1, 0.9]),
            Err(ModelError::InvalidCpt { .. })
        ));
    }

    #[test]
    fn noisy_strengths_require_gate_and_matching_cardinality() {
        let mut net = Network::new();
        net.add_variable("p", VariableKind::Cpt, StateSpace::Ordinal5)
            .unwrap();
        net.add_variable("g", VariableKind::NoisyMax, StateSpace::Binary)
            .unwrap();
        net.add_arc("p", "g").unwrap();
        assert!(matches!(
            net.set_noisy_strengths("g", "p", vec![0, 1]),
            Err(ModelError::InvalidStrengths { .. })
        ));
        net.set_noisy_strengths("g", "p", vec![0, 1, 2, 3, 4]).unwrap();
        assert_eq!(
            net.variable("g").unwrap().strengths,
            vec![("p".to_string(), vec![0, 1, 2, 3, 4])]
        );
    }

    #[test]
    fn replace_variable_drops_incoming_arcs_only() {
        let mut net = binary_net(&["a", "op", "z"]);
        net.add_arc("a", "op").unwrap();
        net.add_arc("op", "z").unwrap();
        net.replace_variable("op", VariableKind::NoisyMax, StateSpace::Binary)
            .unwrap();
        assert!(net.parents_of("op").unwrap().is_empty());
        assert_eq!(net.parents_of("z").unwrap(), &["op"]);
        assert_eq!(net.variable("op").unwrap().kind, VariableKind::NoisyMax);
    }
}
