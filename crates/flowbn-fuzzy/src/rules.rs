//! Per-tactic fuzzy rule sets.
//!
//! Every input variable spans the 0–100 universe with three triangular
//! terms; every rule is a conjunction (AND = min) of up to two
//! `(input, term)` antecedents with one success-likelihood consequent.
//! The schemas here are the single source of truth for which parameters
//! a tactic consumes and what its defaults are.

use smallvec::SmallVec;

use crate::tactic::Tactic;

/// A triangular membership function over the 0–100 universe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trimf {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl Trimf {
    pub const fn new(a: f64, b: f64, c: f64) -> Self {
        Self { a, b, c }
    }

    /// Membership grade of `x`, peaking at 1.0 when `x == b`.
    pub fn grade(&self, x: f64) -> f64 {
        if x < self.a || x > self.c {
            return 0.0;
        }
        if x <= self.b {
            if self.b == self.a {
                1.0
            } else {
                (x - self.a) / (self.b - self.a)
            }
        } else if self.c == self.b {
            1.0
        } else {
            (self.c - x) / (self.c - self.b)
        }
    }
}

/// One named term of an input variable.
#[derive(Debug, Clone, Copy)]
pub struct Term {
    pub name: &'static str,
    pub mf: Trimf,
}

/// An input (antecedent) variable with its tactic-specific default.
#[derive(Debug, Clone)]
pub struct InputVar {
    pub name: &'static str,
    pub default: f64,
    pub terms: [Term; 3],
}

/// Term indices within a three-term input, lowest to highest.
pub const LO: usize = 0;
pub const MID: usize = 1;
pub const HI: usize = 2;

/// Consequent indices into the five success-likelihood terms.
pub const VERY_LOW: usize = 0;
pub const LOW: usize = 1;
pub const MEDIUM: usize = 2;
pub const HIGH: usize = 3;
pub const VERY_HIGH: usize = 4;

/// A single fuzzy rule: conjunction of `(input index, term index)` pairs
/// implying one success-likelihood term.
#[derive(Debug, Clone)]
pub struct Rule {
    pub when: SmallVec<[(usize, usize); 2]>,
    pub then: usize,
}

fn rule(when: &[(usize, usize)], then: usize) -> Rule {
    Rule {
        when: SmallVec::from_slice(when),
        then,
    }
}

/// The complete rule set of one tactic.
#[derive(Debug, Clone)]
pub struct RuleSet {
    pub inputs: Vec<InputVar>,
    pub rules: Vec<Rule>,
}

impl RuleSet {
    /// The named parameters this rule set consumes, with their defaults.
    pub fn defaults(&self) -> Vec<(&'static str, f64)> {
        self.inputs.iter().map(|i| (i.name, i.default)).collect()
    }
}

fn term(name: &'static str, a: f64, b: f64, c: f64) -> Term {
    Term {
        name,
        mf: Trimf::new(a, b, c),
    }
}

fn input(
    name: &'static str,
    default: f64,
    lo: Term,
    mid: Term,
    hi: Term,
) -> InputVar {
    InputVar {
        name,
        default,
        terms: [lo, mid, hi],
    }
}

// Shared posture inputs. Defaults vary per tactic, so each builder takes
// the tactic's default value.

fn detection_difficulty(default: f64) -> InputVar {
    input(
        "detection_difficulty",
        default,
        term("low", 0.0, 0.0, 40.0),
        term("medium", 20.0, 50.0, 80.0),
        term("high", 60.0, 100.0, 100.0),
    )
}

fn skill_requirement(default: f64) -> InputVar {
    input(
        "skill_requirement",
        default,
        term("novice", 0.0, 0.0, 30.0),
        term("intermediate", 20.0, 50.0, 80.0),
        term("expert", 70.0, 100.0, 100.0),
    )
}

fn resource_availability(default: f64) -> InputVar {
    input(
        "resource_availability",
        default,
        term("limited", 0.0, 0.0, 40.0),
        term("moderate", 30.0, 50.0, 70.0),
        term("abundant", 60.0, 100.0, 100.0),
    )
}

fn time_constraint(default: f64) -> InputVar {
    input(
        "time_constraint",
        default,
        term("relaxed", 0.0, 0.0, 40.0),
        term("moderate", 30.0, 50.0, 70.0),
        term("urgent", 60.0, 100.0, 100.0),
    )
}

// Tactic-specific posture inputs.

fn narrow_scale(name: &'static str, default: f64, lo: &'static str, mid: &'static str, hi: &'static str) -> InputVar {
    input(
        name,
        default,
        term(lo, 0.0, 0.0, 30.0),
        term(mid, 20.0, 50.0, 80.0),
        term(hi, 70.0, 100.0, 100.0),
    )
}

fn reconnaissance() -> RuleSet {
    // Inputs: 0 = target_exposure, 1 = skill_requirement, 2 = detection_difficulty
    let inputs = vec![
        narrow_scale("target_exposure", 60.0, "minimal", "moderate", "extensive"),
        skill_requirement(30.0),
        detection_difficulty(70.0),
    ];
    let rules = vec![
        rule(&[(0, HI), (1, LO)], HIGH),
        rule(&[(0, MID), (1, MID)], MEDIUM),
        rule(&[(0, LO), (1, HI)], MEDIUM),
        rule(&[(0, LO), (1, LO)], LOW),
        rule(&[(2, LO), (0, HI)], VERY_HIGH),
        rule(&[(2, HI), (0, LO)], VERY_LOW),
    ];
    RuleSet { inputs, rules }
}

fn resource_development() -> RuleSet {
    // Inputs: 0 = resource_availability, 1 = skill_requirement, 2 = time_constraint
    let inputs = vec![
        resource_availability(60.0),
        skill_requirement(50.0),
        time_constraint(40.0),
    ];
    let rules = vec![
        rule(&[(0, HI), (1, HI)], VERY_HIGH),
        rule(&[(0, MID), (1, MID)], HIGH),
        rule(&[(0, LO), (1, LO)], LOW),
        rule(&[(2, HI), (0, LO)], VERY_LOW),
        rule(&[(2, LO), (0, HI)], VERY_HIGH),
    ];
    RuleSet { inputs, rules }
}

fn initial_access() -> RuleSet {
    // Inputs: 0 = attack_surface, 1 = detection_difficulty, 2 = skill_requirement
    let inputs = vec![
        narrow_scale("attack_surface", 50.0, "small", "medium", "large"),
        detection_difficulty(60.0),
        skill_requirement(60.0),
    ];
    let rules = vec![
        rule(&[(0, HI), (1, HI)], HIGH),
        rule(&[(0, LO), (2, HI)], MEDIUM),
        rule(&[(0, MID), (2, MID)], MEDIUM),
        rule(&[(0, LO), (2, LO)], VERY_LOW),
        rule(&[(1, LO), (0, HI)], VERY_HIGH),
    ];
    RuleSet { inputs, rules }
}

fn execution() -> RuleSet {
    // Execution happens after initial access, so generally higher success.
    // Inputs: 0 = detection_difficulty, 1 = skill_requirement
    let inputs = vec![detection_difficulty(40.0), skill_requirement(40.0)];
    let rules = vec![
        rule(&[(1, HI), (0, HI)], VERY_HIGH),
        rule(&[(1, MID), (0, MID)], HIGH),
        rule(&[(1, LO), (0, LO)], MEDIUM),
        rule(&[(0, LO)], HIGH),
    ];
    RuleSet { inputs, rules }
}

fn persistence() -> RuleSet {
    // Inputs: 0 = system_complexity, 1 = detection_difficulty, 2 = skill_requirement
    let inputs = vec![
        input(
            "system_complexity",
            50.0,
            term("simple", 0.0, 0.0, 40.0),
            term("moderate", 30.0, 50.0, 70.0),
            term("complex", 60.0, 100.0, 100.0),
        ),
        detection_difficulty(70.0),
        skill_requirement(70.0),
    ];
    let rules = vec![
        rule(&[(0, LO), (2, MID)], HIGH),
        rule(&[(0, HI), (2, HI)], MEDIUM),
        rule(&[(1, HI), (0, MID)], HIGH),
        rule(&[(1, LO), (0, LO)], MEDIUM),
        rule(&[(0, HI), (2, LO)], VERY_LOW),
    ];
    RuleSet { inputs, rules }
}

fn privilege_escalation() -> RuleSet {
    // Inputs: 0 = security_hardening, 1 = skill_requirement, 2 = detection_difficulty
    let inputs = vec![
        narrow_scale("security_hardening", 60.0, "weak", "moderate", "strong"),
        skill_requirement(80.0),
        detection_difficulty(80.0),
    ];
    let rules = vec![
        rule(&[(0, LO), (1, MID)], VERY_HIGH),
        rule(&[(0, MID), (1, HI)], HIGH),
        rule(&[(0, HI), (1, HI)], MEDIUM),
        rule(&[(0, HI), (1, LO)], VERY_LOW),
        rule(&[(2, HI), (0, LO)], VERY_HIGH),
    ];
    RuleSet { inputs, rules }
}

fn defense_evasion() -> RuleSet {
    // Inputs: 0 = monitoring_coverage, 1 = skill_requirement, 2 = detection_difficulty
    let inputs = vec![
        narrow_scale("monitoring_coverage", 50.0, "sparse", "moderate", "comprehensive"),
        skill_requirement(70.0),
        detection_difficulty(80.0),
    ];
    let rules = vec![
        rule(&[(0, LO), (1, MID)], VERY_HIGH),
        rule(&[(0, HI), (1, HI)], MEDIUM),
        rule(&[(0, MID), (1, HI)], HIGH),
        rule(&[(0, HI), (1, LO)], VERY_LOW),
        rule(&[(2, HI)], HIGH),
    ];
    RuleSet { inputs, rules }
}

fn credential_access() -> RuleSet {
    // Inputs: 0 = password_policy, 1 = skill_requirement, 2 = resource_availability
    let inputs = vec![
        narrow_scale("password_policy", 50.0, "weak", "moderate", "strong"),
        skill_requirement(60.0),
        resource_availability(70.0),
    ];
    let rules = vec![
        rule(&[(0, LO), (1, LO)], HIGH),
        rule(&[(0, MID), (1, MID)], MEDIUM),
        rule(&[(0, HI), (1, HI)], MEDIUM),
        rule(&[(0, HI), (1, LO)], LOW),
        rule(&[(2, HI), (0, MID)], HIGH),
    ];
    RuleSet { inputs, rules }
}

fn discovery() -> RuleSet {
    // Discovery is generally easier once inside.
    // Inputs: 0 = skill_requirement, 1 = detection_difficulty
    let inputs = vec![skill_requirement(40.0), detection_difficulty(50.0)];
    let rules = vec![
        rule(&[(0, LO)], MEDIUM),
        rule(&[(0, MID)], HIGH),
        rule(&[(0, HI)], VERY_HIGH),
        rule(&[(1, LO)], HIGH),
        rule(&[(1, HI), (0, HI)], HIGH),
    ];
    RuleSet { inputs, rules }
}

fn lateral_movement() -> RuleSet {
    // Inputs: 0 = network_segmentation, 1 = skill_requirement, 2 = detection_difficulty
    let inputs = vec![
        narrow_scale("network_segmentation", 50.0, "poor", "moderate", "strong"),
        skill_requirement(70.0),
        detection_difficulty(70.0),
    ];
    let rules = vec![
        rule(&[(0, LO), (1, MID)], VERY_HIGH),
        rule(&[(0, MID), (1, HI)], HIGH),
        rule(&[(0, HI), (1, HI)], MEDIUM),
        rule(&[(0, HI), (1, LO)], VERY_LOW),
        rule(&[(2, HI), (0, LO)], VERY_HIGH),
    ];
    RuleSet { inputs, rules }
}

fn collection() -> RuleSet {
    // Inputs: 0 = data_accessibility, 1 = skill_requirement, 2 = detection_difficulty
    let inputs = vec![
        narrow_scale("data_accessibility", 60.0, "restricted", "moderate", "open"),
        skill_requirement(50.0),
        detection_difficulty(60.0),
    ];
    let rules = vec![
        rule(&[(0, HI), (1, LO)], HIGH),
        rule(&[(0, MID), (1, MID)], HIGH),
        rule(&[(0, LO), (1, HI)], MEDIUM),
        rule(&[(0, LO), (1, LO)], LOW),
        rule(&[(2, HI), (0, HI)], VERY_HIGH),
    ];
    RuleSet { inputs, rules }
}

fn command_and_control() -> RuleSet {
    // Inputs: 0 = network_monitoring, 1 = skill_requirement, 2 = detection_difficulty
    let inputs = vec![
        narrow_scale("network_monitoring", 50.0, "minimal", "moderate", "extensive"),
        skill_requirement(60.0),
        detection_difficulty(70.0),
    ];
    let rules = vec![
        rule(&[(0, LO), (1, MID)], VERY_HIGH),
        rule(&[(0, MID), (1, HI)], HIGH),
        rule(&[(0, HI), (1, HI)], MEDIUM),
        rule(&[(0, HI), (1, LO)], VERY_LOW),
        rule(&[(2, HI)], HIGH),
    ];
    RuleSet { inputs, rules }
}

fn exfiltration() -> RuleSet {
    // Inputs: 0 = data_loss_prevention, 1 = skill_requirement, 2 = detection_difficulty
    let inputs = vec![
        narrow_scale("data_loss_prevention", 50.0, "weak", "moderate", "strong"),
        skill_requirement(70.0),
        detection_difficulty(80.0),
    ];
    let rules = vec![
        rule(&[(0, LO), (1, MID)], VERY_HIGH),
        rule(&[(0, MID), (1, HI)], HIGH),
        rule(&[(0, HI), (1, HI)], MEDIUM),
        rule(&[(0, HI), (1, LO)], LOW),
        rule(&[(2, HI), (0, LO)], VERY_HIGH),
    ];
    RuleSet { inputs, rules }
}

fn impact() -> RuleSet {
    // Inputs: 0 = backup_recovery, 1 = skill_requirement, 2 = detection_difficulty
    let inputs = vec![
        narrow_scale("backup_recovery", 50.0, "poor", "moderate", "excellent"),
        skill_requirement(60.0),
        detection_difficulty(70.0),
    ];
    let rules = vec![
        rule(&[(0, LO), (1, MID)], VERY_HIGH),
        rule(&[(0, MID), (1, HI)], HIGH),
        rule(&[(0, HI), (1, HI)], MEDIUM),
        rule(&[(0, HI), (1, LO)], LOW),
        rule(&[(2, HI), (0, LO)], VERY_HIGH),
    ];
    RuleSet { inputs, rules }
}

/// Builds the rule set of a tactic.
pub fn rule_set_for(tactic: Tactic) -> RuleSet {
    match tactic {
        Tactic::Reconnaissance => reconnaissance(),
        Tactic::ResourceDevelopment => resource_development(),
        Tactic::InitialAccess => initial_access(),
        Tactic::Execution => execution(),
        Tactic::Persistence => persistence(),
        Tactic::PrivilegeEscalation => privilege_escalation(),
        Tactic::DefenseEvasion => defense_evasion(),
        Tactic::CredentialAccess => credential_access(),
        Tactic::Discovery => discovery(),
        Tactic::LateralMovement => lateral_movement(),
        Tactic::Collection => collection(),
        Tactic::CommandAndControl => command_and_control(),
        Tactic::Exfiltration => exfiltration(),
        Tactic::Impact => impact(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trimf_grades() {
        let shoulder = Trimf::new(0.0, 0.0, 40.0);
        assert_eq!(shoulder.grade(0.0), 1.0);
        assert_eq!(shoulder.grade(20.0), 0.5);
        assert_eq!(shoulder.grade(40.0), 0.0);
        assert_eq!(shoulder.grade(60.0), 0.0);

        let peak = Trimf::new(20.0, 50.0, 80.0);
        assert_eq!(peak.grade(50.0), 1.0);
        assert!((peak.grade(35.0) - 0.5).abs() < 1e-12);
        assert!((peak.grade(65.0) - 0.5).abs() < 1e-12);
        assert_eq!(peak.grade(10.0), 0.0);
    }

    #[test]
    fn every_rule_references_declared_inputs() {
        for tactic in Tactic::ALL {
            let rs = rule_set_for(tactic);
            for r in &rs.rules {
                assert!(r.then <= VERY_HIGH);
                for &(input_idx, term_idx) in &r.when {
                    assert!(
                        input_idx < rs.inputs.len(),
                        "{:?} rule references missing input",
                        tactic
                    );
                    assert!(term_idx <= HI);
                }
            }
        }
    }

    #[test]
    fn schema_sizes_match_rule_consumption() {
        // Execution and Discovery consume exactly two inputs; every other
        // tactic consumes three.
        for tactic in Tactic::ALL {
            let n = rule_set_for(tactic).inputs.len();
            match tactic {
                Tactic::Execution | Tactic::Discovery => assert_eq!(n, 2),
                _ => assert_eq!(n, 3),
            }
        }
    }
}
