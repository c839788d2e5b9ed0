//! End-to-end compilation tests over small attack-flow scenarios.

use flowbn_core::{compile, CompileConfig, CompileError, FlowGraph, FlowNode, NodeKind};
use flowbn_core::engine::graph::{FlowEdge, LogicKind};
use flowbn_model::{StateSpace, VariableKind, PROB_TOLERANCE};

fn node(id: &str, kind: NodeKind) -> FlowNode {
    FlowNode {
        id: id.into(),
        kind,
        tactic_id: None,
        technique_id: None,
        name: None,
        description: None,
        logic: None,
    }
}

fn tactic_node(id: &str, tactic: &str, technique: Option<&str>) -> FlowNode {
    let mut n = node(id, NodeKind::Action);
    n.tactic_id = Some(tactic.into());
    n.technique_id = technique.map(String::from);
    n
}

fn edge(source: &str, target: &str) -> FlowEdge {
    FlowEdge {
        source: source.into(),
        target: target.into(),
    }
}

/// Phishing foothold: an initial-access action feeding a compromised
/// asset.
fn phishing_flow() -> FlowGraph {
    let mut phish = tactic_node("phish", "TA0001", Some("T1566"));
    phish.name = Some("Spearphishing Attachment".into());
    phish.description = Some("Malicious email attachment delivered to staff".into());
    FlowGraph {
        nodes: vec![phish, node("workstation", NodeKind::Asset)],
        edges: vec![edge("phish", "workstation")],
    }
}

#[test]
fn empty_flow_is_rejected() {
    let err = compile(&FlowGraph::default(), &CompileConfig::default()).unwrap_err();
    assert!(matches!(err, CompileError::EmptyGraph(_)));
}

#[test]
fn phishing_scenario_builds_a_fuzzy_root() {
    let model = compile(&phishing_flow(), &CompileConfig::default()).unwrap();
    let phish = model.network.variable("phish").unwrap();
    assert_eq!(phish.states, StateSpace::Ordinal5);
    assert_eq!(phish.name.as_deref(), Some("Spearphishing Attachment"));

    let cpt = phish.cpt.as_ref().unwrap();
    assert_eq!(cpt.len(), 5);
    // Email delivery lowers the skill requirement, so the success
    // distribution should not collapse onto the lowest state.
    assert!(cpt[2] + cpt[3] > cpt[0], "distribution {:?}", cpt);

    let desc = phish.description.as_deref().unwrap();
    assert!(desc.contains("TA0001"));
    assert!(desc.contains("T1566"));
    assert!(desc.contains("Initial Access"));
}

#[test]
fn high_fan_in_is_partitioned_behind_gates() {
    let flow = FlowGraph {
        nodes: vec![
            node("p1", NodeKind::Action),
            node("p2", NodeKind::Action),
            node("p3", NodeKind::Action),
            node("p4", NodeKind::Action),
            node("breach", NodeKind::Asset),
        ],
        edges: vec![
            edge("p1", "breach"),
            edge("p2", "breach"),
            edge("p3", "breach"),
            edge("p4", "breach"),
        ],
    };
    let model = compile(&flow, &CompileConfig::default()).unwrap();

    assert_eq!(model.groups.partitions.len(), 1);
    let partition = &model.groups.partitions[0];
    let mut members: Vec<&str> = partition
        .groups
        .iter()
        .flatten()
        .map(String::as_str)
        .collect();
    members.sort_unstable();
    assert_eq!(members, ["p1", "p2", "p3", "p4"]);
    assert!(partition.groups.len() <= 3);

    // The sink's only parents are the gates.
    let parents = model.network.parents_of("breach").unwrap();
    assert!(parents.iter().all(|p| p.starts_with("breach_grp")));
    for gate in parents {
        let var = model.network.variable(gate).unwrap();
        assert_eq!(var.kind, VariableKind::NoisyMax);
        assert!(!var.strengths.is_empty());
    }
}

#[test]
fn and_operator_requires_all_parents() {
    let mut op = node("op", NodeKind::Operator);
    op.logic = Some(LogicKind::And);
    let flow = FlowGraph {
        nodes: vec![node("a", NodeKind::Action), node("b", NodeKind::Action), op],
        edges: vec![edge("a", "op"), edge("b", "op")],
    };
    let model = compile(&flow, &CompileConfig::default()).unwrap();
    let cpt = model.network.variable("op").unwrap().cpt.as_ref().unwrap();
    // P(true | both parents true) is the last row's second entry;
    // every other row is certainly false.
    assert_eq!(cpt[7], 1.0);
    assert_eq!(cpt[1], 0.0);
    assert_eq!(cpt[3], 0.0);
    assert_eq!(cpt[5], 0.0);
}

#[test]
fn unknown_operator_logic_follows_config() {
    let op = node("op", NodeKind::Operator);
    let flow = FlowGraph {
        nodes: vec![node("a", NodeKind::Action), node("b", NodeKind::Action), op],
        edges: vec![edge("a", "op"), edge("b", "op")],
    };
    // Default resolves unknown logic to OR, i.e. a noisy-max gate.
    let model = compile(&flow, &CompileConfig::default()).unwrap();
    assert_eq!(
        model.network.variable("op").unwrap().kind,
        VariableKind::NoisyMax
    );

    let mut config = CompileConfig::default();
    config.unknown_logic = flowbn_core::LogicOp::And;
    let model = compile(&flow, &config).unwrap();
    let var = model.network.variable("op").unwrap();
    assert_eq!(var.kind, VariableKind::Cpt);
    assert!(var.cpt.is_some());
}

#[test]
fn condition_logic_is_honored() {
    let mut cond = node("cond", NodeKind::Condition);
    cond.logic = Some(LogicKind::And);
    let flow = FlowGraph {
        nodes: vec![node("a", NodeKind::Action), node("b", NodeKind::Action), cond],
        edges: vec![edge("a", "cond"), edge("b", "cond")],
    };
    let model = compile(&flow, &CompileConfig::default()).unwrap();
    let cpt = model.network.variable("cond").unwrap().cpt.as_ref().unwrap();
    // Conjunction semantics, same as an operator declaring AND.
    assert_eq!(cpt[7], 1.0);
    assert_eq!(cpt[1], 0.0);
    assert_eq!(cpt[3], 0.0);
    assert_eq!(cpt[5], 0.0);

    // An undeclared condition resolves like an unknown operator.
    let flow = FlowGraph {
        nodes: vec![
            node("a", NodeKind::Action),
            node("b", NodeKind::Action),
            node("cond", NodeKind::Condition),
        ],
        edges: vec![edge("a", "cond"), edge("b", "cond")],
    };
    let model = compile(&flow, &CompileConfig::default()).unwrap();
    assert_eq!(
        model.network.variable("cond").unwrap().kind,
        VariableKind::NoisyMax
    );
}

#[test]
fn high_fan_in_logic_nodes_keep_the_partition_recommendation() {
    let mut op = node("op", NodeKind::Operator);
    op.logic = Some(LogicKind::And);
    let flow = FlowGraph {
        nodes: vec![
            node("p1", NodeKind::Action),
            node("p2", NodeKind::Action),
            node("p3", NodeKind::Action),
            op,
        ],
        edges: vec![edge("p1", "op"), edge("p2", "op"), edge("p3", "op")],
    };
    let model = compile(&flow, &CompileConfig::default()).unwrap();
    let rec = model
        .recommendations
        .iter()
        .find(|r| r.node_id == "op")
        .unwrap();
    // The fan-in trigger is reported even though grouping lets logic win.
    assert!(rec.actions.partition);
    assert_eq!(rec.actions.logic, Some(LogicKind::And));
    assert!(model.groups.partitions.is_empty());
    assert_eq!(model.groups.logics.len(), 1);
}

#[test]
fn high_fan_out_is_divorced_behind_a_hub() {
    let flow = FlowGraph {
        nodes: vec![
            node("src", NodeKind::Action),
            node("c1", NodeKind::Asset),
            node("c2", NodeKind::Asset),
            node("c3", NodeKind::Asset),
        ],
        edges: vec![edge("src", "c1"), edge("src", "c2"), edge("src", "c3")],
    };
    let model = compile(&flow, &CompileConfig::default()).unwrap();
    assert!(model.network.contains("src_div"));
    for child in ["c1", "c2", "c3"] {
        assert_eq!(model.network.parents_of(child).unwrap(), &["src_div"]);
    }
    // No direct source-to-child arcs survive.
    assert!(model
        .network
        .arcs()
        .iter()
        .all(|(s, d)| !(s == "src" && d.starts_with('c'))));
}

#[test]
fn hub_pushes_tactic_children_with_its_state() {
    let flow = FlowGraph {
        nodes: vec![
            node("src", NodeKind::Action),
            tactic_node("t1", "TA0002", None),
            node("c2", NodeKind::Asset),
            node("c3", NodeKind::Asset),
        ],
        edges: vec![edge("src", "t1"), edge("src", "c2"), edge("src", "c3")],
    };
    let model = compile(&flow, &CompileConfig::default()).unwrap();
    let cpt = model.network.variable("t1").unwrap().cpt.as_ref().unwrap();
    assert_eq!(cpt.len(), 10);
    // The lowest state must be strictly likelier when the hub is false.
    assert!(
        cpt[0] > cpt[5],
        "P(VeryLow|hub=false) = {} vs P(VeryLow|hub=true) = {}",
        cpt[0],
        cpt[5]
    );
    let mean = |row: &[f64]| -> f64 { row.iter().enumerate().map(|(i, p)| i as f64 * p).sum() };
    assert!(mean(&cpt[5..10]) > mean(&cpt[0..5]));
}

#[test]
fn compilation_is_deterministic() {
    let flow = phishing_flow();
    let config = CompileConfig::default();
    let first = compile(&flow, &config).unwrap();
    let second = compile(&flow, &config).unwrap();
    assert_eq!(
        serde_json::to_string(&first.network).unwrap(),
        serde_json::to_string(&second.network).unwrap()
    );
}

#[test]
fn every_variable_is_fully_specified() {
    let mut op = node("op", NodeKind::Operator);
    op.logic = Some(LogicKind::Or);
    let flow = FlowGraph {
        nodes: vec![
            tactic_node("recon", "TA0043", None),
            node("a", NodeKind::Action),
            node("b", NodeKind::Action),
            op,
            node("c1", NodeKind::Asset),
            node("c2", NodeKind::Asset),
            node("c3", NodeKind::Asset),
        ],
        edges: vec![
            edge("recon", "a"),
            edge("a", "op"),
            edge("b", "op"),
            edge("op", "c1"),
            edge("op", "c2"),
            edge("op", "c3"),
        ],
    };
    let model = compile(&flow, &CompileConfig::default()).unwrap();
    for var in model.network.variables() {
        assert!(var.position.is_some(), "{} has no layout", var.id);
        if let Some(cpt) = &var.cpt {
            let card = var.states.cardinality();
            for (i, row) in cpt.chunks(card).enumerate() {
                let sum: f64 = row.iter().sum();
                assert!(
                    (sum - 1.0).abs() <= PROB_TOLERANCE,
                    "{} row {} sums to {}",
                    var.id,
                    i,
                    sum
                );
            }
        }
        if var.kind == VariableKind::NoisyMax {
            let parents = var.parents.len();
            assert_eq!(var.strengths.len(), parents, "{} strengths", var.id);
        }
    }
}

fn root_cpt(flow: &FlowGraph, id: &str) -> Vec<f64> {
    compile(flow, &CompileConfig::default())
        .unwrap()
        .network
        .variable(id)
        .unwrap()
        .cpt
        .clone()
        .unwrap()
}

fn single_edge_flow(entry: FlowNode) -> FlowGraph {
    let id = entry.id.clone();
    FlowGraph {
        nodes: vec![entry, node("host", NodeKind::Asset)],
        edges: vec![edge(&id, "host")],
    }
}

#[test]
fn rootkit_technique_raises_the_skill_requirement() {
    let plain = single_edge_flow(tactic_node("entry", "TA0001", Some("T1190")));
    let hardened = single_edge_flow(tactic_node("entry", "TA0001", Some("T1014 rootkit")));
    // Skill requirement jumps by 30, changing which rules fire.
    assert_ne!(root_cpt(&plain, "entry"), root_cpt(&hardened, "entry"));
}

#[test]
fn skill_keywords_in_descriptions_are_ignored() {
    let plain = single_edge_flow(tactic_node("exec", "TA0002", None));
    let mut lured = tactic_node("exec", "TA0002", None);
    lured.description = Some("Payload delivered by email lure".into());
    let lured = single_edge_flow(lured);
    // Skill cues only count in the technique field; the prior must not
    // move.
    assert_eq!(root_cpt(&plain, "exec"), root_cpt(&lured, "exec"));
}

#[test]
fn fuzzy_overrides_shift_root_distributions() {
    let mut config_easy = CompileConfig::default();
    config_easy.fuzzy_overrides.insert(
        "phish".into(),
        [("attack_surface".to_string(), 95.0), ("detection_difficulty".to_string(), 5.0)]
            .into_iter()
            .collect(),
    );
    let mut config_hard = CompileConfig::default();
    config_hard.fuzzy_overrides.insert(
        "phish".into(),
        [("attack_surface".to_string(), 5.0), ("skill_requirement".to_string(), 5.0)]
            .into_iter()
            .collect(),
    );
    let flow = phishing_flow();
    let easy = compile(&flow, &config_easy).unwrap();
    let hard = compile(&flow, &config_hard).unwrap();
    let mean = |net: &flowbn_model::Network| -> f64 {
        let cpt = net.variable("phish").unwrap().cpt.as_ref().unwrap();
        cpt.iter().enumerate().map(|(i, p)| i as f64 * p).sum()
    };
    assert!(mean(&easy.network) > mean(&hard.network));
}
