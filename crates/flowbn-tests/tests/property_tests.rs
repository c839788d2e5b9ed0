//! Property tests for grouping and CPT invariants.

use flowbn_core::{compile, CompileConfig, FlowGraph, FlowNode, NodeKind};
use flowbn_core::engine::graph::FlowEdge;
use flowbn_fuzzy::{Tactic, TacticEvaluator};
use flowbn_model::PROB_TOLERANCE;
use proptest::prelude::*;
use rustc_hash::FxHashMap;

fn fan_in_flow(parent_tactics: &[Option<u8>]) -> FlowGraph {
    let mut nodes: Vec<FlowNode> = parent_tactics
        .iter()
        .enumerate()
        .map(|(i, tactic)| FlowNode {
            id: format!("p{i}"),
            kind: NodeKind::Action,
            tactic_id: tactic.map(|t| format!("TA{:04}", t)),
            technique_id: None,
            name: None,
            description: None,
            logic: None,
        })
        .collect();
    nodes.push(FlowNode {
        id: "sink".into(),
        kind: NodeKind::Asset,
        tactic_id: None,
        technique_id: None,
        name: None,
        description: None,
        logic: None,
    });
    FlowGraph {
        edges: (0..parent_tactics.len())
            .map(|i| FlowEdge {
                source: format!("p{i}"),
                target: "sink".into(),
            })
            .collect(),
        nodes,
    }
}

proptest! {
    #[test]
    fn partition_covers_every_parent_exactly_once(
        tactics in prop::collection::vec(prop::option::of(1u8..8), 3..12),
        max_size in 2usize..5,
    ) {
        let flow = fan_in_flow(&tactics);
        let config = CompileConfig::default().with_max_group_size(max_size);
        let model = compile(&flow, &config).unwrap();

        prop_assert_eq!(model.groups.partitions.len(), 1);
        let partition = &model.groups.partitions[0];
        prop_assert!(partition.groups.len() <= max_size);

        let mut members: Vec<&str> = partition
            .groups
            .iter()
            .flatten()
            .map(String::as_str)
            .collect();
        members.sort_unstable();
        let mut expected: Vec<String> = (0..tactics.len()).map(|i| format!("p{i}")).collect();
        expected.sort_unstable();
        prop_assert_eq!(members, expected);
    }

    #[test]
    fn compiled_cpt_rows_always_sum_to_one(
        tactics in prop::collection::vec(prop::option::of(1u8..8), 3..10),
    ) {
        let flow = fan_in_flow(&tactics);
        let model = compile(&flow, &CompileConfig::default()).unwrap();
        for var in model.network.variables() {
            if let Some(cpt) = &var.cpt {
                let card = var.states.cardinality();
                prop_assert_eq!(cpt.len() % card, 0);
                for row in cpt.chunks(card) {
                    let sum: f64 = row.iter().sum();
                    prop_assert!((sum - 1.0).abs() <= PROB_TOLERANCE,
                        "{} row sums to {}", var.id, sum);
                    prop_assert!(row.iter().all(|&p| (0.0..=1.0).contains(&p)));
                }
            }
        }
    }

    #[test]
    fn fuzzy_membership_is_always_a_distribution(
        dd in 0f64..100.0,
        sk in 0f64..100.0,
        extra in 0f64..100.0,
    ) {
        let eval = TacticEvaluator::new();
        for tactic in Tactic::ALL {
            let mut params: FxHashMap<String, f64> = FxHashMap::default();
            params.insert("detection_difficulty".into(), dd);
            params.insert("skill_requirement".into(), sk);
            for (name, _) in eval.default_params(tactic) {
                params.entry(name.to_string()).or_insert(extra);
            }
            let m = eval.membership(tactic, &params);
            let sum: f64 = m.iter().sum();
            prop_assert!((sum - 1.0).abs() < 1e-9, "{:?} sums to {}", tactic, sum);
            prop_assert!(m.iter().all(|&p| p >= 0.0));
        }
    }
}
