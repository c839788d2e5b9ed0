//! Network synthesis.
//!
//! Builds the output network from the extracted flow and its groups, in
//! fixed phases:
//! 1. one variable per used node, five-state when the node carries a
//!    recognized tactic
//! 2. partition gates (`{id}_grpN`) as noisy-max aggregators over each
//!    parent chunk
//! 3. logic operators: AND as a deterministic table over its parents,
//!    OR as a noisy-max gate
//! 4. divorce hubs (`{id}_div`) rerouting high fan-out children
//! 5. all remaining extracted edges, skipping pairs already covered by
//!    a gate or hub
//! 6. CPTs: fuzzy tables for tactic variables (always recomputed, even
//!    over gate-set tables), heuristic defaults for everything else
//!
//! Arc insertion failures (a cycle in the input flow, a duplicate after
//! sanitization) are logged and skipped so one bad edge never poisons
//! the rest of the model.

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, warn};

use flowbn_fuzzy::{Tactic, TacticEvaluator};
use flowbn_model::{ModelError, Network, StateSpace, VariableKind};

use crate::config::CompileConfig;
use crate::engine::cpt::{
    average_influence, combination_count, decode_row, floor_and_normalize, normalized_activation,
};
use crate::engine::errors::CompileError;
use crate::engine::graph::{ExtractedGraph, FlowNode};
use crate::engine::grouping::{Groups, LogicOp};

/// Five-state row used when no evidence pushes the variable either way.
const NEUTRAL_ROW: [f64; 5] = [0.15, 0.2, 0.3, 0.2, 0.15];

/// Divorce hub child rows: hub false pulls the child low, hub true
/// pushes it high.
const DIVORCE_LOW: [f64; 5] = [0.4, 0.3, 0.2, 0.08, 0.02];
const DIVORCE_HIGH: [f64; 5] = [0.02, 0.08, 0.2, 0.3, 0.4];

/// Minimum probability kept in any blended CPT cell.
const CPT_FLOOR: f64 = 0.01;

/// Synthesizes the network for one extracted flow.
pub fn synthesize(
    extracted: &ExtractedGraph,
    groups: &Groups,
    config: &CompileConfig,
) -> Result<Network, CompileError> {
    let mut net = Network::new();
    let sid_to_orig: FxHashMap<String, String> = extracted
        .used_ids
        .iter()
        .map(|id| (sanitize(id), id.clone()))
        .collect();

    // Edge pairs (original ids) already realized through a gate or hub.
    let mut covered: FxHashSet<(String, String)> = FxHashSet::default();
    // Children whose direct inbound edges are replaced by a hub.
    let mut hub_fed: FxHashSet<String> = FxHashSet::default();

    create_variables(extracted, groups, &mut net)?;
    wire_partitions(extracted, groups, &mut net, &mut covered)?;
    wire_logic(groups, &mut net, &mut covered)?;
    wire_divorce(extracted, groups, &mut net, &mut covered, &mut hub_fed)?;
    wire_remaining(extracted, &mut net, &covered, &hub_fed);
    compute_cpts(extracted, config, &sid_to_orig, &mut net)?;
    Ok(net)
}

/// Solver-safe identifier: hyphens are not accepted downstream.
pub fn sanitize(id: &str) -> String {
    id.replace('-', "_")
}

fn create_variables(
    extracted: &ExtractedGraph,
    groups: &Groups,
    net: &mut Network,
) -> Result<(), CompileError> {
    for id in &extracted.used_ids {
        let sid = sanitize(id);
        let tactic = extracted
            .node(id)
            .and_then(|n| n.tactic_id.as_deref())
            .and_then(Tactic::from_code);
        let states = if tactic.is_some() {
            StateSpace::Ordinal5
        } else {
            StateSpace::Binary
        };
        net.add_variable(&sid, VariableKind::Cpt, states)?;
        net.set_name(&sid, extracted.display_name(id))?;
        net.set_description(&sid, &describe(extracted, groups, id))?;
    }
    Ok(())
}

/// Annotation block surfaced verbatim in the output model.
fn describe(extracted: &ExtractedGraph, groups: &Groups, id: &str) -> String {
    let mut lines = vec![format!("Name: {}", extracted.display_name(id))];
    if let Some(node) = extracted.node(id) {
        if let Some(desc) = &node.description {
            lines.push(format!("Description: {}", desc));
        }
        if let Some(tactic) = &node.tactic_id {
            lines.push(format!("Tactic: {}", tactic));
        }
        if let Some(technique) = &node.technique_id {
            lines.push(format!("Technique: {}", technique));
        }
    }

    let joined = |ids: &[String]| -> String {
        ids.iter()
            .map(|p| extracted.display_name(p))
            .collect::<Vec<_>>()
            .join(", ")
    };
    let parents = extracted.parents_of(id);
    if !parents.is_empty() {
        lines.push(format!("Parents: {}", joined(parents)));
    }
    let children = extracted.children_of(id);
    if !children.is_empty() {
        lines.push(format!("Children: {}", joined(children)));
    }

    let mut treatments = Vec::new();
    if let Some(p) = groups.partitions.iter().find(|p| p.node_id == id) {
        treatments.push(format!("partitioned parents into {} groups", p.groups.len()));
    }
    if let Some(d) = groups.divorces.iter().find(|d| d.node_id == id) {
        treatments.push(format!("divorced {} children behind a hub", d.children.len()));
    }
    if let Some(l) = groups.logics.iter().find(|l| l.node_id == id) {
        treatments.push(format!(
            "combines parents with {}",
            match l.op {
                LogicOp::And => "AND",
                LogicOp::Or => "OR",
            }
        ));
    }
    if !treatments.is_empty() {
        lines.push(format!("Treatments: {}", treatments.join("; ")));
    }
    if let Some(tactic) = extracted
        .node(id)
        .and_then(|n| n.tactic_id.as_deref())
        .and_then(Tactic::from_code)
    {
        lines.push(format!("Fuzzy Tactic: {} ({})", tactic.name(), tactic.code()));
    }
    lines.join("\n")
}

/// Adds an arc, logging and absorbing rejections.
fn try_arc(net: &mut Network, src: &str, dst: &str) -> bool {
    match net.add_arc(src, dst) {
        Ok(()) => true,
        Err(ModelError::DuplicateArc { .. }) => {
            debug!(src, dst, "arc already present");
            false
        }
        Err(err) => {
            warn!(src, dst, %err, "skipping arc");
            false
        }
    }
}

fn full_strengths(card: usize) -> Vec<u8> {
    (0..card).map(|s| s as u8).collect()
}

fn wire_partitions(
    extracted: &ExtractedGraph,
    groups: &Groups,
    net: &mut Network,
    covered: &mut FxHashSet<(String, String)>,
) -> Result<(), CompileError> {
    for partition in &groups.partitions {
        let sid = sanitize(&partition.node_id);
        let states = net
            .variable(&sid)
            .map(|v| v.states)
            .ok_or_else(|| CompileError::Internal(format!("missing partition node {}", sid)))?;
        for (i, members) in partition.groups.iter().enumerate() {
            let gate = format!("{}_grp{}", sid, i + 1);
            net.add_variable(&gate, VariableKind::NoisyMax, states)?;
            net.set_name(
                &gate,
                &format!("{} group {}", extracted.display_name(&partition.node_id), i + 1),
            )?;
            for member in members {
                let member_sid = sanitize(member);
                if try_arc(net, &member_sid, &gate) {
                    if let Some(card) = net.cardinality(&member_sid) {
                        if let Err(err) = net.set_noisy_strengths(&gate, &member_sid, full_strengths(card))
                        {
                            warn!(gate, parent = %member_sid, %err, "could not set gate strengths");
                        }
                    }
                }
                covered.insert((member.clone(), partition.node_id.clone()));
            }
            try_arc(net, &gate, &sid);
        }
    }
    Ok(())
}

fn wire_logic(
    groups: &Groups,
    net: &mut Network,
    covered: &mut FxHashSet<(String, String)>,
) -> Result<(), CompileError> {
    for logic in &groups.logics {
        let sid = sanitize(&logic.node_id);
        match logic.op {
            LogicOp::Or => {
                let states = net
                    .variable(&sid)
                    .map(|v| v.states)
                    .ok_or_else(|| CompileError::Internal(format!("missing logic node {}", sid)))?;
                net.replace_variable(&sid, VariableKind::NoisyMax, states)?;
                for parent in &logic.parents {
                    let parent_sid = sanitize(parent);
                    if try_arc(net, &parent_sid, &sid) {
                        if let Some(card) = net.cardinality(&parent_sid) {
                            if let Err(err) =
                                net.set_noisy_strengths(&sid, &parent_sid, full_strengths(card))
                            {
                                warn!(gate = %sid, parent = %parent_sid, %err, "could not set gate strengths");
                            }
                        }
                    }
                    covered.insert((parent.clone(), logic.node_id.clone()));
                }
            }
            LogicOp::And => {
                for parent in &logic.parents {
                    try_arc(net, &sanitize(parent), &sid);
                    covered.insert((parent.clone(), logic.node_id.clone()));
                }
                if let Some(table) = and_table(net, &sid) {
                    if let Err(err) = net.set_cpt(&sid, table) {
                        warn!(id = %sid, %err, "could not set AND table");
                    }
                }
            }
        }
    }
    Ok(())
}

/// Deterministic conjunction table: the child tracks the weakest parent.
///
/// Each row takes the minimum normalized activation across the decoded
/// parent states; a binary child splits its mass `[1-m, m]`, a wider
/// child concentrates on the nearest state.
fn and_table(net: &Network, sid: &str) -> Option<Vec<f64>> {
    let cards = net.parent_cardinalities(sid)?;
    if cards.is_empty() {
        return None;
    }
    let own = net.cardinality(sid)?;
    let rows = combination_count(&cards);
    let mut table = Vec::with_capacity(rows * own);
    for row in 0..rows {
        let states = decode_row(row, &cards);
        let m = states
            .iter()
            .zip(cards.iter())
            .map(|(&s, &c)| normalized_activation(s, c))
            .fold(1.0f64, f64::min);
        if own == 2 {
            table.extend([1.0 - m, m]);
        } else {
            let mut one_hot = vec![0.0; own];
            let target = (m * (own - 1) as f64).round() as usize;
            one_hot[target.min(own - 1)] = 1.0;
            table.extend(one_hot);
        }
    }
    Some(table)
}

fn wire_divorce(
    extracted: &ExtractedGraph,
    groups: &Groups,
    net: &mut Network,
    covered: &mut FxHashSet<(String, String)>,
    hub_fed: &mut FxHashSet<String>,
) -> Result<(), CompileError> {
    let partitioned: FxHashSet<&str> = groups
        .partitions
        .iter()
        .map(|p| p.node_id.as_str())
        .collect();
    let operators: FxHashSet<&str> = groups.logics.iter().map(|l| l.node_id.as_str()).collect();

    for divorce in &groups.divorces {
        // Partitioned and operator children keep their own inbound
        // structure; routing them through a hub would fight it.
        let routed: Vec<&String> = divorce
            .children
            .iter()
            .filter(|c| !partitioned.contains(c.as_str()) && !operators.contains(c.as_str()))
            .collect();
        if routed.is_empty() {
            debug!(node = %divorce.node_id, "divorce suppressed, all children structured elsewhere");
            continue;
        }
        let sid = sanitize(&divorce.node_id);
        let hub = format!("{}_div", sid);
        net.add_variable(&hub, VariableKind::Cpt, StateSpace::Binary)?;
        net.set_name(
            &hub,
            &format!("{} hub", extracted.display_name(&divorce.node_id)),
        )?;
        try_arc(net, &sid, &hub);
        for child in routed {
            let child_sid = sanitize(child);
            if !try_arc(net, &hub, &child_sid) {
                continue;
            }
            hub_fed.insert(child.clone());
            covered.insert((divorce.node_id.clone(), child.clone()));
            if let Some(table) = divorce_child_table(net, &child_sid, &hub) {
                if let Err(err) = net.set_cpt(&child_sid, table) {
                    warn!(id = %child_sid, %err, "could not set hub child table");
                }
            }
        }
    }
    Ok(())
}

/// Child table driven by the hub's state, decoded at the hub's position
/// in the child's full parent set.
fn divorce_child_table(net: &Network, child_sid: &str, hub: &str) -> Option<Vec<f64>> {
    let parents = net.parents_of(child_sid)?;
    let hub_pos = parents.iter().position(|p| p == hub)?;
    let cards = net.parent_cardinalities(child_sid)?;
    let own = net.cardinality(child_sid)?;
    let rows = combination_count(&cards);
    let mut table = Vec::with_capacity(rows * own);
    for row in 0..rows {
        let hub_true = decode_row(row, &cards)[hub_pos] == 1;
        if own == 2 {
            // Deterministic copy of the hub state.
            table.extend(if hub_true { [0.0, 1.0] } else { [1.0, 0.0] });
        } else {
            table.extend(if hub_true { DIVORCE_HIGH } else { DIVORCE_LOW });
        }
    }
    Some(table)
}

fn wire_remaining(
    extracted: &ExtractedGraph,
    net: &mut Network,
    covered: &FxHashSet<(String, String)>,
    hub_fed: &FxHashSet<String>,
) {
    for (src, dst) in &extracted.edges {
        if covered.contains(&(src.clone(), dst.clone())) {
            continue;
        }
        if hub_fed.contains(dst) {
            debug!(src = %src, dst = %dst, "edge absorbed by divorce hub");
            continue;
        }
        try_arc(net, &sanitize(src), &sanitize(dst));
    }
}

/// Fuzzy parameters for one tactic node: schema defaults, adjusted by
/// posture keywords in the node's text, then caller overrides.
fn tactic_params(
    evaluator: &TacticEvaluator,
    tactic: Tactic,
    node: &FlowNode,
    overrides: Option<&FxHashMap<String, f64>>,
) -> FxHashMap<String, f64> {
    let mut params: FxHashMap<String, f64> = evaluator
        .default_params(tactic)
        .into_iter()
        .map(|(name, default)| (name.to_string(), default))
        .collect();

    // Skill cues live in the technique field, detection cues in the
    // free-text description.
    let technique = node.technique_id.as_deref().unwrap_or("").to_lowercase();
    let description = node.description.as_deref().unwrap_or("").to_lowercase();
    let mentions = |haystack: &str, words: &[&str]| words.iter().any(|w| haystack.contains(w));
    fn bump(params: &mut FxHashMap<String, f64>, key: &str, delta: f64) {
        if let Some(value) = params.get_mut(key) {
            *value += delta;
        }
    }
    if mentions(&technique, &["rootkit", "kernel", "driver"]) {
        bump(&mut params, "skill_requirement", 30.0);
    }
    if mentions(&technique, &["script", "macro", "email"]) {
        bump(&mut params, "skill_requirement", -20.0);
    }
    if mentions(&description, &["stealth", "hidden", "covert"]) {
        bump(&mut params, "detection_difficulty", 20.0);
    }
    if mentions(&description, &["obvious", "visible", "logged"]) {
        bump(&mut params, "detection_difficulty", -20.0);
    }

    if let Some(overrides) = overrides {
        for (key, value) in overrides {
            params.insert(key.clone(), *value);
        }
    }
    params
}

/// Shifts a fuzzy membership row by the mean parent influence.
///
/// Weak parent evidence moves mass toward the low states, strong
/// evidence toward the high states; the neutral band 0.3..=0.7 leaves
/// the membership untouched before flooring.
fn blend_row(membership: &[f64; 5], avg: f64) -> Vec<f64> {
    let mut row = membership.to_vec();
    if avg < 0.3 {
        let shift = (0.3 - avg) * 0.3;
        const DOWN: [f64; 5] = [0.2, 0.15, -0.1, -0.15, -0.1];
        for (cell, w) in row.iter_mut().zip(DOWN) {
            *cell += shift * w;
        }
    } else if avg > 0.7 {
        let shift = (avg - 0.7) * 0.3;
        const UP: [f64; 5] = [-0.1, -0.15, -0.1, 0.15, 0.2];
        for (cell, w) in row.iter_mut().zip(UP) {
            *cell += shift * w;
        }
    }
    floor_and_normalize(&mut row, CPT_FLOOR);
    row
}

fn tactic_table(net: &Network, sid: &str, membership: &[f64; 5]) -> Vec<f64> {
    let cards = net.parent_cardinalities(sid).unwrap_or_default();
    if cards.is_empty() {
        return membership.to_vec();
    }
    let rows = combination_count(&cards);
    let mut table = Vec::with_capacity(rows * 5);
    for row in 0..rows {
        let states = decode_row(row, &cards);
        let avg = average_influence(&states, &cards);
        table.extend(blend_row(membership, avg));
    }
    table
}

/// Heuristic table for variables nothing else specified.
fn default_cpt(net: &mut Network, sid: &str) -> Result<(), CompileError> {
    let own = net
        .cardinality(sid)
        .ok_or_else(|| CompileError::Internal(format!("missing variable {}", sid)))?;
    let cards = net.parent_cardinalities(sid).unwrap_or_default();
    let table = if cards.is_empty() {
        if own == 2 {
            vec![0.7, 0.3]
        } else {
            NEUTRAL_ROW.to_vec()
        }
    } else {
        let rows = combination_count(&cards);
        let mut table = Vec::with_capacity(rows * own);
        for row in 0..rows {
            if own == 2 {
                let avg = average_influence(&decode_row(row, &cards), &cards);
                let p = (0.2 + 0.7 * avg).clamp(0.1, 0.9);
                table.extend([1.0 - p, p]);
            } else {
                table.extend(NEUTRAL_ROW);
            }
        }
        table
    };
    net.set_cpt(sid, table)?;
    Ok(())
}

fn compute_cpts(
    extracted: &ExtractedGraph,
    config: &CompileConfig,
    sid_to_orig: &FxHashMap<String, String>,
    net: &mut Network,
) -> Result<(), CompileError> {
    let evaluator = TacticEvaluator::new();
    let ids: Vec<String> = net.variables().iter().map(|v| v.id.clone()).collect();
    for sid in ids {
        let node = sid_to_orig.get(&sid).and_then(|orig| extracted.node(orig));
        let tactic = node
            .and_then(|n| n.tactic_id.as_deref())
            .and_then(Tactic::from_code);
        match (node, tactic) {
            (Some(node), Some(tactic)) => {
                // Fuzzy tables win over anything a gate phase set.
                let params = tactic_params(
                    &evaluator,
                    tactic,
                    node,
                    config.fuzzy_overrides.get(&node.id),
                );
                let membership = evaluator.membership(tactic, &params);
                let table = tactic_table(net, &sid, &membership);
                if let Err(err) = net.set_cpt(&sid, table) {
                    warn!(id = %sid, %err, "fuzzy table rejected, using default");
                    default_cpt(net, &sid)?;
                }
            }
            _ => {
                let has_cpt = net
                    .variable(&sid)
                    .map(|v| v.cpt.is_some())
                    .unwrap_or(false);
                if !has_cpt {
                    default_cpt(net, &sid)?;
                }
            }
        }
    }
    Ok(())
}
