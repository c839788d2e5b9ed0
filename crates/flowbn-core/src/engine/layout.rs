//! Layered layout for synthesized networks.
//!
//! Breadth-first leveling from the root variables, each level rendered
//! as one horizontally centered row. Positions are cosmetic only.

use rustc_hash::FxHashMap;

use flowbn_model::{ModelError, Network, Rect};

const NODE_WIDTH: i32 = 120;
const NODE_HEIGHT: i32 = 60;
const H_GAP: i32 = 40;
const V_GAP: i32 = 100;
const MARGIN_X: i32 = 50;
const MARGIN_Y: i32 = 50;

/// Assigns a position rectangle to every variable.
pub fn assign_layout(net: &mut Network) -> Result<(), ModelError> {
    let ids: Vec<String> = net.variables().iter().map(|v| v.id.clone()).collect();
    if ids.is_empty() {
        return Ok(());
    }

    let mut level: FxHashMap<&str, usize> = FxHashMap::default();
    let mut queue: Vec<&str> = ids
        .iter()
        .filter(|id| net.parents_of(id).map(<[String]>::is_empty).unwrap_or(true))
        .map(String::as_str)
        .collect();
    if queue.is_empty() {
        // Fully connected component with no roots cannot happen in a DAG,
        // but seed from the first variable to stay total.
        queue.push(ids[0].as_str());
    }
    for root in &queue {
        level.insert(*root, 0);
    }
    let mut cursor = 0;
    while cursor < queue.len() {
        let current = queue[cursor];
        cursor += 1;
        let next = level[current] + 1;
        for id in &ids {
            if level.contains_key(id.as_str()) {
                continue;
            }
            let has_arc = net
                .parents_of(id)
                .map(|ps| ps.iter().any(|p| p == current))
                .unwrap_or(false);
            if has_arc {
                level.insert(id.as_str(), next);
                queue.push(id.as_str());
            }
        }
    }
    // Anything unreachable from a root lands on the first row.
    for id in &ids {
        level.entry(id.as_str()).or_insert(0);
    }

    let depth = level.values().copied().max().unwrap_or(0);
    let mut rows: Vec<Vec<&str>> = vec![Vec::new(); depth + 1];
    for id in &ids {
        rows[level[id.as_str()]].push(id.as_str());
    }
    for row in &mut rows {
        row.sort_unstable();
    }

    let row_width =
        |n: usize| -> i32 { n as i32 * NODE_WIDTH + (n.saturating_sub(1)) as i32 * H_GAP };
    let max_width = rows.iter().map(|r| row_width(r.len())).max().unwrap_or(0);

    let mut positions: Vec<(String, Rect)> = Vec::with_capacity(ids.len());
    for (row_idx, row) in rows.iter().enumerate() {
        let y1 = MARGIN_Y + row_idx as i32 * (NODE_HEIGHT + V_GAP);
        let x_start = MARGIN_X + (max_width - row_width(row.len())) / 2;
        for (col, id) in row.iter().enumerate() {
            let x1 = x_start + col as i32 * (NODE_WIDTH + H_GAP);
            positions.push((
                (*id).to_string(),
                Rect {
                    x1,
                    y1,
                    x2: x1 + NODE_WIDTH,
                    y2: y1 + NODE_HEIGHT,
                },
            ));
        }
    }
    for (id, rect) in positions {
        net.set_position(&id, rect)?;
    }
    Ok(())
}
