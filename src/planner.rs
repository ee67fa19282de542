//! The constrained BFS behind `Agent::modify_path` (spec §4.5).

use std::collections::HashSet;

use crate::agent::Agent;
use crate::geometry::{self, Grid, Orientation, Point, SUB_STEPS_PER_CELL};

struct SearchState {
    cell: (i64, i64),
    orientation: Orientation,
    /// Cells traversed since the search root, not sub-steps.
    t: usize,
    parent: Option<usize>,
}

fn to_cell(p: Point) -> (i64, i64) {
    (p.0.round() as i64, p.1.round() as i64)
}

fn cell_as_point(c: (i64, i64)) -> Point {
    (c.0 as f64, c.1 as f64)
}

/// Search for a cell path from `agent`'s current position to its
/// destination that avoids every higher-priority peer's published path.
/// Returns `None` on dead end (frontier exhausted).
pub(crate) fn search(agent: &Agent, grid: &Grid) -> Option<Vec<(i64, i64)>> {
    let dest = to_cell(agent.destination);
    let start = to_cell((agent.x, agent.y));
    let fleet_size = agent.fleet_size();
    let eta_cells = agent.eta / SUB_STEPS_PER_CELL;

    let priority = agent
        .recognized_priority
        .as_ref()
        .expect("recognized_priority must be set before planning");
    let self_index = priority
        .iter()
        .position(|&id| id == agent.id)
        .expect("agent id must appear in its own priority list");
    let higher_priority = &priority[..self_index];

    let mut arena = vec![SearchState {
        cell: start,
        orientation: agent.orientation,
        t: 0,
        parent: None,
    }];
    let mut used: HashSet<(i64, i64, usize)> = HashSet::new();
    used.insert((start.0, start.1, geometry::orientation_id(agent.orientation)));
    let mut ptr = 0usize;

    loop {
        if ptr >= arena.len() {
            return None;
        }
        let current = ptr;
        if arena[current].cell == dest {
            return Some(reconstruct(&arena, current));
        }
        ptr += 1;

        let cur_cell = arena[current].cell;
        let cur_orientation = arena[current].orientation;
        let cur_t = arena[current].t;

        for &mv in geometry::preference_list(cur_cell, dest).iter() {
            if mv.0 + cur_orientation.0 == 0 && mv.1 + cur_orientation.1 == 0 {
                continue; // no U-turn
            }
            let next_cell = (cur_cell.0 + mv.0, cur_cell.1 + mv.1);
            if !grid.in_bounds(next_cell) {
                continue;
            }
            let next_t = cur_t + 1;
            let orien_id = geometry::orientation_id(mv);
            if used.contains(&(next_cell.0, next_cell.1, orien_id)) {
                continue;
            }
            if !peer_path_safe(agent, higher_priority, cur_cell, next_cell, next_t) {
                continue;
            }
            let h = (next_cell.0 - dest.0).abs() + (next_cell.1 - dest.1).abs();
            if (next_t as i64) + h > eta_cells as i64 + fleet_size as i64 * 2 - 2 {
                continue;
            }

            used.insert((next_cell.0, next_cell.1, orien_id));
            arena.push(SearchState {
                cell: next_cell,
                orientation: mv,
                t: next_t,
                parent: Some(current),
            });
        }
    }
}

/// Rejects a candidate cell that would put `agent` in conflict with a
/// higher-priority peer's already-published path (§4.5 rule 4).
fn peer_path_safe(
    agent: &Agent,
    higher_priority_ids: &[usize],
    cur_cell: (i64, i64),
    next_cell: (i64, i64),
    next_t: usize,
) -> bool {
    let tau = SUB_STEPS_PER_CELL * next_t;
    let next_point = cell_as_point(next_cell);
    let cur_point = cell_as_point(cur_cell);

    for &pid in higher_priority_ids {
        let Some(peer) = &agent.inbox[pid] else {
            continue;
        };
        let peer_path = &peer.path;
        let peer_cell_pos = (peer.x, peer.y);

        if peer_path.len() >= tau && tau >= 1 {
            if geometry::points_eq(peer_path[tau - 1], next_point) {
                return false;
            }
        }

        if next_point == peer_cell_pos {
            if let Some(&swap_point) = peer_path.get(SUB_STEPS_PER_CELL - 1) {
                if geometry::points_eq(swap_point, cur_point) {
                    return false;
                }
            }
        }

        if tau >= SUB_STEPS_PER_CELL + 1 && peer_path.len() >= tau && peer_path.len() >= 2 * SUB_STEPS_PER_CELL {
            let back = peer_path[tau - SUB_STEPS_PER_CELL - 1];
            let arrival = peer_path[tau - 1];
            if geometry::points_eq(back, next_point) && geometry::points_eq(arrival, cur_point) {
                return false;
            }
        }
    }
    true
}

fn reconstruct(arena: &[SearchState], mut idx: usize) -> Vec<(i64, i64)> {
    let mut cells = Vec::new();
    loop {
        cells.push(arena[idx].cell);
        match arena[idx].parent {
            Some(p) => idx = p,
            None => break,
        }
    }
    cells.reverse();
    cells
}
