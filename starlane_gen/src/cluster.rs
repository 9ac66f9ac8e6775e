// Privileged-cluster selection: core exclusion, greedy growth, and
// open-cell verification with corridor repair.
//
// The privileged cluster (the charted region every consumer knows from the
// start) is grown greedily from the densest eligible system: systems inside
// the core exclusion radius are never eligible, the remainder are scored by
// neighbor count within the cluster radius, and the cluster repeatedly
// absorbs the nearest unselected eligible system until it reaches its
// target size.
//
// A cluster stranded inside cost-field walls would make every precomputed
// route absurdly expensive, so selection ends with a verification pass: if
// too few members sit on open cells, a breadth-first flood across wall
// cells carves a corridor from each stranded member to the nearest open
// cell. The repair is bounded and its exhaustion is a hard error — never
// silently ignored.
//
// See also: `density.rs` for the neighbor index reused for scoring,
// `costfield.rs` for `carve_open`, `routes.rs` for what the cluster feeds.
//
// **Critical constraint: determinism.** Scoring, seeding, greedy growth,
// and the flood fill all iterate in fixed index order with explicit
// tie-breaks; no randomness is drawn here.

use crate::config::{ClusterParams, CostFieldParams};
use crate::costfield::CostGrid;
use crate::density::DensityIndex;
use crate::starmap::System;
use crate::types::Coord;
use std::collections::VecDeque;
use std::fmt;

/// The cluster could not be moved onto open cells within the repair budget.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StrandedError {
    pub attempts: u32,
}

impl fmt::Display for StrandedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "privileged cluster still stranded in wall cells after {} repair attempts",
            self.attempts
        )
    }
}

impl std::error::Error for StrandedError {}

/// Select the privileged cluster, mark `is_core` / `is_privileged` on the
/// systems, and guarantee the cluster sits on open cost-field cells.
///
/// Returns the indices of the selected systems in selection order.
pub fn select_cluster(
    systems: &mut [System],
    grid: &mut CostGrid,
    params: &ClusterParams,
    cost_params: &CostFieldParams,
) -> Result<Vec<usize>, StrandedError> {
    for system in systems.iter_mut() {
        system.is_core = system.coord.distance_from_origin() <= params.core_exclusion_radius;
    }

    let coords: Vec<Coord> = systems.iter().map(|s| s.coord).collect();
    let eligible: Vec<usize> = systems
        .iter()
        .enumerate()
        .filter(|(_, s)| !s.is_core)
        .map(|(i, _)| i)
        .collect();
    if eligible.is_empty() {
        log::warn!("no systems outside the core exclusion radius; cluster is empty");
        return Ok(Vec::new());
    }

    // Seed at the highest-scoring eligible system; ties go to the lowest
    // index.
    let scores = DensityIndex::build(&coords, params.cluster_radius);
    let seed = eligible
        .iter()
        .copied()
        .max_by(|&a, &b| {
            scores
                .neighbor_count(a)
                .cmp(&scores.neighbor_count(b))
                .then_with(|| b.cmp(&a))
        })
        .expect("eligible set is non-empty");

    // Greedy growth: absorb the eligible system nearest to any current
    // member until the target count is reached.
    let mut selected = vec![seed];
    let mut in_cluster = vec![false; systems.len()];
    in_cluster[seed] = true;
    let mut best_dist: Vec<f64> = eligible
        .iter()
        .map(|&i| coords[i].distance(coords[seed]))
        .collect();

    while selected.len() < params.target_size {
        let mut next: Option<(f64, usize)> = None;
        for (slot, &candidate) in eligible.iter().enumerate() {
            if in_cluster[candidate] {
                continue;
            }
            let dist = best_dist[slot];
            let better = match next {
                None => true,
                Some((best, _)) => dist < best,
            };
            if better {
                next = Some((dist, candidate));
            }
        }
        let Some((_, candidate)) = next else {
            break; // eligible systems exhausted before reaching the target
        };
        in_cluster[candidate] = true;
        selected.push(candidate);
        for (slot, &other) in eligible.iter().enumerate() {
            if !in_cluster[other] {
                best_dist[slot] = best_dist[slot].min(coords[other].distance(coords[candidate]));
            }
        }
    }

    for &i in &selected {
        systems[i].is_privileged = true;
    }

    // Verification: the cluster must sit substantially on open cells.
    let mut attempts = 0;
    while open_fraction(systems, &selected, grid) < params.min_open_fraction {
        if attempts >= params.max_repair_attempts {
            return Err(StrandedError { attempts });
        }
        attempts += 1;
        let mut carved = 0;
        for &i in &selected {
            let coord = systems[i].coord;
            if !grid.is_open(coord) {
                carved += carve_corridor(grid, coord, cost_params);
            }
        }
        log::info!(
            "cluster repair attempt {}: carved {} cells open",
            attempts,
            carved
        );
        if carved == 0 {
            // Nothing left to carve (e.g. a grid with no open region at
            // all); further attempts cannot make progress.
            return Err(StrandedError { attempts });
        }
    }

    Ok(selected)
}

fn open_fraction(systems: &[System], selected: &[usize], grid: &CostGrid) -> f64 {
    if selected.is_empty() {
        return 1.0;
    }
    let open = selected
        .iter()
        .filter(|&&i| grid.is_open(systems[i].coord))
        .count();
    open as f64 / selected.len() as f64
}

/// Flood from a stranded cell across walls to the nearest open cell and
/// carve the discovered path open. Returns the number of cells carved.
///
/// Breadth-first with a fixed 4-neighbor order, so the corridor shape is
/// deterministic.
fn carve_corridor(grid: &mut CostGrid, from: Coord, cost_params: &CostFieldParams) -> usize {
    const STEPS: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

    if !grid.contains(from) || grid.is_open(from) {
        return 0;
    }

    let width = grid.width() as usize;
    let height = grid.height() as usize;
    let total = width * height;
    let index_of = |c: Coord, g: &CostGrid| -> Option<usize> {
        g.to_local(c).map(|(x, y)| x as usize + y as usize * width)
    };

    let mut visited = vec![false; total];
    let mut parent: Vec<Option<usize>> = vec![None; total];
    let mut queue = VecDeque::new();
    let start_idx = index_of(from, grid).expect("stranded cell is in bounds");
    visited[start_idx] = true;
    queue.push_back(from);

    let mut reached: Option<Coord> = None;
    'search: while let Some(cell) = queue.pop_front() {
        let cell_idx = index_of(cell, grid).expect("queued cells are in bounds");
        for (dx, dy) in STEPS {
            let next = Coord::new(cell.x + dx, cell.y + dy);
            let Some(next_idx) = index_of(next, grid) else {
                continue;
            };
            if visited[next_idx] {
                continue;
            }
            visited[next_idx] = true;
            parent[next_idx] = Some(cell_idx);
            if grid.is_open(next) {
                reached = Some(next);
                break 'search;
            }
            queue.push_back(next);
        }
    }

    // No open cell anywhere: nothing to carve toward.
    let Some(open_cell) = reached else { return 0 };

    // Walk parents back from the open cell, carving every wall cell on the
    // way (the open terminus itself needs no carving).
    let mut carved = 0;
    let mut cursor = index_of(open_cell, grid).expect("reached cell is in bounds");
    loop {
        let coord = grid.to_world((cursor % width) as u32, (cursor / width) as u32);
        if !grid.is_open(coord) {
            grid.carve_open(coord, cost_params);
            carved += 1;
        }
        match parent[cursor] {
            Some(prev) => cursor = prev,
            None => break,
        }
    }
    debug_assert!(grid.is_open(from));
    carved
}
