// Route precomputation for the privileged cluster.
//
// Every unordered pair of privileged systems within `max_range` gets an A*
// route over the cost grid. The pair searches are embarrassingly parallel —
// each reads the immutable grid and writes an independent record, with no
// PRNG involvement — so they fan out across a rayon pool. Aggregation must
// not depend on completion order: collected routes are sorted by their
// endpoint-id key before anything else looks at them.
//
// Only one direction is stored per pair, keyed by the total order on
// `SystemId`: the smaller id is always the origin. Step costs are symmetric
// (see `pathfinding.rs`), so the reverse direction is the reversed
// coordinate sequence at the identical total cost.
//
// After precomputation the route graph must be globally connected. While it
// is not, a bridge edge is added via full-distance A* between the closest
// pair of systems straddling the smallest component — bounded attempts,
// then a hard error. The validation is mandatory, not advisory.
//
// See also: `cluster.rs` which selects the privileged set, `pipeline.rs`
// for the stage ordering.

use crate::config::RouteParams;
use crate::costfield::CostGrid;
use crate::pathfinding::astar;
use crate::starmap::System;
use crate::types::{Coord, SystemId};
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// A precomputed route between two privileged systems.
///
/// `origin` is always the smaller endpoint id; the stored path runs
/// origin → dest. Reversing the coordinate sequence gives the other
/// direction at the same total cost.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub origin: SystemId,
    pub dest: SystemId,
    pub total_cost: f64,
    pub path: Vec<Coord>,
}

/// The route graph could not be connected within the bridge budget.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DisconnectedError {
    /// Components remaining when the budget ran out.
    pub components: usize,
    pub attempts: u32,
}

impl fmt::Display for DisconnectedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "route graph still has {} components after {} bridge attempts",
            self.components, self.attempts
        )
    }
}

impl std::error::Error for DisconnectedError {}

/// Precompute routes among privileged systems and guarantee the route
/// graph is connected.
pub fn precompute_routes(
    systems: &[System],
    grid: &CostGrid,
    params: &RouteParams,
) -> Result<Vec<Route>, DisconnectedError> {
    let privileged: Vec<&System> = systems.iter().filter(|s| s.is_privileged).collect();

    let pairs: Vec<(usize, usize)> = (0..privileged.len())
        .flat_map(|i| (i + 1..privileged.len()).map(move |j| (i, j)))
        .filter(|&(i, j)| privileged[i].coord.distance(privileged[j].coord) <= params.max_range)
        .collect();

    // Independent pair searches against the immutable grid; completion
    // order is unobservable thanks to the sort below.
    let mut routes: Vec<Route> = pairs
        .par_iter()
        .filter_map(|&(i, j)| route_between(privileged[i], privileged[j], grid))
        .collect();
    routes.sort_by(|a, b| (a.origin, a.dest).cmp(&(b.origin, b.dest)));
    log::info!(
        "precomputed {} routes over {} privileged pairs in range",
        routes.len(),
        pairs.len()
    );

    // Mandatory connectivity validation with bounded bridge repair.
    let mut attempts = 0;
    loop {
        let components = component_assignment(&privileged, &routes);
        let component_count = count_components(&components);
        if component_count <= 1 {
            break;
        }
        if attempts >= params.max_bridge_attempts {
            return Err(DisconnectedError {
                components: component_count,
                attempts,
            });
        }
        attempts += 1;
        match bridge_route(&privileged, &components, grid) {
            Some(bridge) => {
                log::info!(
                    "bridging route graph ({} components), attempt {}",
                    component_count,
                    attempts
                );
                routes.push(bridge);
                routes.sort_by(|a, b| (a.origin, a.dest).cmp(&(b.origin, b.dest)));
            }
            None => {
                return Err(DisconnectedError {
                    components: component_count,
                    attempts,
                });
            }
        }
    }

    Ok(routes)
}

/// Run one pair's A* and orient the result so the smaller id is the origin.
fn route_between(a: &System, b: &System, grid: &CostGrid) -> Option<Route> {
    let result = astar(grid, a.coord, b.coord)?;
    let (origin, dest, path) = if a.id <= b.id {
        (a.id, b.id, result.cells)
    } else {
        let mut reversed = result.cells;
        reversed.reverse();
        (b.id, a.id, reversed)
    };
    Some(Route {
        origin,
        dest,
        total_cost: result.total_cost,
        path,
    })
}

/// Number of connected components in the privileged route graph.
pub fn connected_components(systems: &[System], routes: &[Route]) -> usize {
    let privileged: Vec<&System> = systems.iter().filter(|s| s.is_privileged).collect();
    count_components(&component_assignment(&privileged, routes))
}

/// BFS labeling: `assignment[i]` is the component id of `privileged[i]`.
fn component_assignment(privileged: &[&System], routes: &[Route]) -> Vec<usize> {
    let index_of: FxHashMap<SystemId, usize> = privileged
        .iter()
        .enumerate()
        .map(|(i, s)| (s.id, i))
        .collect();
    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); privileged.len()];
    for route in routes {
        if let (Some(&a), Some(&b)) = (index_of.get(&route.origin), index_of.get(&route.dest)) {
            adjacency[a].push(b);
            adjacency[b].push(a);
        }
    }

    let mut assignment = vec![usize::MAX; privileged.len()];
    let mut next_component = 0;
    for start in 0..privileged.len() {
        if assignment[start] != usize::MAX {
            continue;
        }
        let mut queue = VecDeque::new();
        assignment[start] = next_component;
        queue.push_back(start);
        while let Some(node) = queue.pop_front() {
            for &neighbor in &adjacency[node] {
                if assignment[neighbor] == usize::MAX {
                    assignment[neighbor] = next_component;
                    queue.push_back(neighbor);
                }
            }
        }
        next_component += 1;
    }
    assignment
}

fn count_components(assignment: &[usize]) -> usize {
    assignment.iter().max().map(|&m| m + 1).unwrap_or(0)
}

/// Build a bridge route between the smallest component and the rest: the
/// closest pair of systems straddling it, connected by full-distance A*
/// (no range cap).
fn bridge_route(
    privileged: &[&System],
    assignment: &[usize],
    grid: &CostGrid,
) -> Option<Route> {
    let component_count = count_components(assignment);
    // Pick the smallest component; ties resolve to the lowest component id,
    // which is itself assigned in deterministic index order.
    let mut sizes = vec![0usize; component_count];
    for &c in assignment {
        sizes[c] += 1;
    }
    let smallest = sizes
        .iter()
        .enumerate()
        .min_by_key(|&(_, &size)| size)
        .map(|(c, _)| c)?;

    let mut best: Option<(f64, usize, usize)> = None;
    for (i, a) in privileged.iter().enumerate() {
        if assignment[i] != smallest {
            continue;
        }
        for (j, b) in privileged.iter().enumerate() {
            if assignment[j] == smallest {
                continue;
            }
            let dist = a.coord.distance(b.coord);
            let better = match best {
                None => true,
                Some((best_dist, _, _)) => dist < best_dist,
            };
            if better {
                best = Some((dist, i, j));
            }
        }
    }

    let (_, i, j) = best?;
    route_between(privileged[i], privileged[j], grid)
}
