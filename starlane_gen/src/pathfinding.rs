// A* pathfinding over the traversal-cost grid.
//
// Implements standard A* using a `BinaryHeap` (min-heap via reversed
// ordering). Node scores and came-from data are stored in `Vec`s indexed by
// flat cell index for O(1) access and deterministic behavior (no `HashMap`).
//
// Movement is 8-directional. The cost of a step between two adjacent cells
// is the mean of the two cell costs, times √2 for diagonals — the mean makes
// every path cost symmetric, so a stored route and its reverse always sum to
// the same total. The heuristic is octile distance scaled by the grid's
// global minimum cell cost, which is admissible (no cell is cheaper than
// that minimum).
//
// This routine serves both batch route precomputation (`routes.rs`) and
// standalone on-demand queries against a loaded grid — wilderness travel
// uses exactly this function at runtime.
//
// See also: `costfield.rs` for the `CostGrid` being searched, `routes.rs`
// which fans pair queries out in parallel.
//
// **Critical constraint: determinism.** A* is a pure function of the grid
// and endpoints. Heap ties are broken by a monotonic insertion sequence so
// equal-cost paths always reconstruct the same shape.

use crate::costfield::CostGrid;
use crate::types::Coord;
use smallvec::SmallVec;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::f64::consts::SQRT_2;

/// The result of a successful A* search.
#[derive(Clone, Debug, PartialEq)]
pub struct PathResult {
    /// Sequence of grid coordinates from start to goal (inclusive).
    pub cells: Vec<Coord>,
    /// Total traversal cost.
    pub total_cost: f64,
}

/// Entry in the A* open set (min-heap via reversed ordering).
struct OpenEntry {
    index: usize,
    f_score: f64,
    /// Monotonic insertion counter; equal f-scores pop in insertion order.
    sequence: u64,
}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.f_score.total_cmp(&other.f_score) == Ordering::Equal
            && self.sequence == other.sequence
    }
}

impl Eq for OpenEntry {}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed for min-heap: smallest f_score is "greatest"; on ties
        // the earliest insertion wins.
        other
            .f_score
            .total_cmp(&self.f_score)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

const OFFSETS: [(i32, i32, bool); 8] = [
    (1, 0, false),
    (-1, 0, false),
    (0, 1, false),
    (0, -1, false),
    (1, 1, true),
    (1, -1, true),
    (-1, 1, true),
    (-1, -1, true),
];

/// Find the cheapest path from `start` to `goal` using A*.
///
/// Returns `None` if either endpoint lies outside the grid. Both endpoints
/// inside a non-empty grid always yield a path: walls are expensive, never
/// impassable.
pub fn astar(grid: &CostGrid, start: Coord, goal: Coord) -> Option<PathResult> {
    let (sx, sy) = grid.to_local(start)?;
    let (gx, gy) = grid.to_local(goal)?;
    let width = grid.width() as usize;
    let height = grid.height() as usize;
    let cells = grid.cells();
    let start_idx = sx as usize + sy as usize * width;
    let goal_idx = gx as usize + gy as usize * width;

    if start_idx == goal_idx {
        return Some(PathResult {
            cells: vec![start],
            total_cost: 0.0,
        });
    }

    let n = width * height;
    // g_score[cell] = cost of cheapest known path from start to cell.
    let mut g_score = vec![f64::INFINITY; n];
    let mut came_from: Vec<Option<usize>> = vec![None; n];
    let mut closed = vec![false; n];

    g_score[start_idx] = 0.0;

    let mut open = BinaryHeap::new();
    let mut sequence: u64 = 0;
    open.push(OpenEntry {
        index: start_idx,
        f_score: heuristic(sx, sy, gx, gy, grid.min_cost()),
        sequence,
    });

    while let Some(current) = open.pop() {
        let ci = current.index;

        if ci == goal_idx {
            return Some(reconstruct_path(grid, &came_from, start_idx, goal_idx, g_score[ci]));
        }

        if closed[ci] {
            continue;
        }
        closed[ci] = true;

        let current_g = g_score[ci];
        let cx = (ci % width) as i32;
        let cy = (ci / width) as i32;

        for (neighbor, step_cost) in neighbor_steps(cells, width, height, cx, cy) {
            if closed[neighbor] {
                continue;
            }
            let tentative_g = current_g + step_cost;
            if tentative_g < g_score[neighbor] {
                g_score[neighbor] = tentative_g;
                came_from[neighbor] = Some(ci);
                let nx = (neighbor % width) as u32;
                let ny = (neighbor / width) as u32;
                sequence += 1;
                open.push(OpenEntry {
                    index: neighbor,
                    f_score: tentative_g + heuristic(nx, ny, gx, gy, grid.min_cost()),
                    sequence,
                });
            }
        }
    }

    None
}

/// In-bounds neighbors of `(cx, cy)` with their symmetric step costs, in
/// the fixed `OFFSETS` order.
fn neighbor_steps(
    cells: &[f64],
    width: usize,
    height: usize,
    cx: i32,
    cy: i32,
) -> SmallVec<[(usize, f64); 8]> {
    let mut out = SmallVec::new();
    let ci = cx as usize + cy as usize * width;
    for (dx, dy, diagonal) in OFFSETS {
        let nx = cx + dx;
        let ny = cy + dy;
        if nx < 0 || ny < 0 || nx >= width as i32 || ny >= height as i32 {
            continue;
        }
        let ni = nx as usize + ny as usize * width;
        let mut step = 0.5 * (cells[ci] + cells[ni]);
        if diagonal {
            step *= SQRT_2;
        }
        out.push((ni, step));
    }
    out
}

/// Admissible heuristic: octile distance × the grid's minimum cell cost.
fn heuristic(x: u32, y: u32, gx: u32, gy: u32, min_cost: f64) -> f64 {
    let dx = f64::from(x.abs_diff(gx));
    let dy = f64::from(y.abs_diff(gy));
    let (long, short) = if dx > dy { (dx, dy) } else { (dy, dx) };
    (long + (SQRT_2 - 1.0) * short) * min_cost
}

/// Re-sum a path's movement costs with the same symmetric step rule A*
/// uses. Returns `None` if the path is empty, leaves the grid, or contains
/// a non-adjacent step.
pub fn path_cost(grid: &CostGrid, path: &[Coord]) -> Option<f64> {
    if path.is_empty() {
        return None;
    }
    let mut total = 0.0;
    for pair in path.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let dx = (a.x - b.x).abs();
        let dy = (a.y - b.y).abs();
        if dx > 1 || dy > 1 || (dx == 0 && dy == 0) {
            return None;
        }
        let mut step = 0.5 * (grid.cost(a)? + grid.cost(b)?);
        if dx == 1 && dy == 1 {
            step *= SQRT_2;
        }
        total += step;
    }
    Some(total)
}

/// Reconstruct the path from came-from data.
fn reconstruct_path(
    grid: &CostGrid,
    came_from: &[Option<usize>],
    start_idx: usize,
    goal_idx: usize,
    total_cost: f64,
) -> PathResult {
    let width = grid.width() as usize;
    let mut cells = Vec::new();
    let mut current = goal_idx;
    loop {
        cells.push(grid.to_world((current % width) as u32, (current / width) as u32));
        if current == start_idx {
            break;
        }
        match came_from[current] {
            Some(prev) => current = prev,
            None => break,
        }
    }
    cells.reverse();
    PathResult { cells, total_cost }
}
