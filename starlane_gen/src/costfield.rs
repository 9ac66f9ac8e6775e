// Traversal-cost field: layered noise gated by a cellular-automata mask.
//
// The grid covers a padded bounding box of every system coordinate, one
// cell per integer map unit, stored flat in row-major order
// (`x + y * width`). Three layers stack onto it:
//
//   1. A fractal (multi-octave) coherent-noise layer giving per-cell
//      variation inside navigable space.
//   2. A cellular-automata open/wall mask: random fill with forced border
//      walls, then majority-rule iterations.
//   3. A second, independently-seeded noise layer applied only to wall
//      cells — a gradient of how occluded each wall cell is.
//
// Open cells cost `base_open_cost + open_weight * noise1`; wall cells cost
// `base_wall_cost + wall_weight * noise2`. Walls are expensive, never
// impassable: every cell cost is finite and at least `min_cost`, and the
// A* heuristic leans on that floor.
//
// Disconnected open regions are accepted as-is; `cluster.rs` carves
// corridors only where they would strand the privileged cluster, via
// `carve_open` (which recomposes the cost from the stored layer-1 noise).
//
// See also: `config.rs` for `CostFieldParams`, `pathfinding.rs` which
// searches this grid, `emit.rs` for quantized storage.
//
// **Critical constraint: determinism.** The two noise seeds and the
// row-major random fill are drawn from the shared PRNG in fixed order; the
// automata iterations are pure. Same rng state in ⇒ identical grid out.

use crate::config::CostFieldParams;
use crate::types::Coord;
use noise::{NoiseFn, Perlin};
use starlane_prng::WorldRng;

/// Dense 2D traversal-cost grid.
#[derive(Clone, Debug, Default)]
pub struct CostGrid {
    /// World coordinate of the local cell (0, 0).
    origin: Coord,
    width: u32,
    height: u32,
    /// Flat storage: index = x + y * width.
    cells: Vec<f64>,
    open: Vec<bool>,
    /// Layer-1 noise in [0, 1], kept so corridor carving can recompose an
    /// open-cell cost. Empty for grids rebuilt from quantized storage.
    base_noise: Vec<f64>,
    min_cost: f64,
    max_cost: f64,
}

impl CostGrid {
    /// Generate the cost field for the given system coordinates.
    ///
    /// Returns an empty zero-sized grid when `coords` is empty; the
    /// pipeline rejects empty galaxies before reaching this stage.
    pub fn generate(coords: &[Coord], params: &CostFieldParams, rng: &mut WorldRng) -> Self {
        if coords.is_empty() {
            return Self::default();
        }

        let min_x = coords.iter().map(|c| c.x).min().unwrap() - params.padding;
        let max_x = coords.iter().map(|c| c.x).max().unwrap() + params.padding;
        let min_y = coords.iter().map(|c| c.y).min().unwrap() - params.padding;
        let max_y = coords.iter().map(|c| c.y).max().unwrap() + params.padding;
        let width = (max_x - min_x + 1) as u32;
        let height = (max_y - min_y + 1) as u32;
        let origin = Coord::new(min_x, min_y);
        let total = width as usize * height as usize;

        // Noise seeds come out of the shared sequence before the fill draws.
        let open_noise = Perlin::new(rng.next_u32());
        let wall_noise = Perlin::new(rng.next_u32());

        let open = automata_mask(width, height, params, rng);

        let mut cells = vec![0.0; total];
        let mut base_noise = vec![0.0; total];
        let mut min_cost = f64::INFINITY;
        let mut max_cost = f64::NEG_INFINITY;
        for y in 0..height {
            for x in 0..width {
                let i = (x + y * width) as usize;
                let wx = f64::from(min_x + x as i32);
                let wy = f64::from(min_y + y as i32);
                let n1 = unit(fbm(
                    &open_noise,
                    wx * params.base_frequency,
                    wy * params.base_frequency,
                    params.octaves,
                    params.persistence,
                    params.lacunarity,
                ));
                base_noise[i] = n1;
                let cost = if open[i] {
                    params.base_open_cost + params.open_weight * n1
                } else {
                    let n2 = unit(wall_noise.get([wx * params.wall_frequency, wy * params.wall_frequency]));
                    params.base_wall_cost + params.wall_weight * n2
                };
                let cost = cost.max(params.min_cost);
                min_cost = min_cost.min(cost);
                max_cost = max_cost.max(cost);
                cells[i] = cost;
            }
        }

        Self {
            origin,
            width,
            height,
            cells,
            open,
            base_noise,
            min_cost,
            max_cost,
        }
    }

    /// Rebuild a grid from stored parts (decoded quantized storage or test
    /// fixtures). The layer-1 noise is gone, so `carve_open` on such a grid
    /// falls back to the midpoint open cost.
    pub fn from_parts(origin: Coord, width: u32, height: u32, cells: Vec<f64>, open: Vec<bool>) -> Self {
        let min_cost = cells.iter().copied().fold(f64::INFINITY, f64::min);
        let max_cost = cells.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Self {
            origin,
            width,
            height,
            cells,
            open,
            base_noise: Vec::new(),
            min_cost,
            max_cost,
        }
    }

    pub fn origin(&self) -> Coord {
        self.origin
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Smallest cell cost in the grid. The A* heuristic scales by this, so
    /// it must never exceed any actual cell cost.
    pub fn min_cost(&self) -> f64 {
        self.min_cost
    }

    pub fn max_cost(&self) -> f64 {
        self.max_cost
    }

    pub fn cells(&self) -> &[f64] {
        &self.cells
    }

    pub fn contains(&self, coord: Coord) -> bool {
        self.to_local(coord).is_some()
    }

    /// Convert a world coordinate to local grid indices.
    pub fn to_local(&self, coord: Coord) -> Option<(u32, u32)> {
        let lx = coord.x.checked_sub(self.origin.x)?;
        let ly = coord.y.checked_sub(self.origin.y)?;
        if lx >= 0 && ly >= 0 && (lx as u32) < self.width && (ly as u32) < self.height {
            Some((lx as u32, ly as u32))
        } else {
            None
        }
    }

    /// Convert local grid indices back to a world coordinate.
    pub fn to_world(&self, x: u32, y: u32) -> Coord {
        Coord::new(self.origin.x + x as i32, self.origin.y + y as i32)
    }

    fn index(&self, coord: Coord) -> Option<usize> {
        self.to_local(coord).map(|(x, y)| (x + y * self.width) as usize)
    }

    /// Traversal cost of a cell. `None` outside the grid.
    pub fn cost(&self, coord: Coord) -> Option<f64> {
        self.index(coord).map(|i| self.cells[i])
    }

    /// Whether a cell is open (cheap). Out-of-bounds reads as not open.
    pub fn is_open(&self, coord: Coord) -> bool {
        self.index(coord).map(|i| self.open[i]).unwrap_or(false)
    }

    /// Carve a wall cell open, recomposing its cost from the stored
    /// layer-1 noise. Used by cluster corridor repair; a no-op on open or
    /// out-of-bounds cells.
    pub fn carve_open(&mut self, coord: Coord, params: &CostFieldParams) {
        let Some(i) = self.index(coord) else { return };
        if self.open[i] {
            return;
        }
        let n1 = if self.base_noise.is_empty() {
            0.5
        } else {
            self.base_noise[i]
        };
        let cost = (params.base_open_cost + params.open_weight * n1).max(params.min_cost);
        self.open[i] = true;
        self.cells[i] = cost;
        self.min_cost = self.min_cost.min(cost);
    }
}

/// Random fill plus majority-rule iterations. Borders are forced to wall
/// on every round; out-of-bounds neighbors count as walls.
///
/// Returns the open mask (`true` = open).
fn automata_mask(width: u32, height: u32, params: &CostFieldParams, rng: &mut WorldRng) -> Vec<bool> {
    let w = width as usize;
    let h = height as usize;
    let mut walls = vec![false; w * h];
    for y in 0..h {
        for x in 0..w {
            let border = x == 0 || y == 0 || x == w - 1 || y == h - 1;
            walls[x + y * w] = border || rng.random_bool(params.wall_probability);
        }
    }

    for _ in 0..params.ca_iterations {
        let mut next = vec![false; w * h];
        for y in 0..h {
            for x in 0..w {
                let border = x == 0 || y == 0 || x == w - 1 || y == h - 1;
                let c3 = count_walls(&walls, w, h, x, y, 1);
                let mut wall = border || c3 >= 5;
                if params.extended_rule && !wall {
                    // Extended 5×5 rule (non-default): re-wall cells in
                    // vast empty areas to break up featureless open rooms.
                    let c5 = count_walls(&walls, w, h, x, y, 2);
                    if c5 <= 2 {
                        wall = true;
                    }
                }
                next[x + y * w] = wall;
            }
        }
        walls = next;
    }

    walls.iter().map(|&wall| !wall).collect()
}

/// Count wall cells in the square neighborhood of Chebyshev radius `r`
/// around `(x, y)`, the center included. Out-of-bounds counts as wall.
fn count_walls(walls: &[bool], w: usize, h: usize, x: usize, y: usize, r: i32) -> u32 {
    let mut count = 0;
    for dy in -r..=r {
        for dx in -r..=r {
            let nx = x as i32 + dx;
            let ny = y as i32 + dy;
            if nx < 0 || ny < 0 || nx >= w as i32 || ny >= h as i32 {
                count += 1;
            } else if walls[nx as usize + ny as usize * w] {
                count += 1;
            }
        }
    }
    count
}

/// Fractal Brownian motion over a Perlin source, amplitude-normalized to
/// roughly [-1, 1].
fn fbm(source: &Perlin, x: f64, y: f64, octaves: u32, persistence: f64, lacunarity: f64) -> f64 {
    let mut amplitude = 1.0;
    let mut frequency = 1.0;
    let mut sum = 0.0;
    let mut norm = 0.0;
    for _ in 0..octaves {
        sum += amplitude * source.get([x * frequency, y * frequency]);
        norm += amplitude;
        amplitude *= persistence;
        frequency *= lacunarity;
    }
    sum / norm
}

/// Map a roughly-[-1, 1] noise value into [0, 1].
fn unit(v: f64) -> f64 {
    ((v + 1.0) * 0.5).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GalaxyConfig;

    fn test_coords() -> Vec<Coord> {
        vec![Coord::new(0, 0), Coord::new(30, 20), Coord::new(-10, 5)]
    }

    #[test]
    fn grid_covers_padded_bounding_box() {
        let params = GalaxyConfig::default().cost_field;
        let mut rng = WorldRng::new(1);
        let grid = CostGrid::generate(&test_coords(), &params, &mut rng);
        assert_eq!(grid.origin(), Coord::new(-10 - params.padding, 0 - params.padding));
        assert_eq!(grid.width(), (30 - (-10) + 1 + 2 * params.padding) as u32);
        assert_eq!(grid.height(), (20 + 1 + 2 * params.padding) as u32);
        for coord in test_coords() {
            assert!(grid.contains(coord));
        }
    }

    #[test]
    fn every_cell_within_cost_bounds() {
        let params = GalaxyConfig::default().cost_field;
        let mut rng = WorldRng::new(2);
        let grid = CostGrid::generate(&test_coords(), &params, &mut rng);
        let upper = params.base_wall_cost + params.wall_weight;
        for &cost in grid.cells() {
            assert!(cost >= params.min_cost, "cost below floor: {cost}");
            assert!(cost >= grid.min_cost());
            assert!(cost <= grid.max_cost());
            assert!(cost <= upper, "cost above wall ceiling: {cost}");
        }
    }

    #[test]
    fn wall_cells_cost_more_than_open_in_aggregate() {
        let params = GalaxyConfig::default().cost_field;
        let mut rng = WorldRng::new(3);
        let grid = CostGrid::generate(&test_coords(), &params, &mut rng);
        let mut open_total = 0.0;
        let mut open_count = 0u32;
        let mut wall_total = 0.0;
        let mut wall_count = 0u32;
        for y in 0..grid.height() {
            for x in 0..grid.width() {
                let coord = grid.to_world(x, y);
                let cost = grid.cost(coord).unwrap();
                if grid.is_open(coord) {
                    open_total += cost;
                    open_count += 1;
                } else {
                    wall_total += cost;
                    wall_count += 1;
                }
            }
        }
        assert!(open_count > 0, "automata produced no open cells");
        assert!(wall_count > 0, "automata produced no wall cells");
        let open_mean = open_total / f64::from(open_count);
        let wall_mean = wall_total / f64::from(wall_count);
        assert!(
            wall_mean > open_mean,
            "wall mean {wall_mean} should exceed open mean {open_mean}"
        );
    }

    #[test]
    fn borders_are_walls() {
        let params = GalaxyConfig::default().cost_field;
        let mut rng = WorldRng::new(4);
        let grid = CostGrid::generate(&test_coords(), &params, &mut rng);
        for x in 0..grid.width() {
            assert!(!grid.is_open(grid.to_world(x, 0)));
            assert!(!grid.is_open(grid.to_world(x, grid.height() - 1)));
        }
        for y in 0..grid.height() {
            assert!(!grid.is_open(grid.to_world(0, y)));
            assert!(!grid.is_open(grid.to_world(grid.width() - 1, y)));
        }
    }

    #[test]
    fn generation_is_deterministic() {
        let params = GalaxyConfig::default().cost_field;
        let mut rng_a = WorldRng::new(5);
        let a = CostGrid::generate(&test_coords(), &params, &mut rng_a);
        let mut rng_b = WorldRng::new(5);
        let b = CostGrid::generate(&test_coords(), &params, &mut rng_b);
        assert_eq!(a.cells(), b.cells());
        assert_eq!(a.origin(), b.origin());
    }

    #[test]
    fn empty_coords_produce_empty_grid() {
        let params = GalaxyConfig::default().cost_field;
        let mut rng = WorldRng::new(6);
        let grid = CostGrid::generate(&[], &params, &mut rng);
        assert_eq!(grid.width(), 0);
        assert_eq!(grid.height(), 0);
        assert!(!grid.contains(Coord::new(0, 0)));
    }

    #[test]
    fn out_of_bounds_reads() {
        let params = GalaxyConfig::default().cost_field;
        let mut rng = WorldRng::new(7);
        let grid = CostGrid::generate(&test_coords(), &params, &mut rng);
        let far = Coord::new(10_000, 10_000);
        assert!(grid.cost(far).is_none());
        assert!(!grid.is_open(far));
    }

    #[test]
    fn carve_open_lowers_cost_and_opens_cell() {
        let params = GalaxyConfig::default().cost_field;
        let mut rng = WorldRng::new(8);
        let mut grid = CostGrid::generate(&test_coords(), &params, &mut rng);
        // The border is guaranteed wall.
        let target = grid.to_world(0, 0);
        assert!(!grid.is_open(target));
        let before = grid.cost(target).unwrap();
        grid.carve_open(target, &params);
        assert!(grid.is_open(target));
        let after = grid.cost(target).unwrap();
        assert!(after < before);
        assert!(after <= params.base_open_cost + params.open_weight);
        assert!(grid.min_cost() <= after);
    }

    #[test]
    fn carve_open_is_noop_on_open_cells() {
        let params = GalaxyConfig::default().cost_field;
        let mut rng = WorldRng::new(9);
        let mut grid = CostGrid::generate(&test_coords(), &params, &mut rng);
        let open_cell = (0..grid.height())
            .flat_map(|y| (0..grid.width()).map(move |x| (x, y)))
            .map(|(x, y)| grid.to_world(x, y))
            .find(|&c| grid.is_open(c))
            .expect("no open cell in grid");
        let before = grid.cost(open_cell).unwrap();
        grid.carve_open(open_cell, &params);
        assert_eq!(grid.cost(open_cell).unwrap(), before);
    }

    #[test]
    fn from_parts_computes_bounds() {
        let cells = vec![2.0, 4.0, 8.0, 1.5];
        let open = vec![true, true, false, true];
        let grid = CostGrid::from_parts(Coord::new(0, 0), 2, 2, cells, open);
        assert_eq!(grid.min_cost(), 1.5);
        assert_eq!(grid.max_cost(), 8.0);
        assert_eq!(grid.cost(Coord::new(1, 1)), Some(1.5));
        assert!(grid.is_open(Coord::new(0, 0)));
        assert!(!grid.is_open(Coord::new(0, 1)));
    }
}
