// Density index: spatial-hash neighbor counting and environment penalty.
//
// For every system we count the other systems within a fixed radius. A
// uniform-cell spatial hash with cell size equal to the radius keeps the
// count near-linear in system count — each query only scans the 3×3 block
// of buckets around the query cell. The neighbor count maps to a
// non-positive environment penalty through the configured monotonic step
// function (crowded systems are worse places to live).
//
// The same index, built with the larger cluster radius, scores candidate
// seeds for `cluster.rs`.
//
// See also: `config.rs` for `DensityParams`, `cluster.rs` for the second
// consumer of neighbor counts.

use crate::config::{DensityParams, PenaltyStep};
use crate::starmap::System;
use crate::types::Coord;
use rustc_hash::FxHashMap;

/// Uniform-cell spatial hash over system coordinates.
///
/// Bucket iteration order never influences output: queries only count
/// matches, and counting is order-independent.
pub struct DensityIndex {
    radius: f64,
    coords: Vec<Coord>,
    buckets: FxHashMap<(i32, i32), Vec<usize>>,
}

impl DensityIndex {
    /// Build an index for neighbor queries at the given radius.
    pub fn build(coords: &[Coord], radius: f64) -> Self {
        let mut buckets: FxHashMap<(i32, i32), Vec<usize>> = FxHashMap::default();
        for (i, coord) in coords.iter().enumerate() {
            buckets.entry(bucket_key(*coord, radius)).or_default().push(i);
        }
        Self {
            radius,
            coords: coords.to_vec(),
            buckets,
        }
    }

    /// Count the systems other than `index` within the index radius of it.
    ///
    /// Cell size equals the radius, so every in-range system lives in the
    /// 3×3 block of buckets around the query cell.
    pub fn neighbor_count(&self, index: usize) -> u32 {
        let coord = self.coords[index];
        let (bx, by) = bucket_key(coord, self.radius);
        let mut count = 0;
        for dy in -1..=1 {
            for dx in -1..=1 {
                let Some(bucket) = self.buckets.get(&(bx + dx, by + dy)) else {
                    continue;
                };
                for &j in bucket {
                    if j != index && self.coords[j].distance(coord) <= self.radius {
                        count += 1;
                    }
                }
            }
        }
        count
    }
}

fn bucket_key(coord: Coord, cell_size: f64) -> (i32, i32) {
    (
        (f64::from(coord.x) / cell_size).floor() as i32,
        (f64::from(coord.y) / cell_size).floor() as i32,
    )
}

/// Map a neighbor count to its environment penalty: the last step whose
/// `min_neighbors` threshold is met. Counts below the first threshold take
/// no penalty. The table is validated as monotonic, so the last matching
/// step is also the largest-magnitude one and the final step is the cap.
pub fn penalty_for(count: u32, steps: &[PenaltyStep]) -> i32 {
    steps
        .iter()
        .rev()
        .find(|step| count >= step.min_neighbors)
        .map(|step| step.penalty)
        .unwrap_or(0)
}

/// Enrich every system with its neighbor count and environment penalty.
pub fn annotate_density(systems: &mut [System], params: &DensityParams) {
    let coords: Vec<Coord> = systems.iter().map(|s| s.coord).collect();
    let index = DensityIndex::build(&coords, params.neighbor_radius);
    for (i, system) in systems.iter_mut().enumerate() {
        let count = index.neighbor_count(i);
        system.neighbor_count = count;
        system.environment_penalty = penalty_for(count, &params.penalty_steps);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GalaxyConfig;
    use crate::starmap::build_systems;
    use starlane_prng::WorldRng;

    #[test]
    fn counts_match_hand_computed_neighbors() {
        // Three systems in a row 5 apart plus one far away.
        let coords = vec![
            Coord::new(0, 0),
            Coord::new(5, 0),
            Coord::new(10, 0),
            Coord::new(100, 100),
        ];
        let index = DensityIndex::build(&coords, 6.0);
        assert_eq!(index.neighbor_count(0), 1); // sees (5,0)
        assert_eq!(index.neighbor_count(1), 2); // sees both ends
        assert_eq!(index.neighbor_count(2), 1);
        assert_eq!(index.neighbor_count(3), 0);
    }

    #[test]
    fn boundary_distance_counts_as_neighbor() {
        let coords = vec![Coord::new(0, 0), Coord::new(6, 0)];
        let index = DensityIndex::build(&coords, 6.0);
        assert_eq!(index.neighbor_count(0), 1);
    }

    #[test]
    fn hash_agrees_with_brute_force() {
        // A deterministic scatter exercising many buckets.
        let coords: Vec<Coord> = (0..200)
            .map(|i| Coord::new((i * 37) % 90 - 45, (i * 53) % 70 - 35))
            .collect();
        let radius = 8.0;
        let index = DensityIndex::build(&coords, radius);
        for i in 0..coords.len() {
            let brute = coords
                .iter()
                .enumerate()
                .filter(|&(j, c)| j != i && c.distance(coords[i]) <= radius)
                .count() as u32;
            assert_eq!(index.neighbor_count(i), brute, "mismatch at {i}");
        }
    }

    #[test]
    fn penalty_step_function_is_monotonic() {
        let steps = GalaxyConfig::default().density.penalty_steps;
        assert_eq!(penalty_for(0, &steps), 0);
        assert_eq!(penalty_for(2, &steps), 0);
        assert_eq!(penalty_for(3, &steps), -1);
        assert_eq!(penalty_for(6, &steps), -2);
        assert_eq!(penalty_for(10, &steps), -3);
        // Capped at the last step.
        assert_eq!(penalty_for(1000, &steps), -3);
        let mut last = 0;
        for count in 0..50 {
            let p = penalty_for(count, &steps);
            assert!(p <= last, "penalty increased at {count}");
            last = p;
        }
    }

    #[test]
    fn annotate_fills_counts_and_penalties() {
        let coords: Vec<Coord> = (0..8).map(|i| Coord::new(i, 0)).collect();
        let mut rng = WorldRng::new(1);
        let mut systems = build_systems(&coords, &mut rng);
        let params = DensityParams {
            neighbor_radius: 3.0,
            penalty_steps: GalaxyConfig::default().density.penalty_steps,
        };
        annotate_density(&mut systems, &params);
        // Interior systems see 3 on each side within radius 3.
        assert_eq!(systems[4].neighbor_count, 6);
        assert_eq!(systems[0].neighbor_count, 3);
        for system in &systems {
            assert!(system.environment_penalty <= 0);
            assert_eq!(
                system.environment_penalty,
                penalty_for(system.neighbor_count, &params.penalty_steps)
            );
        }
    }
}
