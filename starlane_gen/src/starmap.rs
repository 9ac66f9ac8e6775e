// The system set: coordinate dedup and `System` records.
//
// Star placement emits raw coordinates and several raw stars may round to
// the same map cell; only one system ever occupies a coordinate. Dedup
// keeps the first occurrence so the system order is the placement order,
// and ids are drawn from the shared PRNG afterwards, one per unique
// coordinate, in that same order.
//
// Systems are enriched in place by the density, cluster, and
// classification stages and are immutable thereafter.
//
// See also: `placement.rs` which produces the raw coordinates,
// `density.rs` / `cluster.rs` / `pipeline.rs` for the enrichment stages.

use crate::types::{Classification, Coord, SystemId};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use starlane_prng::WorldRng;

/// A star system, keyed by its unique coordinate.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct System {
    pub id: SystemId,
    pub coord: Coord,
    /// Within the core exclusion radius of the galactic origin.
    pub is_core: bool,
    /// Member of the privileged cluster (the charted, route-connected
    /// region every consumer knows from the start).
    pub is_privileged: bool,
    /// Systems within the density radius, from the density index.
    pub neighbor_count: u32,
    /// Non-positive crowding penalty derived from `neighbor_count`.
    pub environment_penalty: i32,
    /// Assigned once to every non-privileged system; privileged systems
    /// carry no tag.
    pub classification: Option<Classification>,
}

/// Collapse raw star coordinates into the unique set, preserving first
/// occurrence order.
pub fn dedup_coords(raw: impl IntoIterator<Item = Coord>) -> Vec<Coord> {
    let mut seen = FxHashSet::default();
    let mut unique = Vec::new();
    for coord in raw {
        if seen.insert(coord) {
            unique.push(coord);
        }
    }
    unique
}

/// Build the system set from deduplicated coordinates, drawing one id per
/// system from the shared PRNG in coordinate order.
pub fn build_systems(coords: &[Coord], rng: &mut WorldRng) -> Vec<System> {
    coords
        .iter()
        .map(|&coord| System {
            id: SystemId::new(rng),
            coord,
            is_core: false,
            is_privileged: false,
            neighbor_count: 0,
            environment_penalty: 0,
            classification: None,
        })
        .collect()
}
