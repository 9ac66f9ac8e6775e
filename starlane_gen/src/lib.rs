// starlane_gen — offline, deterministic galaxy generation.
//
// This crate is the generation engine for the Starlane world: star system
// placement, the traversal-cost field, privileged-cluster selection, and
// the precomputed route network. It runs as a one-shot batch on an
// operator's machine and has no runtime-service dependencies; the only
// long-lived consumer surface is the standalone A* query over a loaded
// cost grid.
//
// Module overview:
// - `pipeline.rs`:    Stage orchestration, error taxonomy, attribute seam.
// - `config.rs`:      GalaxyConfig — all tunable parameters, JSON-loadable.
// - `placement.rs`:   Three-level lazy star placement (galaxy → arm → cloud).
// - `starmap.rs`:     Coordinate dedup + System records.
// - `costfield.rs`:   Noise + cellular-automata cost grid.
// - `density.rs`:     Spatial-hash neighbor counts + environment penalty.
// - `cluster.rs`:     Privileged-cluster selection and corridor repair.
// - `pathfinding.rs`: A* over the cost grid (batch and on-demand).
// - `routes.rs`:      Parallel route precomputation + connectivity repair.
// - `emit.rs`:        Artifact records, quantized grid, atomic write.
// - `prng`:           Re-exported from `starlane_prng` — xoshiro256++ with
//                     SplitMix64 seeding.
// - `types.rs`:       Coord, deterministic UUIDs, SystemId, Classification.
//
// **Critical constraint: determinism.** Generation is a pure function:
// `(seed, config) -> galaxy`. All randomness comes from one seeded
// xoshiro256++ handle threaded by `&mut` through the stages in a fixed
// order. No `HashMap` iteration feeds output, no system time, no OS
// entropy. Route precomputation is the one parallel stage, and its
// aggregation is sorted so completion order never shows.

pub mod cluster;
pub mod config;
pub mod costfield;
pub mod density;
pub mod emit;
pub mod pathfinding;
pub mod pipeline;
pub mod placement;
pub mod routes;
pub mod starmap;
pub mod types;
pub use starlane_prng as prng;
