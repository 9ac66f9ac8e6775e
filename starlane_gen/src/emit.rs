// Artifact emission: serializable records for systems, routes, and the
// quantized cost grid.
//
// The engine's obligation ends at producing these fields losslessly and
// deterministically; the container (file, database rows, in-memory hand-off)
// is the consumer's decision. `GalaxyArtifact` is the complete bundle with
// a JSON surface, plus an atomic file writer for the common offline case —
// serialize to a sibling temp file, then rename, so a crashed run never
// leaves a half-written artifact behind.
//
// The cost grid is quantized to one byte per cell with a linear {min, max}
// mapping stored alongside, together with the {origin, width, height}
// decode parameters. `GridRecord::decode()` rebuilds a queryable `CostGrid`
// for runtime pathfinding; decoded costs land within one quantization step
// of the originals.
//
// See also: `pipeline.rs` for `GalaxyBuild`, `costfield.rs` for the live
// grid, `pathfinding.rs` for the runtime consumer of decoded grids.

use crate::costfield::CostGrid;
use crate::pipeline::GalaxyBuild;
use crate::routes::Route;
use crate::starmap::System;
use crate::types::Coord;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Quantized cost grid plus everything needed to decode it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridRecord {
    pub origin: Coord,
    pub width: u32,
    pub height: u32,
    /// Linear mapping bounds: byte 0 decodes to `min_cost`, byte 255 to
    /// `max_cost`.
    pub min_cost: f64,
    pub max_cost: f64,
    /// Row-major quantized cells (`x + y * width`).
    pub cells: Vec<u8>,
    /// Open/wall mask, carried so consumers can distinguish cheap space
    /// from occlusion without re-deriving it from costs.
    pub open: Vec<bool>,
}

impl GridRecord {
    /// Quantize a live grid to byte cells.
    pub fn quantize(grid: &CostGrid) -> Self {
        let min_cost = grid.min_cost();
        let max_cost = grid.max_cost();
        let span = max_cost - min_cost;
        let cells = grid
            .cells()
            .iter()
            .map(|&cost| {
                if span > 0.0 {
                    (((cost - min_cost) / span) * 255.0).round() as u8
                } else {
                    0
                }
            })
            .collect();
        let open = (0..grid.height())
            .flat_map(|y| (0..grid.width()).map(move |x| (x, y)))
            .map(|(x, y)| grid.is_open(grid.to_world(x, y)))
            .collect();
        Self {
            origin: grid.origin(),
            width: grid.width(),
            height: grid.height(),
            min_cost,
            max_cost,
            cells,
            open,
        }
    }

    /// Rebuild a queryable grid from the quantized cells.
    pub fn decode(&self) -> CostGrid {
        let span = self.max_cost - self.min_cost;
        let cells = self
            .cells
            .iter()
            .map(|&q| self.min_cost + f64::from(q) / 255.0 * span)
            .collect();
        CostGrid::from_parts(self.origin, self.width, self.height, cells, self.open.clone())
    }
}

/// The complete output of a generation run, ready for persistence.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GalaxyArtifact {
    pub seed: String,
    pub systems: Vec<System>,
    pub routes: Vec<Route>,
    pub grid: GridRecord,
}

impl GalaxyArtifact {
    pub fn from_build(seed: &str, build: &GalaxyBuild) -> Self {
        Self {
            seed: seed.to_string(),
            systems: build.systems.clone(),
            routes: build.routes.clone(),
            grid: GridRecord::quantize(&build.grid),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// All-or-nothing write: serialize to a sibling `.tmp` file, then
    /// rename over the target. A failure partway leaves the target
    /// untouched, so a failed run simply re-executes from the same seed.
    pub fn write_atomic(&self, path: &Path) -> std::io::Result<()> {
        let json = self.to_json().map_err(std::io::Error::other)?;
        let mut tmp_name = path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp = std::path::PathBuf::from(tmp_name);
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::starmap::build_systems;
    use starlane_prng::WorldRng;

    fn varied_grid() -> CostGrid {
        let mut rng = WorldRng::new(21);
        let width = 12u32;
        let height = 9u32;
        let cells: Vec<f64> = (0..width * height)
            .map(|_| 1.0 + rng.next_f64() * 25.0)
            .collect();
        let open = cells.iter().map(|&c| c < 10.0).collect();
        CostGrid::from_parts(Coord::new(-4, -3), width, height, cells, open)
    }

    fn small_artifact() -> GalaxyArtifact {
        let mut rng = WorldRng::new(30);
        let coords = vec![Coord::new(0, 0), Coord::new(3, 2), Coord::new(-2, 4)];
        let mut systems = build_systems(&coords, &mut rng);
        systems[0].is_privileged = true;
        systems[1].is_privileged = true;
        let route = Route {
            origin: systems[0].id.min(systems[1].id),
            dest: systems[0].id.max(systems[1].id),
            total_cost: 4.2,
            path: vec![Coord::new(0, 0), Coord::new(1, 1), Coord::new(2, 2), Coord::new(3, 2)],
        };
        GalaxyArtifact {
            seed: "artifact-test".to_string(),
            systems,
            routes: vec![route],
            grid: GridRecord::quantize(&varied_grid()),
        }
    }

    #[test]
    fn quantize_roundtrip_within_one_step() {
        let grid = varied_grid();
        let record = GridRecord::quantize(&grid);
        let decoded = record.decode();
        let step = (record.max_cost - record.min_cost) / 255.0;
        assert_eq!(decoded.width(), grid.width());
        assert_eq!(decoded.height(), grid.height());
        assert_eq!(decoded.origin(), grid.origin());
        for (a, b) in grid.cells().iter().zip(decoded.cells()) {
            assert!(
                (a - b).abs() <= step / 2.0 + 1e-9,
                "decoded {b} strays from {a} by more than half a step"
            );
        }
    }

    #[test]
    fn quantize_preserves_open_mask() {
        let grid = varied_grid();
        let record = GridRecord::quantize(&grid);
        let decoded = record.decode();
        for y in 0..grid.height() {
            for x in 0..grid.width() {
                let coord = grid.to_world(x, y);
                assert_eq!(grid.is_open(coord), decoded.is_open(coord));
            }
        }
    }

    #[test]
    fn uniform_grid_quantizes_to_min() {
        let grid = CostGrid::from_parts(Coord::new(0, 0), 3, 3, vec![7.0; 9], vec![true; 9]);
        let record = GridRecord::quantize(&grid);
        assert!(record.cells.iter().all(|&q| q == 0));
        let decoded = record.decode();
        assert!(decoded.cells().iter().all(|&c| c == 7.0));
    }

    #[test]
    fn decoded_grid_supports_pathfinding() {
        let grid = varied_grid();
        let decoded = GridRecord::quantize(&grid).decode();
        let start = Coord::new(-4, -3);
        let goal = Coord::new(7, 5);
        let on_live = crate::pathfinding::astar(&grid, start, goal).unwrap();
        let on_decoded = crate::pathfinding::astar(&decoded, start, goal).unwrap();
        // Quantization may nudge the chosen path, but both must exist and
        // land within a quantization step per cell of each other.
        let slack = (grid.max_cost() - grid.min_cost()) / 255.0 * on_live.cells.len() as f64;
        assert!((on_live.total_cost - on_decoded.total_cost).abs() <= slack + 1e-6);
    }

    #[test]
    fn artifact_json_roundtrip() {
        let artifact = small_artifact();
        let json = artifact.to_json().unwrap();
        let restored = GalaxyArtifact::from_json(&json).unwrap();
        assert_eq!(restored.seed, artifact.seed);
        assert_eq!(restored.systems.len(), artifact.systems.len());
        assert_eq!(restored.routes, artifact.routes);
        assert_eq!(restored.grid, artifact.grid);
        for (a, b) in artifact.systems.iter().zip(&restored.systems) {
            assert_eq!(a.id, b.id);
            assert_eq!(a.coord, b.coord);
        }
    }

    #[test]
    fn route_endpoints_stay_ordered_through_serialization() {
        let artifact = small_artifact();
        let json = artifact.to_json().unwrap();
        let restored = GalaxyArtifact::from_json(&json).unwrap();
        for route in &restored.routes {
            assert!(route.origin < route.dest);
        }
    }

    #[test]
    fn write_atomic_leaves_no_temp_file() {
        let artifact = small_artifact();
        let dir = std::env::temp_dir();
        let path = dir.join(format!("starlane_emit_test_{}.json", std::process::id()));
        let _ = std::fs::remove_file(&path);
        artifact.write_atomic(&path).unwrap();
        let mut tmp_name = path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        assert!(!std::path::PathBuf::from(tmp_name).exists());
        let read_back = GalaxyArtifact::from_json(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(read_back.seed, artifact.seed);
        let _ = std::fs::remove_file(&path);
    }
}
