// Data-driven pipeline configuration.
//
// All tunable generation parameters live here in `GalaxyConfig`, loadable
// from JSON. The pipeline never uses magic numbers — it reads from the
// config. Parameters are grouped into nested structs, one per pipeline
// stage: `PlacementParams`, `CostFieldParams`, `DensityParams`,
// `ClusterParams`, `RouteParams`, and `ClassificationParams`.
//
// `validate()` runs every configuration check before the first PRNG draw:
// a partial draw sequence cannot be resumed deterministically, so a bad
// config must fail before any randomness is consumed.
//
// See also: `pipeline.rs` which owns the `GalaxyConfig` for a run,
// `placement.rs` / `costfield.rs` / `cluster.rs` for the stages reading
// each group.
//
// **Critical constraint: determinism.** Config values feed directly into
// generation logic. Identical seed + identical config ⇒ identical galaxy.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Parameter groups
// ---------------------------------------------------------------------------

/// Three-level star placement parameters (galaxy → arm → star cloud).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlacementParams {
    /// Overall galaxy scale in map units. All derived scale constants are
    /// proportional to this.
    pub size: f64,
    /// Number of spiral arms. Zero arms is a valid (empty) galaxy.
    pub arm_count: u32,
    /// Spiral extent: the arm's parametric variable walks from 0 to this
    /// value, in degrees. 360 is one full turn.
    pub deg: f64,
    /// Cloud radius scale factor. `cloud_scale = size * dyn_size_factor`.
    pub dyn_size_factor: f64,
    /// Spiral spacing factor: radial growth per parametric degree.
    /// `radial_step = size * spc_factor`.
    pub spc_factor: f64,
    /// Global multiplier applied to each star's local offset before
    /// rounding to integer coordinates.
    pub star_scale: f64,
    /// Optional cap on the number of raw stars yielded. The iterator stops
    /// mid-arm (and mid-cloud) the moment the cap is reached.
    pub limit: Option<u64>,
}

/// Cost field parameters: noise layers, cellular automata, cost ranges.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CostFieldParams {
    /// Cells of padding added around the bounding box of all systems.
    pub padding: i32,
    /// Probability that a cell starts as wall in the random fill.
    pub wall_probability: f64,
    /// Rounds of the majority rule applied to the wall mask.
    pub ca_iterations: u32,
    /// Optional extended rule: additionally open a wall whose 5×5
    /// neighborhood holds ≤ 2 walls. Off by default.
    pub extended_rule: bool,
    /// Base frequency of the open-cell noise layer.
    pub base_frequency: f64,
    /// Octave count for the open-cell noise layer.
    pub octaves: u32,
    /// Amplitude decay per octave (0.0–1.0).
    pub persistence: f64,
    /// Frequency multiplier per octave.
    pub lacunarity: f64,
    /// Frequency of the wall-occlusion noise layer (independent of layer 1).
    pub wall_frequency: f64,
    /// Open-cell cost floor: `cost = base_open_cost + open_weight * noise`.
    pub base_open_cost: f64,
    /// Open-cell noise weight.
    pub open_weight: f64,
    /// Wall-cell cost floor: `cost = base_wall_cost + wall_weight * noise`.
    pub base_wall_cost: f64,
    /// Wall-cell noise weight.
    pub wall_weight: f64,
    /// Hard lower bound on every cell cost. Also scales the A* heuristic,
    /// so it must never exceed any actual cell cost.
    pub min_cost: f64,
}

/// One step of the environment penalty function: systems with at least
/// `min_neighbors` neighbors take `penalty` (non-positive).
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct PenaltyStep {
    pub min_neighbors: u32,
    pub penalty: i32,
}

/// Density index parameters.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DensityParams {
    /// Radius for neighbor counting. Also the spatial hash cell size.
    pub neighbor_radius: f64,
    /// Monotonic step function from neighbor count to environment penalty.
    /// Must be sorted ascending by `min_neighbors` with non-increasing
    /// penalties; the last step is the cap.
    pub penalty_steps: Vec<PenaltyStep>,
}

/// Privileged-cluster selection parameters.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClusterParams {
    /// Systems within this radius of the origin are core and ineligible.
    pub core_exclusion_radius: f64,
    /// Radius for the cluster-scoring neighbor count (larger than the
    /// density radius).
    pub cluster_radius: f64,
    /// Target number of privileged systems.
    pub target_size: usize,
    /// Minimum fraction of cluster members that must sit on open cells
    /// before the cost field is accepted.
    pub min_open_fraction: f64,
    /// Bounded corridor-repair attempts before surfacing a hard failure.
    pub max_repair_attempts: u32,
}

/// Route precomputation parameters.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RouteParams {
    /// Maximum Euclidean distance between privileged systems for a
    /// precomputed route.
    pub max_range: f64,
    /// Bounded bridge-edge attempts when the route graph is disconnected.
    pub max_bridge_attempts: u32,
}

/// Classification roll parameters for non-privileged systems.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClassificationParams {
    /// Regressed-colony chance contributed per counted neighbor.
    pub regressed_per_neighbor: f64,
    /// Cap on the total regressed-colony chance.
    pub regressed_cap: f64,
    /// Flat hidden-enclave chance.
    pub enclave_chance: f64,
}

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level generation configuration. Loaded from JSON, never mutated
/// during a run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GalaxyConfig {
    pub placement: PlacementParams,
    pub cost_field: CostFieldParams,
    pub density: DensityParams,
    pub cluster: ClusterParams,
    pub routes: RouteParams,
    pub classification: ClassificationParams,
}

impl Default for GalaxyConfig {
    fn default() -> Self {
        Self {
            placement: PlacementParams {
                size: 400.0,
                arm_count: 4,
                deg: 360.0,
                dyn_size_factor: 0.06,
                spc_factor: 0.0028,
                star_scale: 1.0,
                limit: None,
            },
            cost_field: CostFieldParams {
                padding: 8,
                wall_probability: 0.42,
                ca_iterations: 4,
                extended_rule: false,
                base_frequency: 0.05,
                octaves: 4,
                persistence: 0.5,
                lacunarity: 2.0,
                wall_frequency: 0.09,
                base_open_cost: 1.0,
                open_weight: 2.0,
                base_wall_cost: 10.0,
                wall_weight: 20.0,
                min_cost: 1.0,
            },
            density: DensityParams {
                neighbor_radius: 12.0,
                penalty_steps: vec![
                    PenaltyStep {
                        min_neighbors: 0,
                        penalty: 0,
                    },
                    PenaltyStep {
                        min_neighbors: 3,
                        penalty: -1,
                    },
                    PenaltyStep {
                        min_neighbors: 6,
                        penalty: -2,
                    },
                    PenaltyStep {
                        min_neighbors: 10,
                        penalty: -3,
                    },
                ],
            },
            cluster: ClusterParams {
                core_exclusion_radius: 40.0,
                cluster_radius: 24.0,
                target_size: 40,
                min_open_fraction: 0.8,
                max_repair_attempts: 4,
            },
            routes: RouteParams {
                max_range: 60.0,
                max_bridge_attempts: 8,
            },
            classification: ClassificationParams {
                regressed_per_neighbor: 0.03,
                regressed_cap: 0.3,
                enclave_chance: 0.05,
            },
        }
    }
}

impl GalaxyConfig {
    /// Load a config from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize the config to pretty JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Check every parameter before the first PRNG draw. A partial draw
    /// sequence cannot be resumed, so all configuration failures must
    /// surface here.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.placement;
        require_positive("placement.size", p.size)?;
        require_finite_non_negative("placement.deg", p.deg)?;
        require_positive("placement.dyn_size_factor", p.dyn_size_factor)?;
        require_positive("placement.spc_factor", p.spc_factor)?;
        require_positive("placement.star_scale", p.star_scale)?;

        let c = &self.cost_field;
        if c.padding < 0 {
            return Err(ConfigError::OutOfRange {
                field: "cost_field.padding",
            });
        }
        if !(0.0..=1.0).contains(&c.wall_probability) {
            return Err(ConfigError::OutOfRange {
                field: "cost_field.wall_probability",
            });
        }
        if c.octaves == 0 {
            return Err(ConfigError::OutOfRange {
                field: "cost_field.octaves",
            });
        }
        require_positive("cost_field.base_frequency", c.base_frequency)?;
        require_positive("cost_field.persistence", c.persistence)?;
        require_positive("cost_field.lacunarity", c.lacunarity)?;
        require_positive("cost_field.wall_frequency", c.wall_frequency)?;
        require_positive("cost_field.min_cost", c.min_cost)?;
        require_positive("cost_field.base_open_cost", c.base_open_cost)?;
        require_finite_non_negative("cost_field.open_weight", c.open_weight)?;
        require_finite_non_negative("cost_field.wall_weight", c.wall_weight)?;
        if c.base_wall_cost <= c.base_open_cost {
            return Err(ConfigError::WallCostNotAboveOpen);
        }

        let d = &self.density;
        require_positive("density.neighbor_radius", d.neighbor_radius)?;
        if d.penalty_steps.is_empty() {
            return Err(ConfigError::EmptyPenaltyTable);
        }
        for pair in d.penalty_steps.windows(2) {
            let ascending = pair[0].min_neighbors < pair[1].min_neighbors;
            let non_increasing = pair[0].penalty >= pair[1].penalty;
            if !ascending || !non_increasing {
                return Err(ConfigError::NonMonotonicPenaltyTable);
            }
        }
        if d.penalty_steps.iter().any(|s| s.penalty > 0) {
            return Err(ConfigError::OutOfRange {
                field: "density.penalty_steps.penalty",
            });
        }

        let cl = &self.cluster;
        require_positive("cluster.core_exclusion_radius", cl.core_exclusion_radius)?;
        require_positive("cluster.cluster_radius", cl.cluster_radius)?;
        if cl.target_size == 0 {
            return Err(ConfigError::OutOfRange {
                field: "cluster.target_size",
            });
        }
        if !(0.0..=1.0).contains(&cl.min_open_fraction) {
            return Err(ConfigError::OutOfRange {
                field: "cluster.min_open_fraction",
            });
        }
        if cl.max_repair_attempts == 0 {
            return Err(ConfigError::OutOfRange {
                field: "cluster.max_repair_attempts",
            });
        }

        let r = &self.routes;
        require_positive("routes.max_range", r.max_range)?;
        if r.max_bridge_attempts == 0 {
            return Err(ConfigError::OutOfRange {
                field: "routes.max_bridge_attempts",
            });
        }

        let cls = &self.classification;
        require_finite_non_negative("classification.regressed_per_neighbor", cls.regressed_per_neighbor)?;
        require_finite_non_negative("classification.regressed_cap", cls.regressed_cap)?;
        require_finite_non_negative("classification.enclave_chance", cls.enclave_chance)?;
        if cls.regressed_cap + cls.enclave_chance > 1.0 {
            return Err(ConfigError::OutOfRange {
                field: "classification.regressed_cap + enclave_chance",
            });
        }

        Ok(())
    }
}

fn require_positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { field })
    }
}

fn require_finite_non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange { field })
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Reasons a configuration is rejected before any PRNG draw.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// A parameter that must be strictly positive is zero, negative, or
    /// non-finite.
    NonPositive { field: &'static str },
    /// A parameter is outside its valid range.
    OutOfRange { field: &'static str },
    /// The environment penalty table has no steps.
    EmptyPenaltyTable,
    /// The environment penalty table is not ascending in neighbor count
    /// with non-increasing penalties.
    NonMonotonicPenaltyTable,
    /// Wall base cost does not exceed open base cost; wall traversal must
    /// be expensive relative to open space.
    WallCostNotAboveOpen,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NonPositive { field } => {
                write!(f, "config field `{field}` must be strictly positive")
            }
            ConfigError::OutOfRange { field } => {
                write!(f, "config field `{field}` is out of range")
            }
            ConfigError::EmptyPenaltyTable => write!(f, "density.penalty_steps must not be empty"),
            ConfigError::NonMonotonicPenaltyTable => {
                write!(
                    f,
                    "density.penalty_steps must ascend in min_neighbors with non-increasing penalties"
                )
            }
            ConfigError::WallCostNotAboveOpen => {
                write!(f, "cost_field.base_wall_cost must exceed base_open_cost")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        GalaxyConfig::default().validate().unwrap();
    }

    #[test]
    fn default_config_serializes() {
        let config = GalaxyConfig::default();
        let json = config.to_json().unwrap();
        let restored = GalaxyConfig::from_json(&json).unwrap();
        assert_eq!(config.placement.arm_count, restored.placement.arm_count);
        assert_eq!(config.cost_field.octaves, restored.cost_field.octaves);
        assert_eq!(
            config.density.penalty_steps.len(),
            restored.density.penalty_steps.len()
        );
        assert_eq!(config.cluster.target_size, restored.cluster.target_size);
        restored.validate().unwrap();
    }

    #[test]
    fn zero_arm_count_is_valid() {
        // Zero arms means an empty galaxy, not a config error.
        let mut config = GalaxyConfig::default();
        config.placement.arm_count = 0;
        config.validate().unwrap();
    }

    #[test]
    fn rejects_non_positive_size() {
        let mut config = GalaxyConfig::default();
        config.placement.size = 0.0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::NonPositive {
                field: "placement.size"
            })
        );
    }

    #[test]
    fn rejects_negative_deg() {
        let mut config = GalaxyConfig::default();
        config.placement.deg = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_bad_wall_probability() {
        let mut config = GalaxyConfig::default();
        config.cost_field.wall_probability = 1.5;
        assert_eq!(
            config.validate(),
            Err(ConfigError::OutOfRange {
                field: "cost_field.wall_probability"
            })
        );
    }

    #[test]
    fn rejects_wall_cost_below_open() {
        let mut config = GalaxyConfig::default();
        config.cost_field.base_wall_cost = 0.5;
        assert_eq!(config.validate(), Err(ConfigError::WallCostNotAboveOpen));
    }

    #[test]
    fn rejects_empty_penalty_table() {
        let mut config = GalaxyConfig::default();
        config.density.penalty_steps.clear();
        assert_eq!(config.validate(), Err(ConfigError::EmptyPenaltyTable));
    }

    #[test]
    fn rejects_non_monotonic_penalty_table() {
        let mut config = GalaxyConfig::default();
        config.density.penalty_steps = vec![
            PenaltyStep {
                min_neighbors: 0,
                penalty: -2,
            },
            PenaltyStep {
                min_neighbors: 4,
                penalty: -1,
            },
        ];
        assert_eq!(config.validate(), Err(ConfigError::NonMonotonicPenaltyTable));
    }

    #[test]
    fn rejects_positive_penalty() {
        let mut config = GalaxyConfig::default();
        config.density.penalty_steps = vec![PenaltyStep {
            min_neighbors: 0,
            penalty: 1,
        }];
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_cluster_target() {
        let mut config = GalaxyConfig::default();
        config.cluster.target_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn config_loads_from_json_string() {
        let json = GalaxyConfig::default().to_json().unwrap();
        let config = GalaxyConfig::from_json(&json).unwrap();
        assert_eq!(config.placement.deg, 360.0);
        assert_eq!(config.routes.max_bridge_attempts, 8);
    }
}
