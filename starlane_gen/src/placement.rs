// Three-level star placement: galaxy → spiral arm → star cloud.
//
// `StarPlacement` is a lazy, single-pass iterator over raw star coordinates.
// The three nested generation levels of the design are flattened into one
// explicit state machine so a single `&mut WorldRng` can thread through all
// of them: the galaxy level walks the arms, the arm level walks a parametric
// spiral variable with an irregular PRNG-drawn step, and the starfield level
// scatters stars inside each cloud with a center-biased radial falloff.
//
// The iterator is restartable only by re-invoking with the same seed; it is
// never rewindable. Raw coordinates may collide — `starmap.rs` deduplicates
// them into the final system set.
//
// See also: `config.rs` for `PlacementParams`, `pipeline.rs` which collects
// the iterator, `starmap.rs` for dedup and id assignment.
//
// **Critical constraint: determinism.** Draw order is one strictly
// sequential walk: per star two draws (angle, radial factor), per arm step
// one draw (the 1–5 degree advance). Cloud geometry is computed without
// draws. Reordering any of this (e.g. generating arms in parallel) changes
// the output of every later stage.

use crate::config::PlacementParams;
use crate::types::Coord;
use starlane_prng::WorldRng;
use std::f64::consts::TAU;

/// One elliptical star cloud on a spiral arm.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Cloud {
    pub center_x: f64,
    pub center_y: f64,
    /// Scatter radius for the cloud's stars.
    pub radius: f64,
    /// Per-cloud rotation applied to every star offset — the arm's spiral
    /// angle, so clouds shear consistently along the arm.
    pub turn: f64,
    /// Stars left to yield from this cloud.
    pub remaining: u32,
}

/// Lazy iterator over raw star coordinates.
///
/// Holds the run's PRNG handle by mutable borrow for its whole lifetime,
/// which makes interleaved draws from other stages a compile error.
pub struct StarPlacement<'a> {
    rng: &'a mut WorldRng,
    arm_count: u32,
    deg: f64,
    star_scale: f64,
    limit: Option<u64>,
    // Shared scale constants, computed once for the whole galaxy.
    radial_step: f64,
    cloud_scale: f64,
    // Walk cursor.
    arm: u32,
    n: f64,
    cloud: Option<Cloud>,
    yielded: u64,
    exhausted: bool,
}

impl<'a> StarPlacement<'a> {
    /// Begin a placement walk. No PRNG draw happens until the first star
    /// is requested.
    pub fn new(params: &PlacementParams, rng: &'a mut WorldRng) -> Self {
        Self {
            rng,
            arm_count: params.arm_count,
            deg: params.deg,
            star_scale: params.star_scale,
            limit: params.limit,
            radial_step: params.size * params.spc_factor,
            cloud_scale: params.size * params.dyn_size_factor,
            arm: 0,
            n: 0.0,
            cloud: None,
            yielded: 0,
            exhausted: false,
        }
    }

    /// Build the cloud at the current `(arm, n)` cursor. Draw-free.
    fn make_cloud(&self) -> Cloud {
        let shift = f64::from(self.arm) / f64::from(self.arm_count) * TAU;
        let theta = shift + self.n.to_radians();
        let dist = self.radial_step * self.n;
        let center_x = dist * theta.sin();
        let center_y = dist * theta.cos();
        // Denominator floor of 1 guards the zero-distance galactic center.
        let radius = self.cloud_scale * self.n / dist.max(1.0);
        // Star count scales with radius over spiral progress; the very
        // first step (n = 0) takes the floor of 2 directly.
        let remaining = if self.n > 0.0 {
            ((radius / self.n).round() as u32).max(2)
        } else {
            2
        };
        Cloud {
            center_x,
            center_y,
            radius,
            turn: theta,
            remaining,
        }
    }
}

/// Scatter one star inside a cloud.
///
/// Two draws: a uniform angle, then a uniform radial factor that is
/// squared — squaring biases density toward the cloud center and is part of
/// the galaxy's look. The local offset uses sine for the x axis and cosine
/// for the y axis, is rotated by the cloud's turn angle, scaled by the
/// global multiplier, and rounded to integers.
pub(crate) fn sample_star(rng: &mut WorldRng, cloud: &Cloud, star_scale: f64) -> Coord {
    let angle = rng.next_f64() * TAU;
    let t = rng.next_f64();
    let r = t * t * cloud.radius;
    let local_x = r * angle.sin();
    let local_y = r * angle.cos();
    let (sin_turn, cos_turn) = cloud.turn.sin_cos();
    let rot_x = local_x * cos_turn - local_y * sin_turn;
    let rot_y = local_x * sin_turn + local_y * cos_turn;
    let x = (cloud.center_x + rot_x * star_scale).round() as i32;
    let y = (cloud.center_y + rot_y * star_scale).round() as i32;
    Coord::new(x, y)
}

impl Iterator for StarPlacement<'_> {
    type Item = Coord;

    fn next(&mut self) -> Option<Coord> {
        if self.exhausted {
            return None;
        }
        // The global yield counter stops the walk mid-arm, mid-cloud. A
        // limit of 0 returns empty before any draw.
        if let Some(limit) = self.limit {
            if self.yielded >= limit {
                self.exhausted = true;
                return None;
            }
        }
        loop {
            if let Some(cloud) = self.cloud.as_mut() {
                if cloud.remaining > 0 {
                    cloud.remaining -= 1;
                    let snapshot = *cloud;
                    let star = sample_star(self.rng, &snapshot, self.star_scale);
                    self.yielded += 1;
                    return Some(star);
                }
                // Cloud exhausted: advance the parametric variable by an
                // irregular 1–5 degree step. The irregular step is
                // intentional; a fixed increment produces visible banding.
                let step = self.rng.range_i32_inclusive(1, 5);
                self.n += f64::from(step);
                self.cloud = None;
                if self.n > self.deg {
                    self.arm += 1;
                    self.n = 0.0;
                }
            }
            if self.arm >= self.arm_count {
                self.exhausted = true;
                return None;
            }
            self.cloud = Some(self.make_cloud());
        }
    }
}
