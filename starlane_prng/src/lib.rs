// Deterministic, portable pseudo-random number generator.
//
// Implements xoshiro256++ (Blackman & Vigna, 2019) with SplitMix64 seeding.
// This is a hand-rolled implementation with zero external dependencies, chosen
// for portability and to guarantee identical output across all platforms.
//
// This crate is the single random source for the entire Starlane pipeline:
// star placement, the cellular-automata cost field, system classification,
// and system id generation all draw from one `WorldRng` handle threaded by
// `&mut` reference through every stage. Sharing one generator — and one
// strictly sequential draw order — is what makes a seed reproduce the same
// galaxy byte for byte.
//
// **Critical constraint: determinism.** Every method on `WorldRng` must
// produce identical output given the same prior state, regardless of
// platform, compiler version, or optimization level. Do not use
// floating-point arithmetic in the core generator, the stdlib PRNG, or any
// source of non-determinism in this module.

use serde::{Deserialize, Serialize};

/// Xoshiro256++ PRNG — the pipeline's sole source of randomness.
///
/// There is exactly one logical draw sequence per generation run: the
/// pipeline creates one `WorldRng` from the run seed and passes it by
/// mutable reference through every stage that needs randomness. The borrow
/// checker enforces that no two stages can interleave draws.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorldRng {
    s: [u64; 4],
}

impl WorldRng {
    /// Create a new PRNG seeded from a `u64`.
    ///
    /// Uses SplitMix64 to expand the seed into the 256-bit internal state.
    /// Two `WorldRng` instances created with the same seed will produce
    /// identical output sequences.
    pub fn new(seed: u64) -> Self {
        let mut sm = seed;
        Self {
            s: [
                splitmix64(&mut sm),
                splitmix64(&mut sm),
                splitmix64(&mut sm),
                splitmix64(&mut sm),
            ],
        }
    }

    /// Create a new PRNG from a string seed.
    ///
    /// The string is hashed with FNV-1a (64-bit) and the hash seeds the
    /// generator via `new()`. Operator-facing tools take seeds like
    /// `"test-1"`; this is how they map onto the integer seed space.
    pub fn from_seed_str(seed: &str) -> Self {
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in seed.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
        }
        Self::new(hash)
    }

    /// Generate the next `u64` in the sequence.
    pub fn next_u64(&mut self) -> u64 {
        let result = (self.s[0].wrapping_add(self.s[3]))
            .rotate_left(23)
            .wrapping_add(self.s[0]);

        let t = self.s[1] << 17;

        self.s[2] ^= self.s[0];
        self.s[3] ^= self.s[1];
        self.s[1] ^= self.s[2];
        self.s[0] ^= self.s[3];

        self.s[2] ^= t;
        self.s[3] = self.s[3].rotate_left(45);

        result
    }

    /// Generate a `u32` by taking the upper 32 bits of a `u64`.
    ///
    /// Used to seed the coherent-noise generators, which take 32-bit seeds.
    pub fn next_u32(&mut self) -> u32 {
        (self.next_u64() >> 32) as u32
    }

    /// Generate a uniform `f64` in [0, 1).
    ///
    /// Uses the upper 53 bits of a `u64` to fill the mantissa of an f64.
    /// 53 bits gives full f64 precision (IEEE 754 double has a 52-bit
    /// mantissa + 1 implicit bit).
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Generate 16 random bytes (used for system id generation).
    pub fn next_128_bits(&mut self) -> [u8; 16] {
        let a = self.next_u64().to_le_bytes();
        let b = self.next_u64().to_le_bytes();
        let mut out = [0u8; 16];
        out[..8].copy_from_slice(&a);
        out[8..].copy_from_slice(&b);
        out
    }

    /// Generate a uniform random integer in `[low, high)`.
    ///
    /// Uses rejection sampling to avoid modulo bias.
    /// Panics if `low >= high`.
    pub fn range_u64(&mut self, low: u64, high: u64) -> u64 {
        assert!(low < high, "range_u64: low must be less than high");
        let range = high - low;
        if range.is_power_of_two() {
            return low + (self.next_u64() & (range - 1));
        }
        // Rejection sampling to avoid modulo bias.
        let threshold = range.wrapping_neg() % range; // = (2^64 - range) % range
        loop {
            let r = self.next_u64();
            if r >= threshold {
                return low + (r % range);
            }
        }
    }

    /// Generate a uniform random `i32` in `[low, high]` (inclusive on both
    /// ends). The arm walker draws its irregular 1–5 degree step with this.
    ///
    /// Panics if `low > high`.
    pub fn range_i32_inclusive(&mut self, low: i32, high: i32) -> i32 {
        assert!(low <= high, "range_i32_inclusive: low must be <= high");
        let span = (high as i64 - low as i64) as u64 + 1;
        low + self.range_u64(0, span) as i32
    }

    /// Return `true` with probability `p`, `false` otherwise.
    ///
    /// `p` should be in [0.0, 1.0]. Values outside this range are clamped:
    /// `p <= 0.0` always returns false, `p >= 1.0` always returns true.
    pub fn random_bool(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }
}

/// SplitMix64 — used only for seeding xoshiro256++ from a single `u64`.
///
/// This is the standard recommendation from the xoshiro authors for
/// expanding a small seed into a larger state.
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}
