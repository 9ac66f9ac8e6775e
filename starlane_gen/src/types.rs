// Core types shared across the generation pipeline.
//
// Defines galaxy-map coordinates (`Coord`), system identifiers
// (strongly-typed UUID v4 wrappers), and the `System` record's enums. All
// types derive `Serialize` and `Deserialize` for artifact emission.
//
// **Critical constraint: determinism.** System ids are generated from the
// pipeline's `WorldRng` (see `starlane_prng`). Do not use external UUID
// libraries or OS entropy.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use starlane_prng::WorldRng;
use std::fmt;

// ---------------------------------------------------------------------------
// Spatial types
// ---------------------------------------------------------------------------

/// A position on the 2D galaxy map, in integer map units.
///
/// Star placement works in floating point internally and rounds to `Coord`
/// at emission from each generation level; one cost-grid cell corresponds to
/// one coordinate unit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coord {
    pub x: i32,
    pub y: i32,
}

impl Coord {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance between two coordinates.
    pub fn distance(self, other: Self) -> f64 {
        let dx = f64::from(self.x - other.x);
        let dy = f64::from(self.y - other.y);
        (dx * dx + dy * dy).sqrt()
    }

    /// Distance from the galactic origin `(0, 0)`.
    pub fn distance_from_origin(self) -> f64 {
        self.distance(Coord::new(0, 0))
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

// ---------------------------------------------------------------------------
// System ids — deterministic UUID v4
// ---------------------------------------------------------------------------

/// A UUID v4, generated deterministically from the pipeline PRNG.
///
/// Layout follows RFC 4122: 128 bits with version nibble (bits 48–51) set
/// to `0100` and variant bits (bits 64–65) set to `10`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorldUuid([u8; 16]);

impl WorldUuid {
    /// Generate a deterministic UUID v4 from the pipeline PRNG.
    pub fn new_v4(rng: &mut WorldRng) -> Self {
        let mut bytes = rng.next_128_bits();
        // Set version nibble (byte 6, upper nibble) to 0100.
        bytes[6] = (bytes[6] & 0x0F) | 0x40;
        // Set variant bits (byte 8, upper 2 bits) to 10.
        bytes[8] = (bytes[8] & 0x3F) | 0x80;
        Self(bytes)
    }

    /// Parse a UUID from its 8-4-4-4-12 hex string representation.
    pub fn from_str(s: &str) -> Option<Self> {
        let hex: String = s.chars().filter(|c| *c != '-').collect();
        if hex.len() != 32 {
            return None;
        }
        let mut bytes = [0u8; 16];
        for i in 0..16 {
            bytes[i] = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).ok()?;
        }
        Some(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

// Custom serde: serialize as the 8-4-4-4-12 hex string so WorldUuid can be
// used as a JSON map key (serde_json requires string keys).
impl Serialize for WorldUuid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for WorldUuid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        WorldUuid::from_str(&s).ok_or_else(|| serde::de::Error::custom("invalid UUID format"))
    }
}

impl fmt::Debug for WorldUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WorldUuid({})", self)
    }
}

impl fmt::Display for WorldUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Standard 8-4-4-4-12 hex representation.
        let b = &self.0;
        write!(
            f,
            "{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
            b[0], b[1], b[2], b[3],
            b[4], b[5],
            b[6], b[7],
            b[8], b[9],
            b[10], b[11], b[12], b[13], b[14], b[15],
        )
    }
}

/// Unique identifier for a star system.
///
/// The derived `Ord` provides the stable total order used to key routes by
/// their unordered endpoint pair (the smaller id is always the origin).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SystemId(pub WorldUuid);

impl SystemId {
    pub fn new(rng: &mut WorldRng) -> Self {
        Self(WorldUuid::new_v4(rng))
    }
}

impl fmt::Display for SystemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SystemId({})", self.0)
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Classification tag for systems outside the privileged cluster.
///
/// Mutually exclusive, assigned exactly once after cluster selection.
/// Privileged systems carry no tag (`System::classification` is `None`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Classification {
    /// No population, no infrastructure.
    Uninhabited,
    /// A colony that lost contact and slid backwards technologically.
    RegressedColony,
    /// A deliberately hidden settlement, absent from public charts.
    HiddenEnclave,
}
