//! Fixed-point math and grid coordinates for deterministic simulation.
//!
//! All combat quantities (health, shield, damage, ranges) use fixed-point
//! arithmetic to ensure deterministic behavior across platforms. Floating
//! point only appears at the configuration boundary, where rule files are
//! parsed once before a battle begins.

use fixed::types::I32F32;
use serde::{Deserialize, Serialize};

/// Fixed-point number type for all simulation math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
pub type Fixed = I32F32;

/// Serde support for fixed-point rule values.
///
/// Rule files carry human-readable decimals (`3.5`, `0.34`). Parsing a
/// decimal literal into `f64` is exactly specified by IEEE 754, and the
/// conversion into `Fixed` happens once at load time, so this keeps the
/// configuration deterministic without exposing raw bit patterns.
pub mod fixed_decimal {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as a decimal.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_num::<f64>().serialize(serializer)
    }

    /// Deserialize a fixed-point number from a decimal.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = f64::deserialize(deserializer)?;
        Ok(Fixed::from_num(value))
    }
}

/// Integer grid coordinate on the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coord {
    /// Column, increasing to the right.
    pub x: i32,
    /// Row, increasing upward (toward the enemy side).
    pub y: i32,
}

impl Coord {
    /// Create a new grid coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another cell, as an exact integer.
    #[must_use]
    pub const fn distance_squared(self, other: Self) -> i64 {
        let dx = (self.x - other.x) as i64;
        let dy = (self.y - other.y) as i64;
        dx * dx + dy * dy
    }

    /// Whether another cell lies within `range` (Euclidean, inclusive).
    ///
    /// Compares squared distances so fractional ranges like `3.5` are
    /// handled exactly in fixed-point.
    #[must_use]
    pub fn within(self, other: Self, range: Fixed) -> bool {
        if range < Fixed::ZERO {
            return false;
        }
        Fixed::from_num(self.distance_squared(other)) <= range * range
    }

    /// The four cardinal neighbors of this cell.
    #[must_use]
    pub const fn neighbors(self) -> [Self; 4] {
        [
            Self::new(self.x, self.y + 1),
            Self::new(self.x, self.y - 1),
            Self::new(self.x + 1, self.y),
            Self::new(self.x - 1, self.y),
        ]
    }
}
