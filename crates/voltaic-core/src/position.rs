//! World-space positions for devices and providers.

use crate::fixed::Fixed64;
use serde::{Deserialize, Serialize};

/// A position in the 2D world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct WorldPosition {
    pub x: Fixed64,
    pub y: Fixed64,
}

impl WorldPosition {
    pub fn new(x: Fixed64, y: Fixed64) -> Self {
        Self { x, y }
    }

    /// Build a position from integer coordinates.
    pub fn from_ints(x: i32, y: i32) -> Self {
        Self {
            x: Fixed64::from_num(x),
            y: Fixed64::from_num(y),
        }
    }

    /// Squared Euclidean distance to another position.
    ///
    /// Saturates at [`Fixed64::MAX`] for points too far apart to represent.
    pub fn distance_squared(&self, other: &WorldPosition) -> Fixed64 {
        let dx = self.x.saturating_sub(other.x);
        let dy = self.y.saturating_sub(other.y);
        dx.saturating_mul(dx).saturating_add(dy.saturating_mul(dy))
    }

    /// Whether `other` lies within `range` of this position (inclusive).
    pub fn within(&self, other: &WorldPosition, range: Fixed64) -> bool {
        self.distance_squared(other) <= range.saturating_mul(range)
    }
}
