//! Per-tick collision flags and craft events for presentation collaborators

use serde::{Deserialize, Serialize};

/// Wall contact this tick. `left`/`right` name the side the craft is
/// pushed toward; `front` is a head-on hit or a fall.
/// Recomputed every tick; all false when nothing was hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CollisionFlags {
    pub front: bool,
    pub left: bool,
    pub right: bool,
}

impl CollisionFlags {
    pub fn any(&self) -> bool {
        self.front || self.left || self.right
    }
}

/// Which way a wall hit pushed the craft
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WallSide {
    Left,
    Right,
    Front,
}

/// Something audible or visible happened to the craft
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SimEvent {
    /// Drove over a boost pad
    Boost,
    /// Scraped or hit a wall
    WallHit { side: WallSide, speed_ratio: f32 },
    /// Left the track and started falling
    Falling,
    /// Shield depleted or fall finished (emitted once)
    Destroyed,
}
