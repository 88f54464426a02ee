//! Hover Racer - simulation core of an anti-gravity arcade racer
//!
//! Core modules:
//! - `track`: Raster track encodings (collision, height, checkpoint maps)
//! - `sim`: Craft physics, steering, terrain follow and wall collision
//! - `race`: Countdown, checkpoint/lap progression and mode dispatch
//! - `replay`: Decimated pose recording and interpolated playback
//! - `clock`: Frame clock and race time formatting
//! - `platform`: Native/browser time, storage and logging
//! - `persistence`: Replay blobs keyed by track and mode
//! - `tuning`: Data-driven craft balance
//!
//! The crate ships no JS bindings. A browser front end links it as a Rust
//! dependency, exports its own entry points and calls `RaceDirector::update`
//! once per animation frame with `LocalStorage` as the blob store.

pub mod clock;
pub mod leaderboard;
pub mod persistence;
pub mod platform;
pub mod race;
pub mod replay;
pub mod settings;
pub mod sim;
pub mod track;
pub mod tuning;

pub use clock::{Clock, format_time};
pub use leaderboard::{Leaderboard, LocalLeaderboard};
pub use race::{RaceDirector, RaceMode, RaceResult};
pub use replay::{ReplayFrame, ReplayLog};
pub use settings::Settings;
pub use sim::{ShipInput, VehicleSimulation};
pub use track::{PixelField, Track, TrackLayout};
pub use tuning::{Difficulty, ShipTuning};

/// Game configuration constants
pub mod consts {
    /// Duration of one baseline frame (60 FPS), in milliseconds.
    /// Simulation `dt` is expressed in multiples of this.
    pub const FRAME_MS: f32 = 1000.0 / 60.0;

    /// Laps in a standard race
    pub const DEFAULT_TOTAL_LAPS: u32 = 3;
    /// Record one replay frame every N ticks
    pub const DEFAULT_REPLAY_RATE: u32 = 2;

    /// Delay from race start to the first countdown display
    pub const COUNTDOWN_DELAY_MS: f64 = 1500.0;
    /// Gap between countdown displays, and from "1" to "Go"
    pub const START_DELAY_MS: f64 = 1000.0;
    /// How long the result stays on screen before the race goes inactive
    pub const FINISH_HOLD_MS: f64 = 2000.0;

    /// Fall animation length before a craft that left the track is destroyed
    pub const FALL_DURATION_MS: f32 = 1500.0;

    /// Height codes at or above this mean "no terrain here"
    pub const NO_TERRAIN_CODE: f32 = 16_777_000.0;
    /// Collision-map red value below which a probe counts as mostly wall
    pub const WALL_THRESHOLD: u8 = 128;
    /// Checkpoint ids are encoded in the blue channel below this value
    pub const CHECKPOINT_ID_LIMIT: u8 = 250;

    /// Angles smaller than this are not applied to the render transform
    pub const EPSILON: f32 = 1e-8;
}

/// Linear interpolation from `a` toward `b`
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Convert a wall-clock frame delta into baseline frames (1.0 at 60 FPS)
#[inline]
pub fn frame_dt(delta_ms: f64) -> f32 {
    (delta_ms as f32 / consts::FRAME_MS).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_dt_baseline() {
        assert!((frame_dt(1000.0 / 60.0) - 1.0).abs() < 1e-5);
        assert!((frame_dt(1000.0 / 30.0) - 2.0).abs() < 1e-5);
        assert_eq!(frame_dt(-5.0), 0.0);
    }

    #[test]
    fn test_lerp() {
        assert_eq!(lerp(0.0, 10.0, 0.25), 2.5);
        assert_eq!(lerp(4.0, 4.0, 0.9), 4.0);
    }
}
