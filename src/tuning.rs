//! Data-driven craft balance
//!
//! Every per-tick constant of the craft lives here. Values are expressed per
//! baseline frame (dt = 1.0 at 60 FPS).

use serde::{Deserialize, Serialize};

use crate::consts::FALL_DURATION_MS;

/// Difficulty presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Difficulty {
    #[default]
    Casual,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Casual => "Casual",
            Difficulty::Hard => "Hard",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "casual" | "easy" | "0" => Some(Difficulty::Casual),
            "hard" | "1" => Some(Difficulty::Hard),
            _ => None,
        }
    }

    /// Craft tuning for this preset
    pub fn tuning(&self) -> ShipTuning {
        match self {
            Difficulty::Casual => ShipTuning::casual(),
            Difficulty::Hard => ShipTuning::hard(),
        }
    }
}

/// Craft physics constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShipTuning {
    // === Propulsion ===
    pub thrust: f32,
    pub air_resist: f32,
    pub max_speed: f32,
    pub booster_speed: f32,
    pub booster_decay: f32,

    // === Steering ===
    pub angular_speed: f32,
    pub angular_lerp: f32,
    pub roll_angle: f32,
    pub roll_lerp: f32,

    // === Air brakes ===
    pub air_brake: f32,
    pub air_drift: f32,
    pub air_angular_speed: f32,
    pub drift_lerp: f32,

    // === Collision ===
    pub repulsion_ratio: f32,
    /// Lower bound of the repulsion magnitude
    pub repulsion_min: f32,
    pub repulsion_cap: f32,
    pub repulsion_lerp: f32,
    /// Distance of the side probes from the craft, in world units
    pub repulsion_probe_scale: f32,
    pub collision_speed_decrease: f32,
    pub collision_speed_decrease_coef: f32,
    /// Map pixels to the forward-diagonal fall probe
    pub fall_probe_offset: f32,

    // === Shield ===
    pub max_shield: f32,
    pub shield_damage: f32,
    /// Extra factor on shield damage per wall hit
    pub collision_damage_coef: f32,

    // === Terrain follow ===
    pub height_lerp: f32,
    pub gradient_lerp: f32,
    pub gradient_scale: f32,
    pub tilt_lerp: f32,
    pub tilt_scale: f32,
    /// Horizontal distance of the slope probes
    pub slope_probe_distance: f32,

    // === Falling ===
    /// Downward distance per tick while falling
    pub fall_speed: f32,
    pub fall_duration_ms: f32,
}

impl Default for ShipTuning {
    fn default() -> Self {
        Self::casual()
    }
}

impl ShipTuning {
    /// Forgiving handling, light shield damage
    pub fn casual() -> Self {
        let max_speed = 7.0;
        Self {
            thrust: 0.02,
            air_resist: 0.02,
            max_speed,
            booster_speed: max_speed * 0.5,
            booster_decay: 0.007,

            angular_speed: 0.0125,
            angular_lerp: 0.4,
            roll_angle: 0.6,
            roll_lerp: 0.07,

            air_brake: 0.025,
            air_drift: 0.06,
            air_angular_speed: 0.0135,
            drift_lerp: 0.3,

            repulsion_ratio: 0.5,
            repulsion_min: 0.8,
            repulsion_cap: 2.5,
            repulsion_lerp: 0.1,
            repulsion_probe_scale: 4.0,
            collision_speed_decrease: 0.8,
            collision_speed_decrease_coef: 0.5,
            fall_probe_offset: 2.0,

            max_shield: 1.0,
            shield_damage: 0.06,
            collision_damage_coef: 0.8,

            height_lerp: 0.4,
            gradient_lerp: 0.05,
            gradient_scale: 4.0,
            tilt_lerp: 0.05,
            tilt_scale: 4.0,
            slope_probe_distance: 5.0,

            fall_speed: 20.0,
            fall_duration_ms: FALL_DURATION_MS,
        }
    }

    /// Faster craft, twitchier steering, harsher wall penalties
    pub fn hard() -> Self {
        let max_speed = 9.6;
        Self {
            thrust: 0.035,
            air_resist: 0.035,
            max_speed,
            booster_speed: max_speed * 0.35,
            booster_decay: 0.007,

            angular_speed: 0.014,
            air_angular_speed: 0.0165,
            air_brake: 0.04,
            air_drift: 0.07,

            shield_damage: 0.03,
            ..Self::casual()
        }
    }

    /// Same handling without shield damage
    pub fn godmode(mut self) -> Self {
        self.shield_damage = 0.0;
        self
    }
}
