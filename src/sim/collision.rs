//! Wall collision response
//!
//! The collision map's red channel is 255 on open track and drops toward 0
//! inside walls. When the craft's own pixel reads below 255 it has hit
//! something; two side probes then decide which way to push it back.

use glam::Vec3;

use super::event::WallSide;
use crate::consts::WALL_THRESHOLD;
use crate::tuning::ShipTuning;

/// How a wall hit is resolved
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WallResponse {
    /// Side the craft is pushed toward: the less blocked one
    pub side: WallSide,
    /// Repulsion in craft-local space (+X is the craft's left, +Z forward)
    pub force: Vec3,
}

/// Repulsion magnitude, bounded below so slow scrapes still separate
pub fn repulsion_amount(speed: f32, tuning: &ShipTuning) -> f32 {
    (speed * tuning.repulsion_ratio)
        .min(tuning.repulsion_cap)
        .max(tuning.repulsion_min)
}

/// Push away from the more wall-like (lower) probe, toward the open side.
/// Equal probes mean a head-on hit: push straight back, four times as hard.
pub fn resolve_wall_hit(left_probe: u8, right_probe: u8, speed: f32, tuning: &ShipTuning) -> WallResponse {
    let amount = repulsion_amount(speed, tuning);
    if left_probe < right_probe {
        WallResponse {
            side: WallSide::Right,
            force: Vec3::new(-amount, 0.0, 0.0),
        }
    } else if right_probe < left_probe {
        WallResponse {
            side: WallSide::Left,
            force: Vec3::new(amount, 0.0, 0.0),
        }
    } else {
        WallResponse {
            side: WallSide::Front,
            force: Vec3::new(0.0, 0.0, -amount * 4.0),
        }
    }
}

/// Both sides and the forward diagonal are mostly wall: the craft has left the track
pub fn is_off_track(left_probe: u8, right_probe: u8, front_probe: u8) -> bool {
    left_probe < WALL_THRESHOLD && right_probe < WALL_THRESHOLD && front_probe < WALL_THRESHOLD
}

/// Multiplier on speed after a hit; solid walls (low red) cost more
pub fn speed_penalty(collision_red: f32, tuning: &ShipTuning) -> f32 {
    let solidity = 1.0 - (collision_red / 255.0).clamp(0.0, 1.0);
    tuning.collision_speed_decrease * (1.0 - tuning.collision_speed_decrease_coef * solidity)
}

/// Shield lost on a hit at `real_speed`
pub fn shield_damage(real_speed: f32, tuning: &ShipTuning) -> f32 {
    let ratio = real_speed / tuning.max_speed;
    ratio * ratio * tuning.collision_damage_coef * tuning.shield_damage
}
