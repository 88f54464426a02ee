//! Track definition: how world space maps onto the track images

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use super::pixel_field::PixelField;

/// Ordered checkpoint ids of a lap
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoints {
    /// Every id painted on the checkpoint map, in driving order
    pub list: Vec<u8>,
    /// Id of the start/finish line
    pub start: u8,
    /// Id crossed right before the start line closes a lap
    pub last: u8,
}

impl Default for Checkpoints {
    fn default() -> Self {
        Self {
            list: vec![0, 1, 2],
            start: 0,
            last: 2,
        }
    }
}

/// Static description of a track
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackLayout {
    /// Identifier used for replay and leaderboard keys
    pub id: String,
    /// World units to map pixels
    pub pixel_ratio: f32,
    /// Height code divisor
    pub height_scale: f32,
    /// Added to every decoded height
    pub height_bias: f32,
    /// Craft spawn position
    pub spawn: Vec3,
    /// Spawn rotation as a quaternion vector part (w = 1, normalized on use)
    pub spawn_rotation: Vec3,
    #[serde(default)]
    pub checkpoints: Checkpoints,
}

impl TrackLayout {
    /// The city circuit the game ships with
    pub fn cityscape() -> Self {
        Self {
            id: "cityscape".to_string(),
            pixel_ratio: 2048.0 / 6000.0,
            height_scale: 10.0,
            height_bias: 4.0,
            spawn: Vec3::new(-1134.0 * 2.0, 387.0, -443.0 * 2.0),
            spawn_rotation: Vec3::ZERO,
            checkpoints: Checkpoints::default(),
        }
    }

    /// Quaternion the craft starts with
    pub fn spawn_orientation(&self) -> Quat {
        rotation_vector_to_quat(self.spawn_rotation)
    }
}

/// Build an orientation from a rotation vector used as the quaternion's
/// imaginary part over a unit real part
pub fn rotation_vector_to_quat(v: Vec3) -> Quat {
    Quat::from_xyzw(v.x, v.y, v.z, 1.0).normalize()
}

/// Project a world position onto a map: `center + world * pixel_ratio`
#[inline]
pub fn project(field: &PixelField, pos: Vec3, pixel_ratio: f32) -> (f32, f32) {
    let (cx, cy) = field.center();
    (cx + pos.x * pixel_ratio, cy + pos.z * pixel_ratio)
}

/// Projected map coordinate rounded to the nearest pixel
#[inline]
pub fn project_rounded(field: &PixelField, pos: Vec3, pixel_ratio: f32) -> (i64, i64) {
    let (x, y) = project(field, pos, pixel_ratio);
    (x.round() as i64, y.round() as i64)
}
