//! Terrain follow helpers

use glam::Vec3;

use crate::track::{PixelField, is_no_terrain, project};

/// Decode a packed height code into world units. `None` past the track edge.
pub fn decode_height(code: f32, scale: f32, bias: f32) -> Option<f32> {
    if is_no_terrain(code) || !code.is_finite() {
        None
    } else {
        Some(code / scale + bias)
    }
}

/// Bilinear terrain height under a world position
pub fn height_at(field: &PixelField, pos: Vec3, pixel_ratio: f32, scale: f32, bias: f32) -> Option<f32> {
    let (x, y) = project(field, pos, pixel_ratio);
    decode_height(field.sample_height_code_bilinear(x, y), scale, bias)
}

/// Vertical move toward the terrain: snap up at once when below it (no
/// tunneling), ease down when above it
pub fn vertical_correction(terrain: f32, current_y: f32, height_lerp: f32) -> f32 {
    let delta = terrain - current_y;
    if delta > 0.0 { delta } else { delta * height_lerp }
}

/// Slope angle between two probes `baseline` apart, scaled for display
pub fn slope_angle(probe_height: f32, height: f32, baseline: f32, scale: f32) -> f32 {
    (probe_height - height).atan2(baseline) * scale
}

/// Bank from the side probe. When that probe has no terrain, the mirrored
/// probe on the other side is used with its sign flipped.
pub fn bank_angle(side: Option<f32>, mirrored: Option<f32>, height: f32, baseline: f32, scale: f32) -> Option<f32> {
    match (side, mirrored) {
        (Some(h), _) => Some(slope_angle(h, height, baseline, scale)),
        (None, Some(h)) => Some(-slope_angle(h, height, baseline, scale)),
        (None, None) => None,
    }
}
