//! Procedural ring circuit
//!
//! Generates a complete set of track encodings for a circular road: white
//! open track, a soft grey falloff into black walls, yellow-keyed checkpoint
//! stripes, one red boost pad, and a packed height map with a gentle hill.
//! Driving direction is counter-clockwise in map space (increasing angle).

use std::f32::consts::TAU;
use std::sync::Arc;

use glam::{Quat, Vec3};

use super::layout::{Checkpoints, TrackLayout};
use super::pixel_field::PixelField;
use super::Track;

/// Parameters of a ring circuit, all distances in map pixels
#[derive(Debug, Clone)]
pub struct RingTrack {
    pub id: String,
    /// Square map size
    pub size: u32,
    pub inner_radius: f32,
    pub outer_radius: f32,
    /// Width of the grey band between road and solid wall
    pub wall_falloff: f32,
    /// Number of checkpoints, id 0 is the start line at angle 0
    pub checkpoint_count: u8,
    /// Half width of a checkpoint stripe
    pub stripe_half_width: f32,
    /// Angle of the boost pad center
    pub boost_angle: f32,
    /// Half length of the boost pad along the road
    pub boost_half_length: f32,
    /// Peak hill height in world units
    pub hill_height: f32,
    pub pixel_ratio: f32,
    pub height_scale: f32,
    pub height_bias: f32,
    /// Spawn offset past the start line, in radians
    pub spawn_offset: f32,
}

impl Default for RingTrack {
    fn default() -> Self {
        Self {
            id: "ring".to_string(),
            size: 512,
            inner_radius: 150.0,
            outer_radius: 220.0,
            wall_falloff: 6.0,
            checkpoint_count: 3,
            stripe_half_width: 3.0,
            boost_angle: TAU / 6.0,
            boost_half_length: 8.0,
            hill_height: 6.0,
            pixel_ratio: 0.25,
            height_scale: 10.0,
            height_bias: 0.0,
            spawn_offset: 0.1,
        }
    }
}

/// Encode a height code into the three packed channels
pub fn encode_height(code: u32) -> [u8; 3] {
    let b = code / 65025;
    let rem = code % 65025;
    [(rem % 255) as u8, (rem / 255) as u8, b.min(255) as u8]
}

impl RingTrack {
    fn mid_radius(&self) -> f32 {
        (self.inner_radius + self.outer_radius) / 2.0
    }

    fn center(&self) -> f32 {
        self.size as f32 / 2.0
    }

    /// Angle of checkpoint `id`
    pub fn checkpoint_angle(&self, id: u8) -> f32 {
        id as f32 * TAU / self.checkpoint_count.max(1) as f32
    }

    /// World position on the road at `angle`; `lane` 0 = inner edge, 1 = outer edge
    pub fn point_at(&self, angle: f32, lane: f32) -> Vec3 {
        let r = self.inner_radius + (self.outer_radius - self.inner_radius) * lane;
        let y = self.height_at(angle);
        Vec3::new(
            r * angle.cos() / self.pixel_ratio,
            y,
            r * angle.sin() / self.pixel_ratio,
        )
    }

    /// Orientation facing the driving direction at `angle`
    pub fn heading_at(&self, angle: f32) -> Quat {
        Quat::from_rotation_y(-angle)
    }

    /// Decoded terrain height in world units at `angle`
    pub fn height_at(&self, angle: f32) -> f32 {
        self.height_code_at(angle) as f32 / self.height_scale + self.height_bias
    }

    fn height_code_at(&self, angle: f32) -> u32 {
        let h = self.hill_height * (1.0 - angle.cos()) / 2.0;
        (h * self.height_scale).round().max(0.0) as u32
    }

    fn collision_pixel(&self, r: f32, angle: f32) -> [u8; 4] {
        let below = self.inner_radius - r;
        let above = r - self.outer_radius;
        let outside = below.max(above);
        if outside > 0.0 {
            let t = (1.0 - outside / self.wall_falloff).clamp(0.0, 1.0);
            let v = (t * 220.0) as u8;
            return [v, v, v, 255];
        }

        let arc = |target: f32| {
            let mut d = (angle - target).rem_euclid(TAU);
            if d > TAU / 2.0 {
                d -= TAU;
            }
            d * r
        };

        for id in 0..self.checkpoint_count {
            if arc(self.checkpoint_angle(id)).abs() <= self.stripe_half_width {
                return [255, 255, id, 255];
            }
        }

        let lane = (r - self.inner_radius) / (self.outer_radius - self.inner_radius);
        if arc(self.boost_angle).abs() <= self.boost_half_length && (0.33..=0.67).contains(&lane) {
            return [255, 0, 0, 255];
        }

        [255, 255, 255, 255]
    }

    /// Generate the maps and layout
    pub fn build(&self) -> Track {
        let n = self.size as usize;
        let c = self.center();
        let mut collision = Vec::with_capacity(n * n * 4);
        let mut height = Vec::with_capacity(n * n * 4);

        for py in 0..self.size {
            for px in 0..self.size {
                let dx = px as f32 - c;
                let dy = py as f32 - c;
                let r = (dx * dx + dy * dy).sqrt();
                let angle = dy.atan2(dx).rem_euclid(TAU);

                collision.extend_from_slice(&self.collision_pixel(r, angle));
                let [hr, hg, hb] = encode_height(self.height_code_at(angle));
                height.extend_from_slice(&[hr, hg, hb, 255]);
            }
        }

        let spawn_angle = self.spawn_offset;
        let spawn = self.point_at(spawn_angle, 0.5);
        let layout = TrackLayout {
            id: self.id.clone(),
            pixel_ratio: self.pixel_ratio,
            height_scale: self.height_scale,
            height_bias: self.height_bias,
            spawn,
            spawn_rotation: Vec3::new(0.0, (-spawn_angle / 2.0).tan(), 0.0),
            checkpoints: Checkpoints {
                list: (0..self.checkpoint_count).collect(),
                start: 0,
                last: self.checkpoint_count.saturating_sub(1),
            },
        };

        // Buffers are sized from `size`, so populating cannot fail
        let collision = Arc::new(
            PixelField::from_rgba(self.size, self.size, collision).unwrap_or_default(),
        );
        let height =
            Arc::new(PixelField::from_rgba(self.size, self.size, height).unwrap_or_default());

        log::debug!(
            "Generated ring track '{}' ({}px, road {}..{})",
            self.id,
            self.size,
            self.inner_radius,
            self.outer_radius
        );

        Track {
            layout,
            checkpoints: Arc::clone(&collision),
            collision,
            height,
        }
    }

    /// Mid-road radius in world units
    pub fn mid_radius_world(&self) -> f32 {
        self.mid_radius() / self.pixel_ratio
    }
}
