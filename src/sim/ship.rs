//! Craft simulation
//!
//! One `update(dt)` per frame integrates control intentions into speed,
//! yaw, drift and boost, follows the terrain, resolves wall contact and
//! composes the render transform. `dt` is measured in baseline frames
//! (1.0 at 60 FPS).
//!
//! Orientation convention: the craft faces local +Z, local +X is its left
//! and +Y is up. Map coordinates are `center + world.xz * pixel_ratio`.

use std::sync::Arc;

use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

use super::collision::{is_off_track, resolve_wall_hit, shield_damage, speed_penalty};
use super::event::{CollisionFlags, SimEvent, WallSide};
use super::input::{ShipInput, Steering};
use super::terrain::{bank_angle, height_at, slope_angle, vertical_correction};
use crate::consts::{EPSILON, FRAME_MS};
use crate::lerp;
use crate::track::{PixelField, Track, project, project_rounded, rotation_vector_to_quat};
use crate::tuning::ShipTuning;

/// Lifecycle of the craft
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CraftState {
    /// Physics runs, controls are ignored (countdown, after the finish)
    Inactive,
    /// Controls are applied
    Active,
    /// Drove off the track; only the fall animation runs
    Falling,
    /// Terminal until `reset`
    Destroyed,
}

/// Maps and encoding parameters the craft samples
#[derive(Debug, Clone)]
pub struct TrackMaps {
    pub collision: Arc<PixelField>,
    pub height: Arc<PixelField>,
    pub pixel_ratio: f32,
    pub height_scale: f32,
    pub height_bias: f32,
}

impl TrackMaps {
    pub fn from_track(track: &Track) -> Self {
        Self {
            collision: Arc::clone(&track.collision),
            height: Arc::clone(&track.height),
            pixel_ratio: track.layout.pixel_ratio,
            height_scale: track.layout.height_scale,
            height_bias: track.layout.height_bias,
        }
    }

    /// No maps at all: terrain, boost and collision logic are skipped
    pub fn unloaded() -> Self {
        Self {
            collision: Arc::new(PixelField::empty()),
            height: Arc::new(PixelField::empty()),
            pixel_ratio: 1.0,
            height_scale: 1.0,
            height_bias: 0.0,
        }
    }
}

/// Visual attitude derived from terrain and steering.
///
/// Targets are computed during the physics step; the current angles are
/// eased toward them and feed the render transform only.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Attitude {
    /// Nose up/down from the slope ahead
    pub pitch: f32,
    pub pitch_target: f32,
    /// Sideways tilt from the slope beside the craft
    pub bank: f32,
    pub bank_target: f32,
    /// Lean into turns
    pub roll: f32,
}

/// The controllable craft
#[derive(Debug, Clone)]
pub struct VehicleSimulation {
    tuning: ShipTuning,
    maps: TrackMaps,
    collision_detection: bool,

    state: CraftState,
    position: Vec3,
    orientation: Quat,
    /// Local-space movement accumulated this tick
    movement: Vec3,

    speed: f32,
    speed_ratio: f32,
    boost: f32,
    on_boost_pad: bool,
    drift: f32,
    angular: f32,
    shield: f32,
    repulsion: Vec3,

    attitude: Attitude,
    collision: CollisionFlags,
    fall_elapsed_ms: f32,
    transform: Mat4,
    events: Vec<SimEvent>,
}

impl VehicleSimulation {
    /// Inactive craft at the origin with a full shield
    pub fn new(tuning: ShipTuning, maps: TrackMaps) -> Self {
        let shield = tuning.max_shield;
        Self {
            tuning,
            maps,
            collision_detection: true,
            state: CraftState::Inactive,
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            movement: Vec3::ZERO,
            speed: 0.0,
            speed_ratio: 0.0,
            boost: 0.0,
            on_boost_pad: false,
            drift: 0.0,
            angular: 0.0,
            shield,
            repulsion: Vec3::ZERO,
            attitude: Attitude::default(),
            collision: CollisionFlags::default(),
            fall_elapsed_ms: 0.0,
            transform: Mat4::IDENTITY,
            events: Vec::new(),
        }
    }

    /// Place the craft and clear every kinematic and damage value.
    ///
    /// `rotation` is a quaternion vector part over a unit real part. The
    /// craft comes back inactive; the caller activates it.
    pub fn reset(&mut self, position: Vec3, rotation: Vec3) {
        self.state = CraftState::Inactive;
        self.position = position;
        self.orientation = rotation_vector_to_quat(rotation);
        self.movement = Vec3::ZERO;
        self.speed = 0.0;
        self.speed_ratio = 0.0;
        self.boost = 0.0;
        self.on_boost_pad = false;
        self.drift = 0.0;
        self.angular = 0.0;
        self.shield = self.tuning.max_shield;
        self.repulsion = Vec3::ZERO;
        self.attitude = Attitude::default();
        self.collision = CollisionFlags::default();
        self.fall_elapsed_ms = 0.0;
        self.events.clear();
        self.transform = Mat4::from_rotation_translation(self.orientation, self.position);
    }

    /// Toggle control processing. Ignored once falling or destroyed.
    pub fn set_active(&mut self, active: bool) {
        self.state = match (self.state, active) {
            (CraftState::Inactive, true) => CraftState::Active,
            (CraftState::Active, false) => CraftState::Inactive,
            (s, _) => s,
        };
    }

    pub fn set_collision_detection(&mut self, enabled: bool) {
        self.collision_detection = enabled;
    }

    /// Swap the maps (e.g. once a track finished loading)
    pub fn set_maps(&mut self, maps: TrackMaps) {
        self.maps = maps;
    }

    /// Advance one frame
    pub fn update(&mut self, dt: f32, input: &ShipInput) {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        self.collision = CollisionFlags::default();

        match self.state {
            CraftState::Destroyed => return,
            CraftState::Falling => {
                self.fall(dt);
                return;
            }
            CraftState::Inactive | CraftState::Active => {}
        }

        let t = &self.tuning;
        self.movement = Vec3::ZERO;
        self.drift = lerp(self.drift, 0.0, t.drift_lerp);
        self.angular = lerp(self.angular, 0.0, t.angular_lerp * 0.5);

        let mut steering = Steering::default();
        if self.state == CraftState::Active {
            steering = input.steering(t.angular_speed, t.roll_angle, dt);

            if input.forward {
                self.speed += t.thrust * dt;
            } else {
                self.speed = (self.speed - t.air_resist * dt).max(0.0);
            }

            if input.left_brake {
                steering.angular += if input.left {
                    t.air_angular_speed * dt
                } else {
                    t.air_angular_speed * 0.5 * dt
                };
                self.speed -= t.air_brake * dt;
                self.drift = lerp(self.drift, t.air_drift, t.drift_lerp);
                self.movement.x += self.speed * self.drift * dt;
                if self.drift > 0.0 {
                    self.movement.z -= self.speed * self.drift * dt;
                }
                steering.roll -= t.roll_angle * 0.7;
            }

            if input.right_brake {
                steering.angular -= if input.right {
                    t.air_angular_speed * dt
                } else {
                    t.air_angular_speed * 0.5 * dt
                };
                self.speed -= t.air_brake * dt;
                self.drift = lerp(self.drift, -t.air_drift, t.drift_lerp);
                self.movement.x += self.speed * self.drift * dt;
                if self.drift < 0.0 {
                    self.movement.z += self.speed * self.drift * dt;
                }
                steering.roll += t.roll_angle * 0.7;
            }
        }

        self.angular = lerp(self.angular, steering.angular, t.angular_lerp);
        let yaw = self.angular;

        self.speed = self.speed.clamp(0.0, t.max_speed);
        self.speed_ratio = self.speed / t.max_speed;
        self.movement.z += self.speed * dt;

        self.apply_repulsion(dt);
        self.booster_check(dt);

        self.position += self.orientation * Vec3::new(self.movement.x, 0.0, self.movement.z);
        self.height_check();
        self.position += self.orientation * Vec3::new(0.0, self.movement.y, 0.0);

        self.collision_check();

        let delta = Quat::from_xyzw(0.0, yaw, 0.0, 1.0).normalize();
        self.orientation = (self.orientation * delta).normalize();

        if self.shield <= 0.0 {
            self.shield = 0.0;
            self.destroy();
        }

        self.ease_attitude(Some(steering.roll));
        self.compose_transform();
    }

    /// Set the pose directly (replay playback). Pitch and bank still ease
    /// toward the terrain under the new pose; roll is left alone.
    pub fn teleport(&mut self, position: Vec3, orientation: Quat) {
        self.position = position;
        self.orientation = orientation;
        if self.maps.height.is_loaded() {
            let m = &self.maps;
            if let Some(h) = height_at(&m.height, position, m.pixel_ratio, m.height_scale, m.height_bias) {
                self.update_slope_targets(h);
            }
        }
        self.ease_attitude(None);
        self.compose_transform();
    }

    fn fall(&mut self, dt: f32) {
        self.position.y -= self.tuning.fall_speed;
        self.collision.front = true;
        self.fall_elapsed_ms += dt * FRAME_MS;
        if self.fall_elapsed_ms >= self.tuning.fall_duration_ms {
            self.destroy();
        }
        self.compose_transform();
    }

    fn start_falling(&mut self) {
        if self.state == CraftState::Falling || self.state == CraftState::Destroyed {
            return;
        }
        log::info!("Craft left the track at {:?}", self.position);
        self.state = CraftState::Falling;
        self.fall_elapsed_ms = 0.0;
        self.collision.front = true;
        self.events.push(SimEvent::Falling);
    }

    fn destroy(&mut self) {
        if self.state == CraftState::Destroyed {
            return;
        }
        log::info!("Craft destroyed");
        self.state = CraftState::Destroyed;
        self.events.push(SimEvent::Destroyed);
    }

    fn apply_repulsion(&mut self, dt: f32) {
        if self.repulsion.length_squared() < 1e-4 {
            self.repulsion = Vec3::ZERO;
            return;
        }
        if self.repulsion.z != 0.0 {
            self.movement.z = 0.0;
        }
        self.movement += self.repulsion;
        // Decays faster on slow frames so one long frame doesn't overshoot
        let k = if dt > 1.5 {
            self.tuning.repulsion_lerp * 2.0
        } else {
            self.tuning.repulsion_lerp
        };
        self.repulsion = self.repulsion.lerp(Vec3::ZERO, k);
    }

    fn booster_check(&mut self, dt: f32) {
        self.boost = (self.boost - self.tuning.booster_decay * dt).max(0.0);

        let map = &self.maps.collision;
        if map.is_loaded() {
            let (x, y) = project_rounded(map, self.position, self.maps.pixel_ratio);
            let on_pad = map.sample_point(x, y).is_boost_pad();
            if on_pad {
                self.boost = self.tuning.booster_speed;
                if !self.on_boost_pad {
                    self.events.push(SimEvent::Boost);
                }
            }
            self.on_boost_pad = on_pad;
        }

        self.movement.z += self.boost * dt;
    }

    fn height_check(&mut self) {
        let m = &self.maps;
        if !m.height.is_loaded() {
            return;
        }
        let Some(h) = height_at(&m.height, self.position, m.pixel_ratio, m.height_scale, m.height_bias)
        else {
            return;
        };
        self.movement.y = vertical_correction(h, self.position.y, self.tuning.height_lerp);
        self.update_slope_targets(h);
    }

    /// Probe ahead for pitch and beside for bank. The side probe falls back
    /// to the mirrored side when the primary one is off the map.
    fn update_slope_targets(&mut self, height: f32) {
        let m = &self.maps;
        let t = &self.tuning;
        let d = t.slope_probe_distance;
        let sample = |p: Vec3| height_at(&m.height, p, m.pixel_ratio, m.height_scale, m.height_bias);

        let ahead = self.position + self.orientation * Vec3::new(0.0, 0.0, d);
        if let Some(nh) = sample(ahead) {
            self.attitude.pitch_target = -slope_angle(nh, height, d, t.gradient_scale);
        }

        let side = self.orientation * Vec3::new(d, 0.0, 0.0);
        let bank = bank_angle(
            sample(self.position + side),
            sample(self.position - side),
            height,
            d,
            t.tilt_scale,
        );
        if let Some(target) = bank {
            self.attitude.bank_target = target;
        }
    }

    fn collision_check(&mut self) {
        let map = Arc::clone(&self.maps.collision);
        if !self.collision_detection || !map.is_loaded() {
            return;
        }
        let ratio = self.maps.pixel_ratio;

        let (fx, fy) = project(&map, self.position, ratio);
        let hit = map.sample_bilinear(fx, fy);
        if hit.r >= 255.0 {
            return;
        }

        let damage = shield_damage(self.real_speed(), &self.tuning);
        self.shield -= damage;

        let side = self.orientation * Vec3::new(self.tuning.repulsion_probe_scale, 0.0, 0.0);
        let (lx, ly) = project_rounded(&map, self.position + side, ratio);
        let (rx, ry) = project_rounded(&map, self.position - side, ratio);
        let left = map.sample_point(lx, ly).r;
        let right = map.sample_point(rx, ry).r;

        let response = resolve_wall_hit(left, right, self.speed, &self.tuning);
        self.repulsion += response.force;
        match response.side {
            WallSide::Left => self.collision.left = true,
            WallSide::Right => self.collision.right = true,
            WallSide::Front => {
                self.collision.front = true;
                self.speed = 0.0;
            }
        }
        self.events.push(SimEvent::WallHit {
            side: response.side,
            speed_ratio: self.speed_ratio,
        });

        let off = self.tuning.fall_probe_offset;
        let front = map
            .sample_point((fx.round() + off).round() as i64, (fy.round() + off).round() as i64)
            .r;
        if is_off_track(left, right, front) {
            self.start_falling();
        }

        self.speed *= speed_penalty(hit.r, &self.tuning);
        self.boost = 0.0;
    }

    fn ease_attitude(&mut self, roll_target: Option<f32>) {
        let t = &self.tuning;
        let a = &mut self.attitude;

        let d = (a.pitch_target - a.pitch) * t.gradient_lerp;
        if d.abs() > EPSILON {
            a.pitch += d;
        }
        let d = (a.bank_target - a.bank) * t.tilt_lerp;
        if d.abs() > EPSILON {
            a.bank += d;
        }
        if let Some(target) = roll_target {
            let d = (target - a.roll) * t.roll_lerp;
            if d.abs() > EPSILON {
                a.roll += d;
            }
        }
    }

    /// Pitch, then bank, then roll, then the physics translation and rotation
    fn compose_transform(&mut self) {
        let a = self.attitude;
        let mut m = Mat4::from_rotation_translation(self.orientation, self.position);
        if a.pitch.abs() > EPSILON {
            m *= Mat4::from_rotation_x(a.pitch);
        }
        if a.bank.abs() > EPSILON {
            m *= Mat4::from_rotation_z(a.bank);
        }
        if a.roll.abs() > EPSILON {
            m *= Mat4::from_rotation_z(a.roll);
        }
        self.transform = m;
    }

    /// Take the events raised since the last call
    pub fn drain_events(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.events)
    }

    // === Accessors ===

    pub fn state(&self) -> CraftState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == CraftState::Active
    }

    pub fn is_falling(&self) -> bool {
        self.state == CraftState::Falling
    }

    pub fn is_destroyed(&self) -> bool {
        self.state == CraftState::Destroyed
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn orientation(&self) -> Quat {
        self.orientation
    }

    pub fn pose(&self) -> (Vec3, Quat) {
        (self.position, self.orientation)
    }

    /// World-space direction the craft faces
    pub fn forward(&self) -> Vec3 {
        self.orientation * Vec3::Z
    }

    /// World-space direction of the craft's left side
    pub fn left(&self) -> Vec3 {
        self.orientation * Vec3::X
    }

    /// Render transform
    pub fn transform(&self) -> Mat4 {
        self.transform
    }

    pub fn attitude(&self) -> Attitude {
        self.attitude
    }

    pub fn collision(&self) -> CollisionFlags {
        self.collision
    }

    pub fn tuning(&self) -> &ShipTuning {
        &self.tuning
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn boost(&self) -> f32 {
        self.boost
    }

    pub fn drift(&self) -> f32 {
        self.drift
    }

    pub fn angular_velocity(&self) -> f32 {
        self.angular
    }

    /// Speed plus boost, rounded
    pub fn real_speed(&self) -> f32 {
        self.real_speed_scaled(1.0)
    }

    /// Speed plus boost, scaled for display then rounded
    pub fn real_speed_scaled(&self, scale: f32) -> f32 {
        ((self.speed + self.boost) * scale).round()
    }

    /// Speed plus boost over max speed, at most 1
    pub fn real_speed_ratio(&self) -> f32 {
        (self.speed + self.boost).min(self.tuning.max_speed) / self.tuning.max_speed
    }

    /// Speed plus boost over max speed, may exceed 1 while boosting
    pub fn speed_ratio(&self) -> f32 {
        (self.speed + self.boost) / self.tuning.max_speed
    }

    /// Thrust speed over max speed, as of the last integration
    pub fn thrust_ratio(&self) -> f32 {
        self.speed_ratio
    }

    pub fn boost_ratio(&self) -> f32 {
        if self.tuning.booster_speed > 0.0 {
            self.boost / self.tuning.booster_speed
        } else {
            0.0
        }
    }

    pub fn shield(&self) -> f32 {
        self.shield
    }

    /// Shield scaled for display then rounded
    pub fn shield_scaled(&self, scale: f32) -> f32 {
        (self.shield * scale).round()
    }

    pub fn shield_ratio(&self) -> f32 {
        self.shield / self.tuning.max_shield
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::RingTrack;
    use proptest::prelude::*;

    const SIZE: u32 = 64;

    /// Collision map filled by `f(x, y) -> red` with green/blue matching red
    fn collision_map(f: impl Fn(u32, u32) -> u8) -> Arc<PixelField> {
        let mut data = Vec::new();
        for y in 0..SIZE {
            for x in 0..SIZE {
                let r = f(x, y);
                data.extend_from_slice(&[r, r, r, 255]);
            }
        }
        Arc::new(PixelField::from_rgba(SIZE, SIZE, data).unwrap())
    }

    fn sim_with(collision: Arc<PixelField>, height: Arc<PixelField>) -> VehicleSimulation {
        let maps = TrackMaps {
            collision,
            height,
            pixel_ratio: 1.0,
            height_scale: 10.0,
            height_bias: 0.0,
        };
        let mut sim = VehicleSimulation::new(ShipTuning::casual(), maps);
        sim.reset(Vec3::ZERO, Vec3::ZERO);
        sim.set_active(true);
        sim
    }

    fn open_sim() -> VehicleSimulation {
        sim_with(collision_map(|_, _| 255), Arc::new(PixelField::empty()))
    }

    #[test]
    fn test_rest_stays_at_zero() {
        let mut sim = open_sim();
        for _ in 0..10 {
            sim.update(1.0, &ShipInput::default());
            assert_eq!(sim.speed(), 0.0);
        }
    }

    #[test]
    fn test_thrust_accelerates_and_moves_forward() {
        let mut sim = open_sim();
        let input = ShipInput {
            forward: true,
            ..Default::default()
        };
        for _ in 0..10 {
            sim.update(1.0, &input);
        }
        assert!((sim.speed() - 0.2).abs() < 1e-5);
        assert!(sim.position().z > 0.0);
        assert!(sim.position().x.abs() < 1e-6);
    }

    #[test]
    fn test_speed_clamped_to_max() {
        // No maps: one huge tick would otherwise carry the craft off the map
        let mut sim = VehicleSimulation::new(ShipTuning::casual(), TrackMaps::unloaded());
        sim.set_active(true);
        let input = ShipInput {
            forward: true,
            ..Default::default()
        };
        sim.update(10_000.0, &input);
        assert_eq!(sim.speed(), sim.tuning().max_speed);
        assert_eq!(sim.thrust_ratio(), 1.0);
    }

    #[test]
    fn test_inactive_ignores_controls() {
        let mut sim = open_sim();
        sim.set_active(false);
        let input = ShipInput {
            forward: true,
            left: true,
            ..Default::default()
        };
        for _ in 0..5 {
            sim.update(1.0, &input);
        }
        assert_eq!(sim.speed(), 0.0);
        assert_eq!(sim.orientation(), Quat::IDENTITY);
    }

    #[test]
    fn test_keyboard_left_yaws_toward_left() {
        let mut sim = open_sim();
        let input = ShipInput {
            forward: true,
            left: true,
            ..Default::default()
        };
        for _ in 0..30 {
            sim.update(1.0, &input);
        }
        assert!(sim.forward().x > 0.0, "nose swings toward +X (left)");
        assert!(sim.attitude().roll < 0.0);
    }

    #[test]
    fn test_left_air_brake_drifts_and_slows() {
        let mut braking = open_sim();
        let mut coasting = open_sim();
        braking.speed = 5.0;
        coasting.speed = 5.0;
        let brake = ShipInput {
            forward: true,
            left_brake: true,
            ..Default::default()
        };
        let go = ShipInput {
            forward: true,
            ..Default::default()
        };
        braking.update(1.0, &brake);
        coasting.update(1.0, &go);
        assert!(braking.speed() < coasting.speed());
        assert!(braking.drift() > 0.0);
        assert!(braking.angular_velocity() > 0.0);
    }

    #[test]
    fn test_right_air_brake_mirrors_left() {
        let mut left = open_sim();
        let mut right = open_sim();
        left.speed = 5.0;
        right.speed = 5.0;
        left.update(1.0, &ShipInput { left_brake: true, ..Default::default() });
        right.update(1.0, &ShipInput { right_brake: true, ..Default::default() });
        assert!((left.drift() + right.drift()).abs() < 1e-6);
        assert!((left.angular_velocity() + right.angular_velocity()).abs() < 1e-6);
        assert!((left.position().x + right.position().x).abs() < 1e-5);
        assert!((left.speed() - right.speed()).abs() < 1e-6);
    }

    #[test]
    fn test_boost_pad_sets_boost() {
        let mut data = Vec::new();
        for y in 0..SIZE {
            for x in 0..SIZE {
                if x == SIZE / 2 && y == SIZE / 2 {
                    data.extend_from_slice(&[255, 0, 0, 255]);
                } else {
                    data.extend_from_slice(&[255, 255, 255, 255]);
                }
            }
        }
        let map = Arc::new(PixelField::from_rgba(SIZE, SIZE, data).unwrap());
        let mut sim = sim_with(map, Arc::new(PixelField::empty()));
        sim.update(1.0, &ShipInput::default());
        assert_eq!(sim.boost(), sim.tuning().booster_speed);
        assert!((sim.position().z - sim.tuning().booster_speed).abs() < 1e-5);
        assert_eq!(sim.drain_events(), vec![SimEvent::Boost]);
        assert!(!sim.collision().any());

        // Off the pad the boost decays linearly
        sim.update(1.0, &ShipInput::default());
        let expected = sim.tuning().booster_speed - sim.tuning().booster_decay;
        assert!((sim.boost() - expected).abs() < 1e-5);
        assert!((sim.boost_ratio() - expected / sim.tuning().booster_speed).abs() < 1e-5);
    }

    #[test]
    fn test_wall_on_right_flags_and_pushes_left() {
        // Left probe (+X) reads 200, right probe (-X) reads 50, craft pixel 254
        let map = collision_map(|x, _| match x {
            34.. => 200,
            0..=30 => 50,
            _ => 254,
        });
        let mut sim = sim_with(map, Arc::new(PixelField::empty()));
        sim.update(1.0, &ShipInput::default());
        let flags = sim.collision();
        assert!(flags.left);
        assert!(!flags.right);
        assert!(!flags.front);
        assert!(!sim.is_falling());

        let x_before = sim.position().x;
        sim.update(1.0, &ShipInput::default());
        assert!(sim.position().x > x_before);
    }

    #[test]
    fn test_head_on_stops_and_pushes_back() {
        let map = collision_map(|_, _| 200);
        let mut sim = sim_with(map, Arc::new(PixelField::empty()));
        sim.speed = 5.0;
        sim.boost = 1.0;
        sim.update(1.0, &ShipInput::default());
        assert!(sim.collision().front);
        assert_eq!(sim.speed(), 0.0);
        assert_eq!(sim.boost(), 0.0);

        let z_before = sim.position().z;
        sim.update(1.0, &ShipInput::default());
        assert!(sim.position().z < z_before);
    }

    #[test]
    fn test_collision_detection_toggle() {
        let map = collision_map(|_, _| 200);
        let mut sim = sim_with(map, Arc::new(PixelField::empty()));
        sim.set_collision_detection(false);
        sim.speed = 5.0;
        sim.update(1.0, &ShipInput::default());
        assert!(!sim.collision().any());
        assert_eq!(sim.shield(), sim.tuning().max_shield);
    }

    #[test]
    fn test_off_track_falls_then_destroyed() {
        let map = collision_map(|_, _| 0);
        let mut sim = sim_with(map, Arc::new(PixelField::empty()));
        sim.update(1.0, &ShipInput::default());
        assert!(sim.is_falling());
        assert_eq!(sim.state(), CraftState::Falling);

        let y = sim.position().y;
        let input = ShipInput {
            forward: true,
            ..Default::default()
        };
        for _ in 0..80 {
            sim.update(1.0, &input);
        }
        assert!(sim.is_falling());
        assert!(sim.position().y < y);
        assert_eq!(sim.speed(), 0.0);

        for _ in 0..20 {
            sim.update(1.0, &input);
        }
        assert!(sim.is_destroyed());
        let destroyed = sim
            .drain_events()
            .into_iter()
            .filter(|e| *e == SimEvent::Destroyed)
            .count();
        assert_eq!(destroyed, 1);
    }

    #[test]
    fn test_shield_depletes_monotonically_and_destroys_once() {
        let map = collision_map(|_, _| 200);
        let mut sim = sim_with(map, Arc::new(PixelField::empty()));
        let mut previous = sim.shield();
        let mut ticks = 0;
        while !sim.is_destroyed() {
            // Hold the craft in place so the push-back never carries it off the map
            sim.teleport(Vec3::ZERO, Quat::IDENTITY);
            sim.repulsion = Vec3::ZERO;
            sim.speed = sim.tuning().max_speed;
            sim.update(1.0, &ShipInput::default());
            assert!(sim.shield() < previous || sim.shield() == 0.0);
            assert!(sim.shield() >= 0.0);
            previous = sim.shield();
            ticks += 1;
            assert!(ticks < 100, "shield never depleted");
        }
        assert_eq!(sim.shield(), 0.0);
        for _ in 0..5 {
            sim.update(1.0, &ShipInput::default());
        }
        assert!(sim.is_destroyed());
        let destroyed = sim
            .drain_events()
            .into_iter()
            .filter(|e| *e == SimEvent::Destroyed)
            .count();
        assert_eq!(destroyed, 1);

        sim.reset(Vec3::ZERO, Vec3::ZERO);
        assert!(!sim.is_destroyed());
        assert_eq!(sim.shield_ratio(), 1.0);
    }

    #[test]
    fn test_terrain_snaps_up_and_eases_down() {
        // code 100 -> height 10
        let height = Arc::new(
            PixelField::from_rgba(SIZE, SIZE, [100u8, 0, 0, 255].repeat((SIZE * SIZE) as usize))
                .unwrap(),
        );
        let mut sim = sim_with(collision_map(|_, _| 255), height);
        sim.update(1.0, &ShipInput::default());
        assert!((sim.position().y - 10.0).abs() < 1e-4);

        sim.reset(Vec3::new(0.0, 20.0, 0.0), Vec3::ZERO);
        sim.update(1.0, &ShipInput::default());
        assert!((sim.position().y - 16.0).abs() < 1e-4);
    }

    #[test]
    fn test_unloaded_height_map_leaves_height_alone() {
        let mut sim = open_sim();
        sim.reset(Vec3::new(0.0, 7.0, 0.0), Vec3::ZERO);
        sim.update(1.0, &ShipInput::default());
        assert_eq!(sim.position().y, 7.0);
    }

    #[test]
    fn test_slope_ahead_pitches_nose() {
        // Height rises with y (map z): code = 2 * y
        let mut data = Vec::new();
        for y in 0..SIZE {
            for _ in 0..SIZE {
                data.extend_from_slice(&[(y * 2) as u8, 0, 0, 255]);
            }
        }
        let height = Arc::new(PixelField::from_rgba(SIZE, SIZE, data).unwrap());
        let mut sim = sim_with(collision_map(|_, _| 255), height);
        for _ in 0..5 {
            sim.update(1.0, &ShipInput::default());
        }
        let a = sim.attitude();
        assert!(a.pitch_target < 0.0, "uphill ahead tips the nose");
        assert!(a.pitch < 0.0 && a.pitch > a.pitch_target);
        assert!(a.bank_target.abs() < 1e-4);
    }

    #[test]
    fn test_teleport_sets_exact_pose() {
        let mut sim = open_sim();
        let p = Vec3::new(3.0, 4.0, -5.0);
        let q = Quat::from_rotation_y(1.2);
        sim.teleport(p, q);
        assert_eq!(sim.position(), p);
        assert_eq!(sim.orientation(), q);
        assert_eq!(sim.attitude().roll, 0.0);
        assert!(sim.transform().w_axis.truncate().abs_diff_eq(p, 1e-6));
    }

    #[test]
    fn test_teleport_eases_attitude_over_slope() {
        // Rises ahead (map y) and to the left (map x): code = 2 * y + x
        let mut data = Vec::new();
        for y in 0..SIZE {
            for x in 0..SIZE {
                data.extend_from_slice(&[(y * 2 + x) as u8, 0, 0, 255]);
            }
        }
        let height = Arc::new(PixelField::from_rgba(SIZE, SIZE, data).unwrap());
        let mut sim = sim_with(collision_map(|_, _| 255), height);

        sim.teleport(Vec3::ZERO, Quat::IDENTITY);
        let a = sim.attitude();
        assert!(a.pitch_target < 0.0);
        assert!(a.pitch < 0.0 && a.pitch > a.pitch_target, "pitch eases, doesn't jump");
        assert!(a.bank_target > 0.0);
        assert!(a.bank > 0.0 && a.bank < a.bank_target);
        assert_eq!(a.roll, 0.0);

        let first = a.pitch;
        for _ in 0..10 {
            sim.teleport(Vec3::ZERO, Quat::IDENTITY);
        }
        assert!(sim.attitude().pitch < first);
        assert_eq!(sim.attitude().roll, 0.0);
        assert_eq!(sim.position(), Vec3::ZERO);
    }

    #[test]
    fn test_transform_composition_order() {
        let mut sim = open_sim();
        sim.teleport(Vec3::new(1.0, 2.0, 3.0), Quat::from_rotation_y(0.5));
        sim.attitude = Attitude {
            pitch: 0.3,
            bank: 0.2,
            roll: 0.1,
            ..Default::default()
        };
        sim.compose_transform();
        let expected = Mat4::from_rotation_translation(Quat::from_rotation_y(0.5), Vec3::new(1.0, 2.0, 3.0))
            * Mat4::from_rotation_x(0.3)
            * Mat4::from_rotation_z(0.2)
            * Mat4::from_rotation_z(0.1);
        assert!(sim.transform().abs_diff_eq(expected, 1e-6));
    }

    #[test]
    fn test_reset_orientation_from_rotation_vector() {
        let mut sim = open_sim();
        sim.speed = 4.0;
        sim.boost = 1.0;
        sim.shield = 0.2;
        sim.reset(Vec3::new(1.0, 0.0, 1.0), Vec3::new(0.0, (0.4f32).tan(), 0.0));
        assert_eq!(sim.speed(), 0.0);
        assert_eq!(sim.boost(), 0.0);
        assert_eq!(sim.shield(), sim.tuning().max_shield);
        assert_eq!(sim.state(), CraftState::Inactive);
        assert!(sim.orientation().abs_diff_eq(Quat::from_rotation_y(0.8), 1e-5));
    }

    #[test]
    fn test_speed_accessors() {
        let mut sim = open_sim();
        sim.speed = 6.6;
        sim.boost = 3.5;
        assert_eq!(sim.real_speed(), 10.0);
        assert_eq!(sim.real_speed_scaled(10.0), 101.0);
        assert_eq!(sim.real_speed_ratio(), 1.0);
        assert!(sim.speed_ratio() > 1.0);
        sim.shield = 0.456;
        assert_eq!(sim.shield_scaled(100.0), 46.0);
    }

    #[test]
    fn test_ring_spawn_settles_without_damage() {
        let ring = RingTrack {
            size: 128,
            inner_radius: 30.0,
            outer_radius: 50.0,
            pixel_ratio: 1.0,
            ..Default::default()
        };
        let track = ring.build();
        let mut sim = VehicleSimulation::new(ShipTuning::casual(), TrackMaps::from_track(&track));
        sim.reset(track.layout.spawn, track.layout.spawn_rotation);
        for _ in 0..30 {
            sim.update(1.0, &ShipInput::default());
        }
        assert!(!sim.collision().any());
        assert_eq!(sim.shield(), sim.tuning().max_shield);
    }

    proptest! {
        #[test]
        fn prop_speed_always_within_bounds(
            steps in prop::collection::vec((0.0f32..20.0, any::<u8>(), any::<bool>()), 1..60)
        ) {
            let ring = RingTrack {
                size: 96,
                inner_radius: 20.0,
                outer_radius: 40.0,
                pixel_ratio: 1.0,
                ..Default::default()
            };
            let track = ring.build();
            let mut sim = VehicleSimulation::new(ShipTuning::casual(), TrackMaps::from_track(&track));
            sim.reset(track.layout.spawn, track.layout.spawn_rotation);
            sim.set_active(true);
            let max = sim.tuning().max_speed;
            for (dt, bits, touch) in steps {
                let input = ShipInput {
                    forward: bits & 1 != 0,
                    left: bits & 2 != 0,
                    right: bits & 4 != 0,
                    left_brake: bits & 8 != 0,
                    right_brake: bits & 16 != 0,
                    touch: touch.then_some(((bits as f32) / 127.5) - 1.0),
                    ..Default::default()
                };
                sim.update(dt, &input);
                prop_assert!(sim.speed() >= 0.0 && sim.speed() <= max);
                prop_assert!(sim.shield() >= 0.0);
            }
        }
    }
}
