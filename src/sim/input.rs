//! Control intentions consumed by the craft
//!
//! Device adapters live outside the core and only fill in these flags. Analog
//! sources are normalized to [-1, 1] with positive meaning "steer right"
//! (touch: stick x / 100 px, orientation: tilt / 45 degrees, gamepad: stick x).

/// Which device drives steering this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SteeringSource {
    Touch,
    Orientation,
    Gamepad,
    Keyboard,
}

/// Control intentions for a single tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShipInput {
    pub forward: bool,
    pub left: bool,
    pub right: bool,
    /// Left air brake
    pub left_brake: bool,
    /// Right air brake
    pub right_brake: bool,
    pub touch: Option<f32>,
    pub orientation: Option<f32>,
    pub gamepad: Option<f32>,
}

/// Steering derived from the active source
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Steering {
    /// Yaw change requested this tick
    pub angular: f32,
    /// Target roll angle
    pub roll: f32,
}

impl ShipInput {
    /// Only one source steers at a time: touch > orientation > gamepad > keyboard
    pub fn steering_source(&self) -> SteeringSource {
        if self.touch.is_some() {
            SteeringSource::Touch
        } else if self.orientation.is_some() {
            SteeringSource::Orientation
        } else if self.gamepad.is_some() {
            SteeringSource::Gamepad
        } else {
            SteeringSource::Keyboard
        }
    }

    /// Yaw amount and roll target for this tick
    pub fn steering(&self, angular_speed: f32, roll_angle: f32, dt: f32) -> Steering {
        let analog = match self.steering_source() {
            SteeringSource::Touch => self.touch,
            SteeringSource::Orientation => self.orientation,
            SteeringSource::Gamepad => self.gamepad,
            SteeringSource::Keyboard => None,
        };

        match analog {
            Some(x) => {
                let x = if x.is_finite() { x.clamp(-1.0, 1.0) } else { 0.0 };
                Steering {
                    angular: -x * angular_speed * dt,
                    roll: x * roll_angle,
                }
            }
            None => {
                let mut s = Steering::default();
                if self.left {
                    s.angular += angular_speed * dt;
                    s.roll -= roll_angle;
                }
                if self.right {
                    s.angular -= angular_speed * dt;
                    s.roll += roll_angle;
                }
                s
            }
        }
    }
}
