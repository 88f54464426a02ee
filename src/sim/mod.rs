//! Craft simulation
//!
//! Everything that moves the craft lives here and stays free of rendering,
//! audio and device code:
//! - `input`: control intentions for one tick
//! - `ship`: the vehicle itself
//! - `collision`/`terrain`: pure map-driven responses
//! - `event`: what presentation code reacts to

pub mod collision;
pub mod event;
pub mod input;
pub mod ship;
pub mod terrain;

pub use collision::{WallResponse, is_off_track, repulsion_amount, resolve_wall_hit, shield_damage, speed_penalty};
pub use event::{CollisionFlags, SimEvent, WallSide};
pub use input::{ShipInput, Steering, SteeringSource};
pub use ship::{Attitude, CraftState, TrackMaps, VehicleSimulation};
pub use terrain::{decode_height, height_at, slope_angle, vertical_correction};
