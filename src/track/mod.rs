//! Track encodings
//!
//! A track is a layout plus three rasters:
//! - collision map: red < 255 is wall, pure red is a boost pad
//! - height map: packed 3-channel elevation
//! - checkpoint map: yellow-keyed lap markers (often the collision image itself)

pub mod layout;
pub mod pixel_field;
pub mod procedural;

use std::path::Path;
use std::sync::Arc;

pub use layout::{Checkpoints, TrackLayout, project, project_rounded, rotation_vector_to_quat};
pub use pixel_field::{Pixel, PixelF, PixelField, TrackError, is_no_terrain};
pub use procedural::RingTrack;

/// Layout plus shared, read-only maps
#[derive(Debug, Clone)]
pub struct Track {
    pub layout: TrackLayout,
    pub collision: Arc<PixelField>,
    pub height: Arc<PixelField>,
    pub checkpoints: Arc<PixelField>,
}

impl Track {
    /// Load a track whose checkpoints are painted on the collision map.
    ///
    /// Missing or undecodable images are logged and leave that map unloaded;
    /// the simulation then skips whatever depends on it.
    pub fn load(layout: TrackLayout, collision: impl AsRef<Path>, height: impl AsRef<Path>) -> Self {
        let collision = Arc::new(PixelField::load(collision));
        let height = Arc::new(PixelField::load(height));
        Self {
            layout,
            checkpoints: Arc::clone(&collision),
            collision,
            height,
        }
    }

    /// True when every map decoded
    pub fn is_loaded(&self) -> bool {
        self.collision.is_loaded() && self.height.is_loaded() && self.checkpoints.is_loaded()
    }
}
