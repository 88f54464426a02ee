//! Raster sampling for track encodings
//!
//! A `PixelField` wraps a decoded RGBA image. Collision, height and checkpoint
//! maps are all read through it. Reads never fail: anything outside the image
//! (or from a field that never loaded) comes back as the transparent zero pixel.

use std::path::Path;

use thiserror::Error;

use crate::consts::{CHECKPOINT_ID_LIMIT, NO_TERRAIN_CODE};

/// Errors while populating a pixel field
#[derive(Error, Debug)]
pub enum TrackError {
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("pixel buffer has {actual} bytes, expected {expected} for {width}x{height}")]
    BufferSize {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
    #[error("pixel field is already populated")]
    AlreadyLoaded,
}

/// One RGBA pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pixel {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Pixel {
    /// Out-of-bounds sentinel
    pub const ZERO: Pixel = Pixel::new(0, 0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    /// Pure red marks a boost pad on the collision map
    pub fn is_boost_pad(&self) -> bool {
        self.r == 255 && self.g < 127 && self.b < 127
    }

    /// Yellow-keyed pixels carry a checkpoint id in the blue channel
    pub fn checkpoint_id(&self) -> Option<u8> {
        if self.r == 255 && self.g == 255 && self.b < CHECKPOINT_ID_LIMIT {
            Some(self.b)
        } else {
            None
        }
    }

    /// Packed 3-channel height code
    pub fn height_code(&self) -> f32 {
        PixelF::from(*self).height_code()
    }
}

/// Interpolated pixel with fractional channels
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PixelF {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl PixelF {
    /// Height is packed as `r + g*255 + b*255*255`
    pub fn height_code(&self) -> f32 {
        self.r + self.g * 255.0 + self.b * 255.0 * 255.0
    }

    fn blend(self, other: PixelF, t: f32) -> PixelF {
        PixelF {
            r: (1.0 - t) * self.r + t * other.r,
            g: (1.0 - t) * self.g + t * other.g,
            b: (1.0 - t) * self.b + t * other.b,
            a: (1.0 - t) * self.a + t * other.a,
        }
    }
}

impl From<Pixel> for PixelF {
    fn from(p: Pixel) -> Self {
        Self {
            r: p.r as f32,
            g: p.g as f32,
            b: p.b as f32,
            a: p.a as f32,
        }
    }
}

/// True when a height code means there is no terrain at that spot
#[inline]
pub fn is_no_terrain(code: f32) -> bool {
    code >= NO_TERRAIN_CODE
}

/// A decoded RGBA raster. Populated once, read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct PixelField {
    width: u32,
    height: u32,
    data: Vec<u8>,
    loaded: bool,
}

impl PixelField {
    /// An unloaded field; every sample returns the zero pixel
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a field from a raw RGBA8 buffer
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Result<Self, TrackError> {
        let mut field = Self::empty();
        field.populate(width, height, data)?;
        Ok(field)
    }

    /// Decode an image file. Errors are returned to the caller.
    pub fn try_load(path: impl AsRef<Path>) -> Result<Self, TrackError> {
        let img = image::open(path.as_ref())?;
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        Self::from_rgba(width, height, rgba.into_raw())
    }

    /// Decode an in-memory encoded image (PNG/JPEG)
    pub fn decode(bytes: &[u8]) -> Result<Self, TrackError> {
        let rgba = image::load_from_memory(bytes)?.to_rgba8();
        let (width, height) = rgba.dimensions();
        Self::from_rgba(width, height, rgba.into_raw())
    }

    /// Decode an image file, logging failures and returning an unloaded field
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::try_load(path) {
            Ok(field) => {
                log::info!(
                    "Loaded map {} ({}x{})",
                    path.display(),
                    field.width,
                    field.height
                );
                field
            }
            Err(e) => {
                log::warn!("Failed to load map {}: {}", path.display(), e);
                Self::empty()
            }
        }
    }

    /// Fill an empty field. A field can only be populated once.
    pub fn populate(&mut self, width: u32, height: u32, data: Vec<u8>) -> Result<(), TrackError> {
        if self.loaded {
            return Err(TrackError::AlreadyLoaded);
        }
        let expected = width as usize * height as usize * 4;
        if data.len() != expected {
            return Err(TrackError::BufferSize {
                width,
                height,
                expected,
                actual: data.len(),
            });
        }
        self.width = width;
        self.height = height;
        self.data = data;
        self.loaded = true;
        Ok(())
    }

    #[inline]
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Image center in pixel coordinates (world origin maps here)
    pub fn center(&self) -> (f32, f32) {
        (self.width as f32 / 2.0, self.height as f32 / 2.0)
    }

    /// Nearest-pixel lookup. Callers round fractional coordinates first.
    pub fn sample_point(&self, x: i64, y: i64) -> Pixel {
        if !self.loaded || x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return Pixel::ZERO;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        Pixel::new(self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3])
    }

    /// Bilinear sample with half-pixel-centered weights.
    ///
    /// `floor(fx)` picks the base pixel; the weight toward the neighbor is
    /// `|fx - floor(fx) - 0.5|`, and the neighbor lies on the side given by
    /// the sign of that offset. Sampling exactly at a pixel center returns
    /// that pixel unchanged.
    pub fn sample_bilinear(&self, fx: f32, fy: f32) -> PixelF {
        let x = fx.floor();
        let y = fy.floor();
        let rx = fx - x - 0.5;
        let ry = fy - y - 0.5;
        let ax = rx.abs();
        let ay = ry.abs();
        let dx: i64 = if rx < 0.0 { -1 } else { 1 };
        let dy: i64 = if ry < 0.0 { -1 } else { 1 };
        let (x, y) = (x as i64, y as i64);

        let c = PixelF::from(self.sample_point(x, y));
        let cx = PixelF::from(self.sample_point(x + dx, y));
        let cy = PixelF::from(self.sample_point(x, y + dy));
        let cxy = PixelF::from(self.sample_point(x + dx, y + dy));

        let top = c.blend(cx, ax);
        let bottom = cy.blend(cxy, ax);
        top.blend(bottom, ay)
    }

    /// Packed height code at a pixel
    pub fn sample_height_code(&self, x: i64, y: i64) -> f32 {
        self.sample_point(x, y).height_code()
    }

    /// Packed height code, bilinearly interpolated
    pub fn sample_height_code_bilinear(&self, fx: f32, fy: f32) -> f32 {
        self.sample_bilinear(fx, fy).height_code()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 3x3 field with distinct red values 0,10,..,80 in row-major order
    fn ramp_field() -> PixelField {
        let mut data = Vec::new();
        for i in 0..9u8 {
            data.extend_from_slice(&[i * 10, 0, 0, 255]);
        }
        PixelField::from_rgba(3, 3, data).unwrap()
    }

    #[test]
    fn test_out_of_bounds_is_zero() {
        let field = ramp_field();
        assert_eq!(field.sample_point(-1, 0), Pixel::ZERO);
        assert_eq!(field.sample_point(0, 3), Pixel::ZERO);
        assert_eq!(field.sample_point(3, 1), Pixel::ZERO);
        assert_eq!(field.sample_point(1, 1).r, 40);
    }

    #[test]
    fn test_unloaded_field_samples_zero() {
        let field = PixelField::empty();
        assert!(!field.is_loaded());
        assert_eq!(field.sample_point(0, 0), Pixel::ZERO);
        assert_eq!(field.sample_bilinear(0.5, 0.5), PixelF::default());
    }

    #[test]
    fn test_bilinear_at_center_matches_point() {
        let field = ramp_field();
        for y in 0..3 {
            for x in 0..3 {
                let p = field.sample_point(x, y);
                let f = field.sample_bilinear(x as f32 + 0.5, y as f32 + 0.5);
                assert_eq!(f, PixelF::from(p));
            }
        }
    }

    #[test]
    fn test_bilinear_converges_near_center() {
        let field = ramp_field();
        let exact = field.sample_point(1, 1).r as f32;
        for eps in [0.1, 0.01, 0.001] {
            let left = field.sample_bilinear(1.5 - eps, 1.5).r;
            let right = field.sample_bilinear(1.5 + eps, 1.5).r;
            assert!((left - exact).abs() <= 10.0 * eps + 1e-3);
            assert!((right - exact).abs() <= 10.0 * eps + 1e-3);
        }
    }

    #[test]
    fn test_bilinear_neighbor_follows_offset_sign() {
        let field = ramp_field();
        // Left of center (offset -0.25) blends with x=0 (r=30), right blends with x=2 (r=50)
        let left = field.sample_bilinear(1.25, 1.5).r;
        let right = field.sample_bilinear(1.75, 1.5).r;
        assert!((left - 37.5).abs() < 1e-4);
        assert!((right - 42.5).abs() < 1e-4);
    }

    #[test]
    fn test_bilinear_continuous_across_pixel_boundary() {
        let field = ramp_field();
        let before = field.sample_bilinear(2.0 - 1e-3, 1.5).r;
        let after = field.sample_bilinear(2.0 + 1e-3, 1.5).r;
        assert!((before - after).abs() < 0.05);
        // Halfway between the centers of x=1 (40) and x=2 (50)
        assert!((before - 45.0).abs() < 0.05);
    }

    #[test]
    fn test_height_code_packing() {
        let p = Pixel::rgb(3, 2, 1);
        assert_eq!(p.height_code(), 3.0 + 2.0 * 255.0 + 65025.0);
        assert!(!is_no_terrain(Pixel::rgb(255, 255, 255).height_code()));
        assert!(is_no_terrain(17_000_000.0));
        assert!(is_no_terrain(NO_TERRAIN_CODE));
    }

    #[test]
    fn test_pixel_classification() {
        assert!(Pixel::rgb(255, 0, 0).is_boost_pad());
        assert!(Pixel::rgb(255, 126, 126).is_boost_pad());
        assert!(!Pixel::rgb(255, 127, 0).is_boost_pad());
        assert!(!Pixel::rgb(254, 0, 0).is_boost_pad());

        assert_eq!(Pixel::rgb(255, 255, 2).checkpoint_id(), Some(2));
        assert_eq!(Pixel::rgb(255, 255, 249).checkpoint_id(), Some(249));
        assert_eq!(Pixel::rgb(255, 255, 250).checkpoint_id(), None);
        assert_eq!(Pixel::rgb(255, 254, 0).checkpoint_id(), None);
    }

    #[test]
    fn test_populate_once() {
        let mut field = PixelField::empty();
        field.populate(1, 1, vec![1, 2, 3, 4]).unwrap();
        assert!(field.is_loaded());
        assert!(matches!(
            field.populate(1, 1, vec![0; 4]),
            Err(TrackError::AlreadyLoaded)
        ));
        assert_eq!(field.sample_point(0, 0), Pixel::new(1, 2, 3, 4));
    }

    #[test]
    fn test_buffer_size_checked() {
        let err = PixelField::from_rgba(2, 2, vec![0; 15]).unwrap_err();
        assert!(matches!(err, TrackError::BufferSize { expected: 16, actual: 15, .. }));
    }

    #[test]
    fn test_load_missing_file_stays_unloaded() {
        let field = PixelField::load("/nonexistent/track.collision.png");
        assert!(!field.is_loaded());
    }
}
