//! Walkability derived from a color-coded reference image.
//!
//! Level geometry lives in art rather than code: every pixel of the reference
//! image painted with the marker color is ground an entity may stand on.

use std::path::{Path, PathBuf};

use image::ImageReader;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerColor {
    pub rgb: [u8; 3],
    pub tolerance: u8,
}

impl MarkerColor {
    pub const WALKABLE: Self = Self {
        rgb: [24, 112, 185],
        tolerance: 20,
    };

    pub fn matches(&self, rgba: [u8; 4]) -> bool {
        if rgba[3] == 0 {
            return false;
        }
        self.rgb
            .iter()
            .zip(rgba.iter())
            .all(|(target, actual)| target.abs_diff(*actual) <= self.tolerance)
    }
}

impl Default for MarkerColor {
    fn default() -> Self {
        Self::WALKABLE
    }
}

#[derive(Debug, Error)]
pub enum CollisionLoadError {
    #[error("failed to open collision image {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode collision image {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("collision pixel buffer has {actual} bytes, expected {expected} for {width}x{height}")]
    BufferSize {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
}

/// Immutable per-pixel walkability grid, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollisionMask {
    width: u32,
    height: u32,
    walkable: Vec<bool>,
}

impl CollisionMask {
    pub fn from_rgba(
        width: u32,
        height: u32,
        rgba: &[u8],
        marker: MarkerColor,
    ) -> Result<Self, CollisionLoadError> {
        let expected = width as usize * height as usize * 4;
        if rgba.len() != expected {
            return Err(CollisionLoadError::BufferSize {
                width,
                height,
                expected,
                actual: rgba.len(),
            });
        }

        let walkable = rgba
            .chunks_exact(4)
            .map(|px| marker.matches([px[0], px[1], px[2], px[3]]))
            .collect();
        Ok(Self {
            width,
            height,
            walkable,
        })
    }

    pub fn load(path: &Path, marker: MarkerColor) -> Result<Self, CollisionLoadError> {
        let reader = ImageReader::open(path).map_err(|source| CollisionLoadError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let decoded = reader.decode().map_err(|source| CollisionLoadError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
        let image = decoded.to_rgba8();
        Self::from_rgba(image.width(), image.height(), image.as_raw(), marker)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn walkable_pixel_count(&self) -> usize {
        self.walkable.iter().filter(|walkable| **walkable).count()
    }

    /// Out-of-range and non-finite coordinates are never walkable.
    pub fn is_walkable(&self, x: f32, y: f32) -> bool {
        if !x.is_finite() || !y.is_finite() || x < 0.0 || y < 0.0 {
            return false;
        }
        let (px, py) = (x.floor() as u64, y.floor() as u64);
        if px >= self.width as u64 || py >= self.height as u64 {
            return false;
        }
        let index = py as usize * self.width as usize + px as usize;
        self.walkable.get(index).copied().unwrap_or(false)
    }

    /// All four corners of the box must be walkable. The far corners sample
    /// the last pixel the box overlaps, so a box at a fractional position
    /// that reaches into a wall column is rejected.
    pub fn is_entity_walkable(&self, x: f32, y: f32, width: f32, height: f32) -> bool {
        let right = ((x + width).ceil() - 1.0).max(x);
        let bottom = ((y + height).ceil() - 1.0).max(y);
        self.is_walkable(x, y)
            && self.is_walkable(right, y)
            && self.is_walkable(x, bottom)
            && self.is_walkable(right, bottom)
    }
}

/// Collision state owned by a game session. A map that failed to load
/// answers "nothing walkable" instead of letting entities move freely.
#[derive(Debug, Clone)]
pub enum CollisionMap {
    Loaded(CollisionMask),
    Unloaded { reason: String },
}

impl CollisionMap {
    pub fn build(path: &Path, marker: MarkerColor) -> Self {
        match CollisionMask::load(path, marker) {
            Ok(mask) => {
                info!(
                    path = %path.display(),
                    width = mask.width(),
                    height = mask.height(),
                    walkable_pixels = mask.walkable_pixel_count(),
                    "collision_mask_loaded"
                );
                Self::Loaded(mask)
            }
            Err(error) => {
                warn!(path = %path.display(), error = %error, "collision_mask_load_failed");
                Self::Unloaded {
                    reason: error.to_string(),
                }
            }
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }

    pub fn load_error(&self) -> Option<&str> {
        match self {
            Self::Loaded(_) => None,
            Self::Unloaded { reason } => Some(reason.as_str()),
        }
    }

    pub fn dimensions(&self) -> Option<(u32, u32)> {
        match self {
            Self::Loaded(mask) => Some((mask.width(), mask.height())),
            Self::Unloaded { .. } => None,
        }
    }

    pub fn is_walkable(&self, x: f32, y: f32) -> bool {
        match self {
            Self::Loaded(mask) => mask.is_walkable(x, y),
            Self::Unloaded { .. } => false,
        }
    }

    pub fn is_entity_walkable(&self, x: f32, y: f32, width: f32, height: f32) -> bool {
        match self {
            Self::Loaded(mask) => mask.is_entity_walkable(x, y, width, height),
            Self::Unloaded { .. } => false,
        }
    }
}
