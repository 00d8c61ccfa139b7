//! Image and cube dimensions
//!
//! Detector frames are addressed `[y, x]` and theory cubes `[lambda, y, x]`,
//! matching ndarray's row-major layout. The `dim()` helpers return shapes in
//! that order so they can be compared directly against `Array::dim()`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Detector frame dimensions
///
/// Uses usize for direct compatibility with ndarray indexing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelShape {
    /// Image width in pixels (x extent)
    pub width: usize,
    /// Image height in pixels (y extent)
    pub height: usize,
}

impl PixelShape {
    /// Create a new PixelShape
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    /// Build from an ndarray `(rows, cols)` shape
    pub fn from_dim(dim: (usize, usize)) -> Self {
        Self {
            width: dim.1,
            height: dim.0,
        }
    }

    /// Shape in ndarray order `(height, width)`
    pub fn dim(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    /// Get total number of pixels
    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    /// True when either axis is zero
    pub fn is_empty(&self) -> bool {
        self.pixel_count() == 0
    }

    /// Check if a pixel is within bounds
    pub fn contains(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height
    }

    /// Row-major offset of pixel `(x, y)` in a flattened frame
    pub fn flat_index(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }
}

impl fmt::Display for PixelShape {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Theory cube dimensions: wavelength slices of a spatial grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CubeShape {
    /// Number of wavelength slices
    pub nlam: usize,
    /// Spatial height in cube pixels
    pub height: usize,
    /// Spatial width in cube pixels
    pub width: usize,
}

impl CubeShape {
    pub fn new(nlam: usize, height: usize, width: usize) -> Self {
        Self {
            nlam,
            height,
            width,
        }
    }

    /// Shape in ndarray order `(nlam, height, width)`
    pub fn dim(&self) -> (usize, usize, usize) {
        (self.nlam, self.height, self.width)
    }

    /// Spatial footprint of a single slice
    pub fn slice_shape(&self) -> PixelShape {
        PixelShape::new(self.width, self.height)
    }

    pub fn voxel_count(&self) -> usize {
        self.nlam * self.height * self.width
    }

    pub fn is_empty(&self) -> bool {
        self.voxel_count() == 0
    }

    /// Check if a voxel is within bounds
    pub fn contains(&self, lambda: usize, y: usize, x: usize) -> bool {
        lambda < self.nlam && y < self.height && x < self.width
    }
}

impl fmt::Display for CubeShape {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}x{}x{}", self.nlam, self.height, self.width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_shape_dim_is_row_major() {
        let shape = PixelShape::new(640, 480);
        assert_eq!(shape.dim(), (480, 640));
        assert_eq!(PixelShape::from_dim((480, 640)), shape);
    }

    #[test]
    fn test_pixel_count_and_empty() {
        assert_eq!(PixelShape::new(4, 3).pixel_count(), 12);
        assert!(PixelShape::new(0, 3).is_empty());
        assert!(!PixelShape::new(1, 1).is_empty());
    }

    #[test]
    fn test_contains_and_flat_index() {
        let shape = PixelShape::new(5, 2);
        assert!(shape.contains(4, 1));
        assert!(!shape.contains(5, 0));
        assert!(!shape.contains(0, 2));
        assert_eq!(shape.flat_index(3, 1), 8);
    }

    #[test]
    fn test_cube_shape() {
        let cube = CubeShape::new(10, 32, 48);
        assert_eq!(cube.dim(), (10, 32, 48));
        assert_eq!(cube.voxel_count(), 10 * 32 * 48);
        assert_eq!(cube.slice_shape(), PixelShape::new(48, 32));
        assert!(cube.contains(9, 31, 47));
        assert!(!cube.contains(10, 0, 0));
        assert!(CubeShape::new(0, 4, 4).is_empty());
    }

    #[test]
    fn test_display() {
        assert_eq!(PixelShape::new(1920, 1080).to_string(), "1920x1080");
        assert_eq!(CubeShape::new(3, 2, 1).to_string(), "3x2x1");
    }

    #[test]
    fn test_serde_roundtrip() {
        let shape = CubeShape::new(2, 3, 4);
        let json = serde_json::to_string(&shape).unwrap();
        let back: CubeShape = serde_json::from_str(&json).unwrap();
        assert_eq!(back, shape);
    }
}
