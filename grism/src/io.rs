//! File I/O for observation descriptions and image previews.
//!
//! Observation descriptions are JSON: the flat configuration keys plus the
//! per-slice wavelength and bandpass pairs. Previews are 8-bit grayscale PNGs
//! stretched between the image's minimum and maximum.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::config::DisperseConfig;
use crate::error::{GrismError, Result};

/// Everything needed to build a dispersed observation's response table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationSpec {
    pub config: DisperseConfig,
    /// `[lower, upper]` wavelength edges (nm) per theory slice
    pub lambdas: Vec<[f64; 2]>,
    /// `[lower, upper]` bandpass throughput per theory slice
    pub bandpasses: Vec<[f64; 2]>,
}

impl ObservationSpec {
    /// Wavelength edges as an `(nlam, 2)` array.
    pub fn lambdas_array(&self) -> Array2<f64> {
        pairs_to_array(&self.lambdas)
    }

    /// Bandpass values as an `(nlam, 2)` array.
    pub fn bandpasses_array(&self) -> Array2<f64> {
        pairs_to_array(&self.bandpasses)
    }

    /// Load from JSON, checking the config and the table lengths.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let spec: ObservationSpec = serde_json::from_reader(reader)?;
        spec.validate()?;
        Ok(spec)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        self.config.validate()?;
        let nlam = self.config.model_shape.nlam;
        for (what, table) in [("lambdas", &self.lambdas), ("bandpasses", &self.bandpasses)] {
            if table.len() != nlam {
                return Err(GrismError::Dimension {
                    what,
                    expected: vec![nlam, 2],
                    actual: vec![table.len(), 2],
                });
            }
        }
        Ok(())
    }
}

fn pairs_to_array(pairs: &[[f64; 2]]) -> Array2<f64> {
    Array2::from_shape_fn((pairs.len(), 2), |(i, j)| pairs[i][j])
}

/// Stretch a float image linearly onto 0-255.
///
/// Non-finite pixels map to 0. A flat image maps to all zeros.
pub fn f64_to_u8_auto_scale(image: ArrayView2<f64>) -> Array2<u8> {
    let (min, max) = image
        .iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });

    let range = max - min;
    if !range.is_finite() || range <= 0.0 {
        return Array2::zeros(image.dim());
    }

    image.mapv(|v| {
        if v.is_finite() {
            ((v - min) / range * 255.0).round() as u8
        } else {
            0
        }
    })
}

/// Save an 8-bit grayscale image as PNG (or any format `image` infers from the extension).
pub fn save_u8_image(image: ArrayView2<u8>, path: &Path) -> Result<()> {
    use image::{ImageBuffer, Luma};

    let (height, width) = image.dim();
    let mut img_buffer = ImageBuffer::new(width as u32, height as u32);
    for (x, y, pixel) in img_buffer.enumerate_pixels_mut() {
        *pixel = Luma([image[[y as usize, x as usize]]]);
    }
    img_buffer.save(path)?;
    Ok(())
}

/// Auto-scale a float image and save it as an 8-bit preview.
pub fn save_preview_png(image: ArrayView2<f64>, path: &Path) -> Result<()> {
    save_u8_image(f64_to_u8_auto_scale(image).view(), path)
}
