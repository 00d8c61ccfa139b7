//! Common utilities for grism integration tests

#![allow(dead_code)]

use grism::{DisperseConfig, GrismParams};
use ndarray::{Array2, Array3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::image_size::{CubeShape, PixelShape};

/// Unit aperture-area geometry: one voxel, one pixel, diameter 2 so A = π.
pub fn unit_config(grism: Option<GrismParams>) -> DisperseConfig {
    let config = DisperseConfig::imaging(
        CubeShape::new(1, 1, 1),
        1.0,
        PixelShape::new(1, 1),
        1.0,
        2.0,
        1.0,
        1.0,
    );
    match grism {
        Some(params) => config.with_grism(params),
        None => config,
    }
}

/// Single-slice tables at the dispersion reference wavelength.
pub fn unit_tables() -> (Array2<f64>, Array2<f64>) {
    (
        Array2::from_elem((1, 2), 500.0),
        Array2::from_elem((1, 2), 1.0),
    )
}

/// Realistic multi-slice geometry with an oblique trace.
pub fn trace_config() -> DisperseConfig {
    DisperseConfig::imaging(
        CubeShape::new(12, 20, 24),
        0.05,
        PixelShape::new(64, 40),
        0.11,
        240.0,
        300.0,
        1.2,
    )
    .with_grism(GrismParams::new(120.0, 0.25, -150.0))
}

pub fn trace_tables(nlam: usize) -> (Array2<f64>, Array2<f64>) {
    let lambdas = Array2::from_shape_fn((nlam, 2), |(i, j)| 610.0 + 3.0 * (i + j) as f64);
    let bandpasses = Array2::from_shape_fn((nlam, 2), |(i, j)| 0.6 + 0.01 * (i + j) as f64);
    (lambdas, bandpasses)
}

/// Non-negative random cube with a fixed seed.
pub fn random_cube(shape: CubeShape, seed: u64) -> Array3<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    Array3::from_shape_fn(shape.dim(), |_| rng.gen_range(0.0..10.0))
}
