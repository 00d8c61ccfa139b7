//! Centered sky-coordinate grids for cubes and frames.
//!
//! Pixel `i` of an axis with `n` pixels sits at `(i - R) * scale` arcsec,
//! where `R = floor(n/2) - 0.5 * ((n - 1) mod 2)`. For odd `n` the middle
//! pixel lands on 0; for even `n` the two middle pixels straddle 0. Both the
//! theory cube and the observed frame use this convention, so their grids
//! share an origin regardless of size or pixel scale.

use ndarray::Array1;

/// Index of the (possibly half-integer) grid center.
pub fn grid_center(n: usize) -> f64 {
    (n / 2) as f64 - 0.5 * ((n + 1) % 2) as f64
}

/// Pixel-center positions in arcsec along one axis.
pub fn centered_grid(n: usize, scale: f64) -> Array1<f64> {
    let center = grid_center(n);
    Array1::from_shape_fn(n, |i| (i as f64 - center) * scale)
}

/// Position in arcsec of the lower edge of the first pixel.
pub fn lower_edge(n: usize, scale: f64) -> f64 {
    (0.0 - grid_center(n)) * scale - 0.5 * scale
}
