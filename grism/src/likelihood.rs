//! Chi-squared scoring of model images against observed data.

use ndarray::{Array2, ArrayView2, Zip};

use crate::error::{GrismError, Result};

/// Check that every noise pixel is finite and strictly positive.
///
/// Observations are screened with this when they are added, so scoring
/// never divides by zero or propagates NaN from the noise map.
pub fn validate_noise(noise: ArrayView2<f64>) -> Result<()> {
    match noise
        .indexed_iter()
        .find(|(_, v)| !(v.is_finite() && **v > 0.0))
    {
        Some(((y, x), &value)) => Err(GrismError::InvalidNoise { y, x, value }),
        None => Ok(()),
    }
}

fn check_same_shape(model: &ArrayView2<f64>, data: &ArrayView2<f64>, noise: &ArrayView2<f64>) -> Result<()> {
    if data.dim() != noise.dim() {
        return Err(GrismError::dim2("noise", data.dim(), noise.dim()));
    }
    if model.dim() != data.dim() {
        return Err(GrismError::dim2("model image", data.dim(), model.dim()));
    }
    Ok(())
}

/// `Σ ((model - data) / noise)²` over all pixels.
///
/// # Errors
/// [`GrismError::Dimension`] when the three images differ in shape.
pub fn chi2(model: ArrayView2<f64>, data: ArrayView2<f64>, noise: ArrayView2<f64>) -> Result<f64> {
    check_same_shape(&model, &data, &noise)?;
    let mut total = 0.0;
    Zip::from(&model)
        .and(&data)
        .and(&noise)
        .for_each(|&m, &d, &n| total += ((m - d) / n).powi(2));
    Ok(total)
}

/// Per-pixel normalized residual `(model - data) / noise`.
pub fn residual_image(
    model: ArrayView2<f64>,
    data: ArrayView2<f64>,
    noise: ArrayView2<f64>,
) -> Result<Array2<f64>> {
    check_same_shape(&model, &data, &noise)?;
    Ok(Zip::from(&model)
        .and(&data)
        .and(&noise)
        .map_collect(|&m, &d, &n| (m - d) / n))
}
