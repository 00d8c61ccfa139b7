//! Error type shared by every grism operation.

use thiserror::Error;

/// Errors produced while building, storing, dispersing or scoring observations.
///
/// Every variant is raised before any state is mutated, so a failed call
/// leaves the store and caller buffers exactly as they were.
#[derive(Error, Debug)]
pub enum GrismError {
    /// A buffer or table shape disagrees with the declared configuration.
    #[error("{what} has shape {actual:?}, expected {expected:?}")]
    Dimension {
        /// Which input was malformed.
        what: &'static str,
        /// Shape implied by the configuration.
        expected: Vec<usize>,
        /// Shape actually supplied.
        actual: Vec<usize>,
    },

    /// Observation index outside `[0, count)`.
    #[error("observation index {index} out of range ({count} stored)")]
    IndexOutOfRange { index: usize, count: usize },

    /// Noise map holds a value that would make chi-squared undefined.
    #[error("noise pixel (y={y}, x={x}) is {value}; noise must be finite and positive")]
    InvalidNoise { y: usize, x: usize, value: f64 },

    /// Configuration value outside its physical range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Dispersed observation requested without `R_spec`/`disp_ang`/`offset`.
    #[error("configuration has no grism parameters (R_spec, disp_ang, offset)")]
    MissingGrismParams,

    #[error("unable to perform file operation: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("image encoding error: {0}")]
    Image(#[from] image::ImageError),

    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl GrismError {
    /// Shorthand for a 2-D shape mismatch.
    pub(crate) fn dim2(what: &'static str, expected: (usize, usize), actual: (usize, usize)) -> Self {
        GrismError::Dimension {
            what,
            expected: vec![expected.0, expected.1],
            actual: vec![actual.0, actual.1],
        }
    }

    /// Shorthand for a 3-D shape mismatch.
    pub(crate) fn dim3(
        what: &'static str,
        expected: (usize, usize, usize),
        actual: (usize, usize, usize),
    ) -> Self {
        GrismError::Dimension {
            what,
            expected: vec![expected.0, expected.1, expected.2],
            actual: vec![actual.0, actual.1, actual.2],
        }
    }
}

pub type Result<T> = std::result::Result<T, GrismError>;
