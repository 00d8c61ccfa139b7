//! Slitless (grism) spectroscopy forward model
//!
//! This crate maps a spectral theory cube onto a detector frame through a
//! grism's linear dispersion law, and scores the result against observed
//! frames with a chi-squared likelihood. A sparse per-observation response
//! table is built once from the geometry; dispersing a candidate cube is then
//! a parallel scatter-add over that table.

pub mod config;
pub mod context;
pub mod disperse;
pub mod error;
pub mod grid;
pub mod io;
pub mod likelihood;
pub mod response;
pub mod session;
pub mod store;

// Re-exports for easier access
pub use config::{DisperseConfig, GrismParams};
pub use context::RankInfo;
pub use disperse::{DispersionEngine, EngineConfig};
pub use error::{GrismError, Result};
pub use io::ObservationSpec;
pub use likelihood::{chi2, residual_image};
pub use response::{ObservationGeometry, PixelResponseBuilder, ResponseEntry, ResponseTable};
pub use session::GrismSession;
pub use store::{Observation, ObservationStore};
