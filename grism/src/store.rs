//! Registry of observations scored against candidate models.
//!
//! The store is an ordered, append-only list: observations are added one at
//! a time and removed only all together by [`ObservationStore::clear`].
//! Indices handed out by `add*` stay valid until the next clear.
//!
//! Mutation takes `&mut self`, so the borrow checker enforces a single
//! writer; any number of readers may share a store that is not changing.

use log::info;
use ndarray::{Array2, ArrayView2};

use crate::config::DisperseConfig;
use crate::context::RankInfo;
use crate::error::{GrismError, Result};
use crate::likelihood::{chi2, validate_noise};
use crate::response::{ObservationGeometry, ResponseTable};

/// One observed frame with its geometry, data and noise.
#[derive(Debug, Clone)]
pub struct Observation {
    geometry: ObservationGeometry,
    data: Array2<f64>,
    noise: Array2<f64>,
}

impl Observation {
    /// Check data/noise against the geometry and take copies of them.
    fn new(
        geometry: ObservationGeometry,
        data: ArrayView2<f64>,
        noise: ArrayView2<f64>,
    ) -> Result<Self> {
        check_frames(geometry.config(), data, noise)?;

        Ok(Self {
            geometry,
            data: data.to_owned(),
            noise: noise.to_owned(),
        })
    }

    pub fn config(&self) -> &DisperseConfig {
        self.geometry.config()
    }

    /// Response table; empty for direct imaging.
    pub fn table(&self) -> &ResponseTable {
        self.geometry.table()
    }

    pub fn geometry(&self) -> &ObservationGeometry {
        &self.geometry
    }

    pub fn data(&self) -> ArrayView2<'_, f64> {
        self.data.view()
    }

    pub fn noise(&self) -> ArrayView2<'_, f64> {
        self.noise.view()
    }

    pub fn is_dispersed(&self) -> bool {
        self.config().is_dispersed()
    }

    /// Chi-squared of `model` against this observation.
    pub fn chi2(&self, model: ArrayView2<f64>) -> Result<f64> {
        chi2(model, self.data.view(), self.noise.view())
    }
}

/// Check that `data` and `noise` are `(Ny, Nx)` frames of `config` and the
/// noise is usable for scoring.
pub fn check_frames(
    config: &DisperseConfig,
    data: ArrayView2<f64>,
    noise: ArrayView2<f64>,
) -> Result<()> {
    let expected = config.image_shape.dim();
    if data.dim() != expected {
        return Err(GrismError::dim2("data", expected, data.dim()));
    }
    if noise.dim() != expected {
        return Err(GrismError::dim2("noise", expected, noise.dim()));
    }
    validate_noise(noise)
}

/// Ordered, append-only collection of [`Observation`]s.
#[derive(Debug, Clone, Default)]
pub struct ObservationStore {
    observations: Vec<Observation>,
    context: RankInfo,
}

impl ObservationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store whose log lines carry the given rank labels.
    pub fn with_context(context: RankInfo) -> Self {
        Self {
            observations: Vec::new(),
            context,
        }
    }

    pub fn set_context(&mut self, context: RankInfo) {
        self.context = context;
    }

    /// Append an observation whose table was built for `config`.
    ///
    /// Returns the new observation's index. On any error the store is
    /// unchanged.
    ///
    /// # Errors
    /// * [`GrismError::Dimension`] - `data`/`noise` are not `(Ny, Nx)`, or the
    ///   table was built for other extents
    /// * [`GrismError::InvalidNoise`] - a noise pixel is zero, negative or non-finite
    /// * [`GrismError::InvalidConfig`] - `config` fails validation
    pub fn add(
        &mut self,
        config: DisperseConfig,
        table: ResponseTable,
        data: ArrayView2<f64>,
        noise: ArrayView2<f64>,
    ) -> Result<usize> {
        let geometry = ObservationGeometry::from_parts(config, table)?;
        self.push(Observation::new(geometry, data, noise)?)
    }

    /// Append a direct-imaging observation (empty response table).
    pub fn add_direct_image(
        &mut self,
        config: DisperseConfig,
        data: ArrayView2<f64>,
        noise: ArrayView2<f64>,
    ) -> Result<usize> {
        let geometry = ObservationGeometry::imaging(config)?;
        self.push(Observation::new(geometry, data, noise)?)
    }

    /// Append an observation with an already paired geometry.
    pub fn add_geometry(
        &mut self,
        geometry: ObservationGeometry,
        data: ArrayView2<f64>,
        noise: ArrayView2<f64>,
    ) -> Result<usize> {
        self.push(Observation::new(geometry, data, noise)?)
    }

    fn push(&mut self, observation: Observation) -> Result<usize> {
        self.observations.push(observation);
        info!(
            "{} {} observations in this list",
            self.context,
            self.observations.len()
        );
        Ok(self.observations.len() - 1)
    }

    /// Remove every observation. Clearing an empty store is a no-op.
    pub fn clear(&mut self) {
        if !self.observations.is_empty() {
            info!(
                "{} Clearing {} observations",
                self.context,
                self.observations.len()
            );
        }
        self.observations.clear();
    }

    /// Observation at `index`.
    ///
    /// # Errors
    /// [`GrismError::IndexOutOfRange`] unless `index < count()`.
    pub fn get(&self, index: usize) -> Result<&Observation> {
        self.observations
            .get(index)
            .ok_or(GrismError::IndexOutOfRange {
                index,
                count: self.observations.len(),
            })
    }

    pub fn count(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Observation> {
        self.observations.iter()
    }

    /// Chi-squared of `model` against observation `index`.
    pub fn chi2(&self, index: usize, model: ArrayView2<f64>) -> Result<f64> {
        self.get(index)?.chi2(model)
    }

    /// Sum of chi-squared over all observations, one model image each.
    ///
    /// `models` must hold exactly `count()` images in store order; any other
    /// length is a [`GrismError::Dimension`] on `"model image list"`.
    pub fn total_chi2<'a, I>(&self, models: I) -> Result<f64>
    where
        I: IntoIterator<Item = ArrayView2<'a, f64>>,
    {
        let models: Vec<ArrayView2<'a, f64>> = models.into_iter().collect();
        if models.len() != self.count() {
            return Err(GrismError::Dimension {
                what: "model image list",
                expected: vec![self.count()],
                actual: vec![models.len()],
            });
        }
        self.observations
            .iter()
            .zip(models)
            .map(|(observation, model)| observation.chi2(model))
            .sum()
    }
}

impl<'a> IntoIterator for &'a ObservationStore {
    type Item = &'a Observation;
    type IntoIter = std::slice::Iter<'a, Observation>;

    fn into_iter(self) -> Self::IntoIter {
        self.observations.iter()
    }
}
