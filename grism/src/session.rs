//! Caller-facing session tying the store, engine and log context together.
//!
//! A [`GrismSession`] is what a binding layer or driver program holds: it
//! owns one [`ObservationStore`] and one [`DispersionEngine`] and exposes the
//! operations a likelihood loop needs. Nothing here is process-global;
//! independent sessions can coexist in one process.

use log::info;
use ndarray::{ArrayView2, ArrayView3, ArrayViewMut2};

use crate::config::DisperseConfig;
use crate::context::RankInfo;
use crate::disperse::{DispersionEngine, EngineConfig};
use crate::error::Result;
use crate::response::ObservationGeometry;
use crate::store::{check_frames, ObservationStore};

#[derive(Debug)]
pub struct GrismSession {
    store: ObservationStore,
    engine: DispersionEngine,
    context: RankInfo,
}

impl GrismSession {
    /// Empty session whose engine uses `engine_config`.
    pub fn new(engine_config: EngineConfig) -> Result<Self> {
        Ok(Self {
            store: ObservationStore::new(),
            engine: DispersionEngine::new(engine_config)?,
            context: RankInfo::default(),
        })
    }

    /// Empty session sized from `GRISM_NUM_THREADS`/`OMP_NUM_THREADS`.
    pub fn from_env() -> Result<Self> {
        Self::new(EngineConfig::from_env())
    }

    /// Set the `[rank/size]` labels used in log output. No computational effect.
    pub fn set_rank_info(&mut self, size: i32, rank: i32) {
        self.context = RankInfo::new(size, rank);
        self.store.set_context(self.context);
    }

    pub fn rank_info(&self) -> RankInfo {
        self.context
    }

    /// Build the response table for a dispersed observation and store it.
    ///
    /// Returns the index of the new observation.
    pub fn add_grism_observation(
        &mut self,
        config: DisperseConfig,
        lambdas: ArrayView2<f64>,
        bandpasses: ArrayView2<f64>,
        data: ArrayView2<f64>,
        noise: ArrayView2<f64>,
    ) -> Result<usize> {
        // Frames are cheap to check; the table is not.
        check_frames(&config, data, noise)?;
        let geometry = ObservationGeometry::dispersed(config, lambdas, bandpasses, self.context)?;
        self.store.add_geometry(geometry, data, noise)
    }

    /// Store a direct-imaging observation (no dispersion).
    pub fn add_image_observation(
        &mut self,
        config: DisperseConfig,
        data: ArrayView2<f64>,
        noise: ArrayView2<f64>,
    ) -> Result<usize> {
        self.store.add_direct_image(config, data, noise)
    }

    /// Disperse `theory_cube` through observation `index` into `out`.
    pub fn get_dispersed_image(
        &self,
        index: usize,
        theory_cube: ArrayView3<f64>,
        out: ArrayViewMut2<f64>,
    ) -> Result<()> {
        let observation = self.store.get(index)?;
        self.engine
            .disperse_into(observation.table(), theory_cube, out)
    }

    /// Chi-squared of `model_image` against observation `index`.
    pub fn get_chi2(&self, index: usize, model_image: ArrayView2<f64>) -> Result<f64> {
        self.store.chi2(index, model_image)
    }

    /// Drop every stored observation.
    pub fn clear_observation(&mut self) {
        self.store.clear();
        info!("{} All existing observations cleared", self.context);
    }

    pub fn get_nobs(&self) -> usize {
        self.store.count()
    }

    pub fn store(&self) -> &ObservationStore {
        &self.store
    }

    pub fn engine(&self) -> &DispersionEngine {
        &self.engine
    }
}
