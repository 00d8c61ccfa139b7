//! Dispersed image synthesis.
//!
//! Applies a [`ResponseTable`] to a theory cube:
//! `image[y, x] += cube[lambda, cy, cx] * weight` for every entry. The entries
//! are split across a fixed worker pool, each worker accumulating into its
//! own frame buffer, and the buffers are reduced once all workers finish.
//! Results with different thread counts agree to floating-point rounding.

use log::debug;
use ndarray::{Array2, ArrayView3, ArrayViewMut2};
use rayon::ThreadPool;
use shared::algo::{build_thread_pool, scatter_reduce_into, threads_from_env};

use crate::error::{GrismError, Result};
use crate::response::{ResponseEntry, ResponseTable};

/// Environment variables consulted by [`EngineConfig::from_env`], in order.
pub const THREAD_ENV_VARS: [&str; 2] = ["GRISM_NUM_THREADS", "OMP_NUM_THREADS"];

/// Worker pool sizing for the [`DispersionEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Number of scatter workers; 0 is treated as 1
    pub num_threads: usize,
}

impl EngineConfig {
    pub fn new(num_threads: usize) -> Self {
        Self { num_threads }
    }

    /// Thread count from `GRISM_NUM_THREADS`, then `OMP_NUM_THREADS`, else 1.
    pub fn from_env() -> Self {
        Self::new(threads_from_env(&THREAD_ENV_VARS))
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new(1)
    }
}

/// Scatter-add engine with a dedicated, fixed-size worker pool.
///
/// The pool is built once at construction; dispersing never touches any
/// process-wide thread settings.
#[derive(Debug)]
pub struct DispersionEngine {
    pool: ThreadPool,
}

impl DispersionEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        let pool = build_thread_pool(config.num_threads)?;
        debug!("Dispersion engine using {} threads", pool.current_num_threads());
        Ok(Self { pool })
    }

    pub fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Disperse `cube` through `table` into the caller's frame.
    ///
    /// `out` is zeroed before accumulation and fully written on success.
    ///
    /// # Errors
    /// [`GrismError::Dimension`] if `cube` is not `(nlam, ny, nx)` of the
    /// table's theory cube or `out` is not the table's `(Ny, Nx)` frame. `out`
    /// is untouched in that case.
    pub fn disperse_into(
        &self,
        table: &ResponseTable,
        cube: ArrayView3<f64>,
        mut out: ArrayViewMut2<f64>,
    ) -> Result<()> {
        let cube_dim = table.cube_shape().dim();
        if cube.dim() != cube_dim {
            return Err(GrismError::dim3("theory cube", cube_dim, cube.dim()));
        }
        let image = table.image_shape();
        if out.dim() != image.dim() {
            return Err(GrismError::dim2("dispersed image", image.dim(), out.dim()));
        }

        let width = image.width;
        let mut frame = vec![0.0; image.pixel_count()];
        scatter_reduce_into(
            &self.pool,
            table.entries(),
            &mut frame,
            |local: &mut [f64], e: &ResponseEntry| {
                local[e.image_y * width + e.image_x] +=
                    cube[[e.cube_lambda, e.cube_y, e.cube_x]] * e.weight;
            },
        );

        // Logical (row-major) iteration, valid for strided views too.
        out.iter_mut().zip(frame).for_each(|(o, v)| *o = v);
        Ok(())
    }

    /// Disperse `cube` through `table` into a newly allocated frame.
    pub fn disperse(&self, table: &ResponseTable, cube: ArrayView3<f64>) -> Result<Array2<f64>> {
        let mut out = Array2::zeros(table.image_shape().dim());
        self.disperse_into(table, cube, out.view_mut())?;
        Ok(out)
    }
}
