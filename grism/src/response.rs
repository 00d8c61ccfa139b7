//! Pixel response tables for slitless (grism) observations.
//!
//! A response table is a coordinate list of weighted edges from theory-cube
//! voxels to detector pixels. It is computed once per observation geometry
//! and then reused for every candidate cube, so dispersing a model is a
//! single sparse scatter-add (see [`crate::disperse`]).
//!
//! # Construction
//!
//! For every wavelength slice the whole cube slice is shifted along the
//! dispersion direction. Each detector pixel's footprint, with that shift
//! removed, is expressed in cube-pixel units relative to the cube's lower-left
//! corner and clamped to the cube. The cube cells it overlaps contribute with
//! box-filter weights: full interior cells count 1, partially covered edge
//! cells count their covered fraction.
//!
//! Footprints that clamp to zero width on either axis receive nothing from
//! that slice. Flux dispersed off the cube is dropped silently; this is the
//! defined behavior at the trace ends, not an error.

use log::{debug, warn};
use ndarray::{Array1, ArrayView2};
use shared::image_size::{CubeShape, PixelShape};

use crate::config::{DisperseConfig, GrismParams};
use crate::context::RankInfo;
use crate::error::{GrismError, Result};
use crate::grid::{centered_grid, lower_edge};

/// One weighted voxel → pixel contribution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResponseEntry {
    /// Destination column in the observed frame
    pub image_x: usize,
    /// Destination row in the observed frame
    pub image_y: usize,
    /// Source wavelength slice
    pub cube_lambda: usize,
    /// Source row in the theory cube
    pub cube_y: usize,
    /// Source column in the theory cube
    pub cube_x: usize,
    /// Non-negative weight, flux scale and bandpass included
    pub weight: f64,
}

/// Ordered list of [`ResponseEntry`] for one observation geometry.
///
/// Entries are stored slice-major, then by destination row, destination
/// column, source row and source column. The order carries no meaning for
/// the scatter-add but makes rebuilds reproducible.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseTable {
    cube_shape: CubeShape,
    image_shape: PixelShape,
    entries: Vec<ResponseEntry>,
}

impl ResponseTable {
    /// Table with no contributions, used for direct imaging.
    pub fn empty(cube_shape: CubeShape, image_shape: PixelShape) -> Self {
        Self {
            cube_shape,
            image_shape,
            entries: Vec::new(),
        }
    }

    pub fn cube_shape(&self) -> CubeShape {
        self.cube_shape
    }

    pub fn image_shape(&self) -> PixelShape {
        self.image_shape
    }

    pub fn entries(&self) -> &[ResponseEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ResponseEntry> {
        self.entries.iter()
    }

    /// Sum of all weights; equals the dispersed flux of an all-ones cube.
    pub fn total_weight(&self) -> f64 {
        self.entries.iter().map(|e| e.weight).sum()
    }

    /// True when the table was built for the given cube and frame extents.
    pub fn matches(&self, cube_shape: CubeShape, image_shape: PixelShape) -> bool {
        self.cube_shape == cube_shape && self.image_shape == image_shape
    }
}

impl<'a> IntoIterator for &'a ResponseTable {
    type Item = &'a ResponseEntry;
    type IntoIter = std::slice::Iter<'a, ResponseEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Cube cells covered by one footprint along a single axis.
#[derive(Debug, Clone, PartialEq)]
struct AxisCoverage {
    /// First covered cell
    start: usize,
    /// Box-filter weight of each covered cell, starting at `start`
    weights: Vec<f64>,
}

/// Overlap of the clamped interval `[lo, hi]` (cube-pixel units) with unit cells.
///
/// Returns `None` when the interval collapsed onto a cell boundary during
/// clamping, i.e. the footprint lies entirely outside the cube on this axis.
fn axis_coverage(lo: f64, hi: f64) -> Option<AxisCoverage> {
    let first = lo.floor();
    let end = hi.ceil();
    if first == end {
        return None;
    }

    let n = (end - first) as usize;
    let mut weights = vec![1.0; n];
    if n > 1 {
        weights[0] = 1.0 + first - lo;
        weights[n - 1] = 1.0 + hi - end;
    } else {
        weights[0] = hi - lo;
    }

    Some(AxisCoverage {
        start: first as usize,
        weights,
    })
}

/// Footprints of every detector pixel along one axis for one slice.
///
/// * `target` - detector pixel centers in arcsec
/// * `shift_px` - dispersion shift along this axis in detector pixels
fn axis_footprints(
    target: &Array1<f64>,
    pix_scale: f64,
    shift_px: f64,
    cube_edge: f64,
    model_scale: f64,
    model_n: usize,
) -> Vec<Option<AxisCoverage>> {
    let limit = model_n as f64;
    let to_cube = |center: f64, side: f64| -> f64 {
        let arcsec = center + (side * 0.5 - shift_px) * pix_scale - cube_edge;
        (arcsec / model_scale).max(0.0).min(limit)
    };

    target
        .iter()
        .map(|&center| axis_coverage(to_cube(center, -1.0), to_cube(center, 1.0)))
        .collect()
}

/// Validate a per-slice `(blue, red)` table against the cube depth.
fn check_pair_table(what: &'static str, table: &ArrayView2<f64>, nlam: usize) -> Result<()> {
    if table.dim() != (nlam, 2) {
        return Err(GrismError::dim2(what, (nlam, 2), table.dim()));
    }
    if let Some(bad) = table.iter().find(|v| !v.is_finite()) {
        return Err(GrismError::InvalidConfig(format!(
            "{what} contains non-finite value {bad}"
        )));
    }
    Ok(())
}

/// Computes the response table of a dispersed observation.
#[derive(Debug, Clone)]
pub struct PixelResponseBuilder<'a> {
    config: &'a DisperseConfig,
    grism: GrismParams,
    context: RankInfo,
}

impl<'a> PixelResponseBuilder<'a> {
    /// Prepare a builder for `config`, which must carry grism parameters.
    pub fn new(config: &'a DisperseConfig) -> Result<Self> {
        config.validate()?;
        let grism = *config.grism()?;
        Ok(Self {
            config,
            grism,
            context: RankInfo::default(),
        })
    }

    /// Attach rank labels used as a prefix in log output.
    pub fn with_context(mut self, context: RankInfo) -> Self {
        self.context = context;
        self
    }

    /// Build the table.
    ///
    /// # Arguments
    /// * `lambdas` - `(model_Nlam, 2)` blue/red wavelength limits (nm) per slice
    /// * `bandpasses` - `(model_Nlam, 2)` transmission at the blue/red limits
    ///
    /// # Errors
    /// [`GrismError::Dimension`] when either table does not have one row per
    /// cube slice; [`GrismError::InvalidConfig`] for non-finite entries or a
    /// negative mean bandpass. Nothing is built in either case.
    pub fn build(
        &self,
        lambdas: ArrayView2<f64>,
        bandpasses: ArrayView2<f64>,
    ) -> Result<ResponseTable> {
        let config = self.config;
        let cube = config.model_shape;
        let image = config.image_shape;

        check_pair_table("lambdas", &lambdas, cube.nlam)?;
        check_pair_table("bandpasses", &bandpasses, cube.nlam)?;
        let mean_bandpass: Vec<f64> = bandpasses
            .rows()
            .into_iter()
            .map(|row| (row[0] + row[1]) / 2.0)
            .collect();
        if let Some((slice, bp)) = mean_bandpass.iter().enumerate().find(|(_, bp)| **bp < 0.0) {
            return Err(GrismError::InvalidConfig(format!(
                "slice {slice} has negative mean bandpass {bp}"
            )));
        }

        let cube_x0 = lower_edge(cube.width, config.model_scale);
        let cube_y0 = lower_edge(cube.height, config.model_scale);
        let target_x = centered_grid(image.width, config.pix_scale);
        let target_y = centered_grid(image.height, config.pix_scale);
        let flux_scale = config.flux_scale();

        debug!(
            "{} Setting pixel response table: cube {} @ {}\"/px, image {} @ {}\"/px, flux scale {:.6e}",
            self.context, cube, config.model_scale, image, config.pix_scale, flux_scale
        );
        debug!(
            "{} Cube lower-left corner at ({:.4}, {:.4}) arcsec",
            self.context, cube_x0, cube_y0
        );

        let mut entries = Vec::new();
        for (slice, (wave, &mean_bp)) in lambdas.rows().into_iter().zip(&mean_bandpass).enumerate() {
            // Linear average; assumes the wavelength grid is fine.
            let mean_wave = (wave[0] + wave[1]) / 2.0;
            let (shift_x, shift_y) = self.grism.shift_px(mean_wave);

            let x_cover = axis_footprints(
                &target_x,
                config.pix_scale,
                shift_x,
                cube_x0,
                config.model_scale,
                cube.width,
            );
            let y_cover = axis_footprints(
                &target_y,
                config.pix_scale,
                shift_y,
                cube_y0,
                config.model_scale,
                cube.height,
            );

            let before = entries.len();
            for (j, ycov) in y_cover.iter().enumerate() {
                let Some(ycov) = ycov else { continue };
                for (k, xcov) in x_cover.iter().enumerate() {
                    let Some(xcov) = xcov else { continue };
                    for (p, &wy) in ycov.weights.iter().enumerate() {
                        for (q, &wx) in xcov.weights.iter().enumerate() {
                            entries.push(ResponseEntry {
                                image_x: k,
                                image_y: j,
                                cube_lambda: slice,
                                cube_y: ycov.start + p,
                                cube_x: xcov.start + q,
                                weight: wx * wy * mean_bp * flux_scale,
                            });
                        }
                    }
                }
            }

            debug!(
                "{} slice {slice}: mean wavelength {mean_wave:.3} nm, shift ({shift_x:.3}, {shift_y:.3}) px, {} entries",
                self.context,
                entries.len() - before
            );
        }

        if entries.is_empty() {
            warn!(
                "{} Pixel response table is empty: every slice disperses off the theory cube",
                self.context
            );
        }
        debug!("{} Pixel res. table size = {}", self.context, entries.len());

        Ok(ResponseTable {
            cube_shape: cube,
            image_shape: image,
            entries,
        })
    }
}

/// Configuration paired with the response table built from it.
///
/// Imaging geometries carry an empty table. The only way to change the
/// configuration is [`reconfigure`](Self::reconfigure), which rebuilds the
/// table in the same step.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationGeometry {
    config: DisperseConfig,
    table: ResponseTable,
}

impl ObservationGeometry {
    /// Geometry of a dispersed observation; builds its response table.
    pub fn dispersed(
        config: DisperseConfig,
        lambdas: ArrayView2<f64>,
        bandpasses: ArrayView2<f64>,
        context: RankInfo,
    ) -> Result<Self> {
        let table = PixelResponseBuilder::new(&config)?
            .with_context(context)
            .build(lambdas, bandpasses)?;
        Ok(Self { config, table })
    }

    /// Geometry of a direct image: no dispersion, empty table.
    ///
    /// Any grism parameters on `config` are dropped so the stored
    /// configuration reports what the table actually does.
    pub fn imaging(mut config: DisperseConfig) -> Result<Self> {
        config.validate()?;
        config.grism = None;
        let table = ResponseTable::empty(config.model_shape, config.image_shape);
        Ok(Self { config, table })
    }

    /// Pair a config with a prebuilt table after checking they agree.
    pub fn from_parts(config: DisperseConfig, table: ResponseTable) -> Result<Self> {
        config.validate()?;
        if table.cube_shape() != config.model_shape {
            let c = config.model_shape;
            return Err(GrismError::dim3(
                "response table cube",
                c.dim(),
                table.cube_shape().dim(),
            ));
        }
        if table.image_shape() != config.image_shape {
            return Err(GrismError::dim2(
                "response table image",
                config.image_shape.dim(),
                table.image_shape().dim(),
            ));
        }
        Ok(Self { config, table })
    }

    /// Replace the configuration and rebuild the table.
    ///
    /// On error the previous configuration and table are kept unchanged.
    pub fn reconfigure(
        &mut self,
        config: DisperseConfig,
        lambdas: ArrayView2<f64>,
        bandpasses: ArrayView2<f64>,
        context: RankInfo,
    ) -> Result<()> {
        *self = Self::dispersed(config, lambdas, bandpasses, context)?;
        Ok(())
    }

    pub fn config(&self) -> &DisperseConfig {
        &self.config
    }

    pub fn table(&self) -> &ResponseTable {
        &self.table
    }
}
