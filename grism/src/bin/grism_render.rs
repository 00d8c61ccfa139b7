//! Render a mock slitless observation and score it against its own truth
//!
//! Builds a response table from an observation description (or a built-in
//! demo geometry), disperses a synthetic emission-line source, adds Gaussian
//! noise, and reports the chi-squared of the noiseless model against the
//! noisy frame. For a correct pipeline that value is close to the pixel count.

use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use grism::grid::centered_grid;
use grism::io::save_preview_png;
use grism::{DisperseConfig, EngineConfig, GrismParams, GrismSession, ObservationSpec};
use log::info;
use ndarray::{Array2, Array3};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use shared::image_size::{CubeShape, PixelShape};

#[derive(Parser, Debug)]
#[command(author, version, about = "Disperse a synthetic source through a grism response")]
struct Args {
    /// Observation description (JSON); the built-in demo geometry is used when omitted
    #[arg(long)]
    observation: Option<PathBuf>,

    /// Worker threads for dispersion; falls back to GRISM_NUM_THREADS/OMP_NUM_THREADS
    #[arg(long)]
    threads: Option<usize>,

    /// Emission line center in nm
    #[arg(long, default_value_t = 656.3)]
    line_center: f64,

    /// Emission line Gaussian sigma in nm
    #[arg(long, default_value_t = 2.0)]
    line_sigma: f64,

    /// Peak line amplitude relative to the continuum
    #[arg(long, default_value_t = 20.0)]
    line_amplitude: f64,

    /// Continuum level per voxel
    #[arg(long, default_value_t = 1.0e-6)]
    continuum: f64,

    /// Source Gaussian sigma in arcsec
    #[arg(long, default_value_t = 0.3)]
    source_sigma: f64,

    /// Per-pixel noise sigma added to the dispersed frame
    #[arg(long, default_value_t = 1.0)]
    noise_sigma: f64,

    /// Random seed for the noise realization
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Write an 8-bit preview of the noisy frame to this PNG
    #[arg(long)]
    output: Option<PathBuf>,

    /// Write the description actually used to this JSON file
    #[arg(long)]
    save_observation: Option<PathBuf>,

    /// Rank label for log lines
    #[arg(long, default_value_t = -1)]
    rank: i32,

    /// World size label for log lines
    #[arg(long, default_value_t = -1)]
    size: i32,
}

fn demo_observation() -> ObservationSpec {
    let nlam = 40;
    let config = DisperseConfig::imaging(
        CubeShape::new(nlam, 32, 32),
        0.05,
        PixelShape::new(96, 48),
        0.1,
        240.0,
        600.0,
        1.0,
    )
    .with_grism(GrismParams::new(200.0, 0.0, -264.0));

    let lambdas = (0..nlam)
        .map(|i| {
            let lo = 620.0 + 2.0 * i as f64;
            [lo, lo + 2.0]
        })
        .collect();
    let bandpasses = vec![[0.8, 0.8]; nlam];

    ObservationSpec {
        config,
        lambdas,
        bandpasses,
    }
}

/// Gaussian blob times continuum-plus-line spectrum.
fn synthetic_cube(spec: &ObservationSpec, args: &Args) -> Array3<f64> {
    let shape = spec.config.model_shape;
    let xs = centered_grid(shape.width, spec.config.model_scale);
    let ys = centered_grid(shape.height, spec.config.model_scale);
    let two_sigma2 = 2.0 * args.source_sigma.powi(2);
    let line_two_sigma2 = 2.0 * args.line_sigma.powi(2);

    let spectrum: Vec<f64> = spec
        .lambdas
        .iter()
        .map(|[lo, hi]| {
            let lambda = 0.5 * (lo + hi);
            let line = (-(lambda - args.line_center).powi(2) / line_two_sigma2).exp();
            args.continuum * (1.0 + args.line_amplitude * line)
        })
        .collect();

    Array3::from_shape_fn(shape.dim(), |(l, y, x)| {
        let r2 = xs[x].powi(2) + ys[y].powi(2);
        spectrum[l] * (-r2 / two_sigma2).exp()
    })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let spec = match &args.observation {
        Some(path) => ObservationSpec::load_from_file(path)?,
        None => demo_observation(),
    };
    if let Some(path) = &args.save_observation {
        spec.save_to_file(path)?;
        info!("Wrote observation description to {}", path.display());
    }

    let engine_config = match args.threads {
        Some(n) => EngineConfig::new(n),
        None => EngineConfig::from_env(),
    };
    let mut session = GrismSession::new(engine_config)?;
    session.set_rank_info(args.size, args.rank);
    info!(
        "{} Dispersing {} cube onto {} frame with {} threads",
        session.rank_info(),
        spec.config.model_shape,
        spec.config.image_shape,
        session.engine().num_threads()
    );

    let image_dim = spec.config.image_shape.dim();
    let placeholder = Array2::from_elem(image_dim, args.noise_sigma);
    let noise_map = Array2::from_elem(image_dim, args.noise_sigma);

    // Register once with placeholder data to get the table, then read the model back.
    let start = Instant::now();
    let index = session.add_grism_observation(
        spec.config.clone(),
        spec.lambdas_array().view(),
        spec.bandpasses_array().view(),
        placeholder.view(),
        noise_map.view(),
    )?;
    info!(
        "Built response table with {} entries in {:.3?}",
        session.store().get(index)?.table().len(),
        start.elapsed()
    );

    let cube = synthetic_cube(&spec, &args);
    let mut model = Array2::zeros(image_dim);
    let start = Instant::now();
    session.get_dispersed_image(index, cube.view(), model.view_mut())?;
    info!("Dispersed in {:.3?}", start.elapsed());

    let mut rng = StdRng::seed_from_u64(args.seed);
    let normal = Normal::new(0.0, args.noise_sigma)?;
    let data = model.mapv(|v| v + normal.sample(&mut rng));

    session.clear_observation();
    let index = session.add_grism_observation(
        spec.config.clone(),
        spec.lambdas_array().view(),
        spec.bandpasses_array().view(),
        data.view(),
        noise_map.view(),
    )?;

    let chi2 = session.get_chi2(index, model.view())?;
    let pixels = spec.config.image_shape.pixel_count();
    info!(
        "Model flux {:.4e}, chi2 {:.2} over {} pixels (reduced {:.3})",
        model.sum(),
        chi2,
        pixels,
        chi2 / pixels as f64
    );

    if let Some(path) = &args.output {
        save_preview_png(data.view(), path)?;
        info!("Saved preview to {}", path.display());
    }

    Ok(())
}
