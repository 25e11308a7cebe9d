//! Aggregates a per-seed interpolation sweep: FPS counters under
//! `<input>/fps` (reported relative to each seed's non-interpolated run)
//! and rendered frames under `<input>/img`, filtered to one camera
//! position (`--pos`).

extern crate env_logger;
#[macro_use]
extern crate log;
extern crate structopt;
extern crate sweepeval;

use std::fs;
use std::path::{Path, PathBuf};
use structopt::StructOpt;
use sweepeval::errors::*;
use sweepeval::{emit, source, AggregationEngine, Identity, Setting, SsimScorer, SweepConfig};

#[derive(StructOpt, Debug)]
#[structopt(name = "seeds")]
#[structopt(about = "Aggregate a per-seed interpolation sweep.")]
struct Opt {
    /// Sweep directory holding `fps/` and `img/` subdirectories.
    input_dir: String,

    /// Output directory for charts and summaries (defaults to the setting).
    #[structopt(short = "o", long = "out")]
    out_dir: Option<String>,

    /// Optional TOML settings file.
    #[structopt(short = "c", long = "config")]
    config: Option<String>,

    /// Camera position compared in the SSIM pass (defaults to the setting).
    #[structopt(long = "pos")]
    pos: Option<f64>,

    /// Skip the FPS pass.
    #[structopt(long = "no-fps")]
    no_fps: bool,

    /// Skip the SSIM pass.
    #[structopt(long = "no-ssim")]
    no_ssim: bool,
}

fn main() {
    env_logger::init();
    let opt = Opt::from_args();
    if let Err(ref e) = run(&opt) {
        error!("{}", e);
        for cause in e.iter().skip(1) {
            error!("caused by: {}", cause);
        }
        ::std::process::exit(1);
    }
}

fn run(opt: &Opt) -> Result<()> {
    let setting = match opt.config {
        Some(ref path) => Setting::init(path)?,
        None => Setting::default(),
    };
    let out_dir = PathBuf::from(opt.out_dir.clone().unwrap_or(setting.out_dir));
    fs::create_dir_all(&out_dir)?;
    let input = Path::new(&opt.input_dir);
    let pos = opt.pos.unwrap_or(setting.target_pos);

    if !opt.no_fps {
        let config = SweepConfig::seed_fps();
        let samples = source::fps_samples(&input.join("fps"), &config)?;
        info!("{}: {} samples", config.name, samples.len());
        let mut engine = AggregationEngine::new(&config, Identity);
        engine.insert_all(samples)?;
        let aggregates = engine.finalize()?;
        emit(&out_dir, config.name, &config, &aggregates)?;
    }

    if !opt.no_ssim {
        let config = SweepConfig::seed_ssim(pos);
        let samples = source::image_samples(&input.join("img"), &config)?;
        info!("{}: {} frames at pos {}", config.name, samples.len(), pos);
        let mut engine = AggregationEngine::new(&config, SsimScorer);
        engine.insert_all(samples)?;
        let aggregates = engine.finalize()?;
        let stem = format!("{}-pos-{}", config.name, pos);
        emit(&out_dir, &stem, &config, &aggregates)?;
    }

    Ok(())
}
