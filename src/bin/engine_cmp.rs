//! Compares engine FPS across pixel-coherence thresholds. The input
//! directory holds one subdirectory per run, named `{vol}_{cam}_{thresh}`,
//! each with a CSV log whose third column is the per-frame FPS; every run
//! is diffed frame-by-frame against the threshold-0.0 run of the same
//! volume/camera pair.

extern crate env_logger;
#[macro_use]
extern crate log;
extern crate structopt;
extern crate sweepeval;

use std::fs;
use std::path::{Path, PathBuf};
use structopt::StructOpt;
use sweepeval::errors::*;
use sweepeval::{emit, source, AggregationEngine, SeriesDiff, Setting, SweepConfig};

#[derive(StructOpt, Debug)]
#[structopt(name = "engine_cmp")]
#[structopt(about = "Compare engine FPS logs against their baseline runs.")]
struct Opt {
    /// Directory holding one `{vol}_{cam}_{thresh}` subdirectory per run.
    input_dir: String,

    /// Output directory for the chart and summary (defaults to the setting).
    #[structopt(short = "o", long = "out")]
    out_dir: Option<String>,

    /// Optional TOML settings file.
    #[structopt(short = "c", long = "config")]
    config: Option<String>,
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

    let config = SweepConfig::engine_cmp();
    let samples = source::run_samples(Path::new(&opt.input_dir), &config)?;
    info!("{}: {} runs", config.name, samples.len());

    let mut engine = AggregationEngine::new(&config, SeriesDiff);
    engine.insert_all(samples)?;
    let aggregates = engine.finalize()?;
    emit(&out_dir, config.name, &config, &aggregates)?;
    Ok(())
}
