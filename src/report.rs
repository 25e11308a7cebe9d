//! Chart and summary artifacts for finished sweeps.
//!
//! Rendering is a pure side effect: it consumes finished aggregates and
//! never influences aggregation state.

use SweepConfig;
use csv;
use engine::Aggregate;
use errors::*;
use itertools::Itertools;
use itertools::MinMaxResult;
use plotters::prelude::*;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Renders the sweep's mean curve with stddev error bars to an SVG file.
pub fn render_curve(
    path: &Path,
    title: &str,
    xlabel: &str,
    ylabel: &str,
    aggregates: &[Aggregate],
) -> Result<()> {
    if aggregates.is_empty() {
        bail!("nothing to chart: no buckets were populated");
    }
    draw(path, title, xlabel, ylabel, aggregates)
        .map_err(|e| Error::from(format!("failed to render '{}': {}", path.display(), e)))
}

fn draw(
    path: &Path,
    title: &str,
    xlabel: &str,
    ylabel: &str,
    aggregates: &[Aggregate],
) -> ::std::result::Result<(), Box<dyn (::std::error::Error)>> {
    let (x_min, x_max) = match aggregates.iter().map(|a| a.param).minmax() {
        MinMaxResult::NoElements => (0.0, 1.0),
        MinMaxResult::OneElement(x) => (x - 0.5, x + 0.5),
        MinMaxResult::MinMax(lo, hi) => (lo, hi),
    };
    let y_lo = aggregates
        .iter()
        .map(|a| a.mean - a.stddev.unwrap_or(0.0))
        .fold(::std::f64::INFINITY, f64::min);
    let y_hi = aggregates
        .iter()
        .map(|a| a.mean + a.stddev.unwrap_or(0.0))
        .fold(::std::f64::NEG_INFINITY, f64::max);

    let x_pad = ((x_max - x_min) * 0.05).max(0.01);
    let y_pad = ((y_hi - y_lo) * 0.1).max(0.01);

    let root = SVGBackend::new(path, (900, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 28))
        .margin(12)
        .x_label_area_size(42)
        .y_label_area_size(56)
        .build_cartesian_2d(x_min - x_pad..x_max + x_pad, y_lo - y_pad..y_hi + y_pad)?;

    chart.configure_mesh().x_desc(xlabel).y_desc(ylabel).draw()?;

    chart.draw_series(aggregates.iter().filter(|a| a.stddev.is_some()).map(|a| {
        let dev = a.stddev.unwrap_or(0.0);
        ErrorBar::new_vertical(a.param, a.mean - dev, a.mean, a.mean + dev, BLUE.filled(), 6)
    }))?;
    chart.draw_series(LineSeries::new(
        aggregates.iter().map(|a| (a.param, a.mean)),
        &BLUE,
    ))?;

    root.present()?;
    Ok(())
}

/// Writes the `(bucket, param, count, mean, stddev)` summary CSV. A bucket
/// with insufficient data leaves its stddev field empty.
pub fn write_summary<W: Write>(writer: W, aggregates: &[Aggregate]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.serialize(("bucket", "param", "count", "mean", "stddev"))?;
    for a in aggregates {
        writer.serialize((a.bucket, a.param, a.count, a.mean, a.stddev))?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes the sweep's summary CSV and chart into `out_dir`, named after
/// `stem`, and prints the aggregate table.
pub fn emit(
    out_dir: &Path,
    stem: &str,
    config: &SweepConfig,
    aggregates: &[Aggregate],
) -> Result<()> {
    let summary = out_dir.join(format!("{}.csv", stem));
    write_summary(File::create(&summary)?, aggregates)?;

    let chart = out_dir.join(format!("{}.svg", stem));
    render_curve(&chart, config.title, config.xlabel, config.ylabel, aggregates)?;

    for a in aggregates {
        let stddev = match a.stddev {
            Some(s) => format!("{:.4}", s),
            None => "insufficient".to_string(),
        };
        println!(
            "{} bucket {:2} param {:6.3} count {:3} mean {:10.4} stddev {}",
            stem, a.bucket, a.param, a.count, a.mean, stddev
        );
    }
    info!("wrote {} and {}", summary.display(), chart.display());
    Ok(())
}
