//! Aggregation of rendering-benchmark parameter sweeps.
//!
//! A sweep varies one parameter (a coherence threshold, a coverage
//! threshold, a ray-march interpolation step) across repeated runs of a
//! cloud renderer and leaves behind per-run FPS counter files and rendered
//! frames, their sweep metadata encoded in the filename. This crate decodes
//! those names into typed records, buckets the measurements by the
//! controlling parameter, resolves each sweep group's baseline run, and
//! reduces every bucket to count, mean and sample standard deviation, plus
//! a baseline-relative difference where the sweep defines one. Charts and
//! summary CSVs are produced from the finished aggregates.

#![deny(missing_docs)]

extern crate average;
extern crate csv;
#[macro_use]
extern crate error_chain;
extern crate image;
extern crate itertools;
#[macro_use]
extern crate log;
extern crate plotters;
extern crate rayon;
extern crate serde;
#[macro_use]
extern crate serde_derive;
extern crate toml;

pub mod errors;

mod decode;
pub use decode::{Convention, Decoded};

mod quant;
pub use quant::Quantizer;

mod baseline;
pub use baseline::{BaselinePolicy, BaselineResolver};

mod store;
pub use store::{Bucket, BucketState, SampleStore};

mod engine;
pub use engine::{Aggregate, AggregationEngine, Identity, Normalize, Scorer, SeriesDiff};

pub mod source;

mod ssim;
pub use ssim::SsimScorer;
pub use ssim::load as load_image;
pub use ssim::score as ssim_score;

mod report;
pub use report::{emit, render_curve, write_summary};

mod setting;
pub use setting::Setting;

/// One decoded measurement: the controlling parameter, the identity of the
/// run it came from, the measurement payload, and the artifact name for
/// error attribution. Immutable once decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample<V> {
    /// Raw controlling parameter value.
    pub param: f64,

    /// Identity shared with the other samples of the same run (seed, scene
    /// or position).
    pub group: String,

    /// Measurement payload: a scalar, a per-frame series, or an image
    /// handle.
    pub value: V,

    /// Artifact name the sample was decoded from.
    pub source: String,
}

/// Everything that distinguishes one sweep variant: naming convention,
/// quantization, baseline designation, normalization, the optional
/// secondary-index filter, and chart labels.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Short name, used for artifact files and logs.
    pub name: &'static str,

    /// Filename convention of the sweep's artifacts.
    pub convention: Convention,

    /// Parameter-to-bucket mapping.
    pub quantizer: Quantizer,

    /// Baseline designation within each sweep group.
    pub baseline: BaselinePolicy,

    /// Bucket reduction policy.
    pub normalize: Normalize,

    /// Only artifacts whose secondary index matches take part.
    pub filter: Option<f64>,

    /// Chart title.
    pub title: &'static str,

    /// X-axis label.
    pub xlabel: &'static str,

    /// Y-axis label.
    pub ylabel: &'static str,
}

impl SweepConfig {
    /// Coherence FPS sweep: thresholds 0.0 to 0.60 at step 0.05, absolute
    /// frame rates, no baseline.
    pub fn coherence_fps() -> SweepConfig {
        SweepConfig {
            name: "coherence-fps",
            convention: Convention::CoherenceFps,
            quantizer: Quantizer::Linear { step: 0.05, origin: 0.0, offset: 0, count: 13 },
            baseline: BaselinePolicy::None,
            normalize: Normalize::SampleMean,
            filter: None,
            title: "FPS based on coherence",
            xlabel: "Coherence",
            ylabel: "FPS",
        }
    }

    /// Coherence SSIM sweep: same threshold grid; each position's
    /// threshold-0.0 render (bucket 0) is the group's baseline. Arrival
    /// order is free, dependents are buffered until the baseline is seen.
    pub fn coherence_ssim() -> SweepConfig {
        SweepConfig {
            name: "coherence-ssim",
            convention: Convention::CoherenceSsim,
            quantizer: Quantizer::Linear { step: 0.05, origin: 0.0, offset: 0, count: 13 },
            baseline: BaselinePolicy::Sentinel(0.0),
            normalize: Normalize::SampleMean,
            filter: None,
            title: "SSIM based on coherence",
            xlabel: "Coherence",
            ylabel: "SSIM value",
        }
    }

    /// Coverage FPS sweep: thresholds 0.1 to 0.5 at step 0.1; bucket ids
    /// subtract one so 0.1 lands in bucket 0. No baseline.
    pub fn coverage_fps() -> SweepConfig {
        SweepConfig {
            name: "coverage-fps",
            convention: Convention::CoverageFps,
            quantizer: Quantizer::Linear { step: 0.1, origin: 0.0, offset: 1, count: 5 },
            baseline: BaselinePolicy::None,
            normalize: Normalize::SampleMean,
            filter: None,
            title: "FPS based on coverage",
            xlabel: "Coverage threshold",
            ylabel: "FPS",
        }
    }

    /// Coverage SSIM sweep over ray-march steps 2/4/8. Only renders of the
    /// given coverage threshold take part; each group's `interp == 0.0`
    /// render arrives first (sorted traversal) and is the baseline.
    pub fn coverage_ssim(default_coverage: f64) -> SweepConfig {
        SweepConfig {
            name: "coverage-ssim",
            convention: Convention::CoverageSsim,
            quantizer: Quantizer::Levels(vec![2.0, 4.0, 8.0]),
            baseline: BaselinePolicy::SentinelFirst(0.0),
            normalize: Normalize::SampleMean,
            filter: Some(default_coverage),
            title: "SSIM based on ray-march step",
            xlabel: "nth ray marched",
            ylabel: "SSIM value",
        }
    }

    /// Per-seed FPS sweep over interpolation steps 2/4/8; each seed's
    /// `interp == 0.0` run opens its group as the baseline, so the reported
    /// value is the frame-rate difference against it.
    pub fn seed_fps() -> SweepConfig {
        SweepConfig {
            name: "seed-fps",
            convention: Convention::SeedFps,
            quantizer: Quantizer::Levels(vec![2.0, 4.0, 8.0]),
            baseline: BaselinePolicy::SentinelFirst(0.0),
            normalize: Normalize::SampleMean,
            filter: None,
            title: "FPS difference based on interpolation",
            xlabel: "nth interpolated",
            ylabel: "FPS difference",
        }
    }

    /// Per-seed SSIM sweep, restricted to one camera position.
    pub fn seed_ssim(target_pos: f64) -> SweepConfig {
        SweepConfig {
            name: "seed-ssim",
            convention: Convention::SeedSsim,
            quantizer: Quantizer::Levels(vec![2.0, 4.0, 8.0]),
            baseline: BaselinePolicy::SentinelFirst(0.0),
            normalize: Normalize::SampleMean,
            filter: Some(target_pos),
            title: "SSIM based on interpolation",
            xlabel: "nth interpolated",
            ylabel: "SSIM value",
        }
    }

    /// Engine comparison: per-run FPS logs diffed frame-by-frame against
    /// the threshold-0.0 run of the same volume/camera pair.
    pub fn engine_cmp() -> SweepConfig {
        SweepConfig {
            name: "engine-fps",
            convention: Convention::EngineRun,
            quantizer: Quantizer::Levels(vec![2.0, 4.0, 8.0]),
            baseline: BaselinePolicy::SentinelFirst(0.0),
            normalize: Normalize::SampleMean,
            filter: None,
            title: "Engine FPS based on pixel coherence threshold",
            xlabel: "Thresholds",
            ylabel: "FPS difference",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_bucket_counts() {
        assert_eq!(SweepConfig::coherence_fps().quantizer.count(), 13);
        assert_eq!(SweepConfig::coherence_ssim().quantizer.count(), 13);
        assert_eq!(SweepConfig::coverage_fps().quantizer.count(), 5);
        assert_eq!(SweepConfig::coverage_ssim(0.1).quantizer.count(), 3);
        assert_eq!(SweepConfig::seed_fps().quantizer.count(), 3);
        assert_eq!(SweepConfig::seed_ssim(1.0).quantizer.count(), 3);
        assert_eq!(SweepConfig::engine_cmp().quantizer.count(), 3);
    }

    #[test]
    fn coverage_fps_matches_its_naming() {
        // 0.1_3_4.txt and 0.2_3_4.txt land in buckets 0 and 1.
        let config = SweepConfig::coverage_fps();
        for (name, expect) in &[("0.1_3_4.txt", 0), ("0.2_3_4.txt", 1)] {
            let d = config.convention.decode(name).unwrap();
            assert_eq!(config.quantizer.bucket(d.param, name).unwrap(), *expect);
        }
    }

    #[test]
    fn filtered_sweeps_carry_their_filter() {
        assert_eq!(SweepConfig::coverage_ssim(0.3).filter, Some(0.3));
        assert_eq!(SweepConfig::seed_ssim(2.0).filter, Some(2.0));
        assert_eq!(SweepConfig::coherence_ssim().filter, None);
    }
}
