//! The aggregation engine: resolve baselines, score, bucket, summarize.

use Sample;
use SweepConfig;
use baseline::BaselineResolver;
use errors::*;
use quant::Quantizer;
use rayon::prelude::*;
use store::SampleStore;

/// Turns a sample payload, optionally paired with its group's baseline,
/// into the scalar that lands in a bucket. The engine treats this as an
/// opaque function; image similarity lives behind it.
pub trait Scorer {
    /// Payload type carried by samples of this sweep.
    type Value;

    /// Scalar for a sweep without baselines.
    fn absolute(&self, value: &Self::Value) -> Result<f64>;

    /// Scalar for a sample measured against its group's baseline.
    fn against(&self, value: &Self::Value, baseline: &Self::Value) -> Result<f64>;
}

/// Scalar measurements aggregated as-is; baseline comparison is the plain
/// difference `value - baseline`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl Scorer for Identity {
    type Value = f64;

    fn absolute(&self, value: &f64) -> Result<f64> {
        Ok(*value)
    }

    fn against(&self, value: &f64, baseline: &f64) -> Result<f64> {
        Ok(*value - *baseline)
    }
}

/// Per-frame measurement series compared frame-by-frame against the
/// baseline run's series; the scalar is the difference averaged over the
/// zipped frames (the shorter series bounds the comparison).
#[derive(Debug, Clone, Copy, Default)]
pub struct SeriesDiff;

impl Scorer for SeriesDiff {
    type Value = Vec<f64>;

    fn absolute(&self, value: &Vec<f64>) -> Result<f64> {
        if value.is_empty() {
            bail!("empty measurement series");
        }
        Ok(value.iter().sum::<f64>() / value.len() as f64)
    }

    fn against(&self, value: &Vec<f64>, baseline: &Vec<f64>) -> Result<f64> {
        let n = value.len().min(baseline.len());
        if n == 0 {
            bail!("empty measurement series");
        }
        let diff: f64 = value.iter().zip(baseline.iter()).map(|(v, b)| v - b).sum();
        Ok(diff / n as f64)
    }
}

/// How a bucket's accumulated measurements collapse into the reported
/// value. The historical evaluation scripts disagreed here (dividing by a
/// hardcoded constant, by a counted number of seeds, or not at all), so the
/// policy is an explicit, named choice per sweep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Normalize {
    /// Mean over the bucket's samples.
    SampleMean,
    /// Sum divided by a fixed constant.
    FixedDivisor(f64),
    /// Raw sum, no normalization.
    Sum,
}

impl Normalize {
    fn apply(&self, sum: f64, count: usize) -> f64 {
        match *self {
            Normalize::SampleMean => {
                if count == 0 {
                    0.0
                } else {
                    sum / count as f64
                }
            }
            Normalize::FixedDivisor(d) => sum / d,
            Normalize::Sum => sum,
        }
    }
}

/// Per-bucket summary statistics, recomputed from bucket contents at
/// finalize time and never mutated directly.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    /// Bucket id.
    pub bucket: usize,

    /// Representative parameter value of the bucket.
    pub param: f64,

    /// Number of contributing measurements.
    pub count: usize,

    /// Normalized central value of the bucket.
    pub mean: f64,

    /// Bessel-corrected sample standard deviation; `None` flags
    /// insufficient data (fewer than two measurements).
    pub stddev: Option<f64>,
}

/// Folds decoded samples of one sweep into per-bucket statistics.
///
/// Buckets walk `Empty -> Accumulating -> Finalized`; inserting into a
/// finalized bucket is an error, forcing an explicit `reset` between
/// independent analysis passes instead of silent cross-run contamination.
pub struct AggregationEngine<S: Scorer> {
    scorer: S,
    quantizer: Quantizer,
    normalize: Normalize,
    resolver: BaselineResolver<S::Value>,
    store: SampleStore,
}

impl<S: Scorer> AggregationEngine<S>
where
    S::Value: Clone,
{
    /// Creates an engine for the given sweep configuration.
    pub fn new(config: &SweepConfig, scorer: S) -> Self {
        AggregationEngine {
            scorer: scorer,
            quantizer: config.quantizer.clone(),
            normalize: config.normalize,
            resolver: BaselineResolver::new(config.baseline),
            store: SampleStore::default(),
        }
    }

    /// Feeds one sample through baseline resolution, scoring and bucketing.
    pub fn insert(&mut self, sample: Sample<S::Value>) -> Result<()> {
        let ready = self.resolver.offer(sample)?;
        for (sample, baseline) in ready {
            self.score_one(sample, baseline)?;
        }
        Ok(())
    }

    fn score_one(&mut self, sample: Sample<S::Value>, baseline: Option<S::Value>) -> Result<()> {
        let value = match baseline {
            Some(ref base) => self.scorer.against(&sample.value, base)?,
            None => self.scorer.absolute(&sample.value)?,
        };
        let bucket = self.quantizer.bucket(sample.param, &sample.source)?;
        trace!("'{}' -> bucket {}, value {}", sample.source, bucket, value);
        self.store.insert(bucket, value)
    }

    /// Feeds a batch, scoring independent sample/baseline pairs in
    /// parallel. Bucket accumulation stays single-writer; stores built from
    /// other shards can be folded in with `merge_store`.
    pub fn insert_all(&mut self, samples: Vec<Sample<S::Value>>) -> Result<()>
    where
        S: Sync,
        S::Value: Send + Sync,
    {
        let mut ready = Vec::new();
        for sample in samples {
            ready.extend(self.resolver.offer(sample)?);
        }

        let scorer = &self.scorer;
        let quantizer = &self.quantizer;
        let scored = ready
            .into_par_iter()
            .map(|(sample, baseline)| -> Result<(usize, f64)> {
                let value = match baseline {
                    Some(ref base) => scorer.against(&sample.value, base)?,
                    None => scorer.absolute(&sample.value)?,
                };
                let bucket = quantizer.bucket(sample.param, &sample.source)?;
                Ok((bucket, value))
            })
            .collect::<Result<Vec<(usize, f64)>>>()?;

        for (bucket, value) in scored {
            self.store.insert(bucket, value)?;
        }
        Ok(())
    }

    /// Folds a sample store built from a disjoint shard into this engine.
    pub fn merge_store(&mut self, shard: SampleStore) -> Result<()> {
        self.store.merge(shard)
    }

    /// Computes the per-bucket aggregates, in bucket order, and marks every
    /// bucket finalized. Groups still waiting for a baseline fail the run;
    /// a bucket with fewer than two samples is flagged, not fatal.
    pub fn finalize(&mut self) -> Result<Vec<Aggregate>> {
        if let Some(group) = self.resolver.unresolved().first() {
            bail!(ErrorKind::MissingBaseline(group.to_string()));
        }

        let mut out = Vec::with_capacity(self.store.len());
        for (&bucket, contents) in self.store.iter() {
            let count = contents.count();
            let mean = self.normalize.apply(contents.sum(), count);
            let stddev = contents.stddev();
            if stddev.is_none() {
                warn!(
                    "bucket {} has {} sample(s); stddev flagged as insufficient data",
                    bucket,
                    count
                );
            }
            out.push(Aggregate {
                bucket: bucket,
                param: self.quantizer.param_of(bucket),
                count: count,
                mean: mean,
                stddev: stddev,
            });
        }
        self.store.finalize();
        Ok(out)
    }

    /// Drops all buckets and baseline state; the engine is ready for an
    /// independent pass.
    pub fn reset(&mut self) {
        self.store.reset();
        self.resolver.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Convention;

    fn scalar(param: f64, group: &str, value: f64) -> Sample<f64> {
        Sample {
            param: param,
            group: group.to_string(),
            value: value,
            source: format!("{}_{}", param, group),
        }
    }

    /// Stand-in for the opaque similarity function: scores every pair with
    /// a fixed value.
    struct ConstScorer(f64);

    impl Scorer for ConstScorer {
        type Value = f64;

        fn absolute(&self, _: &f64) -> Result<f64> {
            Ok(self.0)
        }

        fn against(&self, _: &f64, _: &f64) -> Result<f64> {
            Ok(self.0)
        }
    }

    #[test]
    fn absolute_sweep_means_and_stddev() {
        let config = SweepConfig::coherence_fps();
        let mut engine = AggregationEngine::new(&config, Identity);
        for v in &[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
            engine.insert(scalar(0.05, "3_4", *v)).unwrap();
        }
        let aggregates = engine.finalize().unwrap();
        assert_eq!(aggregates.len(), 1);
        let a = &aggregates[0];
        assert_eq!(a.bucket, 1);
        assert_eq!(a.count, 8);
        assert!((a.mean - 5.0).abs() < 1e-12);
        assert!((a.stddev.unwrap() - 2.1380899352993950).abs() < 1e-9);
    }

    #[test]
    fn single_sample_bucket_is_flagged_not_fatal() {
        let config = SweepConfig::coherence_fps();
        let mut engine = AggregationEngine::new(&config, Identity);
        engine.insert(scalar(0.0, "3_4", 30.0)).unwrap();
        let aggregates = engine.finalize().unwrap();
        assert_eq!(aggregates[0].count, 1);
        assert_eq!(aggregates[0].stddev, None);
    }

    #[test]
    fn baseline_diff_is_value_minus_baseline() {
        let config = SweepConfig::seed_fps();
        let mut engine = AggregationEngine::new(&config, Identity);
        engine.insert(scalar(0.0, "17_42", 10.0)).unwrap();
        engine.insert(scalar(2.0, "17_42", 7.0)).unwrap();
        engine.insert(scalar(4.0, "17_42", 12.5)).unwrap();
        let aggregates = engine.finalize().unwrap();
        assert_eq!(aggregates.len(), 2);
        assert!((aggregates[0].mean - (-3.0)).abs() < 1e-12);
        assert!((aggregates[1].mean - 2.5).abs() < 1e-12);
    }

    #[test]
    fn coherence_ssim_end_to_end_buckets() {
        // Three rendered frames of a coherence sweep at pos 1.
        let config = SweepConfig::coherence_ssim();
        let names = ["0.00_0_1.png", "0.05_0_1.png", "0.10_0_1.png"];
        let decoded: Vec<_> = names
            .iter()
            .map(|n| Convention::CoherenceSsim.decode(n).unwrap())
            .collect();

        // The quantizer assigns bucket ids 0, 1, 2.
        for (i, d) in decoded.iter().enumerate() {
            assert_eq!(config.quantizer.bucket(d.param, "t").unwrap(), i);
        }

        // Bucket 0's sample is the baseline for pos 1; the others are
        // scored against it.
        let mut engine = AggregationEngine::new(&config, ConstScorer(0.9));
        for (d, name) in decoded.iter().zip(names.iter()) {
            engine
                .insert(Sample {
                    param: d.param,
                    group: d.group.clone(),
                    value: 0.0,
                    source: name.to_string(),
                })
                .unwrap();
        }
        let aggregates = engine.finalize().unwrap();
        let buckets: Vec<usize> = aggregates.iter().map(|a| a.bucket).collect();
        assert_eq!(buckets, vec![1, 2]);
        assert!(aggregates.iter().all(|a| (a.mean - 0.9).abs() < 1e-12));
    }

    #[test]
    fn missing_baseline_fails_at_finalize() {
        let config = SweepConfig::coherence_ssim();
        let mut engine = AggregationEngine::new(&config, ConstScorer(1.0));
        engine.insert(scalar(0.05, "1", 0.0)).unwrap();
        let err = engine.finalize().unwrap_err();
        match *err.kind() {
            ErrorKind::MissingBaseline(ref g) => assert_eq!(g, "1"),
            ref k => panic!("unexpected kind: {:?}", k),
        }
    }

    #[test]
    fn insert_after_finalize_fails_until_reset() {
        let config = SweepConfig::coherence_fps();
        let mut engine = AggregationEngine::new(&config, Identity);
        engine.insert(scalar(0.0, "3_4", 30.0)).unwrap();
        engine.finalize().unwrap();

        let err = engine.insert(scalar(0.0, "3_4", 31.0)).unwrap_err();
        match *err.kind() {
            ErrorKind::FinalizedBucket(0) => {}
            ref k => panic!("unexpected kind: {:?}", k),
        }

        engine.reset();
        engine.insert(scalar(0.05, "3_4", 31.0)).unwrap();
        let aggregates = engine.finalize().unwrap();
        // Only the post-reset sample is visible.
        assert_eq!(aggregates.len(), 1);
        assert_eq!(aggregates[0].bucket, 1);
        assert_eq!(aggregates[0].count, 1);
    }

    #[test]
    fn finalize_seals_unpopulated_buckets_too() {
        let config = SweepConfig::coherence_fps();
        let mut engine = AggregationEngine::new(&config, Identity);
        engine.insert(scalar(0.0, "3_4", 30.0)).unwrap();
        engine.finalize().unwrap();

        // Bucket 1 was never populated; a new pass must not sneak in
        // through it without a reset.
        let err = engine.insert(scalar(0.05, "3_4", 31.0)).unwrap_err();
        match *err.kind() {
            ErrorKind::FinalizedBucket(1) => {}
            ref k => panic!("unexpected kind: {:?}", k),
        }
        let err = engine.insert_all(vec![scalar(0.05, "3_4", 31.0)]).unwrap_err();
        match *err.kind() {
            ErrorKind::FinalizedBucket(1) => {}
            ref k => panic!("unexpected kind: {:?}", k),
        }
    }

    #[test]
    fn insert_all_matches_serial_path() {
        let config = SweepConfig::coverage_fps();
        let samples: Vec<_> = (0..20)
            .map(|i| scalar(0.1 + 0.1 * (i % 5) as f64, "3_4", i as f64))
            .collect();

        let mut serial = AggregationEngine::new(&config, Identity);
        for s in samples.clone() {
            serial.insert(s).unwrap();
        }
        let mut parallel = AggregationEngine::new(&config, Identity);
        parallel.insert_all(samples).unwrap();

        let a = serial.finalize().unwrap();
        let b = parallel.finalize().unwrap();
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.bucket, y.bucket);
            assert_eq!(x.count, y.count);
            assert!((x.mean - y.mean).abs() < 1e-12);
        }
    }

    #[test]
    fn merge_store_folds_in_shards() {
        let config = SweepConfig::coverage_fps();
        let mut engine = AggregationEngine::new(&config, Identity);
        engine.insert(scalar(0.1, "3_4", 30.0)).unwrap();

        let mut shard = ::store::SampleStore::default();
        shard.insert(0, 32.0).unwrap();
        engine.merge_store(shard).unwrap();

        let aggregates = engine.finalize().unwrap();
        assert_eq!(aggregates[0].count, 2);
        assert!((aggregates[0].mean - 31.0).abs() < 1e-12);
    }

    #[test]
    fn normalization_policies() {
        assert_eq!(Normalize::SampleMean.apply(10.0, 4), 2.5);
        assert_eq!(Normalize::FixedDivisor(5.0).apply(10.0, 4), 2.0);
        assert_eq!(Normalize::Sum.apply(10.0, 4), 10.0);
    }
}
