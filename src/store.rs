//! Bucketed storage of raw measurements.

use average::Variance;
use errors::*;
use std::collections::BTreeMap;
use std::collections::btree_map;

/// Accumulation state of a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketState {
    /// No measurement yet.
    Empty,
    /// Accepting measurements.
    Accumulating,
    /// Statistics computed; inserts are rejected until a reset.
    Finalized,
}

/// One bucket: the ordered raw measurements contributed across all sweep
/// groups. The raw list is kept (not just running sums) because sample
/// standard deviation and store merging both need it.
#[derive(Debug, Clone, Default)]
pub struct Bucket {
    values: Vec<f64>,
    finalized: bool,
}

impl Bucket {
    /// Current position in the `Empty -> Accumulating -> Finalized` machine.
    pub fn state(&self) -> BucketState {
        if self.finalized {
            BucketState::Finalized
        } else if self.values.is_empty() {
            BucketState::Empty
        } else {
            BucketState::Accumulating
        }
    }

    fn push(&mut self, value: f64, id: usize) -> Result<()> {
        if self.finalized {
            bail!(ErrorKind::FinalizedBucket(id));
        }
        self.values.push(value);
        Ok(())
    }

    fn finalize(&mut self) {
        self.finalized = true;
    }

    /// Number of contributed measurements.
    pub fn count(&self) -> usize {
        self.values.len()
    }

    /// Raw measurements, in insertion order.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Sum of the measurements.
    pub fn sum(&self) -> f64 {
        self.values.iter().sum()
    }

    /// Mean of the measurements.
    pub fn mean(&self) -> f64 {
        let v: Variance = self.values.iter().cloned().collect();
        v.mean()
    }

    /// Bessel-corrected sample standard deviation. `None` flags
    /// insufficient data (fewer than two measurements), which is distinct
    /// from zero variance.
    pub fn stddev(&self) -> Option<f64> {
        if self.values.len() < 2 {
            return None;
        }
        let v: Variance = self.values.iter().cloned().collect();
        Some(v.sample_variance().sqrt())
    }
}

/// Mapping from bucket id to the ordered measurements contributed to it.
/// Buckets are created lazily on first insertion. `finalize` seals the
/// whole store, bucket ids never populated included, so a later pass
/// cannot creep in through a fresh bucket; only an explicit `reset`
/// reopens it. Owns no baseline logic.
#[derive(Debug, Clone, Default)]
pub struct SampleStore {
    buckets: BTreeMap<usize, Bucket>,
    finalized: bool,
}

impl SampleStore {
    /// Inserts one measurement into `bucket`.
    pub fn insert(&mut self, bucket: usize, value: f64) -> Result<()> {
        if self.finalized {
            bail!(ErrorKind::FinalizedBucket(bucket));
        }
        self.buckets
            .entry(bucket)
            .or_insert_with(Bucket::default)
            .push(value, bucket)
    }

    /// Iterates buckets in id order.
    pub fn iter(&self) -> btree_map::Iter<usize, Bucket> {
        self.buckets.iter()
    }

    /// Number of populated buckets.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// True when no bucket has been created.
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Seals the store and marks every bucket finalized.
    pub fn finalize(&mut self) {
        self.finalized = true;
        for bucket in self.buckets.values_mut() {
            bucket.finalize();
        }
    }

    /// Folds in a store built from a disjoint shard of the input by
    /// concatenating raw-value lists. Summing partial accumulations instead
    /// would corrupt the sample standard deviation.
    pub fn merge(&mut self, other: SampleStore) -> Result<()> {
        for (id, bucket) in other.buckets {
            if bucket.finalized {
                bail!(ErrorKind::FinalizedBucket(id));
            }
            for value in bucket.values {
                self.insert(id, value)?;
            }
        }
        Ok(())
    }

    /// Drops all buckets and reopens the store; the next pass starts from
    /// a clean slate.
    pub fn reset(&mut self) {
        self.buckets.clear();
        self.finalized = false;
    }
}
