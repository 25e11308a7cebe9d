//! Quantizing continuous sweep parameters into stable bucket ids.

use errors::*;

/// Tolerance when matching a parameter against an enumerated level.
const LEVEL_EPS: f64 = 1e-9;

/// Maps a continuous parameter value onto a discrete bucket id.
///
/// Bucket assignment is a pure function of the parameter and the sweep's
/// quantization config, and the bucket-to-parameter back-mapping
/// (`param_of`) is monotonic in the id, so charts stay ordered on the
/// parameter axis.
///
/// Rounding rule: round-half-away-from-zero (`f64::round`), applied
/// uniformly. A value exactly on a bucket boundary (0.025 at step 0.05)
/// rounds to the higher bucket.
#[derive(Debug, Clone, PartialEq)]
pub enum Quantizer {
    /// Evenly spaced buckets: `round((p - origin) / step) - offset`.
    Linear {
        /// Distance between adjacent bucket centers.
        step: f64,
        /// Parameter value the bucket grid is anchored at.
        origin: f64,
        /// Index shift; sweeps whose first bucket sits one step into the
        /// domain subtract one.
        offset: i64,
        /// Number of valid buckets.
        count: usize,
    },

    /// Explicitly enumerated parameter levels, strictly increasing.
    Levels(Vec<f64>),
}

impl Quantizer {
    /// Number of buckets in the sweep's domain.
    pub fn count(&self) -> usize {
        match *self {
            Quantizer::Linear { count, .. } => count,
            Quantizer::Levels(ref levels) => levels.len(),
        }
    }

    /// Maps `param` to its bucket id. `source` names the originating
    /// artifact for error attribution.
    pub fn bucket(&self, param: f64, source: &str) -> Result<usize> {
        match *self {
            Quantizer::Linear { step, origin, offset, count } => {
                let id = ((param - origin) / step).round() as i64 - offset;
                if id < 0 || id as usize >= count {
                    bail!(ErrorKind::OutOfDomain(source.to_string(), id, count));
                }
                Ok(id as usize)
            }
            Quantizer::Levels(ref levels) => {
                match levels.iter().position(|l| (l - param).abs() < LEVEL_EPS) {
                    Some(i) => Ok(i),
                    None => bail!(ErrorKind::OutOfDomain(
                        source.to_string(),
                        -1,
                        levels.len()
                    )),
                }
            }
        }
    }

    /// Representative parameter value of a bucket (the chart's x-axis).
    pub fn param_of(&self, bucket: usize) -> f64 {
        match *self {
            Quantizer::Linear { step, origin, offset, .. } => {
                origin + (bucket as i64 + offset) as f64 * step
            }
            Quantizer::Levels(ref levels) => levels[bucket],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coherence() -> Quantizer {
        Quantizer::Linear { step: 0.05, origin: 0.0, offset: 0, count: 13 }
    }

    fn coverage() -> Quantizer {
        Quantizer::Linear { step: 0.1, origin: 0.0, offset: 1, count: 5 }
    }

    #[test]
    fn coherence_buckets() {
        let q = coherence();
        assert_eq!(q.bucket(0.0, "a").unwrap(), 0);
        assert_eq!(q.bucket(0.05, "a").unwrap(), 1);
        assert_eq!(q.bucket(0.10, "a").unwrap(), 2);
        assert_eq!(q.bucket(0.60, "a").unwrap(), 12);
    }

    #[test]
    fn coverage_buckets_subtract_one() {
        let q = coverage();
        assert_eq!(q.bucket(0.1, "a").unwrap(), 0);
        assert_eq!(q.bucket(0.2, "a").unwrap(), 1);
        assert_eq!(q.bucket(0.5, "a").unwrap(), 4);
    }

    #[test]
    fn boundary_rounds_up() {
        // 0.025 / 0.05 = 0.5 exactly; round-half-away-from-zero picks 1.
        assert_eq!(coherence().bucket(0.025, "a").unwrap(), 1);
    }

    #[test]
    fn out_of_domain_fails() {
        assert!(coherence().bucket(0.70, "a").is_err());
        assert!(coherence().bucket(-0.05, "a").is_err());
        assert!(coverage().bucket(0.0, "a").is_err());
        assert!(coverage().bucket(0.6, "a").is_err());
    }

    #[test]
    fn levels_buckets() {
        let q = Quantizer::Levels(vec![2.0, 4.0, 8.0]);
        assert_eq!(q.bucket(2.0, "a").unwrap(), 0);
        assert_eq!(q.bucket(4.0, "a").unwrap(), 1);
        assert_eq!(q.bucket(8.0, "a").unwrap(), 2);
        assert!(q.bucket(3.0, "a").is_err());
        assert_eq!(q.param_of(1), 4.0);
    }

    #[test]
    fn monotonic_over_domain() {
        let q = coherence();
        let mut last = 0;
        for i in 0..61 {
            let p = i as f64 * 0.01;
            let b = q.bucket(p, "a").unwrap();
            assert!(b >= last, "bucket({}) = {} < {}", p, b, last);
            last = b;
        }
    }

    #[test]
    fn back_mapping_is_monotonic() {
        let q = coverage();
        for b in 1..q.count() {
            assert!(q.param_of(b) > q.param_of(b - 1));
        }
        assert!((q.param_of(0) - 0.1).abs() < 1e-12);
    }
}
