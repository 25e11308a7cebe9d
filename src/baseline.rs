//! Resolving the baseline sample of each sweep group.
//!
//! Every sweep group (samples sharing a seed, scene or position) has at most
//! one baseline: the run against which the group's other samples are
//! compared. Which sample that is, and what arrival order the producer
//! guarantees, differs per sweep variant; both are captured in the policy.

use Sample;
use errors::*;
use std::collections::HashMap;

/// Tolerance when matching a parameter against the baseline sentinel.
const SENTINEL_EPS: f64 = 1e-9;

/// How a sweep designates the baseline inside each group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BaselinePolicy {
    /// No baseline; measurements are aggregated as-is.
    None,

    /// The baseline is the sample whose parameter equals the sentinel.
    /// Arrival order is free: dependent samples are buffered until their
    /// group's sentinel shows up.
    Sentinel(f64),

    /// Same sentinel, but the producer guarantees it arrives first within
    /// each group; a dependent sample with no resolved baseline fails
    /// immediately.
    SentinelFirst(f64),
}

impl BaselinePolicy {
    /// Whether `param` designates the baseline under this policy.
    pub fn is_baseline(&self, param: f64) -> bool {
        match *self {
            BaselinePolicy::None => false,
            BaselinePolicy::Sentinel(p) | BaselinePolicy::SentinelFirst(p) => {
                (param - p).abs() < SENTINEL_EPS
            }
        }
    }
}

/// Pairs every dependent sample with its group's baseline payload.
#[derive(Debug)]
pub struct BaselineResolver<V> {
    policy: BaselinePolicy,
    resolved: HashMap<String, V>,
    pending: HashMap<String, Vec<Sample<V>>>,
}

impl<V: Clone> BaselineResolver<V> {
    /// Creates a resolver for the given policy.
    pub fn new(policy: BaselinePolicy) -> Self {
        BaselineResolver {
            policy: policy,
            resolved: HashMap::new(),
            pending: HashMap::new(),
        }
    }

    /// Feeds one sample through baseline resolution and returns the samples
    /// now ready for scoring, each with its baseline payload (if the sweep
    /// defines one). A baseline sample produces no output of its own beyond
    /// unblocking its group; a buffered sample produces none until then.
    pub fn offer(&mut self, sample: Sample<V>) -> Result<Vec<(Sample<V>, Option<V>)>> {
        let strict = match self.policy {
            BaselinePolicy::None => return Ok(vec![(sample, None)]),
            BaselinePolicy::Sentinel(_) => false,
            BaselinePolicy::SentinelFirst(_) => true,
        };

        if self.policy.is_baseline(sample.param) {
            if self.resolved.contains_key(&sample.group) {
                warn!(
                    "duplicate baseline '{}' for group '{}'; keeping the first",
                    sample.source,
                    sample.group
                );
                return Ok(Vec::new());
            }
            let base = sample.value.clone();
            self.resolved.insert(sample.group.clone(), sample.value);
            let drained = self.pending.remove(&sample.group).unwrap_or_default();
            return Ok(
                drained
                    .into_iter()
                    .map(|s| (s, Some(base.clone())))
                    .collect(),
            );
        }

        if let Some(base) = self.resolved.get(&sample.group) {
            return Ok(vec![(sample, Some(base.clone()))]);
        }
        if strict {
            bail!(ErrorKind::MissingBaseline(sample.group));
        }
        trace!("buffering '{}' until group '{}' resolves", sample.source, sample.group);
        self.pending
            .entry(sample.group.clone())
            .or_insert_with(Vec::new)
            .push(sample);
        Ok(Vec::new())
    }

    /// Groups still waiting for a baseline, sorted. Non-empty at the end of
    /// a run means the run must fail with `MissingBaseline`.
    pub fn unresolved(&self) -> Vec<&str> {
        let mut groups: Vec<&str> = self.pending.keys().map(|g| g.as_str()).collect();
        groups.sort();
        groups
    }

    /// Number of groups with a resolved baseline.
    pub fn groups(&self) -> usize {
        self.resolved.len()
    }

    /// Clears all resolution state.
    pub fn reset(&mut self) {
        self.resolved.clear();
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(param: f64, group: &str, value: f64) -> Sample<f64> {
        Sample {
            param: param,
            group: group.to_string(),
            value: value,
            source: format!("{}_{}", param, group),
        }
    }

    #[test]
    fn none_policy_passes_through() {
        let mut r = BaselineResolver::new(BaselinePolicy::None);
        let ready = r.offer(sample(0.3, "1", 42.0)).unwrap();
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].1, None);
    }

    #[test]
    fn sentinel_buffers_until_baseline_arrives() {
        let mut r = BaselineResolver::new(BaselinePolicy::Sentinel(0.0));
        assert!(r.offer(sample(0.05, "1", 7.0)).unwrap().is_empty());
        assert_eq!(r.unresolved(), vec!["1"]);

        let ready = r.offer(sample(0.0, "1", 10.0)).unwrap();
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].0.value, 7.0);
        assert_eq!(ready[0].1, Some(10.0));
        assert!(r.unresolved().is_empty());

        // Later arrivals in the group pair up immediately.
        let ready = r.offer(sample(0.10, "1", 8.0)).unwrap();
        assert_eq!(ready[0].1, Some(10.0));
    }

    #[test]
    fn sentinel_first_requires_ordering() {
        let mut r = BaselineResolver::new(BaselinePolicy::SentinelFirst(0.0));
        let err = r.offer(sample(2.0, "17_42", 7.0)).unwrap_err();
        match *err.kind() {
            ErrorKind::MissingBaseline(ref g) => assert_eq!(g, "17_42"),
            ref k => panic!("unexpected kind: {:?}", k),
        }

        assert!(r.offer(sample(0.0, "5_5", 10.0)).unwrap().is_empty());
        let ready = r.offer(sample(2.0, "5_5", 7.0)).unwrap();
        assert_eq!(ready[0].1, Some(10.0));
    }

    #[test]
    fn exactly_one_baseline_per_group() {
        let mut r = BaselineResolver::new(BaselinePolicy::Sentinel(0.0));
        r.offer(sample(0.0, "1", 10.0)).unwrap();
        // Duplicate sentinel: first one wins.
        assert!(r.offer(sample(0.0, "1", 99.0)).unwrap().is_empty());
        assert_eq!(r.groups(), 1);

        let ready = r.offer(sample(0.05, "1", 7.0)).unwrap();
        assert_eq!(ready[0].1, Some(10.0));
    }

    #[test]
    fn groups_do_not_share_baselines() {
        let mut r = BaselineResolver::new(BaselinePolicy::Sentinel(0.0));
        r.offer(sample(0.0, "1", 10.0)).unwrap();
        assert!(r.offer(sample(0.05, "2", 7.0)).unwrap().is_empty());
        assert_eq!(r.unresolved(), vec!["2"]);
    }

    #[test]
    fn reset_clears_resolution_state() {
        let mut r = BaselineResolver::new(BaselinePolicy::Sentinel(0.0));
        r.offer(sample(0.0, "1", 10.0)).unwrap();
        r.offer(sample(0.05, "2", 7.0)).unwrap();
        r.reset();
        assert_eq!(r.groups(), 0);
        assert!(r.unresolved().is_empty());
    }
}
