//! Decoding sweep artifact names into typed metadata.
//!
//! Every sweep variant writes its artifacts with an underscore-delimited
//! naming convention (`{thresh}_{x}_{y}.txt`, `{pos}_{interp}_{thresh}.png`,
//! ...). The decoder validates the field arity and the numeric fields for
//! the configured convention and returns a structured record; anything off
//! fails with a `Parse` error carrying the offending name. Decoding is pure:
//! no I/O, no state.

use errors::*;

/// Filename layout of one sweep variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Convention {
    /// Coherence sweep FPS counters: `{thresh}_{x}_{y}.txt`.
    CoherenceFps,

    /// Coherence sweep rendered frames: `{thresh}_{interp}_{pos}.png`.
    CoherenceSsim,

    /// Coverage sweep FPS counters: `{thresh}_{x}_{y}.txt`.
    CoverageFps,

    /// Coverage sweep rendered frames: `{pos}_{interp}_{thresh}.png`.
    CoverageSsim,

    /// Per-seed sweep FPS counters: `{seed}_{seed2}_{interp}.txt`.
    SeedFps,

    /// Per-seed sweep rendered frames: `{seed}_{seed2}_{interp}_{pos}.png`.
    SeedSsim,

    /// Engine-comparison run directory: `{vol}_{cam}_{thresh}`.
    EngineRun,
}

/// Typed sweep metadata decoded from one artifact name.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    /// Controlling parameter value.
    pub param: f64,

    /// Identity shared by samples from the same run (seed, scene or
    /// position).
    pub group: String,

    /// Secondary field, used by some sweeps for filtering.
    pub index: Option<f64>,
}

impl Convention {
    /// File extension this convention expects. `None` for directory names.
    pub fn extension(&self) -> Option<&'static str> {
        match *self {
            Convention::CoherenceFps | Convention::CoverageFps | Convention::SeedFps => Some("txt"),
            Convention::CoherenceSsim | Convention::CoverageSsim | Convention::SeedSsim => {
                Some("png")
            }
            Convention::EngineRun => None,
        }
    }

    fn arity(&self) -> usize {
        match *self {
            Convention::SeedSsim => 4,
            _ => 3,
        }
    }

    /// Decodes `name` into typed sweep metadata.
    pub fn decode(&self, name: &str) -> Result<Decoded> {
        let stem = match self.extension() {
            Some(ext) => {
                let suffix = format!(".{}", ext);
                if !name.ends_with(&suffix) {
                    bail!(ErrorKind::Parse(name.to_string()));
                }
                &name[..name.len() - suffix.len()]
            }
            None => name,
        };

        let fields: Vec<&str> = stem.split('_').collect();
        if fields.len() != self.arity() {
            bail!(ErrorKind::Parse(name.to_string()));
        }
        let nums = fields
            .iter()
            .map(|f| f.parse::<f64>())
            .collect::<::std::result::Result<Vec<f64>, _>>()
            .map_err(|_| ErrorKind::Parse(name.to_string()))?;

        let decoded = match *self {
            Convention::CoherenceFps | Convention::CoverageFps => Decoded {
                param: nums[0],
                group: format!("{}_{}", fields[1], fields[2]),
                index: None,
            },
            Convention::CoherenceSsim => Decoded {
                param: nums[0],
                group: fields[2].to_string(),
                index: Some(nums[1]),
            },
            Convention::CoverageSsim => Decoded {
                param: nums[1],
                group: fields[0].to_string(),
                index: Some(nums[2]),
            },
            Convention::SeedFps | Convention::EngineRun => Decoded {
                param: nums[2],
                group: format!("{}_{}", fields[0], fields[1]),
                index: None,
            },
            Convention::SeedSsim => Decoded {
                param: nums[2],
                group: format!("{}_{}", fields[0], fields[1]),
                index: Some(nums[3]),
            },
        };
        Ok(decoded)
    }

    /// Reassembles an artifact name from decoded metadata (the inverse of
    /// `decode`, up to numeric formatting).
    pub fn encode(&self, decoded: &Decoded) -> String {
        let index = decoded.index.unwrap_or(0.0);
        let stem = match *self {
            Convention::CoherenceFps | Convention::CoverageFps => {
                format!("{}_{}", decoded.param, decoded.group)
            }
            Convention::CoherenceSsim => format!("{}_{}_{}", decoded.param, index, decoded.group),
            Convention::CoverageSsim => format!("{}_{}_{}", decoded.group, decoded.param, index),
            Convention::SeedFps | Convention::EngineRun => {
                format!("{}_{}", decoded.group, decoded.param)
            }
            Convention::SeedSsim => format!("{}_{}_{}", decoded.group, decoded.param, index),
        };
        match self.extension() {
            Some(ext) => format!("{}.{}", stem, ext),
            None => stem,
        }
    }
}
