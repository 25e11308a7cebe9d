//! Evaluation settings in TOML.

use errors::*;
use std::fs::File;
use std::io::Read;
use toml;

/// Where artifacts go and which runs the filtered SSIM sweeps compare.
/// Every field has a default, so a settings file is optional and may be
/// partial.
#[derive(Debug, Clone, Deserialize)]
pub struct Setting {
    /// Directory receiving chart and summary artifacts.
    #[serde(default = "default_out_dir")]
    pub out_dir: String,

    /// Coverage threshold whose renders take part in the coverage SSIM
    /// sweep.
    #[serde(default = "default_coverage")]
    pub default_coverage: f64,

    /// Camera position compared in the per-seed SSIM sweep.
    #[serde(default = "default_pos")]
    pub target_pos: f64,
}

fn default_out_dir() -> String {
    "graphs".to_string()
}

fn default_coverage() -> f64 {
    0.1
}

fn default_pos() -> f64 {
    1.0
}

impl Default for Setting {
    fn default() -> Setting {
        Setting {
            out_dir: default_out_dir(),
            default_coverage: default_coverage(),
            target_pos: default_pos(),
        }
    }
}

impl Setting {
    /// Initialize from a TOML file.
    pub fn init(path: &str) -> Result<Setting> {
        let mut file =
            File::open(path).chain_err(|| format!("failed to open setting '{}'", path))?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        toml::from_str(&contents).chain_err(|| format!("failed to parse setting '{}'", path))
    }
}
