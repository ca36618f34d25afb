//! CLI configuration file.
//!
//! ```json
//! { "log_filter": "sluice_core=debug", "processor": { "skip_reasons": "merged" } }
//! ```
//!
//! Every field is optional; a missing file means all defaults.

use std::path::Path;

use anyhow::Context;
use serde::Deserialize;
use sluice_core::app::ProcessorConfig;

pub const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub log_filter: Option<String>,
    pub processor: ProcessorConfig,
}

impl CliConfig {
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing config file {}", path.display()))
    }

    /// `--log-filter`, then `RUST_LOG`, then the file, then [`DEFAULT_LOG_FILTER`].
    pub fn log_filter(&self, flag: Option<&str>, env: Option<&str>) -> String {
        flag.or(env)
            .or(self.log_filter.as_deref())
            .unwrap_or(DEFAULT_LOG_FILTER)
            .to_string()
    }
}
