//! Processor configuration.

use serde::{Deserialize, Serialize};

use crate::domain::SkipReason;

/// How finely skipped records are explained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReasonGranularity {
    /// "unsupported type" and "unsupported environment" are reported apart.
    #[default]
    Distinct,
    /// Both are reported as "unsupported record".
    Merged,
}

impl SkipReasonGranularity {
    pub fn apply(&self, reason: SkipReason) -> SkipReason {
        match self {
            SkipReasonGranularity::Distinct => reason,
            SkipReasonGranularity::Merged => SkipReason::Unsupported,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    pub skip_reasons: SkipReasonGranularity,
}
