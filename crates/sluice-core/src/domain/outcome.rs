//! Per-record outcomes and the assembled batch result.
//!
//! Outcomes are positional: `outcomes[i]` always describes `records[i]` of
//! the inbound batch.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::ids::BatchId;
use super::record::{Record, RecordKind};

/// Why a record was not handed to a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SkipReason {
    #[serde(rename = "unsupported type")]
    UnsupportedType,

    #[serde(rename = "unsupported environment")]
    UnsupportedEnvironment,

    /// Merged reason used when type and environment are not distinguished.
    #[serde(rename = "unsupported record")]
    Unsupported,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::UnsupportedType => "unsupported type",
            SkipReason::UnsupportedEnvironment => "unsupported environment",
            SkipReason::Unsupported => "unsupported record",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result classification of one record.
///
/// Serialized as `{"status": "PROCESSED" | "SKIPPED" | "FAILED", ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    Processed,
    Skipped {
        reason: SkipReason,
    },
    Failed {
        error: String,
        /// Hint for the host: the failure was transient.
        retryable: bool,
    },
}

impl Outcome {
    pub fn skipped(reason: SkipReason) -> Self {
        Outcome::Skipped { reason }
    }

    pub fn failed(error: impl Into<String>, retryable: bool) -> Self {
        Outcome::Failed {
            error: error.into(),
            retryable,
        }
    }

    pub fn is_processed(&self) -> bool {
        matches!(self, Outcome::Processed)
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Outcome::Skipped { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed { .. })
    }
}

/// Positional reference back to the inbound record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordRef {
    pub index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub kind: RecordKind,
}

impl RecordRef {
    pub fn of(index: usize, record: &Record) -> Self {
        Self {
            index,
            id: record.id.clone(),
            kind: record.kind.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordOutcome {
    #[serde(flatten)]
    pub record: RecordRef,
    #[serde(flatten)]
    pub outcome: Outcome,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    pub batch_id: BatchId,
    pub outcomes: Vec<RecordOutcome>,
}

impl BatchResult {
    pub fn new(batch_id: BatchId, outcomes: Vec<RecordOutcome>) -> Self {
        Self { batch_id, outcomes }
    }

    pub fn summary(&self) -> BatchSummary {
        self.outcomes
            .iter()
            .fold(BatchSummary::default(), |mut acc, o| {
                acc.total += 1;
                acc.processed += usize::from(o.outcome.is_processed());
                acc.skipped += usize::from(o.outcome.is_skipped());
                acc.failed += usize::from(o.outcome.is_failed());
                acc
            })
    }

    /// Outcomes without their record refs, in input order.
    pub fn statuses(&self) -> Vec<&Outcome> {
        self.outcomes.iter().map(|o| &o.outcome).collect()
    }
}
