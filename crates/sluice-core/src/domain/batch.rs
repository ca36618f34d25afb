//! Inbound batches and the per-batch context handed to handlers.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::BatchId;
use super::permissions::{Location, UserIdentity};
use super::record::{Record, RuntimeEnvironment};
use super::setting::Configuration;

/// Which capability block a batch is processed under.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingScope {
    #[default]
    Event,
    Audience,
}

impl ProcessingScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingScope::Event => "event",
            ProcessingScope::Audience => "audience",
        }
    }
}

impl fmt::Display for ProcessingScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One request's worth of records sharing a configuration and environment.
///
/// Fields this version does not know are ignored on deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    /// Host-assigned id; generated on receipt when absent.
    #[serde(
        default,
        deserialize_with = "super::ids::host_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<BatchId>,

    #[serde(default)]
    pub scope: ProcessingScope,

    #[serde(default = "unknown_environment")]
    pub environment: RuntimeEnvironment,

    #[serde(default)]
    pub configuration: Configuration,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub user_identities: Vec<UserIdentity>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,

    #[serde(default)]
    pub records: Vec<Record>,
}

fn unknown_environment() -> RuntimeEnvironment {
    RuntimeEnvironment::Unknown
}

impl Batch {
    pub fn new(environment: RuntimeEnvironment, configuration: Configuration) -> Self {
        Self {
            id: None,
            scope: ProcessingScope::Event,
            environment,
            configuration,
            user_identities: Vec::new(),
            ip_address: None,
            location: None,
            records: Vec::new(),
        }
    }

    pub fn audience(configuration: Configuration) -> Self {
        Self {
            scope: ProcessingScope::Audience,
            ..Self::new(RuntimeEnvironment::Unknown, configuration)
        }
    }

    pub fn with_record(mut self, record: Record) -> Self {
        self.records.push(record);
        self
    }

    pub fn with_records(mut self, records: impl IntoIterator<Item = Record>) -> Self {
        self.records.extend(records);
        self
    }

    pub fn with_identity(mut self, identity: UserIdentity) -> Self {
        self.user_identities.push(identity);
        self
    }
}

/// Read-only view of a batch shared by every handler call in that batch.
///
/// Identities, IP address and location have already been filtered through
/// the manifest permissions. `session` holds whatever the setup hook
/// returned.
#[derive(Debug, Clone)]
pub struct BatchContext {
    pub batch_id: BatchId,
    pub scope: ProcessingScope,
    pub environment: RuntimeEnvironment,
    pub configuration: Configuration,
    pub user_identities: Vec<UserIdentity>,
    pub ip_address: Option<String>,
    pub location: Option<Location>,
    pub received_at: DateTime<Utc>,
    pub session: Option<serde_json::Value>,
}

impl BatchContext {
    pub fn setting(&self, key: &str) -> Option<&str> {
        self.configuration.get(key)
    }
}

/// Lifecycle of one batch.
///
/// `Received -> Validating -> (Rejected | Setup -> Dispatching -> Assembling -> Complete)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchPhase {
    Received,
    Validating,
    Rejected,
    Setup,
    Dispatching,
    Assembling,
    Complete,
}

impl BatchPhase {
    pub fn can_transition_to(&self, next: BatchPhase) -> bool {
        use BatchPhase::*;
        matches!(
            (self, next),
            (Received, Validating)
                | (Validating, Rejected)
                | (Validating, Setup)
                | (Setup, Rejected)
                | (Setup, Dispatching)
                | (Dispatching, Assembling)
                | (Assembling, Complete)
        )
    }
}
