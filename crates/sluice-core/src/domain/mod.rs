//! Domain model: manifest, settings, permissions, records, batches, outcomes,
//! audience subscriptions.
//!
//! Everything here is plain data plus invariant checks. No I/O, no async.

pub mod batch;
pub mod errors;
pub mod ids;
pub mod manifest;
pub mod outcome;
pub mod permissions;
pub mod record;
pub mod setting;
pub mod subscription;

pub use batch::{Batch, BatchContext, BatchPhase, ProcessingScope};
pub use errors::{ErrorKind, HandlerError, SetupError};
pub use ids::{BatchId, RequestId};
pub use manifest::{
    AudienceProcessingRegistration, EventProcessingRegistration, Manifest, ManifestBuilder,
    ManifestError,
};
pub use outcome::{BatchResult, BatchSummary, Outcome, RecordOutcome, RecordRef, SkipReason};
pub use permissions::{
    EncodingPolicy, IdentityPermission, IdentityType, Location, Permissions, UserIdentity,
};
pub use record::{Record, RecordKind, RuntimeEnvironment};
pub use setting::{Configuration, Setting, SettingKind};
pub use subscription::{
    AudienceSubscriptionRequest, AudienceSubscriptionResponse, SubscriptionAction,
};
