//! Strongly-typed identifiers.
//!
//! Every id is a ULID wrapped in `Id<T>`, where `T` is a zero-sized marker.
//! The marker only exists at compile time: a `BatchId` cannot be passed where
//! a `RequestId` is expected, yet both share one implementation.
//!
//! On the wire an id is the bare ULID string; the marker prefix only appears
//! in `Display` (log lines, error messages).

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::marker::PhantomData;
use tracing::warn;
use ulid::Ulid;

/// Marker trait supplying the display prefix of an id type.
pub trait IdMarker: Send + Sync + 'static {
    fn prefix() -> &'static str;
}

#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id<T: IdMarker> {
    ulid: Ulid,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self {
            ulid,
            _marker: PhantomData,
        }
    }

    pub fn as_ulid(&self) -> Ulid {
        self.ulid
    }
}

impl<T: IdMarker> From<Ulid> for Id<T> {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.ulid)
    }
}

/// Reads an optional host-supplied id. A value that is not a ULID is logged
/// and treated as absent, so a fresh id gets generated for it.
pub(crate) fn host_id<'de, D, T>(deserializer: D) -> Result<Option<Id<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: IdMarker,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|raw| match Ulid::from_string(&raw) {
        Ok(ulid) => Some(Id::from_ulid(ulid)),
        Err(e) => {
            warn!(id = %raw, error = %e, "host id is not a ULID, generating one");
            None
        }
    }))
}

/// Marker for inbound batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Batch {}

impl IdMarker for Batch {
    fn prefix() -> &'static str {
        "batch-"
    }
}

/// Marker for audience subscription requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Request {}

impl IdMarker for Request {
    fn prefix() -> &'static str {
        "request-"
    }
}

/// Identifier of one inbound batch (one event or audience processing request).
pub type BatchId = Id<Batch>;

/// Identifier of one audience subscription request.
pub type RequestId = Id<Request>;
