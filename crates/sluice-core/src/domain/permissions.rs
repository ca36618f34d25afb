//! Data-access permissions declared in the manifest.
//!
//! The host only shares the identities, IP address and location an
//! integration asked for. The processor applies the same filter to every
//! inbound batch before handlers see it.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// User identity types a batch may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityType {
    CustomerId,
    Email,
    Facebook,
    Google,
    Microsoft,
    Twitter,
    Yahoo,
    Alias,
    MobileNumber,
    Other,
    #[serde(other)]
    Unknown,
}

/// How an identity value is encoded before it reaches a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncodingPolicy {
    Raw,
    Sha256,
}

impl EncodingPolicy {
    pub fn encode(&self, value: &str) -> String {
        match self {
            EncodingPolicy::Raw => value.to_string(),
            EncodingPolicy::Sha256 => hex::encode(Sha256::digest(value.as_bytes())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IdentityPermission {
    #[serde(rename = "type")]
    pub identity: IdentityType,
    pub encoding: EncodingPolicy,
}

impl IdentityPermission {
    pub fn new(identity: IdentityType, encoding: EncodingPolicy) -> Self {
        Self { identity, encoding }
    }
}

/// A user identity as delivered by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    #[serde(rename = "type")]
    pub identity: IdentityType,
    pub value: String,
}

impl UserIdentity {
    pub fn new(identity: IdentityType, value: impl Into<String>) -> Self {
        Self {
            identity,
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Permissions {
    allow_ip_address: bool,
    allow_location: bool,
    user_identities: BTreeSet<IdentityPermission>,
}

impl Permissions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow_ip_address(mut self, allow: bool) -> Self {
        self.allow_ip_address = allow;
        self
    }

    pub fn allow_location(mut self, allow: bool) -> Self {
        self.allow_location = allow;
        self
    }

    pub fn with_identity(mut self, identity: IdentityType, encoding: EncodingPolicy) -> Self {
        self.user_identities
            .insert(IdentityPermission::new(identity, encoding));
        self
    }

    pub fn ip_address_allowed(&self) -> bool {
        self.allow_ip_address
    }

    pub fn location_allowed(&self) -> bool {
        self.allow_location
    }

    pub fn user_identities(&self) -> &BTreeSet<IdentityPermission> {
        &self.user_identities
    }

    /// Encoding for `identity`, or `None` when the type is not permitted.
    pub fn encoding_for(&self, identity: IdentityType) -> Option<EncodingPolicy> {
        self.user_identities
            .iter()
            .find(|p| p.identity == identity)
            .map(|p| p.encoding)
    }

    pub fn permits(&self, identity: IdentityType) -> bool {
        self.encoding_for(identity).is_some()
    }

    /// `identity` encoded for delivery, or `None` when its type is not permitted.
    pub fn encode(&self, identity: &UserIdentity) -> Option<UserIdentity> {
        self.encoding_for(identity.identity)
            .map(|enc| UserIdentity::new(identity.identity, enc.encode(&identity.value)))
    }

    /// Drop identities that are not permitted and encode the rest.
    pub fn apply(&self, identities: &[UserIdentity]) -> Vec<UserIdentity> {
        identities.iter().filter_map(|id| self.encode(id)).collect()
    }
}
