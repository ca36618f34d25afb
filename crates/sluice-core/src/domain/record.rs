//! Inbound records and the tags that route them.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::permissions::{Permissions, UserIdentity};

/// Runtime environment the data originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeEnvironment {
    Android,
    Ios,
    Web,
    MobileWeb,
    Tvos,
    Roku,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for RuntimeEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RuntimeEnvironment::Android => "android",
            RuntimeEnvironment::Ios => "ios",
            RuntimeEnvironment::Web => "web",
            RuntimeEnvironment::MobileWeb => "mobile_web",
            RuntimeEnvironment::Tvos => "tvos",
            RuntimeEnvironment::Roku => "roku",
            RuntimeEnvironment::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Type tag of a record.
///
/// Tags the adapter does not know about are preserved as `Unknown(tag)` so a
/// newer host can send them without breaking deserialization; they are
/// skipped at dispatch time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RecordKind {
    CustomEvent,
    PushSubscription,
    PushMessageReceipt,
    UserAttributeChange,
    UserIdentityChange,
    Attribution,
    SessionStart,
    SessionEnd,
    ScreenView,
    AudienceMembershipChange,
    Unknown(String),
}

impl RecordKind {
    pub fn as_str(&self) -> &str {
        match self {
            RecordKind::CustomEvent => "custom_event",
            RecordKind::PushSubscription => "push_subscription",
            RecordKind::PushMessageReceipt => "push_message_receipt",
            RecordKind::UserAttributeChange => "user_attribute_change",
            RecordKind::UserIdentityChange => "user_identity_change",
            RecordKind::Attribution => "attribution",
            RecordKind::SessionStart => "session_start",
            RecordKind::SessionEnd => "session_end",
            RecordKind::ScreenView => "screen_view",
            RecordKind::AudienceMembershipChange => "audience_membership_change",
            RecordKind::Unknown(tag) => tag,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, RecordKind::Unknown(_))
    }
}

impl From<String> for RecordKind {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "custom_event" => RecordKind::CustomEvent,
            "push_subscription" => RecordKind::PushSubscription,
            "push_message_receipt" => RecordKind::PushMessageReceipt,
            "user_attribute_change" => RecordKind::UserAttributeChange,
            "user_identity_change" => RecordKind::UserIdentityChange,
            "attribution" => RecordKind::Attribution,
            "session_start" => RecordKind::SessionStart,
            "session_end" => RecordKind::SessionEnd,
            "screen_view" => RecordKind::ScreenView,
            "audience_membership_change" => RecordKind::AudienceMembershipChange,
            _ => RecordKind::Unknown(tag),
        }
    }
}

impl From<&str> for RecordKind {
    fn from(tag: &str) -> Self {
        RecordKind::from(tag.to_string())
    }
}

impl From<RecordKind> for String {
    fn from(kind: RecordKind) -> Self {
        match kind {
            RecordKind::Unknown(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One typed unit of inbound data.
///
/// The payload stays as JSON until a typed handler decodes it, so an
/// undecodable payload fails only its own record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(rename = "type")]
    pub kind: RecordKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_ms: Option<i64>,

    /// Overrides the batch environment for this record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<RuntimeEnvironment>,

    #[serde(default)]
    pub data: serde_json::Value,
}

impl Record {
    pub fn new(kind: impl Into<RecordKind>, data: serde_json::Value) -> Self {
        Self {
            id: None,
            kind: kind.into(),
            timestamp_ms: None,
            environment: None,
            data,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_environment(mut self, environment: RuntimeEnvironment) -> Self {
        self.environment = Some(environment);
        self
    }

    /// Filter and encode the identities carried inside `data` the same way
    /// batch-level identities are. Entries that are not identities are left
    /// for the payload decoder to reject.
    pub fn restrict_identities(&mut self, permissions: &Permissions) {
        let Value::Object(data) = &mut self.data else {
            return;
        };
        match self.kind {
            RecordKind::AudienceMembershipChange => {
                if let Some(Value::Array(identities)) = data.get_mut("user_identities") {
                    identities.retain_mut(|value| restrict(value, permissions));
                }
            }
            RecordKind::UserIdentityChange => {
                for key in ["old_identity", "new_identity"] {
                    if let Some(value) = data.get_mut(key) {
                        if !restrict(value, permissions) {
                            *value = Value::Null;
                        }
                    }
                }
            }
            _ => {}
        }
    }
}

/// Rewrites one identity in place. `false` means it must be dropped.
fn restrict(value: &mut Value, permissions: &Permissions) -> bool {
    let Ok(identity) = UserIdentity::deserialize(&*value) else {
        return true;
    };
    match permissions.encode(&identity) {
        Some(encoded) => {
            *value = json!({"type": encoded.identity, "value": encoded.value});
            true
        }
        None => false,
    }
}
