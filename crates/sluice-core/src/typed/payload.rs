//! Typed record payloads.
//!
//! A payload type is tied to exactly one [`RecordKind`]; registering a
//! handler for it registers that kind. Payloads are decoded from
//! `Record::data` just before the handler runs.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::domain::{RecordKind, UserIdentity};

/// # Trait bounds
/// - `DeserializeOwned`: decoded from the record's JSON data
/// - `Send + Sync + 'static`: handled inside a spawned task
pub trait RecordPayload: DeserializeOwned + Send + Sync + 'static {
    const KIND: RecordKind;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomEvent {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_type: Option<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl RecordPayload for CustomEvent {
    const KIND: RecordKind = RecordKind::CustomEvent;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PushSubscriptionAction {
    Subscribe,
    Unsubscribe,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushSubscriptionEvent {
    pub token: String,
    pub action: PushSubscriptionAction,
}

impl RecordPayload for PushSubscriptionEvent {
    const KIND: RecordKind = RecordKind::PushSubscription;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushMessageReceiptEvent {
    #[serde(default)]
    pub payload: Option<String>,
    #[serde(default)]
    pub action_identifier: Option<String>,
}

impl RecordPayload for PushMessageReceiptEvent {
    const KIND: RecordKind = RecordKind::PushMessageReceipt;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAttributeChangeEvent {
    pub key: String,
    #[serde(default)]
    pub old_value: Option<serde_json::Value>,
    #[serde(default)]
    pub new_value: Option<serde_json::Value>,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub is_new_attribute: bool,
}

impl RecordPayload for UserAttributeChangeEvent {
    const KIND: RecordKind = RecordKind::UserAttributeChange;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentityChangeEvent {
    #[serde(default)]
    pub old_identity: Option<UserIdentity>,
    #[serde(default)]
    pub new_identity: Option<UserIdentity>,
}

impl RecordPayload for UserIdentityChangeEvent {
    const KIND: RecordKind = RecordKind::UserIdentityChange;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributionEvent {
    pub partner: String,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub campaign: Option<String>,
}

impl RecordPayload for AttributionEvent {
    const KIND: RecordKind = RecordKind::Attribution;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStartEvent {
    #[serde(default)]
    pub session_id: Option<String>,
}

impl RecordPayload for SessionStartEvent {
    const KIND: RecordKind = RecordKind::SessionStart;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEndEvent {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub session_length_ms: Option<u64>,
}

impl RecordPayload for SessionEndEvent {
    const KIND: RecordKind = RecordKind::SessionEnd;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenViewEvent {
    pub screen_name: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl RecordPayload for ScreenViewEvent {
    const KIND: RecordKind = RecordKind::ScreenView;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipAction {
    Add,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudienceMembershipChange {
    pub audience_id: String,
    pub action: MembershipAction,
    #[serde(default)]
    pub user_identities: Vec<UserIdentity>,
}

impl RecordPayload for AudienceMembershipChange {
    const KIND: RecordKind = RecordKind::AudienceMembershipChange;
}
