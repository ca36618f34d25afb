//! Audience subscription requests: connecting, updating or removing one
//! audience (segment) on the destination.

use serde::{Deserialize, Serialize};

use super::ids::RequestId;
use super::setting::Configuration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionAction {
    Add,
    Update,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudienceSubscriptionRequest {
    #[serde(
        default,
        deserialize_with = "super::ids::host_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<RequestId>,

    pub audience_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audience_name: Option<String>,

    pub action: SubscriptionAction,

    /// Values for the audience block's account settings.
    #[serde(default)]
    pub account_configuration: Configuration,

    /// Values for the audience connection (segment-level) settings.
    #[serde(default)]
    pub audience_configuration: Configuration,
}

impl AudienceSubscriptionRequest {
    pub fn new(audience_id: impl Into<String>, action: SubscriptionAction) -> Self {
        Self {
            id: None,
            audience_id: audience_id.into(),
            audience_name: None,
            action,
            account_configuration: Configuration::new(),
            audience_configuration: Configuration::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudienceSubscriptionResponse {
    pub request_id: RequestId,
    pub audience_id: String,
    pub action: SubscriptionAction,
}
