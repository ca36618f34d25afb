//! Wire documents exchanged with the host.
//!
//! Every document is a JSON object tagged by `type`:
//!
//! ```text
//! -> {"type":"registration_request"}
//! <- {"type":"registration_response","name":...,"version":...}
//!
//! -> {"type":"event_processing_request","environment":"android","configuration":{...},"records":[...]}
//! <- {"type":"event_processing_response","batch_id":...,"outcomes":[...],"summary":{...}}
//!
//! -> {"type":"audience_subscription_request","audience_id":"seg-1","action":"add",...}
//! <- {"type":"audience_subscription_response","request_id":...,"audience_id":"seg-1","action":"add"}
//!
//! <- {"type":"error","code":"MISSING_REQUIRED_SETTING","message":"MissingRequiredSetting: serviceToken"}
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::{
    AudienceSubscriptionRequest, AudienceSubscriptionResponse, Batch, BatchId, BatchResult,
    BatchSummary, Manifest, RecordOutcome,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    RegistrationRequest,
    EventProcessingRequest(Batch),
    AudienceSubscriptionRequest(AudienceSubscriptionRequest),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    RegistrationResponse(Manifest),
    EventProcessingResponse(EventProcessingResponse),
    AudienceSubscriptionResponse(AudienceSubscriptionResponse),
    Error(ErrorDocument),
}

impl Response {
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Response::Error(ErrorDocument {
            code,
            message: message.into(),
        })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventProcessingResponse {
    pub batch_id: BatchId,
    pub outcomes: Vec<RecordOutcome>,
    pub summary: BatchSummary,
}

impl From<BatchResult> for EventProcessingResponse {
    fn from(result: BatchResult) -> Self {
        let summary = result.summary();
        Self {
            batch_id: result.batch_id,
            outcomes: result.outcomes,
            summary,
        }
    }
}

/// The single top-level error returned instead of any outcomes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDocument {
    pub code: ErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    MissingRequiredSetting,
    InvalidSettingValue,
    SetupFailed,
    CapabilityNotRegistered,
    HandlerFailed,
    MalformedRequest,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::MissingRequiredSetting => "MISSING_REQUIRED_SETTING",
            ErrorCode::InvalidSettingValue => "INVALID_SETTING_VALUE",
            ErrorCode::SetupFailed => "SETUP_FAILED",
            ErrorCode::CapabilityNotRegistered => "CAPABILITY_NOT_REGISTERED",
            ErrorCode::HandlerFailed => "HANDLER_FAILED",
            ErrorCode::MalformedRequest => "MALFORMED_REQUEST",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
