//! Audience subscriptions: validate, then hand to the integration's hook.

use std::sync::Arc;

use tracing::{Instrument, info, info_span, warn};

use super::validator::{self, ValidationError};
use crate::domain::{
    AudienceSubscriptionRequest, AudienceSubscriptionResponse, Configuration, HandlerError,
    Manifest, RequestId, Setting,
};
use crate::ports::{AudienceSubscriptionHandler, IdGenerator};
use crate::protocol::{ErrorCode, ErrorDocument};

#[derive(Debug, thiserror::Error)]
pub enum SubscriptionError {
    #[error("CapabilityNotRegistered: no audience processing block in the manifest")]
    CapabilityNotRegistered,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("HandlerFailed: {0}")]
    HandlerFailed(#[source] HandlerError),
}

impl SubscriptionError {
    pub fn code(&self) -> ErrorCode {
        match self {
            SubscriptionError::CapabilityNotRegistered => ErrorCode::CapabilityNotRegistered,
            SubscriptionError::Validation(e) => e.code(),
            SubscriptionError::HandlerFailed(_) => ErrorCode::HandlerFailed,
        }
    }
}

impl From<&SubscriptionError> for ErrorDocument {
    fn from(error: &SubscriptionError) -> Self {
        ErrorDocument {
            code: error.code(),
            message: error.to_string(),
        }
    }
}

pub struct AudienceService {
    manifest: Arc<Manifest>,
    handler: Arc<dyn AudienceSubscriptionHandler>,
    ids: Arc<dyn IdGenerator>,
}

impl AudienceService {
    pub fn new(
        manifest: Arc<Manifest>,
        handler: Arc<dyn AudienceSubscriptionHandler>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            manifest,
            handler,
            ids,
        }
    }

    pub async fn subscribe(
        &self,
        mut request: AudienceSubscriptionRequest,
    ) -> Result<AudienceSubscriptionResponse, SubscriptionError> {
        let request_id = *request
            .id
            .get_or_insert_with(|| self.ids.generate_request_id());
        let span = info_span!(
            "audience_subscription",
            request_id = %request_id,
            audience_id = %request.audience_id,
            action = ?request.action
        );

        self.apply(request, request_id).instrument(span).await
    }

    async fn apply(
        &self,
        mut request: AudienceSubscriptionRequest,
        request_id: RequestId,
    ) -> Result<AudienceSubscriptionResponse, SubscriptionError> {
        let audience = self
            .manifest
            .audience_processing()
            .ok_or(SubscriptionError::CapabilityNotRegistered)?;

        request.account_configuration =
            checked(&request.account_configuration, audience.account_settings())?;
        request.audience_configuration = checked(
            &request.audience_configuration,
            audience.audience_connection_settings(),
        )?;

        self.handler.subscribe(&request).await.map_err(|e| {
            warn!(retryable = e.is_retryable(), error = %e, "audience hook failed");
            SubscriptionError::HandlerFailed(e)
        })?;

        info!("audience subscription applied");
        Ok(AudienceSubscriptionResponse {
            request_id,
            audience_id: request.audience_id,
            action: request.action,
        })
    }
}

fn checked(
    configuration: &Configuration,
    settings: &[Setting],
) -> Result<Configuration, ValidationError> {
    let filled = validator::with_defaults(configuration, settings);
    let report = validator::validate(&filled, settings)?;
    for key in report.unknown_keys() {
        warn!(key, "unknown setting ignored");
    }
    Ok(filled)
}
