//! Audience subscription hook.

use async_trait::async_trait;

use crate::domain::{AudienceSubscriptionRequest, HandlerError};

/// Applies an audience connect/update/delete on the destination.
///
/// Called only after the request's account and audience configuration have
/// passed validation.
#[async_trait]
pub trait AudienceSubscriptionHandler: Send + Sync {
    async fn subscribe(&self, request: &AudienceSubscriptionRequest) -> Result<(), HandlerError>;
}

/// Accepts every subscription without side effects.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptSubscriptions;

#[async_trait]
impl AudienceSubscriptionHandler for AcceptSubscriptions {
    async fn subscribe(&self, _request: &AudienceSubscriptionRequest) -> Result<(), HandlerError> {
        Ok(())
    }
}
