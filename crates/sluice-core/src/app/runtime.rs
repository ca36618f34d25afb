//! Runtime: the assembled adapter, built by [`AppBuilder`](super::AppBuilder).
//!
//! `Send + Sync`; share it behind an `Arc` to serve batches concurrently.

use std::sync::Arc;

use tracing::warn;

use super::audience::{AudienceService, SubscriptionError};
use super::processor::{BatchError, BatchProcessor};
use super::registration::RegistrationService;
use crate::domain::{
    AudienceSubscriptionRequest, AudienceSubscriptionResponse, Batch, BatchResult, Manifest,
};
use crate::protocol::{ErrorCode, Request, Response};

pub struct Runtime {
    registration: RegistrationService,
    processor: BatchProcessor,
    audience: AudienceService,
}

impl Runtime {
    pub(crate) fn new(
        registration: RegistrationService,
        processor: BatchProcessor,
        audience: AudienceService,
    ) -> Self {
        Self {
            registration,
            processor,
            audience,
        }
    }

    pub fn register(&self) -> Arc<Manifest> {
        self.registration.register()
    }

    pub async fn process(&self, batch: Batch) -> Result<BatchResult, BatchError> {
        self.processor.process(batch).await
    }

    pub async fn subscribe_audience(
        &self,
        request: AudienceSubscriptionRequest,
    ) -> Result<AudienceSubscriptionResponse, SubscriptionError> {
        self.audience.subscribe(request).await
    }

    /// Answer one protocol request. Errors come back as an `error` document.
    pub async fn handle(&self, request: Request) -> Response {
        match request {
            Request::RegistrationRequest => self.registration.response(),
            Request::EventProcessingRequest(batch) => match self.process(batch).await {
                Ok(result) => Response::EventProcessingResponse(result.into()),
                Err(e) => Response::Error((&e).into()),
            },
            Request::AudienceSubscriptionRequest(request) => {
                match self.subscribe_audience(request).await {
                    Ok(response) => Response::AudienceSubscriptionResponse(response),
                    Err(e) => Response::Error((&e).into()),
                }
            }
        }
    }

    /// Parse and answer one JSON request. A document that does not parse
    /// gets a `MALFORMED_REQUEST` error.
    pub async fn handle_json(&self, raw: &str) -> Response {
        match serde_json::from_str::<Request>(raw) {
            Ok(request) => self.handle(request).await,
            Err(e) => {
                warn!(error = %e, "malformed request");
                Response::error(ErrorCode::MalformedRequest, format!("MalformedRequest: {e}"))
            }
        }
    }
}
