//! Sample destination: a complete, runnable integration that accepts what
//! it declares and logs it instead of calling a real downstream API.
//!
//! Used by the CLI and as a template for real integrations.

use std::fmt;

use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use crate::app::{AppBuilder, BuildError, ProcessorConfig, Runtime};
use crate::domain::{
    AudienceProcessingRegistration, BatchContext, EncodingPolicy, EventProcessingRegistration,
    HandlerError, IdentityType, Manifest, ManifestError, Permissions, RecordKind,
    RuntimeEnvironment, SetupError, Setting,
};
use crate::ports::AcceptSubscriptions;
use crate::ports::setup::BatchSetup;
use crate::typed::payload::{
    AttributionEvent, AudienceMembershipChange, CustomEvent, PushMessageReceiptEvent,
    PushSubscriptionEvent, UserAttributeChangeEvent, UserIdentityChangeEvent,
};
use crate::typed::{Handler, RecordPayload, RegistryError};

pub const NAME: &str = "Sample Destination";
pub const VERSION: &str = "1.0";
pub const SERVICE_TOKEN: &str = "serviceToken";
pub const CLIENT_SIDE_ID: &str = "clientSideId";

fn service_token() -> Setting {
    Setting::text(SERVICE_TOKEN, "Service Token")
        .required()
        .confidential()
        .with_description("Token used to authenticate against the destination API.")
}

pub fn sample_manifest() -> Result<Manifest, ManifestError> {
    Manifest::builder(NAME, VERSION)
        .description("Forwards events and audience memberships to the sample destination.")
        .permissions(
            Permissions::new()
                .allow_ip_address(true)
                .allow_location(true)
                .with_identity(IdentityType::Email, EncodingPolicy::Raw)
                .with_identity(IdentityType::CustomerId, EncodingPolicy::Raw),
        )
        .event_processing(
            EventProcessingRegistration::new()
                .with_account_settings(vec![service_token()])
                .with_event_types([
                    RecordKind::CustomEvent,
                    RecordKind::PushSubscription,
                    RecordKind::PushMessageReceipt,
                    RecordKind::UserAttributeChange,
                    RecordKind::UserIdentityChange,
                    RecordKind::Attribution,
                ])
                .with_environments([RuntimeEnvironment::Android, RuntimeEnvironment::Ios]),
        )
        .audience_processing(
            AudienceProcessingRegistration::new()
                .with_account_settings(vec![service_token()])
                .with_audience_connection_settings(vec![
                    Setting::text(CLIENT_SIDE_ID, "Client-side ID")
                        .visible(true)
                        .with_description("Client-side ID of the destination project."),
                ]),
        )
        .build()
}

/// Accepts any payload and logs it.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogRecords;

#[async_trait]
impl<T: RecordPayload + fmt::Debug> Handler<T> for LogRecords {
    async fn handle(&self, payload: T, ctx: &BatchContext) -> Result<(), HandlerError> {
        info!(
            batch_id = %ctx.batch_id,
            kind = %T::KIND,
            identities = ctx.user_identities.len(),
            payload = ?payload,
            "record accepted"
        );
        Ok(())
    }
}

/// Logs audience membership changes. Reads the member identities.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMembership;

#[async_trait]
impl Handler<AudienceMembershipChange> for LogMembership {
    async fn handle(
        &self,
        change: AudienceMembershipChange,
        ctx: &BatchContext,
    ) -> Result<(), HandlerError> {
        info!(
            batch_id = %ctx.batch_id,
            audience_id = %change.audience_id,
            action = ?change.action,
            members = change.user_identities.len(),
            "membership change accepted"
        );
        Ok(())
    }

    fn required_identities(&self) -> &[IdentityType] {
        &[IdentityType::Email, IdentityType::CustomerId]
    }
}

/// Stamps each batch with a session record shared by its handlers.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionSetup;

#[async_trait]
impl BatchSetup for SessionSetup {
    async fn setup(&self, ctx: &BatchContext) -> Result<Option<serde_json::Value>, SetupError> {
        Ok(Some(json!({
            "session_id": ctx.batch_id.as_ulid().to_string(),
            "started_at": ctx.received_at.to_rfc3339(),
        })))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SampleError {
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Build(#[from] BuildError),
}

/// Builder with the sample manifest, handlers and hooks already wired.
pub fn sample_builder() -> Result<AppBuilder, SampleError> {
    let builder = AppBuilder::new()
        .manifest(sample_manifest()?)
        .register::<CustomEvent, _>(LogRecords)?
        .register::<PushSubscriptionEvent, _>(LogRecords)?
        .register::<PushMessageReceiptEvent, _>(LogRecords)?
        .register::<UserAttributeChangeEvent, _>(LogRecords)?
        .register::<UserIdentityChangeEvent, _>(LogRecords)?
        .register::<AttributionEvent, _>(LogRecords)?
        .register::<AudienceMembershipChange, _>(LogMembership)?
        .setup(SessionSetup)
        .audience_handler(AcceptSubscriptions);
    Ok(builder)
}

pub fn sample_runtime(config: ProcessorConfig) -> Result<Runtime, SampleError> {
    Ok(sample_builder()?.config(config).build()?)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::domain::{Batch, Configuration, Outcome, Record, SkipReason};

    #[test]
    fn manifest_is_deterministic() {
        assert_eq!(sample_manifest().unwrap(), sample_manifest().unwrap());
    }

    #[test]
    fn manifest_document() {
        let doc = serde_json::to_value(sample_manifest().unwrap()).unwrap();

        assert_eq!(doc["name"], NAME);
        assert_eq!(doc["version"], VERSION);
        let event = &doc["event_processing_registration"];
        assert_eq!(
            event["supported_event_types"],
            json!([
                "custom_event",
                "push_subscription",
                "push_message_receipt",
                "user_attribute_change",
                "user_identity_change",
                "attribution"
            ])
        );
        assert_eq!(event["supported_runtime_environments"], json!(["android", "ios"]));
        assert_eq!(event["account_settings"][0]["key"], SERVICE_TOKEN);
        assert_eq!(event["account_settings"][0]["confidential"], true);
        assert_eq!(
            doc["audience_processing_registration"]["audience_connection_settings"][0]["visible"],
            true
        );
    }

    #[tokio::test]
    async fn mixed_batch_outcomes() {
        let runtime = sample_runtime(ProcessorConfig::default()).unwrap();
        let configuration: Configuration = [(SERVICE_TOKEN, "abc")].into_iter().collect();
        let batch = Batch::new(RuntimeEnvironment::Android, configuration).with_records([
            Record::new(RecordKind::CustomEvent, json!({"name": "open"})),
            Record::new(RecordKind::PushMessageReceipt, json!({"payload": "{}"})),
            Record::new("unknown_type", json!({})),
        ]);

        let result = runtime.process(batch).await.unwrap();
        assert_eq!(
            result.statuses(),
            vec![
                &Outcome::Processed,
                &Outcome::Processed,
                &Outcome::skipped(SkipReason::UnsupportedType)
            ]
        );
    }

    #[tokio::test]
    async fn missing_service_token_rejects() {
        let runtime = sample_runtime(ProcessorConfig::default()).unwrap();
        let batch = Batch::new(RuntimeEnvironment::Ios, Configuration::new())
            .with_record(Record::new(RecordKind::CustomEvent, json!({"name": "open"})));

        let err = runtime.process(batch).await.unwrap_err();
        assert_eq!(err.to_string(), "MissingRequiredSetting: serviceToken");
    }

    #[tokio::test]
    async fn audience_batch_uses_the_audience_block() {
        let runtime = sample_runtime(ProcessorConfig::default()).unwrap();
        let configuration: Configuration = [(SERVICE_TOKEN, "abc")].into_iter().collect();
        let batch = Batch::audience(configuration).with_records([
            Record::new(
                RecordKind::AudienceMembershipChange,
                json!({"audience_id": "seg-1", "action": "add"}),
            ),
            Record::new(RecordKind::CustomEvent, json!({"name": "open"})),
        ]);

        let result = runtime.process(batch).await.unwrap();
        assert_eq!(
            result.statuses(),
            vec![
                &Outcome::Processed,
                &Outcome::skipped(SkipReason::UnsupportedType)
            ]
        );
    }
}
