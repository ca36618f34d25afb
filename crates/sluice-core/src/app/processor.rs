//! BatchProcessor: one batch in, one `BatchResult` (or one `BatchError`) out.
//!
//! Phases: `Received -> Validating -> (Rejected | Setup -> Dispatching -> Assembling -> Complete)`.
//! Settings and setup failures reject the batch outright; everything after
//! that is recorded per record.

use std::sync::Arc;

use tracing::{Instrument, debug, info, info_span, warn};

use super::config::ProcessorConfig;
use super::dispatcher::Dispatcher;
use super::validator::{self, ValidationError};
use crate::domain::{
    Batch, BatchContext, BatchId, BatchPhase, BatchResult, Configuration, Manifest,
    ProcessingScope, RecordOutcome, RecordRef, SetupError,
};
use crate::ports::setup::BatchSetup;
use crate::ports::{Clock, IdGenerator};
use crate::protocol::{ErrorCode, ErrorDocument};
use crate::typed::HandlerRegistry;

/// Batch-fatal errors. A batch that fails with one of these has no outcomes.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("SetupError: {0}")]
    Setup(#[source] SetupError),

    #[error("CapabilityNotRegistered: no {0} processing block in the manifest")]
    CapabilityNotRegistered(ProcessingScope),
}

impl BatchError {
    pub fn code(&self) -> ErrorCode {
        match self {
            BatchError::Validation(e) => e.code(),
            BatchError::Setup(_) => ErrorCode::SetupFailed,
            BatchError::CapabilityNotRegistered(_) => ErrorCode::CapabilityNotRegistered,
        }
    }
}

impl From<&BatchError> for ErrorDocument {
    fn from(error: &BatchError) -> Self {
        ErrorDocument {
            code: error.code(),
            message: error.to_string(),
        }
    }
}

/// Tracks the phase of one batch and logs each transition.
struct PhaseTracker {
    phase: BatchPhase,
}

impl PhaseTracker {
    fn new() -> Self {
        Self {
            phase: BatchPhase::Received,
        }
    }

    fn advance(&mut self, next: BatchPhase) {
        debug_assert!(
            self.phase.can_transition_to(next),
            "illegal batch phase transition {:?} -> {:?}",
            self.phase,
            next
        );
        debug!(from = ?self.phase, to = ?next, "batch phase");
        self.phase = next;
    }
}

pub struct BatchProcessor {
    manifest: Arc<Manifest>,
    dispatcher: Dispatcher,
    setup: Arc<dyn BatchSetup>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl BatchProcessor {
    pub fn new(
        manifest: Arc<Manifest>,
        handlers: Arc<HandlerRegistry>,
        setup: Arc<dyn BatchSetup>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
        config: &ProcessorConfig,
    ) -> Self {
        let dispatcher = Dispatcher::new(Arc::clone(&manifest), handlers, config.skip_reasons);
        Self {
            manifest,
            dispatcher,
            setup,
            clock,
            ids,
        }
    }

    pub async fn process(&self, batch: Batch) -> Result<BatchResult, BatchError> {
        let batch_id = batch.id.unwrap_or_else(|| self.ids.generate_batch_id());
        let span = info_span!("batch", batch_id = %batch_id, scope = ?batch.scope);
        self.run(batch, batch_id).instrument(span).await
    }

    async fn run(&self, batch: Batch, batch_id: BatchId) -> Result<BatchResult, BatchError> {
        let mut phase = PhaseTracker::new();

        phase.advance(BatchPhase::Validating);
        let configuration = match self.validated_configuration(&batch) {
            Ok(configuration) => configuration,
            Err(e) => {
                phase.advance(BatchPhase::Rejected);
                warn!(code = %e.code(), error = %e, "batch rejected");
                return Err(e);
            }
        };

        let permissions = self.manifest.permissions();
        let ctx = BatchContext {
            batch_id,
            scope: batch.scope,
            environment: batch.environment,
            configuration,
            user_identities: permissions.apply(&batch.user_identities),
            ip_address: batch.ip_address.filter(|_| permissions.ip_address_allowed()),
            location: batch.location.filter(|_| permissions.location_allowed()),
            received_at: self.clock.now(),
            session: None,
        };

        phase.advance(BatchPhase::Setup);
        let ctx = match self.setup.setup(&ctx).await {
            Ok(session) => Arc::new(BatchContext { session, ..ctx }),
            Err(e) => {
                phase.advance(BatchPhase::Rejected);
                let e = BatchError::Setup(e);
                warn!(code = %e.code(), error = %e, "batch rejected");
                return Err(e);
            }
        };

        phase.advance(BatchPhase::Dispatching);
        let mut outcomes = Vec::with_capacity(batch.records.len());
        for (index, record) in batch.records.iter().enumerate() {
            let outcome = self.dispatcher.dispatch(record, &ctx).await;
            debug!(index, kind = %record.kind, outcome = ?outcome, "record dispatched");
            outcomes.push(RecordOutcome {
                record: RecordRef::of(index, record),
                outcome,
            });
        }

        phase.advance(BatchPhase::Assembling);
        let result = BatchResult::new(batch_id, outcomes);
        let summary = result.summary();

        phase.advance(BatchPhase::Complete);
        info!(
            total = summary.total,
            processed = summary.processed,
            skipped = summary.skipped,
            failed = summary.failed,
            "batch complete"
        );
        Ok(result)
    }

    fn validated_configuration(&self, batch: &Batch) -> Result<Configuration, BatchError> {
        let settings = self
            .manifest
            .settings_for(batch.scope)
            .ok_or(BatchError::CapabilityNotRegistered(batch.scope))?;

        let configuration = validator::with_defaults(&batch.configuration, settings);
        let report = validator::validate(&configuration, settings)?;
        for key in report.unknown_keys() {
            warn!(key, "unknown setting ignored");
        }
        Ok(configuration)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    use super::*;
    use crate::domain::{
        AudienceProcessingRegistration, EncodingPolicy, EventProcessingRegistration, IdentityType,
        Outcome, Permissions, Record, RecordKind, RuntimeEnvironment, Setting, SkipReason,
        UserIdentity,
    };
    use crate::ports::setup::NoopSetup;
    use crate::ports::{FixedClock, UlidGenerator};
    use crate::typed::handler::test_support::{Counting, Picky};
    use crate::typed::Handler;
    use crate::typed::payload::{AudienceMembershipChange, CustomEvent, PushMessageReceiptEvent};

    fn manifest() -> Arc<Manifest> {
        Arc::new(
            Manifest::builder("test", "1.0")
                .permissions(
                    Permissions::new()
                        .allow_location(true)
                        .with_identity(IdentityType::Email, EncodingPolicy::Sha256),
                )
                .event_processing(
                    EventProcessingRegistration::new()
                        .with_account_settings(vec![
                            Setting::text("serviceToken", "Service token")
                                .required()
                                .confidential(),
                        ])
                        .with_event_types([RecordKind::CustomEvent, RecordKind::PushMessageReceipt])
                        .with_environments([RuntimeEnvironment::Android, RuntimeEnvironment::Ios]),
                )
                .build()
                .unwrap(),
        )
    }

    fn processor_with(handlers: HandlerRegistry, setup: Arc<dyn BatchSetup>) -> BatchProcessor {
        processor_for(manifest(), handlers, setup)
    }

    fn processor_for(
        manifest: Arc<Manifest>,
        handlers: HandlerRegistry,
        setup: Arc<dyn BatchSetup>,
    ) -> BatchProcessor {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(at));
        BatchProcessor::new(
            manifest,
            Arc::new(handlers),
            setup,
            Arc::clone(&clock),
            Arc::new(UlidGenerator::new(clock)),
            &ProcessorConfig::default(),
        )
    }

    fn counting_processor() -> (BatchProcessor, Counting) {
        let counting = Counting::default();
        let mut handlers = HandlerRegistry::new();
        handlers.register::<CustomEvent, _>(counting.clone()).unwrap();
        handlers
            .register::<PushMessageReceiptEvent, _>(counting.clone())
            .unwrap();
        (processor_with(handlers, Arc::new(NoopSetup)), counting)
    }

    fn configured() -> Configuration {
        [("serviceToken", "abc")].into_iter().collect()
    }

    #[tokio::test]
    async fn mixed_batch_gets_one_outcome_per_record() {
        let (processor, counting) = counting_processor();
        let batch = Batch::new(RuntimeEnvironment::Android, configured()).with_records([
            Record::new(RecordKind::CustomEvent, json!({"name": "open"})),
            Record::new(RecordKind::PushMessageReceipt, json!({})),
            Record::new("mystery_type", json!({})),
        ]);

        let result = processor.process(batch).await.unwrap();

        assert_eq!(
            result.statuses(),
            vec![
                &Outcome::Processed,
                &Outcome::Processed,
                &Outcome::skipped(SkipReason::UnsupportedType),
            ]
        );
        assert_eq!(counting.count(), 2);
    }

    #[tokio::test]
    async fn undeclared_setting_is_ignored() {
        let (processor, counting) = counting_processor();
        let configuration: Configuration = [("serviceToken", "abc"), ("legacyFlag", "on")]
            .into_iter()
            .collect();
        let batch = Batch::new(RuntimeEnvironment::Ios, configuration)
            .with_record(Record::new(RecordKind::CustomEvent, json!({"name": "open"})));

        let result = processor.process(batch).await.unwrap();

        assert_eq!(result.statuses(), vec![&Outcome::Processed]);
        assert_eq!(counting.count(), 1);
    }

    #[tokio::test]
    async fn missing_required_setting_rejects_the_batch() {
        let (processor, counting) = counting_processor();
        let batch = Batch::new(RuntimeEnvironment::Android, Configuration::new())
            .with_record(Record::new(RecordKind::CustomEvent, json!({"name": "open"})));

        let err = processor.process(batch).await.unwrap_err();

        assert_eq!(err.to_string(), "MissingRequiredSetting: serviceToken");
        assert_eq!(err.code(), ErrorCode::MissingRequiredSetting);
        assert_eq!(counting.count(), 0);
    }

    #[tokio::test]
    async fn audience_batch_without_audience_block_is_rejected() {
        let (processor, _) = counting_processor();
        let err = processor
            .process(Batch::audience(configured()))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BatchError::CapabilityNotRegistered(ProcessingScope::Audience)
        ));
        assert_eq!(
            err.to_string(),
            "CapabilityNotRegistered: no audience processing block in the manifest"
        );
    }

    #[tokio::test]
    async fn one_failing_record_does_not_affect_the_others() {
        let mut handlers = HandlerRegistry::new();
        handlers.register::<CustomEvent, _>(Picky).unwrap();
        let processor = processor_with(handlers, Arc::new(NoopSetup));

        let batch = Batch::new(RuntimeEnvironment::Ios, configured()).with_records([
            Record::new(RecordKind::CustomEvent, json!({"name": "a"})).with_id("r0"),
            Record::new(RecordKind::CustomEvent, json!({"name": "boom"})).with_id("r1"),
            Record::new(RecordKind::CustomEvent, json!({"name": "panic"})).with_id("r2"),
            Record::new(RecordKind::CustomEvent, json!({"name": "d"})).with_id("r3"),
        ]);

        let result = processor.process(batch).await.unwrap();

        let ids: Vec<_> = result
            .outcomes
            .iter()
            .map(|o| o.record.id.as_deref().unwrap())
            .collect();
        assert_eq!(ids, vec!["r0", "r1", "r2", "r3"]);
        assert_eq!(
            result.statuses(),
            vec![
                &Outcome::Processed,
                &Outcome::failed("downstream unavailable", true),
                &Outcome::failed("handler panicked", false),
                &Outcome::Processed,
            ]
        );
    }

    struct FailingSetup;

    #[async_trait]
    impl BatchSetup for FailingSetup {
        async fn setup(
            &self,
            _ctx: &BatchContext,
        ) -> Result<Option<serde_json::Value>, SetupError> {
            Err(SetupError::new("session service unreachable"))
        }
    }

    #[tokio::test]
    async fn setup_failure_rejects_without_calling_handlers() {
        let counting = Counting::default();
        let mut handlers = HandlerRegistry::new();
        handlers.register::<CustomEvent, _>(counting.clone()).unwrap();
        let processor = processor_with(handlers, Arc::new(FailingSetup));

        let batch = Batch::new(RuntimeEnvironment::Android, configured())
            .with_record(Record::new(RecordKind::CustomEvent, json!({"name": "open"})));
        let err = processor.process(batch).await.unwrap_err();

        assert_eq!(err.code(), ErrorCode::SetupFailed);
        assert_eq!(err.to_string(), "SetupError: session service unreachable");
        assert_eq!(counting.count(), 0);
    }

    /// Records what each handler call saw in its context.
    #[derive(Clone, Default)]
    struct Inspect {
        seen: Arc<std::sync::Mutex<Vec<BatchContext>>>,
    }

    #[async_trait]
    impl Handler<CustomEvent> for Inspect {
        async fn handle(
            &self,
            _e: CustomEvent,
            ctx: &BatchContext,
        ) -> Result<(), crate::domain::HandlerError> {
            self.seen.lock().unwrap().push(ctx.clone());
            Ok(())
        }
    }

    struct StampSetup(Arc<AtomicUsize>);

    #[async_trait]
    impl BatchSetup for StampSetup {
        async fn setup(
            &self,
            _ctx: &BatchContext,
        ) -> Result<Option<serde_json::Value>, SetupError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(Some(json!({"session": "s-1"})))
        }
    }

    #[tokio::test]
    async fn context_is_filtered_and_carries_the_session() {
        let inspect = Inspect::default();
        let setups = Arc::new(AtomicUsize::new(0));
        let mut handlers = HandlerRegistry::new();
        handlers.register::<CustomEvent, _>(inspect.clone()).unwrap();
        let processor = processor_with(handlers, Arc::new(StampSetup(Arc::clone(&setups))));

        let mut batch = Batch::new(RuntimeEnvironment::Android, configured())
            .with_identity(UserIdentity::new(IdentityType::Email, "a@example.com"))
            .with_identity(UserIdentity::new(IdentityType::CustomerId, "c-42"))
            .with_records([
                Record::new(RecordKind::CustomEvent, json!({"name": "a"})),
                Record::new(RecordKind::CustomEvent, json!({"name": "b"})),
            ]);
        batch.ip_address = Some("10.0.0.1".to_string());

        processor.process(batch).await.unwrap();

        assert_eq!(setups.load(Ordering::SeqCst), 1);
        let seen = inspect.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        let ctx = &seen[0];
        assert_eq!(ctx.user_identities.len(), 1);
        assert_eq!(ctx.user_identities[0].identity, IdentityType::Email);
        assert_eq!(
            ctx.user_identities[0].value,
            EncodingPolicy::Sha256.encode("a@example.com")
        );
        assert!(ctx.ip_address.is_none());
        assert_eq!(ctx.session, Some(json!({"session": "s-1"})));
        assert_eq!(ctx.setting("serviceToken"), Some("abc"));
    }

    #[derive(Clone, Default)]
    struct Members {
        seen: Arc<std::sync::Mutex<Vec<UserIdentity>>>,
    }

    #[async_trait]
    impl Handler<AudienceMembershipChange> for Members {
        async fn handle(
            &self,
            change: AudienceMembershipChange,
            _ctx: &BatchContext,
        ) -> Result<(), crate::domain::HandlerError> {
            self.seen.lock().unwrap().extend(change.user_identities);
            Ok(())
        }
    }

    #[tokio::test]
    async fn payload_identities_are_filtered_and_encoded() {
        let manifest = Manifest::builder("test", "1.0")
            .permissions(Permissions::new().with_identity(IdentityType::Email, EncodingPolicy::Sha256))
            .audience_processing(AudienceProcessingRegistration::new())
            .build()
            .unwrap();
        let members = Members::default();
        let mut handlers = HandlerRegistry::new();
        handlers
            .register::<AudienceMembershipChange, _>(members.clone())
            .unwrap();
        let processor = processor_for(Arc::new(manifest), handlers, Arc::new(NoopSetup));

        let batch = Batch::audience(Configuration::new()).with_record(Record::new(
            RecordKind::AudienceMembershipChange,
            json!({
                "audience_id": "seg-1",
                "action": "add",
                "user_identities": [
                    {"type": "email", "value": "a@b.c"},
                    {"type": "facebook", "value": "fb-1"}
                ]
            }),
        ));

        let result = processor.process(batch).await.unwrap();

        assert_eq!(result.statuses(), vec![&Outcome::Processed]);
        assert_eq!(
            *members.seen.lock().unwrap(),
            vec![UserIdentity::new(
                IdentityType::Email,
                EncodingPolicy::Sha256.encode("a@b.c")
            )]
        );
    }

    #[tokio::test]
    async fn concurrent_batches_do_not_interfere() {
        let (processor, counting) = counting_processor();
        let processor = Arc::new(processor);

        let batch = |n: usize| {
            Batch::new(RuntimeEnvironment::Android, configured()).with_records(
                (0..n).map(|i| {
                    Record::new(RecordKind::CustomEvent, json!({"name": format!("e{i}")}))
                }),
            )
        };

        let (a, b) = tokio::join!(processor.process(batch(3)), processor.process(batch(5)));
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_eq!(a.outcomes.len(), 3);
        assert_eq!(b.outcomes.len(), 5);
        assert_ne!(a.batch_id, b.batch_id);
        assert_eq!(counting.count(), 8);
    }
}
