//! Record dispatch: one record in, one outcome out.
//!
//! Identities inside a record's data go through the manifest permissions
//! before the handler sees them.
//!
//! Nothing escapes `dispatch`. Undeclared records are skipped, handler errors
//! become `Failed`, and a panicking handler is caught at the task boundary,
//! so one bad record never costs the outcomes of its siblings.

use std::error::Error;
use std::sync::Arc;

use tracing::{error, warn};

use super::config::SkipReasonGranularity;
use crate::domain::{
    BatchContext, HandlerError, Manifest, Outcome, ProcessingScope, Record, SkipReason,
};
use crate::typed::HandlerRegistry;

pub struct Dispatcher {
    manifest: Arc<Manifest>,
    handlers: Arc<HandlerRegistry>,
    skip_reasons: SkipReasonGranularity,
}

impl Dispatcher {
    pub fn new(
        manifest: Arc<Manifest>,
        handlers: Arc<HandlerRegistry>,
        skip_reasons: SkipReasonGranularity,
    ) -> Self {
        Self {
            manifest,
            handlers,
            skip_reasons,
        }
    }

    /// Why `record` would be skipped in `ctx`, if it would.
    ///
    /// Checked in order: environment (event scope only), declared kind,
    /// registered handler.
    pub fn skip_reason(&self, record: &Record, ctx: &BatchContext) -> Option<SkipReason> {
        if ctx.scope == ProcessingScope::Event {
            let environment = record.environment.unwrap_or(ctx.environment);
            if !self.manifest.supports_environment(environment) {
                return Some(SkipReason::UnsupportedEnvironment);
            }
        }
        if !self.manifest.declares(ctx.scope, &record.kind) {
            return Some(SkipReason::UnsupportedType);
        }
        if !self.handlers.contains(&record.kind) {
            return Some(SkipReason::UnsupportedType);
        }
        None
    }

    pub async fn dispatch(&self, record: &Record, ctx: &Arc<BatchContext>) -> Outcome {
        if let Some(reason) = self.skip_reason(record, ctx) {
            return Outcome::skipped(self.skip_reasons.apply(reason));
        }
        let Some(handler) = self.handlers.get(&record.kind) else {
            return Outcome::skipped(self.skip_reasons.apply(SkipReason::UnsupportedType));
        };

        let kind = record.kind.clone();
        let mut owned = record.clone();
        owned.restrict_identities(self.manifest.permissions());
        let ctx = Arc::clone(ctx);
        let joined =
            tokio::spawn(async move { handler.handle_record(&owned, &ctx).await }).await;

        match joined {
            Ok(Ok(())) => Outcome::Processed,
            Ok(Err(e)) => {
                warn!(kind = %kind, retryable = e.is_retryable(), error = %e, "record handler failed");
                Outcome::failed(describe(&e), e.is_retryable())
            }
            Err(join) if join.is_panic() => {
                error!(kind = %kind, "record handler panicked");
                Outcome::failed("handler panicked", false)
            }
            Err(_) => Outcome::failed("handler task cancelled", true),
        }
    }
}

/// `message: cause: cause...`
fn describe(err: &HandlerError) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EventProcessingRegistration, RecordKind, RuntimeEnvironment};
    use crate::typed::handler::test_support::{Counting, Picky, context};
    use crate::typed::payload::{CustomEvent, PushMessageReceiptEvent};
    use serde_json::json;

    fn manifest() -> Arc<Manifest> {
        Arc::new(
            Manifest::builder("test", "1.0")
                .event_processing(
                    EventProcessingRegistration::new()
                        .with_event_types([
                            RecordKind::CustomEvent,
                            RecordKind::PushMessageReceipt,
                            RecordKind::ScreenView,
                        ])
                        .with_environments([RuntimeEnvironment::Android]),
                )
                .build()
                .unwrap(),
        )
    }

    fn dispatcher(granularity: SkipReasonGranularity) -> Dispatcher {
        let mut handlers = HandlerRegistry::new();
        handlers.register::<CustomEvent, _>(Picky).unwrap();
        handlers
            .register::<PushMessageReceiptEvent, _>(Counting::default())
            .unwrap();
        Dispatcher::new(manifest(), Arc::new(handlers), granularity)
    }

    #[tokio::test]
    async fn processed_when_declared_and_handled() {
        let d = dispatcher(SkipReasonGranularity::Distinct);
        let ctx = Arc::new(context());
        let record = Record::new(RecordKind::CustomEvent, json!({"name": "open"}));
        assert_eq!(d.dispatch(&record, &ctx).await, Outcome::Processed);
    }

    #[tokio::test]
    async fn skip_reasons() {
        let d = dispatcher(SkipReasonGranularity::Distinct);
        let ctx = Arc::new(context());

        let unknown = Record::new("hologram", json!({}));
        assert_eq!(
            d.dispatch(&unknown, &ctx).await,
            Outcome::skipped(SkipReason::UnsupportedType)
        );

        // declared but nobody handles it
        let unhandled = Record::new(RecordKind::ScreenView, json!({"screen_name": "home"}));
        assert_eq!(
            d.dispatch(&unhandled, &ctx).await,
            Outcome::skipped(SkipReason::UnsupportedType)
        );

        let wrong_env = Record::new(RecordKind::CustomEvent, json!({"name": "open"}))
            .with_environment(RuntimeEnvironment::Web);
        assert_eq!(
            d.dispatch(&wrong_env, &ctx).await,
            Outcome::skipped(SkipReason::UnsupportedEnvironment)
        );
    }

    #[tokio::test]
    async fn merged_granularity_hides_the_distinction() {
        let d = dispatcher(SkipReasonGranularity::Merged);
        let ctx = Arc::new(context());
        let wrong_env = Record::new(RecordKind::CustomEvent, json!({"name": "x"}))
            .with_environment(RuntimeEnvironment::Roku);
        assert_eq!(
            d.dispatch(&wrong_env, &ctx).await,
            Outcome::skipped(SkipReason::Unsupported)
        );
    }

    #[tokio::test]
    async fn handler_error_becomes_failed() {
        let d = dispatcher(SkipReasonGranularity::Distinct);
        let ctx = Arc::new(context());
        let record = Record::new(RecordKind::CustomEvent, json!({"name": "boom"}));
        assert_eq!(
            d.dispatch(&record, &ctx).await,
            Outcome::failed("downstream unavailable", true)
        );
    }

    #[tokio::test]
    async fn decode_error_includes_cause() {
        let d = dispatcher(SkipReasonGranularity::Distinct);
        let ctx = Arc::new(context());
        let record = Record::new(RecordKind::CustomEvent, json!({"name": 17}));
        match d.dispatch(&record, &ctx).await {
            Outcome::Failed { error, retryable } => {
                assert!(!retryable);
                let (message, cause) = error.split_once(": ").unwrap();
                assert_eq!(message, "invalid custom_event payload");
                assert!(cause.contains("invalid type"), "cause was {cause:?}");
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[tokio::test]
    async fn panic_is_contained() {
        let d = dispatcher(SkipReasonGranularity::Distinct);
        let ctx = Arc::new(context());
        let record = Record::new(RecordKind::CustomEvent, json!({"name": "panic"}));
        assert_eq!(
            d.dispatch(&record, &ctx).await,
            Outcome::failed("handler panicked", false)
        );

        // the dispatcher is still usable afterwards
        let next = Record::new(RecordKind::PushMessageReceipt, json!({}));
        assert_eq!(d.dispatch(&next, &ctx).await, Outcome::Processed);
    }
}
