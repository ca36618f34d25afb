//! Record handlers.
//!
//! Two layers:
//! - `Handler<T>`: what an integration implements, one per payload type.
//! - `RecordHandler`: object-safe form stored in the registry. `TypedHandler`
//!   erases `T` by decoding the record's JSON data first.

use std::marker::PhantomData;

use async_trait::async_trait;

use super::payload::RecordPayload;
use crate::domain::{BatchContext, HandlerError, IdentityType, Record, RecordKind};

/// Handles one payload type.
///
/// ```ignore
/// struct Forward;
///
/// #[async_trait]
/// impl Handler<CustomEvent> for Forward {
///     async fn handle(&self, event: CustomEvent, ctx: &BatchContext) -> Result<(), HandlerError> {
///         client.track(ctx.setting("serviceToken"), &event.name).await
///             .map_err(|e| HandlerError::transient("track failed").with_source(e))
///     }
/// }
/// ```
#[async_trait]
pub trait Handler<T: RecordPayload>: Send + Sync {
    async fn handle(&self, payload: T, ctx: &BatchContext) -> Result<(), HandlerError>;

    /// Identity types this handler reads from the context or payload.
    /// Each must be permitted by the manifest or the runtime refuses to build.
    fn required_identities(&self) -> &[IdentityType] {
        &[]
    }
}

/// Object-safe handler keyed by record kind.
#[async_trait]
pub trait RecordHandler: Send + Sync {
    async fn handle_record(&self, record: &Record, ctx: &BatchContext)
    -> Result<(), HandlerError>;

    fn kind(&self) -> RecordKind;

    fn required_identities(&self) -> &[IdentityType] {
        &[]
    }
}

pub struct TypedHandler<T: RecordPayload, H: Handler<T>> {
    handler: H,
    _marker: PhantomData<fn() -> T>,
}

impl<T: RecordPayload, H: Handler<T>> TypedHandler<T, H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<T: RecordPayload, H: Handler<T>> RecordHandler for TypedHandler<T, H> {
    async fn handle_record(
        &self,
        record: &Record,
        ctx: &BatchContext,
    ) -> Result<(), HandlerError> {
        let data = if record.data.is_null() {
            serde_json::Value::Object(serde_json::Map::new())
        } else {
            record.data.clone()
        };
        let payload: T = serde_json::from_value(data).map_err(|e| {
            HandlerError::permanent(format!("invalid {} payload", T::KIND)).with_source(e)
        })?;
        self.handler.handle(payload, ctx).await
    }

    fn kind(&self) -> RecordKind {
        T::KIND
    }

    fn required_identities(&self) -> &[IdentityType] {
        self.handler.required_identities()
    }
}
