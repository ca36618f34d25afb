//! Handler registry: record kind -> handler.
//!
//! Built mutably during wiring, then frozen behind an `Arc` and only read
//! while batches are processed, so lookups need no locking.

use std::collections::HashMap;
use std::sync::Arc;

use super::handler::{Handler, RecordHandler, TypedHandler};
use super::payload::RecordPayload;
use crate::domain::RecordKind;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("handler for record kind '{0}' is already registered")]
    AlreadyRegistered(RecordKind),

    #[error("cannot register a handler for unknown record kind '{0}'")]
    UnknownKind(RecordKind),
}

#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<RecordKind, Arc<dyn RecordHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a typed handler under `T::KIND`.
    pub fn register<T: RecordPayload, H: Handler<T> + 'static>(
        &mut self,
        handler: H,
    ) -> Result<(), RegistryError> {
        self.register_dyn(Arc::new(TypedHandler::<T, H>::new(handler)))
    }

    /// Register an already type-erased handler under its own `kind()`.
    pub fn register_dyn(&mut self, handler: Arc<dyn RecordHandler>) -> Result<(), RegistryError> {
        let kind = handler.kind();
        if !kind.is_known() {
            return Err(RegistryError::UnknownKind(kind));
        }
        if self.handlers.contains_key(&kind) {
            return Err(RegistryError::AlreadyRegistered(kind));
        }
        self.handlers.insert(kind, handler);
        Ok(())
    }

    pub fn get(&self, kind: &RecordKind) -> Option<Arc<dyn RecordHandler>> {
        self.handlers.get(kind).cloned()
    }

    pub fn contains(&self, kind: &RecordKind) -> bool {
        self.handlers.contains_key(kind)
    }

    /// Registered kinds in a stable order.
    pub fn registered_kinds(&self) -> Vec<RecordKind> {
        let mut kinds: Vec<RecordKind> = self.handlers.keys().cloned().collect();
        kinds.sort();
        kinds
    }

    pub fn handlers(&self) -> impl Iterator<Item = &Arc<dyn RecordHandler>> {
        self.handlers.values()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
