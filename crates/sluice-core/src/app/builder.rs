//! AppBuilder: wires manifest, handlers and hooks into a [`Runtime`].
//!
//! `build()` is fail-fast. Every registered handler must be covered by the
//! manifest, both its record kind and the identities it reads, so a wiring
//! mistake surfaces at startup instead of as skipped records in production.

use std::sync::Arc;

use tracing::debug;

use super::audience::AudienceService;
use super::config::ProcessorConfig;
use super::processor::BatchProcessor;
use super::registration::RegistrationService;
use super::runtime::Runtime;
use crate::domain::{IdentityType, Manifest, RecordKind};
use crate::ports::setup::{BatchSetup, NoopSetup};
use crate::ports::{AcceptSubscriptions, AudienceSubscriptionHandler, Clock, SystemClock, UlidGenerator};
use crate::typed::{Handler, HandlerRegistry, RecordHandler, RecordPayload, RegistryError};

/// ```ignore
/// let runtime = AppBuilder::new()
///     .manifest(sample_manifest()?)
///     .register::<CustomEvent, _>(ForwardCustomEvents::new(client))?
///     .setup(EnsureUser)
///     .build()?;
/// ```
pub struct AppBuilder {
    manifest: Option<Manifest>,
    registry: HandlerRegistry,
    setup: Arc<dyn BatchSetup>,
    audience_handler: Arc<dyn AudienceSubscriptionHandler>,
    config: ProcessorConfig,
    clock: Arc<dyn Clock>,
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("no manifest was supplied")]
    MissingManifest,

    #[error("handler registered for '{0}', which no capability block declares")]
    UndeclaredHandler(RecordKind),

    #[error("handler for '{kind}' requires identity {identity:?}, which the manifest does not permit")]
    IdentityNotPermitted {
        kind: RecordKind,
        identity: IdentityType,
    },
}

impl AppBuilder {
    pub fn new() -> Self {
        Self {
            manifest: None,
            registry: HandlerRegistry::new(),
            setup: Arc::new(NoopSetup),
            audience_handler: Arc::new(AcceptSubscriptions),
            config: ProcessorConfig::default(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn manifest(mut self, manifest: Manifest) -> Self {
        self.manifest = Some(manifest);
        self
    }

    pub fn register<T: RecordPayload, H: Handler<T> + 'static>(
        mut self,
        handler: H,
    ) -> Result<Self, RegistryError> {
        self.registry.register::<T, H>(handler)?;
        Ok(self)
    }

    pub fn register_dyn(mut self, handler: Arc<dyn RecordHandler>) -> Result<Self, RegistryError> {
        self.registry.register_dyn(handler)?;
        Ok(self)
    }

    pub fn setup(mut self, setup: impl BatchSetup + 'static) -> Self {
        self.setup = Arc::new(setup);
        self
    }

    pub fn audience_handler(mut self, handler: impl AudienceSubscriptionHandler + 'static) -> Self {
        self.audience_handler = Arc::new(handler);
        self
    }

    pub fn config(mut self, config: ProcessorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn build(self) -> Result<Runtime, BuildError> {
        let manifest = self.manifest.ok_or(BuildError::MissingManifest)?;

        for kind in self.registry.registered_kinds() {
            if !manifest.declares_anywhere(&kind) {
                return Err(BuildError::UndeclaredHandler(kind));
            }
        }
        for handler in self.registry.handlers() {
            if let Some(identity) = handler
                .required_identities()
                .iter()
                .find(|identity| !manifest.permissions().permits(**identity))
            {
                return Err(BuildError::IdentityNotPermitted {
                    kind: handler.kind(),
                    identity: *identity,
                });
            }
        }

        let manifest = Arc::new(manifest);
        let ids = Arc::new(UlidGenerator::new(Arc::clone(&self.clock)));
        debug!(
            name = manifest.name(),
            version = manifest.version(),
            handlers = ?self.registry.registered_kinds(),
            "runtime built"
        );

        let processor = BatchProcessor::new(
            Arc::clone(&manifest),
            Arc::new(self.registry),
            self.setup,
            self.clock,
            ids.clone(),
            &self.config,
        );
        let audience = AudienceService::new(Arc::clone(&manifest), self.audience_handler, ids);

        Ok(Runtime::new(
            RegistrationService::from_manifest(manifest),
            processor,
            audience,
        ))
    }
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new()
    }
}
