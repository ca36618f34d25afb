//! Application layer: components that combine the domain, ports and typed
//! handlers into a working adapter.
//!
//! - **AppBuilder**: wiring and fail-fast startup checks
//! - **Runtime**: register / process / subscribe_audience / handle
//! - **BatchProcessor**: validate, set up, dispatch, assemble
//! - **Dispatcher**: one record to one outcome
//! - **validator**: settings checks
//! - **RegistrationService**, **AudienceService**

pub mod audience;
pub mod builder;
pub mod config;
pub mod dispatcher;
pub mod processor;
pub mod registration;
pub mod runtime;
pub mod validator;

pub use self::audience::{AudienceService, SubscriptionError};
pub use self::builder::{AppBuilder, BuildError};
pub use self::config::{ProcessorConfig, SkipReasonGranularity};
pub use self::dispatcher::Dispatcher;
pub use self::processor::{BatchError, BatchProcessor};
pub use self::registration::RegistrationService;
pub use self::runtime::Runtime;
pub use self::validator::{ValidationError, ValidationReport, ValidationWarning};
