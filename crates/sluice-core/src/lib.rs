//! sluice-core
//!
//! Core of a capability-declaring ingestion adapter. An integration declares
//! what it consumes in a [`Manifest`](domain::Manifest), registers one typed
//! handler per record kind, and the runtime turns each inbound batch into one
//! outcome per record.
//!
//! # Modules
//! - **domain**: manifest, settings, permissions, records, batches, outcomes, errors
//! - **ports**: seams for the integration (setup hook, audience hook, clock, ids)
//! - **typed**: typed record payloads, `Handler<T>`, `HandlerRegistry`
//! - **app**: validator, dispatcher, batch processor, registration, builder, runtime
//! - **protocol**: `type`-tagged request/response documents
//! - **impls**: concrete integrations (the sample destination)

pub mod app;
pub mod domain;
pub mod impls;
pub mod ports;
pub mod protocol;
pub mod typed;

pub use impls::sample;
