//! Typed record API.
//!
//! Record kinds are tied to payload types at compile time, so a handler for
//! `CustomEvent` can only ever be registered under `custom_event`.
//!
//! - Surface (typed): `RecordPayload`, `Handler<T>`
//! - Inside (dyn): `RecordHandler`, object-safe, stored in `HandlerRegistry`

pub mod handler;
pub mod payload;
pub mod registry;

pub use self::handler::{Handler, RecordHandler, TypedHandler};
pub use self::payload::RecordPayload;
pub use self::registry::{HandlerRegistry, RegistryError};
