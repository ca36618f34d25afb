//! Ports: seams where the surrounding integration plugs in.
//!
//! Record handlers have their own typed layer in `crate::typed`; the traits
//! here cover everything else the core calls out to.

pub mod audience;
pub mod clock;
pub mod id_generator;
pub mod setup;

pub use self::audience::{AcceptSubscriptions, AudienceSubscriptionHandler};
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::setup::{BatchSetup, NoopSetup};
