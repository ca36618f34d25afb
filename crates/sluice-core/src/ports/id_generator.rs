//! IdGenerator port.
//!
//! Ids are ULIDs: the timestamp part comes from a [`Clock`] so tests can pin
//! it, the random part from `rand`.

use ulid::Ulid;

use crate::domain::ids::{BatchId, RequestId};
use crate::ports::Clock;

pub trait IdGenerator: Send + Sync {
    fn generate_batch_id(&self) -> BatchId;

    fn generate_request_id(&self) -> RequestId;
}

pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    fn next(&self) -> Ulid {
        let timestamp_ms = self.clock.now().timestamp_millis() as u64;
        Ulid::from_parts(timestamp_ms, rand::random())
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_batch_id(&self) -> BatchId {
        BatchId::from(self.next())
    }

    fn generate_request_id(&self) -> RequestId {
        RequestId::from(self.next())
    }
}
