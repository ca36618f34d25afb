//! Batch setup hook: runs once per batch before any record is dispatched.

use async_trait::async_trait;

use crate::domain::{BatchContext, SetupError};

/// Prepares state shared by every record of one batch, e.g. making sure the
/// user exists downstream once instead of per record.
///
/// The returned value is stored in [`BatchContext::session`]. An error
/// rejects the whole batch; no handler runs.
#[async_trait]
pub trait BatchSetup: Send + Sync {
    async fn setup(&self, ctx: &BatchContext) -> Result<Option<serde_json::Value>, SetupError>;
}

/// Setup hook that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSetup;

#[async_trait]
impl BatchSetup for NoopSetup {
    async fn setup(&self, _ctx: &BatchContext) -> Result<Option<serde_json::Value>, SetupError> {
        Ok(None)
    }
}
