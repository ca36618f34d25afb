//! Registration: answers the host's "what can you consume?" question.

use std::sync::Arc;

use crate::domain::Manifest;
use crate::protocol::Response;

/// Holds the manifest built at startup and hands out the same value on every call.
pub struct RegistrationService {
    manifest: Arc<Manifest>,
}

impl RegistrationService {
    pub fn from_manifest(manifest: impl Into<Arc<Manifest>>) -> Self {
        Self {
            manifest: manifest.into(),
        }
    }

    pub fn register(&self) -> Arc<Manifest> {
        Arc::clone(&self.manifest)
    }

    /// The manifest as a `registration_response` document.
    pub fn response(&self) -> Response {
        Response::RegistrationResponse(Manifest::clone(&self.manifest))
    }
}
