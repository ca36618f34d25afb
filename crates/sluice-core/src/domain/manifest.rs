//! Capability manifest: what an integration accepts and what it needs.
//!
//! A manifest is assembled once through [`ManifestBuilder`] and is read-only
//! afterwards; the runtime shares it as `Arc<Manifest>` between concurrent
//! batches. Structural problems (duplicate setting keys, empty name, an event
//! block that supports nothing) are reported by `build()`, never at request
//! time.

use std::collections::{BTreeSet, HashSet};

use serde::Serialize;

use super::batch::ProcessingScope;
use super::permissions::Permissions;
use super::record::{RecordKind, RuntimeEnvironment};
use super::setting::Setting;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ManifestError {
    #[error("manifest name must not be empty")]
    EmptyName,

    #[error("manifest version must not be empty")]
    EmptyVersion,

    #[error("duplicate setting key '{key}' in {list}")]
    DuplicateSettingKey { list: &'static str, key: String },

    #[error("event processing is declared but supports no event types")]
    NoSupportedEventTypes,
}

/// Event-processing capability block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EventProcessingRegistration {
    account_settings: Vec<Setting>,
    supported_event_types: BTreeSet<RecordKind>,
    supported_runtime_environments: BTreeSet<RuntimeEnvironment>,
}

impl EventProcessingRegistration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_account_settings(mut self, settings: Vec<Setting>) -> Self {
        self.account_settings = settings;
        self
    }

    pub fn with_event_types(mut self, kinds: impl IntoIterator<Item = RecordKind>) -> Self {
        self.supported_event_types.extend(kinds);
        self
    }

    pub fn with_environments(
        mut self,
        environments: impl IntoIterator<Item = RuntimeEnvironment>,
    ) -> Self {
        self.supported_runtime_environments.extend(environments);
        self
    }

    pub fn account_settings(&self) -> &[Setting] {
        &self.account_settings
    }

    pub fn supported_event_types(&self) -> &BTreeSet<RecordKind> {
        &self.supported_event_types
    }

    pub fn supported_environments(&self) -> &BTreeSet<RuntimeEnvironment> {
        &self.supported_runtime_environments
    }
}

/// Audience-processing capability block.
///
/// Account settings apply to the whole connection; audience connection
/// settings are filled in per audience (segment).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AudienceProcessingRegistration {
    account_settings: Vec<Setting>,
    audience_connection_settings: Vec<Setting>,
}

impl AudienceProcessingRegistration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_account_settings(mut self, settings: Vec<Setting>) -> Self {
        self.account_settings = settings;
        self
    }

    pub fn with_audience_connection_settings(mut self, settings: Vec<Setting>) -> Self {
        self.audience_connection_settings = settings;
        self
    }

    pub fn account_settings(&self) -> &[Setting] {
        &self.account_settings
    }

    pub fn audience_connection_settings(&self) -> &[Setting] {
        &self.audience_connection_settings
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Manifest {
    name: String,
    version: String,
    description: String,
    permissions: Permissions,
    #[serde(skip_serializing_if = "Option::is_none")]
    event_processing_registration: Option<EventProcessingRegistration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    audience_processing_registration: Option<AudienceProcessingRegistration>,
}

impl Manifest {
    pub fn builder(name: impl Into<String>, version: impl Into<String>) -> ManifestBuilder {
        ManifestBuilder::new(name, version)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn permissions(&self) -> &Permissions {
        &self.permissions
    }

    pub fn event_processing(&self) -> Option<&EventProcessingRegistration> {
        self.event_processing_registration.as_ref()
    }

    pub fn audience_processing(&self) -> Option<&AudienceProcessingRegistration> {
        self.audience_processing_registration.as_ref()
    }

    /// Account settings of the event block (empty if not declared).
    pub fn account_settings(&self) -> &[Setting] {
        self.event_processing()
            .map(EventProcessingRegistration::account_settings)
            .unwrap_or_default()
    }

    /// Segment-scoped settings of the audience block (empty if not declared).
    pub fn audience_settings(&self) -> &[Setting] {
        self.audience_processing()
            .map(AudienceProcessingRegistration::audience_connection_settings)
            .unwrap_or_default()
    }

    pub fn supported_event_types(&self) -> BTreeSet<RecordKind> {
        self.event_processing()
            .map(|e| e.supported_event_types().clone())
            .unwrap_or_default()
    }

    pub fn supported_environments(&self) -> BTreeSet<RuntimeEnvironment> {
        self.event_processing()
            .map(|e| e.supported_environments().clone())
            .unwrap_or_default()
    }

    /// Account settings that gate a batch of the given scope, or `None` when
    /// the manifest has no capability block for it.
    pub fn settings_for(&self, scope: ProcessingScope) -> Option<&[Setting]> {
        match scope {
            ProcessingScope::Event => self.event_processing().map(|e| e.account_settings()),
            ProcessingScope::Audience => self.audience_processing().map(|a| a.account_settings()),
        }
    }

    /// Whether records of `kind` are accepted in a batch of `scope`.
    pub fn declares(&self, scope: ProcessingScope, kind: &RecordKind) -> bool {
        match scope {
            ProcessingScope::Event => self
                .event_processing()
                .is_some_and(|e| e.supported_event_types().contains(kind)),
            ProcessingScope::Audience => {
                self.audience_processing().is_some()
                    && *kind == RecordKind::AudienceMembershipChange
            }
        }
    }

    /// Whether any capability block accepts records of `kind`.
    pub fn declares_anywhere(&self, kind: &RecordKind) -> bool {
        self.declares(ProcessingScope::Event, kind) || self.declares(ProcessingScope::Audience, kind)
    }

    pub fn supports_environment(&self, environment: RuntimeEnvironment) -> bool {
        self.event_processing()
            .is_some_and(|e| e.supported_environments().contains(&environment))
    }
}

/// Consuming builder for [`Manifest`].
#[derive(Debug, Clone)]
pub struct ManifestBuilder {
    name: String,
    version: String,
    description: String,
    permissions: Permissions,
    event_processing: Option<EventProcessingRegistration>,
    audience_processing: Option<AudienceProcessingRegistration>,
}

impl ManifestBuilder {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            description: String::new(),
            permissions: Permissions::default(),
            event_processing: None,
            audience_processing: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn permissions(mut self, permissions: Permissions) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn event_processing(mut self, registration: EventProcessingRegistration) -> Self {
        self.event_processing = Some(registration);
        self
    }

    pub fn audience_processing(mut self, registration: AudienceProcessingRegistration) -> Self {
        self.audience_processing = Some(registration);
        self
    }

    pub fn build(self) -> Result<Manifest, ManifestError> {
        if self.name.trim().is_empty() {
            return Err(ManifestError::EmptyName);
        }
        if self.version.trim().is_empty() {
            return Err(ManifestError::EmptyVersion);
        }

        if let Some(event) = &self.event_processing {
            if event.supported_event_types.is_empty() {
                return Err(ManifestError::NoSupportedEventTypes);
            }
            ensure_unique_keys("event_processing.account_settings", &event.account_settings)?;
        }
        if let Some(audience) = &self.audience_processing {
            ensure_unique_keys(
                "audience_processing.account_settings",
                &audience.account_settings,
            )?;
            ensure_unique_keys(
                "audience_processing.audience_connection_settings",
                &audience.audience_connection_settings,
            )?;
        }

        Ok(Manifest {
            name: self.name,
            version: self.version,
            description: self.description,
            permissions: self.permissions,
            event_processing_registration: self.event_processing,
            audience_processing_registration: self.audience_processing,
        })
    }
}

fn ensure_unique_keys(list: &'static str, settings: &[Setting]) -> Result<(), ManifestError> {
    let mut seen = HashSet::new();
    for setting in settings {
        if !seen.insert(setting.key()) {
            return Err(ManifestError::DuplicateSettingKey {
                list,
                key: setting.key().to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EncodingPolicy, IdentityType};

    fn token() -> Setting {
        Setting::text("serviceToken", "Service token")
            .required()
            .confidential()
    }

    #[test]
    fn rejects_duplicate_keys_in_one_list() {
        let err = Manifest::builder("x", "1.0")
            .audience_processing(
                AudienceProcessingRegistration::new()
                    .with_audience_connection_settings(vec![
                        Setting::text("listId", "List"),
                        Setting::integer("listId", "List again"),
                    ]),
            )
            .build()
            .unwrap_err();

        assert_eq!(
            err,
            ManifestError::DuplicateSettingKey {
                list: "audience_processing.audience_connection_settings",
                key: "listId".to_string(),
            }
        );
    }

    #[test]
    fn same_key_in_different_lists_is_fine() {
        let manifest = Manifest::builder("x", "1.0")
            .event_processing(
                EventProcessingRegistration::new()
                    .with_account_settings(vec![token()])
                    .with_event_types([RecordKind::CustomEvent]),
            )
            .audience_processing(
                AudienceProcessingRegistration::new().with_account_settings(vec![token()]),
            )
            .build()
            .unwrap();

        assert_eq!(manifest.account_settings().len(), 1);
        assert!(manifest.audience_settings().is_empty());
    }

    #[test]
    fn name_version_and_event_types_are_mandatory() {
        assert_eq!(
            Manifest::builder(" ", "1.0").build().unwrap_err(),
            ManifestError::EmptyName
        );
        assert_eq!(
            Manifest::builder("x", "").build().unwrap_err(),
            ManifestError::EmptyVersion
        );
        assert_eq!(
            Manifest::builder("x", "1.0")
                .event_processing(EventProcessingRegistration::new())
                .build()
                .unwrap_err(),
            ManifestError::NoSupportedEventTypes
        );
    }

    #[test]
    fn scope_queries() {
        let manifest = Manifest::builder("x", "1.0")
            .event_processing(
                EventProcessingRegistration::new()
                    .with_event_types([RecordKind::CustomEvent])
                    .with_environments([RuntimeEnvironment::Android]),
            )
            .build()
            .unwrap();

        assert!(manifest.declares(ProcessingScope::Event, &RecordKind::CustomEvent));
        assert!(!manifest.declares(ProcessingScope::Event, &RecordKind::ScreenView));
        assert!(!manifest.declares(
            ProcessingScope::Audience,
            &RecordKind::AudienceMembershipChange
        ));
        assert!(manifest.settings_for(ProcessingScope::Audience).is_none());
        assert!(manifest.supports_environment(RuntimeEnvironment::Android));
        assert!(!manifest.supports_environment(RuntimeEnvironment::Web));
    }

    #[test]
    fn wire_shape_has_two_capability_blocks() {
        let manifest = Manifest::builder("x", "1.0")
            .description("d")
            .permissions(
                Permissions::new()
                    .allow_ip_address(true)
                    .with_identity(IdentityType::Email, EncodingPolicy::Raw),
            )
            .event_processing(
                EventProcessingRegistration::new()
                    .with_account_settings(vec![token()])
                    .with_event_types([RecordKind::Attribution, RecordKind::CustomEvent])
                    .with_environments([RuntimeEnvironment::Ios]),
            )
            .audience_processing(
                AudienceProcessingRegistration::new().with_account_settings(vec![token()]),
            )
            .build()
            .unwrap();

        let v = serde_json::to_value(&manifest).unwrap();
        assert_eq!(v["name"], "x");
        assert_eq!(v["permissions"]["allow_ip_address"], true);
        assert_eq!(v["permissions"]["user_identities"][0]["type"], "email");
        let event = &v["event_processing_registration"];
        assert_eq!(
            event["supported_event_types"],
            serde_json::json!(["custom_event", "attribution"])
        );
        assert_eq!(event["supported_runtime_environments"], serde_json::json!(["ios"]));
        assert_eq!(event["account_settings"][0]["confidential"], true);
        assert!(v["audience_processing_registration"].is_object());
    }
}
