//! Setting declarations and the configuration values that fill them in.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Value type the host UI collects for a setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingKind {
    Text,
    Boolean,
    Integer,
    Float,
}

impl SettingKind {
    /// Whether `raw` is an acceptable string encoding of this kind.
    pub fn accepts(&self, raw: &str) -> bool {
        let raw = raw.trim();
        match self {
            SettingKind::Text => true,
            SettingKind::Boolean => {
                raw.eq_ignore_ascii_case("true") || raw.eq_ignore_ascii_case("false")
            }
            SettingKind::Integer => raw.parse::<i64>().is_ok(),
            SettingKind::Float => raw.parse::<f64>().is_ok(),
        }
    }
}

impl fmt::Display for SettingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SettingKind::Text => "text",
            SettingKind::Boolean => "boolean",
            SettingKind::Integer => "integer",
            SettingKind::Float => "float",
        };
        f.write_str(s)
    }
}

/// One configurable field declared in a manifest settings list.
///
/// Settings are built with a kind-specific constructor and refined with the
/// chained modifiers:
///
/// ```
/// use sluice_core::domain::Setting;
///
/// let token = Setting::text("serviceToken", "Service token")
///     .required()
///     .confidential()
///     .with_description("Token used to authenticate with the destination");
/// assert!(token.is_required());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Setting {
    key: String,
    label: String,
    kind: SettingKind,
    required: bool,
    confidential: bool,
    visible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    default_value: Option<String>,
}

impl Setting {
    pub fn new(key: impl Into<String>, label: impl Into<String>, kind: SettingKind) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            kind,
            required: false,
            confidential: false,
            visible: false,
            description: None,
            default_value: None,
        }
    }

    pub fn text(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(key, label, SettingKind::Text)
    }

    pub fn boolean(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(key, label, SettingKind::Boolean)
    }

    pub fn integer(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(key, label, SettingKind::Integer)
    }

    pub fn float(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(key, label, SettingKind::Float)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Value is a secret: validated for presence only, never logged or echoed.
    pub fn confidential(mut self) -> Self {
        self.confidential = true;
        self
    }

    pub fn visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn kind(&self) -> SettingKind {
        self.kind
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_confidential(&self) -> bool {
        self.confidential
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn default_value(&self) -> Option<&str> {
        self.default_value.as_deref()
    }
}

/// Setting values supplied with a request (`settingKey -> value`).
///
/// Values may be secrets, so `Debug` prints keys only.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Configuration(BTreeMap<String, String>);

impl Configuration {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Configuration {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.0.keys().map(|k| (k, "<redacted>")))
            .finish()
    }
}
