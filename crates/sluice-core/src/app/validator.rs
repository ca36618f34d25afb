//! Settings validation.
//!
//! Checks a request's configuration against one manifest settings list:
//! - required setting absent or blank -> `MissingRequiredSetting`
//! - non-confidential value that does not parse as its kind -> `InvalidSettingValue`
//! - key not declared -> warning only, so older adapters accept newer hosts
//!
//! Confidential values are checked for presence and nothing else. No error
//! or warning ever contains a value.

use crate::domain::{Configuration, Setting, SettingKind};
use crate::protocol::ErrorCode;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("MissingRequiredSetting: {0}")]
    MissingRequiredSetting(String),

    #[error("InvalidSettingValue: {key} (expected {expected})")]
    InvalidSettingValue { key: String, expected: SettingKind },
}

impl ValidationError {
    pub fn key(&self) -> &str {
        match self {
            ValidationError::MissingRequiredSetting(key) => key,
            ValidationError::InvalidSettingValue { key, .. } => key,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            ValidationError::MissingRequiredSetting(_) => ErrorCode::MissingRequiredSetting,
            ValidationError::InvalidSettingValue { .. } => ErrorCode::InvalidSettingValue,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationWarning {
    UnknownSetting(String),
}

/// Result of a successful validation. Warnings are in key order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationReport {
    pub fn unknown_keys(&self) -> impl Iterator<Item = &str> {
        self.warnings.iter().map(|w| match w {
            ValidationWarning::UnknownSetting(key) => key.as_str(),
        })
    }
}

pub fn validate(
    configuration: &Configuration,
    settings: &[Setting],
) -> Result<ValidationReport, ValidationError> {
    for setting in settings {
        let value = configuration
            .get(setting.key())
            .filter(|v| !v.trim().is_empty());

        match value {
            None if setting.is_required() => {
                return Err(ValidationError::MissingRequiredSetting(
                    setting.key().to_string(),
                ));
            }
            None => {}
            Some(_) if setting.is_confidential() => {}
            Some(raw) => {
                if !setting.kind().accepts(raw) {
                    return Err(ValidationError::InvalidSettingValue {
                        key: setting.key().to_string(),
                        expected: setting.kind(),
                    });
                }
            }
        }
    }

    let warnings = configuration
        .keys()
        .filter(|key| !settings.iter().any(|s| s.key() == *key))
        .map(|key| ValidationWarning::UnknownSetting(key.to_string()))
        .collect();

    Ok(ValidationReport { warnings })
}

/// Copy of `configuration` with declared defaults filled in for absent keys.
pub fn with_defaults(configuration: &Configuration, settings: &[Setting]) -> Configuration {
    let mut filled = configuration.clone();
    for setting in settings {
        if let Some(default) = setting.default_value() {
            if configuration.get(setting.key()).is_none() {
                filled.insert(setting.key(), default);
            }
        }
    }
    filled
}
