//! Flow configuration: host package, platform version and user-facing wording
//!
//! Every field has a default, so a JSON file only needs the keys it overrides:
//!
//! ```json
//! {
//!   "package": "com.example.camera",
//!   "platform": 30,
//!   "messages": { "rationale_single": "We need the camera to scan codes." }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::platform::PlatformVersion;

/// Error type for configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Complete controller configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    /// Package identifier handed to settings navigation
    pub package: String,
    /// Platform version used to pick the multiple-permission set
    pub platform: PlatformVersion,
    /// Notice and dialog wording
    pub messages: FlowMessages,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            package: "com.example.androidpermissionrequest".to_string(),
            platform: PlatformVersion::default(),
            messages: FlowMessages::default(),
        }
    }
}

impl FlowConfig {
    /// Parse a JSON document
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn with_package(mut self, package: impl Into<String>) -> Self {
        self.package = package.into();
        self
    }

    pub fn with_platform(mut self, platform: PlatformVersion) -> Self {
        self.platform = platform;
        self
    }

    pub fn with_messages(mut self, messages: FlowMessages) -> Self {
        self.messages = messages;
        self
    }
}

/// User-facing notice and dialog text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowMessages {
    pub single_already_granted: String,
    pub multiple_already_granted: String,
    pub all_granted: String,
    pub rationale_title: String,
    pub rationale_single: String,
    pub rationale_multiple: String,
    pub rationale_confirm: String,
    pub settings_title: String,
    pub settings_message: String,
    pub settings_confirm: String,
    pub cancel: String,
}

impl Default for FlowMessages {
    fn default() -> Self {
        Self {
            single_already_granted: "Camera permission already granted".into(),
            multiple_already_granted: "All permissions already granted".into(),
            all_granted: "All permissions granted".into(),
            rationale_title: "Permission Needed".into(),
            rationale_single: "Camera permission is required to capture photos.".into(),
            rationale_multiple:
                "Camera and Storage permissions are required for full functionality.".into(),
            rationale_confirm: "Allow".into(),
            settings_title: "Permissions Denied".into(),
            settings_message: "You have denied permissions permanently. Go to App Settings to manually enable them for full functionality.".into(),
            settings_confirm: "Go to Settings".into(),
            cancel: "Cancel".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_wording() {
        let config = FlowConfig::default();
        assert_eq!(config.package, "com.example.androidpermissionrequest");
        assert_eq!(config.platform, PlatformVersion::TIRAMISU);
        assert_eq!(config.messages.rationale_title, "Permission Needed");
        assert_eq!(config.messages.settings_confirm, "Go to Settings");
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = FlowConfig::from_json_str(
            r#"{"platform": 29, "messages": {"rationale_confirm": "Continue"}}"#,
        )
        .unwrap();

        assert_eq!(config.platform, PlatformVersion::new(29));
        assert_eq!(config.messages.rationale_confirm, "Continue");
        assert_eq!(config.messages.cancel, "Cancel");
        assert_eq!(config.package, FlowConfig::default().package);
    }

    #[test]
    fn test_invalid_json() {
        let err = FlowConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"package": "org.example.scanner"}}"#).unwrap();

        let config = FlowConfig::load(file.path()).unwrap();
        assert_eq!(config.package, "org.example.scanner");
    }

    #[test]
    fn test_load_missing_file() {
        let err = FlowConfig::load("/nonexistent/permflow.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_builder_methods() {
        let config = FlowConfig::default()
            .with_package("a.b")
            .with_platform(PlatformVersion::new(31));
        assert_eq!(config.package, "a.b");
        assert_eq!(config.platform.api_level(), 31);
    }
}
