//! Settings management

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use timed_metrics::ReportSettings;

/// Top-level settings. Every field falls back to its default when missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub report: ReportSettings,
    pub instrument: InstrumentSettings,
}

/// Which operations the instrumenter treats as exposed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstrumentSettings {
    /// Operations whose name starts with this prefix are private and are not
    /// timed unless requested explicitly. Empty means everything is exposed.
    pub private_prefix: String,
}

impl Default for InstrumentSettings {
    fn default() -> Self {
        Self {
            private_prefix: "_".to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings from '{path}'")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings: {0}")]
    Parse(#[from] serde_json::Error),
}

impl Settings {
    pub fn from_json_str(json: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = Self::from_json_str(&json)?;
        tracing::debug!(path = %path.display(), "settings loaded");
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use timed_metrics::DurationStyle;

    #[test]
    fn empty_document_yields_defaults() {
        let settings = Settings::from_json_str("{}").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.instrument.private_prefix, "_");
        assert_eq!(settings.report.duration_style, DurationStyle::Clock);
    }

    #[test]
    fn partial_document_overrides_fields() {
        let settings = Settings::from_json_str(
            r#"{ "report": { "duration_style": "seconds" }, "instrument": { "private_prefix": "" } }"#,
        )
        .unwrap();
        assert_eq!(settings.report.duration_style, DurationStyle::Seconds);
        assert_eq!(settings.report.indent, "  ");
        assert_eq!(settings.instrument.private_prefix, "");
    }

    #[test]
    fn malformed_document_is_parse_error() {
        let err = Settings::from_json_str("{ report: ").unwrap_err();
        assert!(matches!(err, SettingsError::Parse(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = Settings::load("/definitely/not/here/timed.json").unwrap_err();
        assert!(matches!(err, SettingsError::Io { .. }));
    }
}
