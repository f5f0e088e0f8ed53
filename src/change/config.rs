// History configuration

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default capacity of the optional event channel
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("RON error: {0}")]
    Ron(#[from] ron::error::SpannedError),

    #[error("Unsupported config format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Settings for an UndoRedoManager
///
/// Missing fields fall back to their defaults, so `()` in RON or `{}` in JSON
/// is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Maximum number of undoable changes kept; `None` keeps everything
    pub max_history: Option<usize>,

    /// Capacity of the event channel created by `UndoRedoManager::event_channel`
    pub event_channel_capacity: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_history: None,
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
        }
    }
}

impl HistoryConfig {
    /// Unbounded history
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// History keeping at most `max_history` undoable changes
    pub fn with_max_history(max_history: usize) -> Self {
        Self {
            max_history: Some(max_history),
            ..Self::default()
        }
    }

    pub fn from_ron_str(data: &str) -> Result<Self, ConfigError> {
        let config: Self = ron::from_str(data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(data: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(data)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a `.ron` or `.json` file, chosen by extension
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("ron") => Self::from_ron_str(&data),
            Some("json") => Self::from_json_str(&data),
            other => Err(ConfigError::UnsupportedFormat(
                other.unwrap_or("<none>").to_string(),
            )),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_history == Some(0) {
            return Err(ConfigError::Invalid(
                "max_history must be at least 1".to_string(),
            ));
        }
        if self.event_channel_capacity == 0 {
            return Err(ConfigError::Invalid(
                "event_channel_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = HistoryConfig::default();
        assert_eq!(config.max_history, None);
        assert_eq!(config.event_channel_capacity, DEFAULT_EVENT_CHANNEL_CAPACITY);
    }

    #[test]
    fn test_from_ron_partial() {
        let config = HistoryConfig::from_ron_str("(max_history: Some(50))").unwrap();
        assert_eq!(config.max_history, Some(50));
        assert_eq!(config.event_channel_capacity, DEFAULT_EVENT_CHANNEL_CAPACITY);
    }

    #[test]
    fn test_from_json() {
        let config =
            HistoryConfig::from_json_str(r#"{ "max_history": 10, "event_channel_capacity": 8 }"#)
                .unwrap();
        assert_eq!(config.max_history, Some(10));
        assert_eq!(config.event_channel_capacity, 8);
    }

    #[test]
    fn test_rejects_zero_history() {
        let result = HistoryConfig::from_json_str(r#"{ "max_history": 0 }"#);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();

        let ron_path = dir.path().join("history.ron");
        let mut file = std::fs::File::create(&ron_path).unwrap();
        writeln!(file, "(max_history: Some(3), event_channel_capacity: 16)").unwrap();
        let config = HistoryConfig::load(&ron_path).unwrap();
        assert_eq!(config, HistoryConfig {
            max_history: Some(3),
            event_channel_capacity: 16,
        });

        let toml_path = dir.path().join("history.toml");
        std::fs::write(&toml_path, "max_history = 3").unwrap();
        assert!(matches!(
            HistoryConfig::load(&toml_path),
            Err(ConfigError::UnsupportedFormat(_))
        ));
    }
}
