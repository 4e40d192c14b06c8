//! Engine and batch configuration.
//!
//! Both halves deserialize from a JSON settings file with every field
//! optional; anything left out falls back to the defaults below.

use crate::error::EngineError;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Reference slot size: one megabyte per buffer.
pub const DEFAULT_BUFFER_SIZE: usize = 1024 * 1024;

/// Default interval between progress polls of the active task.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Settings for the copy core.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Capacity of each of the two buffer slots, in bytes.
    ///
    /// Larger slots mean fewer system calls but a longer worst-case wait
    /// before a pause or abort is observed.
    pub buffer_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl EngineConfig {
    /// Config with a specific slot size.
    pub fn with_buffer_size(buffer_size: usize) -> Self {
        EngineConfig { buffer_size }
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.buffer_size == 0 {
            return Err(EngineError::InvalidConfig {
                message: "buffer_size must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

/// Settings for batch runs driven by `run_job`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    /// How often the active task is polled for progress
    pub poll_interval_ms: u64,

    /// File extensions (without the dot) picked up by the worklist
    pub extensions: Vec<String>,
}

impl Default for JobConfig {
    fn default() -> Self {
        JobConfig {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            extensions: vec!["avi".to_string(), "mp4".to_string(), "mpg".to_string()],
        }
    }
}

impl JobConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.poll_interval_ms == 0 {
            return Err(EngineError::InvalidConfig {
                message: "poll_interval_ms must be greater than zero".to_string(),
            });
        }
        if self.extensions.iter().any(|ext| ext.is_empty() || ext.starts_with('.')) {
            return Err(EngineError::InvalidConfig {
                message: "extensions must be non-empty and given without a leading dot".to_string(),
            });
        }
        Ok(())
    }
}

/// Complete settings file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub engine: EngineConfig,
    pub job: JobConfig,
}

impl Settings {
    /// Load and validate settings from a JSON file.
    ///
    /// # Errors
    /// Returns `InvalidConfig` if the file can't be read, parsed, or holds
    /// out-of-range values.
    pub fn load(path: &Path) -> Result<Settings, EngineError> {
        let text = std::fs::read_to_string(path).map_err(|e| EngineError::InvalidConfig {
            message: format!("can't read {}: {}", path.display(), e),
        })?;
        let settings: Settings =
            serde_json::from_str(&text).map_err(|e| EngineError::InvalidConfig {
                message: format!("can't parse {}: {}", path.display(), e),
            })?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        self.engine.validate()?;
        self.job.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.engine.buffer_size, 1024 * 1024);
        assert_eq!(settings.job.poll_interval(), Duration::from_millis(100));
        assert_eq!(settings.job.extensions, vec!["avi", "mp4", "mpg"]);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_load_partial_file_keeps_defaults() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = temp_dir.path().join("settings.json");
        std::fs::write(&path, r#"{"engine": {"buffer_size": 4096}}"#)
            .expect("Failed to write settings");

        let settings = Settings::load(&path).expect("Failed to load settings");
        assert_eq!(settings.engine.buffer_size, 4096);
        assert_eq!(settings.job, JobConfig::default());
    }

    #[test]
    fn test_zero_buffer_is_rejected() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = temp_dir.path().join("settings.json");
        std::fs::write(&path, r#"{"engine": {"buffer_size": 0}}"#)
            .expect("Failed to write settings");

        let result = Settings::load(&path);
        assert!(matches!(result, Err(EngineError::InvalidConfig { .. })));
    }

    #[test]
    fn test_dotted_extension_is_rejected() {
        let config = JobConfig {
            extensions: vec![".avi".to_string()],
            ..JobConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_file_is_rejected() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = temp_dir.path().join("settings.json");
        std::fs::write(&path, "not json").expect("Failed to write settings");

        assert!(Settings::load(&path).is_err());
    }
}
