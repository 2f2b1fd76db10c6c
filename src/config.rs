//! Configuration management for crabsync
//!
//! Provides configuration loading, saving and validation for the resampler,
//! the timecode track, the post-recording trim and the recording pipeline.

use crate::errors::ConfigError;
use crate::recording::DEFAULT_VIDEO_QUEUE_CAPACITY;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrabSyncConfig {
    pub resampler: ResamplerConfig,
    pub timecode: TimecodeConfig,
    pub trim: TrimConfig,
    pub pipeline: PipelineConfig,
}

/// Fixed-rate video output
///
/// A missing `[resampler]` section means 30 fps. A section without
/// `output_fps` means video keeps its source timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResamplerConfig {
    #[serde(default)]
    pub output_fps: Option<u32>,
}

/// Timecode track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimecodeConfig {
    /// Write a timecode track when capture delivers SMPTE time
    pub enabled: bool,
    /// Payload width in bytes (4 or 8)
    pub byte_width: usize,
}

/// Post-recording trim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrimConfig {
    /// Trim leading/trailing audio-only time after finalization
    pub enabled: bool,
}

/// Recording pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Capacity of the queue feeding the video worker
    pub video_queue_capacity: usize,
}

impl Default for ResamplerConfig {
    fn default() -> Self {
        Self {
            output_fps: Some(30),
        }
    }
}

impl Default for TimecodeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            byte_width: 4,
        }
    }
}

impl Default for TrimConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            video_queue_capacity: DEFAULT_VIDEO_QUEUE_CAPACITY,
        }
    }
}

impl CrabSyncConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)?;
        let config: CrabSyncConfig = toml::from_str(&contents)?;

        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let toml_string = toml::to_string_pretty(self)?;
        fs::write(path, toml_string)?;

        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Get default config file path
    pub fn default_path() -> PathBuf {
        PathBuf::from("crabsync.toml")
    }

    /// Load from default location or fall back to defaults
    pub fn load_or_default() -> Self {
        Self::load_from_file(Self::default_path()).unwrap_or_else(|e| {
            log::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(fps) = self.resampler.output_fps {
            if fps == 0 || fps > 240 {
                return Err(ConfigError::Invalid(
                    "Output FPS must be between 1 and 240".to_string(),
                ));
            }
        }

        if !matches!(self.timecode.byte_width, 4 | 8) {
            return Err(ConfigError::Invalid(format!(
                "Timecode byte width must be 4 or 8, got {}",
                self.timecode.byte_width
            )));
        }

        if self.pipeline.video_queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "Video queue capacity must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CrabSyncConfig::default();
        assert_eq!(config.resampler.output_fps, Some(30));
        assert!(!config.timecode.enabled);
        assert_eq!(config.timecode.byte_width, 4);
        assert!(config.trim.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut bad_fps = CrabSyncConfig::default();
        bad_fps.resampler.output_fps = Some(0);
        assert!(matches!(bad_fps.validate(), Err(ConfigError::Invalid(_))));

        let mut bad_width = CrabSyncConfig::default();
        bad_width.timecode.byte_width = 2;
        assert!(bad_width.validate().is_err());

        let mut bad_queue = CrabSyncConfig::default();
        bad_queue.pipeline.video_queue_capacity = 0;
        assert!(bad_queue.validate().is_err());

        let mut passthrough = CrabSyncConfig::default();
        passthrough.resampler.output_fps = None;
        assert!(passthrough.validate().is_ok());
    }

    #[test]
    fn test_config_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("nested").join("crabsync.toml");

        let mut config = CrabSyncConfig::default();
        config.timecode.enabled = true;
        config.timecode.byte_width = 8;
        config.resampler.output_fps = Some(25);
        config.save_to_file(&config_path).unwrap();

        let loaded = CrabSyncConfig::load_from_file(&config_path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_config_toml_format() {
        let config = CrabSyncConfig::default();
        let toml_string = toml::to_string_pretty(&config).unwrap();

        assert!(toml_string.contains("[resampler]"));
        assert!(toml_string.contains("[timecode]"));
        assert!(toml_string.contains("[trim]"));
        assert!(toml_string.contains("[pipeline]"));
        assert!(toml_string.contains("output_fps"));
        assert!(toml_string.contains("video_queue_capacity"));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: CrabSyncConfig = toml::from_str("[timecode]\nenabled = true\n").unwrap();
        assert!(config.timecode.enabled);
        assert_eq!(config.timecode.byte_width, 4);
        assert_eq!(config.resampler.output_fps, Some(30));
    }

    #[test]
    fn test_passthrough_survives_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crabsync.toml");

        let mut config = CrabSyncConfig::default();
        config.resampler.output_fps = None;
        config.save_to_file(&path).unwrap();

        let loaded = CrabSyncConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded.resampler.output_fps, None);
    }

    #[test]
    fn test_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        fs::write(&path, "[resampler\noutput_fps = ").unwrap();
        assert!(matches!(
            CrabSyncConfig::load_from_file(&path),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = CrabSyncConfig::load_from_file("nonexistent_file.toml");
        assert_eq!(result.unwrap(), CrabSyncConfig::default());
    }
}
