//! Configuration management for dynamic parameter tuning
//!
//! This module provides runtime configuration loading from JSON files,
//! enabling parameter adjustment without recompilation. Detection
//! thresholds, scheduler cadence, and storage locations can all be
//! overridden via the config file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub detector: DetectorConfig,
    pub metronome: MetronomeConfig,
    pub storage: StorageConfig,
}

/// Activity detector parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Audio level below this is considered silence (fraction of max amplitude)
    pub silence_threshold: f32,
    /// Active state drops only after this many milliseconds of silence
    pub silence_timeout_ms: u64,
    /// FFT window size in samples
    pub fft_size: usize,
    /// Number of leading spectrum bins published for display
    pub display_bins: usize,
    /// Analysis loop cadence in milliseconds
    pub analysis_interval_ms: u64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            silence_threshold: 0.015,
            silence_timeout_ms: 5000,
            fft_size: 256,
            display_bins: 64,
            analysis_interval_ms: 16,
        }
    }
}

/// Metronome scheduler parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetronomeConfig {
    /// Default tempo when none is specified
    pub default_bpm: u32,
    /// Scheduling poll cadence in milliseconds
    pub lookahead_poll_ms: u64,
    /// How far ahead of the audio clock to schedule clicks, in seconds
    pub schedule_ahead_secs: f64,
}

impl Default for MetronomeConfig {
    fn default() -> Self {
        Self {
            default_bpm: 100,
            lookahead_poll_ms: 25,
            schedule_ahead_secs: 0.1,
        }
    }
}

/// Profile storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the profile store; platform data dir when unset
    pub data_dir: Option<PathBuf>,
}

impl StorageConfig {
    /// Resolve the effective data directory
    pub fn resolve_data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("practice-trainer")
        })
    }
}

impl Default for AppConfig {
    /// Default configuration values (fallback if config file not found)
    fn default() -> Self {
        Self {
            detector: DetectorConfig::default(),
            metronome: MetronomeConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from JSON file
    ///
    /// Returns the default configuration if the file does not exist or
    /// cannot be parsed; a parse failure is logged, never fatal.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(_) => {
                log::info!(
                    "[Config] No config file at {:?}. Using defaults.",
                    path.as_ref()
                );
                Self::default()
            }
        }
    }

    /// Load configuration from the default platform location
    pub fn load() -> Self {
        Self::load_from_file(Self::config_path())
    }

    /// Path of the configuration file in the platform config directory
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("practice-trainer")
            .join("config.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        let config = AppConfig::default();
        assert_eq!(config.detector.silence_threshold, 0.015);
        assert_eq!(config.detector.silence_timeout_ms, 5000);
        assert_eq!(config.detector.fft_size, 256);
        assert_eq!(config.detector.display_bins, 64);
        assert_eq!(config.metronome.default_bpm, 100);
        assert_eq!(config.metronome.lookahead_poll_ms, 25);
        assert!((config.metronome.schedule_ahead_secs - 0.1).abs() < f64::EPSILON);
    }

    #[test]
    fn test_load_from_missing_file_uses_defaults() {
        let config = AppConfig::load_from_file("/nonexistent/path/config.json");
        assert_eq!(config.detector.silence_timeout_ms, 5000);
    }

    #[test]
    fn test_config_roundtrip() {
        let mut config = AppConfig::default();
        config.metronome.default_bpm = 140;
        let json = serde_json::to_string(&config).unwrap();
        let parsed: AppConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.metronome.default_bpm, 140);
    }

    #[test]
    fn test_resolve_data_dir_override() {
        let storage = StorageConfig {
            data_dir: Some(PathBuf::from("/tmp/pt-test")),
        };
        assert_eq!(storage.resolve_data_dir(), PathBuf::from("/tmp/pt-test"));
    }
}
