// Configuration du moteur
//
// Read once at startup from an optional RON file. Only engine parameters
// live here; synthesizer controls (volume, waveform, octave) are never
// saved.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const CONFIG_FILE: &str = "keysynth.ron";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("RON error: {0}")]
    Ron(#[from] ron::error::SpannedError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthConfig {
    /// Output and recording sample rate (Hz)
    pub sample_rate: u32,
    /// Frames per render tick; `None` lets the device decide
    pub buffer_frames: Option<u32>,
    /// Recording cap (seconds)
    pub max_record_seconds: f32,
    pub initial_volume: f32,
    /// Capacity of the event queue, shared by all producers
    pub event_queue_capacity: usize,
    /// Keyboard polling period (ms)
    pub poll_interval_ms: u64,
    pub recording_dir: PathBuf,
    pub midi_enabled: bool,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            buffer_frames: None,
            max_record_seconds: 300.0,
            initial_volume: 0.5,
            event_queue_capacity: 512,
            poll_interval_ms: 10,
            recording_dir: PathBuf::from("."),
            midi_enabled: true,
        }
    }
}

impl SynthConfig {
    pub fn from_ron(text: &str) -> Result<Self, ConfigError> {
        let config: SynthConfig = ron::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_ron(&text)
    }

    /// Load `path` if it exists, otherwise fall back to the defaults
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let config = Self::load(path)?;
        tracing::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate == 0 {
            return Err(ConfigError::Invalid("sample_rate must be > 0".into()));
        }
        if self.buffer_frames == Some(0) {
            return Err(ConfigError::Invalid("buffer_frames must be > 0".into()));
        }
        if !self.max_record_seconds.is_finite() || self.max_record_seconds <= 0.0 {
            return Err(ConfigError::Invalid(
                "max_record_seconds must be a positive number".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.initial_volume) {
            return Err(ConfigError::Invalid("initial_volume must be in [0, 1]".into()));
        }
        if self.event_queue_capacity == 0 {
            return Err(ConfigError::Invalid("event_queue_capacity must be > 0".into()));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid("poll_interval_ms must be > 0".into()));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_are_valid() {
        let config = SynthConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.sample_rate, 44100);
        assert_eq!(config.poll_interval(), Duration::from_millis(10));
    }

    #[test]
    fn test_partial_ron_keeps_defaults() {
        let config = SynthConfig::from_ron("(sample_rate: 48000, buffer_frames: Some(256))").unwrap();
        assert_eq!(config.sample_rate, 48000);
        assert_eq!(config.buffer_frames, Some(256));
        assert_eq!(config.max_record_seconds, 300.0);
        assert_eq!(config.initial_volume, 0.5);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            SynthConfig::from_ron("(sample_rate: 0)"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            SynthConfig::from_ron("(initial_volume: 1.5)"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            SynthConfig::from_ron("(max_record_seconds: -1.0)"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_malformed_ron() {
        assert!(matches!(
            SynthConfig::from_ron("(sample_rate: \"fast\")"),
            Err(ConfigError::Ron(_))
        ));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let config = SynthConfig::load_or_default(&dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(config, SynthConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "(max_record_seconds: 10.0, midi_enabled: false)").unwrap();

        let config = SynthConfig::load_or_default(&path).unwrap();
        assert_eq!(config.max_record_seconds, 10.0);
        assert!(!config.midi_enabled);
    }
}
