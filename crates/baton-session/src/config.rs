//! Application configuration.
//!
//! Every stage owns its settings; this struct gathers them so a single file
//! (plus `BATON_` environment overrides) configures the whole system.
//! Nested keys use a double underscore, e.g. `BATON_BEAT__START_THRESHOLD=3.5`.

use std::path::Path;

use baton_audio::AudioConfig;
use baton_beat::{BeatDetectorConfig, ReferenceConfig, StreamConfig};
use baton_classifier::ClassifierConfig;
use baton_core::{Error, Result};
use baton_style::AnalysisConfig;
use serde::{Deserialize, Serialize};

const ENV_PREFIX: &str = "BATON";

/// Complete configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BatonConfig {
    /// Smoothing, kinematics and scoring
    pub analysis: AnalysisConfig,
    /// Window plan and model resources
    pub classifier: ClassifierConfig,
    /// Beat detection thresholds and estimator tuning
    pub beat: BeatDetectorConfig,
    /// Accelerometer stream
    pub stream: StreamConfig,
    /// Reference BPM analysis
    pub reference: ReferenceConfig,
    /// Live audio parameter mapping
    pub audio: AudioConfig,
}

impl BatonConfig {
    /// Load configuration from file, with environment overrides
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::from(path.as_ref()))
            .add_source(Self::environment())
            .build()
            .map_err(|e| Error::Config(e.to_string()))?;

        Self::finish(settings)
    }

    /// Load from environment variables
    pub fn from_env() -> Result<Self> {
        let settings = ::config::Config::builder()
            .add_source(Self::environment())
            .build()
            .map_err(|e| Error::Config(e.to_string()))?;

        Self::finish(settings)
    }

    fn environment() -> ::config::Environment {
        ::config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
    }

    fn finish(settings: ::config::Config) -> Result<Self> {
        let config: Self = settings
            .try_deserialize()
            .map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check every section for values the stages would reject
    pub fn validate(&self) -> Result<()> {
        self.analysis.scoring.validate()?;
        self.beat.validate()?;
        self.audio.validate()?;

        if self.classifier.window_length == 0 || self.classifier.stride == 0 {
            return Err(Error::Config(
                "classifier window length and stride must be positive".into(),
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
    fn test_default_config() {
        let config = BatonConfig::default();

        assert_eq!(config.classifier.window_length, 60);
        assert_eq!(config.classifier.stride, 30);
        assert_eq!(config.analysis.smoothing.window_size, 5);
        assert_eq!(config.beat.start_threshold, 4.0);
        assert_eq!(config.audio.min_db, -20.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_file_partial_override() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[beat]\nstart_threshold = 3.0\nstop_threshold = 1.5\n\n[analysis.scoring]\ncontrast = 2.0"
        )
        .unwrap();

        let config = BatonConfig::from_file(file.path()).unwrap();

        assert_eq!(config.beat.start_threshold, 3.0);
        assert_eq!(config.beat.stop_threshold, 1.5);
        assert_eq!(config.analysis.scoring.contrast, 2.0);
        // Untouched sections keep their defaults
        assert_eq!(config.beat.warmup_onsets, 8);
        assert_eq!(config.audio.volume_smoothing, 0.3);
    }

    #[test]
    fn test_invalid_file_values_rejected() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[beat]\nstart_threshold = 2.0\nstop_threshold = 3.0").unwrap();

        assert!(matches!(
            BatonConfig::from_file(file.path()),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(BatonConfig::from_file("/nonexistent/baton.toml").is_err());
    }
}
