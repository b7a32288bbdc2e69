//! Audio engine abstraction.

use serde::{Deserialize, Serialize};

/// The parameters the motion layer drives on a granular player
pub trait AudioEngine: Send {
    /// Current output volume in dB
    fn volume_db(&self) -> f64;

    fn set_volume_db(&mut self, volume_db: f64);

    fn playback_rate(&self) -> f64;

    fn set_playback_rate(&mut self, rate: f64);

    /// Grain length in seconds
    fn set_grain_size(&mut self, seconds: f64);
}

/// In-memory engine state, for headless runs and tests
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AudioParameters {
    pub volume_db: f64,
    pub playback_rate: f64,
    pub grain_size: f64,
}

impl Default for AudioParameters {
    fn default() -> Self {
        Self {
            volume_db: 0.0,
            playback_rate: 1.0,
            grain_size: 0.1,
        }
    }
}

impl AudioEngine for AudioParameters {
    fn volume_db(&self) -> f64 {
        self.volume_db
    }

    fn set_volume_db(&mut self, volume_db: f64) {
        self.volume_db = volume_db;
    }

    fn playback_rate(&self) -> f64 {
        self.playback_rate
    }

    fn set_playback_rate(&mut self, rate: f64) {
        self.playback_rate = rate;
    }

    fn set_grain_size(&mut self, seconds: f64) {
        self.grain_size = seconds;
    }
}
