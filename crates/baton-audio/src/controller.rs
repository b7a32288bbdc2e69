//! Live mapping from motion and beats to audio parameters.
//!
//! ## Paths
//!
//! | Input | Signal | Parameter |
//! |-------|--------|-----------|
//! | Pose frame | wrist acceleration (rolling mean) | volume |
//! | Beat onset | tempo ratio to reference BPM | playback rate, grain size |
//! | Beat offset | beat intensity | volume (beat mode only) |

use baton_beat::BeatEvent;
use baton_core::{
    joints, Error, InstantState, KinematicAnalyzer, KinematicConfig, PoseFrame, Result,
};
use serde::{Deserialize, Serialize};

use crate::engine::AudioEngine;

/// Which live path owns the volume
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolumeSource {
    #[default]
    Pose,
    Beat,
}

/// Configuration for the audio parameter mapping
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Mean wrist acceleration mapped to `min_db`
    pub min_accel: f64,
    /// Mean wrist acceleration mapped to `max_db`
    pub max_accel: f64,
    pub min_db: f64,
    pub max_db: f64,
    /// Target volume while no acceleration has been measured
    pub idle_volume_db: f64,
    /// Weight of the new target per frame, in (0, 1] (observed 0.05-0.3)
    pub volume_smoothing: f64,
    /// Frames in the rolling acceleration window
    pub acceleration_window: usize,
    pub grain_size: f64,
    /// Grain size used below `slow_rate_threshold`
    pub slow_grain_size: f64,
    pub slow_rate_threshold: f64,
    pub min_rate: f64,
    pub max_rate: f64,
    pub volume_source: VolumeSource,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            min_accel: 0.001,
            max_accel: 0.01,
            min_db: -20.0,
            max_db: 0.0,
            idle_volume_db: -20.0,
            volume_smoothing: 0.3,
            acceleration_window: 30,
            grain_size: 0.1,
            slow_grain_size: 0.01,
            slow_rate_threshold: 0.5,
            min_rate: 0.25,
            max_rate: 4.0,
            volume_source: VolumeSource::Pose,
        }
    }
}

impl AudioConfig {
    pub fn validate(&self) -> Result<()> {
        let values = [
            self.min_accel,
            self.max_accel,
            self.min_db,
            self.max_db,
            self.idle_volume_db,
            self.volume_smoothing,
            self.grain_size,
            self.slow_grain_size,
            self.slow_rate_threshold,
            self.min_rate,
            self.max_rate,
        ];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(Error::Config("audio parameters must be finite".into()));
        }
        if self.max_accel <= self.min_accel {
            return Err(Error::Config(format!(
                "max_accel {} must exceed min_accel {}",
                self.max_accel, self.min_accel
            )));
        }
        if self.max_db < self.min_db {
            return Err(Error::Config("max_db must not be below min_db".into()));
        }
        if !(self.volume_smoothing > 0.0 && self.volume_smoothing <= 1.0) {
            return Err(Error::Config(format!(
                "volume smoothing must be in (0, 1], got {}",
                self.volume_smoothing
            )));
        }
        if !(self.min_rate > 0.0 && self.min_rate <= self.max_rate) {
            return Err(Error::Config("invalid playback rate bounds".into()));
        }
        if self.grain_size <= 0.0 || self.slow_grain_size <= 0.0 {
            return Err(Error::Config("grain sizes must be positive".into()));
        }
        Ok(())
    }
}

/// Drives an [`AudioEngine`] from live pose frames and beat events
pub struct AudioParameterController<E: AudioEngine> {
    config: AudioConfig,
    engine: E,
    kinematics: KinematicAnalyzer,
    state: InstantState,
    last_frame: Option<PoseFrame>,
}

impl<E: AudioEngine> AudioParameterController<E> {
    pub fn new(config: AudioConfig, engine: E) -> Result<Self> {
        config.validate()?;

        let kinematics = KinematicAnalyzer::new(KinematicConfig {
            live_buffer_len: config.acceleration_window.max(1),
            ..Default::default()
        });
        let state = kinematics.instant_state();

        Ok(Self {
            config,
            engine,
            kinematics,
            state,
            last_frame: None,
        })
    }

    /// Map a mean acceleration onto the dB range; `None` gives the idle volume
    pub fn target_volume_db(&self, average_acceleration: Option<f64>) -> f64 {
        let cfg = &self.config;
        match average_acceleration {
            Some(accel) if accel.is_finite() => {
                let ratio = ((accel - cfg.min_accel) / (cfg.max_accel - cfg.min_accel)).clamp(0.0, 1.0);
                cfg.min_db + ratio * (cfg.max_db - cfg.min_db)
            }
            _ => cfg.idle_volume_db,
        }
    }

    /// Feed one live frame.
    ///
    /// The first frame only primes the state. Returns the volume written to
    /// the engine, or `None` when nothing was written.
    pub fn on_pose_frame(&mut self, frame: &PoseFrame) -> Option<f64> {
        let prev = self.last_frame.replace(frame.clone())?;

        self.kinematics
            .update_instant(&prev, frame, &joints::WRISTS, &mut self.state);

        if self.config.volume_source != VolumeSource::Pose {
            return None;
        }

        let target = self.target_volume_db(self.state.average());
        let current = self.engine.volume_db();
        let alpha = self.config.volume_smoothing;

        let volume = if current.is_finite() {
            current * (1.0 - alpha) + target * alpha
        } else {
            target
        };

        self.engine.set_volume_db(volume);
        Some(volume)
    }

    pub fn on_beat_event(&mut self, event: &BeatEvent) {
        match *event {
            BeatEvent::Onset {
                estimated_rate: Some(rate),
            } if rate.is_finite() => {
                let rate = rate.clamp(self.config.min_rate, self.config.max_rate);
                let grain = if rate < self.config.slow_rate_threshold {
                    self.config.slow_grain_size
                } else {
                    self.config.grain_size
                };

                self.engine.set_playback_rate(rate);
                self.engine.set_grain_size(grain);
                tracing::debug!(rate, grain, "Playback rate updated");
            }
            BeatEvent::Offset { estimated_volume }
                if self.config.volume_source == VolumeSource::Beat
                    && estimated_volume.is_finite() =>
            {
                let v = estimated_volume.clamp(0.0, 1.0);
                let volume = self.config.min_db + v * (self.config.max_db - self.config.min_db);
                self.engine.set_volume_db(volume);
                tracing::debug!(volume, "Beat volume updated");
            }
            _ => {}
        }
    }

    pub fn set_volume_source(&mut self, source: VolumeSource) {
        self.config.volume_source = source;
    }

    /// Running mean acceleration, `None` before the second frame
    pub fn average_acceleration(&self) -> Option<f64> {
        self.state.average()
    }

    /// Forget live motion history (engine parameters are kept)
    pub fn reset(&mut self) {
        self.state.reset();
        self.last_frame = None;
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn into_engine(self) -> E {
        self.engine
    }

    pub fn config(&self) -> &AudioConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::AudioParameters;
    use baton_core::Landmark;

    fn controller() -> AudioParameterController<AudioParameters> {
        AudioParameterController::new(AudioConfig::default(), AudioParameters::default()).unwrap()
    }

    fn wrists_at(x: f64) -> PoseFrame {
        PoseFrame::empty()
            .with_joint(joints::RIGHT_WRIST, Landmark::new(x, 0.5, 0.0))
            .with_joint(joints::LEFT_WRIST, Landmark::new(x, 0.5, 0.0))
    }

    #[test]
    fn test_idle_volume_when_empty() {
        let controller = controller();
        assert_eq!(controller.average_acceleration(), None);
        assert_eq!(controller.target_volume_db(None), -20.0);
    }

    #[test]
    fn test_first_frame_primes_only() {
        let mut controller = controller();
        assert_eq!(controller.on_pose_frame(&wrists_at(0.5)), None);
        assert_eq!(controller.engine().volume_db, 0.0);
    }

    #[test]
    fn test_volume_mapping() {
        let controller = controller();

        assert_eq!(controller.target_volume_db(Some(0.0)), -20.0);
        assert_eq!(controller.target_volume_db(Some(1.0)), 0.0);
        assert!((controller.target_volume_db(Some(0.0055)) + 10.0).abs() < 1e-9);
        assert_eq!(controller.target_volume_db(Some(f64::NAN)), -20.0);
    }

    #[test]
    fn test_still_hands_fade_out() {
        let mut controller = controller();
        controller.on_pose_frame(&wrists_at(0.5));

        let volume = controller.on_pose_frame(&wrists_at(0.5)).unwrap();
        assert!((volume + 6.0).abs() < 1e-9); // 0 * 0.7 + (-20) * 0.3

        for _ in 0..50 {
            controller.on_pose_frame(&wrists_at(0.5));
        }
        assert!((controller.engine().volume_db + 20.0).abs() < 1e-3);
    }

    #[test]
    fn test_vigorous_motion_full_volume() {
        let mut controller = controller();
        controller.engine_mut().set_volume_db(-20.0);

        // Alternating large and zero velocities: acceleration far above max
        let positions = [0.2, 0.2, 0.6, 0.6, 0.2, 0.2, 0.6, 0.6];
        for _ in 0..20 {
            for &x in &positions {
                controller.on_pose_frame(&wrists_at(x));
            }
        }

        assert!(controller.engine().volume_db > -0.01);
        assert!(controller.engine().volume_db <= 0.0);
    }

    #[test]
    fn test_missing_wrists_never_nan() {
        let mut controller = controller();
        controller.on_pose_frame(&PoseFrame::empty());
        controller.on_pose_frame(&wrists_at(0.3));
        controller.on_pose_frame(&PoseFrame::empty());

        let v = controller.engine().volume_db;
        assert!(v.is_finite());
        assert!((-20.0..=0.0).contains(&v));
    }

    #[test]
    fn test_grain_switch() {
        let mut controller = controller();

        controller.on_beat_event(&BeatEvent::Onset {
            estimated_rate: Some(0.4),
        });
        assert_eq!(controller.engine().playback_rate, 0.4);
        assert_eq!(controller.engine().grain_size, 0.01);

        controller.on_beat_event(&BeatEvent::Onset {
            estimated_rate: Some(1.2),
        });
        assert_eq!(controller.engine().playback_rate, 1.2);
        assert_eq!(controller.engine().grain_size, 0.1);

        // Unknown tempo and non-finite rates leave the engine alone
        controller.on_beat_event(&BeatEvent::Onset {
            estimated_rate: None,
        });
        controller.on_beat_event(&BeatEvent::Onset {
            estimated_rate: Some(f64::NAN),
        });
        assert_eq!(controller.engine().playback_rate, 1.2);
    }

    #[test]
    fn test_beat_volume_source() {
        let mut controller = controller();

        controller.on_beat_event(&BeatEvent::Offset {
            estimated_volume: 0.5,
        });
        assert_eq!(controller.engine().volume_db, 0.0);

        controller.set_volume_source(VolumeSource::Beat);
        controller.on_beat_event(&BeatEvent::Offset {
            estimated_volume: 0.5,
        });
        assert_eq!(controller.engine().volume_db, -10.0);

        // Pose frames no longer touch the volume
        controller.on_pose_frame(&wrists_at(0.1));
        assert_eq!(controller.on_pose_frame(&wrists_at(0.9)), None);
        assert_eq!(controller.engine().volume_db, -10.0);
    }

    #[test]
    fn test_invalid_config() {
        let config = AudioConfig {
            volume_smoothing: 0.0,
            ..Default::default()
        };
        assert!(AudioParameterController::new(config, AudioParameters::default()).is_err());
    }
}
