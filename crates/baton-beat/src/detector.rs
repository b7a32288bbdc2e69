//! Hysteresis beat detector over accelerometer magnitude.
//!
//! ```text
//!            signal > start_threshold
//!   ┌──────┐ ───────────────────────▶ ┌───────────┐
//!   │ Idle │                          │ Detecting │  accumulate samples > start
//!   └──────┘ ◀─────────────────────── └───────────┘
//!            signal < stop_threshold
//! ```
//!
//! Samples between the two thresholds never change state. The onset updates
//! the playback-rate estimate, the offset turns the accumulated samples into a
//! beat volume.

use std::time::Duration;

use baton_core::{AccelSample, Error, Result};
use serde::{Deserialize, Serialize};

use crate::reference::ReferenceTempo;
use crate::tempo::{TempoSettings, TempoTracker, VolumeEstimator, VolumeSettings};

/// Beat detection and estimation parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BeatDetectorConfig {
    /// Idle → Detecting above this magnitude (typical 2.0-4.0)
    pub start_threshold: f64,
    /// Detecting → Idle below this magnitude
    pub stop_threshold: f64,
    /// Onsets counted before intervals are recorded
    pub warmup_onsets: u32,
    /// Inter-onset intervals kept for the mean
    pub interval_history: usize,
    /// Intervals needed before a rate is reported
    pub min_intervals: usize,
    /// Onsets closer than this to the previous one leave tempo untouched
    pub min_onset_gap_ms: u64,
    /// Weight of the previous rate when smoothing (0 disables smoothing)
    pub rate_smoothing: f64,
    pub min_rate: f64,
    pub max_rate: f64,
    /// Beat magnitude mapped to volume 0
    pub volume_baseline: f64,
    /// Magnitude above baseline mapped to volume 1
    pub volume_span: f64,
    /// Weight of the previous volume when smoothing
    pub volume_smoothing: f64,
}

impl Default for BeatDetectorConfig {
    fn default() -> Self {
        Self {
            start_threshold: 4.0,
            stop_threshold: 2.8,
            warmup_onsets: 8,
            interval_history: 4,
            min_intervals: 2,
            min_onset_gap_ms: 100,
            rate_smoothing: 0.25,
            min_rate: 0.25,
            max_rate: 4.0,
            volume_baseline: 4.0,
            volume_span: 3.0,
            volume_smoothing: 0.25,
        }
    }
}

impl BeatDetectorConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.start_threshold.is_finite() || !self.stop_threshold.is_finite() {
            return Err(Error::Config("beat thresholds must be finite".into()));
        }
        if self.stop_threshold >= self.start_threshold {
            return Err(Error::Config(format!(
                "stop threshold {} must be below start threshold {}",
                self.stop_threshold, self.start_threshold
            )));
        }
        if !(self.min_rate > 0.0 && self.min_rate <= self.max_rate && self.max_rate.is_finite()) {
            return Err(Error::Config(format!(
                "invalid playback rate bounds [{}, {}]",
                self.min_rate, self.max_rate
            )));
        }
        if self.min_intervals == 0 || self.interval_history < self.min_intervals {
            return Err(Error::Config(format!(
                "interval history {} cannot hold {} intervals",
                self.interval_history, self.min_intervals
            )));
        }
        if !(self.volume_span.is_finite() && self.volume_span > 0.0)
            || !self.volume_baseline.is_finite()
        {
            return Err(Error::Config("volume baseline/span must be finite, span positive".into()));
        }
        for (name, value) in [
            ("rate_smoothing", self.rate_smoothing),
            ("volume_smoothing", self.volume_smoothing),
        ] {
            if !(0.0..1.0).contains(&value) {
                return Err(Error::Config(format!("{} must be in [0, 1), got {}", name, value)));
            }
        }
        Ok(())
    }

    fn tempo_settings(&self) -> TempoSettings {
        TempoSettings {
            warmup_onsets: self.warmup_onsets,
            interval_history: self.interval_history,
            min_intervals: self.min_intervals,
            min_onset_gap: Duration::from_millis(self.min_onset_gap_ms),
            smoothing: self.rate_smoothing,
            min_rate: self.min_rate,
            max_rate: self.max_rate,
        }
    }

    fn volume_settings(&self) -> VolumeSettings {
        VolumeSettings {
            baseline: self.volume_baseline,
            span: self.volume_span,
            smoothing: self.volume_smoothing,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BeatState {
    Idle,
    Detecting,
}

/// Result of processing one sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BeatEvent {
    /// A beat started; carries the new playback rate once tempo is known
    Onset { estimated_rate: Option<f64> },
    /// A beat ended; carries its normalized volume in [0, 1]
    Offset { estimated_volume: f64 },
    None,
}

impl BeatEvent {
    pub fn is_none(&self) -> bool {
        matches!(self, BeatEvent::None)
    }
}

pub struct BeatDetector {
    config: BeatDetectorConfig,
    reference: ReferenceTempo,
    state: BeatState,
    buffer: Vec<f64>,
    tempo: TempoTracker,
    volume: VolumeEstimator,
}

impl BeatDetector {
    pub fn new(config: BeatDetectorConfig, reference: ReferenceTempo) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            tempo: TempoTracker::new(config.tempo_settings()),
            volume: VolumeEstimator::new(config.volume_settings()),
            config,
            reference,
            state: BeatState::Idle,
            buffer: Vec::new(),
        })
    }

    pub fn process(&mut self, sample: &AccelSample, at: Duration) -> BeatEvent {
        self.process_magnitude(sample.magnitude(), at)
    }

    /// Advance the state machine with one magnitude arriving at `at`
    pub fn process_magnitude(&mut self, signal: f64, at: Duration) -> BeatEvent {
        if !signal.is_finite() {
            return BeatEvent::None;
        }

        match self.state {
            BeatState::Idle => {
                if signal > self.config.start_threshold {
                    self.state = BeatState::Detecting;
                    self.buffer.clear();
                    self.buffer.push(signal);

                    let estimated_rate = self.tempo.on_onset(at, &self.reference);
                    tracing::trace!(signal, ?estimated_rate, "Beat onset");
                    BeatEvent::Onset { estimated_rate }
                } else {
                    BeatEvent::None
                }
            }
            BeatState::Detecting => {
                if signal > self.config.start_threshold {
                    self.buffer.push(signal);
                    BeatEvent::None
                } else if signal < self.config.stop_threshold {
                    self.state = BeatState::Idle;
                    let estimated_volume = self.volume.estimate(&self.buffer);
                    self.buffer.clear();

                    tracing::trace!(signal, estimated_volume, "Beat offset");
                    BeatEvent::Offset { estimated_volume }
                } else {
                    BeatEvent::None
                }
            }
        }
    }

    pub fn state(&self) -> BeatState {
        self.state
    }

    pub fn reference(&self) -> ReferenceTempo {
        self.reference
    }

    /// Swap the reference track; tempo history restarts
    pub fn set_reference(&mut self, reference: ReferenceTempo) {
        self.reference = reference;
        self.tempo.reset();
    }

    pub fn current_rate(&self) -> Option<f64> {
        self.tempo.rate()
    }

    pub fn config(&self) -> &BeatDetectorConfig {
        &self.config
    }

    pub fn reset(&mut self) {
        self.state = BeatState::Idle;
        self.buffer.clear();
        self.tempo.reset();
        self.volume.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector(start: f64, stop: f64) -> BeatDetector {
        let config = BeatDetectorConfig {
            start_threshold: start,
            stop_threshold: stop,
            ..Default::default()
        };
        BeatDetector::new(config, ReferenceTempo::new(120.0).unwrap()).unwrap()
    }

    fn run(detector: &mut BeatDetector, signal: &[f64]) -> Vec<BeatEvent> {
        signal
            .iter()
            .enumerate()
            .map(|(i, &s)| detector.process_magnitude(s, Duration::from_millis(i as u64 * 20)))
            .collect()
    }

    #[test]
    fn test_onset_and_offset_indices() {
        let mut detector = detector(2.5, 1.0);
        let events = run(&mut detector, &[1.0, 1.0, 1.0, 3.0, 3.0, 3.0, 0.5, 0.5]);

        for (i, event) in events.iter().enumerate() {
            match i {
                3 => assert!(matches!(event, BeatEvent::Onset { estimated_rate: None })),
                6 => assert!(matches!(event, BeatEvent::Offset { .. })),
                _ => assert!(event.is_none(), "unexpected event at {}: {:?}", i, event),
            }
        }
        assert_eq!(detector.state(), BeatState::Idle);
    }

    #[test]
    fn test_hysteresis_band_is_silent() {
        let mut detector = detector(4.0, 2.8);
        let band: Vec<f64> = (0..200).map(|i| 2.9 + (i % 10) as f64 * 0.1).collect();

        assert!(run(&mut detector, &band).iter().all(BeatEvent::is_none));
        assert_eq!(detector.state(), BeatState::Idle);
    }

    #[test]
    fn test_single_beat_one_onset_one_offset() {
        let mut detector = detector(4.0, 2.8);
        let events = run(&mut detector, &[1.0, 5.0, 6.0, 3.5, 3.0, 2.0, 1.0, 3.5]);

        let onsets = events
            .iter()
            .filter(|e| matches!(e, BeatEvent::Onset { .. }))
            .count();
        let offsets = events
            .iter()
            .filter(|e| matches!(e, BeatEvent::Offset { .. }))
            .count();
        assert_eq!((onsets, offsets), (1, 1));
    }

    #[test]
    fn test_offset_volume_averages_strong_samples() {
        let mut detector = detector(4.0, 2.8);
        let events = run(&mut detector, &[5.0, 7.0, 3.5, 9.0, 0.0]);

        // mean(5, 7, 9) = 7 -> (7 - 4) / 3; 3.5 and the offset sample are skipped
        match events[4] {
            BeatEvent::Offset { estimated_volume } => {
                assert!((estimated_volume - 1.0).abs() < 1e-9)
            }
            other => panic!("expected offset, got {:?}", other),
        }
    }

    #[test]
    fn test_short_strong_beat_is_not_silent() {
        let mut detector = detector(4.0, 2.8);
        let events = run(&mut detector, &[5.5, 1.0]);

        assert!(matches!(events[0], BeatEvent::Onset { estimated_rate: None }));
        match events[1] {
            BeatEvent::Offset { estimated_volume } => {
                assert!((estimated_volume - 0.5).abs() < 1e-9)
            }
            other => panic!("expected offset, got {:?}", other),
        }
    }

    #[test]
    fn test_rate_after_warmup() {
        let mut detector = detector(4.0, 2.8);
        let mut rates = Vec::new();

        // One beat every 500 ms (120 BPM against a 120 BPM reference)
        for beat in 0..10u64 {
            let t = Duration::from_millis(beat * 500);
            if let BeatEvent::Onset { estimated_rate } = detector.process_magnitude(6.0, t) {
                rates.push(estimated_rate);
            }
            detector.process_magnitude(0.0, t + Duration::from_millis(100));
        }

        assert_eq!(rates.len(), 10);
        assert!(rates[..8].iter().all(Option::is_none));
        assert!((rates[8].unwrap() - 1.0).abs() < 1e-9);
        assert!((detector.current_rate().unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_earlier_timestamp_without_gap() {
        let config = BeatDetectorConfig {
            min_onset_gap_ms: 0,
            warmup_onsets: 1,
            ..Default::default()
        };
        let mut detector = BeatDetector::new(config, ReferenceTempo::new(120.0).unwrap()).unwrap();

        detector.process_magnitude(6.0, Duration::from_millis(500));
        detector.process_magnitude(0.0, Duration::from_millis(510));
        let event = detector.process_magnitude(6.0, Duration::from_millis(400));

        assert!(matches!(event, BeatEvent::Onset { estimated_rate: None }));
        assert_eq!(detector.state(), BeatState::Detecting);
    }

    #[test]
    fn test_non_finite_ignored() {
        let mut detector = detector(4.0, 2.8);
        assert!(detector
            .process_magnitude(f64::NAN, Duration::ZERO)
            .is_none());
        assert!(detector
            .process_magnitude(f64::INFINITY, Duration::ZERO)
            .is_none());
        assert_eq!(detector.state(), BeatState::Idle);
    }

    #[test]
    fn test_invalid_thresholds() {
        let config = BeatDetectorConfig {
            start_threshold: 2.0,
            stop_threshold: 2.0,
            ..Default::default()
        };
        let reference = ReferenceTempo::new(100.0).unwrap();
        assert!(matches!(
            BeatDetector::new(config, reference),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_sample_magnitude() {
        let mut detector = detector(4.0, 2.8);
        let sample = AccelSample::from_acceleration(-2.0, 1.5, 1.0);
        assert!(matches!(
            detector.process(&sample, Duration::ZERO),
            BeatEvent::Onset { .. }
        ));
    }
}
