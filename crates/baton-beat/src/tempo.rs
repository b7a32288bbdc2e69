//! Tempo and beat-volume estimation from onset timing and intensity.

use std::collections::VecDeque;
use std::time::Duration;

use crate::reference::ReferenceTempo;

/// Blend `raw` toward `previous` by `smoothing` (0 keeps raw, 1 keeps previous)
fn smooth_toward(raw: f64, previous: Option<f64>, smoothing: f64) -> f64 {
    match previous {
        Some(prev) if prev.is_finite() => raw + (prev - raw) * smoothing,
        _ => raw,
    }
}

/// Settings for [`TempoTracker`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TempoSettings {
    pub warmup_onsets: u32,
    pub interval_history: usize,
    pub min_intervals: usize,
    pub min_onset_gap: Duration,
    pub smoothing: f64,
    pub min_rate: f64,
    pub max_rate: f64,
}

/// Playback rate from inter-onset intervals.
///
/// The first `warmup_onsets - 1` onsets only establish timing; intervals are
/// recorded from the warm-up onset on, and a rate is produced once
/// `min_intervals` of them are held.
#[derive(Debug, Clone)]
pub struct TempoTracker {
    settings: TempoSettings,
    onset_count: u32,
    last_onset: Option<Duration>,
    intervals: VecDeque<f64>,
    rate: Option<f64>,
}

impl TempoTracker {
    pub fn new(settings: TempoSettings) -> Self {
        Self {
            settings,
            onset_count: 0,
            last_onset: None,
            intervals: VecDeque::with_capacity(settings.interval_history),
            rate: None,
        }
    }

    /// Register an onset arriving at `at`; returns the updated rate, if any
    pub fn on_onset(&mut self, at: Duration, reference: &ReferenceTempo) -> Option<f64> {
        let since_last = match self.last_onset {
            Some(last) => match at.checked_sub(last) {
                Some(gap) if gap < self.settings.min_onset_gap => {
                    tracing::trace!(?at, "Onset within minimum gap, tempo unchanged");
                    return None;
                }
                Some(gap) => Some(gap),
                None => {
                    tracing::trace!(?at, ?last, "Onset older than previous one, ignored");
                    return None;
                }
            },
            None => None,
        };

        self.onset_count = self.onset_count.saturating_add(1);

        if let Some(gap) = since_last {
            if self.onset_count >= self.settings.warmup_onsets {
                self.intervals.push_back(gap.as_secs_f64());
                while self.intervals.len() > self.settings.interval_history {
                    self.intervals.pop_front();
                }
            }
        }
        self.last_onset = Some(at);

        if self.intervals.len() < self.settings.min_intervals.max(1) {
            return None;
        }

        let mean = self.intervals.iter().sum::<f64>() / self.intervals.len() as f64;
        if mean <= 0.0 || !mean.is_finite() {
            return None;
        }

        let raw = 60.0 / mean / reference.bpm();
        let rate = smooth_toward(raw, self.rate, self.settings.smoothing)
            .clamp(self.settings.min_rate, self.settings.max_rate);

        self.rate = Some(rate);
        Some(rate)
    }

    pub fn rate(&self) -> Option<f64> {
        self.rate
    }

    pub fn onset_count(&self) -> u32 {
        self.onset_count
    }

    pub fn interval_count(&self) -> usize {
        self.intervals.len()
    }

    pub fn reset(&mut self) {
        self.onset_count = 0;
        self.last_onset = None;
        self.intervals.clear();
        self.rate = None;
    }
}

/// Settings for [`VolumeEstimator`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeSettings {
    pub baseline: f64,
    pub span: f64,
    pub smoothing: f64,
}

/// Normalized beat intensity in [0, 1] from the samples of one beat
#[derive(Debug, Clone)]
pub struct VolumeEstimator {
    settings: VolumeSettings,
    volume: Option<f64>,
}

impl VolumeEstimator {
    pub fn new(settings: VolumeSettings) -> Self {
        Self {
            settings,
            volume: None,
        }
    }

    pub fn estimate(&mut self, beat: &[f64]) -> f64 {
        let finite: Vec<f64> = beat.iter().copied().filter(|v| v.is_finite()).collect();
        if finite.is_empty() {
            return self.volume.unwrap_or(0.0);
        }

        let mean = finite.iter().sum::<f64>() / finite.len() as f64;
        let raw = (mean - self.settings.baseline) / self.settings.span;
        let volume = smooth_toward(raw, self.volume, self.settings.smoothing).clamp(0.0, 1.0);

        self.volume = Some(volume);
        volume
    }

    pub fn volume(&self) -> Option<f64> {
        self.volume
    }

    pub fn reset(&mut self) {
        self.volume = None;
    }
}
