//! Performance session lifecycle.
//!
//! ```text
//! Idle ──start()──▶ Recording ──stop()──▶ Stopped ──start()──▶ Recording …
//!                     │
//!                     ├─ push_frame(): record + live volume
//!                     └─ push_accel(): beat → playback rate
//! ```

use std::time::Duration;

use baton_audio::{AudioConfig, AudioEngine, AudioParameterController};
use baton_beat::{AccelQueue, BeatDetector, BeatEvent};
use baton_core::{AccelSample, Error, PoseFrame, PoseRecorder, PoseSequence, Result};
use baton_style::{AnalysisOutcome, AnalysisReport, PerformanceAnalyzer};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Idle,
    Recording,
    Stopped,
}

/// Serializable outcome of a session's analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    pub session_id: Uuid,
    pub started_at: Option<DateTime<Utc>>,
    pub stopped_at: Option<DateTime<Utc>>,
    pub frames: usize,
    /// `None` when the recording held no frames
    pub analysis: Option<AnalysisReport>,
}

/// One conducting performance: live control while recording, batch analysis
/// afterwards
pub struct PerformanceSession<E: AudioEngine> {
    id: Uuid,
    state: SessionState,
    started_at: Option<DateTime<Utc>>,
    stopped_at: Option<DateTime<Utc>>,
    recorder: Option<PoseRecorder>,
    last_recording: Option<PoseSequence>,
    controller: AudioParameterController<E>,
    beats: AccelQueue,
}

impl<E: AudioEngine> PerformanceSession<E> {
    pub fn new(audio: AudioConfig, engine: E) -> Result<Self> {
        Ok(Self {
            id: Uuid::new_v4(),
            state: SessionState::Idle,
            started_at: None,
            stopped_at: None,
            recorder: None,
            last_recording: None,
            controller: AudioParameterController::new(audio, engine)?,
            beats: AccelQueue::new(),
        })
    }

    /// Begin a new recording
    pub fn start(&mut self) -> Result<()> {
        if self.state == SessionState::Recording {
            return Err(Error::Session("session is already recording".into()));
        }

        self.recorder = Some(PoseRecorder::new());
        self.controller.reset();
        self.state = SessionState::Recording;
        self.started_at = Some(Utc::now());
        self.stopped_at = None;

        tracing::info!(session = %self.id, "Recording started");
        Ok(())
    }

    /// Record a frame and drive the live volume path.
    ///
    /// Returns `false` (and does nothing) when not recording.
    pub fn push_frame(&mut self, frame: PoseFrame) -> bool {
        let Some(recorder) = self.recorder.as_mut() else {
            return false;
        };

        self.controller.on_pose_frame(&frame);
        recorder.push(frame);
        true
    }

    /// Freeze the recording and hand it back
    pub fn stop(&mut self) -> Result<PoseSequence> {
        let recorder = self
            .recorder
            .take()
            .ok_or_else(|| Error::Session("session is not recording".into()))?;

        let sequence = recorder.finish();
        self.state = SessionState::Stopped;
        self.stopped_at = Some(Utc::now());

        let elapsed = match (self.started_at, self.stopped_at) {
            (Some(start), Some(stop)) => (stop - start).num_milliseconds(),
            _ => 0,
        };
        tracing::info!(
            session = %self.id,
            frames = sequence.len(),
            elapsed_ms = elapsed,
            "Recording stopped"
        );

        self.last_recording = Some(sequence.clone());
        Ok(sequence)
    }

    /// Install the beat detector; accelerometer samples before this are ignored
    pub fn install_beat_detector(&self, detector: BeatDetector) {
        self.beats.install_detector(detector);
    }

    /// Feed one accelerometer sample arriving at `at`
    pub fn push_accel(&mut self, sample: AccelSample, at: Duration) {
        let controller = &mut self.controller;
        self.beats
            .push(sample, at, |event| controller.on_beat_event(&event));
    }

    pub fn on_beat_event(&mut self, event: &BeatEvent) {
        self.controller.on_beat_event(event);
    }

    /// Run the batch analysis on the last finished recording
    pub fn analyze(&self, analyzer: &PerformanceAnalyzer) -> Result<AnalysisOutcome> {
        let sequence = self
            .last_recording
            .as_ref()
            .ok_or_else(|| Error::Session("no finished recording to analyze".into()))?;

        tracing::info!(session = %self.id, frames = sequence.len(), "Analyzing recording");
        analyzer.analyze(sequence)
    }

    /// Analyze and package the result with session metadata
    pub fn report(&self, analyzer: &PerformanceAnalyzer) -> Result<SessionReport> {
        let outcome = self.analyze(analyzer)?;

        Ok(SessionReport {
            session_id: self.id,
            started_at: self.started_at,
            stopped_at: self.stopped_at,
            frames: self.last_recording.as_ref().map_or(0, PoseSequence::len),
            analysis: outcome.report().cloned(),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// Frames recorded so far in the current recording
    pub fn frame_count(&self) -> usize {
        self.recorder.as_ref().map_or(0, PoseRecorder::len)
    }

    pub fn last_recording(&self) -> Option<&PoseSequence> {
        self.last_recording.as_ref()
    }

    pub fn controller(&self) -> &AudioParameterController<E> {
        &self.controller
    }

    pub fn engine(&self) -> &E {
        self.controller.engine()
    }
}
