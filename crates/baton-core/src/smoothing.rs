//! Causal moving-average smoothing of tracked landmarks.
//!
//! Each tracked joint in frame `i` is replaced by the mean of its positions
//! over frames `[max(0, i - window + 1), i]`. The window shrinks at the start
//! of the recording, so no frame ever looks ahead.

use serde::{Deserialize, Serialize};

use crate::types::{Landmark, PoseFrame, PoseSequence};

/// Configuration for landmark smoothing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    /// Number of frames in the averaging window
    pub window_size: usize,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self { window_size: 5 }
    }
}

/// Causal moving-average filter over a recorded sequence
#[derive(Debug, Clone)]
pub struct LandmarkSmoother {
    window_size: usize,
}

impl LandmarkSmoother {
    pub fn new(window_size: usize) -> Self {
        Self {
            window_size: window_size.max(1),
        }
    }

    pub fn from_config(config: &SmoothingConfig) -> Self {
        Self::new(config.window_size)
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Smooth the given joints across the sequence.
    ///
    /// Sequences shorter than the window are returned unchanged. A joint that
    /// is absent in a frame stays absent; absent samples inside the window are
    /// skipped when averaging.
    pub fn smooth(&self, sequence: &PoseSequence, joint_ids: &[usize]) -> PoseSequence {
        let frames = sequence.frames();
        if frames.len() < self.window_size {
            tracing::trace!(
                frames = frames.len(),
                window = self.window_size,
                "Sequence shorter than smoothing window"
            );
            return sequence.clone();
        }

        frames
            .iter()
            .enumerate()
            .map(|(i, frame)| {
                let start = (i + 1).saturating_sub(self.window_size);
                self.smooth_frame(frame, &frames[start..=i], joint_ids)
            })
            .collect()
    }

    fn smooth_frame(&self, frame: &PoseFrame, window: &[PoseFrame], joint_ids: &[usize]) -> PoseFrame {
        let mut smoothed = frame.clone();

        for &joint in joint_ids {
            let Some(current) = frame.get(joint) else {
                continue;
            };

            let (mut sx, mut sy, mut sz, mut n) = (0.0, 0.0, 0.0, 0usize);
            for landmark in window.iter().filter_map(|f| f.get(joint)) {
                sx += landmark.x;
                sy += landmark.y;
                sz += landmark.z;
                n += 1;
            }

            // n >= 1: the current frame is part of its own window
            let n = n as f64;
            smoothed.set(
                joint,
                Some(Landmark {
                    x: sx / n,
                    y: sy / n,
                    z: sz / n,
                    visibility: current.visibility,
                }),
            );
        }

        smoothed
    }
}

impl Default for LandmarkSmoother {
    fn default() -> Self {
        Self::from_config(&SmoothingConfig::default())
    }
}
