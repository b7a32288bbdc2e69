//! Kinematic analysis of tracked joints.
//!
//! Velocity is the mean planar displacement of the tracked joints between two
//! consecutive frames (normalized image units per frame). Acceleration is the
//! absolute change of that velocity between consecutive frame pairs.
//!
//! Two variants are provided:
//!
//! - **Batch**: [`KinematicAnalyzer::compute_dynamics`] scores a whole
//!   recording for movement size and rhythmic activity.
//! - **Live**: [`KinematicAnalyzer::update_instant`] maintains a rolling
//!   buffer of accelerations for per-frame audio control.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::types::{PoseFrame, PoseSequence};

/// Configuration for kinematic scoring
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KinematicConfig {
    /// Weight of average velocity in the movement score
    pub velocity_weight: f64,
    /// Weight of average acceleration in the movement score
    pub acceleration_weight: f64,
    /// Weighted sum that maps to a movement score of 100
    pub movement_scale: f64,
    /// Average acceleration that maps to a rhythm score of 100
    pub rhythm_scale: f64,
    /// Number of acceleration samples kept by the live buffer
    pub live_buffer_len: usize,
}

impl Default for KinematicConfig {
    fn default() -> Self {
        Self {
            velocity_weight: 1.0,
            acceleration_weight: 1.5,
            movement_scale: 0.05,
            rhythm_scale: 0.01,
            live_buffer_len: 30,
        }
    }
}

/// Movement and rhythm scores for a recording, both in [0, 100]
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Dynamics {
    pub movement: f64,
    pub rhythm: f64,
    pub average_velocity: f64,
    pub average_acceleration: f64,
}

impl Dynamics {
    pub fn zero() -> Self {
        Self::default()
    }
}

/// Rolling state for per-frame kinematics
#[derive(Debug, Clone)]
pub struct InstantState {
    last_velocity: f64,
    accelerations: VecDeque<f64>,
    capacity: usize,
}

impl InstantState {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            last_velocity: 0.0,
            accelerations: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    fn push(&mut self, velocity: f64) {
        let acceleration = (velocity - self.last_velocity).abs();
        self.last_velocity = velocity;

        if !acceleration.is_finite() {
            return;
        }

        if self.accelerations.len() == self.capacity {
            self.accelerations.pop_front();
        }
        self.accelerations.push_back(acceleration);
    }

    /// Running average of the buffered accelerations
    pub fn average(&self) -> Option<f64> {
        if self.accelerations.is_empty() {
            return None;
        }
        Some(self.accelerations.iter().sum::<f64>() / self.accelerations.len() as f64)
    }

    pub fn last_velocity(&self) -> f64 {
        self.last_velocity
    }

    pub fn len(&self) -> usize {
        self.accelerations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accelerations.is_empty()
    }

    pub fn reset(&mut self) {
        self.last_velocity = 0.0;
        self.accelerations.clear();
    }
}

impl Default for InstantState {
    fn default() -> Self {
        Self::new(KinematicConfig::default().live_buffer_len)
    }
}

/// Velocity/acceleration based movement analysis
#[derive(Debug, Clone, Default)]
pub struct KinematicAnalyzer {
    config: KinematicConfig,
}

impl KinematicAnalyzer {
    pub fn new(config: KinematicConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &KinematicConfig {
        &self.config
    }

    /// A fresh live state sized from the configuration
    pub fn instant_state(&self) -> InstantState {
        InstantState::new(self.config.live_buffer_len)
    }

    /// Mean planar displacement of the given joints between two frames.
    ///
    /// Joints missing from either frame contribute zero displacement but still
    /// count in the denominator.
    pub fn frame_velocity(prev: &PoseFrame, curr: &PoseFrame, joint_ids: &[usize]) -> f64 {
        if joint_ids.is_empty() {
            return 0.0;
        }

        let distance: f64 = joint_ids
            .iter()
            .filter_map(|&j| Some(prev.get(j)?.planar_distance_to(curr.get(j)?)))
            .filter(|d| d.is_finite())
            .sum();

        distance / joint_ids.len() as f64
    }

    /// Score a whole recording for movement size and rhythmic activity
    pub fn compute_dynamics(&self, sequence: &PoseSequence, joint_ids: &[usize]) -> Dynamics {
        let frames = sequence.frames();
        if frames.len() < 3 || joint_ids.is_empty() {
            return Dynamics::zero();
        }

        let velocities: Vec<f64> = frames
            .windows(2)
            .map(|w| Self::frame_velocity(&w[0], &w[1], joint_ids))
            .collect();

        let total_velocity: f64 = velocities.iter().sum();
        let total_acceleration: f64 = velocities.windows(2).map(|w| (w[1] - w[0]).abs()).sum();

        let average_velocity = total_velocity / velocities.len() as f64;
        let average_acceleration = total_acceleration / (velocities.len() - 1) as f64;

        let movement_raw = average_velocity * self.config.velocity_weight
            + average_acceleration * self.config.acceleration_weight;

        let movement = normalized_score(movement_raw, self.config.movement_scale);
        let rhythm = normalized_score(average_acceleration, self.config.rhythm_scale);

        tracing::trace!(average_velocity, average_acceleration, movement, rhythm, "Dynamics");

        Dynamics {
            movement,
            rhythm,
            average_velocity: finite_or_zero(average_velocity),
            average_acceleration: finite_or_zero(average_acceleration),
        }
    }

    /// Advance the live state by one frame pair and return the running
    /// average acceleration.
    pub fn update_instant(
        &self,
        prev: &PoseFrame,
        curr: &PoseFrame,
        joint_ids: &[usize],
        state: &mut InstantState,
    ) -> f64 {
        let velocity = Self::frame_velocity(prev, curr, joint_ids);
        state.push(velocity);
        state.average().unwrap_or(0.0)
    }
}

/// `clamp01(value / scale) * 100`, zero for degenerate input
fn normalized_score(value: f64, scale: f64) -> f64 {
    if scale <= 0.0 || !scale.is_finite() {
        return 0.0;
    }
    let ratio = value / scale;
    if !ratio.is_finite() {
        return 0.0;
    }
    ratio.clamp(0.0, 1.0) * 100.0
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}
