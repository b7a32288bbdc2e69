//! Fundamental types for the Baton system.

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Number of joints reported per frame by the pose estimator (MediaPipe Pose)
pub const JOINT_COUNT: usize = 33;

/// Joint indices used by the analysis (MediaPipe Pose numbering)
pub mod joints {
    pub const LEFT_ELBOW: usize = 13;
    pub const RIGHT_ELBOW: usize = 14;
    pub const LEFT_WRIST: usize = 15;
    pub const RIGHT_WRIST: usize = 16;

    /// Joints driving velocity-based measurements
    pub const WRISTS: [usize; 2] = [RIGHT_WRIST, LEFT_WRIST];

    /// Joints fed to the style classifier and the smoother, in feature order
    pub const ARMS: [usize; 4] = [RIGHT_WRIST, LEFT_WRIST, RIGHT_ELBOW, LEFT_ELBOW];
}

/// Normalized image-space position of one tracked joint
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<f64>,
}

impl Landmark {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            x,
            y,
            z,
            visibility: None,
        }
    }

    pub fn with_visibility(mut self, visibility: f64) -> Self {
        self.visibility = Some(visibility);
        self
    }

    /// Euclidean distance in the image plane (depth ignored)
    pub fn planar_distance_to(&self, other: &Landmark) -> f64 {
        (Vector2::new(other.x, other.y) - Vector2::new(self.x, self.y)).norm()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// One processed video frame: joint index → landmark, entries may be absent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Option<Landmark>>", into = "Vec<Option<Landmark>>")]
pub struct PoseFrame {
    landmarks: Vec<Option<Landmark>>,
}

impl PoseFrame {
    /// Frame with every joint absent
    pub fn empty() -> Self {
        Self {
            landmarks: vec![None; JOINT_COUNT],
        }
    }

    pub fn with_joint(mut self, joint: usize, landmark: Landmark) -> Self {
        self.set(joint, Some(landmark));
        self
    }

    pub fn get(&self, joint: usize) -> Option<&Landmark> {
        self.landmarks.get(joint).and_then(|l| l.as_ref())
    }

    /// Set or clear a joint; indices outside the skeleton are ignored
    pub fn set(&mut self, joint: usize, landmark: Option<Landmark>) {
        if let Some(slot) = self.landmarks.get_mut(joint) {
            *slot = landmark;
        }
    }

    pub fn present_count(&self) -> usize {
        self.landmarks.iter().filter(|l| l.is_some()).count()
    }

    pub fn landmarks(&self) -> &[Option<Landmark>] {
        &self.landmarks
    }
}

impl Default for PoseFrame {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<Vec<Option<Landmark>>> for PoseFrame {
    fn from(mut landmarks: Vec<Option<Landmark>>) -> Self {
        landmarks.resize(JOINT_COUNT, None);
        Self { landmarks }
    }
}

impl From<PoseFrame> for Vec<Option<Landmark>> {
    fn from(frame: PoseFrame) -> Self {
        frame.landmarks
    }
}

/// Append-only buffer that grows while a recording session is active.
///
/// Call [`PoseRecorder::finish`] when detection stops to obtain the frozen
/// [`PoseSequence`].
#[derive(Debug, Default)]
pub struct PoseRecorder {
    frames: Vec<PoseFrame>,
}

impl PoseRecorder {
    pub fn new() -> Self {
        Self { frames: Vec::new() }
    }

    pub fn push(&mut self, frame: PoseFrame) {
        self.frames.push(frame);
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn last(&self) -> Option<&PoseFrame> {
        self.frames.last()
    }

    pub fn finish(self) -> PoseSequence {
        PoseSequence {
            frames: self.frames,
        }
    }
}

/// Immutable ordered list of frames for one recording session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PoseSequence {
    frames: Vec<PoseFrame>,
}

impl PoseSequence {
    pub fn new(frames: Vec<PoseFrame>) -> Self {
        Self { frames }
    }

    pub fn frames(&self) -> &[PoseFrame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PoseFrame> {
        self.frames.iter()
    }

    /// Load a recording stored as a JSON array of frames
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl FromIterator<PoseFrame> for PoseSequence {
    fn from_iter<I: IntoIterator<Item = PoseFrame>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// One accelerometer/gyroscope reading from the handheld sensor
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AccelSample {
    pub acc_x: f64,
    pub acc_y: f64,
    pub acc_z: f64,
    pub gyro_x: f64,
    pub gyro_y: f64,
    pub gyro_z: f64,
}

impl AccelSample {
    pub fn from_acceleration(acc_x: f64, acc_y: f64, acc_z: f64) -> Self {
        Self {
            acc_x,
            acc_y,
            acc_z,
            ..Default::default()
        }
    }

    /// Parse one sensor message
    pub fn from_json(message: &str) -> Result<Self> {
        let sample: AccelSample = serde_json::from_str(message)?;
        if !sample.is_finite() {
            return Err(Error::InvalidInput(
                "accelerometer sample contains non-finite values".into(),
            ));
        }
        Ok(sample)
    }

    /// Beat-detection signal: L1 norm of the acceleration vector
    pub fn magnitude(&self) -> f64 {
        self.acc_x.abs() + self.acc_y.abs() + self.acc_z.abs()
    }

    pub fn is_finite(&self) -> bool {
        [
            self.acc_x,
            self.acc_y,
            self.acc_z,
            self.gyro_x,
            self.gyro_y,
            self.gyro_z,
        ]
        .iter()
        .all(|v| v.is_finite())
    }
}

/// Per-class probabilities over the style taxonomy
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProbabilityVector(pub Vec<f64>);

impl ProbabilityVector {
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    pub fn zeros(len: usize) -> Self {
        Self(vec![0.0; len])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn sum(&self) -> f64 {
        self.0.iter().sum()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Index of the most probable class
    pub fn argmax(&self) -> Option<usize> {
        self.0
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_finite())
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_deserializes_short_list() {
        let json = r#"[{"x":0.1,"y":0.2,"z":0.3},null]"#;
        let frame: PoseFrame = serde_json::from_str(json).unwrap();

        assert_eq!(frame.landmarks().len(), JOINT_COUNT);
        assert_eq!(frame.get(0).unwrap().y, 0.2);
        assert!(frame.get(1).is_none());
        assert!(frame.get(joints::RIGHT_WRIST).is_none());
    }

    #[test]
    fn test_set_out_of_range_is_ignored() {
        let mut frame = PoseFrame::empty();
        frame.set(JOINT_COUNT + 4, Some(Landmark::new(1.0, 1.0, 1.0)));
        assert_eq!(frame.present_count(), 0);
    }

    #[test]
    fn test_recorder_freezes_in_order() {
        let mut recorder = PoseRecorder::new();
        for i in 0..3 {
            recorder.push(
                PoseFrame::empty().with_joint(joints::LEFT_WRIST, Landmark::new(i as f64, 0.0, 0.0)),
            );
        }

        let sequence = recorder.finish();
        assert_eq!(sequence.len(), 3);
        assert_eq!(sequence.frames()[2].get(joints::LEFT_WRIST).unwrap().x, 2.0);
    }

    #[test]
    fn test_planar_distance_ignores_depth() {
        let a = Landmark::new(0.1, 0.2, 0.9);
        let b = Landmark::new(0.4, 0.6, -0.5);
        assert!((a.planar_distance_to(&b) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_accel_magnitude() {
        let sample = AccelSample::from_acceleration(-1.5, 2.0, -0.5);
        assert!((sample.magnitude() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_accel_parse() {
        let msg = r#"{"acc_x":1.0,"acc_y":-2.0,"acc_z":0.5,"gyro_x":0.0,"gyro_y":0.1,"gyro_z":0.2}"#;
        let sample = AccelSample::from_json(msg).unwrap();
        assert_eq!(sample.acc_y, -2.0);
        assert!(AccelSample::from_json("{\"acc_x\": 1.0}").is_err());
        assert!(AccelSample::from_json("not json").is_err());
    }

    #[test]
    fn test_argmax() {
        let probs = ProbabilityVector::new(vec![0.1, 0.7, 0.2]);
        assert_eq!(probs.argmax(), Some(1));
        assert_eq!(ProbabilityVector::default().argmax(), None);
    }
}
