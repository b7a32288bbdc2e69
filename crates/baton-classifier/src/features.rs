//! Per-frame feature extraction and standardization.

use std::path::Path;

use baton_core::{joints, Error, PoseFrame, Result};
use serde::{Deserialize, Serialize};

/// Number of features per frame: four joints × (x, y, z)
pub const FEATURE_COUNT: usize = 12;

/// Standardized features of a single frame
pub type FrameFeatures = [f32; FEATURE_COUNT];

/// Standard scaler fitted at training time (`(v - mean) / scale`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl FeatureScaler {
    pub fn new(mean: Vec<f64>, scale: Vec<f64>) -> Result<Self> {
        let scaler = Self { mean, scale };
        scaler.validate()?;
        Ok(scaler)
    }

    /// Scaler that leaves features unchanged
    pub fn identity() -> Self {
        Self {
            mean: vec![0.0; FEATURE_COUNT],
            scale: vec![1.0; FEATURE_COUNT],
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let scaler: FeatureScaler = serde_json::from_str(json)
            .map_err(|e| Error::Scaler(format!("invalid scaler JSON: {}", e)))?;
        scaler.validate()?;
        Ok(scaler)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| Error::Scaler(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }

    fn validate(&self) -> Result<()> {
        if self.mean.len() != FEATURE_COUNT || self.scale.len() != FEATURE_COUNT {
            return Err(Error::Scaler(format!(
                "expected {} mean/scale entries, got {}/{}",
                FEATURE_COUNT,
                self.mean.len(),
                self.scale.len()
            )));
        }
        if let Some(i) = self.mean.iter().position(|m| !m.is_finite()) {
            return Err(Error::Scaler(format!("mean[{}] is not finite", i)));
        }
        if let Some(i) = self
            .scale
            .iter()
            .position(|s| !s.is_finite() || *s == 0.0)
        {
            return Err(Error::Scaler(format!("scale[{}] must be finite and non-zero", i)));
        }
        Ok(())
    }

    pub fn transform(&self, raw: &[f64; FEATURE_COUNT]) -> FrameFeatures {
        let mut out = [0.0f32; FEATURE_COUNT];
        for (i, v) in raw.iter().enumerate() {
            out[i] = ((v - self.mean[i]) / self.scale[i]) as f32;
        }
        out
    }
}

/// Extract the standardized arm features of one frame.
///
/// Order: right wrist, left wrist, right elbow, left elbow, each as (x, y, z).
/// If any of the four joints is missing, or a coordinate is not finite, the
/// whole vector is zero-filled.
pub fn extract_features(frame: &PoseFrame, scaler: &FeatureScaler) -> FrameFeatures {
    let mut raw = [0.0f64; FEATURE_COUNT];

    for (slot, &joint) in joints::ARMS.iter().enumerate() {
        match frame.get(joint) {
            Some(landmark) if landmark.is_finite() => {
                raw[slot * 3] = landmark.x;
                raw[slot * 3 + 1] = landmark.y;
                raw[slot * 3 + 2] = landmark.z;
            }
            _ => return [0.0; FEATURE_COUNT],
        }
    }

    scaler.transform(&raw)
}
