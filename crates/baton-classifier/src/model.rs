//! Style classification model.
//!
//! The model consumes one standardized window `[1, window_length, 12]` and
//! returns a softmax distribution over the style taxonomy.
//!
//! ## Architecture
//!
//! ```text
//! window [1, T, 12] ──▶ LSTM(hidden) ──▶ last hidden state [1, hidden]
//!                                              │
//!                                              ▼
//!                                  Linear(hidden → classes) ──▶ softmax
//! ```

use std::path::Path;

use baton_core::{Error, ProbabilityVector, Result};
use candle_core::{DType, Device, Tensor, D};
use candle_nn::{Linear, LSTMConfig, Module, VarBuilder, VarMap, LSTM, RNN};
use serde::{Deserialize, Serialize};

use crate::features::{FrameFeatures, FEATURE_COUNT};

/// Anything that maps a feature window to class probabilities
pub trait StyleModel: Send + Sync {
    /// Number of classes in the returned probability vector
    fn num_classes(&self) -> usize;

    /// Classify one window of standardized frames
    fn predict(&self, window: &[FrameFeatures]) -> Result<ProbabilityVector>;
}

/// Compute device for inference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DeviceType {
    #[default]
    Cpu,
    Cuda(usize),
    Metal,
}

impl DeviceType {
    fn device(self) -> Result<Device> {
        let device = match self {
            DeviceType::Cpu => Ok(Device::Cpu),
            DeviceType::Cuda(ordinal) => Device::new_cuda(ordinal),
            DeviceType::Metal => Device::new_metal(0),
        };
        device.map_err(|e| Error::ModelLoad(format!("device unavailable: {}", e)))
    }
}

/// Shape of the recurrent style model
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleModelConfig {
    pub input_dim: usize,
    pub hidden_dim: usize,
    pub num_classes: usize,
    pub device: DeviceType,
}

impl Default for StyleModelConfig {
    fn default() -> Self {
        Self {
            input_dim: FEATURE_COUNT,
            hidden_dim: 64,
            num_classes: 60,
            device: DeviceType::Cpu,
        }
    }
}

/// LSTM classifier running on candle
pub struct LstmStyleModel {
    lstm: LSTM,
    head: Linear,
    device: Device,
    config: StyleModelConfig,
}

impl LstmStyleModel {
    /// Create a model with randomly initialized weights (for testing)
    pub fn new_random(config: StyleModelConfig) -> Result<Self> {
        let device = config.device.device()?;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        Self::build(config, vb, device)
    }

    /// Load trained weights from a safetensors checkpoint
    pub fn load<P: AsRef<Path>>(path: P, config: StyleModelConfig) -> Result<Self> {
        let path = path.as_ref();
        let device = config.device.device()?;

        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[path], DType::F32, &device)
                .map_err(|e| Error::ModelLoad(format!("{}: {}", path.display(), e)))?
        };

        Self::build(config, vb, device)
    }

    fn build(config: StyleModelConfig, vb: VarBuilder, device: Device) -> Result<Self> {
        if config.input_dim != FEATURE_COUNT {
            return Err(Error::ModelLoad(format!(
                "model input dim {} does not match feature count {}",
                config.input_dim, FEATURE_COUNT
            )));
        }

        let lstm = candle_nn::lstm(
            config.input_dim,
            config.hidden_dim,
            LSTMConfig::default(),
            vb.pp("lstm"),
        )
        .map_err(|e| Error::ModelLoad(e.to_string()))?;

        let head = candle_nn::linear(config.hidden_dim, config.num_classes, vb.pp("head"))
            .map_err(|e| Error::ModelLoad(e.to_string()))?;

        Ok(Self {
            lstm,
            head,
            device,
            config,
        })
    }

    fn forward(&self, window: &[FrameFeatures]) -> candle_core::Result<Vec<f32>> {
        let data: Vec<f32> = window.iter().flat_map(|f| f.iter().copied()).collect();
        let input = Tensor::from_vec(data, (1, window.len(), FEATURE_COUNT), &self.device)?;

        let states = self.lstm.seq(&input)?;
        let last = states
            .last()
            .ok_or_else(|| candle_core::Error::Msg("empty window".into()))?;

        let logits = self.head.forward(last.h())?;
        let probs = candle_nn::ops::softmax(&logits, D::Minus1)?;

        probs.squeeze(0)?.to_vec1::<f32>()
    }

    pub fn config(&self) -> &StyleModelConfig {
        &self.config
    }
}

impl StyleModel for LstmStyleModel {
    fn num_classes(&self) -> usize {
        self.config.num_classes
    }

    fn predict(&self, window: &[FrameFeatures]) -> Result<ProbabilityVector> {
        if window.is_empty() {
            return Err(Error::Inference("cannot classify an empty window".into()));
        }

        let probs = self
            .forward(window)
            .map_err(|e| Error::Inference(e.to_string()))?;

        Ok(ProbabilityVector::new(probs.into_iter().map(f64::from).collect()))
    }
}
