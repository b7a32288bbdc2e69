//! Windowed style classification of a recorded sequence.

use std::path::PathBuf;

use baton_core::{Error, PoseSequence, ProbabilityVector, Result};
use serde::{Deserialize, Serialize};

use crate::features::{extract_features, FeatureScaler, FrameFeatures};
use crate::model::{LstmStyleModel, StyleModel, StyleModelConfig};
use crate::window::plan_windows;

/// Configuration for windowed classification
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Frames per classification window
    pub window_length: usize,
    /// Step between window start indices
    pub stride: usize,
    /// Safetensors checkpoint of the style model
    pub model_path: PathBuf,
    /// JSON file holding the feature scaler (`mean`, `scale`)
    pub scaler_path: PathBuf,
    /// Model shape
    pub model: StyleModelConfig,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            window_length: 60,
            stride: 30,
            model_path: PathBuf::from("models/style_lstm.safetensors"),
            scaler_path: PathBuf::from("models/scaler.json"),
            model: StyleModelConfig::default(),
        }
    }
}

/// Slices a recording into windows and classifies each one in turn
pub struct WindowedClassifier {
    model: Box<dyn StyleModel>,
    scaler: FeatureScaler,
    window_length: usize,
    stride: usize,
}

impl WindowedClassifier {
    pub fn new(
        model: Box<dyn StyleModel>,
        scaler: FeatureScaler,
        window_length: usize,
        stride: usize,
    ) -> Result<Self> {
        if window_length == 0 || stride == 0 {
            return Err(Error::Config(format!(
                "window length ({}) and stride ({}) must be positive",
                window_length, stride
            )));
        }

        Ok(Self {
            model,
            scaler,
            window_length,
            stride,
        })
    }

    /// Load the model checkpoint and scaler named by the configuration
    pub fn load(config: &ClassifierConfig) -> Result<Self> {
        let scaler = FeatureScaler::from_file(&config.scaler_path)?;
        let model = LstmStyleModel::load(&config.model_path, config.model.clone())?;

        tracing::info!(
            model = %config.model_path.display(),
            classes = config.model.num_classes,
            "Loaded style classifier"
        );

        Self::new(Box::new(model), scaler, config.window_length, config.stride)
    }

    /// Classify every window of the recording.
    ///
    /// Windows are submitted to the model strictly one after another. An
    /// empty recording yields no windows and never touches the model.
    pub fn classify(&self, sequence: &PoseSequence) -> Result<Vec<ProbabilityVector>> {
        let spans = plan_windows(sequence.len(), self.window_length, self.stride)?;
        if spans.is_empty() {
            return Ok(Vec::new());
        }

        // Preprocess each frame once; overlapping windows share rows
        let features: Vec<FrameFeatures> = sequence
            .iter()
            .map(|frame| extract_features(frame, &self.scaler))
            .collect();

        let expected = self.model.num_classes();
        let mut results = Vec::with_capacity(spans.len());

        for span in &spans {
            let window: Vec<FrameFeatures> = span.frame_indices().map(|i| features[i]).collect();
            let probs = self.model.predict(&window)?;

            if probs.len() != expected {
                return Err(Error::ClassCountMismatch {
                    expected,
                    actual: probs.len(),
                });
            }
            results.push(probs);
        }

        tracing::debug!(
            frames = sequence.len(),
            windows = results.len(),
            padded = spans.first().map(|s| s.is_padded()).unwrap_or(false),
            "Classified recording"
        );

        Ok(results)
    }

    pub fn num_classes(&self) -> usize {
        self.model.num_classes()
    }

    pub fn window_length(&self) -> usize {
        self.window_length
    }

    pub fn stride(&self) -> usize {
        self.stride
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FEATURE_COUNT;
    use baton_core::{joints, Landmark, PoseFrame};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// (window length, first x, last x) per call
    type WindowLog = Mutex<Vec<(usize, f32, f32)>>;

    /// Records the shape of each window it is handed
    struct RecordingModel {
        calls: Arc<AtomicUsize>,
        log: Arc<WindowLog>,
    }

    impl StyleModel for RecordingModel {
        fn num_classes(&self) -> usize {
            3
        }

        fn predict(&self, window: &[FrameFeatures]) -> Result<ProbabilityVector> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.log.lock().unwrap().push((
                window.len(),
                window[0][0],
                window[window.len() - 1][0],
            ));
            Ok(ProbabilityVector::new(vec![0.2, 0.3, 0.5]))
        }
    }

    struct WrongSizeModel;

    impl StyleModel for WrongSizeModel {
        fn num_classes(&self) -> usize {
            4
        }

        fn predict(&self, _window: &[FrameFeatures]) -> Result<ProbabilityVector> {
            Ok(ProbabilityVector::new(vec![1.0]))
        }
    }

    fn sequence(len: usize) -> PoseSequence {
        (0..len)
            .map(|i| {
                let x = i as f64;
                PoseFrame::empty()
                    .with_joint(joints::RIGHT_WRIST, Landmark::new(x, 0.0, 0.0))
                    .with_joint(joints::LEFT_WRIST, Landmark::new(x, 0.0, 0.0))
                    .with_joint(joints::RIGHT_ELBOW, Landmark::new(x, 0.0, 0.0))
                    .with_joint(joints::LEFT_ELBOW, Landmark::new(x, 0.0, 0.0))
            })
            .collect()
    }

    fn classifier() -> (WindowedClassifier, Arc<AtomicUsize>, Arc<WindowLog>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let log = Arc::new(WindowLog::default());
        let model = RecordingModel {
            calls: calls.clone(),
            log: log.clone(),
        };
        let classifier =
            WindowedClassifier::new(Box::new(model), FeatureScaler::identity(), 60, 30).unwrap();
        (classifier, calls, log)
    }

    #[test]
    fn test_ninety_frames_two_windows() {
        let (classifier, calls, log) = classifier();
        let results = classifier.classify(&sequence(90)).unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let log = log.lock().unwrap();
        assert_eq!(log[0], (60, 0.0, 59.0));
        assert_eq!(log[1], (60, 30.0, 89.0));
    }

    #[test]
    fn test_short_sequence_padded() {
        let (classifier, calls, log) = classifier();
        let results = classifier.classify(&sequence(7)).unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        // Padded with the final frame (x = 6)
        assert_eq!(log.lock().unwrap()[0], (60, 0.0, 6.0));
    }

    #[test]
    fn test_empty_sequence_skips_model() {
        let (classifier, calls, _) = classifier();
        let results = classifier.classify(&PoseSequence::default()).unwrap();

        assert!(results.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_occluded_frames_classified() {
        let (classifier, _, log) = classifier();
        let seq: PoseSequence = (0..60).map(|_| PoseFrame::empty()).collect();

        let results = classifier.classify(&seq).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(log.lock().unwrap()[0], (60, 0.0, 0.0));
    }

    #[test]
    fn test_class_count_mismatch() {
        let classifier =
            WindowedClassifier::new(Box::new(WrongSizeModel), FeatureScaler::identity(), 60, 30)
                .unwrap();
        let err = classifier.classify(&sequence(61)).unwrap_err();
        assert!(matches!(err, Error::ClassCountMismatch { expected: 4, actual: 1 }));
    }

    #[test]
    fn test_lstm_end_to_end() {
        let model = LstmStyleModel::new_random(StyleModelConfig {
            hidden_dim: 8,
            num_classes: 6,
            ..Default::default()
        })
        .unwrap();
        let classifier =
            WindowedClassifier::new(Box::new(model), FeatureScaler::identity(), 20, 10).unwrap();

        let results = classifier.classify(&sequence(45)).unwrap();
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|p| p.len() == 6));
        assert_eq!(FEATURE_COUNT, 12);
    }

    #[test]
    fn test_load_missing_resources() {
        let config = ClassifierConfig {
            scaler_path: PathBuf::from("/nonexistent/scaler.json"),
            ..Default::default()
        };
        assert!(matches!(WindowedClassifier::load(&config), Err(Error::Scaler(_))));
    }

    #[test]
    fn test_load_missing_checkpoint() {
        let mut scaler_file = tempfile::NamedTempFile::new().unwrap();
        let json = serde_json::to_string(&FeatureScaler::identity()).unwrap();
        std::io::Write::write_all(&mut scaler_file, json.as_bytes()).unwrap();

        let config = ClassifierConfig {
            scaler_path: scaler_file.path().to_path_buf(),
            model_path: PathBuf::from("/nonexistent/style.safetensors"),
            ..Default::default()
        };
        assert!(matches!(WindowedClassifier::load(&config), Err(Error::ModelLoad(_))));
    }
}
