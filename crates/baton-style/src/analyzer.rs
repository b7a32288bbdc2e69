//! Batch analysis of a finished recording.

use std::sync::Arc;

use baton_classifier::WindowedClassifier;
use baton_core::{
    joints, Dynamics, Error, KinematicAnalyzer, KinematicConfig, LandmarkSmoother, PoseSequence,
    ProbabilityVector, Result, SmoothingConfig,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::aggregator::LabelAggregator;
use crate::synthesizer::{ScoreReport, ScoreSynthesizer, ScoringConfig};
use crate::taxonomy::{FineStyle, StyleTaxonomy};

/// Source of the classifier resources (model weights and scaler)
pub trait ResourceLoader: Send + Sync {
    fn load(&self) -> Result<WindowedClassifier>;
}

impl<F> ResourceLoader for F
where
    F: Fn() -> Result<WindowedClassifier> + Send + Sync,
{
    fn load(&self) -> Result<WindowedClassifier> {
        self()
    }
}

/// Settings for the analysis stages that run around the classifier
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub smoothing: SmoothingConfig,
    pub kinematics: KinematicConfig,
    pub scoring: ScoringConfig,
}

enum ResourceState {
    Ready(Arc<WindowedClassifier>),
    Failed(String),
}

/// Whether the analyzer can currently run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceStatus {
    Ready,
    Failed(String),
}

/// Everything produced for one recording
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub score: ScoreReport,
    pub dynamics: Dynamics,
    pub aggregated: ProbabilityVector,
    /// Most probable style after aggregation
    pub dominant_style: Option<FineStyle>,
    pub frame_count: usize,
    pub window_count: usize,
}

#[derive(Debug, Clone)]
pub enum AnalysisOutcome {
    Completed(AnalysisReport),
    /// The recording held no frames
    NoData,
}

impl AnalysisOutcome {
    pub fn report(&self) -> Option<&AnalysisReport> {
        match self {
            AnalysisOutcome::Completed(report) => Some(report),
            AnalysisOutcome::NoData => None,
        }
    }
}

/// Smooth → dynamics → classify → aggregate → synthesize
pub struct PerformanceAnalyzer {
    loader: Box<dyn ResourceLoader>,
    state: RwLock<ResourceState>,
    smoother: LandmarkSmoother,
    kinematics: KinematicAnalyzer,
    taxonomy: StyleTaxonomy,
    aggregator: LabelAggregator,
    synthesizer: ScoreSynthesizer,
}

impl PerformanceAnalyzer {
    /// Build the analyzer and load its resources once.
    ///
    /// A resource failure does not fail construction: the analyzer enters the
    /// failed state and every `analyze` call reports it until `reload`
    /// succeeds. Only invalid configuration is returned as an error.
    pub fn new<L>(loader: L, config: AnalysisConfig, taxonomy: StyleTaxonomy) -> Result<Self>
    where
        L: ResourceLoader + 'static,
    {
        let synthesizer = ScoreSynthesizer::new(config.scoring, taxonomy.clone())?;
        let loader: Box<dyn ResourceLoader> = Box::new(loader);
        let state = Self::load_state(loader.as_ref(), &taxonomy);

        Ok(Self {
            loader,
            state: RwLock::new(state),
            smoother: LandmarkSmoother::from_config(&config.smoothing),
            kinematics: KinematicAnalyzer::new(config.kinematics),
            aggregator: LabelAggregator::new(&taxonomy),
            taxonomy,
            synthesizer,
        })
    }

    fn load_state(loader: &dyn ResourceLoader, taxonomy: &StyleTaxonomy) -> ResourceState {
        match loader.load() {
            Ok(classifier) => {
                if classifier.num_classes() != taxonomy.len() {
                    tracing::warn!(
                        model_classes = classifier.num_classes(),
                        taxonomy_classes = taxonomy.len(),
                        "Classifier and taxonomy sizes differ"
                    );
                }
                tracing::info!("Analysis resources ready");
                ResourceState::Ready(Arc::new(classifier))
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load analysis resources");
                ResourceState::Failed(e.to_string())
            }
        }
    }

    /// Retry loading resources, replacing the current state either way
    pub fn reload(&self) -> Result<()> {
        let state = Self::load_state(self.loader.as_ref(), &self.taxonomy);
        let result = match &state {
            ResourceState::Ready(_) => Ok(()),
            ResourceState::Failed(reason) => Err(Error::ResourceUnavailable(reason.clone())),
        };
        *self.state.write() = state;
        result
    }

    pub fn status(&self) -> ResourceStatus {
        match &*self.state.read() {
            ResourceState::Ready(_) => ResourceStatus::Ready,
            ResourceState::Failed(reason) => ResourceStatus::Failed(reason.clone()),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.status(), ResourceStatus::Ready)
    }

    fn classifier(&self) -> Result<Arc<WindowedClassifier>> {
        match &*self.state.read() {
            ResourceState::Ready(classifier) => Ok(classifier.clone()),
            ResourceState::Failed(reason) => Err(Error::ResourceUnavailable(reason.clone())),
        }
    }

    pub fn analyze(&self, sequence: &PoseSequence) -> Result<AnalysisOutcome> {
        let classifier = self.classifier()?;

        if sequence.is_empty() {
            return Ok(AnalysisOutcome::NoData);
        }

        let smoothed = self.smoother.smooth(sequence, &joints::ARMS);
        let dynamics = self.kinematics.compute_dynamics(&smoothed, &joints::WRISTS);

        let windows = classifier.classify(&smoothed)?;
        if windows.is_empty() {
            return Ok(AnalysisOutcome::NoData);
        }

        let aggregated = self.aggregator.aggregate(&windows);
        let score = self
            .synthesizer
            .synthesize(&aggregated, dynamics.movement, dynamics.rhythm);
        let dominant_style = aggregated.argmax().and_then(|i| self.taxonomy.style(i));

        tracing::info!(
            frames = sequence.len(),
            windows = windows.len(),
            movement = dynamics.movement,
            rhythm = dynamics.rhythm,
            feedback = ?score.feedback,
            "Analysis complete"
        );

        Ok(AnalysisOutcome::Completed(AnalysisReport {
            score,
            dynamics,
            aggregated,
            dominant_style,
            frame_count: sequence.len(),
            window_count: windows.len(),
        }))
    }

    pub fn taxonomy(&self) -> &StyleTaxonomy {
        &self.taxonomy
    }
}
