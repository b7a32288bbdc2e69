//! Score synthesis: turns the aggregated distribution and the kinematic
//! scores into three bipolar dials and a feedback sentence.

use baton_core::{Error, ProbabilityVector, Result};
use serde::{Deserialize, Serialize};

use crate::taxonomy::{StyleTaxonomy, TempoBucket};

/// Tunable scoring weights.
///
/// None of these has a single canonical value. Plausible ranges: contrast
/// 1.5-2.0, classifier/kinematic blend around 0.3/0.5.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Weight of the classifier tempo score in the combined tempo
    pub classifier_weight: f64,
    /// Weight of the kinematic rhythm score in the combined tempo
    pub kinematic_weight: f64,
    /// Contrast slope around the neutral point
    pub contrast: f64,
    /// Dial value above which a quality counts as pronounced
    pub high_threshold: f64,
    /// Dial value below which a quality counts as weak
    pub low_threshold: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            classifier_weight: 0.3,
            kinematic_weight: 0.5,
            contrast: 1.5,
            high_threshold: 60.0,
            low_threshold: 40.0,
        }
    }
}

impl ScoringConfig {
    pub fn validate(&self) -> Result<()> {
        let finite = [
            self.classifier_weight,
            self.kinematic_weight,
            self.contrast,
            self.high_threshold,
            self.low_threshold,
        ]
        .iter()
        .all(|v| v.is_finite());

        if !finite {
            return Err(Error::Config("scoring parameters must be finite".into()));
        }
        if self.contrast <= 0.0 {
            return Err(Error::Config(format!(
                "contrast must be positive, got {}",
                self.contrast
            )));
        }
        if self.classifier_weight < 0.0 || self.kinematic_weight < 0.0 {
            return Err(Error::Config("blend weights must be non-negative".into()));
        }
        if self.low_threshold > self.high_threshold {
            return Err(Error::Config(format!(
                "low threshold {} exceeds high threshold {}",
                self.low_threshold, self.high_threshold
            )));
        }
        Ok(())
    }
}

/// A bipolar dial: 0 is fully `label_left`, 100 fully `label_right`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreMetric {
    pub label_left: String,
    pub label_right: String,
    pub value: f64,
}

impl ScoreMetric {
    fn new(label_left: &str, label_right: &str, value: f64) -> Self {
        Self {
            label_left: label_left.to_string(),
            label_right: label_right.to_string(),
            value,
        }
    }
}

/// Overall verdict over expression and movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Feedback {
    /// Rich expression, large movement
    Outstanding,
    /// Rich expression, small movement
    ExpressiveButContained,
    /// Flat expression, large movement
    EnergeticButFlat,
    /// Flat expression, small movement
    Compact,
    Balanced,
}

impl Feedback {
    pub fn text(self) -> &'static str {
        match self {
            Feedback::Outstanding => {
                "Richly expressive and dynamic in motion: a wonderful performance!"
            }
            Feedback::ExpressiveButContained => {
                "Your conducting is full of nuance. Larger gestures would carry \
                 more of that passion to the orchestra."
            }
            Feedback::EnergeticButFlat => {
                "Your movement is very energetic. More variation in phrasing and \
                 rhythm would make it even better."
            }
            Feedback::Compact => {
                "Overall a compact performance. Conduct with more confidence and \
                 let both expression and movement grow!"
            }
            Feedback::Balanced => "A well-balanced performance overall.",
        }
    }
}

/// Final assessment of one recording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreReport {
    /// Flowing/rhythmic, small/large movement, monotone/rich expression
    pub metrics: Vec<ScoreMetric>,
    pub feedback: Feedback,
    /// Classifier-only tempo score before blending
    pub tempo_classifier: f64,
}

impl ScoreReport {
    pub fn feedback_text(&self) -> &'static str {
        self.feedback.text()
    }

    pub fn tempo(&self) -> &ScoreMetric {
        &self.metrics[0]
    }

    pub fn movement(&self) -> &ScoreMetric {
        &self.metrics[1]
    }

    pub fn expression(&self) -> &ScoreMetric {
        &self.metrics[2]
    }
}

/// Contrast curve around the neutral point: `clamp(50 + k·(v - 50), 0, 100)`
pub fn apply_contrast(value: f64, contrast: f64) -> f64 {
    if !value.is_finite() {
        return 50.0;
    }
    (50.0 + contrast * (value - 50.0)).clamp(0.0, 100.0)
}

fn neutral_if_invalid(score: f64) -> f64 {
    if score.is_finite() {
        score
    } else {
        50.0
    }
}

pub struct ScoreSynthesizer {
    config: ScoringConfig,
    taxonomy: StyleTaxonomy,
}

impl ScoreSynthesizer {
    pub fn new(config: ScoringConfig, taxonomy: StyleTaxonomy) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, taxonomy })
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    pub fn apply_contrast(&self, value: f64) -> f64 {
        apply_contrast(value, self.config.contrast)
    }

    /// Fast share of the tempo-bucket mass, 50 when neither bucket has any
    pub fn tempo_classifier(&self, aggregated: &ProbabilityVector) -> f64 {
        let mut slow = 0.0;
        let mut fast = 0.0;

        for (class_id, &p) in aggregated.as_slice().iter().enumerate() {
            if !p.is_finite() {
                continue;
            }
            match self.taxonomy.tempo_bucket(class_id) {
                Some(TempoBucket::Slow) => slow += p,
                Some(TempoBucket::Fast) => fast += p,
                None => {}
            }
        }

        let total = slow + fast;
        if total > 0.0 {
            fast / total * 100.0
        } else {
            50.0
        }
    }

    pub fn synthesize(
        &self,
        aggregated: &ProbabilityVector,
        movement: f64,
        rhythm: f64,
    ) -> ScoreReport {
        let movement = neutral_if_invalid(movement);
        let rhythm = neutral_if_invalid(rhythm);

        let tempo_classifier = self.tempo_classifier(aggregated);
        let combined_tempo = tempo_classifier * self.config.classifier_weight
            + rhythm * self.config.kinematic_weight;
        let expression = (combined_tempo + movement) / 2.0;

        let metrics = vec![
            ScoreMetric::new("Flowing", "Rhythmic", self.apply_contrast(combined_tempo)),
            ScoreMetric::new(
                "Small movement",
                "Large movement",
                self.apply_contrast(movement),
            ),
            ScoreMetric::new(
                "Monotone expression",
                "Rich expression",
                self.apply_contrast(expression),
            ),
        ];

        let feedback = self.feedback(metrics[2].value, metrics[1].value);

        tracing::debug!(
            tempo_classifier,
            combined_tempo,
            movement,
            expression,
            ?feedback,
            "Synthesized score"
        );

        ScoreReport {
            metrics,
            feedback,
            tempo_classifier,
        }
    }

    /// Pick the verdict from contrasted expression and movement
    pub fn feedback(&self, expression: f64, movement: f64) -> Feedback {
        let high = self.config.high_threshold;
        let low = self.config.low_threshold;

        if expression > high && movement > high {
            Feedback::Outstanding
        } else if expression > high && movement < low {
            Feedback::ExpressiveButContained
        } else if expression < low && movement > high {
            Feedback::EnergeticButFlat
        } else if expression < low && movement < low {
            Feedback::Compact
        } else {
            Feedback::Balanced
        }
    }
}

impl Default for ScoreSynthesizer {
    fn default() -> Self {
        Self {
            config: ScoringConfig::default(),
            taxonomy: StyleTaxonomy::default_conducting(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::FineStyle;

    fn with_contrast(contrast: f64) -> ScoreSynthesizer {
        ScoreSynthesizer::new(
            ScoringConfig {
                contrast,
                ..Default::default()
            },
            StyleTaxonomy::default_conducting(),
        )
        .unwrap()
    }

    fn one_hot(class_id: usize) -> ProbabilityVector {
        let mut probs = ProbabilityVector::zeros(60);
        probs.0[class_id] = 1.0;
        probs
    }

    #[test]
    fn test_contrast_neutral_fixed_point() {
        for k in [1.5, 1.75, 2.0] {
            assert_eq!(apply_contrast(50.0, k), 50.0);
            assert_eq!(apply_contrast(100.0, k), 100.0);
            assert_eq!(apply_contrast(0.0, k), 0.0);
            assert!(apply_contrast(60.0, k) > 60.0);
            assert!(apply_contrast(40.0, k) < 40.0);
        }
        assert_eq!(apply_contrast(f64::NAN, 1.5), 50.0);
    }

    #[test]
    fn test_tempo_classifier_buckets() {
        let synth = ScoreSynthesizer::default();

        assert_eq!(synth.tempo_classifier(&one_hot(15)), 100.0); // rhythmic
        assert_eq!(synth.tempo_classifier(&one_hot(0)), 0.0); // calm
        assert_eq!(synth.tempo_classifier(&one_hot(12)), 50.0); // powerful, no bucket
        assert_eq!(synth.tempo_classifier(&ProbabilityVector::default()), 50.0);
    }

    #[test]
    fn test_synthesize_worked_example() {
        let synth = with_contrast(1.5);
        // fast share 100 -> combined = 100*0.3 + 40*0.5 = 50
        let report = synth.synthesize(&one_hot(25), 70.0, 40.0);

        assert!((report.tempo().value - 50.0).abs() < 1e-9);
        assert!((report.movement().value - 80.0).abs() < 1e-9); // 50 + 1.5*20
        assert!((report.expression().value - 65.0).abs() < 1e-9); // (50+70)/2 = 60 -> 65
        assert_eq!(report.feedback, Feedback::Outstanding);
        assert_eq!(report.tempo().label_left, "Flowing");
        assert_eq!(report.expression().label_right, "Rich expression");
    }

    #[test]
    fn test_metrics_bounded_for_extreme_inputs() {
        for k in [1.5, 2.0] {
            let synth = with_contrast(k);
            let cases = [
                (one_hot(15), 1e9, 1e9),
                (one_hot(0), -1e9, -1e9),
                (ProbabilityVector::new(vec![f64::NAN; 60]), f64::NAN, f64::INFINITY),
                (ProbabilityVector::default(), 0.0, 100.0),
            ];

            for (probs, movement, rhythm) in cases {
                let report = synth.synthesize(&probs, movement, rhythm);
                assert_eq!(report.metrics.len(), 3);
                for metric in &report.metrics {
                    assert!(metric.value.is_finite());
                    assert!((0.0..=100.0).contains(&metric.value));
                }
            }
        }
    }

    #[test]
    fn test_non_finite_inputs_are_neutral() {
        let synth = ScoreSynthesizer::default();
        let report = synth.synthesize(&ProbabilityVector::default(), f64::NAN, f64::NAN);

        assert!((report.movement().value - 50.0).abs() < 1e-9);
        assert_eq!(report.tempo_classifier, 50.0);
    }

    #[test]
    fn test_feedback_branches() {
        let synth = ScoreSynthesizer::default();

        assert_eq!(synth.feedback(70.0, 70.0), Feedback::Outstanding);
        assert_eq!(synth.feedback(70.0, 30.0), Feedback::ExpressiveButContained);
        assert_eq!(synth.feedback(30.0, 70.0), Feedback::EnergeticButFlat);
        assert_eq!(synth.feedback(30.0, 30.0), Feedback::Compact);
        assert_eq!(synth.feedback(50.0, 70.0), Feedback::Balanced);
        assert_eq!(synth.feedback(60.0, 60.0), Feedback::Balanced);
        assert!(!Feedback::Compact.text().is_empty());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let taxonomy = StyleTaxonomy::new(vec![FineStyle::Calm]);
        let bad = ScoringConfig {
            contrast: 0.0,
            ..Default::default()
        };
        assert!(ScoreSynthesizer::new(bad, taxonomy.clone()).is_err());

        let inverted = ScoringConfig {
            low_threshold: 70.0,
            ..Default::default()
        };
        assert!(ScoreSynthesizer::new(inverted, taxonomy).is_err());
    }
}
