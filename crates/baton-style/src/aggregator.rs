//! Imbalance-corrected aggregation of per-window probabilities.
//!
//! Coarse categories hold very different numbers of fine classes (Soft has
//! 33, Unique has one). Each class is weighted by `1 / |category|` so every
//! category carries the same total weight before windows are merged.

use baton_core::ProbabilityVector;

use crate::taxonomy::StyleTaxonomy;

/// Merges window-level predictions into one distribution
#[derive(Debug, Clone)]
pub struct LabelAggregator {
    weights: Vec<f64>,
}

impl LabelAggregator {
    pub fn new(taxonomy: &StyleTaxonomy) -> Self {
        Self {
            weights: Self::compute_weights(taxonomy),
        }
    }

    /// `weight[c] = 1 / count(classes sharing c's coarse category)`
    pub fn compute_weights(taxonomy: &StyleTaxonomy) -> Vec<f64> {
        taxonomy
            .classes()
            .iter()
            .map(|style| {
                let count = taxonomy.count(style.coarse());
                1.0 / count as f64
            })
            .collect()
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn aggregate(&self, windows: &[ProbabilityVector]) -> ProbabilityVector {
        aggregate(windows, &self.weights)
    }
}

/// Weighted mean of the window vectors, renormalized to sum to 1.
///
/// The output has one entry per weight. Classes a window lacks count as zero,
/// classes beyond the weights are ignored and non-finite probabilities count
/// as zero. If the averaged mass is zero the averaged vector is returned as is.
pub fn aggregate(windows: &[ProbabilityVector], weights: &[f64]) -> ProbabilityVector {
    if windows.is_empty() {
        return ProbabilityVector::default();
    }

    let mut summed = vec![0.0; weights.len()];
    for window in windows {
        for (slot, (&p, &w)) in summed.iter_mut().zip(window.as_slice().iter().zip(weights)) {
            if p.is_finite() {
                *slot += p * w;
            }
        }
    }

    let count = windows.len() as f64;
    let averaged: Vec<f64> = summed.into_iter().map(|s| s / count).collect();

    let total: f64 = averaged.iter().sum();
    if total == 0.0 || !total.is_finite() {
        return ProbabilityVector::new(averaged);
    }

    ProbabilityVector::new(averaged.into_iter().map(|p| p / total).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::{CoarseStyle, FineStyle};

    #[test]
    fn test_equal_mass_per_category() {
        let taxonomy = StyleTaxonomy::default_conducting();
        let weights = LabelAggregator::compute_weights(&taxonomy);

        for category in [
            CoarseStyle::Soft,
            CoarseStyle::Strong,
            CoarseStyle::Fast,
            CoarseStyle::Unique,
        ] {
            let mass: f64 = weights
                .iter()
                .enumerate()
                .filter(|(i, _)| taxonomy.coarse(*i) == Some(category))
                .map(|(_, w)| w)
                .sum();
            assert!((mass - 1.0).abs() < 1e-9, "{:?} has mass {}", category, mass);
        }
        assert_eq!(weights[59], 1.0);
    }

    #[test]
    fn test_single_window_sums_to_one() {
        let taxonomy = StyleTaxonomy::default_conducting();
        let aggregator = LabelAggregator::new(&taxonomy);

        let window = ProbabilityVector::new(vec![1.0 / 60.0; 60]);
        let merged = aggregator.aggregate(&[window]);

        assert_eq!(merged.len(), 60);
        assert!((merged.sum() - 1.0).abs() < 1e-9);
        // The lone Unique class outweighs each of the 33 Soft classes
        assert!(merged.0[59] > merged.0[0]);
    }

    #[test]
    fn test_all_zero_windows_unchanged() {
        let weights = vec![0.5, 0.5, 1.0];
        let merged = aggregate(&[ProbabilityVector::zeros(3), ProbabilityVector::zeros(3)], &weights);
        assert_eq!(merged, ProbabilityVector::zeros(3));
    }

    #[test]
    fn test_no_windows() {
        assert!(aggregate(&[], &[1.0, 1.0]).is_empty());
    }

    #[test]
    fn test_averages_across_windows() {
        let taxonomy = StyleTaxonomy::new(vec![FineStyle::Calm, FineStyle::Urgent]);
        let aggregator = LabelAggregator::new(&taxonomy);

        let merged = aggregator.aggregate(&[
            ProbabilityVector::new(vec![1.0, 0.0]),
            ProbabilityVector::new(vec![0.0, 1.0]),
            ProbabilityVector::new(vec![0.0, 1.0]),
        ]);

        assert!((merged.0[0] - 1.0 / 3.0).abs() < 1e-9);
        assert!((merged.0[1] - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_length_mismatch_and_nan() {
        let weights = vec![1.0, 1.0, 1.0];
        let merged = aggregate(
            &[
                ProbabilityVector::new(vec![0.5, f64::NAN]),
                ProbabilityVector::new(vec![0.5, 0.5, 0.0, 9.0]),
            ],
            &weights,
        );

        assert_eq!(merged.len(), 3);
        assert!((merged.sum() - 1.0).abs() < 1e-9);
        assert!((merged.0[0] - 2.0 / 3.0).abs() < 1e-9);
    }
}
