//! Conducting-style taxonomy.
//!
//! The classifier predicts one of 60 fine-grained classes. Each class carries
//! a descriptive style, and styles group into four coarse categories:
//!
//! | Coarse | Styles | Tempo bucket |
//! |--------|--------|--------------|
//! | Soft | Calm, Delicate, Smooth | Slow |
//! | Strong | Intense, Powerful | - |
//! | Fast | Rhythmic, Urgent | Fast |
//! | Unique | Distinctive | - |

use serde::{Deserialize, Serialize};

/// Descriptive style attached to a classifier output class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FineStyle {
    Calm,
    Delicate,
    Smooth,
    Intense,
    Powerful,
    Rhythmic,
    Urgent,
    Distinctive,
}

impl FineStyle {
    pub fn coarse(self) -> CoarseStyle {
        match self {
            FineStyle::Calm | FineStyle::Delicate | FineStyle::Smooth => CoarseStyle::Soft,
            FineStyle::Intense | FineStyle::Powerful => CoarseStyle::Strong,
            FineStyle::Rhythmic | FineStyle::Urgent => CoarseStyle::Fast,
            FineStyle::Distinctive => CoarseStyle::Unique,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FineStyle::Calm => "calm",
            FineStyle::Delicate => "delicate",
            FineStyle::Smooth => "smooth",
            FineStyle::Intense => "intense",
            FineStyle::Powerful => "powerful",
            FineStyle::Rhythmic => "rhythmic",
            FineStyle::Urgent => "urgent",
            FineStyle::Distinctive => "distinctive",
        }
    }
}

impl std::fmt::Display for FineStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Coarse category used for imbalance correction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CoarseStyle {
    Soft,
    Strong,
    Fast,
    Unique,
}

impl CoarseStyle {
    /// Tempo bucket contributing to the flowing/rhythmic dial
    pub fn tempo_bucket(self) -> Option<TempoBucket> {
        match self {
            CoarseStyle::Soft => Some(TempoBucket::Slow),
            CoarseStyle::Fast => Some(TempoBucket::Fast),
            CoarseStyle::Strong | CoarseStyle::Unique => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TempoBucket {
    Slow,
    Fast,
}

/// Mapping from classifier output index to style
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleTaxonomy {
    classes: Vec<FineStyle>,
}

impl StyleTaxonomy {
    pub fn new(classes: Vec<FineStyle>) -> Self {
        Self { classes }
    }

    /// The 60-class taxonomy the conducting model was trained on
    #[rustfmt::skip]
    pub fn default_conducting() -> Self {
        use FineStyle::*;

        Self::new(vec![
            Calm, Calm, Delicate, Delicate, Intense, Smooth, // 0-5
            Delicate, Delicate, Delicate, Delicate, Delicate, Delicate, // 6-11
            Powerful, Calm, Calm, Rhythmic, Rhythmic, Intense, // 12-17
            Delicate, Delicate, Delicate, Delicate, Delicate, Delicate, // 18-23
            Smooth, Urgent, Urgent, Delicate, Calm, Rhythmic, // 24-29
            Powerful, Urgent, Smooth, Urgent, Urgent, Urgent, // 30-35
            Urgent, Urgent, Smooth, Intense, Intense, Powerful, // 36-41
            Calm, Powerful, Smooth, Calm, Delicate, Smooth, // 42-47
            Powerful, Delicate, Rhythmic, Rhythmic, Delicate, Delicate, // 48-53
            Delicate, Powerful, Urgent, Urgent, Urgent, Distinctive, // 54-59
        ])
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn style(&self, class_id: usize) -> Option<FineStyle> {
        self.classes.get(class_id).copied()
    }

    pub fn coarse(&self, class_id: usize) -> Option<CoarseStyle> {
        self.style(class_id).map(FineStyle::coarse)
    }

    pub fn tempo_bucket(&self, class_id: usize) -> Option<TempoBucket> {
        self.coarse(class_id).and_then(CoarseStyle::tempo_bucket)
    }

    /// Number of classes in a coarse category
    pub fn count(&self, category: CoarseStyle) -> usize {
        self.classes.iter().filter(|s| s.coarse() == category).count()
    }

    pub fn classes(&self) -> &[FineStyle] {
        &self.classes
    }
}

impl Default for StyleTaxonomy {
    fn default() -> Self {
        Self::default_conducting()
    }
}
