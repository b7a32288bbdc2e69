//! # Baton-Style
//!
//! Turns windowed classifier output and kinematic scores into a
//! human-readable assessment of a conducting performance.
//!
//! ## Stages
//!
//! - **Taxonomy**: 60 model classes grouped into styles and coarse categories
//! - **Aggregation**: imbalance-corrected merge of per-window probabilities
//! - **Synthesis**: contrast-mapped bipolar dials plus a feedback verdict
//! - **Analyzer**: the full batch pipeline over one recording, guarded by the
//!   load state of the classifier resources

pub mod aggregator;
pub mod analyzer;
pub mod synthesizer;
pub mod taxonomy;

pub use aggregator::*;
pub use analyzer::*;
pub use synthesizer::*;
pub use taxonomy::*;
