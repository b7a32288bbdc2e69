//! # Baton-Classifier
//!
//! Windowed conducting-style classification over recorded pose sequences.
//!
//! ## Pipeline
//!
//! 1. **Window planning**: slice the recording into fixed-length windows at a
//!    fixed stride; recordings shorter than one window are padded by repeating
//!    their final frame
//! 2. **Preprocessing**: extract wrists and elbows as 12 coordinates per frame
//!    and standardize them with the training-time scaler
//! 3. **Inference**: submit each window to the style model, one at a time
//!
//! The model returns one probability vector per window over the style
//! taxonomy; aggregation and scoring live in `baton-style`.

pub mod classifier;
pub mod features;
pub mod model;
pub mod window;

pub use classifier::*;
pub use features::*;
pub use model::*;
pub use window::*;
