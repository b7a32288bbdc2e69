//! # Baton-Audio
//!
//! Real-time control of a granular audio player from the performer's motion:
//! wrist acceleration sets the volume, detected beats set playback rate and
//! grain size.

pub mod controller;
pub mod engine;

pub use controller::*;
pub use engine::*;
