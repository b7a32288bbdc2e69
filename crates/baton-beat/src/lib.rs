//! # Baton-Beat
//!
//! Beat detection from a handheld accelerometer and the playback-rate and
//! volume estimates derived from it.
//!
//! ## Pipeline
//!
//! ```text
//! sensor ──▶ AccelSource ──▶ decode ──▶ BeatDetector ──▶ BeatEvent
//!                                           │
//!                               TempoTracker / VolumeEstimator
//!                                           │
//!                                   ReferenceTempo (track BPM)
//! ```
//!
//! Synchronous callers feed the detector through [`AccelQueue`]; async
//! callers use [`BeatPipeline`] with a dedicated consumer task.

pub mod acquisition;
pub mod detector;
pub mod message;
pub mod pipeline;
pub mod queue;
pub mod reference;
pub mod tempo;

pub use acquisition::{AccelSource, ChannelAccelSource, TcpAccelSource};
pub use detector::{BeatDetector, BeatDetectorConfig, BeatEvent, BeatState};
pub use message::{decode_message, TimedSample};
pub use pipeline::{BeatPipeline, BeatUpdate, StreamConfig, StreamStats};
pub use queue::AccelQueue;
pub use reference::{fold_bpm, ReferenceConfig, ReferenceTempo};
pub use tempo::{TempoTracker, VolumeEstimator};
