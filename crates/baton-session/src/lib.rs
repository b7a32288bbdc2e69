//! # Baton-Session
//!
//! Wires the live paths (pose → volume, accelerometer → tempo) and the batch
//! style analysis into one performance session, and loads the application
//! configuration.

pub mod config;
pub mod session;

pub use crate::config::BatonConfig;
pub use crate::session::{PerformanceSession, SessionReport, SessionState};
