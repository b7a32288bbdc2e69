//! # Baton-Core
//!
//! Core types and motion analysis for the Baton conducting-performance
//! system.
//!
//! ## Contents
//!
//! - **Types**: landmarks, pose frames, recordings and accelerometer samples
//! - **Smoothing**: causal moving-average filter over tracked joints
//! - **Kinematics**: velocity/acceleration derived movement and rhythm scores,
//!   both over a whole recording and incrementally per live frame

pub mod error;
pub mod kinematics;
pub mod smoothing;
pub mod types;

pub use error::{Error, Result};
pub use kinematics::*;
pub use smoothing::*;
pub use types::*;
