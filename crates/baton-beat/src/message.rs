//! Sensor message decoding.
//!
//! The sensor sends one JSON object per message:
//! `{"acc_x":..,"acc_y":..,"acc_z":..,"gyro_x":..,"gyro_y":..,"gyro_z":..}`.
//! Messages carry no timestamp; the consumer stamps arrival time.

use std::time::Duration;

use baton_core::AccelSample;

/// A sample stamped with its arrival time relative to stream start
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimedSample {
    pub sample: AccelSample,
    pub at: Duration,
}

/// Decode one message, dropping anything malformed
pub fn decode_message(message: &str) -> Option<AccelSample> {
    let trimmed = message.trim();
    if trimmed.is_empty() {
        return None;
    }

    match AccelSample::from_json(trimmed) {
        Ok(sample) => Some(sample),
        Err(e) => {
            tracing::debug!(error = %e, "Dropping malformed sensor message");
            None
        }
    }
}
