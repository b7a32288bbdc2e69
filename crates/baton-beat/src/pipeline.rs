//! Streaming beat pipeline.
//!
//! A dedicated consumer task reads raw sensor messages, decodes them, stamps
//! arrival time and runs the beat detector. Events leave on a bounded channel
//! in arrival order.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

use baton_core::Result;

use crate::acquisition::AccelSource;
use crate::detector::{BeatDetector, BeatEvent};
use crate::message::decode_message;

/// Configuration for the sensor stream
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Sensor endpoint for the TCP source
    pub address: String,
    /// Longest accepted message in bytes
    pub max_message_len: usize,
    /// Capacity of the event channel
    pub output_queue_size: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:8080".to_string(),
            max_message_len: 4096,
            output_queue_size: 256,
        }
    }
}

/// A non-empty detector event and its arrival time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeatUpdate {
    pub event: BeatEvent,
    /// Arrival time relative to the start of streaming
    pub at: Duration,
}

/// Counters shared with the consumer task
#[derive(Debug, Default)]
pub struct StreamStats {
    received: AtomicU64,
    dropped: AtomicU64,
    events: AtomicU64,
}

impl StreamStats {
    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    /// Messages that failed to decode
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn events(&self) -> u64 {
        self.events.load(Ordering::Relaxed)
    }
}

pub struct BeatPipeline {
    config: StreamConfig,
    shutdown: watch::Sender<bool>,
    stats: Arc<StreamStats>,
}

impl BeatPipeline {
    pub fn new(config: StreamConfig) -> Self {
        let (shutdown, _) = watch::channel(true);
        Self {
            config,
            shutdown,
            stats: Arc::new(StreamStats::default()),
        }
    }

    /// Start the source and spawn the consumer task.
    ///
    /// The task ends when the source ends or fails, when the receiver is
    /// dropped, or on [`BeatPipeline::stop`]. The source is stopped on exit.
    pub async fn start_streaming<S: AccelSource + 'static>(
        &mut self,
        mut source: S,
        mut detector: BeatDetector,
    ) -> Result<mpsc::Receiver<BeatUpdate>> {
        let (tx, rx) = mpsc::channel(self.config.output_queue_size.max(1));

        source.start().await?;

        self.shutdown.send_replace(false);
        let mut shutdown = self.shutdown.subscribe();
        let stats = self.stats.clone();

        tokio::spawn(async move {
            let origin = Instant::now();

            loop {
                let message = tokio::select! {
                    _ = shutdown.wait_for(|stopped| *stopped) => break,
                    message = source.recv() => message,
                };

                match message {
                    Ok(Some(raw)) => {
                        stats.received.fetch_add(1, Ordering::Relaxed);
                        let at = origin.elapsed();

                        let Some(sample) = decode_message(&raw) else {
                            stats.dropped.fetch_add(1, Ordering::Relaxed);
                            continue;
                        };

                        let event = detector.process(&sample, at);
                        if event.is_none() {
                            continue;
                        }

                        stats.events.fetch_add(1, Ordering::Relaxed);
                        if tx.send(BeatUpdate { event, at }).await.is_err() {
                            break; // Receiver dropped
                        }
                    }
                    Ok(None) => {
                        tracing::info!("Accelerometer stream ended");
                        break;
                    }
                    Err(e) => {
                        tracing::error!("Accelerometer stream error: {}", e);
                        break;
                    }
                }
            }

            if let Err(e) = source.stop().await {
                tracing::warn!("Failed to stop accelerometer source: {}", e);
            }
        });

        Ok(rx)
    }

    /// Stop the consumer task
    pub fn stop(&self) {
        self.shutdown.send_replace(true);
    }

    pub fn is_running(&self) -> bool {
        !*self.shutdown.borrow()
    }

    pub fn stats(&self) -> Arc<StreamStats> {
        self.stats.clone()
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }
}
