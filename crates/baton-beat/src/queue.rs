//! FIFO drain queue in front of the beat detector.
//!
//! Sensor callbacks may fire while a previous sample is still being handled,
//! including re-entrantly from inside the event sink. Every push enqueues;
//! only the caller that wins the drain guard processes samples, and it keeps
//! draining until the queue is empty, so arrival order is preserved and
//! nothing is dropped.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use baton_core::AccelSample;
use parking_lot::Mutex;

use crate::detector::{BeatDetector, BeatEvent};
use crate::message::TimedSample;

#[derive(Default)]
pub struct AccelQueue {
    pending: Mutex<VecDeque<TimedSample>>,
    detector: Mutex<Option<BeatDetector>>,
    draining: AtomicBool,
    ignored: AtomicU64,
}

impl AccelQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_detector(detector: BeatDetector) -> Self {
        let queue = Self::new();
        queue.install_detector(detector);
        queue
    }

    /// Install (or replace) the detector that drained samples go to
    pub fn install_detector(&self, detector: BeatDetector) {
        *self.detector.lock() = Some(detector);
    }

    pub fn take_detector(&self) -> Option<BeatDetector> {
        self.detector.lock().take()
    }

    pub fn has_detector(&self) -> bool {
        self.detector.lock().is_some()
    }

    /// Enqueue a sample and drain if no drain is in progress.
    ///
    /// Events are handed to `sink` in sample order. When another drain is
    /// active (another thread, or a re-entrant push from a sink) the sample is
    /// only enqueued and that drain delivers its event.
    pub fn push<F>(&self, sample: AccelSample, at: Duration, mut sink: F)
    where
        F: FnMut(BeatEvent),
    {
        self.pending.lock().push_back(TimedSample { sample, at });

        loop {
            if self
                .draining
                .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
                .is_err()
            {
                return;
            }

            self.drain(&mut sink);
            self.draining.store(false, Ordering::Release);

            // A push may have landed between the last pop and the release
            if self.pending.lock().is_empty() {
                return;
            }
        }
    }

    fn drain<F>(&self, sink: &mut F)
    where
        F: FnMut(BeatEvent),
    {
        loop {
            let Some(next) = self.pending.lock().pop_front() else {
                return;
            };

            let event = {
                let mut detector = self.detector.lock();
                match detector.as_mut() {
                    Some(detector) => detector.process(&next.sample, next.at),
                    None => {
                        let ignored = self.ignored.fetch_add(1, Ordering::Relaxed) + 1;
                        tracing::debug!(ignored, "No beat detector installed, sample ignored");
                        continue;
                    }
                }
            };

            if !event.is_none() {
                sink(event);
            }
        }
    }

    pub fn pending(&self) -> usize {
        self.pending.lock().len()
    }

    /// Samples dropped because no detector was installed
    pub fn ignored(&self) -> u64 {
        self.ignored.load(Ordering::Relaxed)
    }
}
