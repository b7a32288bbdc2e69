//! Window planning over a recorded sequence.

use baton_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// A contiguous slice `[start, end)` of the recording, expanded to
/// `length` frames by repeating the final frame when `end - start < length`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSpan {
    pub start: usize,
    pub end: usize,
    pub length: usize,
}

impl WindowSpan {
    pub fn is_padded(&self) -> bool {
        self.end - self.start < self.length
    }

    /// Frame indices of the window in order, padding with the last frame
    pub fn frame_indices(&self) -> impl Iterator<Item = usize> + '_ {
        let last = self.end - 1;
        (0..self.length).map(move |k| (self.start + k).min(last))
    }
}

/// Plan the classification windows for a recording of `len` frames.
///
/// Start indices are `0, stride, 2·stride, …` while `start + window_length <= len`.
/// A non-empty recording shorter than one window yields exactly one padded
/// window; an empty recording yields none.
pub fn plan_windows(len: usize, window_length: usize, stride: usize) -> Result<Vec<WindowSpan>> {
    if window_length == 0 {
        return Err(Error::Config("window length must be positive".into()));
    }
    if stride == 0 {
        return Err(Error::Config("window stride must be positive".into()));
    }

    if len == 0 {
        return Ok(Vec::new());
    }

    if len < window_length {
        return Ok(vec![WindowSpan {
            start: 0,
            end: len,
            length: window_length,
        }]);
    }

    let spans = (0..=len - window_length)
        .step_by(stride)
        .map(|start| WindowSpan {
            start,
            end: start + window_length,
            length: window_length,
        })
        .collect();

    Ok(spans)
}
