//! Replay of recorded detections.
//!
//! A [`Trace`] lists what the landmark model returned on consecutive
//! detection calls. [`ScriptedProvider`] hands those results out in order,
//! which lets a whole session be driven without a camera or a model.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use headcheck_core::{DetectorError, Frame, LandmarkProvider, LandmarkSet};
use serde::Deserialize;

/// One recorded detection. `null` in JSON means no face was found.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TraceEntry {
    Failure { error: String },
    Face(LandmarkSet),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Trace {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    pub detections: Vec<Option<TraceEntry>>,
}

fn default_width() -> u32 {
    640
}

fn default_height() -> u32 {
    480
}

type Detection = Result<Option<LandmarkSet>, DetectorError>;

/// Landmark provider that returns pre-recorded results, then "no face"
/// once the script runs out.
#[derive(Default)]
pub struct ScriptedProvider {
    queue: Mutex<VecDeque<Detection>>,
    latency: Duration,
}

impl ScriptedProvider {
    pub fn new(detections: impl IntoIterator<Item = Detection>) -> Self {
        Self {
            queue: Mutex::new(detections.into_iter().collect()),
            latency: Duration::ZERO,
        }
    }

    pub fn from_trace(trace: &Trace) -> Self {
        Self::new(trace.detections.iter().map(|entry| match entry {
            None => Ok(None),
            Some(TraceEntry::Face(landmarks)) => Ok(Some(landmarks.clone())),
            Some(TraceEntry::Failure { error }) => Err(DetectorError::Inference(error.clone())),
        }))
    }

    /// Delay every detection by `latency`, emulating a slow model.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Number of scripted results not yet handed out.
    pub fn remaining(&self) -> usize {
        self.queue.lock().map(|q| q.len()).unwrap_or(0)
    }
}

#[async_trait]
impl LandmarkProvider for ScriptedProvider {
    async fn detect(&self, _frame: &Frame) -> Result<Option<LandmarkSet>, DetectorError> {
        let next = self
            .queue
            .lock()
            .map_err(|_| DetectorError::ModelUnavailable("script lock poisoned".to_string()))?
            .pop_front();
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        next.unwrap_or(Ok(None))
    }
}
