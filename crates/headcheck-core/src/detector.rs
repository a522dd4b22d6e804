use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::frame::Frame;
use crate::landmarks::LandmarkSet;

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("landmark model not loaded: {0}")]
    ModelUnavailable(String),
    #[error("inference failed: {0}")]
    Inference(String),
}

/// Source of face landmarks for a single frame.
///
/// Returns `Ok(None)` when no face is present. At most one face is reported;
/// implementations seeing several should return the most confident one.
#[async_trait]
pub trait LandmarkProvider: Send + Sync + 'static {
    async fn detect(&self, frame: &Frame) -> Result<Option<LandmarkSet>, DetectorError>;
}

#[async_trait]
impl<T: LandmarkProvider + ?Sized> LandmarkProvider for Arc<T> {
    async fn detect(&self, frame: &Frame) -> Result<Option<LandmarkSet>, DetectorError> {
        (**self).detect(frame).await
    }
}
