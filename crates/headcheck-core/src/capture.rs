//! Still-frame capture: render a video frame to a PNG at native resolution.

use std::io::Cursor;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use image::{ImageFormat, RgbImage};
use thiserror::Error;

use crate::frame::{Frame, FrameError};

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("no video frame available to capture")]
    NoFrame,
    #[error("invalid frame: {0}")]
    Frame(#[from] FrameError),
    #[error("PNG encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}

/// The proof-of-liveness still produced when a session completes.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedImage {
    pub width: u32,
    pub height: u32,
    pub captured_at: DateTime<Utc>,
    png: Vec<u8>,
}

impl CapturedImage {
    /// Encoded PNG bytes.
    pub fn png(&self) -> &[u8] {
        &self.png
    }

    /// `data:image/png;base64,...` URI for direct display.
    pub fn data_uri(&self) -> String {
        format!("data:image/png;base64,{}", STANDARD.encode(&self.png))
    }
}

/// Encode `frame` as a PNG sized to the frame's own dimensions.
pub fn encode_png(frame: &Frame) -> Result<CapturedImage, CaptureError> {
    let expected = frame.width as usize * frame.height as usize * 3;
    let img = RgbImage::from_raw(frame.width, frame.height, frame.data.clone()).ok_or(
        FrameError::BufferSize {
            width: frame.width,
            height: frame.height,
            expected,
            got: frame.data.len(),
        },
    )?;

    let mut png = Vec::new();
    img.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;

    tracing::debug!(
        width = frame.width,
        height = frame.height,
        bytes = png.len(),
        "frame captured"
    );

    Ok(CapturedImage {
        width: frame.width,
        height: frame.height,
        captured_at: Utc::now(),
        png,
    })
}
