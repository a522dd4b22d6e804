use std::path::{Path, PathBuf};

use headcheck_core::{Frame, FrameError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CameraError {
    #[error("camera access denied")]
    PermissionDenied,
    #[error("failed to load image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("invalid frame: {0}")]
    Frame(#[from] FrameError),
}

/// A video source the session samples frames from.
///
/// Device permissions and enumeration are the implementor's concern; the
/// session only starts, stops and samples.
pub trait Camera: Send + 'static {
    fn start(&mut self) -> Result<(), CameraError>;

    fn stop(&mut self);

    /// Latest frame, or `None` if the stream has not produced one yet.
    fn current_frame(&self) -> Option<Frame>;
}

/// Camera that serves one fixed frame while running.
pub struct StillCamera {
    frame: Frame,
    running: bool,
}

impl StillCamera {
    pub fn new(frame: Frame) -> Self {
        Self {
            frame,
            running: false,
        }
    }

    /// Serve the image at `path`, converted to RGB8.
    pub fn open(path: &Path) -> Result<Self, CameraError> {
        let img = image::open(path).map_err(|source| CameraError::Image {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(Frame::from_rgb_image(img.to_rgb8())?))
    }
}

impl Camera for StillCamera {
    fn start(&mut self) -> Result<(), CameraError> {
        self.running = true;
        Ok(())
    }

    fn stop(&mut self) {
        self.running = false;
    }

    fn current_frame(&self) -> Option<Frame> {
        self.running.then(|| self.frame.clone())
    }
}
