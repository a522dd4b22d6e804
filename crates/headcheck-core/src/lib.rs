//! headcheck-core — guided head-turn liveness check.
//!
//! Landmark geometry, the step-by-step liveness state machine and the
//! still-frame capture it triggers. Camera access and the landmark model
//! live behind the [`LandmarkProvider`] trait and the [`Frame`] type so this
//! crate stays free of device and inference dependencies.

pub mod capture;
pub mod detector;
pub mod frame;
pub mod landmarks;
pub mod liveness;
pub mod orientation;
pub mod prompt;

pub use capture::{encode_png, CaptureError, CapturedImage};
pub use detector::{DetectorError, LandmarkProvider};
pub use frame::{Frame, FrameError};
pub use landmarks::{LandmarkError, LandmarkSet, Point};
pub use liveness::{CycleOutcome, LivenessMachine, SessionState, Step, DEFAULT_TURN_THRESHOLD};
pub use orientation::{horizontal_offset, Direction};
pub use prompt::{Locale, Prompt};
