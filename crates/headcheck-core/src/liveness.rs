//! Active liveness check via a guided head-turn challenge.
//!
//! A printed photograph or a still on a screen cannot rotate. The subject is
//! asked to turn left, then right, then look straight ahead again; only a
//! face that produces all three orientations in order reaches [`Step::Done`],
//! at which point a still frame is captured as the proof image.
//!
//! The machine is driven one detection at a time through
//! [`LivenessMachine::on_cycle`]. It never fails: every step has a "stay"
//! branch, so a missing face or an ambiguous offset leaves the state as is.
//!
//! # Threat Coverage
//!
//! - **Blocks:** Static printed photographs and single still images.
//! - **Does not block:** Video replay of a subject performing the same
//!   motions, 3D masks, or a cooperating impostor.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::capture::{CaptureError, CapturedImage};
use crate::landmarks::LandmarkSet;
use crate::orientation::horizontal_offset;
use crate::prompt::{Locale, Prompt};

/// Default turn threshold in landmark pixels. An offset beyond ±15 counts
/// as a deliberate turn; within it the face counts as centred.
pub const DEFAULT_TURN_THRESHOLD: f32 = 15.0;

/// Position in the challenge sequence. Variants are declared in order, so
/// `Ord` follows the progression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Detecting,
    TurnLeft,
    TurnRight,
    Center,
    Done,
}

impl Step {
    pub fn as_str(self) -> &'static str {
        match self {
            Step::Detecting => "detecting",
            Step::TurnLeft => "turn_left",
            Step::TurnRight => "turn_right",
            Step::Center => "center",
            Step::Done => "done",
        }
    }
}

/// Observable state of one verification session.
///
/// Fields are private so the captured-image-iff-done invariant can only be
/// changed through [`LivenessMachine`].
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    step: Step,
    prompt: Prompt,
    locale: Locale,
    captured_image: Option<Arc<CapturedImage>>,
    camera_active: bool,
}

impl SessionState {
    fn initial(locale: Locale) -> Self {
        Self {
            step: Step::Detecting,
            prompt: Prompt::Searching,
            locale,
            captured_image: None,
            camera_active: false,
        }
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn prompt(&self) -> Prompt {
        self.prompt
    }

    /// Human-readable status in the session's locale.
    pub fn message(&self) -> &'static str {
        self.prompt.text(self.locale)
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    /// Present if and only if `step() == Step::Done`.
    pub fn captured_image(&self) -> Option<&Arc<CapturedImage>> {
        self.captured_image.as_ref()
    }

    pub fn camera_active(&self) -> bool {
        self.camera_active
    }
}

/// What a single cycle did.
#[derive(Debug)]
pub enum CycleOutcome {
    /// Session already complete; input ignored.
    Terminal,
    NoFace,
    /// Face seen, condition for the current step not met.
    Held { offset: f32 },
    Advanced { to: Step, offset: f32 },
    /// The Center condition held but the still could not be captured.
    CaptureFailed { offset: f32, error: CaptureError },
}

/// The head-turn challenge state machine.
#[derive(Debug, Clone)]
pub struct LivenessMachine {
    state: SessionState,
    threshold: f32,
}

impl LivenessMachine {
    pub fn new(threshold: f32, locale: Locale) -> Self {
        Self {
            state: SessionState::initial(locale),
            threshold,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Return to `Detecting` with the initial prompt and no captured image.
    /// Camera status is owned by the session and left untouched.
    pub fn reset(&mut self) {
        let camera_active = self.state.camera_active;
        self.state = SessionState::initial(self.state.locale);
        self.state.camera_active = camera_active;
    }

    pub fn set_camera_active(&mut self, active: bool) {
        self.state.camera_active = active;
    }

    /// Consume the result of one detection.
    ///
    /// `capture` is called at most once, and only when the `Center` condition
    /// holds. If it fails the machine stays in `Center` and the next cycle
    /// that satisfies the condition tries again.
    pub fn on_cycle<F>(&mut self, detection: Option<&LandmarkSet>, capture: F) -> CycleOutcome
    where
        F: FnOnce() -> Result<CapturedImage, CaptureError>,
    {
        if self.state.step == Step::Done {
            return CycleOutcome::Terminal;
        }

        let Some(landmarks) = detection else {
            // Misses after the first detection are tolerated silently
            if self.state.step == Step::Detecting {
                self.state.prompt = Prompt::NoFace;
            }
            return CycleOutcome::NoFace;
        };

        let offset = horizontal_offset(landmarks);
        let t = self.threshold;

        let next = match self.state.step {
            Step::Detecting => Some((Step::TurnLeft, Prompt::TurnLeft)),
            Step::TurnLeft if offset > t => Some((Step::TurnRight, Prompt::TurnRight)),
            Step::TurnRight if offset < -t => Some((Step::Center, Prompt::HoldCenter)),
            Step::Center if offset.abs() <= t => match capture() {
                Ok(image) => {
                    self.state.captured_image = Some(Arc::new(image));
                    Some((Step::Done, Prompt::Captured))
                }
                Err(error) => {
                    tracing::warn!(offset, error = %error, "liveness: capture failed, holding at center");
                    return CycleOutcome::CaptureFailed { offset, error };
                }
            },
            _ => None,
        };

        match next {
            Some((to, prompt)) => {
                tracing::info!(
                    from = self.state.step.as_str(),
                    to = to.as_str(),
                    offset,
                    "liveness: step advanced"
                );
                self.state.step = to;
                self.state.prompt = prompt;
                CycleOutcome::Advanced { to, offset }
            }
            None => {
                tracing::trace!(step = self.state.step.as_str(), offset, "liveness: holding");
                CycleOutcome::Held { offset }
            }
        }
    }
}

impl Default for LivenessMachine {
    fn default() -> Self {
        Self::new(DEFAULT_TURN_THRESHOLD, Locale::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::encode_png;
    use crate::frame::Frame;
    use crate::landmarks::Point;

    /// Helper: landmarks whose horizontal offset is exactly `offset`.
    /// Outer eye corners at x=100 and x=160, so the midpoint is 130.
    fn face_with_offset(offset: f32) -> LandmarkSet {
        let mut nose = vec![Point::new(130.0, 70.0); 4];
        nose[3] = Point::new(130.0 + offset, 95.0);
        let left_eye = vec![Point::new(100.0, 60.0); 6];
        let mut right_eye = vec![Point::new(150.0, 60.0); 6];
        right_eye[3] = Point::new(160.0, 60.0);
        LandmarkSet::new(nose, left_eye, right_eye).unwrap()
    }

    fn ok_capture() -> Result<CapturedImage, CaptureError> {
        encode_png(&Frame::solid(4, 4, [128, 128, 128]).unwrap())
    }

    fn no_capture() -> Result<CapturedImage, CaptureError> {
        panic!("capture must not be triggered here")
    }

    fn feed(m: &mut LivenessMachine, offset: Option<f32>) -> CycleOutcome {
        let face = offset.map(face_with_offset);
        m.on_cycle(face.as_ref(), ok_capture)
    }

    fn machine_at(step: Step) -> LivenessMachine {
        let mut m = LivenessMachine::default();
        let path = [Some(0.0), Some(20.0), Some(-20.0), Some(5.0)];
        for offset in path {
            if m.state().step() == step {
                break;
            }
            feed(&mut m, offset);
        }
        assert_eq!(m.state().step(), step);
        m
    }

    fn assert_capture_iff_done(m: &LivenessMachine) {
        assert_eq!(
            m.state().captured_image().is_some(),
            m.state().step() == Step::Done
        );
    }

    #[test]
    fn test_initial_state() {
        let m = LivenessMachine::default();
        assert_eq!(m.state().step(), Step::Detecting);
        assert_eq!(m.state().prompt(), Prompt::Searching);
        assert!(m.state().captured_image().is_none());
        assert!(!m.state().camera_active());
    }

    #[test]
    fn test_absent_face_keeps_detecting_with_no_face_message() {
        let mut m = LivenessMachine::default();
        for _ in 0..5 {
            assert!(matches!(feed(&mut m, None), CycleOutcome::NoFace));
            assert_eq!(m.state().step(), Step::Detecting);
            assert_eq!(m.state().message(), "no face found, please center your face");
        }
    }

    #[test]
    fn test_any_face_leaves_detecting() {
        for offset in [-40.0, 0.0, 40.0] {
            let mut m = LivenessMachine::default();
            feed(&mut m, Some(offset));
            assert_eq!(m.state().step(), Step::TurnLeft);
            assert_eq!(m.state().message(), "please turn left");
        }
    }

    #[test]
    fn test_turn_left_advances_on_positive_offset() {
        let mut m = machine_at(Step::TurnLeft);
        feed(&mut m, Some(20.0));
        assert_eq!(m.state().step(), Step::TurnRight);
        assert_eq!(m.state().message(), "now turn right");
    }

    #[test]
    fn test_turn_left_below_threshold_holds_message() {
        let mut m = machine_at(Step::TurnLeft);
        let before = m.state().message();
        for offset in [5.0, 15.0, -30.0] {
            assert!(matches!(feed(&mut m, Some(offset)), CycleOutcome::Held { .. }));
            assert_eq!(m.state().step(), Step::TurnLeft);
            assert_eq!(m.state().message(), before);
        }
    }

    #[test]
    fn test_turn_right_advances_on_negative_offset() {
        let mut m = machine_at(Step::TurnRight);
        feed(&mut m, Some(-15.0));
        assert_eq!(m.state().step(), Step::TurnRight);
        feed(&mut m, Some(-20.0));
        assert_eq!(m.state().step(), Step::Center);
        assert_eq!(m.state().message(), "now look straight ahead and hold still");
    }

    #[test]
    fn test_center_captures_exactly_once() {
        let mut m = machine_at(Step::Center);
        let mut calls = 0;
        let face = face_with_offset(5.0);
        m.on_cycle(Some(&face), || {
            calls += 1;
            ok_capture()
        });
        assert_eq!(calls, 1);
        assert_eq!(m.state().step(), Step::Done);
        assert_eq!(m.state().message(), "capture successful");
        assert_capture_iff_done(&m);

        // Further cycles never reach the capture closure
        for offset in [Some(0.0), Some(40.0), None] {
            let face = offset.map(face_with_offset);
            assert!(matches!(
                m.on_cycle(face.as_ref(), no_capture),
                CycleOutcome::Terminal
            ));
        }
    }

    #[test]
    fn test_center_holds_while_turned() {
        let mut m = machine_at(Step::Center);
        let face = face_with_offset(25.0);
        assert!(matches!(
            m.on_cycle(Some(&face), no_capture),
            CycleOutcome::Held { .. }
        ));
        assert_eq!(m.state().step(), Step::Center);
        assert_capture_iff_done(&m);
    }

    #[test]
    fn test_center_threshold_is_inclusive() {
        let mut m = machine_at(Step::Center);
        feed(&mut m, Some(-15.0));
        assert_eq!(m.state().step(), Step::Done);
    }

    #[test]
    fn test_capture_failure_stays_in_center() {
        let mut m = machine_at(Step::Center);
        let face = face_with_offset(0.0);
        let outcome = m.on_cycle(Some(&face), || Err(CaptureError::NoFrame));
        assert!(matches!(outcome, CycleOutcome::CaptureFailed { .. }));
        assert_eq!(m.state().step(), Step::Center);
        assert_eq!(m.state().message(), "now look straight ahead and hold still");
        assert_capture_iff_done(&m);

        feed(&mut m, Some(0.0));
        assert_eq!(m.state().step(), Step::Done);
        assert_capture_iff_done(&m);
    }

    #[test]
    fn test_missed_detection_mid_sequence_keeps_progress() {
        let mut m = machine_at(Step::TurnRight);
        let before = m.state().clone();
        feed(&mut m, None);
        assert_eq!(m.state(), &before);
    }

    #[test]
    fn test_done_is_idempotent() {
        let mut m = machine_at(Step::Done);
        let before = m.state().clone();
        for offset in [Some(30.0), Some(-30.0), Some(0.0), None] {
            feed(&mut m, offset);
            assert_eq!(m.state(), &before);
        }
    }

    #[test]
    fn test_step_is_monotonic() {
        let mut m = LivenessMachine::default();
        let inputs = [
            None,
            Some(3.0),
            None,
            Some(-40.0),
            Some(40.0),
            Some(0.0),
            None,
            Some(50.0),
            Some(-16.0),
            Some(-30.0),
            Some(30.0),
            Some(1.0),
            Some(-50.0),
        ];
        let mut prev = m.state().step();
        for offset in inputs {
            feed(&mut m, offset);
            let step = m.state().step();
            assert!(step >= prev, "{step:?} < {prev:?}");
            assert_capture_iff_done(&m);
            prev = step;
        }
        assert_eq!(prev, Step::Done);
    }

    #[test]
    fn test_reset_restores_initial_state() {
        for step in [Step::TurnLeft, Step::TurnRight, Step::Center, Step::Done] {
            let mut m = machine_at(step);
            m.reset();
            assert_eq!(m.state(), LivenessMachine::default().state());
        }
    }

    #[test]
    fn test_reset_keeps_camera_status() {
        let mut m = machine_at(Step::Center);
        m.set_camera_active(true);
        m.reset();
        assert_eq!(m.state().step(), Step::Detecting);
        assert!(m.state().camera_active());
    }

    #[test]
    fn test_custom_threshold() {
        let mut m = LivenessMachine::new(30.0, Locale::En);
        feed(&mut m, Some(0.0));
        feed(&mut m, Some(20.0));
        assert_eq!(m.state().step(), Step::TurnLeft);
        feed(&mut m, Some(31.0));
        assert_eq!(m.state().step(), Step::TurnRight);
    }

    #[test]
    fn test_vietnamese_messages() {
        let mut m = LivenessMachine::new(DEFAULT_TURN_THRESHOLD, Locale::Vi);
        assert_eq!(m.state().message(), "🔍 Đang tìm khuôn mặt...");
        feed(&mut m, Some(0.0));
        assert_eq!(m.state().message(), "👈 Vui lòng quay mặt sang trái");
    }
}
