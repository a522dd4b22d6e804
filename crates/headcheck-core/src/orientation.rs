//! Horizontal head orientation from landmark geometry.
//!
//! The signal is the horizontal distance between the nose tip and the
//! midpoint of the two outer eye corners. It is not normalised by face size:
//! values are raw pixels of the landmark model's coordinate space and are
//! compared against a fixed threshold every cycle, which assumes a roughly
//! constant camera distance.

use crate::landmarks::LandmarkSet;

/// Signed horizontal offset of the nose tip from the eye-line midpoint.
///
/// Positive when the nose tip lies right of the eye midpoint in image
/// coordinates; the challenge treats that as a turn to the left.
pub fn horizontal_offset(landmarks: &LandmarkSet) -> f32 {
    let eye_mid_x =
        (landmarks.left_eye_outer_corner().x + landmarks.right_eye_outer_corner().x) / 2.0;
    landmarks.nose_tip().x - eye_mid_x
}

/// Coarse classification of an offset against a threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
    Center,
}

impl Direction {
    /// `offset > threshold` is left, `offset < -threshold` is right,
    /// anything within `[-threshold, threshold]` is center.
    pub fn classify(offset: f32, threshold: f32) -> Self {
        if offset > threshold {
            Direction::Left
        } else if offset < -threshold {
            Direction::Right
        } else {
            Direction::Center
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Left => "left",
            Direction::Right => "right",
            Direction::Center => "center",
        }
    }
}
