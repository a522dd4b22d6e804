//! Facial landmark sets as produced by a landmark provider.
//!
//! Only three points matter to the liveness check: the nose tip and the outer
//! corner of each eye. They are exposed through named accessors so the
//! geometry in [`crate::orientation`] never touches model-specific indices.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of points in the iBUG 300-W 68-point scheme.
pub const POINTS_68: usize = 68;

// 68-point scheme index ranges.
const NOSE_68: std::ops::Range<usize> = 27..36;
const LEFT_EYE_68: std::ops::Range<usize> = 36..42;
const RIGHT_EYE_68: std::ops::Range<usize> = 42..48;

// Offsets within each feature sequence.
const NOSE_TIP: usize = 3;
const LEFT_EYE_OUTER: usize = 0;
const RIGHT_EYE_OUTER: usize = 3;

/// A 2D image point in pixel coordinates. Serialized as `[x, y]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "(f32, f32)", into = "(f32, f32)")]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl From<(f32, f32)> for Point {
    fn from((x, y): (f32, f32)) -> Self {
        Self { x, y }
    }
}

impl From<Point> for (f32, f32) {
    fn from(p: Point) -> Self {
        (p.x, p.y)
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum LandmarkError {
    #[error("expected {expected} landmark points, got {got}")]
    PointCount { expected: usize, got: usize },
    #[error("{feature} sequence too short: need at least {need} points, got {got}")]
    ShortSequence {
        feature: &'static str,
        need: usize,
        got: usize,
    },
    #[error("landmark point is not finite")]
    NonFinite,
}

/// Landmarks of a single detected face.
///
/// Holds the nose, left-eye and right-eye point sequences. Lengths are
/// checked on construction, so the accessors below cannot fail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawLandmarks")]
pub struct LandmarkSet {
    nose: Vec<Point>,
    left_eye: Vec<Point>,
    right_eye: Vec<Point>,
}

impl LandmarkSet {
    /// Build from explicit feature sequences.
    pub fn new(
        nose: Vec<Point>,
        left_eye: Vec<Point>,
        right_eye: Vec<Point>,
    ) -> Result<Self, LandmarkError> {
        require_len("nose", &nose, NOSE_TIP + 1)?;
        require_len("left eye", &left_eye, LEFT_EYE_OUTER + 1)?;
        require_len("right eye", &right_eye, RIGHT_EYE_OUTER + 1)?;

        let all_finite = nose
            .iter()
            .chain(&left_eye)
            .chain(&right_eye)
            .all(|p| p.x.is_finite() && p.y.is_finite());
        if !all_finite {
            return Err(LandmarkError::NonFinite);
        }

        Ok(Self {
            nose,
            left_eye,
            right_eye,
        })
    }

    /// Build from a full 68-point landmark array.
    pub fn from_68_points(points: &[Point]) -> Result<Self, LandmarkError> {
        if points.len() != POINTS_68 {
            return Err(LandmarkError::PointCount {
                expected: POINTS_68,
                got: points.len(),
            });
        }
        Self::new(
            points[NOSE_68].to_vec(),
            points[LEFT_EYE_68].to_vec(),
            points[RIGHT_EYE_68].to_vec(),
        )
    }

    pub fn nose_tip(&self) -> Point {
        self.nose[NOSE_TIP]
    }

    pub fn left_eye_outer_corner(&self) -> Point {
        self.left_eye[LEFT_EYE_OUTER]
    }

    pub fn right_eye_outer_corner(&self) -> Point {
        self.right_eye[RIGHT_EYE_OUTER]
    }
}

fn require_len(feature: &'static str, seq: &[Point], need: usize) -> Result<(), LandmarkError> {
    if seq.len() < need {
        return Err(LandmarkError::ShortSequence {
            feature,
            need,
            got: seq.len(),
        });
    }
    Ok(())
}

/// Accepted JSON shapes: `{"points": [[x, y]; 68]}` or explicit sequences.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawLandmarks {
    Points68 {
        points: Vec<Point>,
    },
    Features {
        nose: Vec<Point>,
        left_eye: Vec<Point>,
        right_eye: Vec<Point>,
    },
}

impl TryFrom<RawLandmarks> for LandmarkSet {
    type Error = LandmarkError;

    fn try_from(raw: RawLandmarks) -> Result<Self, Self::Error> {
        match raw {
            RawLandmarks::Points68 { points } => Self::from_68_points(&points),
            RawLandmarks::Features {
                nose,
                left_eye,
                right_eye,
            } => Self::new(nose, left_eye, right_eye),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn indexed_points() -> Vec<Point> {
        // x encodes the index so accessors can be checked directly
        (0..POINTS_68).map(|i| Point::new(i as f32, 0.0)).collect()
    }

    #[test]
    fn test_accessors_use_68_point_indices() {
        let set = LandmarkSet::from_68_points(&indexed_points()).unwrap();
        assert_eq!(set.nose_tip().x, 30.0);
        assert_eq!(set.left_eye_outer_corner().x, 36.0);
        assert_eq!(set.right_eye_outer_corner().x, 45.0);
    }

    #[test]
    fn test_rejects_wrong_point_count() {
        let err = LandmarkSet::from_68_points(&indexed_points()[..5]).unwrap_err();
        assert_eq!(
            err,
            LandmarkError::PointCount {
                expected: 68,
                got: 5
            }
        );
    }

    #[test]
    fn test_rejects_short_nose() {
        let eye = vec![Point::new(0.0, 0.0); 6];
        let err = LandmarkSet::new(vec![Point::new(0.0, 0.0); 3], eye.clone(), eye).unwrap_err();
        assert!(matches!(
            err,
            LandmarkError::ShortSequence { feature: "nose", .. }
        ));
    }

    #[test]
    fn test_rejects_short_right_eye() {
        let seq = vec![Point::new(0.0, 0.0); 4];
        let err = LandmarkSet::new(seq.clone(), seq, vec![Point::new(0.0, 0.0); 3]).unwrap_err();
        assert!(matches!(
            err,
            LandmarkError::ShortSequence {
                feature: "right eye",
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_nan() {
        let mut nose = vec![Point::new(0.0, 0.0); 4];
        nose[1].y = f32::NAN;
        let eye = vec![Point::new(0.0, 0.0); 6];
        assert_eq!(
            LandmarkSet::new(nose, eye.clone(), eye).unwrap_err(),
            LandmarkError::NonFinite
        );
    }

    #[test]
    fn test_deserialize_feature_form() {
        let json = r#"{
            "nose": [[0,0],[0,0],[0,0],[120,80]],
            "left_eye": [[90,50],[95,48]],
            "right_eye": [[130,50],[135,48],[140,48],[150,50]]
        }"#;
        let set: LandmarkSet = serde_json::from_str(json).unwrap();
        assert_eq!(set.nose_tip(), Point::new(120.0, 80.0));
        assert_eq!(set.left_eye_outer_corner(), Point::new(90.0, 50.0));
        assert_eq!(set.right_eye_outer_corner(), Point::new(150.0, 50.0));
    }

    #[test]
    fn test_deserialize_68_point_form() {
        let points: Vec<(f32, f32)> = indexed_points().into_iter().map(Into::into).collect();
        let json = serde_json::json!({ "points": points }).to_string();
        let set: LandmarkSet = serde_json::from_str(&json).unwrap();
        assert_eq!(set.nose_tip().x, 30.0);
    }

    #[test]
    fn test_deserialize_rejects_short_68_point_form() {
        let json = r#"{"points": [[0,0],[1,1]]}"#;
        assert!(serde_json::from_str::<LandmarkSet>(json).is_err());
    }
}
