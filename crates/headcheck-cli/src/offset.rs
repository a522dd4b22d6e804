//! `headcheck offset` — inspect the orientation signal of one landmark set.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use headcheck_core::{horizontal_offset, Direction, LandmarkSet};
use headcheck_session::Config;
use serde_json::{json, Value};

pub fn run(config: &Config, path: &Path) -> Result<()> {
    let text =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let landmarks: LandmarkSet = serde_json::from_str(&text)
        .with_context(|| format!("invalid landmarks in {}", path.display()))?;

    println!(
        "{}",
        serde_json::to_string_pretty(&describe(&landmarks, config.turn_threshold))?
    );
    Ok(())
}

fn describe(landmarks: &LandmarkSet, threshold: f32) -> Value {
    let offset = horizontal_offset(landmarks);
    let nose = landmarks.nose_tip();
    let left = landmarks.left_eye_outer_corner();
    let right = landmarks.right_eye_outer_corner();
    json!({
        "offset": offset,
        "threshold": threshold,
        "direction": Direction::classify(offset, threshold).as_str(),
        "nose_tip": [nose.x, nose.y],
        "left_eye_outer_corner": [left.x, left.y],
        "right_eye_outer_corner": [right.x, right.y],
    })
}
