//! User-facing status prompts and their localised texts.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// What the user is currently being asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Prompt {
    /// Initial prompt after reset.
    Searching,
    NoFace,
    TurnLeft,
    TurnRight,
    HoldCenter,
    Captured,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Vi,
}

impl Prompt {
    pub fn text(self, locale: Locale) -> &'static str {
        match locale {
            Locale::En => match self {
                Prompt::Searching => "searching for a face...",
                Prompt::NoFace => "no face found, please center your face",
                Prompt::TurnLeft => "please turn left",
                Prompt::TurnRight => "now turn right",
                Prompt::HoldCenter => "now look straight ahead and hold still",
                Prompt::Captured => "capture successful",
            },
            Locale::Vi => match self {
                Prompt::Searching => "🔍 Đang tìm khuôn mặt...",
                Prompt::NoFace => "🙈 Không thấy khuôn mặt, vui lòng đưa mặt vào khung hình",
                Prompt::TurnLeft => "👈 Vui lòng quay mặt sang trái",
                Prompt::TurnRight => "👉 Giờ quay mặt sang phải",
                Prompt::HoldCenter => "✅ Giờ hãy nhìn chính diện, vui lòng giữ yên",
                Prompt::Captured => "✅ Đã chụp ảnh thành công",
            },
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Locale::En => "en",
            Locale::Vi => "vi",
        })
    }
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" => Ok(Locale::En),
            "vi" => Ok(Locale::Vi),
            other => Err(format!("unsupported locale '{other}' (expected en or vi)")),
        }
    }
}
