//! Read-only display inputs handed to timeline and flamegraph renderers.
//!
//! Nothing here feeds back into fetching. The timezone mode and color mode
//! are ambient preferences; markings are derived from the current ranges.

use serde::{Deserialize, Serialize};
use strum::EnumString;

use crate::range::{Side, TimeRange};

/// How timeline axes are labelled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum TimezoneMode {
    Utc,
    /// Whatever the viewer's local offset is.
    #[default]
    #[strum(serialize = "local", serialize = "browser")]
    Local,
}

impl TimezoneMode {
    /// UTC exactly when the ambient offset is zero.
    pub fn from_offset_minutes(offset: i32) -> Self {
        if offset == 0 { TimezoneMode::Utc } else { TimezoneMode::Local }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimezoneMode::Utc => "utc",
            TimezoneMode::Local => "local",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum ColorMode {
    #[default]
    Dark,
    Light,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    /// 0..=255
    pub a: u8,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// `rgba(r, g, b, 0.35)` form for chart libraries.
    pub fn to_css(&self) -> String {
        format!("rgba({}, {}, {}, {:.2})", self.r, self.g, self.b, self.a as f32 / 255.0)
    }
}

pub const LEFT_COLOR: Rgba = Rgba::new(200, 0, 200, 89);
pub const RIGHT_COLOR: Rgba = Rgba::new(0, 170, 0, 89);

impl Side {
    pub fn color(self) -> Rgba {
        match self {
            Side::Left => LEFT_COLOR,
            Side::Right => RIGHT_COLOR,
        }
    }
}

/// A shaded selection band on a timeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Marking {
    pub side: Side,
    pub range: TimeRange,
    pub color: Rgba,
}

impl Marking {
    pub fn for_side(side: Side, range: TimeRange) -> Self {
        Self { side, range, color: side.color() }
    }
}

/// Markings for the three timeline surfaces of the comparison view.
///
/// The combined timeline shows both selections; each side timeline only
/// shows its own.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineMarkings {
    pub combined: Vec<Marking>,
    pub left: Vec<Marking>,
    pub right: Vec<Marking>,
}

impl TimelineMarkings {
    pub fn new(left: TimeRange, right: TimeRange) -> Self {
        let l = Marking::for_side(Side::Left, left);
        let r = Marking::for_side(Side::Right, right);
        Self {
            combined: vec![l, r],
            left: vec![l],
            right: vec![r],
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
