//! Time windows and the sides they belong to.
//!
//! A [`TimeRange`] is a plain `{from, until}` pair in Unix seconds. Nothing in
//! this crate enforces `from <= until`: inverted and zero-width windows are
//! carried through untouched and the backend decides what they mean.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::EnumString;

/// Unix timestamp in seconds.
pub type Timestamp = i64;

/// Version counter bumped by an explicit refresh. Starts at 0, never resets.
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RefreshToken(pub u64);

impl RefreshToken {
    /// The token that follows this one.
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

/// A `{from, until}` window.
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub from: Timestamp,
    pub until: Timestamp,
}

impl TimeRange {
    pub const fn new(from: Timestamp, until: Timestamp) -> Self {
        Self { from, until }
    }

    /// True when `from` is after `until`.
    pub fn is_inverted(&self) -> bool {
        self.from > self.until
    }

    /// Signed width of the window. Negative for inverted ranges.
    pub fn span(&self) -> i64 {
        self.until.saturating_sub(self.from)
    }

    /// Whether `t` falls inside `[from, until]`. Always false when inverted.
    pub fn contains(&self, t: Timestamp) -> bool {
        self.from <= t && t <= self.until
    }
}

impl std::fmt::Display for TimeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.from, self.until)
    }
}

/// Which half of the comparison.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Serialize, Deserialize, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum Side {
    /// Baseline.
    #[strum(serialize = "left", serialize = "baseline", serialize = "l")]
    Left,
    /// Comparison.
    #[strum(serialize = "right", serialize = "comparison", serialize = "r")]
    Right,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Left, Side::Right];

    /// Parse from string (case-insensitive).
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        <Self as FromStr>::from_str(s).ok()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Tests
// ============================================================================
