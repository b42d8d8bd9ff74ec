//! View configuration, loaded from RON.
//!
//! ```ron
//! (
//!     backend_url: "http://localhost:4040",
//!     max_nodes: 2048,
//!     query: "app.cpu{}",
//!     left: (from: 1700000000, until: 1700001800),
//!     right: (from: 1700001800, until: 1700003600),
//!     timezone_offset_minutes: 0,
//!     color_mode: light,
//! )
//! ```
//!
//! Every field is optional; missing ones take [`ViewConfig::default`]. The
//! default windows are the two halves of the last hour.

use std::path::Path;
use std::time::Duration;

use diffscope_types::{ColorMode, TimeRange, TimezoneMode, Timestamp};
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_BACKEND_URL, DEFAULT_MAX_NODES, DEFAULT_REQUEST_TIMEOUT, DEFAULT_WINDOW,
    EVENT_CHANNEL_CAPACITY,
};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("RON encode error: {0}")]
    Encode(#[from] ron::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    pub backend_url: String,
    pub request_timeout_secs: u64,
    pub max_nodes: u32,
    /// Main query; fills whichever side is left empty.
    pub query: String,
    pub left_query: String,
    pub right_query: String,
    pub left: TimeRange,
    pub right: TimeRange,
    /// Ambient timezone offset; 0 means the axes are labelled in UTC.
    pub timezone_offset_minutes: i32,
    pub color_mode: ColorMode,
    pub event_capacity: usize,
}

impl Default for ViewConfig {
    fn default() -> Self {
        let now = now_secs();
        let window = DEFAULT_WINDOW.as_secs() as Timestamp;
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT.as_secs(),
            max_nodes: DEFAULT_MAX_NODES,
            query: String::new(),
            left_query: String::new(),
            right_query: String::new(),
            left: TimeRange::new(now - 2 * window, now - window),
            right: TimeRange::new(now - window, now),
            timezone_offset_minutes: 0,
            color_mode: ColorMode::default(),
            event_capacity: EVENT_CHANNEL_CAPACITY,
        }
    }
}

impl ViewConfig {
    pub fn from_ron(text: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_ron(&text)
    }

    pub fn to_ron(&self) -> Result<String, ConfigError> {
        Ok(ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn timezone(&self) -> TimezoneMode {
        TimezoneMode::from_offset_minutes(self.timezone_offset_minutes)
    }
}

fn now_secs() -> Timestamp {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as Timestamp)
        .unwrap_or(0)
}

// ============================================================================
// Tests
// ============================================================================
