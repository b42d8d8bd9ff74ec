//! Client configuration constants.
//!
//! Centralizes hardcoded values for easier configuration and documentation.

use std::time::Duration;

/// Default profile server for the HTTP backend.
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:4040";

/// Default cap on nodes in a rendered diff.
pub const DEFAULT_MAX_NODES: u32 = 1024;

/// Per-request timeout for the HTTP backend. The orchestrator itself never
/// times a fetch out.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Width of each default selection window.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(30 * 60);

/// Broadcast buffer for outbound view events. Slow subscribers lag rather
/// than block the view.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;
