//! Shared value types for diffscope.
//!
//! This crate is the vocabulary of the comparison view: time ranges, the
//! sides they belong to, the watched fetch-input snapshot, and the diff
//! artifact a backend returns. It has **no internal diffscope
//! dependencies** and performs no I/O.
//!
//! # Overview
//!
//! ```text
//! TimeRange (left)  ─┐
//! TimeRange (right) ─┤
//! Query (left)      ─┼──▶ FetchInputSnapshot ──▶ FetchRequest ──▶ backend
//! Query (right)     ─┤            │
//! RefreshToken      ─┤            └── compared by value; any change re-fetches
//! max_nodes         ─┘
//!
//! backend ──▶ DiffArtifact { profile, left_timeline, right_timeline }
//! ```
//!
//! # Key Types
//!
//! |------------------------|------------------------------------------------|
//! | Type                   | Purpose                                        |
//! |------------------------|------------------------------------------------|
//! | [`TimeRange`]          | `{from, until}` window, never validated        |
//! | [`Side`]               | Left (baseline) or right (comparison)          |
//! | [`FetchInputSnapshot`] | The eight watched inputs, equality-compared    |
//! | [`FetchRequest`]       | Wire subset of a snapshot sent to the backend  |
//! | [`FetchGeneration`]    | Identity of one issued fetch                   |
//! | [`DiffArtifact`]       | Profile diff + per-side timelines              |
//! | [`TagSet`]             | Tag name → known values for one side           |
//! |------------------------|------------------------------------------------|

pub mod artifact;
pub mod display;
pub mod range;
pub mod snapshot;

pub use artifact::{DiffArtifact, TagSet, Timeline};
pub use display::{ColorMode, Marking, Rgba, TimelineMarkings, TimezoneMode};
pub use range::{RefreshToken, Side, TimeRange, Timestamp};
pub use snapshot::{FetchGeneration, FetchInputSnapshot, FetchRequest};
