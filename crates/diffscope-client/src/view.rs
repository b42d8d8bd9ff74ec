//! Point-in-time view of the comparison, for renderers.

use std::sync::Arc;

use diffscope_types::{
    ColorMode, DiffArtifact, RefreshToken, Side, TagSet, TimeRange, TimelineMarkings,
    TimezoneMode,
};

use crate::orchestrator::{FetchFailure, FetchState, LoadPhase};

/// Everything a renderer reads, copied out of the view actor.
#[derive(Debug, Clone)]
pub struct ViewSnapshot {
    pub left: TimeRange,
    pub right: TimeRange,
    pub query: String,
    pub left_query: String,
    pub right_query: String,
    pub refresh_token: RefreshToken,
    pub max_nodes: u32,
    pub left_tags: TagSet,
    pub right_tags: TagSet,
    pub fetch_state: FetchState,
    pub phase: LoadPhase,
    pub artifact: Option<Arc<DiffArtifact>>,
    pub last_error: Option<FetchFailure>,
    pub timezone: TimezoneMode,
    pub color_mode: ColorMode,
}

impl ViewSnapshot {
    pub fn range(&self, side: Side) -> TimeRange {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    pub fn tags(&self, side: Side) -> &TagSet {
        match side {
            Side::Left => &self.left_tags,
            Side::Right => &self.right_tags,
        }
    }

    pub fn markings(&self) -> TimelineMarkings {
        TimelineMarkings::new(self.left, self.right)
    }

    /// Export controls are shown only when there is a profile to export.
    pub fn is_exportable(&self) -> bool {
        self.artifact.as_ref().is_some_and(|a| a.is_exportable())
    }
}
