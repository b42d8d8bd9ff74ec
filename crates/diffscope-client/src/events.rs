//! Outbound view events.
//!
//! [`ViewEvent`] is what the view actor broadcasts to renderers and anything
//! else watching the comparison. Subscribe via
//! [`ViewHandle::subscribe`](crate::ViewHandle::subscribe).

use std::sync::Arc;

use diffscope_types::{DiffArtifact, FetchGeneration, FetchRequest, Side, TagSet, TimeRange};

use crate::backend::BackendError;

#[derive(Clone, Debug)]
pub enum ViewEvent {
    /// One or both windows moved.
    RangesChanged { left: TimeRange, right: TimeRange },
    /// One or both queries changed.
    QueriesChanged { left: String, right: String },
    /// A diff fetch was issued.
    FetchStarted { generation: FetchGeneration, request: FetchRequest },
    /// An outstanding fetch was superseded or the view went idle.
    FetchCancelled { generation: FetchGeneration },
    /// A new artifact is current.
    DiffDelivered { generation: FetchGeneration, artifact: Arc<DiffArtifact> },
    /// The current fetch failed. The previous artifact is still current.
    FetchFailed { generation: FetchGeneration, error: BackendError },
    /// A side's tag set was resolved for its current query.
    TagsResolved { side: Side, query: String, tags: TagSet },
    /// Values for a selected label.
    TagValues { side: Side, query: String, label: String, values: Vec<String> },
    /// A tag or tag-value lookup failed.
    TagLookupFailed { side: Side, query: String, error: BackendError },
}

impl ViewEvent {
    /// Short kind name for logs and the CLI.
    pub fn kind(&self) -> &'static str {
        match self {
            ViewEvent::RangesChanged { .. } => "ranges",
            ViewEvent::QueriesChanged { .. } => "queries",
            ViewEvent::FetchStarted { .. } => "fetch-started",
            ViewEvent::FetchCancelled { .. } => "fetch-cancelled",
            ViewEvent::DiffDelivered { .. } => "diff",
            ViewEvent::FetchFailed { .. } => "fetch-failed",
            ViewEvent::TagsResolved { .. } => "tags",
            ViewEvent::TagValues { .. } => "tag-values",
            ViewEvent::TagLookupFailed { .. } => "tag-failed",
        }
    }
}
