//! Diffscope comparison-view client library
//!
//! Holds the state behind a two-window profile comparison: the selected
//! time ranges, the per-side queries, the tag sets, and the current diff.
//! A single actor task owns all of it and talks to a [`QueryBackend`] for
//! diffs and tags.
//!
//! ```text
//! surfaces ──SelectionEvent──▶ ViewHandle ──▶ ViewActor
//!                                               ├─ router      → TimeRangeStore / QueryStore
//!                                               ├─ tags        → QueryBackend::labels
//!                                               └─ orchestrator→ QueryBackend::render_diff
//!                                                        │
//! renderers ◀──────────── broadcast<ViewEvent> ──────────┘
//! ```

pub mod actor;
pub mod backend;
pub mod config;
pub mod constants;
pub mod events;
pub mod orchestrator;
pub mod router;
pub mod store;
pub mod tags;
pub mod view;

pub use actor::{ViewError, ViewHandle, spawn_view};
pub use backend::{
    AppFixture, BackendError, Fixture, HttpBackend, InMemoryBackend, QueryBackend, app_name,
};
pub use config::{ConfigError, ViewConfig};
pub use events::ViewEvent;
pub use orchestrator::{
    Completion, DiffOrchestrator, FetchFailure, FetchState, FetchTicket, LoadPhase, Transition,
};
pub use router::{Changes, Dispatch, SelectionEvent, TagValuesRequest};
pub use store::{QueryChange, QueryStore, TimeRangeStore};
pub use tags::{TagLookup, TagResolver};
pub use view::ViewSnapshot;
