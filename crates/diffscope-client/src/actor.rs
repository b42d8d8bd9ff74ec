//! Actor owning the comparison view.
//!
//! One task owns the stores, the tag resolver, and the diff orchestrator.
//! Everything else talks to it through a `Send + Sync` [`ViewHandle`]:
//! commands go in over an mpsc channel, events come out over a broadcast
//! channel. Backend I/O runs on separate tasks that report back through a
//! second channel, so the actor is the only writer of view state.
//!
//! ```text
//!   ViewHandle (Clone)       mpsc        ViewActor (one task)          spawned
//!   ┌──────────────────┐  ─────────▶  ┌──────────────────────────┐   ┌──────────────┐
//!   │ .dispatch()      │              │ TimeRangeStore           │──▶│ render_diff  │
//!   │ .refresh()       │              │ QueryStore               │   │ labels       │
//!   │ .snapshot()      │  ◀─────────  │ TagResolver              │◀──│ label_values │
//!   └──────────────────┘   oneshot    │ DiffOrchestrator         │   └──────────────┘
//!            ▲                        └────────────┬─────────────┘     FetchDone (mpsc)
//!            └──────── broadcast<ViewEvent> ───────┘
//! ```
//!
//! Commands and completions are handled one at a time, to completion, so no
//! two mutations ever interleave.

use std::sync::Arc;

use diffscope_types::{
    ColorMode, DiffArtifact, FetchGeneration, Side, TagSet, Timestamp, TimezoneMode,
};
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{Instrument, debug, info, trace, warn};

use crate::backend::{BackendError, QueryBackend};
use crate::config::ViewConfig;
use crate::events::ViewEvent;
use crate::orchestrator::{Completion, DiffOrchestrator, FetchTicket, Transition};
use crate::router::{self, Dispatch, SelectionEvent, TagValuesRequest};
use crate::store::{self, QueryChange, QueryStore, TimeRangeStore};
use crate::tags::{TagLookup, TagResolver};
use crate::view::ViewSnapshot;

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ViewError {
    #[error("view actor shut down")]
    Shutdown,
}

// ============================================================================
// Messages (internal)
// ============================================================================

/// Sent from ViewHandle → ViewActor.
enum ViewCommand {
    Select(SelectionEvent),
    SetMainQuery { query: String },
    SetMaxNodes { max_nodes: u32 },
    DismissError,
    Snapshot { reply: oneshot::Sender<ViewSnapshot> },
    Shutdown,
}

/// Sent from a backend task → ViewActor.
enum FetchDone {
    Diff {
        generation: FetchGeneration,
        result: Result<DiffArtifact, BackendError>,
    },
    Tags {
        lookup: TagLookup,
        result: Result<TagSet, BackendError>,
    },
    TagValues {
        request: TagValuesRequest,
        result: Result<Vec<String>, BackendError>,
    },
}

// ============================================================================
// ViewHandle (Send + Sync public API)
// ============================================================================

/// Cloneable handle to a running view actor.
///
/// Mutations are fire-and-forget: they only fail if the actor is gone.
#[derive(Clone)]
pub struct ViewHandle {
    tx: mpsc::UnboundedSender<ViewCommand>,
    events: broadcast::Sender<ViewEvent>,
}

impl ViewHandle {
    fn send(&self, cmd: ViewCommand) -> Result<(), ViewError> {
        self.tx.send(cmd).map_err(|_| ViewError::Shutdown)
    }

    /// Route a gesture from any input surface.
    pub fn dispatch(&self, event: SelectionEvent) -> Result<(), ViewError> {
        self.send(ViewCommand::Select(event))
    }

    // ── Timelines ────────────────────────────────────────────────────────

    /// Drag on the combined timeline.
    pub fn select_combined(&self, from: Timestamp, until: Timestamp) -> Result<(), ViewError> {
        self.dispatch(SelectionEvent::CombinedRangeSelected { from, until })
    }

    /// Drag on one side's timeline.
    pub fn select_range(&self, side: Side, from: Timestamp, until: Timestamp) -> Result<(), ViewError> {
        self.dispatch(SelectionEvent::SideRangeSelected { side, from, until })
    }

    // ── Queries and tags ─────────────────────────────────────────────────

    /// Apply a filter expression from one side's tag bar.
    pub fn set_side_query(&self, side: Side, query: &str) -> Result<(), ViewError> {
        self.dispatch(SelectionEvent::TagQuerySet { side, query: query.to_string() })
    }

    /// Toolbar root-name selection: both sides get `query`.
    pub fn select_root_name(&self, query: &str) -> Result<(), ViewError> {
        self.dispatch(SelectionEvent::RootNameSelected { query: query.to_string() })
    }

    /// Ask for the values of `label` under `query`. Answered with
    /// [`ViewEvent::TagValues`].
    pub fn select_tag_label(&self, side: Side, label: &str, query: &str) -> Result<(), ViewError> {
        self.dispatch(SelectionEvent::TagLabelSelected {
            side,
            label: label.to_string(),
            query: query.to_string(),
        })
    }

    /// Set the main query; empty sides pick it up.
    pub fn set_main_query(&self, query: &str) -> Result<(), ViewError> {
        self.send(ViewCommand::SetMainQuery { query: query.to_string() })
    }

    // ── Fetch control ────────────────────────────────────────────────────

    /// Re-fetch with unchanged inputs.
    pub fn refresh(&self) -> Result<(), ViewError> {
        self.dispatch(SelectionEvent::Refresh)
    }

    pub fn set_max_nodes(&self, max_nodes: u32) -> Result<(), ViewError> {
        self.send(ViewCommand::SetMaxNodes { max_nodes })
    }

    /// Clear the transient fetch error.
    pub fn dismiss_error(&self) -> Result<(), ViewError> {
        self.send(ViewCommand::DismissError)
    }

    // ── Reads ────────────────────────────────────────────────────────────

    /// Current view state. Reflects every command sent before this call.
    pub async fn snapshot(&self) -> Result<ViewSnapshot, ViewError> {
        let (reply, rx) = oneshot::channel();
        self.send(ViewCommand::Snapshot { reply })?;
        rx.await.map_err(|_| ViewError::Shutdown)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ViewEvent> {
        self.events.subscribe()
    }

    /// Stop the actor. Any in-flight fetch is cancelled.
    pub fn shutdown(&self) -> Result<(), ViewError> {
        self.send(ViewCommand::Shutdown)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

// ============================================================================
// ViewActor (internal)
// ============================================================================

struct ViewActor {
    backend: Arc<dyn QueryBackend>,
    ranges: TimeRangeStore,
    queries: QueryStore,
    tags: TagResolver,
    orchestrator: DiffOrchestrator,
    timezone: TimezoneMode,
    color_mode: ColorMode,
    events: broadcast::Sender<ViewEvent>,
    done_tx: mpsc::UnboundedSender<FetchDone>,
}

impl ViewActor {
    fn new(
        backend: Arc<dyn QueryBackend>,
        config: &ViewConfig,
        events: broadcast::Sender<ViewEvent>,
        done_tx: mpsc::UnboundedSender<FetchDone>,
    ) -> Self {
        Self {
            backend,
            ranges: TimeRangeStore::new(config.left, config.right, config.max_nodes),
            queries: QueryStore::new(
                config.query.as_str(),
                config.left_query.as_str(),
                config.right_query.as_str(),
            ),
            tags: TagResolver::new(),
            orchestrator: DiffOrchestrator::new(),
            timezone: config.timezone(),
            color_mode: config.color_mode,
            events,
            done_tx,
        }
    }

    /// Process commands and completions until shutdown or every handle is
    /// dropped.
    async fn run(
        mut self,
        mut rx: mpsc::UnboundedReceiver<ViewCommand>,
        mut done_rx: mpsc::UnboundedReceiver<FetchDone>,
    ) {
        info!(
            backend = self.backend.name(),
            left = %self.ranges.left(),
            right = %self.ranges.right(),
            "View actor started"
        );

        for side in Side::BOTH {
            self.resolve_tags(side);
        }
        self.evaluate();

        loop {
            tokio::select! {
                cmd = rx.recv() => {
                    let Some(cmd) = cmd else { break };
                    if !self.handle_command(cmd) {
                        break;
                    }
                }
                Some(done) = done_rx.recv() => self.handle_done(done),
            }
        }

        if let Some(generation) = self.orchestrator.cancel() {
            debug!(%generation, "Cancelled in-flight fetch on shutdown");
        }
        debug!("View actor shutting down");
    }

    /// Returns false when the actor should stop.
    fn handle_command(&mut self, cmd: ViewCommand) -> bool {
        match cmd {
            ViewCommand::Select(event) => self.select(event),
            ViewCommand::SetMainQuery { query } => {
                let change = self.queries.set_main_query(query);
                self.after_query_change(change);
                self.evaluate();
            }
            ViewCommand::SetMaxNodes { max_nodes } => {
                self.ranges.set_max_nodes(max_nodes);
                self.evaluate();
            }
            ViewCommand::DismissError => {
                self.orchestrator.dismiss_error();
            }
            ViewCommand::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
            ViewCommand::Shutdown => return false,
        }
        true
    }

    fn select(&mut self, event: SelectionEvent) {
        trace!(?event, "Routing selection");
        match router::dispatch(event, &mut self.ranges, &mut self.queries) {
            Dispatch::Mutated(changes) => {
                if changes.ranges {
                    self.emit(ViewEvent::RangesChanged {
                        left: self.ranges.left(),
                        right: self.ranges.right(),
                    });
                }
                self.after_query_change(changes.queries);
                self.evaluate();
            }
            Dispatch::TagValues(request) => self.spawn_tag_values(request),
        }
    }

    fn after_query_change(&mut self, change: QueryChange) {
        if !change.any() {
            return;
        }
        self.emit(ViewEvent::QueriesChanged {
            left: self.queries.left_query().to_string(),
            right: self.queries.right_query().to_string(),
        });
        for side in change.sides() {
            self.resolve_tags(side);
        }
    }

    /// Compare the current snapshot with the last one and fetch if needed.
    fn evaluate(&mut self) {
        let snapshot = store::capture(&self.ranges, &self.queries);
        match self.orchestrator.observe(snapshot) {
            Transition::Unchanged => {}
            Transition::Idle { cancelled } => self.emit_cancelled(cancelled),
            Transition::Issued { cancelled, ticket } => {
                self.emit_cancelled(cancelled);
                self.emit(ViewEvent::FetchStarted {
                    generation: ticket.generation,
                    request: ticket.request.clone(),
                });
                self.spawn_fetch(ticket);
            }
        }
    }

    fn resolve_tags(&mut self, side: Side) {
        let query = self.queries.side_query(side).to_string();
        match self.tags.query_changed(side, &query) {
            Some(lookup) => self.spawn_tags(lookup),
            None if query.is_empty() => self.emit(ViewEvent::TagsResolved {
                side,
                query,
                tags: TagSet::new(),
            }),
            None => {}
        }
    }

    fn handle_done(&mut self, done: FetchDone) {
        match done {
            FetchDone::Diff { generation, result } => {
                match self.orchestrator.complete(generation, result) {
                    Completion::Delivered { generation, artifact } => {
                        info!(%generation, "Diff delivered");
                        self.emit(ViewEvent::DiffDelivered { generation, artifact });
                    }
                    Completion::Failed { generation, error } => {
                        self.emit(ViewEvent::FetchFailed { generation, error });
                    }
                    Completion::Discarded { .. } => {}
                }
            }
            FetchDone::Tags { lookup, result } => match result {
                Ok(tags) => {
                    if self.tags.complete(&lookup, tags.clone()) {
                        self.emit(ViewEvent::TagsResolved {
                            side: lookup.side,
                            query: lookup.query,
                            tags,
                        });
                    }
                }
                Err(error) => {
                    if self.tags.is_current(&lookup) {
                        warn!(side = %lookup.side, query = %lookup.query, %error, "Tag lookup failed");
                        self.emit(ViewEvent::TagLookupFailed {
                            side: lookup.side,
                            query: lookup.query,
                            error,
                        });
                    }
                }
            },
            FetchDone::TagValues { request, result } => match result {
                Ok(values) => self.emit(ViewEvent::TagValues {
                    side: request.side,
                    query: request.query,
                    label: request.label,
                    values,
                }),
                Err(error) => {
                    warn!(label = %request.label, %error, "Tag values lookup failed");
                    self.emit(ViewEvent::TagLookupFailed {
                        side: request.side,
                        query: request.query,
                        error,
                    });
                }
            },
        }
    }

    // ── Spawning backend work ────────────────────────────────────────────

    fn spawn_fetch(&self, ticket: FetchTicket) {
        let backend = Arc::clone(&self.backend);
        let done = self.done_tx.clone();
        let FetchTicket { generation, request, cancel } = ticket;
        let span = tracing::debug_span!("diff_fetch", %generation);

        tokio::spawn(
            async move {
                tokio::select! {
                    _ = cancel.cancelled() => trace!("Fetch cancelled before completion"),
                    result = backend.render_diff(&request) => {
                        let _ = done.send(FetchDone::Diff { generation, result });
                    }
                }
            }
            .instrument(span),
        );
    }

    fn spawn_tags(&self, lookup: TagLookup) {
        let backend = Arc::clone(&self.backend);
        let done = self.done_tx.clone();
        tokio::spawn(async move {
            let result = backend.labels(&lookup.query).await;
            let _ = done.send(FetchDone::Tags { lookup, result });
        });
    }

    fn spawn_tag_values(&self, request: TagValuesRequest) {
        let backend = Arc::clone(&self.backend);
        let done = self.done_tx.clone();
        tokio::spawn(async move {
            let result = backend.label_values(&request.query, &request.label).await;
            let _ = done.send(FetchDone::TagValues { request, result });
        });
    }

    // ── Outbound ─────────────────────────────────────────────────────────

    fn emit(&self, event: ViewEvent) {
        trace!(kind = event.kind(), "View event");
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn emit_cancelled(&self, cancelled: Option<FetchGeneration>) {
        if let Some(generation) = cancelled {
            self.emit(ViewEvent::FetchCancelled { generation });
        }
    }

    fn snapshot(&self) -> ViewSnapshot {
        ViewSnapshot {
            left: self.ranges.left(),
            right: self.ranges.right(),
            query: self.queries.query().to_string(),
            left_query: self.queries.left_query().to_string(),
            right_query: self.queries.right_query().to_string(),
            refresh_token: self.ranges.refresh_token(),
            max_nodes: self.ranges.max_nodes(),
            left_tags: self.tags.tags(Side::Left).clone(),
            right_tags: self.tags.tags(Side::Right).clone(),
            fetch_state: self.orchestrator.state(),
            phase: self.orchestrator.phase(),
            artifact: self.orchestrator.artifact().cloned(),
            last_error: self.orchestrator.last_error().cloned(),
            timezone: self.timezone,
            color_mode: self.color_mode,
        }
    }
}

// ============================================================================
// Public spawn function
// ============================================================================

/// Spawn a view actor on the current tokio runtime.
///
/// The initial snapshot is evaluated as soon as the actor starts: if both
/// queries are set, the first diff fetch goes out immediately. The returned
/// receiver is subscribed before that, so no event is missed; later
/// subscribers use [`ViewHandle::subscribe`].
pub fn spawn_view(
    backend: Arc<dyn QueryBackend>,
    config: &ViewConfig,
) -> (ViewHandle, broadcast::Receiver<ViewEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let (done_tx, done_rx) = mpsc::unbounded_channel();
    let (events, events_rx) = broadcast::channel(config.event_capacity.max(1));

    let actor = ViewActor::new(backend, config, events.clone(), done_tx);
    tokio::spawn(actor.run(rx, done_rx));
    (ViewHandle { tx, events }, events_rx)
}
