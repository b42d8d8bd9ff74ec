//! Diff fetch orchestration.
//!
//! [`DiffOrchestrator`] watches the [`FetchInputSnapshot`] built from the
//! stores and decides when a diff fetch is issued and which completion is
//! allowed to land. It performs no I/O itself: [`observe`](DiffOrchestrator::observe)
//! hands back a [`FetchTicket`] for the caller to run, and the caller feeds
//! the outcome back through [`complete`](DiffOrchestrator::complete).
//!
//! # State Machine
//!
//! ```text
//! +------------+  snapshot with both queries   +-------------------+
//! |    Idle    | ----------------------------> |  Fetching(gen N)  |
//! +------------+                               +---------+---------+
//!       ^          snapshot with an empty query          |
//!       +------------------------------------------------+  any other snapshot change:
//!                                                        |  cancel N, issue N+1
//!                                      complete(N, ..)   v
//!                               +------------------------+-----------------+
//!                               | Delivered(N)  /  Failed(N)               |
//!                               +------------------------------------------+
//! ```
//!
//! Every issued fetch carries a [`FetchGeneration`]. A completion is applied
//! only if its generation is the one currently in flight; anything else was
//! superseded and is dropped, whatever order the completions arrive in.
//! Cancellation also trips the fetch's [`CancellationToken`] so the I/O task
//! can stop early, but correctness never depends on the task noticing.

use std::sync::Arc;

use diffscope_types::{DiffArtifact, FetchGeneration, FetchInputSnapshot, FetchRequest};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::backend::BackendError;

/// Where the most recent snapshot stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchState {
    /// No fetchable snapshot (a query is empty, or nothing observed yet).
    #[default]
    Idle,
    Fetching(FetchGeneration),
    Delivered(FetchGeneration),
    Failed(FetchGeneration),
    /// Cancelled without a replacement (shutdown).
    Cancelled(FetchGeneration),
}

/// Coarse status for renderers: is there something to show, and is a newer
/// version on the way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadPhase {
    /// Nothing delivered, nothing in flight.
    #[default]
    Pristine,
    /// In flight, nothing to show yet.
    Loading,
    /// In flight, previous artifact still shown.
    Reloading,
    Loaded,
}

/// A fetch the caller must run.
#[derive(Debug, Clone)]
pub struct FetchTicket {
    pub generation: FetchGeneration,
    pub request: FetchRequest,
    pub cancel: CancellationToken,
}

/// Result of observing a snapshot.
#[derive(Debug)]
pub enum Transition {
    /// Same snapshot as last time.
    Unchanged,
    /// Snapshot not fetchable. Any outstanding fetch was cancelled.
    Idle { cancelled: Option<FetchGeneration> },
    /// New fetch issued, after cancelling the outstanding one if any.
    Issued { cancelled: Option<FetchGeneration>, ticket: FetchTicket },
}

/// Result of feeding a completion back.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    Delivered { generation: FetchGeneration, artifact: Arc<DiffArtifact> },
    Failed { generation: FetchGeneration, error: BackendError },
    /// Superseded or cancelled; nothing changed.
    Discarded { generation: FetchGeneration },
}

/// The last fetch failure, kept until dismissed or a fetch succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    pub generation: FetchGeneration,
    pub error: BackendError,
}

#[derive(Debug)]
struct InFlight {
    generation: FetchGeneration,
    snapshot: FetchInputSnapshot,
    cancel: CancellationToken,
}

#[derive(Debug, Default)]
pub struct DiffOrchestrator {
    /// Last snapshot seen by `observe`, fetchable or not.
    observed: Option<FetchInputSnapshot>,
    /// Last generation handed out.
    generation: FetchGeneration,
    in_flight: Option<InFlight>,
    state: FetchState,
    artifact: Option<Arc<DiffArtifact>>,
    /// The snapshot `artifact` was fetched for.
    artifact_snapshot: Option<FetchInputSnapshot>,
    last_error: Option<FetchFailure>,
}

impl DiffOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// React to the current snapshot.
    pub fn observe(&mut self, snapshot: FetchInputSnapshot) -> Transition {
        if self.observed.as_ref() == Some(&snapshot) {
            trace!("Snapshot unchanged, no fetch");
            return Transition::Unchanged;
        }

        let cancelled = self.cancel();

        if !snapshot.is_fetchable() {
            debug!(
                left_query = %snapshot.left_query,
                right_query = %snapshot.right_query,
                "Snapshot has an empty query, staying idle"
            );
            self.observed = Some(snapshot);
            self.state = FetchState::Idle;
            return Transition::Idle { cancelled };
        }

        self.generation = self.generation.next();
        let generation = self.generation;
        let cancel = CancellationToken::new();
        let ticket = FetchTicket {
            generation,
            request: snapshot.to_request(),
            cancel: cancel.clone(),
        };
        debug!(%generation, ?cancelled, "Issuing diff fetch");

        self.in_flight = Some(InFlight { generation, snapshot: snapshot.clone(), cancel });
        self.observed = Some(snapshot);
        self.state = FetchState::Fetching(generation);
        Transition::Issued { cancelled, ticket }
    }

    /// Apply a fetch outcome if it belongs to the fetch in flight.
    pub fn complete(
        &mut self,
        generation: FetchGeneration,
        result: Result<DiffArtifact, BackendError>,
    ) -> Completion {
        let flight = match self.in_flight.take() {
            Some(f) if f.generation == generation => f,
            other => {
                self.in_flight = other;
                trace!(%generation, "Discarding completion of superseded fetch");
                return Completion::Discarded { generation };
            }
        };

        match result {
            Ok(artifact) => {
                let artifact = Arc::new(artifact);
                self.artifact = Some(Arc::clone(&artifact));
                self.artifact_snapshot = Some(flight.snapshot);
                self.last_error = None;
                self.state = FetchState::Delivered(generation);
                Completion::Delivered { generation, artifact }
            }
            Err(error) => {
                warn!(%generation, %error, "Diff fetch failed, keeping previous artifact");
                self.last_error = Some(FetchFailure { generation, error: error.clone() });
                self.state = FetchState::Failed(generation);
                Completion::Failed { generation, error }
            }
        }
    }

    /// Cancel the outstanding fetch, if any.
    ///
    /// No-op once the fetch has completed; calling twice is safe.
    pub fn cancel(&mut self) -> Option<FetchGeneration> {
        let flight = self.in_flight.take()?;
        flight.cancel.cancel();
        self.state = FetchState::Cancelled(flight.generation);
        trace!(generation = %flight.generation, "Cancelled outstanding fetch");
        Some(flight.generation)
    }

    pub fn dismiss_error(&mut self) -> bool {
        self.last_error.take().is_some()
    }

    pub fn state(&self) -> FetchState {
        self.state
    }

    pub fn phase(&self) -> LoadPhase {
        match (self.in_flight.is_some(), self.artifact.is_some()) {
            (true, false) => LoadPhase::Loading,
            (true, true) => LoadPhase::Reloading,
            (false, true) => LoadPhase::Loaded,
            (false, false) => LoadPhase::Pristine,
        }
    }

    pub fn in_flight(&self) -> Option<FetchGeneration> {
        self.in_flight.as_ref().map(|f| f.generation)
    }

    pub fn observed(&self) -> Option<&FetchInputSnapshot> {
        self.observed.as_ref()
    }

    pub fn artifact(&self) -> Option<&Arc<DiffArtifact>> {
        self.artifact.as_ref()
    }

    pub fn artifact_snapshot(&self) -> Option<&FetchInputSnapshot> {
        self.artifact_snapshot.as_ref()
    }

    pub fn last_error(&self) -> Option<&FetchFailure> {
        self.last_error.as_ref()
    }

    /// Number of fetches issued so far.
    pub fn issued(&self) -> u64 {
        self.generation.0
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::{SelectionEvent, dispatch};
    use crate::store::{QueryStore, TimeRangeStore, capture};
    use diffscope_types::{RefreshToken, Side, TimeRange, Timeline};

    struct Harness {
        ranges: TimeRangeStore,
        queries: QueryStore,
        orch: DiffOrchestrator,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                ranges: TimeRangeStore::new(TimeRange::new(100, 200), TimeRange::new(300, 400), 1024),
                queries: QueryStore::new("", "svc{}", "svc{}"),
                orch: DiffOrchestrator::new(),
            }
        }

        fn send(&mut self, event: SelectionEvent) -> Transition {
            dispatch(event, &mut self.ranges, &mut self.queries);
            self.orch.observe(capture(&self.ranges, &self.queries))
        }

        fn evaluate(&mut self) -> Transition {
            self.orch.observe(capture(&self.ranges, &self.queries))
        }
    }

    fn issued(t: Transition) -> (Option<FetchGeneration>, FetchTicket) {
        match t {
            Transition::Issued { cancelled, ticket } => (cancelled, ticket),
            other => panic!("expected a fetch, got {other:?}"),
        }
    }

    fn artifact(tag: i64) -> DiffArtifact {
        DiffArtifact {
            profile: Some(serde_json::json!({ "tag": tag })),
            left_timeline: Timeline { start_time: tag, ..Default::default() },
            right_timeline: Timeline::default(),
        }
    }

    fn profile_tag(orch: &DiffOrchestrator) -> i64 {
        orch.artifact().unwrap().profile.as_ref().unwrap()["tag"].as_i64().unwrap()
    }

    #[test]
    fn test_initial_observe_fetches() {
        let mut h = Harness::new();
        assert_eq!(h.orch.state(), FetchState::Idle);
        let (cancelled, ticket) = issued(h.evaluate());
        assert_eq!(cancelled, None);
        assert_eq!(ticket.generation, FetchGeneration(1));
        assert_eq!(h.orch.phase(), LoadPhase::Loading);
    }

    #[test]
    fn test_set_left_scenario_then_refresh() {
        let mut h = Harness::new();
        let (_, first) = issued(h.evaluate());
        h.orch.complete(first.generation, Ok(artifact(0)));

        let (cancelled, ticket) = issued(h.send(SelectionEvent::SideRangeSelected {
            side: Side::Left,
            from: 150,
            until: 250,
        }));
        assert_eq!(cancelled, None);
        assert_eq!(h.orch.issued(), 2);
        assert_eq!(
            ticket.request,
            FetchRequest {
                left_query: "svc{}".into(),
                left_from: 150,
                left_until: 250,
                right_query: "svc{}".into(),
                right_from: 300,
                right_until: 400,
                max_nodes: 1024,
            }
        );

        // Refresh before the range fetch resolves.
        let (cancelled, refreshed) = issued(h.send(SelectionEvent::Refresh));
        assert_eq!(cancelled, Some(ticket.generation));
        assert!(ticket.cancel.is_cancelled());
        assert!(!refreshed.cancel.is_cancelled());
        assert_eq!(refreshed.request, ticket.request);
        assert_eq!(h.orch.observed().unwrap().refresh_token, RefreshToken(1));
        assert_eq!(h.orch.issued(), 3);
    }

    #[test]
    fn test_duplicate_set_both_issues_one_fetch() {
        let mut h = Harness::new();
        issued(h.evaluate());
        let ev = SelectionEvent::CombinedRangeSelected { from: 10, until: 20 };
        issued(h.send(ev.clone()));
        assert!(matches!(h.send(ev), Transition::Unchanged));
        assert_eq!(h.orch.issued(), 2);
    }

    #[test]
    fn test_superseded_completion_never_overwrites_newer() {
        let mut h = Harness::new();
        let (_, s1) = issued(h.evaluate());
        let (_, s2) = issued(h.send(SelectionEvent::CombinedRangeSelected { from: 1, until: 2 }));

        // S2 resolves first, then the stale S1.
        assert!(matches!(
            h.orch.complete(s2.generation, Ok(artifact(2))),
            Completion::Delivered { .. }
        ));
        assert_eq!(
            h.orch.complete(s1.generation, Ok(artifact(1))),
            Completion::Discarded { generation: s1.generation }
        );
        assert_eq!(profile_tag(&h.orch), 2);
        assert_eq!(h.orch.state(), FetchState::Delivered(s2.generation));
    }

    #[test]
    fn test_superseded_completion_arriving_first_is_dropped() {
        let mut h = Harness::new();
        let (_, s1) = issued(h.evaluate());
        let (_, s2) = issued(h.send(SelectionEvent::CombinedRangeSelected { from: 1, until: 2 }));

        h.orch.complete(s1.generation, Ok(artifact(1)));
        assert!(h.orch.artifact().is_none());
        assert_eq!(h.orch.phase(), LoadPhase::Loading);

        h.orch.complete(s2.generation, Ok(artifact(2)));
        assert_eq!(profile_tag(&h.orch), 2);
        assert_eq!(h.orch.artifact_snapshot().unwrap().left_from, 1);
    }

    #[test]
    fn test_superseded_failure_is_dropped_too() {
        let mut h = Harness::new();
        let (_, s1) = issued(h.evaluate());
        issued(h.send(SelectionEvent::Refresh));
        let c = h.orch.complete(s1.generation, Err(BackendError::Timeout));
        assert!(matches!(c, Completion::Discarded { .. }));
        assert!(h.orch.last_error().is_none());
    }

    #[test]
    fn test_empty_query_suppresses_fetch_and_keeps_artifact() {
        let mut h = Harness::new();
        let (_, s1) = issued(h.evaluate());
        h.orch.complete(s1.generation, Ok(artifact(1)));

        let t = h.send(SelectionEvent::TagQuerySet { side: Side::Right, query: String::new() });
        assert!(matches!(t, Transition::Idle { cancelled: None }));
        assert_eq!(h.orch.state(), FetchState::Idle);
        assert_eq!(profile_tag(&h.orch), 1);
        assert_eq!(h.orch.issued(), 1);

        // Further changes while a side is empty still don't fetch.
        let t = h.send(SelectionEvent::SideRangeSelected { side: Side::Left, from: 0, until: 1 });
        assert!(matches!(t, Transition::Idle { .. }));
        assert_eq!(h.orch.issued(), 1);
    }

    #[test]
    fn test_emptying_a_query_cancels_in_flight() {
        let mut h = Harness::new();
        let (_, s1) = issued(h.evaluate());
        let t = h.send(SelectionEvent::TagQuerySet { side: Side::Left, query: String::new() });
        assert!(matches!(t, Transition::Idle { cancelled: Some(g) } if g == s1.generation));
        assert!(s1.cancel.is_cancelled());
        assert_eq!(
            h.orch.complete(s1.generation, Ok(artifact(1))),
            Completion::Discarded { generation: s1.generation }
        );
        assert_eq!(h.orch.phase(), LoadPhase::Pristine);
    }

    #[test]
    fn test_failure_keeps_previous_artifact() {
        let mut h = Harness::new();
        let (_, s1) = issued(h.evaluate());
        h.orch.complete(s1.generation, Ok(artifact(1)));

        let (_, s2) = issued(h.send(SelectionEvent::Refresh));
        assert_eq!(h.orch.phase(), LoadPhase::Reloading);
        let c = h.orch.complete(s2.generation, Err(BackendError::Status { status: 500, body: "boom".into() }));
        assert!(matches!(c, Completion::Failed { .. }));
        assert_eq!(profile_tag(&h.orch), 1);
        assert_eq!(h.orch.state(), FetchState::Failed(s2.generation));
        assert_eq!(h.orch.last_error().unwrap().generation, s2.generation);
        assert_eq!(h.orch.phase(), LoadPhase::Loaded);

        assert!(h.orch.dismiss_error());
        assert!(!h.orch.dismiss_error());
    }

    #[test]
    fn test_next_change_retries_after_failure() {
        let mut h = Harness::new();
        let (_, s1) = issued(h.evaluate());
        h.orch.complete(s1.generation, Err(BackendError::Timeout));
        let (_, s2) = issued(h.send(SelectionEvent::Refresh));
        h.orch.complete(s2.generation, Ok(artifact(2)));
        assert!(h.orch.last_error().is_none());
        assert_eq!(profile_tag(&h.orch), 2);
    }

    #[test]
    fn test_cancel_is_idempotent_and_noop_after_delivery() {
        let mut h = Harness::new();
        let (_, s1) = issued(h.evaluate());
        assert_eq!(h.orch.cancel(), Some(s1.generation));
        assert_eq!(h.orch.cancel(), None);
        assert_eq!(h.orch.state(), FetchState::Cancelled(s1.generation));

        let (_, s2) = issued(h.send(SelectionEvent::Refresh));
        h.orch.complete(s2.generation, Ok(artifact(2)));
        assert_eq!(h.orch.cancel(), None);
        assert!(!s2.cancel.is_cancelled());
        assert_eq!(h.orch.state(), FetchState::Delivered(s2.generation));
    }

    #[test]
    fn test_root_name_selection_refetches_with_both_queries() {
        let mut h = Harness::new();
        issued(h.evaluate());
        let (_, t) = issued(h.send(SelectionEvent::RootNameSelected { query: "app.cpu".into() }));
        assert_eq!(t.request.left_query, "app.cpu");
        assert_eq!(t.request.right_query, "app.cpu");
    }

    #[test]
    fn test_max_nodes_change_refetches() {
        let mut h = Harness::new();
        issued(h.evaluate());
        h.ranges.set_max_nodes(8192);
        let (_, t) = issued(h.evaluate());
        assert_eq!(t.request.max_nodes, 8192);
    }

    #[test]
    fn test_observed_snapshot_tracks_every_mutation() {
        let mut h = Harness::new();
        let events = vec![
            SelectionEvent::CombinedRangeSelected { from: 5, until: 50 },
            SelectionEvent::SideRangeSelected { side: Side::Right, from: 60, until: 70 },
            SelectionEvent::TagQuerySet { side: Side::Left, query: "a{}".into() },
            SelectionEvent::Refresh,
            SelectionEvent::SideRangeSelected { side: Side::Left, from: 7, until: 8 },
            SelectionEvent::TagQuerySet { side: Side::Right, query: "b{}".into() },
        ];
        for ev in events {
            h.send(ev);
            assert_eq!(h.orch.observed(), Some(&capture(&h.ranges, &h.queries)));
        }
        let s = h.orch.observed().unwrap();
        assert_eq!((s.left_from, s.left_until, s.right_from, s.right_until), (7, 8, 60, 70));
        assert_eq!((s.left_query.as_str(), s.right_query.as_str()), ("a{}", "b{}"));
        assert_eq!(s.refresh_token, RefreshToken(1));
    }
}
