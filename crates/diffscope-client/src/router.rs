//! Selection event router.
//!
//! Maps gestures from the timeline, tag bar, and toolbar surfaces onto store
//! mutations. Routing is synchronous and does no I/O: a tag label selection
//! only comes back as a [`Dispatch::TagValues`] request for the caller to run.
//!
//! | Surface                 | Gesture             | Effect                    |
//! |-------------------------|---------------------|---------------------------|
//! | combined timeline       | drag-select         | `set_both`                |
//! | left / right timeline   | drag-select         | `set_left` / `set_right`  |
//! | left / right tag bar    | set filter          | `set_{left,right}_query`  |
//! | toolbar name selector   | choose root name    | `set_query` (both sides)  |
//! | left / right tag bar    | select label        | tag values lookup         |
//! | toolbar refresh         | click               | `bump_refresh_token`      |

use diffscope_types::{Side, Timestamp};

use crate::store::{QueryChange, QueryStore, TimeRangeStore};

/// A gesture from one of the view's input surfaces.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SelectionEvent {
    /// Drag on the combined (top) timeline.
    CombinedRangeSelected { from: Timestamp, until: Timestamp },
    /// Drag on one side's timeline.
    SideRangeSelected { side: Side, from: Timestamp, until: Timestamp },
    /// A tag bar applied a new filter expression.
    TagQuerySet { side: Side, query: String },
    /// Toolbar picked a root profile name.
    RootNameSelected { query: String },
    /// A tag bar opened a label and wants its values.
    TagLabelSelected { side: Side, label: String, query: String },
    /// Explicit refresh.
    Refresh,
}

/// What a routed event changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Changes {
    pub ranges: bool,
    pub queries: QueryChange,
    pub refreshed: bool,
}

impl Changes {
    pub fn any(&self) -> bool {
        self.ranges || self.queries.any() || self.refreshed
    }
}

/// A values lookup for one tag label, keyed by `(query, label)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagValuesRequest {
    pub side: Side,
    pub query: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    Mutated(Changes),
    TagValues(TagValuesRequest),
}

/// Apply one event to the stores.
pub fn dispatch(
    event: SelectionEvent,
    ranges: &mut TimeRangeStore,
    queries: &mut QueryStore,
) -> Dispatch {
    let changes = match event {
        SelectionEvent::CombinedRangeSelected { from, until } => Changes {
            ranges: ranges.set_both(from, until),
            ..Default::default()
        },
        SelectionEvent::SideRangeSelected { side, from, until } => Changes {
            ranges: ranges.set_side(side, from, until),
            ..Default::default()
        },
        SelectionEvent::TagQuerySet { side, query } => Changes {
            queries: QueryChange::for_side(side, queries.set_side_query(side, query)),
            ..Default::default()
        },
        SelectionEvent::RootNameSelected { query } => Changes {
            queries: queries.set_query(query),
            ..Default::default()
        },
        SelectionEvent::Refresh => {
            ranges.bump_refresh_token();
            Changes { refreshed: true, ..Default::default() }
        }
        SelectionEvent::TagLabelSelected { side, label, query } => {
            return Dispatch::TagValues(TagValuesRequest { side, query, label });
        }
    };
    Dispatch::Mutated(changes)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use diffscope_types::{RefreshToken, TimeRange};

    fn stores() -> (TimeRangeStore, QueryStore) {
        (
            TimeRangeStore::new(TimeRange::new(100, 200), TimeRange::new(300, 400), 1024),
            QueryStore::new("", "svc{}", "svc{}"),
        )
    }

    fn mutated(d: Dispatch) -> Changes {
        match d {
            Dispatch::Mutated(c) => c,
            other => panic!("expected mutation, got {other:?}"),
        }
    }

    #[test]
    fn test_combined_drag_sets_both() {
        let (mut r, mut q) = stores();
        let c = mutated(dispatch(
            SelectionEvent::CombinedRangeSelected { from: 10, until: 20 },
            &mut r,
            &mut q,
        ));
        assert!(c.ranges);
        assert_eq!(r.left(), TimeRange::new(10, 20));
        assert_eq!(r.right(), TimeRange::new(10, 20));
    }

    #[test]
    fn test_side_drags_are_independent() {
        let (mut r, mut q) = stores();
        dispatch(
            SelectionEvent::SideRangeSelected { side: Side::Left, from: 150, until: 250 },
            &mut r,
            &mut q,
        );
        assert_eq!(r.left(), TimeRange::new(150, 250));
        assert_eq!(r.right(), TimeRange::new(300, 400));

        dispatch(
            SelectionEvent::SideRangeSelected { side: Side::Right, from: 350, until: 450 },
            &mut r,
            &mut q,
        );
        assert_eq!(r.left(), TimeRange::new(150, 250));
        assert_eq!(r.right(), TimeRange::new(350, 450));
    }

    #[test]
    fn test_tag_bar_sets_one_side() {
        let (mut r, mut q) = stores();
        let c = mutated(dispatch(
            SelectionEvent::TagQuerySet { side: Side::Right, query: "svc{host=\"a\"}".into() },
            &mut r,
            &mut q,
        ));
        assert_eq!(c.queries, QueryChange { left: false, right: true });
        assert_eq!(q.left_query(), "svc{}");
        assert_eq!(q.right_query(), "svc{host=\"a\"}");
        assert!(!c.ranges);
    }

    #[test]
    fn test_root_name_collapses_both_sides() {
        let (mut r, mut q) = stores();
        q.set_left_query("x{}");
        let c = mutated(dispatch(
            SelectionEvent::RootNameSelected { query: "app.cpu".into() },
            &mut r,
            &mut q,
        ));
        assert!(c.queries.left && c.queries.right);
        assert_eq!(q.left_query(), "app.cpu");
        assert_eq!(q.right_query(), "app.cpu");
    }

    #[test]
    fn test_refresh_bumps_token_only() {
        let (mut r, mut q) = stores();
        let c = mutated(dispatch(SelectionEvent::Refresh, &mut r, &mut q));
        assert!(c.refreshed);
        assert!(!c.ranges);
        assert_eq!(r.refresh_token(), RefreshToken(1));
    }

    #[test]
    fn test_repeated_drag_reports_no_change() {
        let (mut r, mut q) = stores();
        let ev = SelectionEvent::CombinedRangeSelected { from: 1, until: 2 };
        assert!(mutated(dispatch(ev.clone(), &mut r, &mut q)).any());
        assert!(!mutated(dispatch(ev, &mut r, &mut q)).any());
    }

    #[test]
    fn test_label_selection_is_a_lookup_not_a_mutation() {
        let (mut r, mut q) = stores();
        let before = (r.clone(), q.clone());
        let d = dispatch(
            SelectionEvent::TagLabelSelected {
                side: Side::Left,
                label: "region".into(),
                query: "svc{}".into(),
            },
            &mut r,
            &mut q,
        );
        assert_eq!(
            d,
            Dispatch::TagValues(TagValuesRequest {
                side: Side::Left,
                query: "svc{}".into(),
                label: "region".into(),
            })
        );
        assert_eq!((r, q), before);
    }
}
