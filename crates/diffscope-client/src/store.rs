//! Time range and query stores.
//!
//! Both stores are plain owned state with a small set of mutation methods.
//! Every mutation reports whether it changed anything, which is what the
//! router folds into [`Changes`](crate::router::Changes). Fields are private:
//! the only way in is through the declared operations.

use diffscope_types::{FetchInputSnapshot, RefreshToken, Side, TimeRange, Timestamp};

use crate::constants::DEFAULT_MAX_NODES;

// ============================================================================
// TimeRangeStore
// ============================================================================

/// Left and right windows, the refresh token, and the result-size cap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeRangeStore {
    left: TimeRange,
    right: TimeRange,
    refresh_token: RefreshToken,
    max_nodes: u32,
}

impl Default for TimeRangeStore {
    fn default() -> Self {
        Self::new(TimeRange::default(), TimeRange::default(), DEFAULT_MAX_NODES)
    }
}

impl TimeRangeStore {
    pub fn new(left: TimeRange, right: TimeRange, max_nodes: u32) -> Self {
        Self {
            left,
            right,
            refresh_token: RefreshToken::default(),
            max_nodes,
        }
    }

    pub fn left(&self) -> TimeRange {
        self.left
    }

    pub fn right(&self) -> TimeRange {
        self.right
    }

    pub fn refresh_token(&self) -> RefreshToken {
        self.refresh_token
    }

    pub fn max_nodes(&self) -> u32 {
        self.max_nodes
    }

    /// Replace the left window. Both bounds move together.
    pub fn set_left(&mut self, from: Timestamp, until: Timestamp) -> bool {
        replace(&mut self.left, TimeRange::new(from, until))
    }

    /// Replace the right window. Both bounds move together.
    pub fn set_right(&mut self, from: Timestamp, until: Timestamp) -> bool {
        replace(&mut self.right, TimeRange::new(from, until))
    }

    pub fn set_side(&mut self, side: Side, from: Timestamp, until: Timestamp) -> bool {
        match side {
            Side::Left => self.set_left(from, until),
            Side::Right => self.set_right(from, until),
        }
    }

    /// Both windows to the same bounds (combined timeline drag).
    pub fn set_both(&mut self, from: Timestamp, until: Timestamp) -> bool {
        let l = self.set_left(from, until);
        let r = self.set_right(from, until);
        l || r
    }

    /// Force a re-fetch without touching any range.
    pub fn bump_refresh_token(&mut self) -> RefreshToken {
        self.refresh_token = self.refresh_token.next();
        self.refresh_token
    }

    pub fn set_max_nodes(&mut self, max_nodes: u32) -> bool {
        replace(&mut self.max_nodes, max_nodes)
    }
}

// ============================================================================
// QueryStore
// ============================================================================

/// Which query fields a mutation touched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryChange {
    pub left: bool,
    pub right: bool,
}

impl QueryChange {
    pub fn any(&self) -> bool {
        self.left || self.right
    }

    pub fn for_side(side: Side, changed: bool) -> Self {
        match side {
            Side::Left => Self { left: changed, right: false },
            Side::Right => Self { left: false, right: changed },
        }
    }

    pub fn sides(&self) -> impl Iterator<Item = Side> + '_ {
        Side::BOTH.into_iter().filter(|s| match s {
            Side::Left => self.left,
            Side::Right => self.right,
        })
    }
}

/// Baseline (left) and comparison (right) queries, plus the main query the
/// single-profile views share.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryStore {
    query: String,
    left: String,
    right: String,
}

impl QueryStore {
    /// Empty sides are populated from `query`.
    pub fn new(
        query: impl Into<String>,
        left: impl Into<String>,
        right: impl Into<String>,
    ) -> Self {
        let mut store = Self {
            query: query.into(),
            left: left.into(),
            right: right.into(),
        };
        store.populate_from_main();
        store
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn left_query(&self) -> &str {
        &self.left
    }

    pub fn right_query(&self) -> &str {
        &self.right
    }

    pub fn side_query(&self, side: Side) -> &str {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    pub fn set_left_query(&mut self, q: impl Into<String>) -> bool {
        replace(&mut self.left, q.into())
    }

    pub fn set_right_query(&mut self, q: impl Into<String>) -> bool {
        replace(&mut self.right, q.into())
    }

    pub fn set_side_query(&mut self, side: Side, q: impl Into<String>) -> bool {
        match side {
            Side::Left => self.set_left_query(q),
            Side::Right => self.set_right_query(q),
        }
    }

    /// Collapse the comparison back to one expression on both sides.
    pub fn set_query(&mut self, q: impl Into<String>) -> QueryChange {
        let q = q.into();
        self.query.clone_from(&q);
        QueryChange {
            left: self.set_left_query(q.clone()),
            right: self.set_right_query(q),
        }
    }

    /// Set only the main query, then fill any empty side from it.
    pub fn set_main_query(&mut self, q: impl Into<String>) -> QueryChange {
        self.query = q.into();
        self.populate_from_main()
    }

    /// Empty sides take the main query. Non-empty sides are left alone.
    pub fn populate_from_main(&mut self) -> QueryChange {
        if self.query.is_empty() {
            return QueryChange::default();
        }
        let mut change = QueryChange::default();
        if self.left.is_empty() {
            self.left.clone_from(&self.query);
            change.left = true;
        }
        if self.right.is_empty() {
            self.right.clone_from(&self.query);
            change.right = true;
        }
        change
    }
}

/// Build the watched tuple from the current store contents.
pub fn capture(ranges: &TimeRangeStore, queries: &QueryStore) -> FetchInputSnapshot {
    FetchInputSnapshot::new(
        queries.left_query(),
        ranges.left(),
        queries.right_query(),
        ranges.right(),
        ranges.refresh_token(),
        ranges.max_nodes(),
    )
}

fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        false
    } else {
        *slot = value;
        true
    }
}

// ============================================================================
// Tests
// ============================================================================
