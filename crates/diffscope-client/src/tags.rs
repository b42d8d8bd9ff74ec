//! Per-side tag resolution.
//!
//! Each side keeps the tag set for its current query. When a side's query
//! changes, [`TagResolver::query_changed`] hands back a [`TagLookup`] for the
//! caller to run; results for a query that is no longer current are dropped.
//! This runs beside the diff fetch and never cancels or gates it.

use diffscope_types::{Side, TagSet};
use tracing::trace;

/// A tag-set lookup the caller must run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagLookup {
    pub side: Side,
    pub generation: u64,
    pub query: String,
}

#[derive(Debug, Default)]
struct SideTags {
    query: String,
    generation: u64,
    tags: TagSet,
}

#[derive(Debug, Default)]
pub struct TagResolver {
    left: SideTags,
    right: SideTags,
}

impl TagResolver {
    pub fn new() -> Self {
        Self::default()
    }

    fn side_mut(&mut self, side: Side) -> &mut SideTags {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }

    fn side(&self, side: Side) -> &SideTags {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    /// Record `side`'s query. Returns a lookup when the query is new and
    /// non-empty. A new query clears the side's tags until its lookup lands.
    pub fn query_changed(&mut self, side: Side, query: &str) -> Option<TagLookup> {
        let entry = self.side_mut(side);
        if entry.query == query && entry.generation > 0 {
            return None;
        }
        entry.query = query.to_string();
        entry.generation += 1;
        entry.tags = TagSet::new();

        if query.is_empty() {
            return None;
        }
        Some(TagLookup {
            side,
            generation: entry.generation,
            query: entry.query.clone(),
        })
    }

    /// Store a lookup result. Returns false if the side has moved on.
    pub fn complete(&mut self, lookup: &TagLookup, tags: TagSet) -> bool {
        let entry = self.side_mut(lookup.side);
        if entry.generation != lookup.generation {
            trace!(side = %lookup.side, query = %lookup.query, "Dropping stale tag set");
            return false;
        }
        entry.tags = tags;
        true
    }

    /// Whether `lookup` still matches its side's current query.
    pub fn is_current(&self, lookup: &TagLookup) -> bool {
        self.side(lookup.side).generation == lookup.generation
    }

    pub fn tags(&self, side: Side) -> &TagSet {
        &self.side(side).tags
    }
}

// ============================================================================
// Tests
// ============================================================================
