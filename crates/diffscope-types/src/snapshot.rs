//! The watched fetch-input tuple and what gets sent on the wire.
//!
//! [`FetchInputSnapshot`] is the equality key the orchestrator watches: two
//! snapshots are the same iff all eight fields are the same. It is a plain
//! value, built fresh from the stores after every mutation and compared with
//! the last one observed.

use serde::{Deserialize, Serialize};

use crate::range::{RefreshToken, TimeRange, Timestamp};

/// Identity of one issued diff fetch. Strictly increasing per view.
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FetchGeneration(pub u64);

impl FetchGeneration {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl std::fmt::Display for FetchGeneration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// `(leftQuery, leftFrom, leftUntil, rightQuery, rightFrom, rightUntil,
/// refreshToken, maxNodes)`.
#[derive(Clone, Debug, Default, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchInputSnapshot {
    pub left_query: String,
    pub left_from: Timestamp,
    pub left_until: Timestamp,
    pub right_query: String,
    pub right_from: Timestamp,
    pub right_until: Timestamp,
    pub refresh_token: RefreshToken,
    pub max_nodes: u32,
}

impl FetchInputSnapshot {
    pub fn new(
        left_query: impl Into<String>,
        left: TimeRange,
        right_query: impl Into<String>,
        right: TimeRange,
        refresh_token: RefreshToken,
        max_nodes: u32,
    ) -> Self {
        Self {
            left_query: left_query.into(),
            left_from: left.from,
            left_until: left.until,
            right_query: right_query.into(),
            right_from: right.from,
            right_until: right.until,
            refresh_token,
            max_nodes,
        }
    }

    /// A diff needs something on both sides. Ranges are not checked.
    pub fn is_fetchable(&self) -> bool {
        !self.left_query.is_empty() && !self.right_query.is_empty()
    }

    /// The backend request for this snapshot. The refresh token is not sent;
    /// it only exists to make an otherwise identical snapshot compare unequal.
    pub fn to_request(&self) -> FetchRequest {
        FetchRequest {
            left_query: self.left_query.clone(),
            left_from: self.left_from,
            left_until: self.left_until,
            right_query: self.right_query.clone(),
            right_from: self.right_from,
            right_until: self.right_until,
            max_nodes: self.max_nodes,
        }
    }
}

/// `{leftQuery, leftFrom, leftUntil, rightQuery, rightFrom, rightUntil, maxNodes}`.
#[derive(Clone, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchRequest {
    pub left_query: String,
    pub left_from: Timestamp,
    pub left_until: Timestamp,
    pub right_query: String,
    pub right_from: Timestamp,
    pub right_until: Timestamp,
    pub max_nodes: u32,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn base() -> FetchInputSnapshot {
        FetchInputSnapshot::new(
            "svc{}",
            TimeRange::new(100, 200),
            "svc{}",
            TimeRange::new(300, 400),
            RefreshToken(0),
            1024,
        )
    }

    #[test]
    fn test_equal_when_all_fields_equal() {
        assert_eq!(base(), base());
    }

    #[test]
    fn test_every_field_participates_in_equality() {
        let b = base();
        let variants = [
            FetchInputSnapshot { left_query: "other{}".into(), ..b.clone() },
            FetchInputSnapshot { left_from: 101, ..b.clone() },
            FetchInputSnapshot { left_until: 201, ..b.clone() },
            FetchInputSnapshot { right_query: "other{}".into(), ..b.clone() },
            FetchInputSnapshot { right_from: 301, ..b.clone() },
            FetchInputSnapshot { right_until: 401, ..b.clone() },
            FetchInputSnapshot { refresh_token: RefreshToken(1), ..b.clone() },
            FetchInputSnapshot { max_nodes: 2048, ..b.clone() },
        ];
        for v in variants {
            assert_ne!(v, b);
        }
    }

    #[test]
    fn test_fetchable_requires_both_queries() {
        assert!(base().is_fetchable());
        assert!(!FetchInputSnapshot { left_query: String::new(), ..base() }.is_fetchable());
        assert!(!FetchInputSnapshot { right_query: String::new(), ..base() }.is_fetchable());
    }

    #[test]
    fn test_inverted_range_is_still_fetchable() {
        let s = FetchInputSnapshot { left_from: 500, left_until: 100, ..base() };
        assert!(s.is_fetchable());
        assert_eq!(s.to_request().left_from, 500);
    }

    #[test]
    fn test_request_drops_refresh_token() {
        let a = base().to_request();
        let b = FetchInputSnapshot { refresh_token: RefreshToken(9), ..base() }.to_request();
        assert_eq!(a, b);
        assert_eq!(a.left_from, 100);
        assert_eq!(a.right_until, 400);
        assert_eq!(a.max_nodes, 1024);
    }

    #[test]
    fn test_request_wire_names() {
        let json = serde_json::to_value(base().to_request()).unwrap();
        assert_eq!(json["leftQuery"], "svc{}");
        assert_eq!(json["rightFrom"], 300);
        assert_eq!(json["maxNodes"], 1024);
    }

    #[test]
    fn test_generation_ordering() {
        let g = FetchGeneration::default();
        assert!(g.next() > g);
        assert_eq!(g.next().to_string(), "#1");
    }
}
