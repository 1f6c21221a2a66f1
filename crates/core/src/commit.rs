//! Commit history model.
//!
//! A [`Commit`] is an immutable record of one history node as reported by
//! the server. Identity and equality hinge on the commit id string, never
//! on object identity. The [`Commitish`] variant distinguishes a resolved
//! commit from the sentinel "no history" id.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// The all-zero commit id: the sentinel for "no parent / empty history".
pub const NULL_ID: &str = "0000000000000000000000000000000000000000";

/// Check whether a string is a well-formed commit id (40 hex characters).
pub fn is_valid_commit_id(s: &str) -> bool {
    s.len() == 40 && hex::decode(s).is_ok()
}

// ---------------------------------------------------------------------------
// Commit
// ---------------------------------------------------------------------------

/// An immutable commit record.
///
/// Constructed only by parsing a server log response; never mutated
/// afterwards. `parent_ids` always has at least one entry: a root commit
/// carries the single sentinel parent [`NULL_ID`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Commit {
    pub id: String,
    pub tree_id: String,
    pub parent_ids: Vec<String>,
    pub message: String,
    pub author_name: String,
    pub author_date: DateTime<Utc>,
    pub committer_name: String,
    pub committer_date: DateTime<Utc>,
    pub added: u64,
    pub removed: u64,
    pub modified: u64,
}

// Equality and hashing are by commit id only: two Commit values with the
// same id denote the same immutable history node.
impl PartialEq for Commit {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Commit {}

impl std::hash::Hash for Commit {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Commit {
    /// Whether this commit is a root commit (its only parent is the
    /// sentinel id).
    pub fn is_root(&self) -> bool {
        self.parent_ids.iter().all(|p| p == NULL_ID)
    }

    /// A one-line human-readable description: message plus commit time.
    pub fn summary(&self) -> String {
        format!(
            "{} ({})",
            self.message,
            self.committer_date.format("%m/%d/%y %H:%M")
        )
    }

    /// Relative rendering of the author date, e.g. "3 days ago".
    pub fn author_pretty_date(&self) -> String {
        relative_date(self.author_date)
    }

    /// Relative rendering of the committer date, e.g. "3 days ago".
    pub fn committer_pretty_date(&self) -> String {
        relative_date(self.committer_date)
    }
}

impl std::fmt::Display for Commit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "id {}", self.id)?;
        writeln!(f, "parents {:?}", self.parent_ids)?;
        writeln!(f, "tree {}", self.tree_id)?;
        writeln!(f, "author {} {}", self.author_name, self.author_date)?;
        writeln!(f, "message {}", self.message)
    }
}

// ---------------------------------------------------------------------------
// Commitish
// ---------------------------------------------------------------------------

/// A handle to a point in history: either a resolved commit or the
/// sentinel "no history" id.
///
/// The sentinel has no metadata and an empty parent list; it never
/// corresponds to a server-side commit.
#[derive(Debug, Clone, PartialEq)]
pub enum Commitish {
    Sentinel,
    Resolved(Commit),
}

impl Commitish {
    /// The commit id this handle points at ([`NULL_ID`] for the sentinel).
    pub fn id(&self) -> &str {
        match self {
            Commitish::Sentinel => NULL_ID,
            Commitish::Resolved(c) => &c.id,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        matches!(self, Commitish::Sentinel)
    }

    /// The resolved commit, if any.
    pub fn commit(&self) -> Option<&Commit> {
        match self {
            Commitish::Sentinel => None,
            Commitish::Resolved(c) => Some(c),
        }
    }

    /// Parent ids of the underlying commit; empty for the sentinel.
    pub fn parent_ids(&self) -> &[String] {
        match self {
            Commitish::Sentinel => &[],
            Commitish::Resolved(c) => &c.parent_ids,
        }
    }
}

// ---------------------------------------------------------------------------
// Relative dates
// ---------------------------------------------------------------------------

/// Render a timestamp relative to now, e.g. "4 hours ago".
pub fn relative_date(then: DateTime<Utc>) -> String {
    relative_date_from(then, Utc::now())
}

fn relative_date_from(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let delta = now.signed_duration_since(then);
    if delta < Duration::zero() {
        return "in the future".to_string();
    }
    let secs = delta.num_seconds();
    let (amount, unit) = if secs < 60 {
        (secs, "second")
    } else if secs < 3600 {
        (secs / 60, "minute")
    } else if secs < 86_400 {
        (secs / 3600, "hour")
    } else if secs < 7 * 86_400 {
        (secs / 86_400, "day")
    } else if secs < 30 * 86_400 {
        (secs / (7 * 86_400), "week")
    } else if secs < 365 * 86_400 {
        (secs / (30 * 86_400), "month")
    } else {
        (secs / (365 * 86_400), "year")
    };
    if amount == 1 {
        format!("1 {} ago", unit)
    } else {
        format!("{} {}s ago", amount, unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn commit(id: &str, parents: Vec<&str>) -> Commit {
        Commit {
            id: id.to_string(),
            tree_id: "b".repeat(40),
            parent_ids: parents.into_iter().map(String::from).collect(),
            message: "a commit".to_string(),
            author_name: "alice".to_string(),
            author_date: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
            committer_name: "alice".to_string(),
            committer_date: Utc.with_ymd_and_hms(2025, 6, 1, 12, 30, 0).unwrap(),
            added: 1,
            removed: 0,
            modified: 2,
        }
    }

    #[test]
    fn test_null_id_shape() {
        assert_eq!(NULL_ID.len(), 40);
        assert!(NULL_ID.chars().all(|c| c == '0'));
        assert!(is_valid_commit_id(NULL_ID));
    }

    #[test]
    fn test_commit_id_validation() {
        assert!(is_valid_commit_id(&"a1".repeat(20)));
        assert!(!is_valid_commit_id("a1b2"));
        assert!(!is_valid_commit_id(&"g".repeat(40)));
        assert!(!is_valid_commit_id(""));
    }

    #[test]
    fn test_equality_is_by_id() {
        let a = commit(&"a".repeat(40), vec![NULL_ID]);
        let mut b = commit(&"a".repeat(40), vec![NULL_ID]);
        b.message = "different message".to_string();
        assert_eq!(a, b);

        let c = commit(&"c".repeat(40), vec![NULL_ID]);
        assert_ne!(a, c);
    }

    #[test]
    fn test_is_root() {
        let root = commit(&"a".repeat(40), vec![NULL_ID]);
        assert!(root.is_root());

        let child = commit(&"b".repeat(40), vec![&"a".repeat(40)]);
        assert!(!child.is_root());
    }

    #[test]
    fn test_sentinel_commitish() {
        let s = Commitish::Sentinel;
        assert_eq!(s.id(), NULL_ID);
        assert!(s.is_sentinel());
        assert!(s.commit().is_none());
        assert!(s.parent_ids().is_empty());
    }

    #[test]
    fn test_resolved_commitish() {
        let c = commit(&"a".repeat(40), vec![NULL_ID]);
        let r = Commitish::Resolved(c.clone());
        assert_eq!(r.id(), c.id);
        assert!(!r.is_sentinel());
        assert_eq!(r.parent_ids(), &[NULL_ID.to_string()][..]);
    }

    #[test]
    fn test_summary_includes_message_and_date() {
        let c = commit(&"a".repeat(40), vec![NULL_ID]);
        let s = c.summary();
        assert!(s.starts_with("a commit ("));
        assert!(s.contains("06/01/25 12:30"));
    }

    #[test]
    fn test_relative_date_units() {
        let now = Utc.with_ymd_and_hms(2025, 6, 10, 12, 0, 0).unwrap();
        let cases = [
            (now - Duration::seconds(30), "30 seconds ago"),
            (now - Duration::minutes(1), "1 minute ago"),
            (now - Duration::minutes(5), "5 minutes ago"),
            (now - Duration::hours(4), "4 hours ago"),
            (now - Duration::days(3), "3 days ago"),
            (now - Duration::days(14), "2 weeks ago"),
            (now - Duration::days(90), "3 months ago"),
            (now - Duration::days(800), "2 years ago"),
        ];
        for (then, expected) in cases {
            assert_eq!(relative_date_from(then, now), expected);
        }
    }

    #[test]
    fn test_relative_date_future() {
        let now = Utc.with_ymd_and_hms(2025, 6, 10, 12, 0, 0).unwrap();
        let then = now + Duration::hours(1);
        assert_eq!(relative_date_from(then, now), "in the future");
    }
}
