//! Diff and conflict value objects.
//!
//! These types describe per-feature differences between two revisions and
//! per-feature merge conflicts raised by an import. They are plain data:
//! the server computes them, the client only carries them to callers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Feature data
// ---------------------------------------------------------------------------

/// A feature materialized as a flat attribute → value mapping.
///
/// Geometry travels as a WKT string attribute alongside the others.
pub type FeatureData = BTreeMap<String, serde_json::Value>;

// ---------------------------------------------------------------------------
// Change kind
// ---------------------------------------------------------------------------

/// The kind of change a diff entry describes.
///
/// Directional: swapping the two revisions of a diff flips `Added` and
/// `Removed` and swaps the old/new roles of `Modified` entries.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Removed,
    Modified,
}

impl ChangeKind {
    /// Parse a server-side kind string; `None` for anything unrecognized.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "added" => Some(Self::Added),
            "removed" => Some(Self::Removed),
            "modified" => Some(Self::Modified),
            _ => None,
        }
    }
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Added => write!(f, "added"),
            Self::Removed => write!(f, "removed"),
            Self::Modified => write!(f, "modified"),
        }
    }
}

// ---------------------------------------------------------------------------
// Diff entries
// ---------------------------------------------------------------------------

/// One feature-level difference between two revisions.
///
/// Entries keep the server's order (newest-affecting-commit first); the
/// client never re-sorts them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiffEntry {
    /// Tree-relative feature identifier, e.g. `points/fid-12ab`.
    pub path: String,
    pub kind: ChangeKind,
    /// Attribute-by-attribute payload, present when the diff was computed
    /// with a path restriction.
    pub feature_diff: Option<FeatureDiff>,
}

/// Attribute-level detail of a single feature's change.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FeatureDiff {
    pub attributes: Vec<AttributeDiff>,
    pub geometry: Option<GeometryDiff>,
}

/// Old/new values of one attribute.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AttributeDiff {
    pub name: String,
    pub old: Option<serde_json::Value>,
    pub new: Option<serde_json::Value>,
}

impl AttributeDiff {
    /// Classify this attribute change by which side carries a value.
    pub fn kind(&self) -> ChangeKind {
        match (&self.old, &self.new) {
            (None, _) => ChangeKind::Added,
            (_, None) => ChangeKind::Removed,
            _ => ChangeKind::Modified,
        }
    }
}

/// Geometry change expressed as WKT on both sides.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeometryDiff {
    pub old_wkt: Option<String>,
    pub new_wkt: Option<String>,
}

// ---------------------------------------------------------------------------
// Conflicts
// ---------------------------------------------------------------------------

/// A per-feature merge conflict raised by an import.
///
/// Three-way shape: `origin` names the common-ancestor feature state the
/// working copy was checked out from, `local` is the importing copy's
/// state (`None` when the feature was deleted locally), and the remote
/// side is whatever the target branch tip currently holds. Conflicts are
/// reported, never auto-resolved; the feature is not updated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Conflict {
    /// Unique conflict id, for UI bookkeeping.
    pub id: String,
    /// Tree-relative feature path.
    pub path: String,
    /// Object id of the common-ancestor feature state.
    pub origin: String,
    /// The importing copy's feature state; `None` = locally deleted.
    pub local: Option<FeatureData>,
}

impl Conflict {
    /// Create a new conflict with a fresh UUID.
    pub fn new(path: impl Into<String>, origin: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            path: path.into(),
            origin: origin.into(),
            local: None,
        }
    }

    /// Whether the losing side of this conflict is a local deletion
    /// (the delete-vs-modify shape).
    pub fn is_local_delete(&self) -> bool {
        self.local.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_change_kind_roundtrip() {
        for kind in [ChangeKind::Added, ChangeKind::Removed, ChangeKind::Modified] {
            assert_eq!(ChangeKind::parse(&kind.to_string()), Some(kind));
        }
        assert_eq!(ChangeKind::parse("renamed"), None);
        assert_eq!(ChangeKind::parse(""), None);
    }

    #[test]
    fn test_attribute_diff_kind() {
        let added = AttributeDiff {
            name: "n".into(),
            old: None,
            new: Some(json!(1)),
        };
        assert_eq!(added.kind(), ChangeKind::Added);

        let removed = AttributeDiff {
            name: "n".into(),
            old: Some(json!(1)),
            new: None,
        };
        assert_eq!(removed.kind(), ChangeKind::Removed);

        let modified = AttributeDiff {
            name: "n".into(),
            old: Some(json!(1)),
            new: Some(json!(2)),
        };
        assert_eq!(modified.kind(), ChangeKind::Modified);
    }

    #[test]
    fn test_conflict_local_delete_shape() {
        let origin = "74c26fa429b847bc7559f4105975bc2d7b2ef80c";
        let conflict = Conflict::new("points/fid-1", origin);
        assert!(conflict.is_local_delete());
        assert_eq!(conflict.origin, origin);

        let mut edited = Conflict::new("points/fid-1", origin);
        edited.local = Some(FeatureData::from([("n".to_string(), json!(1001))]));
        assert!(!edited.is_local_delete());
    }

    #[test]
    fn test_conflict_ids_are_unique() {
        let a = Conflict::new("points/fid-1", "o");
        let b = Conflict::new("points/fid-1", "o");
        assert_ne!(a.id, b.id);
    }
}
