//! Working-copy model and import results.
//!
//! A working copy is the client-side edit buffer for one feature tree:
//! the features a caller checked out, edited, and wants to turn into a
//! commit. Each feature remembers the commit it originated from so the
//! server can run its three-way merge check on update imports.

use serde::{Deserialize, Serialize};

use crate::diff::{Conflict, FeatureData};

// ---------------------------------------------------------------------------
// Working copy
// ---------------------------------------------------------------------------

/// Local edits to a single feature tree, ready for import.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkingCopy {
    /// The feature tree (layer) these edits belong to.
    pub tree: String,
    pub features: Vec<WorkingFeature>,
}

/// One feature in a working copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkingFeature {
    /// Feature id within the tree; the feature path is `{tree}/{fid}`.
    pub fid: String,
    /// Current local state; `None` marks a local deletion.
    pub data: Option<FeatureData>,
    /// Commit id this feature was checked out from. Required for update
    /// imports (it anchors the server's three-way check); irrelevant when
    /// importing a tree for the first time.
    pub origin: Option<String>,
}

impl WorkingCopy {
    pub fn new(tree: impl Into<String>) -> Self {
        Self {
            tree: tree.into(),
            features: Vec::new(),
        }
    }

    /// Tree-relative path of one of this copy's features.
    pub fn feature_path(&self, fid: &str) -> String {
        format!("{}/{}", self.tree, fid)
    }
}

// ---------------------------------------------------------------------------
// Import result
// ---------------------------------------------------------------------------

/// Outcome of importing a working copy.
///
/// Import is not atomic across unrelated features: non-conflicting
/// features land in the new commit while conflicting paths stay pending.
/// A non-empty `conflicts` list is an expected outcome (the caller
/// re-resolves and retries those paths), not a fault.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportResult {
    /// Id of the commit created, or `None` when nothing could be applied.
    pub commit_id: Option<String>,
    /// Number of features that made it into the new commit.
    pub imported: u64,
    /// Features the server refused to update pending resolution.
    pub conflicts: Vec<Conflict>,
    pub added: u64,
    pub removed: u64,
    pub modified: u64,
}

impl ImportResult {
    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_feature_path() {
        let wc = WorkingCopy::new("points");
        assert_eq!(wc.feature_path("fid-1"), "points/fid-1");
    }

    #[test]
    fn test_working_copy_json_roundtrip() {
        let wc = WorkingCopy {
            tree: "points".to_string(),
            features: vec![
                WorkingFeature {
                    fid: "fid-1".to_string(),
                    data: Some(FeatureData::from([
                        ("n".to_string(), json!(1)),
                        ("geometry".to_string(), json!("POINT (1 2)")),
                    ])),
                    origin: Some("a".repeat(40)),
                },
                WorkingFeature {
                    fid: "fid-2".to_string(),
                    data: None,
                    origin: Some("a".repeat(40)),
                },
            ],
        };
        let text = serde_json::to_string(&wc).unwrap();
        let back: WorkingCopy = serde_json::from_str(&text).unwrap();
        assert_eq!(back.tree, "points");
        assert_eq!(back.features.len(), 2);
        assert!(back.features[1].data.is_none());
    }

    #[test]
    fn test_import_result_conflict_flag() {
        let clean = ImportResult {
            commit_id: Some("a".repeat(40)),
            imported: 3,
            conflicts: Vec::new(),
            added: 1,
            removed: 0,
            modified: 2,
        };
        assert!(!clean.has_conflicts());

        let conflicted = ImportResult {
            conflicts: vec![Conflict::new("points/fid-1", "o")],
            ..clean.clone()
        };
        assert!(conflicted.has_conflicts());
    }
}
