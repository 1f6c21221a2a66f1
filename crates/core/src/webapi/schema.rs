//! Wire schema for web API responses.
//!
//! Every response body deserializes into an explicit record type here and
//! is then converted into a domain type through a validating `TryFrom`.
//! Any shape mismatch (malformed ids, unknown change kinds, out-of-range
//! timestamps) fails fast with [`RepoError::Protocol`] instead of leaking
//! half-parsed values into the model.

use std::collections::BTreeMap;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::commit::{is_valid_commit_id, Commit, NULL_ID};
use crate::diff::{
    AttributeDiff, ChangeKind, Conflict, DiffEntry, FeatureData, FeatureDiff, GeometryDiff,
};
use crate::errors::RepoError;
use crate::workingcopy::{ImportResult, WorkingCopy};

// ---------------------------------------------------------------------------
// Log / commits
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct LogResponse {
    #[serde(default)]
    pub commits: Vec<CommitRecord>,
}

/// Raw commit record as the server reports it.
#[derive(Debug, Clone, Deserialize)]
pub struct CommitRecord {
    pub id: String,
    pub tree: String,
    #[serde(default)]
    pub parents: Vec<String>,
    #[serde(default)]
    pub message: String,
    pub author: ActorRecord,
    pub committer: ActorRecord,
    #[serde(default)]
    pub added: u64,
    #[serde(default)]
    pub removed: u64,
    #[serde(default)]
    pub modified: u64,
}

/// Author/committer identity with an epoch-millisecond timestamp.
#[derive(Debug, Clone, Deserialize)]
pub struct ActorRecord {
    #[serde(default)]
    pub name: String,
    pub timestamp: i64,
}

impl TryFrom<CommitRecord> for Commit {
    type Error = RepoError;

    fn try_from(record: CommitRecord) -> Result<Self, Self::Error> {
        if !is_valid_commit_id(&record.id) {
            return Err(RepoError::Protocol(format!(
                "malformed commit id '{}'",
                record.id
            )));
        }
        if !is_valid_commit_id(&record.tree) {
            return Err(RepoError::Protocol(format!(
                "malformed tree id '{}' in commit {}",
                record.tree, record.id
            )));
        }
        // A server log entry with no parents denotes a root commit; the
        // domain invariant is a single sentinel parent.
        let parent_ids = if record.parents.is_empty() {
            vec![NULL_ID.to_string()]
        } else {
            for p in &record.parents {
                if !is_valid_commit_id(p) {
                    return Err(RepoError::Protocol(format!(
                        "malformed parent id '{}' in commit {}",
                        p, record.id
                    )));
                }
            }
            record.parents
        };
        let author_date = timestamp_millis(record.author.timestamp, &record.id)?;
        let committer_date = timestamp_millis(record.committer.timestamp, &record.id)?;
        Ok(Commit {
            id: record.id,
            tree_id: record.tree,
            parent_ids,
            message: record.message,
            author_name: record.author.name,
            author_date,
            committer_name: record.committer.name,
            committer_date,
            added: record.added,
            removed: record.removed,
            modified: record.modified,
        })
    }
}

fn timestamp_millis(millis: i64, commit_id: &str) -> Result<DateTime<Utc>, RepoError> {
    Utc.timestamp_millis_opt(millis).single().ok_or_else(|| {
        RepoError::Protocol(format!(
            "timestamp {} out of range in commit {}",
            millis, commit_id
        ))
    })
}

// ---------------------------------------------------------------------------
// Refs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct RefparseResponse {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefRecord {
    pub name: String,
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BranchesResponse {
    #[serde(default)]
    pub branches: Vec<RefRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TagsResponse {
    #[serde(default)]
    pub tags: Vec<RefRecord>,
}

/// Validate a ref listing into a name → commit id table.
pub fn refs_to_map(refs: Vec<RefRecord>) -> Result<BTreeMap<String, String>, RepoError> {
    let mut map = BTreeMap::new();
    for r in refs {
        if r.name.is_empty() {
            return Err(RepoError::Protocol("ref record with empty name".into()));
        }
        if !is_valid_commit_id(&r.id) {
            return Err(RepoError::Protocol(format!(
                "malformed commit id '{}' for ref '{}'",
                r.id, r.name
            )));
        }
        map.insert(r.name, r.id);
    }
    Ok(map)
}

// ---------------------------------------------------------------------------
// Trees / features / blame
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct TreesResponse {
    #[serde(default)]
    pub trees: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeatureResponse {
    pub feature: FeatureData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlameResponse {
    #[serde(default)]
    pub attributions: BTreeMap<String, String>,
}

impl BlameResponse {
    /// Validate the attributing commit ids.
    pub fn into_map(self) -> Result<BTreeMap<String, String>, RepoError> {
        for (path, id) in &self.attributions {
            if !is_valid_commit_id(id) {
                return Err(RepoError::Protocol(format!(
                    "malformed commit id '{}' in blame of '{}'",
                    id, path
                )));
            }
        }
        Ok(self.attributions)
    }
}

// ---------------------------------------------------------------------------
// Diff
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct DiffResponse {
    #[serde(default)]
    pub entries: Vec<DiffRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiffRecord {
    pub path: String,
    pub change: String,
    #[serde(default)]
    pub feature_diff: Option<FeatureDiffRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeatureDiffRecord {
    #[serde(default)]
    pub attributes: Vec<AttributeDiffRecord>,
    #[serde(default)]
    pub geometry: Option<GeometryDiffRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AttributeDiffRecord {
    pub name: String,
    #[serde(default)]
    pub old: Option<serde_json::Value>,
    #[serde(default)]
    pub new: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeometryDiffRecord {
    #[serde(default)]
    pub old: Option<String>,
    #[serde(default)]
    pub new: Option<String>,
}

impl TryFrom<DiffRecord> for DiffEntry {
    type Error = RepoError;

    fn try_from(record: DiffRecord) -> Result<Self, Self::Error> {
        if record.path.is_empty() {
            return Err(RepoError::Protocol("diff entry with empty path".into()));
        }
        let kind = ChangeKind::parse(&record.change).ok_or_else(|| {
            RepoError::Protocol(format!(
                "unknown change kind '{}' for '{}'",
                record.change, record.path
            ))
        })?;
        let feature_diff = record.feature_diff.map(|fd| FeatureDiff {
            attributes: fd
                .attributes
                .into_iter()
                .map(|a| AttributeDiff {
                    name: a.name,
                    old: a.old,
                    new: a.new,
                })
                .collect(),
            geometry: fd.geometry.map(|g| GeometryDiff {
                old_wkt: g.old,
                new_wkt: g.new,
            }),
        });
        Ok(DiffEntry {
            path: record.path,
            kind,
            feature_diff,
        })
    }
}

// ---------------------------------------------------------------------------
// Import
// ---------------------------------------------------------------------------

/// POST body for an import.
#[derive(Debug, Clone, Serialize)]
pub struct ImportRequest<'a> {
    pub branch: &'a str,
    pub message: &'a str,
    pub author_name: &'a str,
    pub author_email: &'a str,
    pub update: bool,
    #[serde(flatten)]
    pub working_copy: &'a WorkingCopy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImportResponse {
    #[serde(default)]
    pub commit: Option<String>,
    #[serde(default)]
    pub imported: u64,
    #[serde(default)]
    pub added: u64,
    #[serde(default)]
    pub removed: u64,
    #[serde(default)]
    pub modified: u64,
    #[serde(default)]
    pub conflicts: Vec<ConflictRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConflictRecord {
    pub path: String,
    pub origin: String,
    #[serde(default)]
    pub local: Option<FeatureData>,
}

impl TryFrom<ConflictRecord> for Conflict {
    type Error = RepoError;

    fn try_from(record: ConflictRecord) -> Result<Self, Self::Error> {
        if record.path.is_empty() {
            return Err(RepoError::Protocol("conflict record with empty path".into()));
        }
        if !is_valid_commit_id(&record.origin) {
            return Err(RepoError::Protocol(format!(
                "malformed origin id '{}' in conflict on '{}'",
                record.origin, record.path
            )));
        }
        let mut conflict = Conflict::new(record.path, record.origin);
        conflict.local = record.local;
        Ok(conflict)
    }
}

impl TryFrom<ImportResponse> for ImportResult {
    type Error = RepoError;

    fn try_from(response: ImportResponse) -> Result<Self, Self::Error> {
        if let Some(id) = &response.commit {
            if !is_valid_commit_id(id) {
                return Err(RepoError::Protocol(format!(
                    "malformed commit id '{}' in import response",
                    id
                )));
            }
        }
        let conflicts = response
            .conflicts
            .into_iter()
            .map(Conflict::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ImportResult {
            commit_id: response.commit,
            imported: response.imported,
            conflicts,
            added: response.added,
            removed: response.removed,
            modified: response.modified,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn commit_record(id: &str) -> CommitRecord {
        serde_json::from_value(json!({
            "id": id,
            "tree": "b".repeat(40),
            "parents": ["c".repeat(40)],
            "message": "third",
            "author": { "name": "alice", "timestamp": 1_700_000_000_000i64 },
            "committer": { "name": "alice", "timestamp": 1_700_000_000_000i64 },
            "added": 1,
            "removed": 0,
            "modified": 2
        }))
        .unwrap()
    }

    #[test]
    fn test_commit_record_converts() {
        let commit = Commit::try_from(commit_record(&"a".repeat(40))).unwrap();
        assert_eq!(commit.id, "a".repeat(40));
        assert_eq!(commit.parent_ids, vec!["c".repeat(40)]);
        assert_eq!(commit.message, "third");
        assert_eq!(commit.added, 1);
        assert_eq!(commit.author_date.timestamp_millis(), 1_700_000_000_000);
    }

    #[test]
    fn test_commit_record_rejects_bad_id() {
        let err = Commit::try_from(commit_record("not-an-id")).unwrap_err();
        assert!(matches!(err, RepoError::Protocol(_)));
    }

    #[test]
    fn test_commit_record_rejects_bad_parent() {
        let record: CommitRecord = serde_json::from_value(json!({
            "id": "a".repeat(40),
            "tree": "b".repeat(40),
            "parents": ["zz"],
            "author": { "name": "alice", "timestamp": 0 },
            "committer": { "name": "alice", "timestamp": 0 }
        }))
        .unwrap();
        let err = Commit::try_from(record).unwrap_err();
        assert!(matches!(err, RepoError::Protocol(_)));
    }

    #[test]
    fn test_commit_record_empty_parents_become_sentinel() {
        let record: CommitRecord = serde_json::from_value(json!({
            "id": "a".repeat(40),
            "tree": "b".repeat(40),
            "author": { "name": "alice", "timestamp": 0 },
            "committer": { "name": "alice", "timestamp": 0 }
        }))
        .unwrap();
        let commit = Commit::try_from(record).unwrap();
        assert_eq!(commit.parent_ids, vec![NULL_ID.to_string()]);
        assert!(commit.is_root());
    }

    #[test]
    fn test_refs_to_map_validates_ids() {
        let refs = vec![
            RefRecord {
                name: "master".into(),
                id: "a".repeat(40),
            },
            RefRecord {
                name: "mybranch".into(),
                id: "b".repeat(40),
            },
        ];
        let map = refs_to_map(refs).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map["master"], "a".repeat(40));

        let bad = vec![RefRecord {
            name: "master".into(),
            id: "xyz".into(),
        }];
        assert!(matches!(
            refs_to_map(bad),
            Err(RepoError::Protocol(_))
        ));
    }

    #[test]
    fn test_diff_record_converts() {
        let record: DiffRecord = serde_json::from_value(json!({
            "path": "points/fid-1",
            "change": "modified",
            "feature_diff": {
                "attributes": [ { "name": "n", "old": 1, "new": 2 } ],
                "geometry": { "old": "POINT (0 0)", "new": "POINT (1 1)" }
            }
        }))
        .unwrap();
        let entry = DiffEntry::try_from(record).unwrap();
        assert_eq!(entry.kind, ChangeKind::Modified);
        let fd = entry.feature_diff.unwrap();
        assert_eq!(fd.attributes.len(), 1);
        assert_eq!(fd.attributes[0].kind(), ChangeKind::Modified);
        assert_eq!(fd.geometry.unwrap().new_wkt.as_deref(), Some("POINT (1 1)"));
    }

    #[test]
    fn test_diff_record_rejects_unknown_kind() {
        let record: DiffRecord = serde_json::from_value(json!({
            "path": "points/fid-1",
            "change": "renamed"
        }))
        .unwrap();
        assert!(matches!(
            DiffEntry::try_from(record),
            Err(RepoError::Protocol(_))
        ));
    }

    #[test]
    fn test_import_response_converts() {
        let response: ImportResponse = serde_json::from_value(json!({
            "commit": "a".repeat(40),
            "imported": 2,
            "added": 0,
            "removed": 0,
            "modified": 2,
            "conflicts": [
                { "path": "points/fid-1", "origin": "d".repeat(40), "local": null },
                { "path": "points/fid-2", "origin": "d".repeat(40),
                  "local": { "n": 1001 } }
            ]
        }))
        .unwrap();
        let result = ImportResult::try_from(response).unwrap();
        assert_eq!(result.commit_id, Some("a".repeat(40)));
        assert_eq!(result.conflicts.len(), 2);
        assert!(result.conflicts[0].is_local_delete());
        assert!(!result.conflicts[1].is_local_delete());
    }

    #[test]
    fn test_import_response_rejects_bad_origin() {
        let response: ImportResponse = serde_json::from_value(json!({
            "commit": null,
            "conflicts": [ { "path": "points/fid-1", "origin": "short" } ]
        }))
        .unwrap();
        assert!(matches!(
            ImportResult::try_from(response),
            Err(RepoError::Protocol(_))
        ));
    }

    #[test]
    fn test_import_request_body_shape() {
        let wc = WorkingCopy {
            tree: "points".into(),
            features: vec![],
        };
        let request = ImportRequest {
            branch: "master",
            message: "message",
            author_name: "me",
            author_email: "me@mysite.com",
            update: true,
            working_copy: &wc,
        };
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["branch"], "master");
        assert_eq!(body["update"], true);
        // Flattened working copy fields sit at the top level.
        assert_eq!(body["tree"], "points");
        assert!(body["features"].as_array().unwrap().is_empty());
    }
}
