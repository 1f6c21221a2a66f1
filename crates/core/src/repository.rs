//! The orchestrating repository client.
//!
//! A [`Repository`] owns the remote endpoint and the commit cache, and
//! exposes history traversal, branch/tag management, tree listing, diff
//! computation, feature lookup and the import protocol. Every operation
//! issues one blocking remote call; responses are validated into domain
//! value objects before they reach the caller.
//!
//! There is no client-side locking of remote state: two concurrent
//! imports against the same branch are arbitrated entirely by the
//! server's three-way merge check, and a caller must be prepared to
//! receive conflicts caused by a concurrent writer.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::cache::{CacheKey, CommitCache};
use crate::commit::{is_valid_commit_id, Commit, Commitish, NULL_ID};
use crate::diff::{DiffEntry, FeatureData};
use crate::errors::RepoError;
use crate::webapi::schema::{self, ImportRequest};
use crate::webapi::WebApiClient;
use crate::workingcopy::{ImportResult, WorkingCopy};

/// The symbolic ref naming the current branch tip.
pub const HEAD: &str = "HEAD";

/// Client for one remote repository.
#[derive(Debug, Clone)]
pub struct Repository {
    api: WebApiClient,
    cache: Arc<CommitCache>,
}

impl Repository {
    /// Create a repository client with its own default-sized commit cache.
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_cache(WebApiClient::new(url), Arc::new(CommitCache::default()))
    }

    /// Create a repository client around an existing transport and an
    /// injected (possibly shared) commit cache.
    pub fn with_cache(api: WebApiClient, cache: Arc<CommitCache>) -> Self {
        Self { api, cache }
    }

    /// The repository endpoint URL.
    pub fn url(&self) -> &str {
        self.api.base_url()
    }

    /// The commit cache backing this handle.
    pub fn cache(&self) -> &Arc<CommitCache> {
        &self.cache
    }

    // -- History & metadata --------------------------------------------------

    /// List commits reachable from `until` (default `HEAD`), newest first,
    /// optionally restricted to commits touching `path` and truncated to
    /// `limit`. An empty history yields an empty vector, not an error.
    pub async fn log(
        &self,
        until: Option<&str>,
        limit: Option<u32>,
        path: Option<&str>,
    ) -> Result<Vec<Commit>, RepoError> {
        let response = self.api.log(until, limit, path).await?;
        response
            .commits
            .into_iter()
            .map(Commit::try_from)
            .collect()
    }

    /// Resolve any ref form (branch, tag, `HEAD`, relative expression, or
    /// literal id) to a concrete commit id.
    pub async fn revparse(&self, refspec: &str) -> Result<String, RepoError> {
        let response = self.api.refparse(refspec).await?;
        if !is_valid_commit_id(&response.id) {
            return Err(RepoError::Protocol(format!(
                "refparse returned malformed id '{}' for '{}'",
                response.id, refspec
            )));
        }
        Ok(response.id)
    }

    /// Branch name → commit id table. An empty repository still lists the
    /// default branch.
    pub async fn branches(&self) -> Result<BTreeMap<String, String>, RepoError> {
        schema::refs_to_map(self.api.branches().await?.branches)
    }

    /// Tag name → commit id table.
    pub async fn tags(&self) -> Result<BTreeMap<String, String>, RepoError> {
        schema::refs_to_map(self.api.tags().await?.tags)
    }

    /// Feature-tree (layer) names present at `commit` (default `HEAD`).
    pub async fn trees(&self, commit: Option<&str>) -> Result<Vec<String>, RepoError> {
        Ok(self.api.trees(commit).await?.trees)
    }

    /// Last-modifying-commit attribution for the features under `path`.
    pub async fn blame(&self, path: &str) -> Result<BTreeMap<String, String>, RepoError> {
        self.api.blame(path).await?.into_map()
    }

    /// Materialize one feature's attributes and geometry at `refspec`.
    pub async fn feature(&self, path: &str, refspec: &str) -> Result<FeatureData, RepoError> {
        Ok(self.api.feature(path, refspec).await?.feature)
    }

    // -- Resolution ----------------------------------------------------------

    /// Resolve a ref to a [`Commitish`].
    ///
    /// The sentinel [`NULL_ID`] short-circuits to [`Commitish::Sentinel`]
    /// without any network call; it has no server-side commit. Any other
    /// ref is resolved to a concrete id and served from the commit cache,
    /// fetching exactly one log entry on a miss.
    pub async fn resolve(&self, refspec: &str) -> Result<Commitish, RepoError> {
        if refspec == NULL_ID {
            return Ok(Commitish::Sentinel);
        }
        let id = self.revparse(refspec).await?;
        let key: CacheKey = (self.api.base_url().to_string(), id.clone());
        if let Some(cached) = self.cache.get(&key) {
            debug!(id = %id, "commit cache hit");
            return Ok(Commitish::Resolved((*cached).clone()));
        }
        let log = self.log(Some(&id), Some(1), None).await?;
        let commit = match log.into_iter().next() {
            Some(commit) if commit.id == id => commit,
            Some(commit) => {
                return Err(RepoError::Protocol(format!(
                    "log(until={}, limit=1) returned commit {}",
                    id, commit.id
                )))
            }
            None => {
                return Err(RepoError::Protocol(format!(
                    "log(until={}, limit=1) returned no entry",
                    id
                )))
            }
        };
        self.cache.put(key, Arc::new(commit.clone()));
        Ok(Commitish::Resolved(commit))
    }

    /// Resolve every parent of `commit`. A merge commit yields two or
    /// more entries; a root commit yields the single sentinel.
    pub async fn parents(&self, commit: &Commit) -> Result<Vec<Commitish>, RepoError> {
        let mut parents = Vec::with_capacity(commit.parent_ids.len());
        for id in &commit.parent_ids {
            parents.push(self.resolve(id).await?);
        }
        Ok(parents)
    }

    /// First-parent sugar for linear traversal.
    ///
    /// Undefined for merge commits: callers walking real history must use
    /// [`parents`](Self::parents).
    pub async fn first_parent(&self, commit: &Commit) -> Result<Commitish, RepoError> {
        let first = commit.parent_ids.first().ok_or_else(|| {
            RepoError::Protocol(format!("commit {} has no parent entries", commit.id))
        })?;
        self.resolve(first).await
    }

    // -- Diff ----------------------------------------------------------------

    /// Every feature that differs between two revisions, in server order.
    ///
    /// Directional: swapping `from` and `to` yields the same path set with
    /// added/removed kinds flipped and modified roles swapped.
    pub async fn diff(
        &self,
        from: &str,
        to: &str,
        path: Option<&str>,
    ) -> Result<Vec<DiffEntry>, RepoError> {
        let response = self.api.diff(from, to, path).await?;
        response
            .entries
            .into_iter()
            .map(DiffEntry::try_from)
            .collect()
    }

    /// Changes introduced by `commit` relative to its first parent.
    ///
    /// First-parent only; for merge commits the result is not a full
    /// merge diff.
    pub async fn changes_in(
        &self,
        commit: &Commit,
        path: Option<&str>,
    ) -> Result<Vec<DiffEntry>, RepoError> {
        let parent = commit.parent_ids.first().ok_or_else(|| {
            RepoError::Protocol(format!("commit {} has no parent entries", commit.id))
        })?;
        self.diff(parent, &commit.id, path).await
    }

    /// Materialize the from/to feature sets of one tree into a
    /// transportable file at `dest`.
    pub async fn export_diff(
        &self,
        tree: &str,
        from: &str,
        to: &str,
        dest: &Path,
    ) -> Result<(), RepoError> {
        let bytes = self.api.export_diff(tree, from, to).await?;
        tokio::fs::write(dest, bytes).await?;
        Ok(())
    }

    /// Download a full snapshot of `tree` at `refspec` into a file at
    /// `dest`.
    pub async fn export_tree(
        &self,
        tree: &str,
        refspec: &str,
        dest: &Path,
    ) -> Result<(), RepoError> {
        let bytes = self.api.export(tree, refspec).await?;
        tokio::fs::write(dest, bytes).await?;
        Ok(())
    }

    // -- Import --------------------------------------------------------------

    /// Import a working copy as a new commit on `branch`.
    ///
    /// With `is_update = false` the local data is a brand-new feature
    /// tree: every feature is an addition and no ancestor comparison
    /// happens. With `is_update = true` the server runs its three-way
    /// check per feature against each remembered origin: clean changes
    /// apply, convergent edits are no-ops, and diverged features come
    /// back in [`ImportResult::conflicts`] without being updated.
    ///
    /// Import is not atomic across unrelated features: non-conflicting
    /// features may land in a new commit even when the conflict list is
    /// non-empty. Conflicts are an expected outcome, not an error.
    pub async fn import_working_copy(
        &self,
        working_copy: &WorkingCopy,
        branch: &str,
        message: &str,
        author_name: &str,
        author_email: &str,
        is_update: bool,
    ) -> Result<ImportResult, RepoError> {
        let request = ImportRequest {
            branch,
            message,
            author_name,
            author_email,
            update: is_update,
            working_copy,
        };
        let response = self.api.import(&request).await?;
        ImportResult::try_from(response)
    }

    // -- Ref mutation ----------------------------------------------------------

    // Ref mutations only touch the remote ref table; the commit cache is
    // content-addressed and stays valid across them.

    /// Create a branch at `from_ref`. Fails with
    /// [`RepoError::RefAlreadyExists`] when the name is taken.
    pub async fn create_branch(&self, from_ref: &str, name: &str) -> Result<(), RepoError> {
        self.api.create_branch(from_ref, name).await
    }

    /// Delete a branch. Fails with [`RepoError::RefNotFound`] when absent.
    pub async fn delete_branch(&self, name: &str) -> Result<(), RepoError> {
        self.api.delete_branch(name).await
    }

    /// Create a tag at `from_ref`. Fails with
    /// [`RepoError::RefAlreadyExists`] when the name is taken.
    pub async fn create_tag(&self, from_ref: &str, name: &str) -> Result<(), RepoError> {
        self.api.create_tag(from_ref, name).await
    }

    /// Delete a tag. Fails with [`RepoError::RefNotFound`] when absent.
    pub async fn delete_tag(&self, name: &str) -> Result<(), RepoError> {
        self.api.delete_tag(name).await
    }

    /// Remove a whole feature tree as a new deletion commit.
    pub async fn remove_tree(
        &self,
        name: &str,
        message: &str,
        author_name: &str,
        author_email: &str,
    ) -> Result<(), RepoError> {
        self.api
            .remove_tree(name, message, author_name, author_email)
            .await
    }
}
