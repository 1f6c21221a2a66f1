//! GeoVC core library.
//!
//! Client for a server-side geospatial version-control store: commit
//! history modeling, diff and conflict value objects, an injectable
//! commit cache, and the repository client that drives the remote web
//! API, including the import protocol that turns working-copy edits
//! into commits and surfaces three-way merge conflicts.

pub mod cache;
pub mod commit;
pub mod config;
pub mod diff;
pub mod errors;
pub mod repository;
pub mod webapi;
pub mod workingcopy;

// Re-exports for convenience.
pub use cache::CommitCache;
pub use commit::{Commit, Commitish, NULL_ID};
pub use config::ClientConfig;
pub use diff::{ChangeKind, Conflict, DiffEntry, FeatureData};
pub use errors::{CoreError, RepoError};
pub use repository::{Repository, HEAD};
pub use workingcopy::{ImportResult, WorkingCopy, WorkingFeature};
