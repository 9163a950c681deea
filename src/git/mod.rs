//! Repository core
//!
//! - `query` is the port the core calls, `backend` its libgit2 implementation
//! - `snapshot`, `branch_commits` and `diff` build the data the shells show
//! - `service` ties them together behind [`RepoService`]

pub mod backend;
mod branch_commits;
pub mod diff;
pub mod error;
pub mod model;
pub mod query;
pub mod refs;
mod service;
mod snapshot;

#[cfg(test)]
pub(crate) mod fake;

pub use backend::Git2Backend;
pub use model::{
    Commit, DiffFile, DiffHunk, DiffLine, FileStatus, LineKind, RepositorySnapshot, total_stats,
};
pub use service::{RepoService, ServiceOptions};
