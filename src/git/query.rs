//! Repository query port (trait).
//! Defines the calls the core makes against a repository tool without
//! coupling to any implementation.

use chrono::{DateTime, Utc};

use super::error::Result;
use super::model::Remote;

/// Commit metadata exactly as the repository tool reports it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCommitRecord {
    pub hash: String,
    pub author_name: String,
    pub author_email: String,
    pub timestamp: DateTime<Utc>,
    pub subject: String,
    /// Comma separated decorations, e.g. `HEAD -> main, origin/main, tag: v1.0`
    pub refs: String,
}

/// Local branch names plus the branch HEAD points at
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LocalBranchList {
    pub names: Vec<String>,
    /// Current branch, or `HEAD` when detached
    pub current: String,
}

/// Parameters of a commit range query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevListQuery {
    /// Follow only the first parent of merge commits
    pub first_parent: bool,
    /// Revision whose history is listed
    pub target: String,
    /// Hide everything reachable from this revision
    pub exclude_base: Option<String>,
    /// Hide everything reachable from any ref other than the target
    pub exclude_other_refs: bool,
}

impl RevListQuery {
    /// Full first-parent history of `target`
    pub fn first_parent_history(target: impl Into<String>) -> Self {
        Self {
            first_parent: true,
            target: target.into(),
            exclude_base: None,
            exclude_other_refs: false,
        }
    }

    /// First-parent commits of `target` not reachable from `base` or any other ref
    pub fn unique_to(target: impl Into<String>, base: impl Into<String>) -> Self {
        Self {
            first_parent: true,
            target: target.into(),
            exclude_base: Some(base.into()),
            exclude_other_refs: true,
        }
    }
}

/// Port for repository operations.
/// Implementations may use libgit2, shell commands, or test fakes.
/// Calls are blocking; callers move them off the async executor.
pub trait RepoQuery: Send + Sync {
    /// Local branch names and the current branch.
    fn list_local_branches(&self) -> Result<LocalBranchList>;

    /// Every commit reachable from any ref, newest first.
    fn list_all_refs_log(&self) -> Result<Vec<RawCommitRecord>>;

    /// Tag names.
    fn list_tags(&self) -> Result<Vec<String>>;

    /// Configured remotes with their URLs.
    fn list_remotes(&self) -> Result<Vec<Remote>>;

    /// Fetch every configured remote.
    fn fetch_all_remotes(&self) -> Result<()>;

    /// Remote-tracking branches in `remote/branch` form.
    fn list_remote_tracking_refs(&self) -> Result<Vec<String>>;

    /// Uncolored patch text between two revisions.
    fn raw_diff(&self, from: &str, to: &str) -> Result<String>;

    /// Create `new_local_name` tracking `tracking_remote_ref` and switch to it.
    fn checkout(&self, new_local_name: &str, tracking_remote_ref: &str) -> Result<()>;

    /// Commit hashes selected by `query`, newest first.
    fn rev_list(&self, query: &RevListQuery) -> Result<Vec<String>>;

    /// Metadata of a single commit.
    fn show_commit_meta(&self, hash: &str) -> Result<RawCommitRecord>;

    /// Metadata of several commits, in the order given.
    fn show_commits_meta(&self, hashes: &[String]) -> Result<Vec<RawCommitRecord>> {
        hashes.iter().map(|hash| self.show_commit_meta(hash)).collect()
    }
}
