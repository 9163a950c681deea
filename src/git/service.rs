//! Core service
//!
//! `RepoService` is what the shells talk to. It moves blocking repository
//! calls onto tokio's blocking pool and serializes checkout against reads.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::RwLock;
use tokio::task;
use tracing::{debug, info, warn};

use super::diff::parse_unified_diff;
use super::error::{GitError, Result};
use super::model::{DiffFile, RepositorySnapshot};
use super::query::RepoQuery;
use super::refs;

/// Tunables for the core
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceOptions {
    /// Remote whose prefix is stripped from decorations
    pub default_remote: String,
    /// Candidate base branches, probed in order
    pub trunk_branches: Vec<String>,
    pub fetch_timeout: Duration,
    /// Upper bound on concurrent commit metadata lookups
    pub max_parallel_lookups: usize,
    /// Commits read per metadata lookup
    pub lookup_batch_size: usize,
    /// Never contact remotes
    pub offline: bool,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            default_remote: "origin".to_string(),
            trunk_branches: vec!["main".to_string(), "master".to_string()],
            fetch_timeout: Duration::from_secs(30),
            max_parallel_lookups: 8,
            lookup_batch_size: 32,
            offline: false,
        }
    }
}

/// Result of a remote branch checkout
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutOutcome {
    pub success: bool,
    /// Fresh snapshot, present on success
    pub snapshot: Option<RepositorySnapshot>,
}

impl CheckoutOutcome {
    fn failed() -> Self {
        Self {
            success: false,
            snapshot: None,
        }
    }
}

/// Facade over a [`RepoQuery`]
#[derive(Clone)]
pub struct RepoService {
    pub(super) query: Arc<dyn RepoQuery>,
    /// Reads take the read side, checkout the write side
    pub(super) gate: Arc<RwLock<()>>,
    pub(super) options: ServiceOptions,
}

impl RepoService {
    pub fn new(query: Arc<dyn RepoQuery>, options: ServiceOptions) -> Self {
        Self {
            query,
            gate: Arc::new(RwLock::new(())),
            options,
        }
    }

    /// Run a query on the blocking pool
    pub(super) async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn RepoQuery) -> Result<T> + Send + 'static,
    {
        let query = Arc::clone(&self.query);
        task::spawn_blocking(move || f(query.as_ref())).await?
    }

    /// Run a query under the read side of the gate
    pub(super) async fn read<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn RepoQuery) -> Result<T> + Send + 'static,
    {
        let _guard = self.gate.read().await;
        self.blocking(f).await
    }

    /// Patch text between two revisions
    pub async fn raw_diff(&self, from: &str, to: &str) -> Result<String> {
        let (old, new) = (from.to_string(), to.to_string());
        self.read(move |q| q.raw_diff(&old, &new))
            .await
            .map_err(|e| match e {
                GitError::RevisionNotFound(_) => e,
                other => GitError::DiffUnavailable {
                    from: from.to_string(),
                    to: to.to_string(),
                    reason: other.to_string(),
                },
            })
    }

    /// Structured diff between two revisions
    pub async fn compare(&self, from: &str, to: &str) -> Result<Vec<DiffFile>> {
        let text = self.raw_diff(from, to).await?;
        let files = parse_unified_diff(&text);
        debug!(from, to, files = files.len(), "compared revisions");
        Ok(files)
    }

    /// Create a local branch tracking a remote branch and switch to it
    ///
    /// Checkout failures are reported through `success: false`; only a
    /// failure to rebuild the snapshot afterwards is an error.
    pub async fn checkout_remote_branch(&self, branch_id: &str) -> Result<CheckoutOutcome> {
        let Some(remote) = refs::checkout_target(branch_id) else {
            warn!(branch_id, "not a remote-tracking branch, refusing checkout");
            return Ok(CheckoutOutcome::failed());
        };

        let local_name = remote.branch.clone();
        let tracking = remote.tracking_name();
        let result = {
            let _guard = self.gate.write().await;
            let (name, upstream) = (local_name.clone(), tracking.clone());
            self.blocking(move |q| q.checkout(&name, &upstream)).await
        };

        if let Err(e) = result {
            warn!(branch = %local_name, upstream = %tracking, error = %e, "checkout failed");
            return Ok(CheckoutOutcome::failed());
        }

        info!(branch = %local_name, upstream = %tracking, "checkout complete, rebuilding snapshot");
        let snapshot = self.snapshot().await?;
        Ok(CheckoutOutcome {
            success: true,
            snapshot: Some(snapshot),
        })
    }
}
