//! Repository state aggregation
//!
//! Local data is read unconditionally; the network refresh runs alongside
//! and only decides whether remote branches are listed.

use std::sync::Arc;

use tokio::task::{self, JoinHandle};
use tracing::{debug, info, warn};

use super::error::{GitError, Result};
use super::model::{Commit, LocalBranch, RemoteBranch, RepositorySnapshot};
use super::query::RawCommitRecord;
use super::refs;
use super::service::RepoService;

impl RepoService {
    /// Build a complete snapshot of the repository
    ///
    /// Fails only when local data cannot be read. Network trouble turns into
    /// `is_offline = true` with no remote branches.
    pub async fn snapshot(&self) -> Result<RepositorySnapshot> {
        let fetch = (!self.options.offline).then(|| self.spawn_fetch());

        let (branch_list, log, tags, remotes) = tokio::try_join!(
            async {
                self.read(|q| q.list_local_branches())
                    .await
                    .map_err(|e| GitError::local_read("branches", e))
            },
            async {
                self.read(|q| q.list_all_refs_log())
                    .await
                    .map_err(|e| GitError::local_read("commit log", e))
            },
            async {
                self.read(|q| q.list_tags())
                    .await
                    .map_err(|e| GitError::local_read("tags", e))
            },
            async {
                self.read(|q| q.list_remotes())
                    .await
                    .map_err(|e| GitError::local_read("remotes", e))
            },
        )?;

        let branches: Vec<LocalBranch> = branch_list
            .names
            .into_iter()
            .map(|name| LocalBranch { name })
            .collect();

        let mut is_offline = match fetch {
            Some(fetch) => !self.await_fetch(fetch).await,
            None => {
                debug!("offline mode, skipping fetch");
                true
            }
        };

        let remote_branches = if is_offline {
            Vec::new()
        } else {
            match self.read(|q| q.list_remote_tracking_refs()).await {
                Ok(names) => {
                    collect_remote_branches(&names, &branches, &self.options.default_remote)
                }
                Err(e) => {
                    warn!(error = %e, "failed to list remote branches, continuing offline");
                    is_offline = true;
                    Vec::new()
                }
            }
        };

        let commits: Vec<Commit> = log
            .into_iter()
            .map(|record| to_commit(record, &self.options.default_remote))
            .collect();

        info!(
            commits = commits.len(),
            branches = branches.len(),
            remote_branches = remote_branches.len(),
            offline = is_offline,
            "built repository snapshot"
        );

        Ok(RepositorySnapshot {
            commits,
            branches,
            remote_branches,
            current_branch: branch_list.current,
            tags,
            remotes,
            is_offline,
        })
    }

    /// Start fetching every remote without waiting for it
    ///
    /// Fetching only moves remote-tracking refs, so it runs outside the gate.
    /// A fetch that outlives its timeout must not hold up checkout or reads.
    fn spawn_fetch(&self) -> JoinHandle<Result<()>> {
        let query = Arc::clone(&self.query);

        tokio::spawn(async move {
            task::spawn_blocking(move || query.fetch_all_remotes())
                .await
                .unwrap_or_else(|e| Err(GitError::Task(e)))
        })
    }

    /// Wait for the fetch within the configured timeout; true when it succeeded
    async fn await_fetch(&self, fetch: JoinHandle<Result<()>>) -> bool {
        let timeout = self.options.fetch_timeout;
        match tokio::time::timeout(timeout, fetch).await {
            Ok(Ok(Ok(()))) => true,
            Ok(Ok(Err(e))) => {
                warn!(error = %e, "fetch failed, continuing offline");
                false
            }
            Ok(Err(e)) => {
                warn!(error = %e, "fetch task failed, continuing offline");
                false
            }
            Err(_) => {
                warn!(timeout_secs = timeout.as_secs_f64(), "fetch timed out, continuing offline");
                false
            }
        }
    }
}

/// Remote branches worth listing: no `HEAD` pointers, nothing a local branch already covers
pub(super) fn collect_remote_branches(
    tracking_names: &[String],
    locals: &[LocalBranch],
    default_remote: &str,
) -> Vec<RemoteBranch> {
    tracking_names
        .iter()
        .filter_map(|name| refs::remote_branch(name))
        .filter(|branch| !refs::has_local_counterpart(branch, locals, default_remote))
        .collect()
}

/// Derive the display fields of a commit from its raw record
pub(super) fn to_commit(record: RawCommitRecord, default_remote: &str) -> Commit {
    let refs = refs::branch_refs(&record.refs, default_remote);
    let full_refs = refs::decoration_entries(&record.refs);

    Commit {
        hash: record.hash,
        author_name: record.author_name,
        author_email: record.author_email,
        timestamp: record.timestamp,
        subject: record.subject,
        raw_refs: record.refs,
        refs,
        full_refs,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::git::fake::{C2, F2, FakeRepo, record};
    use crate::git::service::ServiceOptions;

    fn service_with(fake: FakeRepo, options: ServiceOptions) -> (RepoService, Arc<FakeRepo>) {
        let fake = Arc::new(fake);
        (RepoService::new(fake.clone(), options), fake)
    }

    fn locals(names: &[&str]) -> Vec<LocalBranch> {
        names
            .iter()
            .map(|name| LocalBranch { name: name.to_string() })
            .collect()
    }

    #[tokio::test]
    async fn online_snapshot_lists_new_remote_branches() {
        let (service, fake) = service_with(FakeRepo::with_main_and_remote(), ServiceOptions::default());

        let snapshot = service.snapshot().await.unwrap();
        assert!(!snapshot.is_offline);
        assert_eq!(fake.fetch_calls.load(Ordering::SeqCst), 1);
        assert_eq!(snapshot.current_branch, "main");
        assert_eq!(snapshot.branches, locals(&["main"]));
        assert_eq!(snapshot.tags, vec!["v1"]);
        assert_eq!(snapshot.remotes.len(), 1);
        assert_eq!(snapshot.commits.len(), 4);

        let names: Vec<&str> = snapshot.remote_branches.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["origin/feature"]);
        assert_eq!(snapshot.remote_branches[0].full_name, "remotes/origin/feature");
    }

    #[tokio::test]
    async fn fetch_failure_keeps_local_data() {
        let fake = FakeRepo {
            fetch_fails: true,
            ..FakeRepo::with_main_and_remote()
        };
        let (service, _) = service_with(fake, ServiceOptions::default());

        let snapshot = service.snapshot().await.unwrap();
        assert!(snapshot.is_offline);
        assert!(snapshot.remote_branches.is_empty());
        assert_eq!(snapshot.commits.len(), 4);
        assert_eq!(snapshot.branches, locals(&["main"]));
        assert_eq!(snapshot.tags, vec!["v1"]);
    }

    #[tokio::test]
    async fn slow_fetch_times_out_into_offline() {
        let fake = FakeRepo {
            fetch_delay: Some(Duration::from_millis(400)),
            ..FakeRepo::with_main_and_remote()
        };
        let options = ServiceOptions {
            fetch_timeout: Duration::from_millis(20),
            ..ServiceOptions::default()
        };
        let (service, _) = service_with(fake, options);

        let snapshot = service.snapshot().await.unwrap();
        assert!(snapshot.is_offline);
        assert!(snapshot.remote_branches.is_empty());
        assert_eq!(snapshot.commits.len(), 4);
    }

    #[tokio::test]
    async fn offline_option_skips_fetch() {
        let options = ServiceOptions {
            offline: true,
            ..ServiceOptions::default()
        };
        let (service, fake) = service_with(FakeRepo::with_main_and_remote(), options);

        let snapshot = service.snapshot().await.unwrap();
        assert!(snapshot.is_offline);
        assert!(snapshot.remote_branches.is_empty());
        assert_eq!(fake.fetch_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn remote_listing_failure_degrades_to_offline() {
        let fake = FakeRepo {
            remote_refs_fail: true,
            ..FakeRepo::with_main_and_remote()
        };
        let (service, _) = service_with(fake, ServiceOptions::default());

        let snapshot = service.snapshot().await.unwrap();
        assert!(snapshot.is_offline);
        assert!(snapshot.remote_branches.is_empty());
    }

    #[tokio::test]
    async fn unreadable_repository_is_fatal() {
        let fake = FakeRepo {
            unreadable: true,
            ..FakeRepo::with_main_and_remote()
        };
        let (service, _) = service_with(fake, ServiceOptions::default());

        let err = service.snapshot().await.unwrap_err();
        assert!(matches!(err, GitError::LocalRead { .. }));
    }

    #[tokio::test]
    async fn commit_refs_drop_tags_and_default_remote() {
        let (service, _) = service_with(FakeRepo::with_main_and_remote(), ServiceOptions::default());

        let snapshot = service.snapshot().await.unwrap();
        let c2 = snapshot.commits.iter().find(|c| c.hash == C2).unwrap();
        assert_eq!(c2.refs, vec!["HEAD -> main", "main", "HEAD"]);
        assert_eq!(
            c2.full_refs,
            vec!["HEAD -> main", "origin/main", "origin/HEAD", "tag: v1"]
        );
        assert_eq!(c2.raw_refs, "HEAD -> main, origin/main, origin/HEAD, tag: v1");

        let f2 = snapshot.commits.iter().find(|c| c.hash == F2).unwrap();
        assert_eq!(f2.refs, vec!["feature"]);

        for commit in &snapshot.commits {
            assert!(commit.refs.iter().all(|r| !r.contains("tag:")));
        }
    }

    #[test]
    fn remote_branches_never_shadow_local_ones() {
        let names: Vec<String> = ["origin/HEAD", "origin/main", "origin/feature/x", "upstream/main", "upstream/docs"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let branches = collect_remote_branches(&names, &locals(&["main", "feature/x"]), "origin");

        let listed: Vec<&str> = branches.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(listed, vec!["upstream/docs"]);
        for branch in &branches {
            assert!(!locals(&["main", "feature/x"]).iter().any(|l| l.name == branch.short_name));
        }
    }

    #[test]
    fn to_commit_derives_refs() {
        let commit = to_commit(record(C2, "second", "HEAD -> main, origin/main, tag: v1"), "origin");
        assert_eq!(commit.refs, vec!["HEAD -> main", "main"]);
        assert_eq!(commit.full_refs, vec!["HEAD -> main", "origin/main", "tag: v1"]);
        assert_eq!(commit.short_hash(), "2222222");
    }
}
