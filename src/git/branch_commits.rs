//! Branch-scoped commit resolution

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::debug;

use super::error::Result;
use super::model::Commit;
use super::query::{LocalBranchList, RevListQuery};
use super::refs::{self, BranchId};
use super::service::RepoService;
use super::snapshot::to_commit;

impl RepoService {
    /// Commits that belong to `branch_id`, newest first
    ///
    /// `branch_id` is a local branch, tag or hash, or a remote-tracking
    /// identifier (`remotes/origin/feature`). A bare `remotes/<remote>` is
    /// ambiguous and yields no commits.
    pub async fn branch_commits(&self, branch_id: &str) -> Result<Vec<Commit>> {
        let target = match refs::parse_branch_id(branch_id) {
            BranchId::Local(rev) => rev,
            BranchId::Remote(remote) => remote.full_ref(),
            BranchId::BareRemote(remote) => {
                debug!(remote = %remote, "bare remote namespace, no commits");
                return Ok(Vec::new());
            }
        };

        let branches = self.read(|q| q.list_local_branches()).await?;
        let base = resolve_base(&branches, &self.options.trunk_branches);

        let hashes = if target == base {
            self.first_parent_history(&target).await?
        } else {
            let query = RevListQuery::unique_to(target.clone(), base.clone());
            let unique = self.read(move |q| q.rev_list(&query)).await?;
            if unique.is_empty() {
                debug!(target = %target, base = %base, "nothing unique to branch, using full history");
                self.first_parent_history(&target).await?
            } else {
                unique
            }
        };

        debug!(target = %target, base = %base, count = hashes.len(), "resolved branch commits");
        self.lookup_commits(hashes).await
    }

    async fn first_parent_history(&self, target: &str) -> Result<Vec<String>> {
        let query = RevListQuery::first_parent_history(target);
        self.read(move |q| q.rev_list(&query)).await
    }

    /// Fetch metadata for every hash in bounded batches, keeping the input order
    async fn lookup_commits(&self, hashes: Vec<String>) -> Result<Vec<Commit>> {
        let permits = Arc::new(Semaphore::new(self.options.max_parallel_lookups.max(1)));
        let batches: Vec<Vec<String>> = hashes
            .chunks(self.options.lookup_batch_size.max(1))
            .map(<[String]>::to_vec)
            .collect();
        let mut slots: Vec<Vec<Commit>> = vec![Vec::new(); batches.len()];
        let mut lookups = JoinSet::new();

        for (index, batch) in batches.into_iter().enumerate() {
            let permits = Arc::clone(&permits);
            let service = self.clone();
            lookups.spawn(async move {
                let _permit = permits.acquire_owned().await.ok();
                let records = service.read(move |q| q.show_commits_meta(&batch)).await;
                (index, records)
            });
        }

        while let Some(joined) = lookups.join_next().await {
            let (index, records) = joined?;
            slots[index] = records?
                .into_iter()
                .map(|record| to_commit(record, &self.options.default_remote))
                .collect();
        }

        Ok(slots.into_iter().flatten().collect())
    }
}

/// Base line a branch is compared against
///
/// The current branch when it is a trunk, else the first trunk name that
/// exists locally, else the current branch itself.
pub fn resolve_base(branches: &LocalBranchList, trunk_branches: &[String]) -> String {
    if trunk_branches.contains(&branches.current) {
        return branches.current.clone();
    }

    trunk_branches
        .iter()
        .find(|trunk| branches.names.contains(trunk))
        .cloned()
        .unwrap_or_else(|| branches.current.clone())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::git::error::GitError;
    use crate::git::fake::{C1, C2, F1, F2, FakeRepo};
    use crate::git::service::ServiceOptions;

    fn trunks() -> Vec<String> {
        vec!["main".to_string(), "master".to_string()]
    }

    fn branch_list(names: &[&str], current: &str) -> LocalBranchList {
        LocalBranchList {
            names: names.iter().map(|n| n.to_string()).collect(),
            current: current.to_string(),
        }
    }

    fn service(fake: FakeRepo, options: ServiceOptions) -> (RepoService, Arc<FakeRepo>) {
        let fake = Arc::new(fake);
        (RepoService::new(fake.clone(), options), fake)
    }

    fn hashes(commits: &[Commit]) -> Vec<&str> {
        commits.iter().map(|c| c.hash.as_str()).collect()
    }

    #[test]
    fn base_is_current_trunk() {
        assert_eq!(resolve_base(&branch_list(&["main", "master"], "master"), &trunks()), "master");
    }

    #[test]
    fn base_probes_trunks_in_order() {
        assert_eq!(resolve_base(&branch_list(&["feature", "master"], "feature"), &trunks()), "master");
        assert_eq!(
            resolve_base(&branch_list(&["feature", "master", "main"], "feature"), &trunks()),
            "main"
        );
    }

    #[test]
    fn base_falls_back_to_current() {
        assert_eq!(resolve_base(&branch_list(&["develop", "topic"], "topic"), &trunks()), "topic");
        assert_eq!(resolve_base(&branch_list(&["topic"], "HEAD"), &trunks()), "HEAD");
    }

    #[tokio::test]
    async fn base_branch_lists_full_first_parent_history() {
        let (service, fake) = service(FakeRepo::with_main_and_remote(), ServiceOptions::default());

        let commits = service.branch_commits("main").await.unwrap();
        assert_eq!(hashes(&commits), vec![C2, C1]);
        assert_eq!(fake.rev_queries(), vec![RevListQuery::first_parent_history("main")]);
    }

    #[tokio::test]
    async fn remote_branch_lists_unique_commits() {
        let (service, fake) = service(FakeRepo::with_main_and_remote(), ServiceOptions::default());

        let commits = service.branch_commits("remotes/origin/feature").await.unwrap();
        assert_eq!(hashes(&commits), vec![F2, F1]);
        assert_eq!(commits[0].subject, "feature two");
        assert_eq!(commits[0].refs, vec!["feature"]);
        assert_eq!(
            fake.rev_queries(),
            vec![RevListQuery::unique_to("refs/remotes/origin/feature", "main")]
        );
    }

    #[tokio::test]
    async fn branch_without_unique_commits_falls_back_to_history() {
        let mut fake = FakeRepo::with_main_and_remote();
        fake.branches = branch_list(&["main", "feature"], "main");
        fake.history
            .insert("feature".to_string(), vec![C2.to_string(), C1.to_string()]);
        let (service, fake) = service(fake, ServiceOptions::default());

        let feature = service.branch_commits("feature").await.unwrap();
        let main = service.branch_commits("main").await.unwrap();
        assert_eq!(feature, main);

        let queries = fake.rev_queries();
        assert_eq!(queries[0], RevListQuery::unique_to("feature", "main"));
        assert_eq!(queries[1], RevListQuery::first_parent_history("feature"));
    }

    #[tokio::test]
    async fn bare_remote_namespace_is_empty() {
        let (service, fake) = service(FakeRepo::with_main_and_remote(), ServiceOptions::default());

        let commits = service.branch_commits("remotes/origin").await.unwrap();
        assert!(commits.is_empty());
        assert!(fake.rev_queries().is_empty());
    }

    #[tokio::test]
    async fn unknown_branch_propagates_error() {
        let (service, _) = service(FakeRepo::with_main_and_remote(), ServiceOptions::default());

        let err = service.branch_commits("nope").await.unwrap_err();
        assert!(matches!(err, GitError::RevisionNotFound(_)));
    }

    #[tokio::test]
    async fn lookups_keep_order_and_respect_bound() {
        let fake = FakeRepo {
            stagger_lookups: true,
            ..FakeRepo::with_main_and_remote()
        };
        let options = ServiceOptions {
            max_parallel_lookups: 2,
            lookup_batch_size: 1,
            ..ServiceOptions::default()
        };
        let (service, fake) = service(fake, options);

        let commits = service
            .lookup_commits(vec![F2.to_string(), C2.to_string(), F1.to_string(), C1.to_string()])
            .await
            .unwrap();
        assert_eq!(hashes(&commits), vec![F2, C2, F1, C1]);
        assert!(fake.peak_lookups.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn lookups_read_commits_in_batches() {
        let options = ServiceOptions {
            lookup_batch_size: 3,
            ..ServiceOptions::default()
        };
        let (service, fake) = service(FakeRepo::with_main_and_remote(), options);

        let commits = service
            .lookup_commits(vec![C1.to_string(), F1.to_string(), C2.to_string(), F2.to_string()])
            .await
            .unwrap();
        assert_eq!(hashes(&commits), vec![C1, F1, C2, F2]);
        assert_eq!(fake.meta_batches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_lookup_propagates() {
        let (service, _) = service(FakeRepo::with_main_and_remote(), ServiceOptions::default());

        let err = service
            .lookup_commits(vec![C1.to_string(), "deadbeef".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, GitError::RevisionNotFound(_)));
    }
}
