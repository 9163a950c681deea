//! In-memory repository used by service and app tests

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use chrono::{TimeZone, Utc};

use super::error::{GitError, Result};
use super::model::Remote;
use super::query::{LocalBranchList, RawCommitRecord, RepoQuery, RevListQuery};

pub const C1: &str = "1111111111111111111111111111111111111111";
pub const C2: &str = "2222222222222222222222222222222222222222";
pub const F1: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
pub const F2: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

pub fn record(hash: &str, subject: &str, refs: &str) -> RawCommitRecord {
    RawCommitRecord {
        hash: hash.to_string(),
        author_name: "Test".to_string(),
        author_email: "test@example.com".to_string(),
        timestamp: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        subject: subject.to_string(),
        refs: refs.to_string(),
    }
}

#[derive(Default)]
pub struct FakeRepo {
    pub branches: LocalBranchList,
    pub log: Vec<RawCommitRecord>,
    pub tags: Vec<String>,
    pub remotes: Vec<Remote>,
    pub remote_refs: Vec<String>,
    /// First-parent history per target
    pub history: HashMap<String, Vec<String>>,
    /// Commits unique to a target
    pub unique: HashMap<String, Vec<String>>,
    pub diff_text: String,
    /// Revision `raw_diff` reports as missing
    pub diff_error: Option<String>,
    /// Every read fails as if the repository vanished
    pub unreadable: bool,
    pub fetch_fails: bool,
    pub fetch_delay: Option<Duration>,
    pub remote_refs_fail: bool,
    pub checkout_fails: bool,
    pub checkout_delay: Option<Duration>,
    /// Make earlier lookups finish last
    pub stagger_lookups: bool,

    pub fetch_calls: AtomicUsize,
    pub checkouts: Mutex<Vec<(String, String)>>,
    pub rev_queries: Mutex<Vec<RevListQuery>>,
    pub in_flight: AtomicUsize,
    pub peak_lookups: AtomicUsize,
    pub meta_batches: AtomicUsize,
    pub checking_out: AtomicBool,
    /// Reads that started while a checkout was running
    pub reads_during_checkout: AtomicUsize,
}

impl FakeRepo {
    /// main: C2 - C1, feature: F2 - F1 on top of C1, origin/feature without a local branch
    pub fn with_main_and_remote() -> Self {
        let mut history = HashMap::new();
        history.insert("main".to_string(), vec![C2.to_string(), C1.to_string()]);
        history.insert(
            "refs/remotes/origin/feature".to_string(),
            vec![F2.to_string(), F1.to_string(), C1.to_string()],
        );
        let mut unique = HashMap::new();
        unique.insert(
            "refs/remotes/origin/feature".to_string(),
            vec![F2.to_string(), F1.to_string()],
        );

        Self {
            branches: LocalBranchList {
                names: vec!["main".to_string()],
                current: "main".to_string(),
            },
            log: vec![
                record(F2, "feature two", "origin/feature"),
                record(C2, "second", "HEAD -> main, origin/main, origin/HEAD, tag: v1"),
                record(F1, "feature one", ""),
                record(C1, "initial", ""),
            ],
            tags: vec!["v1".to_string()],
            remotes: vec![Remote {
                name: "origin".to_string(),
                fetch_url: Some("git@example.com:repo.git".to_string()),
                push_url: Some("git@example.com:repo.git".to_string()),
            }],
            remote_refs: vec![
                "origin/HEAD".to_string(),
                "origin/feature".to_string(),
                "origin/main".to_string(),
            ],
            history,
            unique,
            ..Self::default()
        }
    }

    pub fn checkouts(&self) -> Vec<(String, String)> {
        self.checkouts.lock().unwrap().clone()
    }

    pub fn rev_queries(&self) -> Vec<RevListQuery> {
        self.rev_queries.lock().unwrap().clone()
    }

    fn check_readable(&self) -> Result<()> {
        if self.checking_out.load(Ordering::SeqCst) {
            self.reads_during_checkout.fetch_add(1, Ordering::SeqCst);
        }
        if self.unreadable {
            return Err(GitError::Unreadable("repository vanished".to_string()));
        }
        Ok(())
    }
}

impl RepoQuery for FakeRepo {
    fn list_local_branches(&self) -> Result<LocalBranchList> {
        self.check_readable()?;
        Ok(self.branches.clone())
    }

    fn list_all_refs_log(&self) -> Result<Vec<RawCommitRecord>> {
        self.check_readable()?;
        Ok(self.log.clone())
    }

    fn list_tags(&self) -> Result<Vec<String>> {
        self.check_readable()?;
        Ok(self.tags.clone())
    }

    fn list_remotes(&self) -> Result<Vec<Remote>> {
        self.check_readable()?;
        Ok(self.remotes.clone())
    }

    fn fetch_all_remotes(&self) -> Result<()> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.fetch_delay {
            thread::sleep(delay);
        }
        if self.fetch_fails {
            return Err(GitError::NetworkUnavailable("no route to host".to_string()));
        }
        Ok(())
    }

    fn list_remote_tracking_refs(&self) -> Result<Vec<String>> {
        if self.remote_refs_fail {
            return Err(GitError::Unreadable("remote refs".to_string()));
        }
        Ok(self.remote_refs.clone())
    }

    fn raw_diff(&self, from: &str, to: &str) -> Result<String> {
        self.check_readable()?;
        if let Some(missing) = &self.diff_error {
            if missing == from || missing == to {
                return Err(GitError::RevisionNotFound(missing.clone()));
            }
        }
        Ok(self.diff_text.clone())
    }

    fn checkout(&self, new_local_name: &str, tracking_remote_ref: &str) -> Result<()> {
        self.checking_out.store(true, Ordering::SeqCst);
        if let Some(delay) = self.checkout_delay {
            thread::sleep(delay);
        }
        self.checking_out.store(false, Ordering::SeqCst);

        if self.checkout_fails {
            return Err(GitError::CheckoutConflict("local changes would be overwritten".to_string()));
        }
        self.checkouts
            .lock()
            .unwrap()
            .push((new_local_name.to_string(), tracking_remote_ref.to_string()));
        Ok(())
    }

    fn rev_list(&self, query: &RevListQuery) -> Result<Vec<String>> {
        self.check_readable()?;
        self.rev_queries.lock().unwrap().push(query.clone());

        let source = if query.exclude_base.is_some() {
            &self.unique
        } else {
            &self.history
        };
        if let Some(hashes) = source.get(&query.target) {
            return Ok(hashes.clone());
        }
        if self.history.contains_key(&query.target) || self.branches.names.contains(&query.target) {
            return Ok(Vec::new());
        }
        Err(GitError::RevisionNotFound(query.target.clone()))
    }

    fn show_commit_meta(&self, hash: &str) -> Result<RawCommitRecord> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_lookups.fetch_max(now, Ordering::SeqCst);

        if self.stagger_lookups {
            let position = self.log.iter().position(|r| r.hash == hash).unwrap_or(0);
            let wait = (self.log.len() - position) as u64 * 10;
            thread::sleep(Duration::from_millis(wait));
        }

        let result = self
            .log
            .iter()
            .find(|r| r.hash == hash)
            .cloned()
            .ok_or_else(|| GitError::RevisionNotFound(hash.to_string()));

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn show_commits_meta(&self, hashes: &[String]) -> Result<Vec<RawCommitRecord>> {
        self.meta_batches.fetch_add(1, Ordering::SeqCst);
        hashes.iter().map(|hash| self.show_commit_meta(hash)).collect()
    }
}
