//! libgit2 repository adapter
//!
//! Implements [`RepoQuery`] on top of the `git2` crate. Every call opens its
//! own repository handle so calls never share libgit2 state.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone, Utc};
use git2::build::CheckoutBuilder;
use git2::{
    BranchType, Cred, CredentialType, DiffFindOptions, DiffFormat, DiffOptions, ErrorCode,
    FetchOptions, Oid, RemoteCallbacks, Repository, Revwalk, Sort,
};
use tracing::{debug, info, warn};

use super::error::{GitError, Result};
use super::model::Remote;
use super::query::{LocalBranchList, RawCommitRecord, RepoQuery, RevListQuery};
use super::refs::HEAD_MARKER;

/// Give up after this many credential prompts for a single fetch
const MAX_CREDENTIAL_ATTEMPTS: usize = 3;

/// Repository queries backed by libgit2
#[derive(Debug, Clone)]
pub struct Git2Backend {
    repo_path: PathBuf,
    context_lines: u32,
}

impl Git2Backend {
    /// Locate the repository containing `path`
    ///
    /// Fails with [`GitError::Unreadable`] when `path` is not inside a repository.
    pub fn discover(path: &Path, context_lines: u32) -> Result<Self> {
        let repo = Repository::discover(path)
            .map_err(|e| GitError::Unreadable(format!("{}: {}", path.display(), e.message())))?;
        let repo_path = repo.workdir().unwrap_or_else(|| repo.path()).to_path_buf();

        Ok(Self {
            repo_path,
            context_lines,
        })
    }

    /// Root of the working tree (or the git dir for bare repositories)
    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    fn open(&self) -> Result<Repository> {
        Repository::discover(&self.repo_path).map_err(|e| {
            GitError::Unreadable(format!("{}: {}", self.repo_path.display(), e.message()))
        })
    }
}

impl RepoQuery for Git2Backend {
    fn list_local_branches(&self) -> Result<LocalBranchList> {
        let repo = self.open()?;

        let mut names = Vec::new();
        for branch in repo.branches(Some(BranchType::Local))? {
            let (branch, _) = branch?;
            if let Some(name) = branch.name()? {
                names.push(name.to_string());
            }
        }
        names.sort();

        Ok(LocalBranchList {
            names,
            current: current_branch(&repo)?,
        })
    }

    fn list_all_refs_log(&self) -> Result<Vec<RawCommitRecord>> {
        let repo = self.open()?;
        let decorations = decorations(&repo)?;

        let mut walk = repo.revwalk()?;
        walk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;
        for oid in decorations.keys() {
            walk.push(*oid)?;
        }

        let mut records = Vec::new();
        for oid in walk {
            let oid = oid?;
            let commit = repo.find_commit(oid)?;
            records.push(commit_record(&commit, decoration_string(&decorations, oid)));
        }

        debug!(count = records.len(), "read commit log across all refs");
        Ok(records)
    }

    fn list_tags(&self) -> Result<Vec<String>> {
        let repo = self.open()?;
        let tags = repo.tag_names(None)?;
        let mut tags: Vec<String> = tags.iter().flatten().map(str::to_string).collect();
        tags.sort();
        Ok(tags)
    }

    fn list_remotes(&self) -> Result<Vec<Remote>> {
        let repo = self.open()?;
        let names = repo.remotes()?;

        let mut remotes = Vec::new();
        for name in names.iter().flatten() {
            let remote = repo.find_remote(name)?;
            let fetch_url = remote.url().map(str::to_string);
            let push_url = remote.pushurl().map(str::to_string).or_else(|| fetch_url.clone());
            remotes.push(Remote {
                name: name.to_string(),
                fetch_url,
                push_url,
            });
        }

        Ok(remotes)
    }

    fn fetch_all_remotes(&self) -> Result<()> {
        let repo = self.open()?;
        let names = repo.remotes()?;

        for name in names.iter().flatten() {
            let mut remote = repo.find_remote(name)?;
            let mut options = FetchOptions::new();
            options.remote_callbacks(credential_callbacks(repo.config()?));

            remote
                .fetch::<&str>(&[], Some(&mut options), None)
                .map_err(|e| GitError::NetworkUnavailable(format!("{}: {}", name, e.message())))?;
            debug!(remote = name, "fetched");
        }

        Ok(())
    }

    fn list_remote_tracking_refs(&self) -> Result<Vec<String>> {
        let repo = self.open()?;

        let mut names = Vec::new();
        for branch in repo.branches(Some(BranchType::Remote))? {
            let (branch, _) = branch?;
            if let Some(name) = branch.name()? {
                names.push(name.to_string());
            }
        }
        names.sort();

        Ok(names)
    }

    fn raw_diff(&self, from: &str, to: &str) -> Result<String> {
        let repo = self.open()?;
        let old_tree = resolve_commit(&repo, from)?.tree()?;
        let new_tree = resolve_commit(&repo, to)?.tree()?;

        let mut options = DiffOptions::new();
        options.context_lines(self.context_lines);
        let mut diff = repo.diff_tree_to_tree(Some(&old_tree), Some(&new_tree), Some(&mut options))?;

        let mut find = DiffFindOptions::new();
        find.renames(true);
        diff.find_similar(Some(&mut find))?;

        let mut patch = Vec::new();
        diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
            if matches!(line.origin(), '+' | '-' | ' ') {
                patch.push(line.origin() as u8);
            }
            patch.extend_from_slice(line.content());
            true
        })?;

        Ok(String::from_utf8_lossy(&patch).into_owned())
    }

    fn checkout(&self, new_local_name: &str, tracking_remote_ref: &str) -> Result<()> {
        let repo = self.open()?;
        let conflict = |e: git2::Error| GitError::CheckoutConflict(e.message().to_string());

        let remote = repo
            .find_branch(tracking_remote_ref, BranchType::Remote)
            .map_err(|e| match e.code() {
                ErrorCode::NotFound => GitError::RevisionNotFound(tracking_remote_ref.to_string()),
                _ => e.into(),
            })?;
        let commit = remote.get().peel_to_commit()?;

        let mut branch = repo.branch(new_local_name, &commit, false).map_err(conflict)?;

        let mut builder = CheckoutBuilder::new();
        builder.safe();
        let switched = branch
            .set_upstream(Some(tracking_remote_ref))
            .and_then(|_| repo.checkout_tree(commit.as_object(), Some(&mut builder)));

        if let Err(err) = switched {
            if let Err(cleanup) = branch.delete() {
                warn!(branch = new_local_name, error = %cleanup, "failed to remove branch after aborted checkout");
            }
            return Err(conflict(err));
        }

        let refname = branch
            .get()
            .name()
            .ok_or_else(|| GitError::Unreadable("branch name is not valid UTF-8".to_string()))?
            .to_string();
        repo.set_head(&refname)?;

        info!(branch = new_local_name, upstream = tracking_remote_ref, "checked out remote branch");
        Ok(())
    }

    fn rev_list(&self, query: &RevListQuery) -> Result<Vec<String>> {
        let repo = self.open()?;
        let target = resolve_commit(&repo, &query.target)?;

        let mut walk = repo.revwalk()?;
        walk.set_sorting(Sort::TOPOLOGICAL)?;
        if query.first_parent {
            walk.simplify_first_parent()?;
        }
        walk.push(target.id())?;

        if let Some(base) = &query.exclude_base {
            let base = resolve_commit(&repo, base)?;
            walk.hide(base.id())?;
        }
        if query.exclude_other_refs {
            hide_other_refs(&repo, &mut walk, &query.target)?;
        }

        walk.map(|oid| oid.map(|oid| oid.to_string()).map_err(GitError::from))
            .collect()
    }

    fn show_commit_meta(&self, hash: &str) -> Result<RawCommitRecord> {
        let repo = self.open()?;
        let commit = resolve_commit(&repo, hash)?;
        let decorations = decorations(&repo)?;
        Ok(commit_record(&commit, decoration_string(&decorations, commit.id())))
    }

    fn show_commits_meta(&self, hashes: &[String]) -> Result<Vec<RawCommitRecord>> {
        let repo = self.open()?;
        let decorations = decorations(&repo)?;
        hashes
            .iter()
            .map(|hash| {
                let commit = resolve_commit(&repo, hash)?;
                Ok(commit_record(&commit, decoration_string(&decorations, commit.id())))
            })
            .collect()
    }
}

/// Name of the checked out branch, `HEAD` when detached
fn current_branch(repo: &Repository) -> Result<String> {
    match repo.head() {
        Ok(head) if head.is_branch() => Ok(head.shorthand().unwrap_or(HEAD_MARKER).to_string()),
        Ok(_) => Ok(HEAD_MARKER.to_string()),
        Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => {
            // Fresh repository: HEAD names a branch that has no commits yet
            let head = repo.find_reference("HEAD")?;
            Ok(head
                .symbolic_target()
                .and_then(|target| target.strip_prefix("refs/heads/"))
                .unwrap_or(HEAD_MARKER)
                .to_string())
        }
        Err(e) => Err(e.into()),
    }
}

/// Resolve a revision expression to a commit
fn resolve_commit<'r>(repo: &'r Repository, rev: &str) -> Result<git2::Commit<'r>> {
    repo.revparse_single(rev)
        .and_then(|object| object.peel_to_commit())
        .map_err(|e| match e.code() {
            ErrorCode::NotFound | ErrorCode::Ambiguous | ErrorCode::InvalidSpec => {
                GitError::RevisionNotFound(rev.to_string())
            }
            _ => e.into(),
        })
}

/// Decoration labels per commit, in the order `git log --decorate` would print them
///
/// The checked out branch comes first as `HEAD -> name` (or a bare `HEAD`
/// when detached), followed by every other ref sorted by full name.
fn decorations(repo: &Repository) -> Result<HashMap<Oid, Vec<String>>> {
    let head = repo.head().ok();
    let head_branch = head
        .as_ref()
        .filter(|head| head.is_branch())
        .and_then(|head| head.name())
        .map(str::to_string);

    let mut labelled = Vec::new();
    for reference in repo.references()? {
        let reference = reference?;
        let Some(name) = reference.name() else {
            continue;
        };

        let label = if let Some(short) = name.strip_prefix("refs/heads/") {
            if head_branch.as_deref() == Some(name) {
                format!("{} -> {}", HEAD_MARKER, short)
            } else {
                short.to_string()
            }
        } else if let Some(short) = name.strip_prefix("refs/remotes/") {
            short.to_string()
        } else if let Some(short) = name.strip_prefix("refs/tags/") {
            format!("tag: {}", short)
        } else {
            continue;
        };

        let Ok(commit) = reference.peel_to_commit() else {
            continue;
        };
        let is_head = head_branch.as_deref() == Some(name);
        labelled.push((!is_head, name.to_string(), commit.id(), label));
    }

    labelled.sort();

    let mut map: HashMap<Oid, Vec<String>> = HashMap::new();
    if let Some(head) = head.as_ref().filter(|head| !head.is_branch()) {
        if let Ok(commit) = head.peel_to_commit() {
            map.entry(commit.id()).or_default().push(HEAD_MARKER.to_string());
        }
    }
    for (_, _, oid, label) in labelled {
        map.entry(oid).or_default().push(label);
    }

    Ok(map)
}

fn decoration_string(decorations: &HashMap<Oid, Vec<String>>, oid: Oid) -> String {
    decorations
        .get(&oid)
        .map(|labels| labels.join(", "))
        .unwrap_or_default()
}

fn commit_record(commit: &git2::Commit<'_>, refs: String) -> RawCommitRecord {
    let author = commit.author();
    RawCommitRecord {
        hash: commit.id().to_string(),
        author_name: author.name().unwrap_or_default().to_string(),
        author_email: author.email().unwrap_or_default().to_string(),
        timestamp: to_utc(author.when()),
        subject: commit.summary().unwrap_or_default().to_string(),
        refs,
    }
}

fn to_utc(time: git2::Time) -> DateTime<Utc> {
    Utc.timestamp_opt(time.seconds(), 0)
        .single()
        .unwrap_or_default()
}

/// Hide every commit reachable from a ref other than `target`
fn hide_other_refs(repo: &Repository, walk: &mut Revwalk<'_>, target: &str) -> Result<()> {
    let target_ref = repo
        .resolve_reference_from_short_name(target)
        .ok()
        .and_then(|reference| reference.name().map(str::to_string));

    for reference in repo.references()? {
        let reference = reference?;
        let Some(name) = reference.name() else {
            continue;
        };
        if target_ref.as_deref() == Some(name) {
            continue;
        }
        // origin/HEAD and friends point at a branch that may be the target
        if let Ok(resolved) = reference.resolve() {
            if target_ref.is_some() && resolved.name() == target_ref.as_deref() {
                continue;
            }
        }
        let Ok(commit) = reference.peel_to_commit() else {
            continue;
        };
        walk.hide(commit.id())?;
    }

    Ok(())
}

fn credential_callbacks<'a>(config: git2::Config) -> RemoteCallbacks<'a> {
    let mut attempts = 0;
    let mut callbacks = RemoteCallbacks::new();

    callbacks.credentials(move |url, username, allowed| {
        attempts += 1;
        if attempts > MAX_CREDENTIAL_ATTEMPTS {
            return Err(git2::Error::from_str("authentication failed"));
        }

        if allowed.contains(CredentialType::SSH_KEY) {
            return Cred::ssh_key_from_agent(username.unwrap_or("git"));
        }
        if allowed.contains(CredentialType::USER_PASS_PLAINTEXT) {
            return Cred::credential_helper(&config, url, username);
        }
        if allowed.contains(CredentialType::DEFAULT) {
            return Cred::default();
        }

        Err(git2::Error::from_str("no supported credential type"))
    });

    callbacks
}
