//! Ref name normalization
//!
//! Every rule about decorations, remote prefixes and remote-branch
//! identifiers lives here so the aggregator, resolver and checkout
//! agree on what a name means.

use super::model::{LocalBranch, RemoteBranch};

/// Namespace marker for remote-tracking identifiers (`remotes/origin/main`)
pub const REMOTES_NAMESPACE: &str = "remotes/";
/// Fully qualified prefix of remote-tracking refs
pub const REMOTE_REFS_PREFIX: &str = "refs/remotes/";
/// Symbolic ref marker that is never surfaced as a branch
pub const HEAD_MARKER: &str = "HEAD";

const TAG_MARKER: &str = "tag:";

/// Split a raw decoration string into trimmed, non-empty entries
pub fn decoration_entries(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

/// Normalize one decoration entry into a branch ref name
///
/// Returns `None` for empty and tag entries. The default remote prefix is
/// stripped so `origin/main` and `main` read the same.
pub fn normalize_ref(entry: &str, default_remote: &str) -> Option<String> {
    let entry = entry.trim();
    if entry.is_empty() || entry.contains(TAG_MARKER) {
        return None;
    }

    let stripped = entry
        .strip_prefix(default_remote)
        .and_then(|rest| rest.strip_prefix('/'))
        .filter(|rest| !rest.is_empty())
        .unwrap_or(entry);

    Some(stripped.to_string())
}

/// Branch refs for a raw decoration string
pub fn branch_refs(raw: &str, default_remote: &str) -> Vec<String> {
    raw.split(',')
        .filter_map(|entry| normalize_ref(entry, default_remote))
        .collect()
}

/// A remote-tracking branch identifier split into its parts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRef {
    pub remote: String,
    pub branch: String,
}

impl RemoteRef {
    /// `origin/feature`
    pub fn tracking_name(&self) -> String {
        format!("{}/{}", self.remote, self.branch)
    }

    /// `refs/remotes/origin/feature`
    pub fn full_ref(&self) -> String {
        format!("{}{}/{}", REMOTE_REFS_PREFIX, self.remote, self.branch)
    }
}

/// What a branch identifier coming from the UI refers to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchId {
    /// A local branch, tag or any other revision
    Local(String),
    /// `remotes/<remote>/<branch>`
    Remote(RemoteRef),
    /// `remotes/<remote>` with nothing after it
    BareRemote(String),
}

/// Classify a branch identifier
///
/// Only identifiers carrying the `remotes/` namespace (or the fully
/// qualified `refs/remotes/`) are treated as remote-tracking.
pub fn parse_branch_id(id: &str) -> BranchId {
    let id = id.trim();
    let rest = id
        .strip_prefix(REMOTE_REFS_PREFIX)
        .or_else(|| id.strip_prefix(REMOTES_NAMESPACE));

    let Some(rest) = rest else {
        return BranchId::Local(id.to_string());
    };

    match rest.split_once('/') {
        Some((remote, branch)) if !remote.is_empty() && !branch.is_empty() => {
            BranchId::Remote(RemoteRef {
                remote: remote.to_string(),
                branch: branch.to_string(),
            })
        }
        _ => BranchId::BareRemote(rest.trim_end_matches('/').to_string()),
    }
}

/// Remote-tracking branch a checkout request refers to
///
/// Accepts `remotes/<remote>/<branch>`, `refs/remotes/...` and the short
/// `<remote>/<branch>` form. Bare remotes and plain names yield `None`.
pub fn checkout_target(id: &str) -> Option<RemoteRef> {
    match parse_branch_id(id) {
        BranchId::Remote(remote) => Some(remote),
        BranchId::BareRemote(_) => None,
        BranchId::Local(name) => {
            let (remote, branch) = name.split_once('/')?;
            if remote.is_empty() || branch.is_empty() || branch.ends_with(HEAD_MARKER) {
                return None;
            }
            Some(RemoteRef {
                remote: remote.to_string(),
                branch: branch.to_string(),
            })
        }
    }
}

/// Build a remote branch from a short tracking name such as `origin/feature/x`
///
/// Returns `None` for names without a branch part and for `HEAD` pointers.
pub fn remote_branch(tracking_name: &str) -> Option<RemoteBranch> {
    let (remote, short) = tracking_name.split_once('/')?;
    if remote.is_empty() || short.is_empty() || short.ends_with(HEAD_MARKER) {
        return None;
    }

    Some(RemoteBranch {
        name: tracking_name.to_string(),
        full_name: format!("{}{}", REMOTES_NAMESPACE, tracking_name),
        remote_name: remote.to_string(),
        short_name: short.to_string(),
    })
}

/// Whether a local branch already represents this remote branch
pub fn has_local_counterpart(
    remote: &RemoteBranch,
    locals: &[LocalBranch],
    default_remote: &str,
) -> bool {
    let without_default = remote
        .name
        .strip_prefix(default_remote)
        .and_then(|rest| rest.strip_prefix('/'));

    locals.iter().any(|local| {
        local.name == remote.short_name || Some(local.name.as_str()) == without_default
    })
}
