//! Repository data model
//!
//! Plain data produced by the core and consumed by the terminal UI
//! and the JSON output. Every type serializes with camelCase keys.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A commit as read from the repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Commit {
    /// Full 40-hex commit hash
    pub hash: String,
    pub author_name: String,
    pub author_email: String,
    /// Author timestamp, normalized to UTC
    pub timestamp: DateTime<Utc>,
    /// First line of the commit message
    pub subject: String,
    /// Decoration string exactly as the repository reported it
    pub raw_refs: String,
    /// Branch names pointing here, tags dropped and remote prefix stripped
    pub refs: Vec<String>,
    /// Every decoration entry, trimmed
    pub full_refs: Vec<String>,
}

impl Commit {
    /// Abbreviated hash for display
    pub fn short_hash(&self) -> &str {
        &self.hash[..self.hash.len().min(7)]
    }
}

/// A local branch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct LocalBranch {
    pub name: String,
}

/// A remote-tracking branch with no local counterpart
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteBranch {
    /// `origin/feature/x`
    pub name: String,
    /// `remotes/origin/feature/x`
    pub full_name: String,
    /// `origin`
    pub remote_name: String,
    /// `feature/x`
    pub short_name: String,
}

/// A configured remote
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Remote {
    pub name: String,
    pub fetch_url: Option<String>,
    pub push_url: Option<String>,
}

/// Complete view of the repository at one point in time
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositorySnapshot {
    pub commits: Vec<Commit>,
    pub branches: Vec<LocalBranch>,
    pub remote_branches: Vec<RemoteBranch>,
    pub current_branch: String,
    pub tags: Vec<String>,
    pub remotes: Vec<Remote>,
    pub is_offline: bool,
}

/// How a file changed between two revisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FileStatus {
    Added,
    Deleted,
    Renamed,
    Modified,
}

impl FileStatus {
    /// Single-letter marker, as in `git status --short`
    pub fn marker(self) -> char {
        match self {
            FileStatus::Added => 'A',
            FileStatus::Deleted => 'D',
            FileStatus::Renamed => 'R',
            FileStatus::Modified => 'M',
        }
    }
}

/// Classification of a line inside a hunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LineKind {
    /// Line exists in both old and new
    Context,
    /// Line was added
    Addition,
    /// Line was removed
    Deletion,
    /// Opaque `@@` line that could not be parsed
    Header,
}

/// A single line in a hunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffLine {
    pub kind: LineKind,
    pub old_line_number: Option<u32>,
    pub new_line_number: Option<u32>,
    /// Content without the +/-/space prefix
    pub text: String,
}

/// A contiguous change region
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffHunk {
    pub old_start: u32,
    pub old_count: u32,
    pub new_start: u32,
    pub new_count: u32,
    /// Text after the closing `@@`, usually the enclosing function
    pub header_context: Option<String>,
    pub lines: Vec<DiffLine>,
}

impl DiffHunk {
    /// Render the hunk header the way git prints it
    pub fn header(&self) -> String {
        let mut header = format!(
            "@@ -{},{} +{},{} @@",
            self.old_start, self.old_count, self.new_start, self.new_count
        );
        if let Some(context) = &self.header_context {
            header.push(' ');
            header.push_str(context);
        }
        header
    }
}

/// All changes to one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffFile {
    /// Path after the change
    pub path: String,
    /// Path before the change, set for renames
    pub previous_path: Option<String>,
    pub status: FileStatus,
    pub is_binary: bool,
    /// Coarse file kind derived from the extension, binary files only
    pub binary_kind: Option<String>,
    pub additions: usize,
    pub deletions: usize,
    pub hunks: Vec<DiffHunk>,
}

/// Aggregate line stats across a set of files
pub fn total_stats(files: &[DiffFile]) -> (usize, usize) {
    let additions = files.iter().map(|f| f.additions).sum();
    let deletions = files.iter().map(|f| f.deletions).sum();
    (additions, deletions)
}
