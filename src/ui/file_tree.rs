//! File tree structure
//!
//! Builds a tree of files and folders from the files of a comparison,
//! supporting collapsible folders.

use std::collections::HashMap;

use crate::git::{DiffFile, FileStatus};

/// Lock files that are considered hidden
const HIDDEN_PATTERNS: &[&str] = &[
    "go.sum",
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "Cargo.lock",
    "Gemfile.lock",
    "poetry.lock",
    "composer.lock",
];

/// Check if a file path is considered hidden (dotfile or lock file)
pub fn is_hidden_file(path: &str) -> bool {
    // Any path component starting with "."
    if path.split('/').any(|part| part.starts_with('.')) {
        return true;
    }

    let filename = path.rsplit('/').next().unwrap_or(path);
    HIDDEN_PATTERNS.iter().any(|p| filename == *p)
}

/// A node in the file tree
#[derive(Debug, Clone)]
pub struct TreeNode {
    /// Display name for this node
    pub name: String,
    /// Full path to this file/folder
    pub path: String,
    /// Whether this is a folder (vs a file)
    pub is_folder: bool,
    /// Depth in the tree (for indentation)
    pub depth: usize,
    /// Aggregated lines added (for folders, sum of children)
    pub added: usize,
    /// Aggregated lines removed
    pub removed: usize,
    /// Index into the file list the tree was built from (files only)
    pub diff_index: Option<usize>,
    /// Change kind (files only)
    pub status: Option<FileStatus>,
    /// Whether this folder is expanded
    pub expanded: bool,
    /// Whether this is a hidden file (dotfile or lock file)
    pub is_hidden: bool,
}

/// Build a file tree from a list of diffs
pub fn build_file_tree(
    diffs: &[&DiffFile],
    expanded_folders: &HashMap<String, bool>,
) -> Vec<TreeNode> {
    if diffs.is_empty() {
        return Vec::new();
    }

    // path -> (added, removed)
    let mut folders: HashMap<String, (usize, usize)> = HashMap::new();
    let mut file_nodes: Vec<TreeNode> = Vec::new();

    for (i, diff) in diffs.iter().enumerate() {
        let parts: Vec<&str> = diff.path.split('/').collect();

        let mut current_path = String::new();
        for part in &parts[..parts.len() - 1] {
            if !current_path.is_empty() {
                current_path.push('/');
            }
            current_path.push_str(part);

            let entry = folders.entry(current_path.clone()).or_insert((0, 0));
            entry.0 += diff.additions;
            entry.1 += diff.deletions;
        }

        file_nodes.push(TreeNode {
            name: parts.last().copied().unwrap_or_default().to_string(),
            path: diff.path.clone(),
            is_folder: false,
            depth: parts.len() - 1,
            added: diff.additions,
            removed: diff.deletions,
            diff_index: Some(i),
            status: Some(diff.status),
            expanded: false,
            is_hidden: is_hidden_file(&diff.path),
        });
    }

    let mut nodes: Vec<TreeNode> = folders
        .into_iter()
        .map(|(path, (added, removed))| {
            let depth = path.matches('/').count();
            let name = path.rsplit('/').next().unwrap_or(&path).to_string();
            let expanded = expanded_folders.get(&path).copied().unwrap_or(true);

            TreeNode {
                name,
                is_hidden: is_hidden_file(&path),
                path,
                is_folder: true,
                depth,
                added,
                removed,
                diff_index: None,
                status: None,
                expanded,
            }
        })
        .collect();

    // Component-wise so "src/x" stays under "src" ahead of "src-gen"
    nodes.extend(file_nodes);
    nodes.sort_by(|a, b| a.path.split('/').cmp(b.path.split('/')));

    nodes
}

/// Flatten the tree for display, respecting collapsed folders
pub fn flatten_tree(nodes: &[TreeNode]) -> Vec<&TreeNode> {
    let mut result = Vec::new();
    let mut collapsed_prefixes: Vec<String> = Vec::new();

    for node in nodes {
        let is_hidden = collapsed_prefixes
            .iter()
            .any(|prefix| node.path.starts_with(prefix.as_str()));

        if is_hidden {
            continue;
        }

        result.push(node);

        if node.is_folder && !node.expanded {
            collapsed_prefixes.push(format!("{}/", node.path));
        }
    }

    result
}
