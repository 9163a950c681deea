//! UI module
//!
//! Contains all terminal UI components:
//! - Styles for consistent theming
//! - Ref and commit lists
//! - Diff view rendering and the file sidebar
//! - Header, footer and the help overlay

mod commit_list;
pub mod diff_view;
mod file_tree;
pub mod footer;
mod header;
mod popup;
mod ref_list;
pub mod sidebar;
mod styles;

pub use commit_list::CommitList;
pub use diff_view::{DiffContent, DiffMode, calculate_total_lines, file_line_count};
pub use file_tree::{TreeNode, build_file_tree, flatten_tree, is_hidden_file};
pub use footer::{FocusArea, Footer, StatusMessage};
pub use header::Header;
pub use popup::render_help_popup;
pub use ref_list::{RefEntry, RefKind, RefList, ref_entries};
pub use sidebar::Sidebar;
pub use styles::Styles;
