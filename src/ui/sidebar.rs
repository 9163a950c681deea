//! Sidebar rendering
//!
//! Displays the changed files of a comparison as a tree with
//! collapsible folders and stats.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};
use unicode_width::UnicodeWidthStr;

use crate::git::FileStatus;

use super::{Styles, TreeNode};

/// Default sidebar width
pub const DEFAULT_SIDEBAR_WIDTH: u16 = 35;
/// Minimum sidebar width
pub const MIN_SIDEBAR_WIDTH: u16 = 20;
/// Maximum sidebar width
pub const MAX_SIDEBAR_WIDTH: u16 = 80;
/// Sidebar resize increment
pub const SIDEBAR_RESIZE_STEP: u16 = 5;
/// Maximum visual indentation depth (to prevent deep files from being invisible)
const MAX_VISUAL_INDENT: usize = 6;

/// Sidebar widget showing file tree
pub struct Sidebar<'a> {
    /// Flattened tree nodes to display
    pub nodes: &'a [&'a TreeNode],
    /// Current cursor position
    pub cursor: usize,
    /// Scroll offset
    pub scroll: usize,
    /// Number of hidden files
    pub hidden_count: usize,
    /// Whether the sidebar is focused
    pub focused: bool,
    /// Styles
    pub styles: &'a Styles,
}

impl Widget for Sidebar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let border_style = if self.focused {
            self.styles.border_focus
        } else {
            self.styles.border
        };

        let title = if self.hidden_count > 0 {
            format!(" Files ({} hidden) ", self.hidden_count)
        } else {
            " Files ".to_string()
        };

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(border_style)
            .title(Span::styled(title, self.styles.popup_title));

        let inner = block.inner(area);
        block.render(area, buf);

        let visible_height = inner.height as usize;

        for (i, node) in self.nodes.iter().skip(self.scroll).take(visible_height).enumerate() {
            let y = inner.y + i as u16;
            let is_cursor = i + self.scroll == self.cursor;
            let style = match (is_cursor, node.is_hidden) {
                (true, true) => self.styles.sidebar_hidden_cursor,
                (true, false) => self.styles.sidebar_cursor,
                (false, true) => self.styles.sidebar_hidden,
                (false, false) => self.styles.sidebar_normal,
            };

            let mut spans = Vec::new();

            // Indentation, capped so deep files stay visible
            let visual_depth = node.depth.min(MAX_VISUAL_INDENT);
            spans.push(Span::styled("  ".repeat(visual_depth), style));

            let depth_indicator = (node.depth > MAX_VISUAL_INDENT)
                .then(|| format!("{}·", node.depth - MAX_VISUAL_INDENT));
            if let Some(indicator) = &depth_indicator {
                spans.push(Span::styled(indicator.clone(), self.styles.line_number));
            }

            // Folder icon or status marker
            if node.is_folder {
                let icon = if node.expanded { "▼ " } else { "▶ " };
                spans.push(Span::styled(icon, self.styles.folder_icon));
            } else {
                let (marker, marker_style) = match node.status {
                    Some(FileStatus::Added) => ('A', self.styles.stats_added),
                    Some(FileStatus::Deleted) => ('D', self.styles.stats_removed),
                    Some(status) => (status.marker(), self.styles.folder_icon),
                    None => (' ', style),
                };
                spans.push(Span::styled(format!("{} ", marker), marker_style));
            }

            let indent_width = visual_depth * 2
                + depth_indicator.as_ref().map_or(0, |d| d.width());
            let max_name_width = (inner.width as usize).saturating_sub(indent_width + 12);
            spans.push(Span::styled(smart_truncate(&node.name, max_name_width), style));

            // Stats, right-aligned
            let stats = format!(" +{} -{}", node.added, node.removed);
            let used: usize = spans.iter().map(|s| s.content.width()).sum();
            let available = (inner.width as usize).saturating_sub(used + stats.len());
            if available > 0 {
                spans.push(Span::styled(" ".repeat(available), style));
            }

            spans.push(Span::styled(format!("+{}", node.added), self.styles.stats_added));
            spans.push(Span::styled(" ", style));
            spans.push(Span::styled(format!("-{}", node.removed), self.styles.stats_removed));

            buf.set_line(inner.x, y, &Line::from(spans), inner.width);

            if is_cursor {
                for x in inner.x..inner.x + inner.width {
                    buf[(x, y)].set_style(style);
                }
            }
        }
    }
}

/// Smart truncate: shows beginning...end for better context
///
/// For "very_long_filename.tsx" with max 12 this keeps the extension:
/// "very_lo….tsx" rather than "very_long...".
pub(crate) fn smart_truncate(s: &str, max_width: usize) -> String {
    if s.chars().count() <= max_width {
        return s.to_string();
    }

    if max_width < 5 {
        return s.chars().take(max_width).collect();
    }

    // More room for the beginning, where the unique part usually is
    let available = max_width - 1;
    let prefix_len = (available * 2) / 3;
    let suffix_len = available - prefix_len;

    let prefix: String = s.chars().take(prefix_len).collect();
    let suffix: String = s
        .chars()
        .rev()
        .take(suffix_len)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();

    format!("{}…{}", prefix, suffix)
}
