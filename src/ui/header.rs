//! Header rendering
//!
//! Displays the current branch, what is being viewed, stats and the
//! offline badge.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::{Line, Span},
    widgets::Widget,
};
use unicode_width::UnicodeWidthStr;

use super::Styles;

/// Header widget showing branch and stats info
pub struct Header<'a> {
    /// Checked out branch
    pub current_branch: &'a str,
    /// Selected ref or compared range
    pub viewing: Option<&'a str>,
    /// Number of commits listed
    pub commit_count: usize,
    /// Lines added in the shown diff
    pub added: usize,
    /// Lines removed in the shown diff
    pub removed: usize,
    /// Whether the last snapshot could not reach the remotes
    pub offline: bool,
    /// Current file being viewed
    pub current_file: Option<&'a str>,
    pub styles: &'a Styles,
}

impl Widget for Header<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 {
            return;
        }

        // Clear the header area
        for x in area.x..area.x + area.width {
            buf[(x, area.y)]
                .set_char(' ')
                .set_style(self.styles.header);
        }

        let mut spans = Vec::new();

        spans.push(Span::styled(
            format!(" {} ", self.current_branch),
            self.styles.ref_current.bg(self.styles.header.bg.unwrap_or_default()),
        ));

        if let Some(viewing) = self.viewing {
            spans.push(Span::styled("│ ", self.styles.footer));
            spans.push(Span::styled(format!("{} ", viewing), self.styles.header));
        }

        if self.commit_count > 0 {
            spans.push(Span::styled("│ ", self.styles.footer));
            spans.push(Span::styled(
                format!("[{} commits] ", self.commit_count),
                self.styles.header,
            ));
        }

        if self.added > 0 || self.removed > 0 {
            spans.push(Span::styled(
                format!("+{}", self.added),
                self.styles.stats_added,
            ));
            spans.push(Span::styled(" ", self.styles.header));
            spans.push(Span::styled(
                format!("-{} ", self.removed),
                self.styles.stats_removed,
            ));
        }

        if self.offline {
            spans.push(Span::styled(" OFFLINE ", self.styles.offline_badge));
        }

        // Current file (right-aligned)
        if let Some(file) = self.current_file {
            let file_info = format!(" {} ", file);
            let file_width = file_info.width();
            let left_width: usize = spans.iter().map(|s| s.content.width()).sum();

            if left_width + file_width < area.width as usize {
                let padding = area.width as usize - left_width - file_width;
                spans.push(Span::styled(" ".repeat(padding), self.styles.header));
                spans.push(Span::styled(file_info, self.styles.header));
            }
        }

        let line = Line::from(spans);
        buf.set_line(area.x, area.y, &line, area.width);
    }
}
