//! Commit list rendering

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};
use unicode_width::UnicodeWidthStr;

use crate::git::Commit;

use super::Styles;
use super::sidebar::smart_truncate;

const AUTHOR_WIDTH: usize = 14;

pub struct CommitList<'a> {
    pub title: &'a str,
    pub commits: &'a [Commit],
    pub cursor: usize,
    pub scroll: usize,
    pub focused: bool,
    /// Hash marked as the old side of a comparison
    pub from: Option<&'a str>,
    /// Hash marked as the new side
    pub to: Option<&'a str>,
    pub styles: &'a Styles,
}

impl Widget for CommitList<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let border_style = if self.focused {
            self.styles.border_focus
        } else {
            self.styles.border
        };

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(border_style)
            .title(Span::styled(format!(" {} ", self.title), self.styles.popup_title));

        let inner = block.inner(area);
        block.render(area, buf);

        if self.commits.is_empty() {
            buf.set_line(
                inner.x,
                inner.y,
                &Line::styled(" No commits", self.styles.help_desc),
                inner.width,
            );
            return;
        }

        for (i, commit) in self
            .commits
            .iter()
            .skip(self.scroll)
            .take(inner.height as usize)
            .enumerate()
        {
            let y = inner.y + i as u16;
            let is_cursor = i + self.scroll == self.cursor;
            let base = if is_cursor {
                self.styles.sidebar_cursor
            } else {
                self.styles.sidebar_normal
            };

            let mark = if self.from == Some(commit.hash.as_str()) {
                Span::styled("F ", self.styles.mark_from)
            } else if self.to == Some(commit.hash.as_str()) {
                Span::styled("T ", self.styles.mark_to)
            } else {
                Span::styled("  ", base)
            };

            let author = smart_truncate(&commit.author_name, AUTHOR_WIDTH);
            let mut spans = vec![
                mark,
                Span::styled(format!("{} ", commit.short_hash()), self.styles.hash),
                Span::styled(
                    format!("{} ", commit.timestamp.format("%Y-%m-%d")),
                    self.styles.date,
                ),
                Span::styled(format!("{:<width$} ", author, width = AUTHOR_WIDTH), self.styles.help_desc),
            ];

            if !commit.refs.is_empty() {
                spans.push(Span::styled(
                    format!("({}) ", commit.refs.join(", ")),
                    self.styles.ref_current,
                ));
            }

            let used: usize = spans.iter().map(|s| s.content.width()).sum();
            let room = (inner.width as usize).saturating_sub(used);
            spans.push(Span::styled(smart_truncate(&commit.subject, room), base));

            buf.set_line(inner.x, y, &Line::from(spans), inner.width);

            if is_cursor {
                for x in inner.x..inner.x + inner.width {
                    buf[(x, y)].set_bg(self.styles.sidebar_cursor.bg.unwrap_or_default());
                }
            }
        }
    }
}
