//! Ref list rendering
//!
//! Local branches, remote-only branches and tags of a snapshot, in one
//! scrollable list.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};
use unicode_width::UnicodeWidthStr;

use crate::git::RepositorySnapshot;

use super::Styles;
use super::sidebar::smart_truncate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    /// Every commit of the snapshot
    All,
    Local,
    Remote,
    Tag,
}

impl RefKind {
    fn tag(self) -> &'static str {
        match self {
            RefKind::All => "",
            RefKind::Local => "local",
            RefKind::Remote => "remote",
            RefKind::Tag => "tag",
        }
    }
}

/// A selectable row of the ref list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefEntry {
    pub kind: RefKind,
    pub label: String,
    /// Identifier passed to the branch commit lookup, none for `All`
    pub id: Option<String>,
    pub is_current: bool,
}

/// Rows for a snapshot: all commits, local branches, remote branches, tags
pub fn ref_entries(snapshot: &RepositorySnapshot) -> Vec<RefEntry> {
    let mut entries = vec![RefEntry {
        kind: RefKind::All,
        label: "All commits".to_string(),
        id: None,
        is_current: false,
    }];

    entries.extend(snapshot.branches.iter().map(|b| RefEntry {
        kind: RefKind::Local,
        label: b.name.clone(),
        id: Some(b.name.clone()),
        is_current: b.name == snapshot.current_branch,
    }));

    entries.extend(snapshot.remote_branches.iter().map(|b| RefEntry {
        kind: RefKind::Remote,
        label: b.name.clone(),
        id: Some(b.full_name.clone()),
        is_current: false,
    }));

    entries.extend(snapshot.tags.iter().map(|t| RefEntry {
        kind: RefKind::Tag,
        label: t.clone(),
        id: Some(t.clone()),
        is_current: false,
    }));

    entries
}

pub struct RefList<'a> {
    pub entries: &'a [RefEntry],
    pub cursor: usize,
    pub scroll: usize,
    pub focused: bool,
    pub styles: &'a Styles,
}

impl Widget for RefList<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let border_style = if self.focused {
            self.styles.border_focus
        } else {
            self.styles.border
        };

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(border_style)
            .title(Span::styled(" Refs ", self.styles.popup_title));

        let inner = block.inner(area);
        block.render(area, buf);

        for (i, entry) in self
            .entries
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
            let label_style = match entry.kind {
                _ if entry.is_current => self.styles.ref_current,
                RefKind::Remote => self.styles.ref_remote,
                RefKind::Tag => self.styles.ref_tag,
                RefKind::All | RefKind::Local => base,
            };

            let marker = if entry.is_current { "* " } else { "  " };
            let tag = entry.kind.tag();
            let max_label = (inner.width as usize).saturating_sub(marker.len() + tag.len() + 2);
            let label = smart_truncate(&entry.label, max_label);

            let mut spans = vec![
                Span::styled(marker, self.styles.ref_current),
                Span::styled(label, label_style),
            ];

            let used: usize = spans.iter().map(|s| s.content.width()).sum();
            let padding = (inner.width as usize).saturating_sub(used + tag.len() + 1);
            spans.push(Span::styled(" ".repeat(padding), base));
            spans.push(Span::styled(tag, self.styles.help_desc));

            buf.set_line(inner.x, y, &Line::from(spans), inner.width);

            if is_cursor {
                for x in inner.x..inner.x + inner.width {
                    buf[(x, y)].set_bg(self.styles.sidebar_cursor.bg.unwrap_or_default());
                }
            }
        }
    }
}
