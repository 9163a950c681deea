//! Footer rendering
//!
//! Displays keybinding hints and focus state, or the latest status
//! message when there is one.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::{Line, Span},
    widgets::Widget,
};
use unicode_width::UnicodeWidthStr;

use super::Styles;

/// Focus area indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusArea {
    Sidebar,
    Content,
}

/// One-line message shown in place of the hints
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub text: String,
    pub is_error: bool,
}

impl StatusMessage {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: true,
        }
    }
}

/// Footer widget showing keybinding hints
pub struct Footer<'a> {
    /// Current focus area
    pub focus: FocusArea,
    /// Key and description pairs for the active screen
    pub hints: &'a [(&'a str, &'a str)],
    pub status: Option<&'a StatusMessage>,
    /// Styles
    pub styles: &'a Styles,
}

impl Widget for Footer<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 {
            return;
        }

        // Clear the footer area
        for x in area.x..area.x + area.width {
            buf[(x, area.y)]
                .set_char(' ')
                .set_style(self.styles.footer);
        }

        if let Some(status) = self.status {
            let style = if status.is_error {
                self.styles.status_error
            } else {
                self.styles.status_info
            };
            let line = Line::from(Span::styled(format!(" {}", status.text), style));
            buf.set_line(area.x, area.y, &line, area.width);
            return;
        }

        let mut spans = Vec::new();
        spans.push(Span::styled(" ", self.styles.footer));

        for (i, (key, desc)) in self.hints.iter().enumerate() {
            if i > 0 {
                spans.push(Span::styled(" │ ", self.styles.footer));
            }
            spans.push(Span::styled(*key, self.styles.footer_key));
            spans.push(Span::styled(format!(" {}", desc), self.styles.footer));
        }

        // Focus indicator (right-aligned)
        let focus_text = match self.focus {
            FocusArea::Sidebar => " [SIDEBAR] ",
            FocusArea::Content => " [CONTENT] ",
        };

        let left_width: usize = spans.iter().map(|s| s.content.width()).sum();
        let focus_width = focus_text.width();

        if left_width + focus_width < area.width as usize {
            let padding = area.width as usize - left_width - focus_width;
            spans.push(Span::styled(" ".repeat(padding), self.styles.footer));
            spans.push(Span::styled(focus_text, self.styles.footer_key));
        }

        let line = Line::from(spans);
        buf.set_line(area.x, area.y, &line, area.width);
    }
}
