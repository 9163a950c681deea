//! Help overlay

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Widget},
};

use super::Styles;

const HELP_ITEMS: &[(&str, &str)] = &[
    ("Refs and commits", ""),
    ("j/k", "Move down/up"),
    ("Tab", "Switch focus"),
    ("Enter", "Show ref history / compare"),
    ("Space", "Mark commit (from, then to)"),
    ("Esc", "Clear marks"),
    ("o", "Check out remote branch"),
    ("r", "Refresh"),
    ("", ""),
    ("Diff", ""),
    ("j/k", "Scroll down/up"),
    ("Ctrl+d/u", "Page down/up"),
    ("g/G", "Go to top/bottom"),
    ("n/N", "Next/previous file"),
    ("u", "Toggle split/unified"),
    ("Space", "Collapse/expand file"),
    ("z", "Collapse/expand all"),
    ("h", "Toggle hidden files"),
    ("[/]", "Resize sidebar"),
    ("Esc", "Back to commits"),
    ("", ""),
    ("?", "Toggle this help"),
    ("q", "Quit"),
];

/// Render a centered popup overlay
fn render_centered_popup(buf: &mut Buffer, area: Rect, width: u16, height: u16, title: &str, styles: &Styles) -> Rect {
    let popup_x = area.x + (area.width.saturating_sub(width)) / 2;
    let popup_y = area.y + (area.height.saturating_sub(height)) / 2;

    let popup_area = Rect::new(
        popup_x,
        popup_y,
        width.min(area.width),
        height.min(area.height),
    );

    Clear.render(popup_area, buf);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles.border_focus)
        .title(Span::styled(format!(" {} ", title), styles.popup_title))
        .style(styles.popup);

    let inner = block.inner(popup_area);
    block.render(popup_area, buf);

    inner
}

/// Render help overlay
pub fn render_help_popup(buf: &mut Buffer, area: Rect, styles: &Styles) {
    let width = 50.min(area.width.saturating_sub(4));
    let height = (HELP_ITEMS.len() as u16 + 2).min(area.height.saturating_sub(4));

    let inner = render_centered_popup(buf, area, width, height, "Help", styles);

    for (i, (key, desc)) in HELP_ITEMS.iter().enumerate() {
        let y = inner.y + i as u16;
        if y >= inner.y + inner.height {
            break;
        }

        if key.is_empty() && desc.is_empty() {
            continue;
        }

        if desc.is_empty() {
            // Section header
            buf.set_line(
                inner.x,
                y,
                &Line::styled(format!(" {}", key), styles.popup_title),
                inner.width,
            );
        } else {
            let line = Line::from(vec![
                Span::styled(format!("  {:>12} ", key), styles.help_key),
                Span::styled(*desc, styles.help_desc),
            ]);
            buf.set_line(inner.x, y, &line, inner.width);
        }
    }
}
