//! Diff content rendering
//!
//! Renders a comparison in side-by-side or unified mode.

use std::collections::HashSet;

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Widget,
};
use serde::Deserialize;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::git::{DiffFile, DiffHunk, DiffLine, FileStatus, LineKind};
use crate::syntax::{Highlighter, Token};

use super::Styles;

/// Diff display mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum DiffMode {
    /// Side-by-side view showing old and new columns
    #[default]
    #[serde(rename = "split")]
    SideBySide,
    /// Unified view showing all changes in one column
    #[serde(rename = "unified")]
    Unified,
}

impl DiffMode {
    pub fn toggle(self) -> Self {
        match self {
            DiffMode::SideBySide => DiffMode::Unified,
            DiffMode::Unified => DiffMode::SideBySide,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DiffMode::SideBySide => "split",
            DiffMode::Unified => "unified",
        }
    }
}

/// Diff content widget
pub struct DiffContent<'a> {
    /// Files to display
    pub diffs: &'a [&'a DiffFile],
    /// Paths whose hunks are folded away
    pub collapsed: &'a HashSet<String>,
    /// Scroll offset (in lines)
    pub scroll: usize,
    /// Current diff mode
    pub mode: DiffMode,
    /// Syntax highlighter
    pub highlighter: &'a mut Highlighter,
    /// Styles
    pub styles: &'a Styles,
}

const TAB_WIDTH: usize = 4;
const LINE_NUM_WIDTH: u16 = 6;
const GUTTER_WIDTH: u16 = 2;

impl Widget for DiffContent<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match self.mode {
            DiffMode::Unified => render_unified(self, area, buf),
            DiffMode::SideBySide => render_side_by_side(self, area, buf),
        }
    }
}

/// Render unified diff view
fn render_unified(content: DiffContent<'_>, area: Rect, buf: &mut Buffer) {
    let mut current_line: usize = 0;
    let visible_start = content.scroll;
    let visible_end = content.scroll + area.height as usize;

    for diff in content.diffs.iter().copied() {
        let mut line_index = 0;
        let folded = content.collapsed.contains(&diff.path);

        if current_line >= visible_start && current_line < visible_end {
            let y = area.y + (current_line - visible_start) as u16;
            render_file_header(buf, area.x, y, area.width, diff, folded, content.styles);
        }
        current_line += 1;

        if folded || diff.is_binary {
            continue;
        }

        for hunk in &diff.hunks {
            if current_line >= visible_start && current_line < visible_end {
                let y = area.y + (current_line - visible_start) as u16;
                render_hunk_header(buf, area.x, y, area.width, hunk, content.styles);
            }
            current_line += 1;

            for line in &hunk.lines {
                if current_line >= visible_start && current_line < visible_end {
                    let y = area.y + (current_line - visible_start) as u16;
                    render_unified_line(
                        buf,
                        area.x,
                        y,
                        area.width,
                        IndexedLine { line, index: line_index },
                        &diff.path,
                        content.highlighter,
                        content.styles,
                    );
                }
                current_line += 1;
                line_index += 1;

                if current_line >= visible_end {
                    return;
                }
            }
        }
    }
}

/// Render side-by-side diff view
fn render_side_by_side(content: DiffContent<'_>, area: Rect, buf: &mut Buffer) {
    let mut current_line: usize = 0;
    let visible_start = content.scroll;
    let visible_end = content.scroll + area.height as usize;

    let half_width = area.width / 2;

    for diff in content.diffs.iter().copied() {
        let mut line_index = 0;
        let folded = content.collapsed.contains(&diff.path);

        // File header (spans both columns)
        if current_line >= visible_start && current_line < visible_end {
            let y = area.y + (current_line - visible_start) as u16;
            render_file_header(buf, area.x, y, area.width, diff, folded, content.styles);
        }
        current_line += 1;

        if folded || diff.is_binary {
            continue;
        }

        for hunk in &diff.hunks {
            if current_line >= visible_start && current_line < visible_end {
                let y = area.y + (current_line - visible_start) as u16;
                render_hunk_header(buf, area.x, y, area.width, hunk, content.styles);
            }
            current_line += 1;

            for row in pair_lines_with_index(&hunk.lines, line_index) {
                if current_line >= visible_start && current_line < visible_end {
                    let y = area.y + (current_line - visible_start) as u16;

                    match row {
                        // Unparsed header text spans both columns
                        Row::Full(indexed) => render_unified_line(
                            buf,
                            area.x,
                            y,
                            area.width,
                            indexed,
                            &diff.path,
                            content.highlighter,
                            content.styles,
                        ),
                        Row::Split(old, new) => {
                            render_side_column(
                                buf,
                                area.x,
                                y,
                                half_width,
                                old,
                                &diff.path,
                                content.highlighter,
                                content.styles,
                                true,
                            );
                            render_side_column(
                                buf,
                                area.x + half_width,
                                y,
                                area.width - half_width,
                                new,
                                &diff.path,
                                content.highlighter,
                                content.styles,
                                false,
                            );
                        }
                    }
                }
                current_line += 1;

                if current_line >= visible_end {
                    return;
                }
            }

            line_index += hunk.lines.len();
        }
    }
}

#[derive(Clone, Copy)]
struct IndexedLine<'a> {
    line: &'a DiffLine,
    /// Position among all lines of the file, for the highlight cache
    index: usize,
}

/// One display row of the side-by-side view
enum Row<'a> {
    Full(IndexedLine<'a>),
    Split(Option<IndexedLine<'a>>, Option<IndexedLine<'a>>),
}

/// Pair old and new lines for side-by-side display, preserving line indices
fn pair_lines_with_index(lines: &[DiffLine], start_index: usize) -> Vec<Row<'_>> {
    lines
        .iter()
        .enumerate()
        .map(|(offset, line)| {
            let indexed = IndexedLine {
                line,
                index: start_index + offset,
            };

            match line.kind {
                LineKind::Deletion => Row::Split(Some(indexed), None),
                LineKind::Addition => Row::Split(None, Some(indexed)),
                LineKind::Context => Row::Split(Some(indexed), Some(indexed)),
                LineKind::Header => Row::Full(indexed),
            }
        })
        .collect()
}

/// Render a file header
fn render_file_header(
    buf: &mut Buffer,
    x: u16,
    y: u16,
    width: u16,
    diff: &DiffFile,
    folded: bool,
    styles: &Styles,
) {
    for i in x..x + width {
        buf[(i, y)].set_char(' ').set_style(styles.file_header);
    }

    let stats = format!(" +{} -{} ", diff.additions, diff.deletions);

    let mut display_path = match (&diff.previous_path, diff.status) {
        (Some(old_path), _) => format!("{} → {}", old_path, diff.path),
        (None, FileStatus::Modified) => diff.path.clone(),
        (None, status) => format!("{} [{}]", diff.path, status.marker()),
    };
    if folded {
        display_path = format!("▶ {}", display_path);
    }

    let note = diff.is_binary.then(|| {
        format!(
            " binary {} ",
            diff.binary_kind.as_deref().unwrap_or("file")
        )
    });
    let note_width = note.as_ref().map_or(0, |n| n.width());

    let path_width = (width as usize).saturating_sub(stats.len() + note_width + 2);
    let path = truncate_start(&display_path, path_width);

    let mut spans = vec![Span::styled(format!(" {} ", path), styles.file_header)];
    if let Some(note) = note {
        spans.push(Span::styled(note, styles.file_header.patch(styles.binary_note)));
    }

    // Stats on the right
    let current_len: usize = spans.iter().map(|s| s.content.width()).sum();
    if current_len + stats.len() < width as usize {
        let padding = width as usize - current_len - stats.len();
        spans.push(Span::styled(" ".repeat(padding), styles.file_header));
        spans.push(Span::styled(format!("+{}", diff.additions), styles.stats_added));
        spans.push(Span::styled(" ", styles.file_header));
        spans.push(Span::styled(format!("-{}", diff.deletions), styles.stats_removed));
        spans.push(Span::styled(" ", styles.file_header));
    }

    buf.set_line(x, y, &Line::from(spans), width);
}

/// Render a hunk header
fn render_hunk_header(buf: &mut Buffer, x: u16, y: u16, width: u16, hunk: &DiffHunk, styles: &Styles) {
    buf.set_line(x, y, &Line::styled(hunk.header(), styles.hunk_header), width);
}

fn line_styles(kind: LineKind, styles: &Styles) -> (&'static str, Style, Style) {
    match kind {
        LineKind::Addition => ("│ ", styles.gutter_added, styles.line_added),
        LineKind::Deletion => ("│ ", styles.gutter_removed, styles.line_removed),
        LineKind::Context => ("│ ", styles.gutter_context, styles.line_context),
        LineKind::Header => ("  ", styles.line_context, styles.hunk_header),
    }
}

fn render_line_number(buf: &mut Buffer, x: u16, y: u16, number: Option<u32>, styles: &Styles) {
    let text = match number {
        Some(n) if n > 0 => format!("{:>5} ", n),
        _ => " ".repeat(LINE_NUM_WIDTH as usize),
    };
    buf.set_line(x, y, &Line::styled(text, styles.line_number), LINE_NUM_WIDTH);
}

/// Gutter and content of one line, starting after the line number
#[allow(clippy::too_many_arguments)]
fn render_line_body(
    buf: &mut Buffer,
    x: u16,
    y: u16,
    width: u16,
    indexed: IndexedLine<'_>,
    filename: &str,
    highlighter: &mut Highlighter,
    styles: &Styles,
) {
    let line = indexed.line;
    let (gutter_char, gutter_style, line_style) = line_styles(line.kind, styles);
    buf.set_line(x, y, &Line::styled(gutter_char, gutter_style), GUTTER_WIDTH);

    let content_x = x + GUTTER_WIDTH;
    let content_width = width.saturating_sub(GUTTER_WIDTH);

    if line.kind == LineKind::Header {
        let content = truncate_str(&line.text, content_width as usize);
        buf.set_line(content_x, y, &Line::styled(content, styles.hunk_header), content_width);
        return;
    }

    for i in content_x..(content_x + content_width) {
        buf[(i, y)].set_char(' ').set_style(line_style);
    }

    let spans = highlight_spans(filename, indexed.index, &line.text, highlighter, line_style);
    buf.set_line(content_x, y, &Line::from(spans), content_width);
}

/// Render a unified diff line
#[allow(clippy::too_many_arguments)]
fn render_unified_line(
    buf: &mut Buffer,
    x: u16,
    y: u16,
    width: u16,
    indexed: IndexedLine<'_>,
    filename: &str,
    highlighter: &mut Highlighter,
    styles: &Styles,
) {
    let number = indexed.line.new_line_number.or(indexed.line.old_line_number);
    render_line_number(buf, x, y, number, styles);
    render_line_body(
        buf,
        x + LINE_NUM_WIDTH,
        y,
        width.saturating_sub(LINE_NUM_WIDTH),
        indexed,
        filename,
        highlighter,
        styles,
    );
}

/// Render one side of a side-by-side column
#[allow(clippy::too_many_arguments)]
fn render_side_column(
    buf: &mut Buffer,
    x: u16,
    y: u16,
    width: u16,
    line: Option<IndexedLine<'_>>,
    filename: &str,
    highlighter: &mut Highlighter,
    styles: &Styles,
    is_old: bool,
) {
    match line {
        Some(indexed) => {
            let number = if is_old {
                indexed.line.old_line_number
            } else {
                indexed.line.new_line_number
            };
            render_line_number(buf, x, y, number, styles);
            render_line_body(
                buf,
                x + LINE_NUM_WIDTH,
                y,
                width.saturating_sub(LINE_NUM_WIDTH),
                indexed,
                filename,
                highlighter,
                styles,
            );
        }
        None => {
            // No corresponding line on this side
            for i in x..x + width {
                buf[(i, y)].set_char(' ').set_style(styles.line_context);
            }
        }
    }
}

fn highlight_spans(
    filename: &str,
    line_index: usize,
    content: &str,
    highlighter: &mut Highlighter,
    base_style: Style,
) -> Vec<Span<'static>> {
    let tokens = highlighter.get_line(filename, line_index, content);
    if tokens.is_empty() {
        return vec![Span::styled(expand_tabs(content, TAB_WIDTH), base_style)];
    }

    expand_tabs_tokens(&tokens, TAB_WIDTH)
        .into_iter()
        .map(|token| Span::styled(token.text, base_style.patch(token.style)))
        .collect()
}

fn expand_tabs_tokens(tokens: &[Token], tab_width: usize) -> Vec<Token> {
    let mut expanded = Vec::new();
    let mut col = 0usize;

    for token in tokens {
        let mut text = String::new();
        for ch in token.text.chars() {
            if ch == '\t' {
                let spaces = tab_width.saturating_sub(col % tab_width).max(1);
                text.extend(std::iter::repeat_n(' ', spaces));
                col += spaces;
            } else {
                text.push(ch);
                col += UnicodeWidthChar::width(ch).unwrap_or(0);
            }
        }

        if !text.is_empty() {
            expanded.push(Token {
                text,
                style: token.style,
            });
        }
    }

    expanded
}

fn expand_tabs(content: &str, tab_width: usize) -> String {
    let mut expanded = String::new();
    let mut col = 0usize;

    for ch in content.chars() {
        if ch == '\t' {
            let spaces = tab_width.saturating_sub(col % tab_width).max(1);
            expanded.extend(std::iter::repeat_n(' ', spaces));
            col += spaces;
        } else {
            expanded.push(ch);
            col += UnicodeWidthChar::width(ch).unwrap_or(0);
        }
    }

    expanded
}

/// Truncate a string to fit width
fn truncate_str(s: &str, max_width: usize) -> String {
    if s.width() <= max_width {
        return s.to_string();
    }

    let mut result = String::new();
    let mut width = 0;
    for c in s.chars() {
        let cw = UnicodeWidthChar::width(c).unwrap_or(0);
        if width + cw > max_width {
            break;
        }
        result.push(c);
        width += cw;
    }
    result
}

/// Keep the end of a path, which is the part that identifies it
fn truncate_start(s: &str, max_width: usize) -> String {
    if s.width() <= max_width || max_width <= 3 {
        return s.to_string();
    }

    let mut tail: Vec<char> = Vec::new();
    let mut width = 3;
    for c in s.chars().rev() {
        let cw = UnicodeWidthChar::width(c).unwrap_or(0);
        if width + cw > max_width {
            break;
        }
        tail.push(c);
        width += cw;
    }
    format!("...{}", tail.into_iter().rev().collect::<String>())
}

/// Calculate total number of lines in the diff view
pub fn calculate_total_lines(diffs: &[&DiffFile], collapsed: &HashSet<String>) -> usize {
    diffs
        .iter()
        .map(|diff| file_line_count(diff, collapsed.contains(&diff.path)))
        .sum()
}

/// Rows a file occupies: its header, plus hunk headers and lines when unfolded
///
/// Both modes give one row per hunk line, so the count does not depend on
/// the mode.
pub fn file_line_count(diff: &DiffFile, folded: bool) -> usize {
    if folded || diff.is_binary {
        return 1;
    }
    1 + diff
        .hunks
        .iter()
        .map(|hunk| 1 + hunk.lines.len())
        .sum::<usize>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::diff::parse_unified_diff;

    const SAMPLE: &str = "\
diff --git a/src/lib.rs b/src/lib.rs
--- a/src/lib.rs
+++ b/src/lib.rs
@@ -1,3 +1,3 @@ mod x
 keep
-old
+new
diff --git a/logo.png b/logo.png
Binary files a/logo.png and b/logo.png differ
";

    fn rows(buf: &Buffer) -> Vec<String> {
        (0..buf.area.height)
            .map(|y| {
                (0..buf.area.width)
                    .map(|x| buf[(x, y)].symbol())
                    .collect::<String>()
                    .trim_end()
                    .to_string()
            })
            .collect()
    }

    fn render(mode: DiffMode, collapsed: &HashSet<String>) -> Vec<String> {
        let files = parse_unified_diff(SAMPLE);
        let refs: Vec<&DiffFile> = files.iter().collect();
        let styles = Styles::new();
        let mut highlighter = Highlighter::new();
        highlighter.prime(&files);

        let area = Rect::new(0, 0, 60, 8);
        let mut buf = Buffer::empty(area);
        DiffContent {
            diffs: &refs,
            collapsed,
            scroll: 0,
            mode,
            highlighter: &mut highlighter,
            styles: &styles,
        }
        .render(area, &mut buf);
        rows(&buf)
    }

    #[test]
    fn mode_names() {
        assert_eq!(DiffMode::default(), DiffMode::SideBySide);
        assert_eq!(DiffMode::SideBySide.toggle(), DiffMode::Unified);
        assert_eq!(DiffMode::Unified.label(), "unified");
    }

    #[test]
    fn line_counts() {
        let files = parse_unified_diff(SAMPLE);
        let refs: Vec<&DiffFile> = files.iter().collect();

        // header + hunk header + 3 lines, then the binary header alone
        assert_eq!(file_line_count(&files[0], false), 5);
        assert_eq!(file_line_count(&files[1], false), 1);
        assert_eq!(calculate_total_lines(&refs, &HashSet::new()), 6);

        let collapsed: HashSet<String> = ["src/lib.rs".to_string()].into();
        assert_eq!(calculate_total_lines(&refs, &collapsed), 2);
    }

    #[test]
    fn unified_rows() {
        let rows = render(DiffMode::Unified, &HashSet::new());

        assert!(rows[0].starts_with(" src/lib.rs"));
        assert!(rows[0].ends_with("+1 -1"));
        assert_eq!(rows[1], "@@ -1,3 +1,3 @@ mod x");
        assert_eq!(rows[2], "    1 │ keep");
        assert_eq!(rows[3], "    2 │ old");
        assert_eq!(rows[4], "    2 │ new");
        assert!(rows[5].contains("logo.png"));
        assert!(rows[5].contains("binary image"));
    }

    #[test]
    fn side_by_side_rows() {
        let rows = render(DiffMode::SideBySide, &HashSet::new());

        assert_eq!(rows[2], format!("    1 │ keep{}    1 │ keep", " ".repeat(18)));
        assert_eq!(rows[3], "    2 │ old");
        assert_eq!(rows[4], format!("{}    2 │ new", " ".repeat(30)));
    }

    #[test]
    fn folded_file_shows_header_only() {
        let collapsed: HashSet<String> = ["src/lib.rs".to_string()].into();
        let rows = render(DiffMode::Unified, &collapsed);

        assert!(rows[0].starts_with(" ▶ src/lib.rs"));
        assert!(rows[1].contains("logo.png"));
        assert_eq!(rows[2], "");
    }

    #[test]
    fn truncation_keeps_path_end() {
        assert_eq!(truncate_start("src/very/long/path.rs", 10), "...path.rs");
        assert_eq!(truncate_start("short.rs", 10), "short.rs");
    }
}
