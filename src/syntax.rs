//! Syntax highlighting module
//!
//! Provides syntax highlighting for diff lines using syntect.
//! Lines of one file are highlighted together and cached, so
//! multi-line constructs keep their state across hunks.

use std::collections::HashMap;
use std::path::Path;

use ratatui::style::{Color, Modifier, Style as RatatuiStyle};
use syntect::easy::HighlightLines;
use syntect::highlighting::{FontStyle, Style, Theme, ThemeSet};
use syntect::parsing::{SyntaxReference, SyntaxSet};

use crate::git::DiffFile;

const THEME: &str = "base16-ocean.dark";

/// A styled token for display
#[derive(Debug, Clone)]
pub struct Token {
    /// The text content
    pub text: String,
    /// The ratatui style to apply
    pub style: RatatuiStyle,
}

/// A line of highlighted tokens
pub type HighlightedLine = Vec<Token>;

/// Syntax highlighter with caching
pub struct Highlighter {
    syntax_set: SyntaxSet,
    theme_set: ThemeSet,
    /// Cache of highlighted lines by filename
    cache: HashMap<String, Vec<HighlightedLine>>,
}

impl Highlighter {
    /// Create a new highlighter
    pub fn new() -> Self {
        Self {
            syntax_set: SyntaxSet::load_defaults_newlines(),
            theme_set: ThemeSet::load_defaults(),
            cache: HashMap::new(),
        }
    }

    /// Highlight every hunk line of each file, in display order
    pub fn prime(&mut self, files: &[DiffFile]) {
        self.cache.clear();
        for file in files.iter().filter(|f| !f.is_binary) {
            let lines: Vec<&str> = file
                .hunks
                .iter()
                .flat_map(|h| h.lines.iter().map(|l| l.text.as_str()))
                .collect();
            let highlighted = self.do_highlight(&file.path, &lines);
            self.cache.insert(file.path.clone(), highlighted);
        }
    }

    fn do_highlight(&self, filename: &str, lines: &[&str]) -> Vec<HighlightedLine> {
        let Some(theme) = self.theme() else {
            return lines.iter().map(|line| plain(line)).collect();
        };

        let syntax = self.detect_syntax(filename);
        let mut highlighter = HighlightLines::new(syntax, theme);
        let mut result = Vec::with_capacity(lines.len());

        for line in lines {
            match highlighter.highlight_line(line, &self.syntax_set) {
                Ok(ranges) => {
                    let tokens: Vec<Token> = ranges
                        .into_iter()
                        .map(|(style, text)| Token {
                            text: text.to_string(),
                            style: syntect_style_to_ratatui(style),
                        })
                        .collect();
                    result.push(tokens);
                }
                Err(_) => result.push(plain(line)),
            }
        }

        result
    }

    fn theme(&self) -> Option<&Theme> {
        self.theme_set.themes.get(THEME)
    }

    /// Detect the syntax for a file based on its path
    fn detect_syntax(&self, filename: &str) -> &SyntaxReference {
        let path = Path::new(filename);

        if let Some(syntax) = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(|ext| self.syntax_set.find_syntax_by_extension(ext))
        {
            return syntax;
        }

        // Extensionless names such as Makefile or Dockerfile
        if let Some(syntax) = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|name| self.syntax_set.find_syntax_by_extension(name))
        {
            return syntax;
        }

        self.syntax_set.find_syntax_plain_text()
    }

    /// Get a cached highlighted line, or highlight it on demand
    pub fn get_line(&mut self, filename: &str, line_index: usize, line_content: &str) -> HighlightedLine {
        if let Some(line) = self
            .cache
            .get(filename)
            .and_then(|cached| cached.get(line_index))
        {
            return line.clone();
        }

        self.do_highlight(filename, &[line_content])
            .into_iter()
            .next()
            .unwrap_or_default()
    }
}

impl Default for Highlighter {
    fn default() -> Self {
        Self::new()
    }
}

fn plain(line: &str) -> HighlightedLine {
    vec![Token {
        text: line.to_string(),
        style: RatatuiStyle::default(),
    }]
}

/// Convert a syntect Style to a ratatui Style
fn syntect_style_to_ratatui(style: Style) -> RatatuiStyle {
    let fg = Color::Rgb(style.foreground.r, style.foreground.g, style.foreground.b);

    let mut ratatui_style = RatatuiStyle::default().fg(fg);

    if style.font_style.contains(FontStyle::BOLD) {
        ratatui_style = ratatui_style.add_modifier(Modifier::BOLD);
    }
    if style.font_style.contains(FontStyle::ITALIC) {
        ratatui_style = ratatui_style.add_modifier(Modifier::ITALIC);
    }
    if style.font_style.contains(FontStyle::UNDERLINE) {
        ratatui_style = ratatui_style.add_modifier(Modifier::UNDERLINED);
    }

    ratatui_style
}

/// Language name for the header, from the file extension
pub fn detect_language(filename: &str) -> &'static str {
    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");

    match ext {
        "rs" => "Rust",
        "go" => "Go",
        "js" => "JavaScript",
        "ts" => "TypeScript",
        "tsx" => "TypeScript React",
        "jsx" => "JavaScript React",
        "py" => "Python",
        "rb" => "Ruby",
        "java" => "Java",
        "c" => "C",
        "cpp" | "cc" | "cxx" => "C++",
        "h" | "hpp" => "C/C++ Header",
        "md" => "Markdown",
        "json" => "JSON",
        "yaml" | "yml" => "YAML",
        "toml" => "TOML",
        "html" => "HTML",
        "css" => "CSS",
        "scss" | "sass" => "Sass",
        "sql" => "SQL",
        "sh" | "bash" => "Shell",
        _ => "Plain Text",
    }
}
