//! UI styles
//!
//! Defines consistent styling for the entire application.
//! Uses a delta-like color palette for diffs.

use ratatui::style::{Color, Modifier, Style};

/// Color palette inspired by delta diff viewer
pub mod colors {
    use ratatui::style::Color;

    // Base colors
    pub const FG: Color = Color::White;
    pub const DIM: Color = Color::DarkGray;

    // Diff colors (delta-like palette)
    pub const ADDED_BG: Color = Color::Rgb(35, 60, 35);
    pub const ADDED_FG: Color = Color::Rgb(120, 200, 120);
    pub const REMOVED_BG: Color = Color::Rgb(60, 35, 35);
    pub const REMOVED_FG: Color = Color::Rgb(200, 120, 120);

    // Gutter colors
    pub const GUTTER_ADDED: Color = Color::Green;
    pub const GUTTER_REMOVED: Color = Color::Red;
    pub const GUTTER_CONTEXT: Color = Color::DarkGray;

    // Line numbers
    pub const LINE_NUMBER: Color = Color::DarkGray;

    // UI elements
    pub const HEADER_BG: Color = Color::Rgb(40, 44, 52);
    pub const HEADER_FG: Color = Color::White;
    pub const FOOTER_BG: Color = Color::Rgb(40, 44, 52);
    pub const FOOTER_FG: Color = Color::DarkGray;

    // Stats
    pub const STATS_ADDED: Color = Color::Green;
    pub const STATS_REMOVED: Color = Color::Red;

    // Selection
    pub const CURSOR_BG: Color = Color::Rgb(80, 80, 100);

    // File headers
    pub const FILE_HEADER_BG: Color = Color::Rgb(50, 55, 65);
    pub const FILE_HEADER_FG: Color = Color::Cyan;

    // Hunk headers
    pub const HUNK_HEADER_FG: Color = Color::Magenta;

    // Borders
    pub const BORDER: Color = Color::DarkGray;
    pub const BORDER_FOCUS: Color = Color::Cyan;

    // Popup
    pub const POPUP_BG: Color = Color::Rgb(30, 34, 42);
    pub const POPUP_BORDER: Color = Color::Cyan;

    // Refs
    pub const REF_CURRENT: Color = Color::Green;
    pub const REF_REMOTE: Color = Color::Red;
    pub const REF_TAG: Color = Color::Yellow;
    pub const HASH: Color = Color::Yellow;
    pub const DATE: Color = Color::DarkGray;

    // Comparison marks
    pub const MARK_FROM: Color = Color::Rgb(200, 120, 120);
    pub const MARK_TO: Color = Color::Rgb(120, 200, 120);

    // Status line
    pub const STATUS_INFO: Color = Color::Cyan;
    pub const STATUS_ERROR: Color = Color::Rgb(230, 100, 100);
    pub const OFFLINE_BG: Color = Color::Rgb(120, 80, 20);
}

/// Collection of styles used throughout the UI
#[derive(Clone)]
pub struct Styles {
    // Header/Footer
    pub header: Style,
    pub footer: Style,
    pub footer_key: Style,
    pub offline_badge: Style,
    pub status_info: Style,
    pub status_error: Style,

    // Diff content
    pub line_number: Style,
    pub line_added: Style,
    pub line_removed: Style,
    pub line_context: Style,
    pub gutter_added: Style,
    pub gutter_removed: Style,
    pub gutter_context: Style,

    // File headers
    pub file_header: Style,
    pub hunk_header: Style,
    pub binary_note: Style,

    // Stats
    pub stats_added: Style,
    pub stats_removed: Style,

    // Lists
    pub sidebar_normal: Style,
    pub sidebar_cursor: Style,
    pub sidebar_hidden: Style,
    pub sidebar_hidden_cursor: Style,
    pub folder_icon: Style,

    // Refs and commits
    pub ref_current: Style,
    pub ref_remote: Style,
    pub ref_tag: Style,
    pub hash: Style,
    pub date: Style,
    pub mark_from: Style,
    pub mark_to: Style,

    // Borders
    pub border: Style,
    pub border_focus: Style,

    // Popup
    pub popup: Style,
    pub popup_title: Style,

    // Help
    pub help_key: Style,
    pub help_desc: Style,
}

impl Default for Styles {
    fn default() -> Self {
        Self::new()
    }
}

impl Styles {
    /// Create a new Styles instance with default values
    pub fn new() -> Self {
        Self {
            // Header/Footer
            header: Style::default()
                .bg(colors::HEADER_BG)
                .fg(colors::HEADER_FG),
            footer: Style::default()
                .bg(colors::FOOTER_BG)
                .fg(colors::FOOTER_FG),
            footer_key: Style::default()
                .fg(colors::HEADER_FG)
                .add_modifier(Modifier::BOLD),
            offline_badge: Style::default()
                .bg(colors::OFFLINE_BG)
                .fg(colors::FG)
                .add_modifier(Modifier::BOLD),
            status_info: Style::default()
                .bg(colors::FOOTER_BG)
                .fg(colors::STATUS_INFO),
            status_error: Style::default()
                .bg(colors::FOOTER_BG)
                .fg(colors::STATUS_ERROR)
                .add_modifier(Modifier::BOLD),

            // Diff content
            line_number: Style::default().fg(colors::LINE_NUMBER),
            line_added: Style::default()
                .bg(colors::ADDED_BG)
                .fg(colors::ADDED_FG),
            line_removed: Style::default()
                .bg(colors::REMOVED_BG)
                .fg(colors::REMOVED_FG),
            line_context: Style::default().fg(colors::FG),
            gutter_added: Style::default().fg(colors::GUTTER_ADDED),
            gutter_removed: Style::default().fg(colors::GUTTER_REMOVED),
            gutter_context: Style::default().fg(colors::GUTTER_CONTEXT),

            // File headers
            file_header: Style::default()
                .bg(colors::FILE_HEADER_BG)
                .fg(colors::FILE_HEADER_FG)
                .add_modifier(Modifier::BOLD),
            hunk_header: Style::default()
                .fg(colors::HUNK_HEADER_FG)
                .add_modifier(Modifier::ITALIC),
            binary_note: Style::default()
                .fg(colors::DIM)
                .add_modifier(Modifier::ITALIC),

            // Stats
            stats_added: Style::default()
                .fg(colors::STATS_ADDED)
                .add_modifier(Modifier::BOLD),
            stats_removed: Style::default()
                .fg(colors::STATS_REMOVED)
                .add_modifier(Modifier::BOLD),

            // Lists
            sidebar_normal: Style::default().fg(colors::FG),
            sidebar_cursor: Style::default()
                .bg(colors::CURSOR_BG)
                .fg(colors::FG)
                .add_modifier(Modifier::BOLD),
            sidebar_hidden: Style::default().fg(colors::DIM),
            sidebar_hidden_cursor: Style::default()
                .bg(colors::CURSOR_BG)
                .fg(colors::DIM),
            folder_icon: Style::default().fg(colors::DIM),

            // Refs and commits
            ref_current: Style::default()
                .fg(colors::REF_CURRENT)
                .add_modifier(Modifier::BOLD),
            ref_remote: Style::default().fg(colors::REF_REMOTE),
            ref_tag: Style::default().fg(colors::REF_TAG),
            hash: Style::default().fg(colors::HASH),
            date: Style::default().fg(colors::DATE),
            mark_from: Style::default()
                .fg(colors::MARK_FROM)
                .add_modifier(Modifier::BOLD),
            mark_to: Style::default()
                .fg(colors::MARK_TO)
                .add_modifier(Modifier::BOLD),

            // Borders
            border: Style::default().fg(colors::BORDER),
            border_focus: Style::default().fg(colors::BORDER_FOCUS),

            // Popup
            popup: Style::default().bg(colors::POPUP_BG).fg(colors::FG),
            popup_title: Style::default()
                .fg(colors::POPUP_BORDER)
                .add_modifier(Modifier::BOLD),

            // Help
            help_key: Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
            help_desc: Style::default().fg(colors::DIM),
        }
    }
}
