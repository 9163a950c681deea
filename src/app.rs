//! Main application struct and event loop
//!
//! Contains the App struct with all application state, and the main
//! event loop for handling input and rendering. Repository work goes
//! through [`RepoService`] on a runtime owned by the app.

use std::collections::{HashMap, HashSet};
use std::io;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    widgets::Widget,
};
use tokio::runtime::Runtime;
use tracing::{info, warn};

use crate::config::Config;
use crate::git::{Commit, DiffFile, RepoService, RepositorySnapshot, total_stats};
use crate::syntax::{Highlighter, detect_language};
use crate::ui::{
    CommitList, DiffContent, DiffMode, FocusArea, Footer, Header, RefEntry, RefKind, RefList,
    Sidebar, StatusMessage, Styles, TreeNode, build_file_tree, calculate_total_lines,
    file_line_count, flatten_tree, is_hidden_file, ref_entries, render_help_popup,
    sidebar::{DEFAULT_SIDEBAR_WIDTH, MAX_SIDEBAR_WIDTH, MIN_SIDEBAR_WIDTH, SIDEBAR_RESIZE_STEP},
};

const MOUSE_SCROLL_LINES: i32 = 5;
const ALL_COMMITS: &str = "All commits";

/// Which screen is showing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    /// Refs on the left, commits on the right
    History,
    /// File tree on the left, diff on the right
    Diff,
}

/// Two commits picked for comparison, kept for the whole session
///
/// The first mark is the old side, the second the new side. Marking a
/// third commit starts a new pair; marking a marked commit unmarks it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComparePair {
    from: Option<String>,
    to: Option<String>,
}

impl ComparePair {
    pub fn mark(&mut self, hash: &str) {
        if self.from.as_deref() == Some(hash) {
            self.from = self.to.take();
        } else if self.to.as_deref() == Some(hash) {
            self.to = None;
        } else if self.from.is_none() {
            self.from = Some(hash.to_string());
        } else if self.to.is_none() {
            self.to = Some(hash.to_string());
        } else {
            self.from = Some(hash.to_string());
            self.to = None;
        }
    }

    pub fn clear(&mut self) {
        self.from = None;
        self.to = None;
    }

    pub fn is_empty(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }

    pub fn from(&self) -> Option<&str> {
        self.from.as_deref()
    }

    pub fn to(&self) -> Option<&str> {
        self.to.as_deref()
    }

    /// Both sides, once two commits are marked
    pub fn range(&self) -> Option<(&str, &str)> {
        Some((self.from.as_deref()?, self.to.as_deref()?))
    }
}

/// Main application state
pub struct App {
    // Window height
    height: u16,

    // Repository
    runtime: Runtime,
    service: RepoService,
    snapshot: RepositorySnapshot,

    // Refs
    refs: Vec<RefEntry>,
    ref_cursor: usize,
    ref_scroll: usize,

    // Commits
    commits: Vec<Commit>,
    commits_title: String,
    commit_cursor: usize,
    commit_scroll: usize,
    pair: ComparePair,

    // Diffs
    diffs: Vec<DiffFile>,
    visible_diffs: Vec<usize>, // Indices into diffs
    collapsed: HashSet<String>,
    compared: Option<String>,

    // File tree
    file_tree: Vec<TreeNode>,
    expanded_folders: HashMap<String, bool>,

    // View state
    screen: Screen,
    show_help: bool,
    diff_mode: DiffMode,
    focus: FocusArea,
    sidebar_width: u16,

    // Scroll positions
    content_scroll: usize,
    sidebar_scroll: usize,
    file_cursor: usize,

    // Options
    show_hidden: bool,

    // Number prefix for vim-style jumps
    number_prefix: Option<usize>,

    // Styling and highlighting
    styles: Styles,
    highlighter: Highlighter,

    status: Option<StatusMessage>,
}

impl App {
    /// Create the app and load the initial snapshot
    pub fn new(service: RepoService, config: &Config) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .context("Failed to start async runtime")?;

        let snapshot = match runtime.block_on(service.snapshot()) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                runtime.shutdown_background();
                return Err(anyhow::Error::new(e).context("Failed to read repository"));
            }
        };

        let mut app = Self {
            height: 0,
            runtime,
            service,
            refs: ref_entries(&snapshot),
            commits: snapshot.commits.clone(),
            snapshot,
            ref_cursor: 0,
            ref_scroll: 0,
            commits_title: ALL_COMMITS.to_string(),
            commit_cursor: 0,
            commit_scroll: 0,
            pair: ComparePair::default(),
            diffs: Vec::new(),
            visible_diffs: Vec::new(),
            collapsed: HashSet::new(),
            compared: None,
            file_tree: Vec::new(),
            expanded_folders: HashMap::new(),
            screen: Screen::History,
            show_help: false,
            diff_mode: config.diff_mode,
            focus: FocusArea::Sidebar,
            sidebar_width: DEFAULT_SIDEBAR_WIDTH,
            content_scroll: 0,
            sidebar_scroll: 0,
            file_cursor: 0,
            show_hidden: config.show_hidden,
            number_prefix: None,
            styles: Styles::new(),
            highlighter: Highlighter::new(),
            status: None,
        };

        if app.snapshot.is_offline {
            app.status = Some(StatusMessage::info("Remotes unreachable, showing local data"));
        }

        Ok(app)
    }

    /// Run the application
    pub fn run(&mut self) -> Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let result = self.event_loop(&mut terminal);

        // Restore the terminal even when the loop failed
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
        terminal.show_cursor()?;

        result
    }

    /// Stop the runtime without waiting for a fetch that outlived its timeout
    pub fn shutdown(self) {
        self.runtime.shutdown_background();
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
        loop {
            terminal.draw(|frame| {
                self.height = frame.area().height;
                self.render(frame);
            })?;

            if event::poll(Duration::from_millis(100))? {
                match event::read()? {
                    Event::Key(key) => {
                        if self.handle_key(key) {
                            return Ok(());
                        }
                    }
                    Event::Mouse(mouse) => self.handle_mouse(mouse),
                    Event::Resize(_, h) => self.height = h,
                    _ => {}
                }
            }
        }
    }

    // ----- Rendering -----

    fn render(&mut self, frame: &mut Frame) {
        let area = frame.area();
        self.draw(frame.buffer_mut(), area);
    }

    fn draw(&mut self, buf: &mut Buffer, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(0),
                Constraint::Length(1),
            ])
            .split(area);

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(self.sidebar_width), Constraint::Min(0)])
            .split(chunks[1]);

        self.draw_header(buf, chunks[0]);
        match self.screen {
            Screen::History => self.draw_history(buf, columns[0], columns[1]),
            Screen::Diff => self.draw_diff(buf, columns[0], columns[1]),
        }
        self.draw_footer(buf, chunks[2]);

        if self.show_help {
            render_help_popup(buf, area, &self.styles);
        }
    }

    fn draw_header(&self, buf: &mut Buffer, area: Rect) {
        let (viewing, commit_count, (added, removed), current_file) = match self.screen {
            Screen::History => (Some(self.commits_title.as_str()), self.commits.len(), (0, 0), None),
            Screen::Diff => (
                self.compared.as_deref(),
                0,
                total_stats(&self.diffs),
                self.current_file()
                    .map(|path| format!("{} · {}", path, detect_language(path))),
            ),
        };

        Header {
            current_branch: &self.snapshot.current_branch,
            viewing,
            commit_count,
            added,
            removed,
            offline: self.snapshot.is_offline,
            current_file: current_file.as_deref(),
            styles: &self.styles,
        }
        .render(area, buf);
    }

    fn draw_history(&self, buf: &mut Buffer, left: Rect, right: Rect) {
        RefList {
            entries: &self.refs,
            cursor: self.ref_cursor,
            scroll: self.ref_scroll,
            focused: self.focus == FocusArea::Sidebar,
            styles: &self.styles,
        }
        .render(left, buf);

        CommitList {
            title: &self.commits_title,
            commits: &self.commits,
            cursor: self.commit_cursor,
            scroll: self.commit_scroll,
            focused: self.focus == FocusArea::Content,
            from: self.pair.from(),
            to: self.pair.to(),
            styles: &self.styles,
        }
        .render(right, buf);
    }

    fn draw_diff(&mut self, buf: &mut Buffer, left: Rect, right: Rect) {
        let nodes = flatten_tree(&self.file_tree);
        let hidden_count = self.diffs.len() - self.visible_diffs.len();

        Sidebar {
            nodes: &nodes,
            cursor: self.file_cursor,
            scroll: self.sidebar_scroll,
            hidden_count,
            focused: self.focus == FocusArea::Sidebar,
            styles: &self.styles,
        }
        .render(left, buf);

        let visible: Vec<&DiffFile> = self
            .visible_diffs
            .iter()
            .filter_map(|&i| self.diffs.get(i))
            .collect();

        DiffContent {
            diffs: &visible,
            collapsed: &self.collapsed,
            scroll: self.content_scroll,
            mode: self.diff_mode,
            highlighter: &mut self.highlighter,
            styles: &self.styles,
        }
        .render(right, buf);
    }

    fn draw_footer(&self, buf: &mut Buffer, area: Rect) {
        let hidden = if self.show_hidden { "hide" } else { "show all" };
        let history_hints = [
            ("Enter", "open"),
            ("Space", "mark"),
            ("o", "checkout"),
            ("r", "refresh"),
            ("Tab", "focus"),
            ("?", "help"),
            ("q", "quit"),
        ];
        let diff_hints = [
            ("j/k", "scroll"),
            ("n/N", "file"),
            ("u", self.diff_mode.label()),
            ("h", hidden),
            ("Esc", "back"),
            ("?", "help"),
            ("q", "quit"),
        ];

        let hints: &[(&str, &str)] = match self.screen {
            Screen::History => &history_hints,
            Screen::Diff => &diff_hints,
        };

        Footer {
            focus: self.focus,
            hints,
            status: self.status.as_ref(),
            styles: &self.styles,
        }
        .render(area, buf);
    }

    // ----- Repository actions -----

    /// Rebuild the snapshot, keeping the ref cursor on the same ref
    fn refresh(&mut self) {
        let selected = self.refs.get(self.ref_cursor).map(|e| e.label.clone());

        match self.runtime.block_on(self.service.snapshot()) {
            Ok(snapshot) => {
                self.set_snapshot(snapshot);
                if let Some(label) = selected {
                    if let Some(index) = self.refs.iter().position(|e| e.label == label) {
                        self.set_ref_cursor(index);
                    }
                }
                self.status = Some(if self.snapshot.is_offline {
                    StatusMessage::info("Refreshed (offline)")
                } else {
                    StatusMessage::info("Refreshed")
                });
            }
            Err(e) => {
                warn!(error = %e, "snapshot refresh failed");
                self.status = Some(StatusMessage::error(format!("Refresh failed: {e}")));
            }
        }
    }

    fn set_snapshot(&mut self, snapshot: RepositorySnapshot) {
        self.refs = ref_entries(&snapshot);
        if self.commits_title == ALL_COMMITS {
            self.commits = snapshot.commits.clone();
            self.clamp_commit_cursor();
        }
        self.snapshot = snapshot;
        self.set_ref_cursor(self.ref_cursor);
    }

    /// Show the commits of the ref under the cursor
    fn open_selected_ref(&mut self) {
        let Some(entry) = self.refs.get(self.ref_cursor).cloned() else {
            return;
        };

        let commits = match &entry.id {
            None => Ok(self.snapshot.commits.clone()),
            Some(id) => self.runtime.block_on(self.service.branch_commits(id)),
        };

        match commits {
            Ok(commits) => {
                info!(selected = %entry.label, count = commits.len(), "loaded commits");
                self.commits = commits;
                self.commits_title = entry.label;
                self.commit_cursor = 0;
                self.commit_scroll = 0;
                self.focus = FocusArea::Content;
            }
            Err(e) => {
                warn!(selected = %entry.label, error = %e, "loading commits failed");
                self.status = Some(StatusMessage::error(format!(
                    "Cannot list {}: {e}",
                    entry.label
                )));
            }
        }
    }

    fn checkout_selected_ref(&mut self) {
        let Some(entry) = self.refs.get(self.ref_cursor).cloned() else {
            return;
        };
        let (RefKind::Remote, Some(id)) = (entry.kind, entry.id.as_deref()) else {
            self.status = Some(StatusMessage::error("Only remote branches can be checked out"));
            return;
        };

        match self.runtime.block_on(self.service.checkout_remote_branch(id)) {
            Ok(outcome) => match outcome.snapshot {
                Some(snapshot) if outcome.success => {
                    self.set_snapshot(snapshot);
                    self.status = Some(StatusMessage::info(format!(
                        "Checked out {}",
                        self.snapshot.current_branch
                    )));
                }
                _ => {
                    self.status = Some(StatusMessage::error(format!(
                        "Checkout of {} failed, see log",
                        entry.label
                    )));
                }
            },
            Err(e) => {
                warn!(error = %e, "snapshot after checkout failed");
                self.status = Some(StatusMessage::error(format!("Checkout: {e}")));
            }
        }
    }

    /// Revisions to compare: the marked pair, the first mark against the
    /// cursor, or the cursor commit against its first parent
    fn comparison_target(&self) -> Option<(String, String)> {
        if let Some((from, to)) = self.pair.range() {
            return Some((from.to_string(), to.to_string()));
        }

        let cursor = self.commits.get(self.commit_cursor)?;
        match self.pair.from() {
            Some(from) if from != cursor.hash => Some((from.to_string(), cursor.hash.clone())),
            _ => Some((format!("{}~1", cursor.hash), cursor.hash.clone())),
        }
    }

    fn compare_selection(&mut self) {
        let Some((from, to)) = self.comparison_target() else {
            return;
        };

        match self.runtime.block_on(self.service.compare(&from, &to)) {
            Ok(files) if files.is_empty() => {
                self.status = Some(StatusMessage::info(format!(
                    "No differences between {} and {}",
                    abbreviate(&from),
                    abbreviate(&to)
                )));
            }
            Ok(files) => {
                info!(from = %from, to = %to, files = files.len(), "showing comparison");
                self.show_diff(&from, &to, files);
            }
            Err(e) => {
                warn!(from = %from, to = %to, error = %e, "comparison failed");
                self.status = Some(StatusMessage::error(e.to_string()));
            }
        }
    }

    fn show_diff(&mut self, from: &str, to: &str, files: Vec<DiffFile>) {
        self.diffs = files;
        self.collapsed.clear();
        self.expanded_folders.clear();
        self.compared = Some(format!("{}..{}", abbreviate(from), abbreviate(to)));

        self.update_visible_diffs();
        self.highlighter.prime(&self.diffs);

        self.content_scroll = 0;
        self.file_cursor = 0;
        self.sidebar_scroll = 0;
        self.screen = Screen::Diff;
        self.focus = FocusArea::Content;
    }

    // ----- Input -----

    /// Handle keyboard input. Returns true if app should quit.
    fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.kind != KeyEventKind::Press {
            return false;
        }
        self.status = None;

        if self.show_help {
            if matches!(key.code, KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('?')) {
                self.show_help = false;
            }
            return false;
        }

        match (key.code, key.modifiers) {
            (KeyCode::Char('q'), _) => return true,
            (KeyCode::Char('?'), _) => {
                self.show_help = true;
                return false;
            }
            (KeyCode::Tab, _) => {
                self.focus = match self.focus {
                    FocusArea::Content => FocusArea::Sidebar,
                    FocusArea::Sidebar => FocusArea::Content,
                };
                return false;
            }
            (KeyCode::Char('['), _) => {
                self.sidebar_width = self
                    .sidebar_width
                    .saturating_sub(SIDEBAR_RESIZE_STEP)
                    .max(MIN_SIDEBAR_WIDTH);
                return false;
            }
            (KeyCode::Char(']'), _) => {
                self.sidebar_width = (self.sidebar_width + SIDEBAR_RESIZE_STEP).min(MAX_SIDEBAR_WIDTH);
                return false;
            }
            _ => {}
        }

        match self.screen {
            Screen::History => self.handle_history_key(key),
            Screen::Diff => self.handle_diff_key(key),
        }
        false
    }

    /// Handle keys on the history screen
    fn handle_history_key(&mut self, key: KeyEvent) {
        let page = (self.list_height() / 2).max(1) as i32;

        match (key.code, key.modifiers) {
            (KeyCode::Char('j') | KeyCode::Down, _) => self.move_list_cursor(1),
            (KeyCode::Char('k') | KeyCode::Up, _) => self.move_list_cursor(-1),
            (KeyCode::Char('d'), KeyModifiers::CONTROL) => self.move_list_cursor(page),
            (KeyCode::Char('u'), KeyModifiers::CONTROL) => self.move_list_cursor(-page),
            (KeyCode::Char('g'), _) => self.move_list_cursor(i32::MIN),
            (KeyCode::Char('G'), _) => self.move_list_cursor(i32::MAX),

            (KeyCode::Enter, _) => match self.focus {
                FocusArea::Sidebar => self.open_selected_ref(),
                FocusArea::Content => self.compare_selection(),
            },
            (KeyCode::Char(' '), _) => {
                if let Some(commit) = self.commits.get(self.commit_cursor) {
                    self.pair.mark(&commit.hash);
                }
            }
            (KeyCode::Esc, _) => {
                if !self.pair.is_empty() {
                    self.pair.clear();
                    self.status = Some(StatusMessage::info("Marks cleared"));
                }
            }
            (KeyCode::Char('o'), _) => self.checkout_selected_ref(),
            (KeyCode::Char('r'), _) => self.refresh(),
            _ => {}
        }
    }

    /// Handle keys in diff view
    fn handle_diff_key(&mut self, key: KeyEvent) {
        if let KeyCode::Char(c) = key.code {
            if let Some(digit) = c.to_digit(10) {
                self.number_prefix = Some(self.number_prefix.unwrap_or(0) * 10 + digit as usize);
                return;
            }
        }

        let (count, had_prefix) = match self.number_prefix.take() {
            Some(value) => (value, true),
            None => (1, false),
        };

        match (key.code, key.modifiers) {
            (KeyCode::Esc, _) => {
                self.screen = Screen::History;
                self.focus = FocusArea::Content;
            }

            // Navigation
            (KeyCode::Char('j') | KeyCode::Down, _) => {
                if self.focus == FocusArea::Sidebar {
                    self.move_sidebar_cursor(count as i32);
                } else {
                    self.scroll_content(count as i32);
                }
            }
            (KeyCode::Char('k') | KeyCode::Up, _) => {
                if self.focus == FocusArea::Sidebar {
                    self.move_sidebar_cursor(-(count as i32));
                } else {
                    self.scroll_content(-(count as i32));
                }
            }
            (KeyCode::Char('d'), KeyModifiers::CONTROL) => {
                let page = (self.height / 2) as i32;
                if self.focus == FocusArea::Sidebar {
                    self.scroll_sidebar(page * count as i32);
                } else {
                    self.scroll_content(page * count as i32);
                }
            }
            (KeyCode::Char('u'), KeyModifiers::CONTROL) => {
                let page = (self.height / 2) as i32;
                if self.focus == FocusArea::Sidebar {
                    self.scroll_sidebar(-page * count as i32);
                } else {
                    self.scroll_content(-page * count as i32);
                }
            }
            (KeyCode::Char('g'), _) => {
                if self.focus == FocusArea::Sidebar {
                    self.set_sidebar_cursor(0);
                } else {
                    self.content_scroll = 0;
                }
            }
            (KeyCode::Char('G'), _) => {
                if self.focus == FocusArea::Sidebar {
                    let total = self.sidebar_len();
                    let target = if had_prefix { count.saturating_sub(1) } else { total };
                    self.set_sidebar_cursor(target);
                } else if had_prefix {
                    self.content_scroll = count.saturating_sub(1).min(self.max_scroll());
                } else {
                    self.content_scroll = self.max_scroll();
                }
            }
            (KeyCode::Char('n'), _) => {
                for _ in 0..count {
                    self.next_file();
                }
            }
            (KeyCode::Char('N'), _) => {
                for _ in 0..count {
                    self.prev_file();
                }
            }

            // View toggles
            (KeyCode::Char('u'), KeyModifiers::NONE) => {
                self.diff_mode = self.diff_mode.toggle();
            }
            (KeyCode::Char('h'), KeyModifiers::NONE) => {
                self.show_hidden = !self.show_hidden;
                self.update_visible_diffs();
            }
            (KeyCode::Char(' '), _) => {
                if self.focus == FocusArea::Sidebar {
                    self.toggle_sidebar_node();
                } else {
                    self.toggle_current_file();
                }
            }
            (KeyCode::Enter, _) => {
                if self.focus == FocusArea::Sidebar {
                    self.jump_to_sidebar_selection();
                }
            }
            (KeyCode::Char('z'), _) => self.toggle_all_files(),

            _ => {}
        }
    }

    /// Handle mouse input
    fn handle_mouse(&mut self, mouse: MouseEvent) {
        let in_sidebar = mouse.column < self.sidebar_width;
        match mouse.kind {
            MouseEventKind::ScrollDown | MouseEventKind::ScrollUp => {
                let delta = if mouse.kind == MouseEventKind::ScrollDown {
                    MOUSE_SCROLL_LINES
                } else {
                    -MOUSE_SCROLL_LINES
                };
                match (self.screen, in_sidebar) {
                    (Screen::Diff, true) => self.scroll_sidebar(delta),
                    (Screen::Diff, false) => self.scroll_content(delta),
                    (Screen::History, true) => self.move_ref_cursor(delta),
                    (Screen::History, false) => self.move_commit_cursor(delta),
                }
            }
            MouseEventKind::Down(MouseButton::Left) => {
                if in_sidebar {
                    self.focus = FocusArea::Sidebar;
                    if self.screen == Screen::Diff {
                        self.handle_sidebar_click(mouse.row);
                    }
                } else {
                    self.focus = FocusArea::Content;
                }
            }
            _ => {}
        }
    }

    // ----- History lists -----

    /// Rows available inside a bordered list
    fn list_height(&self) -> usize {
        self.height.saturating_sub(2).saturating_sub(2) as usize
    }

    fn move_list_cursor(&mut self, delta: i32) {
        match self.focus {
            FocusArea::Sidebar => self.move_ref_cursor(delta),
            FocusArea::Content => self.move_commit_cursor(delta),
        }
    }

    fn move_ref_cursor(&mut self, delta: i32) {
        let target = offset(self.ref_cursor, delta);
        self.set_ref_cursor(target);
    }

    fn set_ref_cursor(&mut self, index: usize) {
        let visible = self.list_height();
        self.ref_cursor = index.min(self.refs.len().saturating_sub(1));
        self.ref_scroll = follow(self.ref_cursor, self.ref_scroll, visible, self.refs.len());
    }

    fn move_commit_cursor(&mut self, delta: i32) {
        self.commit_cursor = offset(self.commit_cursor, delta);
        self.clamp_commit_cursor();
    }

    fn clamp_commit_cursor(&mut self) {
        let visible = self.list_height();
        self.commit_cursor = self.commit_cursor.min(self.commits.len().saturating_sub(1));
        self.commit_scroll = follow(
            self.commit_cursor,
            self.commit_scroll,
            visible,
            self.commits.len(),
        );
    }

    // ----- Diff view -----

    /// Update the list of visible diff indices (respecting hidden filter)
    fn update_visible_diffs(&mut self) {
        self.visible_diffs = self
            .diffs
            .iter()
            .enumerate()
            .filter(|(_, d)| self.show_hidden || !is_hidden_file(&d.path))
            .map(|(i, _)| i)
            .collect();

        self.rebuild_file_tree();
        self.set_sidebar_cursor(self.file_cursor);
        self.content_scroll = self.content_scroll.min(self.max_scroll());
    }

    fn visible(&self) -> Vec<&DiffFile> {
        self.visible_diffs
            .iter()
            .filter_map(|&i| self.diffs.get(i))
            .collect()
    }

    fn rebuild_file_tree(&mut self) {
        let visible: Vec<&DiffFile> = self
            .visible_diffs
            .iter()
            .filter_map(|&i| self.diffs.get(i))
            .collect();
        self.file_tree = build_file_tree(&visible, &self.expanded_folders);
    }

    fn line_count(&self, diff: &DiffFile) -> usize {
        file_line_count(diff, self.collapsed.contains(&diff.path))
    }

    /// Get the file at the current scroll position
    fn current_file(&self) -> Option<&str> {
        let mut line = 0;
        for diff in self.visible() {
            let file_lines = self.line_count(diff);
            if line + file_lines > self.content_scroll {
                return Some(diff.path.as_str());
            }
            line += file_lines;
        }
        None
    }

    /// Scroll content by delta lines
    fn scroll_content(&mut self, delta: i32) {
        self.content_scroll = offset(self.content_scroll, delta).min(self.max_scroll());
    }

    /// Get maximum scroll position
    fn max_scroll(&self) -> usize {
        let total_lines = calculate_total_lines(&self.visible(), &self.collapsed);
        total_lines.saturating_sub(self.height.saturating_sub(2) as usize)
    }

    /// Line where each visible file starts
    fn file_starts(&self) -> Vec<usize> {
        let mut starts = Vec::new();
        let mut line = 0;
        for diff in self.visible() {
            starts.push(line);
            line += self.line_count(diff);
        }
        starts
    }

    /// Navigate to next file
    fn next_file(&mut self) {
        if let Some(&start) = self.file_starts().iter().find(|&&s| s > self.content_scroll) {
            self.content_scroll = start.min(self.max_scroll());
        }
    }

    /// Navigate to previous file
    fn prev_file(&mut self) {
        self.content_scroll = self
            .file_starts()
            .into_iter()
            .rev()
            .find(|&s| s < self.content_scroll)
            .unwrap_or(0);
    }

    fn toggle_collapsed(&mut self, path: &str) {
        if !self.collapsed.remove(path) {
            self.collapsed.insert(path.to_string());
        }
        self.content_scroll = self.content_scroll.min(self.max_scroll());
    }

    /// Toggle collapse on current file
    fn toggle_current_file(&mut self) {
        if let Some(path) = self.current_file().map(str::to_string) {
            self.toggle_collapsed(&path);
        }
    }

    /// Toggle collapse on all files
    fn toggle_all_files(&mut self) {
        let paths: Vec<String> = self.visible().iter().map(|d| d.path.clone()).collect();
        if paths.iter().all(|p| self.collapsed.contains(p)) {
            self.collapsed.clear();
        } else {
            self.collapsed.extend(paths);
        }
        self.content_scroll = self.content_scroll.min(self.max_scroll());
    }

    fn sidebar_len(&self) -> usize {
        flatten_tree(&self.file_tree).len()
    }

    fn set_sidebar_cursor(&mut self, index: usize) {
        let total = self.sidebar_len();
        let visible = self.list_height();
        self.file_cursor = index.min(total.saturating_sub(1));
        self.sidebar_scroll = follow(self.file_cursor, self.sidebar_scroll, visible, total);
    }

    fn move_sidebar_cursor(&mut self, delta: i32) {
        self.set_sidebar_cursor(offset(self.file_cursor, delta));
    }

    fn scroll_sidebar(&mut self, delta: i32) {
        let total = self.sidebar_len();
        let visible = self.list_height();
        let max_scroll = total.saturating_sub(visible);
        self.sidebar_scroll = offset(self.sidebar_scroll, delta).min(max_scroll);
    }

    fn toggle_folder(&mut self, path: String) {
        let expanded = self.expanded_folders.entry(path.clone()).or_insert(true);
        *expanded = !*expanded;
        self.rebuild_file_tree();
        self.restore_sidebar_cursor(&path);
    }

    fn toggle_sidebar_node(&mut self) {
        let nodes = flatten_tree(&self.file_tree);
        let Some(node) = nodes.get(self.file_cursor) else {
            return;
        };

        let path = node.path.clone();
        if node.is_folder {
            self.toggle_folder(path);
        } else {
            self.toggle_collapsed(&path);
        }
    }

    fn restore_sidebar_cursor(&mut self, path: &str) {
        let index = flatten_tree(&self.file_tree)
            .iter()
            .position(|node| node.path == path)
            .unwrap_or(self.file_cursor);
        self.set_sidebar_cursor(index);
    }

    fn jump_to_sidebar_selection(&mut self) {
        let nodes = flatten_tree(&self.file_tree);
        let Some(node) = nodes.get(self.file_cursor) else {
            return;
        };

        if node.is_folder {
            if !node.expanded {
                let path = node.path.clone();
                self.toggle_folder(path);
            }
            return;
        }

        if let Some(index) = node.diff_index {
            self.scroll_to_diff_index(index);
        }
    }

    fn handle_sidebar_click(&mut self, row: u16) {
        // Header row, then the sidebar border
        let inner_top = 2u16;
        let index = match row.checked_sub(inner_top) {
            Some(row) if (row as usize) < self.list_height() => self.sidebar_scroll + row as usize,
            _ => return,
        };

        let nodes = flatten_tree(&self.file_tree);
        let Some(node) = nodes.get(index) else {
            return;
        };
        let (path, is_folder, diff_index) = (node.path.clone(), node.is_folder, node.diff_index);

        self.set_sidebar_cursor(index);
        if is_folder {
            self.toggle_folder(path);
        } else if let Some(diff_index) = diff_index {
            self.scroll_to_diff_index(diff_index);
        }
    }

    /// Scroll to a file, by its position among the visible files
    fn scroll_to_diff_index(&mut self, visible_index: usize) {
        if let Some(&start) = self.file_starts().get(visible_index) {
            self.content_scroll = start.min(self.max_scroll());
        }
    }
}

/// Move an index by a signed delta without leaving `usize`
fn offset(index: usize, delta: i32) -> usize {
    if delta >= 0 {
        index.saturating_add(delta as usize)
    } else {
        index.saturating_sub(delta.unsigned_abs() as usize)
    }
}

/// Scroll offset that keeps `cursor` inside a window of `visible` rows
fn follow(cursor: usize, scroll: usize, visible: usize, total: usize) -> usize {
    if visible == 0 {
        return 0;
    }
    let scroll = if cursor < scroll {
        cursor
    } else if cursor >= scroll + visible {
        cursor + 1 - visible
    } else {
        scroll
    };
    scroll.min(total.saturating_sub(visible))
}

/// Shorten full hashes, keeping any `~n` suffix
fn abbreviate(rev: &str) -> String {
    let (hash, suffix) = rev.split_at(rev.find('~').unwrap_or(rev.len()));
    if hash.len() == 40 && hash.chars().all(|c| c.is_ascii_hexdigit()) {
        format!("{}{}", &hash[..7], suffix)
    } else {
        rev.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Instant;

    use crate::git::ServiceOptions;

    use crate::git::fake::{C1, C2, F1, F2, FakeRepo};
    use pretty_assertions::assert_eq;

    const DIFF: &str = "\
diff --git a/.gitignore b/.gitignore
--- a/.gitignore
+++ b/.gitignore
@@ -1 +1,2 @@
 target
+*.log
diff --git a/src/main.rs b/src/main.rs
--- a/src/main.rs
+++ b/src/main.rs
@@ -1,2 +1,2 @@
 fn main() {
-    old();
+    new();
";

    fn app_with(fake: FakeRepo) -> (App, Arc<FakeRepo>) {
        let fake = Arc::new(fake);
        let config = Config::default();
        let service = RepoService::new(fake.clone(), config.service_options());
        let mut app = App::new(service, &config).unwrap();
        app.height = 30;
        (app, fake)
    }

    fn app() -> (App, Arc<FakeRepo>) {
        let mut fake = FakeRepo::with_main_and_remote();
        fake.diff_text = DIFF.to_string();
        app_with(fake)
    }

    fn press(app: &mut App, code: KeyCode) -> bool {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn hashes(commits: &[Commit]) -> Vec<&str> {
        commits.iter().map(|c| c.hash.as_str()).collect()
    }

    fn ref_index(app: &App, label: &str) -> usize {
        app.refs.iter().position(|e| e.label == label).unwrap()
    }

    #[test]
    fn shutdown_does_not_wait_for_hung_fetch() {
        let mut fake = FakeRepo::with_main_and_remote();
        fake.fetch_delay = Some(Duration::from_secs(3));
        let options = ServiceOptions {
            fetch_timeout: Duration::from_millis(20),
            ..ServiceOptions::default()
        };
        let service = RepoService::new(Arc::new(fake), options);

        let started = Instant::now();
        let app = App::new(service, &Config::default()).unwrap();
        assert!(app.snapshot.is_offline);
        app.shutdown();
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn compare_pair_marks() {
        let mut pair = ComparePair::default();
        assert!(pair.is_empty());

        pair.mark("a");
        assert_eq!((pair.from(), pair.to()), (Some("a"), None));
        assert_eq!(pair.range(), None);

        pair.mark("b");
        assert_eq!(pair.range(), Some(("a", "b")));

        // Unmarking the old side promotes the new side
        pair.mark("a");
        assert_eq!((pair.from(), pair.to()), (Some("b"), None));

        pair.mark("c");
        pair.mark("d");
        assert_eq!((pair.from(), pair.to()), (Some("d"), None));

        pair.clear();
        assert!(pair.is_empty());
    }

    #[test]
    fn abbreviates_hashes() {
        assert_eq!(abbreviate(C1), "1111111");
        assert_eq!(abbreviate(&format!("{F2}~1")), "bbbbbbb~1");
        assert_eq!(abbreviate("main"), "main");
    }

    #[test]
    fn starts_on_all_commits() {
        let (app, _) = app();

        assert_eq!(app.screen, Screen::History);
        assert_eq!(hashes(&app.commits), vec![F2, C2, F1, C1]);
        let labels: Vec<&str> = app.refs.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec![ALL_COMMITS, "main", "origin/feature", "v1"]);
        assert!(!app.snapshot.is_offline);
    }

    #[test]
    fn enter_on_remote_ref_lists_its_commits() {
        let (mut app, _) = app();
        app.set_ref_cursor(ref_index(&app, "origin/feature"));

        press(&mut app, KeyCode::Enter);

        assert_eq!(hashes(&app.commits), vec![F2, F1]);
        assert_eq!(app.commits_title, "origin/feature");
        assert_eq!(app.focus, FocusArea::Content);
    }

    #[test]
    fn unknown_ref_reports_error() {
        let (mut app, _) = app();
        app.refs.push(RefEntry {
            kind: RefKind::Local,
            label: "ghost".to_string(),
            id: Some("ghost".to_string()),
            is_current: false,
        });
        app.set_ref_cursor(app.refs.len() - 1);

        press(&mut app, KeyCode::Enter);

        assert!(app.status.as_ref().unwrap().is_error);
        assert_eq!(app.commits_title, ALL_COMMITS);
    }

    #[test]
    fn marked_pair_opens_diff() {
        let (mut app, _) = app();
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.focus, FocusArea::Content);

        press(&mut app, KeyCode::Char(' '));
        press(&mut app, KeyCode::Char('j'));
        press(&mut app, KeyCode::Char(' '));
        assert_eq!(app.pair.range(), Some((F2, C2)));

        press(&mut app, KeyCode::Enter);

        assert_eq!(app.screen, Screen::Diff);
        assert_eq!(app.compared.as_deref(), Some("bbbbbbb..2222222"));
        assert_eq!(app.diffs.len(), 2);
        // .gitignore is hidden by default
        assert_eq!(app.visible_diffs, vec![1]);
        assert_eq!(app.current_file(), Some("src/main.rs"));

        // Marks survive going back
        press(&mut app, KeyCode::Esc);
        assert_eq!(app.screen, Screen::History);
        assert_eq!(app.pair.range(), Some((F2, C2)));
        press(&mut app, KeyCode::Esc);
        assert!(app.pair.is_empty());
    }

    #[test]
    fn enter_without_marks_compares_with_parent() {
        let (mut app, _) = app();
        app.focus = FocusArea::Content;

        press(&mut app, KeyCode::Enter);

        assert_eq!(app.compared.as_deref(), Some("bbbbbbb~1..bbbbbbb"));
    }

    #[test]
    fn comparison_failure_stays_on_history() {
        let mut fake = FakeRepo::with_main_and_remote();
        fake.diff_error = Some(F2.to_string());
        let (mut app, _) = app_with(fake);
        app.focus = FocusArea::Content;

        press(&mut app, KeyCode::Enter);

        assert_eq!(app.screen, Screen::History);
        assert!(app.status.as_ref().unwrap().is_error);
    }

    #[test]
    fn empty_comparison_is_reported() {
        let (mut app, _) = app_with(FakeRepo::with_main_and_remote());
        app.focus = FocusArea::Content;

        press(&mut app, KeyCode::Enter);

        assert_eq!(app.screen, Screen::History);
        let status = app.status.as_ref().unwrap();
        assert!(!status.is_error);
        assert!(status.text.starts_with("No differences"));
    }

    #[test]
    fn checkout_remote_ref() {
        let (mut app, fake) = app();
        app.set_ref_cursor(ref_index(&app, "origin/feature"));

        press(&mut app, KeyCode::Char('o'));

        assert_eq!(
            fake.checkouts(),
            vec![("feature".to_string(), "origin/feature".to_string())]
        );
        let status = app.status.as_ref().unwrap();
        assert!(!status.is_error);
        assert_eq!(app.refs[app.ref_cursor].label, "origin/feature");
    }

    #[test]
    fn checkout_local_ref_is_refused() {
        let (mut app, fake) = app();
        app.set_ref_cursor(ref_index(&app, "main"));

        press(&mut app, KeyCode::Char('o'));

        assert!(fake.checkouts().is_empty());
        assert!(app.status.as_ref().unwrap().is_error);
    }

    #[test]
    fn failed_checkout_is_reported() {
        let mut fake = FakeRepo::with_main_and_remote();
        fake.checkout_fails = true;
        let (mut app, _) = app_with(fake);
        app.set_ref_cursor(ref_index(&app, "origin/feature"));

        press(&mut app, KeyCode::Char('o'));

        assert!(app.status.as_ref().unwrap().text.contains("failed"));
    }

    #[test]
    fn offline_snapshot_sets_status() {
        let mut fake = FakeRepo::with_main_and_remote();
        fake.fetch_fails = true;
        let (app, _) = app_with(fake);

        assert!(app.snapshot.is_offline);
        assert_eq!(app.refs.iter().filter(|e| e.kind == RefKind::Remote).count(), 0);
        assert!(app.status.is_some());
    }

    #[test]
    fn refresh_keeps_ref_selection() {
        let (mut app, fake) = app();
        app.set_ref_cursor(ref_index(&app, "v1"));

        press(&mut app, KeyCode::Char('r'));

        assert_eq!(app.refs[app.ref_cursor].label, "v1");
        assert_eq!(fake.fetch_calls.load(std::sync::atomic::Ordering::SeqCst), 2);
    }

    #[test]
    fn diff_view_toggles() {
        let (mut app, _) = app();
        app.focus = FocusArea::Content;
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.screen, Screen::Diff);

        assert_eq!(app.diff_mode, DiffMode::SideBySide);
        press(&mut app, KeyCode::Char('u'));
        assert_eq!(app.diff_mode, DiffMode::Unified);

        press(&mut app, KeyCode::Char('h'));
        assert_eq!(app.visible_diffs, vec![0, 1]);
        assert_eq!(app.current_file(), Some(".gitignore"));

        // .gitignore spans header, hunk header and two lines
        assert_eq!(app.file_starts(), vec![0, 4]);

        press(&mut app, KeyCode::Char('z'));
        assert_eq!(app.collapsed.len(), 2);
        assert_eq!(app.file_starts(), vec![0, 1]);
        press(&mut app, KeyCode::Char('z'));
        assert!(app.collapsed.is_empty());

        press(&mut app, KeyCode::Char(' '));
        assert!(app.collapsed.contains(".gitignore"));
    }

    #[test]
    fn next_and_previous_file() {
        let (mut app, _) = app();
        app.show_hidden = true;
        app.height = 4;
        app.focus = FocusArea::Content;
        press(&mut app, KeyCode::Enter);

        // 9 rows in total, 2 visible
        assert_eq!(app.max_scroll(), 7);
        press(&mut app, KeyCode::Char('n'));
        assert_eq!(app.content_scroll, 4);
        assert_eq!(app.current_file(), Some("src/main.rs"));
        press(&mut app, KeyCode::Char('N'));
        assert_eq!(app.content_scroll, 0);
    }

    #[test]
    fn sidebar_navigation_jumps_to_file() {
        let (mut app, _) = app();
        app.show_hidden = true;
        app.height = 4;
        app.focus = FocusArea::Content;
        press(&mut app, KeyCode::Enter);

        press(&mut app, KeyCode::Tab);
        let names: Vec<String> = flatten_tree(&app.file_tree).iter().map(|n| n.path.clone()).collect();
        assert_eq!(names, vec![".gitignore", "src", "src/main.rs"]);

        press(&mut app, KeyCode::Char('G'));
        assert_eq!(app.file_cursor, 2);
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.content_scroll, 4);

        // Collapse the folder from the sidebar
        press(&mut app, KeyCode::Char('k'));
        press(&mut app, KeyCode::Char(' '));
        assert_eq!(app.sidebar_len(), 2);
    }

    #[test]
    fn help_overlay_swallows_keys() {
        let (mut app, _) = app();
        press(&mut app, KeyCode::Char('?'));
        assert!(app.show_help);

        assert!(!press(&mut app, KeyCode::Char('q')));
        assert!(!app.show_help);
        assert!(press(&mut app, KeyCode::Char('q')));
    }

    #[test]
    fn draws_both_screens() {
        let (mut app, _) = app();
        let area = Rect::new(0, 0, 100, 30);

        let mut buf = Buffer::empty(area);
        app.draw(&mut buf, area);
        let header: String = (0..100).map(|x| buf[(x, 0)].symbol()).collect();
        assert!(header.starts_with(" main │ All commits │ [4 commits]"));

        app.focus = FocusArea::Content;
        press(&mut app, KeyCode::Enter);
        let mut buf = Buffer::empty(area);
        app.draw(&mut buf, area);
        let header: String = (0..100).map(|x| buf[(x, 0)].symbol()).collect();
        assert!(header.contains("bbbbbbb~1..bbbbbbb"));
        assert!(header.contains("src/main.rs · Rust"));
    }
}
