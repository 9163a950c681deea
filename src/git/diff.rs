//! Unified diff structuring
//!
//! Turns the patch text produced by the repository into per-file
//! change records with hunks, line numbers and change classification.
//! The parser is a single forward pass and keeps no state between calls.

use std::path::Path;

use tracing::trace;

use super::model::{DiffFile, DiffHunk, DiffLine, FileStatus, LineKind};

/// Marker that opens a new file section
const FILE_MARKER: &str = "diff --git ";
/// Marker that opens a hunk
const HUNK_MARKER: &str = "@@";
/// Placeholder path for the missing side of an add or delete
const DEV_NULL: &str = "/dev/null";

/// Parse patch text into file records, in the order files appear
pub fn parse_unified_diff(text: &str) -> Vec<DiffFile> {
    let mut files = Vec::new();
    let mut current: Option<FileBuilder> = None;

    for line in text.lines() {
        if let Some(rest) = line.strip_prefix(FILE_MARKER) {
            if let Some(file) = current.take() {
                files.push(file.finish());
            }
            current = Some(FileBuilder::from_marker(rest));
            continue;
        }

        // Anything before the first file marker is preamble
        if let Some(file) = current.as_mut() {
            file.push_line(line);
        }
    }

    if let Some(file) = current {
        files.push(file.finish());
    }

    files
}

/// Whether a metadata line says the file content is binary
///
/// This is the only place binary content is detected.
pub fn is_binary_marker(line: &str) -> bool {
    let line = line.trim_end();
    line == "GIT binary patch"
        || (line.starts_with("Binary files ") && line.ends_with(" differ"))
        || (line.starts_with("Files ") && line.ends_with(" differ"))
}

/// Coarse kind of a binary file, derived from its extension
pub fn binary_kind(path: &str) -> String {
    let Some(ext) = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
    else {
        return "binary".to_string();
    };

    let kind = match ext.as_str() {
        "png" | "jpg" | "jpeg" | "gif" | "bmp" | "ico" | "webp" | "tif" | "tiff" | "psd"
        | "heic" | "avif" => "image",
        "pdf" => "pdf",
        "zip" | "gz" | "tgz" | "bz2" | "xz" | "zst" | "7z" | "rar" | "tar" | "jar" => "archive",
        "mp3" | "wav" | "ogg" | "flac" | "aac" | "m4a" => "audio",
        "mp4" | "mov" | "avi" | "mkv" | "webm" => "video",
        "ttf" | "otf" | "woff" | "woff2" | "eot" => "font",
        "exe" | "dll" | "so" | "dylib" | "o" | "a" | "lib" | "bin" | "wasm" | "class" => {
            "executable"
        }
        "db" | "sqlite" | "sqlite3" => "database",
        _ => return ext,
    };

    kind.to_string()
}

/// Running position inside the most recent hunk
#[derive(Debug, Clone, Copy)]
struct HunkCursor {
    old_line: u32,
    new_line: u32,
    old_remaining: u32,
    new_remaining: u32,
    /// False once the header could not be parsed; the body then runs to the next hunk
    bounded: bool,
}

impl HunkCursor {
    fn expects_lines(&self) -> bool {
        !self.bounded || self.old_remaining > 0 || self.new_remaining > 0
    }
}

/// Accumulates one file section
#[derive(Debug, Default)]
struct FileBuilder {
    path: String,
    old_path: String,
    new_file: bool,
    deleted_file: bool,
    renamed: bool,
    is_binary: bool,
    additions: usize,
    deletions: usize,
    hunks: Vec<DiffHunk>,
    cursor: Option<HunkCursor>,
}

impl FileBuilder {
    fn from_marker(rest: &str) -> Self {
        let (old_path, path) = split_marker_paths(rest);
        Self {
            path,
            old_path,
            ..Self::default()
        }
    }

    fn push_line(&mut self, line: &str) {
        if self.is_binary {
            return;
        }

        if line.starts_with(HUNK_MARKER) {
            self.open_hunk(line);
        } else if self.cursor.is_some_and(|c| c.expects_lines()) {
            self.push_content(line);
        } else {
            self.push_metadata(line);
        }
    }

    fn push_metadata(&mut self, line: &str) {
        if line.starts_with("new file mode") {
            self.new_file = true;
        } else if line.starts_with("deleted file mode") {
            self.deleted_file = true;
        } else if let Some(from) = line.strip_prefix("rename from ") {
            self.renamed = true;
            self.old_path = unquote(from);
        } else if let Some(to) = line.strip_prefix("rename to ") {
            self.renamed = true;
            self.path = unquote(to);
        } else if let Some(old) = line.strip_prefix("--- ") {
            if let Some(old) = header_path(old) {
                self.old_path = old;
            }
        } else if let Some(new) = line.strip_prefix("+++ ") {
            if let Some(new) = header_path(new) {
                self.path = new;
            }
        } else if is_binary_marker(line) {
            self.is_binary = true;
            self.cursor = None;
        }
    }

    fn open_hunk(&mut self, line: &str) {
        if let Some(header) = parse_hunk_header(line) {
            self.hunks.push(DiffHunk {
                old_start: header.old_start,
                old_count: header.old_count,
                new_start: header.new_start,
                new_count: header.new_count,
                header_context: header.context,
                lines: Vec::new(),
            });
            self.cursor = Some(HunkCursor {
                old_line: header.old_start.saturating_sub(1),
                new_line: header.new_start.saturating_sub(1),
                old_remaining: header.old_count,
                new_remaining: header.new_count,
                bounded: true,
            });
            return;
        }

        trace!(path = %self.path, line, "passing through unrecognized hunk header");

        match self.cursor.as_mut() {
            Some(cursor) => cursor.bounded = false,
            None => {
                self.hunks.push(DiffHunk {
                    old_start: 0,
                    old_count: 0,
                    new_start: 0,
                    new_count: 0,
                    header_context: None,
                    lines: Vec::new(),
                });
                self.cursor = Some(HunkCursor {
                    old_line: 0,
                    new_line: 0,
                    old_remaining: 0,
                    new_remaining: 0,
                    bounded: false,
                });
            }
        }

        if let Some(hunk) = self.hunks.last_mut() {
            hunk.lines.push(DiffLine {
                kind: LineKind::Header,
                old_line_number: None,
                new_line_number: None,
                text: line.to_string(),
            });
        }
    }

    fn push_content(&mut self, line: &str) {
        // "\ No newline at end of file"
        if line.starts_with('\\') {
            return;
        }

        let (Some(cursor), Some(hunk)) = (self.cursor.as_mut(), self.hunks.last_mut()) else {
            return;
        };

        let diff_line = if let Some(text) = line.strip_prefix('+') {
            cursor.new_line += 1;
            cursor.new_remaining = cursor.new_remaining.saturating_sub(1);
            self.additions += 1;
            DiffLine {
                kind: LineKind::Addition,
                old_line_number: None,
                new_line_number: Some(cursor.new_line),
                text: text.to_string(),
            }
        } else if let Some(text) = line.strip_prefix('-') {
            cursor.old_line += 1;
            cursor.old_remaining = cursor.old_remaining.saturating_sub(1);
            self.deletions += 1;
            DiffLine {
                kind: LineKind::Deletion,
                old_line_number: Some(cursor.old_line),
                new_line_number: None,
                text: text.to_string(),
            }
        } else {
            cursor.old_line += 1;
            cursor.new_line += 1;
            cursor.old_remaining = cursor.old_remaining.saturating_sub(1);
            cursor.new_remaining = cursor.new_remaining.saturating_sub(1);
            DiffLine {
                kind: LineKind::Context,
                old_line_number: Some(cursor.old_line),
                new_line_number: Some(cursor.new_line),
                text: line.strip_prefix(' ').unwrap_or(line).to_string(),
            }
        };

        hunk.lines.push(diff_line);
    }

    fn finish(self) -> DiffFile {
        let status = if self.new_file {
            FileStatus::Added
        } else if self.deleted_file {
            FileStatus::Deleted
        } else if self.renamed {
            FileStatus::Renamed
        } else {
            FileStatus::Modified
        };

        let previous_path = (status == FileStatus::Renamed && self.old_path != self.path)
            .then_some(self.old_path);
        let binary_kind = self.is_binary.then(|| binary_kind(&self.path));

        DiffFile {
            path: self.path,
            previous_path,
            status,
            is_binary: self.is_binary,
            binary_kind,
            additions: self.additions,
            deletions: self.deletions,
            hunks: self.hunks,
        }
    }
}

/// Numeric fields of a `@@ -a,b +c,d @@ context` line
#[derive(Debug, Clone, PartialEq, Eq)]
struct HunkHeader {
    old_start: u32,
    old_count: u32,
    new_start: u32,
    new_count: u32,
    context: Option<String>,
}

fn parse_hunk_header(line: &str) -> Option<HunkHeader> {
    let rest = line.strip_prefix("@@ ")?;
    let (ranges, context) = rest.split_once(" @@")?;

    let mut parts = ranges.split_whitespace();
    let old = parts.next()?.strip_prefix('-')?;
    let new = parts.next()?.strip_prefix('+')?;
    if parts.next().is_some() {
        return None;
    }

    let (old_start, old_count) = parse_range(old)?;
    let (new_start, new_count) = parse_range(new)?;
    let context = context.trim();

    Some(HunkHeader {
        old_start,
        old_count,
        new_start,
        new_count,
        context: (!context.is_empty()).then(|| context.to_string()),
    })
}

/// Parse `start[,count]`, count defaulting to 1
fn parse_range(input: &str) -> Option<(u32, u32)> {
    let (start, count) = match input.split_once(',') {
        Some((start, count)) => (start, Some(count)),
        None => (input, None),
    };
    let start = start.parse::<u32>().ok()?;
    let count = match count {
        Some(count) => count.parse::<u32>().ok()?,
        None => 1,
    };
    Some((start, count))
}

/// Split `a/old b/new` from a file marker line into (old, new)
fn split_marker_paths(rest: &str) -> (String, String) {
    let rest = rest.trim_end();

    if rest.starts_with('"') {
        if let Some((old, remainder)) = take_quoted(rest) {
            let new = remainder.trim_start();
            let new = if new.starts_with('"') {
                take_quoted(new).map(|(n, _)| n).unwrap_or_default()
            } else {
                new.to_string()
            };
            return (strip_side_prefix(&old), strip_side_prefix(&new));
        }
    }

    if let Some(idx) = rest.find(" \"") {
        let new = take_quoted(&rest[idx + 1..]).map(|(n, _)| n).unwrap_or_default();
        return (strip_side_prefix(&rest[..idx]), strip_side_prefix(&new));
    }

    // Paths may contain spaces; prefer the split where both sides agree
    let splits: Vec<usize> = rest.match_indices(" b/").map(|(i, _)| i).collect();
    let chosen = splits
        .iter()
        .copied()
        .find(|&i| rest[..i].strip_prefix("a/") == rest[i + 1..].strip_prefix("b/"))
        .or_else(|| splits.last().copied());

    match chosen {
        Some(i) => (strip_side_prefix(&rest[..i]), strip_side_prefix(&rest[i + 1..])),
        None => {
            let mut parts = rest.split_whitespace();
            let old = parts.next().unwrap_or_default();
            let new = parts.next().unwrap_or(old);
            (strip_side_prefix(old), strip_side_prefix(new))
        }
    }
}

/// Path from a `---`/`+++` line, `None` for /dev/null
fn header_path(raw: &str) -> Option<String> {
    let raw = raw.trim_end();
    // git appends a tab when the path contains spaces
    let raw = raw.split('\t').next().unwrap_or(raw);
    if raw == DEV_NULL {
        return None;
    }
    Some(strip_side_prefix(&unquote(raw)))
}

fn strip_side_prefix(path: &str) -> String {
    path.strip_prefix("a/")
        .or_else(|| path.strip_prefix("b/"))
        .unwrap_or(path)
        .to_string()
}

/// Undo git's C-style path quoting; unquoted input is returned as-is
fn unquote(raw: &str) -> String {
    let raw = raw.trim();
    if raw.starts_with('"') {
        if let Some((path, _)) = take_quoted(raw) {
            return path;
        }
    }
    raw.to_string()
}

/// Read a leading quoted string, returning it and the remainder
fn take_quoted(input: &str) -> Option<(String, &str)> {
    let body = input.strip_prefix('"')?;
    let mut bytes = Vec::new();
    let mut chars = body.char_indices();

    while let Some((i, c)) = chars.next() {
        match c {
            '"' => {
                let text = String::from_utf8_lossy(&bytes).into_owned();
                return Some((text, &body[i + 1..]));
            }
            '\\' => {
                let (_, escaped) = chars.next()?;
                match escaped {
                    'n' => bytes.push(b'\n'),
                    't' => bytes.push(b'\t'),
                    'r' => bytes.push(b'\r'),
                    '0'..='7' => {
                        let mut value = escaped.to_digit(8)?;
                        for _ in 0..2 {
                            let (_, digit) = chars.next()?;
                            value = value * 8 + digit.to_digit(8)?;
                        }
                        bytes.push(u8::try_from(value).ok()?);
                    }
                    other => {
                        let mut buf = [0u8; 4];
                        bytes.extend_from_slice(other.encode_utf8(&mut buf).as_bytes());
                    }
                }
            }
            other => {
                let mut buf = [0u8; 4];
                bytes.extend_from_slice(other.encode_utf8(&mut buf).as_bytes());
            }
        }
    }

    None
}
