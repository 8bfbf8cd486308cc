//! Normalized markup text of a section.
//!
//! A section's markup is the concatenation of its `.md` files with the
//! book metadata block and `%%%` comment blocks removed, headers renumbered
//! to the section's base level, and runs of blank lines collapsed.

use std::path::{Path, PathBuf};

use crate::error::{BookError, SourceLocation};
use crate::metadata::is_fence;
use crate::header::{is_header_line, parse_header_line};

const COMMENT_FENCE: &str = "%%%";

/// One markup file read into memory.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Path of the file.
    pub path: PathBuf,
    /// Whole file contents.
    pub text: String,
}

impl SourceFile {
    /// Reads `path` whole.
    pub fn read(path: &Path) -> Result<Self, BookError> {
        let text = std::fs::read_to_string(path).map_err(|err| BookError::io(path, err))?;
        Ok(Self {
            path: path.to_path_buf(),
            text,
        })
    }
}

/// Reads every file in order.
pub fn read_sources(paths: &[PathBuf]) -> Result<Vec<SourceFile>, BookError> {
    paths.iter().map(|path| SourceFile::read(path)).collect()
}

/// Tracks the metadata block and comment blocks across a run of lines.
///
/// State carries over file boundaries: a comment opened in one file stays
/// open in the next one.
#[derive(Debug, Clone, Default)]
pub struct LineFilter {
    strip_metadata: bool,
    in_metadata: bool,
    metadata_done: bool,
    in_comment: bool,
}

impl LineFilter {
    /// Filter for a section; `strip_metadata` is set for the book root only.
    pub fn new(strip_metadata: bool) -> Self {
        Self {
            strip_metadata,
            ..Self::default()
        }
    }

    /// Returns whether `line` belongs to the visible markup.
    pub fn keep(&mut self, line: &str) -> bool {
        if self.strip_metadata && !self.metadata_done && is_fence(line) {
            if self.in_metadata {
                self.in_metadata = false;
                self.metadata_done = true;
            } else {
                self.in_metadata = true;
            }
            return false;
        }

        if line.starts_with(COMMENT_FENCE) {
            self.in_comment = !self.in_comment;
            return false;
        }

        !(self.in_metadata || self.in_comment)
    }
}

/// Splits `text` into lines that keep their terminator.
pub(crate) fn lines_with_endings(text: &str) -> impl Iterator<Item = &str> {
    text.split_inclusive('\n')
}

/// Finds the first visible header line across `sources`.
pub(crate) fn first_visible_header(sources: &[SourceFile], strip_metadata: bool) -> Option<&str> {
    let mut filter = LineFilter::new(strip_metadata);
    sources
        .iter()
        .flat_map(|source| lines_with_endings(&source.text))
        .find(|line| filter.keep(line) && is_header_line(line))
}

/// How a section's markup must be normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkupShape {
    /// Level the first header of each file is remapped to.
    pub base_level: usize,
    /// Strip the leading metadata block (book root).
    pub strip_metadata: bool,
    /// Reject more than one header (sections with subsections).
    pub single_header: bool,
}

/// Iterator over the normalized lines of a section.
///
/// Each call to [`crate::Section::markup_lines`] builds a fresh one. Lines keep
/// their trailing newline. After the first error the iterator is exhausted.
#[derive(Debug)]
pub struct MarkupLines {
    sources: Vec<SourceFile>,
    shape: MarkupShape,
    filter: LineFilter,
    file_index: usize,
    cursor: usize,
    line_number: usize,
    first_header_level: Option<usize>,
    last_line_was_blank: bool,
    headers_seen: usize,
    pending_blank: bool,
    failed: bool,
}

impl MarkupLines {
    /// Normalizes `sources` according to `shape`.
    pub fn new(sources: Vec<SourceFile>, shape: MarkupShape) -> Self {
        Self {
            sources,
            shape,
            filter: LineFilter::new(shape.strip_metadata),
            file_index: 0,
            cursor: 0,
            line_number: 0,
            first_header_level: None,
            last_line_was_blank: false,
            headers_seen: 0,
            pending_blank: false,
            failed: false,
        }
    }

    fn next_raw_line(&mut self) -> Option<String> {
        loop {
            let source = self.sources.get(self.file_index)?;
            if self.cursor < source.text.len() {
                let rest = &source.text[self.cursor..];
                let len = rest.find('\n').map_or(rest.len(), |pos| pos + 1);
                self.cursor += len;
                self.line_number += 1;
                return Some(rest[..len].to_string());
            }
            self.file_index += 1;
            self.cursor = 0;
            self.line_number = 0;
            self.first_header_level = None;
            self.last_line_was_blank = false;
        }
    }

    fn location(&self) -> SourceLocation {
        match self.sources.get(self.file_index) {
            Some(source) => SourceLocation::with_file(&source.path, self.line_number),
            None => SourceLocation::new(self.line_number),
        }
    }

    /// Applies blank-line collapsing; `None` means the line is dropped.
    fn collapse_blank(&mut self, line: String) -> Option<String> {
        if is_blank(&line) {
            if self.last_line_was_blank {
                return None;
            }
            self.last_line_was_blank = true;
        } else {
            self.last_line_was_blank = false;
        }
        Some(line)
    }

    fn renumber_header(&mut self, line: &str) -> Result<String, BookError> {
        let header = parse_header_line(line)?;
        self.headers_seen += 1;
        if self.shape.single_header && self.headers_seen > 1 {
            return Err(BookError::MultipleHeaders {
                line: line.trim_end().to_string(),
                location: self.location(),
            });
        }

        let first_level = *self.first_header_level.get_or_insert(header.level);
        let level = (header.level + self.shape.base_level)
            .saturating_sub(first_level)
            .max(1);
        Ok(format!("{} {}\n", "#".repeat(level), header.text))
    }
}

impl Iterator for MarkupLines {
    type Item = Result<String, BookError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        if self.pending_blank {
            self.pending_blank = false;
            if let Some(line) = self.collapse_blank("\n".to_string()) {
                return Some(Ok(line));
            }
        }

        loop {
            let line = self.next_raw_line()?;
            if !self.filter.keep(&line) {
                continue;
            }

            if is_header_line(&line) {
                return match self.renumber_header(&line) {
                    Ok(header) => {
                        // Every header is followed by a blank line.
                        self.pending_blank = true;
                        Some(Ok(header))
                    }
                    Err(err) => {
                        self.failed = true;
                        Some(Err(err))
                    }
                };
            }

            if let Some(line) = self.collapse_blank(line) {
                return Some(Ok(line));
            }
        }
    }
}

fn is_blank(line: &str) -> bool {
    line == "\n" || line == "\r\n"
}
