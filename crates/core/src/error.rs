use std::path::PathBuf;

use thiserror::Error;

use crate::metadata::MetadataError;
use crate::header::SectionKind;

/// Source location information for error reporting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    /// Optional file path
    pub file: Option<PathBuf>,
    /// Line number (1-indexed)
    pub line: usize,
}

impl SourceLocation {
    /// Create a new source location
    pub fn new(line: usize) -> Self {
        Self { file: None, line }
    }

    /// Create a source location with file information
    pub fn with_file(file: impl Into<PathBuf>, line: usize) -> Self {
        Self {
            file: Some(file.into()),
            line,
        }
    }
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(file) = &self.file {
            write!(f, "{}:{}", file.display(), self.line)
        } else {
            write!(f, "line {}", self.line)
        }
    }
}

/// Errors that abort a book build or a rendering pass.
#[derive(Debug, Error)]
pub enum BookError {
    /// IO error while reading a book directory or markup file.
    #[error("IO error on {path}: {source}")]
    Io {
        /// Path being read
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
    /// A line handed to the header parser does not follow the header grammar.
    #[error("Line is not a header line: {line:?}")]
    NotAHeader {
        /// Offending line
        line: String,
    },
    /// A `$kind` annotation names a kind that does not exist.
    #[error("Unknown section kind {kind:?} in header {line:?}")]
    UnknownSectionKind {
        /// Kind token (without the sigil)
        kind: String,
        /// Offending header line
        line: String,
    },
    /// A `$kind` annotation is not allowed below the parent section.
    #[error("Section kind {kind} suggested in {dir} is not allowed within a {parent}; expected one of: {allowed}")]
    InadmissibleKind {
        /// Kind requested by the header
        kind: SectionKind,
        /// Kind of the enclosing section
        parent: SectionKind,
        /// Comma separated admissible kinds
        allowed: String,
        /// Section directory
        dir: PathBuf,
    },
    /// A directory was found below a subchapter.
    #[error("Sections cannot be nested below a subchapter: {dir}")]
    SectionTooDeep {
        /// Offending directory
        dir: PathBuf,
    },
    /// A non-root section has no header to take its title from.
    #[error("Section in {dir} has no header line to take its title from")]
    MissingTitle {
        /// Section directory
        dir: PathBuf,
    },
    /// The book metadata block has no `title`.
    #[error("The book title should be set in the metadata block of {dir}")]
    MissingBookTitle {
        /// Book root directory
        dir: PathBuf,
    },
    /// The book metadata block is malformed.
    #[error("Invalid book metadata: {0}")]
    Metadata(#[from] MetadataError),
    /// Unsupported or malformed metadata value.
    #[error("Invalid book metadata field {field}: {message}")]
    MetadataField {
        /// Field name
        field: &'static str,
        /// What is wrong with it
        message: String,
    },
    /// Two sections resolved to the same identifier.
    #[error("Repeated section id: {identifier}")]
    DuplicateSectionId {
        /// Repeated identifier
        identifier: String,
    },
    /// A section with subsections has more than one header in its own text.
    #[error("In a section with subsections only one header is allowed ({location}): {line:?}")]
    MultipleHeaders {
        /// Offending header line
        line: String,
        /// Where it was found
        location: SourceLocation,
    },
    /// No section carries the requested identifier.
    #[error("Unknown section id: {identifier}")]
    UnknownSection {
        /// Requested identifier
        identifier: String,
    },
    /// A footnote identifier was defined twice in one rendering pass.
    #[error("More than one footnote definition for footnote ID: {id}")]
    DuplicateFootnoteDefinition {
        /// Footnote identifier
        id: String,
    },
    /// A footnote was referenced but never defined.
    #[error("Footnote {id} is referenced but never defined")]
    UnresolvedFootnote {
        /// Footnote identifier
        id: String,
    },
    /// A footnote was defined but never referenced.
    #[error("Footnote {id} is defined but never referenced")]
    UnreferencedFootnote {
        /// Footnote identifier
        id: String,
    },
    /// A locator does not hold one or two positions.
    #[error("Locator positions should be a list with one or two numbers, got {count}")]
    MalformedLocator {
        /// Number of positions found
        count: usize,
    },
    /// A locator position does not fit a page number.
    #[error("Locator position {position} in citation {citation:?} is out of range")]
    LocatorOutOfRange {
        /// Raw citation text
        citation: String,
        /// Raw position
        position: String,
    },
    /// A sub-citation inside brackets could not be parsed.
    #[error("Malformed citation {citation:?}")]
    MalformedCitation {
        /// Raw citation text
        citation: String,
    },
    /// The bibliography has no entry for a key.
    #[error("Bibliography entry not found: {key}")]
    EntryNotFound {
        /// Entry key
        key: String,
    },
    /// A bibliography entry lacks the fields needed for a reference-list line.
    #[error("Bibliography entry {key} has neither a url nor author/editor, title, publisher and year")]
    IncompleteBibliographyEntry {
        /// Entry key
        key: String,
    },
    /// A name field could not be split into first and last names.
    #[error("Malformed name {name:?} in bibliography entry {key}")]
    MalformedName {
        /// Entry key
        key: String,
        /// Raw name
        name: String,
    },
    /// The `urldate` field is not an ISO date.
    #[error("Invalid urldate {value:?} in bibliography entry {key}")]
    InvalidUrlDate {
        /// Entry key
        key: String,
        /// Raw value
        value: String,
    },
    /// The bibliography file could not be parsed.
    #[error("Bibliography parse error in {path}: {message}")]
    BibliographyParse {
        /// Bibliography file
        path: PathBuf,
        /// Parser message
        message: String,
    },
}

impl BookError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Convenience alias used across the crate.
pub type Result<T, E = BookError> = std::result::Result<T, E>;
