//! Header line parsing: `### Title {#my-id $chapter}`.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::BookError;

static HEADER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<pounds>#+)(?P<text>[^{]+) *\{?(?P<item1>[#$][^ }]+)? ?(?P<item2>[#$][^}]+)?\}?$",
    )
    .expect("header regex is valid")
});

/// Position of a section in the book hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SectionKind {
    /// The book root.
    Book,
    /// A part grouping chapters.
    Part,
    /// A chapter.
    Chapter,
    /// A subchapter inside a chapter.
    Subchapter,
}

impl SectionKind {
    /// Every kind, outermost first.
    pub const ALL: [SectionKind; 4] = [
        SectionKind::Book,
        SectionKind::Part,
        SectionKind::Chapter,
        SectionKind::Subchapter,
    ];

    /// Lowercase name used in `$kind` annotations.
    pub fn as_str(self) -> &'static str {
        match self {
            SectionKind::Book => "book",
            SectionKind::Part => "part",
            SectionKind::Chapter => "chapter",
            SectionKind::Subchapter => "subchapter",
        }
    }

    /// Kinds a child of this section may take, default first.
    ///
    /// Subchapters admit no children.
    pub fn admissible_children(self) -> &'static [SectionKind] {
        match self {
            SectionKind::Book => &[SectionKind::Chapter, SectionKind::Part],
            SectionKind::Part => &[SectionKind::Chapter],
            SectionKind::Chapter => &[SectionKind::Subchapter],
            SectionKind::Subchapter => &[],
        }
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SectionKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SectionKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or(())
    }
}

/// A parsed header line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Number of leading `#`.
    pub level: usize,
    /// Display text, trimmed.
    pub text: String,
    /// Explicit identifier from a `#id` token.
    pub id: Option<String>,
    /// Explicit kind from a `$kind` token.
    pub section_kind: Option<SectionKind>,
}

/// Whether a markup line opens a header.
pub fn is_header_line(line: &str) -> bool {
    line.starts_with('#')
}

/// Parses a header line such as `## Title {#id $chapter}`.
///
/// The trailing newline, if any, is ignored.
pub fn parse_header_line(line: &str) -> Result<Header, BookError> {
    let trimmed = line.trim_end_matches(['\r', '\n']);
    let Some(captures) = HEADER_RE.captures(trimmed) else {
        return Err(BookError::NotAHeader {
            line: trimmed.to_string(),
        });
    };

    let mut header = Header {
        level: captures["pounds"].len(),
        text: captures["text"].trim().to_string(),
        id: None,
        section_kind: None,
    };

    for item in [captures.name("item1"), captures.name("item2")]
        .into_iter()
        .flatten()
    {
        let token = item.as_str();
        if let Some(id) = token.strip_prefix('#') {
            header.id = Some(id.to_string());
        } else if let Some(kind) = token.strip_prefix('$') {
            let kind = kind.trim();
            header.section_kind = Some(kind.parse().map_err(|()| {
                BookError::UnknownSectionKind {
                    kind: kind.to_string(),
                    line: trimmed.to_string(),
                }
            })?);
        }
    }

    Ok(header)
}

/// Returns the first header line in `lines`, if any.
pub fn find_first_header<I, S>(lines: I) -> Option<S>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    lines
        .into_iter()
        .find(|line| is_header_line(line.as_ref()))
}
