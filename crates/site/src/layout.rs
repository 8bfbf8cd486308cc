//! Where each section ends up in the rendered site.

use mkbook_core::{Book, BookError, Section, SectionKind};

use crate::error::RenderError;
use crate::options::SiteKind;

/// Base name of the endnotes document.
pub const ENDNOTES_NAME: &str = "endnotes";
/// Base name of the bibliography document.
pub const BIBLIOGRAPHY_NAME: &str = "bibliography";

/// A document path inside the site plus an optional in-page anchor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// Path relative to the site root, `/`-separated.
    pub path: String,
    /// Fragment identifier inside the document.
    pub anchor: Option<String>,
}

impl Location {
    /// Link target usable from any section document.
    pub fn href(&self) -> String {
        match &self.anchor {
            Some(anchor) => format!("../{}#{anchor}", self.path),
            None => format!("../{}", self.path),
        }
    }
}

/// Maps section identifiers to their place in the output.
pub trait LinkResolver {
    /// Location of the section with `identifier`.
    fn resolve(&self, identifier: &str) -> Result<Location, RenderError>;
}

/// File naming for one site flavour.
#[derive(Debug, Clone, Copy)]
pub struct SiteLayout<'a> {
    book: &'a Book,
    kind: SiteKind,
}

impl<'a> SiteLayout<'a> {
    /// Layout of `book` rendered as `kind`.
    pub fn new(book: &'a Book, kind: SiteKind) -> Self {
        Self { book, kind }
    }

    /// Site flavour.
    pub fn kind(&self) -> SiteKind {
        self.kind
    }

    fn path_for(&self, name: &str) -> String {
        format!("{}/{name}.{}", self.kind.directory(), self.kind.extension())
    }

    /// Path of the document `section` is rendered into.
    ///
    /// Subchapters live in their chapter's document; the book root has none.
    pub fn document_path(&self, section: Section<'_>) -> Option<String> {
        match section.kind() {
            SectionKind::Part => Some(self.path_for(&format!("part_{}", section.index()))),
            SectionKind::Chapter => Some(self.path_for(&format!("chapter_{}", section.index()))),
            SectionKind::Subchapter => section
                .parent()
                .and_then(|chapter| self.document_path(chapter)),
            SectionKind::Book => None,
        }
    }

    /// Path of the endnotes document.
    pub fn endnotes_path(&self) -> String {
        self.path_for(ENDNOTES_NAME)
    }

    /// Path of the bibliography document.
    pub fn bibliography_path(&self) -> String {
        self.path_for(BIBLIOGRAPHY_NAME)
    }
}

impl LinkResolver for SiteLayout<'_> {
    fn resolve(&self, identifier: &str) -> Result<Location, RenderError> {
        let section = self.book.section_by_identifier(identifier)?;
        let path = self
            .document_path(section)
            .ok_or_else(|| BookError::UnknownSection {
                identifier: identifier.to_string(),
            })?;
        let anchor = match section.kind() {
            SectionKind::Subchapter => Some(identifier.to_string()),
            _ => None,
        };
        Ok(Location { path, anchor })
    }
}
