use mkbook_core::BookError;
use thiserror::Error;

/// Errors that abort a rendering pass.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Structural, metadata or lookup error from the book model.
    #[error(transparent)]
    Book(#[from] BookError),
    /// The basic markup renderer rejected a fragment.
    #[error("Markup rendering failed in {section}: {message}")]
    Markup {
        /// Identifier of the section being rendered
        section: String,
        /// Renderer message
        message: String,
    },
    /// The basic markup renderer produced a heading element.
    #[error("Markup in {section} rendered to a heading, headers must use their own lines: {html:?}")]
    HeadingInFragment {
        /// Identifier of the section being rendered
        section: String,
        /// Offending output
        html: String,
    },
    /// A citation was found but the book declares no bibliography.
    #[error("Section {section} cites {key} but the book metadata sets no bibliography")]
    MissingBibliography {
        /// Identifier of the section being rendered
        section: String,
        /// First cited key
        key: String,
    },
    /// An internal link points at no known section.
    #[error("Internal link in {section} points to unknown section {target}")]
    UnknownLinkTarget {
        /// Identifier of the section being rendered
        section: String,
        /// Requested section identifier
        target: String,
    },
    /// A footnote body holds another footnote.
    #[error("Footnote {id} in {section} contains a footnote, notes cannot nest")]
    NestedNote {
        /// Identifier of the section being rendered
        section: String,
        /// Footnote whose body holds the nested note
        id: String,
    },
    /// Rendering options could not be parsed.
    #[error("Invalid render options: {0}")]
    Options(String),
}
