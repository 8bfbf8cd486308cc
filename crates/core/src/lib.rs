#![deny(missing_docs)]
//! mkbook core: book section tree, citation notes, inline items and endnotes.

/// Bibliography database and name parsing.
pub mod bibliography;
/// Citation notes with "ibid" detection and reference-list entries.
pub mod citation;
/// Core error types.
pub mod error;
/// Header line parsing.
pub mod header;
/// Inline item splitting.
pub mod items;
/// Language-dependent wording.
pub mod locale;
/// Normalized section markup.
pub mod markup;
/// Book metadata block.
pub mod metadata;
/// Endnote aggregation.
pub mod notes;
/// Book section tree.
pub mod section;

pub use bibliography::{Bibliography, Entry, Name};
pub use citation::{CitationCache, Locator, render_bibliography_entry};
pub use error::{BookError, Result, SourceLocation};
pub use header::{Header, SectionKind, parse_header_line};
pub use items::{Cite, Item, ItemKind, Items, split};
pub use locale::{Lang, join_with_conjunction};
pub use markup::MarkupLines;
pub use metadata::{Authors, BookMetadata, MetadataBlock, MetadataError};
pub use notes::{NoteAggregator, NoteDefinition, NoteReference};
pub use section::{Book, Section, SectionId};
