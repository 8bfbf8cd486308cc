#![deny(missing_docs)]
//! mkbook site: renders a book section tree into EPUB/HTML fragments.

/// Endnotes and bibliography documents.
pub mod back_matter;
/// Rendering error types.
pub mod error;
/// Document paths and internal link resolution.
pub mod layout;
/// Basic markup rendering through markdown-rs.
pub mod markup;
/// Rendering options.
pub mod options;
/// Per-pass rendering state.
pub mod pass;
/// Book rendering.
pub mod render;

pub use error::RenderError;
pub use layout::{LinkResolver, Location, SiteLayout};
pub use markup::{Fragment, MarkdownRenderer, MarkupOptions, MarkupRenderer, render_fragment};
pub use options::{RenderOptions, SiteKind};
pub use pass::RenderPass;
pub use render::{DocumentKind, RenderedDocument, RenderedSite, SiteRenderer};
