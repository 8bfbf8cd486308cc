use std::fmt;

use serde::Deserialize;

use crate::error::RenderError;

/// Output flavour of the rendered site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiteKind {
    /// XHTML documents for an EPUB 3 container.
    #[default]
    Epub3,
    /// Plain HTML pages.
    Html,
}

impl SiteKind {
    /// Directory holding the section documents.
    pub fn directory(self) -> &'static str {
        match self {
            SiteKind::Epub3 => "EPUB",
            SiteKind::Html => "section",
        }
    }

    /// File extension of the section documents.
    pub fn extension(self) -> &'static str {
        match self {
            SiteKind::Epub3 => "xhtml",
            SiteKind::Html => "html",
        }
    }

    /// Whether EPUB structural semantics (`epub:type`) are emitted.
    pub fn is_epub(self) -> bool {
        self == SiteKind::Epub3
    }
}

impl fmt::Display for SiteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SiteKind::Epub3 => "epub3",
            SiteKind::Html => "html",
        })
    }
}

/// Settings of one rendering pass.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Output flavour.
    pub site_kind: SiteKind,
    /// Forget the last citation when a new part or chapter starts, so an
    /// "Ibid" never refers to a previous document.
    pub reset_ibid_per_chapter: bool,
    /// Blank lines close paragraphs.
    pub paragraph_breaks: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            site_kind: SiteKind::default(),
            reset_ibid_per_chapter: false,
            paragraph_breaks: true,
        }
    }
}

impl RenderOptions {
    /// Options for `site_kind` with everything else at its default.
    pub fn for_kind(site_kind: SiteKind) -> Self {
        Self {
            site_kind,
            ..Self::default()
        }
    }

    /// Parses options from JSON; missing keys take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, RenderError> {
        serde_json::from_str(json).map_err(|err| RenderError::Options(err.to_string()))
    }
}
