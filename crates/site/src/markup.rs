//! Basic markup rendering (paragraphs, emphasis, lists) through markdown-rs.

use std::fmt::Display;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::RenderError;

static HEADING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<h[1-6][\s>/]").expect("heading regex is valid"));

/// Options for building markdown-rs options.
#[derive(Clone, Copy, Debug)]
pub struct MarkupOptions {
    /// Enable GitHub Flavored Markdown tables, strikethrough and autolinks.
    pub gfm: bool,
    /// Pass raw HTML through.
    pub raw_html: bool,
    /// Enable indented code blocks.
    pub code_indented: bool,
}

impl MarkupOptions {
    /// Defaults for book prose.
    pub const fn book() -> Self {
        Self {
            gfm: true,
            raw_html: true,
            code_indented: false,
        }
    }

    /// Convert to markdown-rs `Options`.
    ///
    /// Footnote syntax stays off: notes are handled by the inline item
    /// splitter before text reaches the renderer.
    pub fn to_markdown(self) -> markdown::Options {
        let mut constructs = markdown::Constructs {
            frontmatter: false,
            code_indented: self.code_indented,
            html_flow: self.raw_html,
            html_text: self.raw_html,
            ..Default::default()
        };

        if self.gfm {
            constructs.gfm_autolink_literal = true;
            constructs.gfm_strikethrough = true;
            constructs.gfm_table = true;
            constructs.gfm_task_list_item = true;
        }

        markdown::Options {
            parse: markdown::ParseOptions {
                constructs,
                ..markdown::ParseOptions::default()
            },
            compile: markdown::CompileOptions {
                allow_dangerous_html: self.raw_html,
                ..markdown::CompileOptions::default()
            },
        }
    }
}

impl Default for MarkupOptions {
    fn default() -> Self {
        Self::book()
    }
}

/// Converts a plain markup fragment to an HTML fragment.
pub trait MarkupRenderer {
    /// Renderer failure.
    type Error: Display;

    /// Renders `markup` to HTML.
    fn render(&self, markup: &str) -> Result<String, Self::Error>;
}

/// [`MarkupRenderer`] backed by markdown-rs.
#[derive(Debug)]
pub struct MarkdownRenderer {
    options: markdown::Options,
}

impl MarkdownRenderer {
    /// Renderer with the given options.
    pub fn new(options: MarkupOptions) -> Self {
        Self {
            options: options.to_markdown(),
        }
    }
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new(MarkupOptions::default())
    }
}

impl MarkupRenderer for MarkdownRenderer {
    type Error = markdown::message::Message;

    fn render(&self, markup: &str) -> Result<String, Self::Error> {
        markdown::to_html_with_options(markup, &self.options)
    }
}

/// Rendered fragment: text that continues the current paragraph, or
/// block content that stands on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    /// Paragraph content with the wrapping `<p>` removed.
    Inline(String),
    /// Lists, quotes, tables and other block output.
    Block(String),
}

/// Renders `markup` and classifies the output.
///
/// Fails if the output contains a heading element.
pub fn render_fragment<R: MarkupRenderer>(
    renderer: &R,
    markup: &str,
    section: &str,
) -> Result<Fragment, RenderError> {
    let html = renderer
        .render(markup)
        .map_err(|err| RenderError::Markup {
            section: section.to_string(),
            message: err.to_string(),
        })?;
    let html = html.trim();

    if HEADING_RE.is_match(html) {
        return Err(RenderError::HeadingInFragment {
            section: section.to_string(),
            html: html.to_string(),
        });
    }

    if let Some(inner) = html.strip_prefix("<p>").and_then(|rest| rest.strip_suffix("</p>"))
        && !inner.contains("<p>")
    {
        return Ok(Fragment::Inline(inner.to_string()));
    }
    if html.is_empty() {
        return Ok(Fragment::Inline(String::new()));
    }
    Ok(Fragment::Block(html.to_string()))
}
