//! Renders every part and chapter of a book plus its back matter.

use html_escape::{encode_double_quoted_attribute, encode_text};
use mkbook_core::header::is_header_line;
use mkbook_core::{
    Bibliography, Book, BookError, Cite, ItemKind, NoteDefinition, NoteReference, Section,
    SectionKind, parse_header_line, split,
};
use once_cell::unsync::OnceCell;

use crate::back_matter::{
    bibliography_body, bibliography_entries, endnotes_body, note_anchor, reference_anchor,
};
use crate::error::RenderError;
use crate::layout::{BIBLIOGRAPHY_NAME, ENDNOTES_NAME, LinkResolver, Location, SiteLayout};
use crate::markup::{Fragment, MarkdownRenderer, MarkupRenderer, render_fragment};
use crate::options::RenderOptions;
use crate::pass::RenderPass;

/// What a rendered document holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// A part introduction.
    Part,
    /// A chapter with its subchapters.
    Chapter,
    /// Collected endnotes.
    Endnotes,
    /// Reference list.
    Bibliography,
}

/// One output document, ready for the packaging layer to wrap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    /// Section identifier, or `endnotes`/`bibliography`.
    pub identifier: String,
    /// Document title.
    pub title: String,
    /// Document kind.
    pub kind: DocumentKind,
    /// Path inside the site.
    pub path: String,
    /// Body fragment.
    pub body: String,
}

/// Result of a rendering pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedSite {
    /// Parts and chapters in reading order, then endnotes and bibliography
    /// when there is anything to put in them.
    pub documents: Vec<RenderedDocument>,
    /// Notes in reference order.
    pub notes: Vec<NoteDefinition>,
    /// Reference-list lines, sorted.
    pub bibliography: Vec<String>,
}

/// Renders a [`Book`] into per-document HTML fragments.
pub struct SiteRenderer<'a, R = MarkdownRenderer> {
    book: &'a Book,
    options: RenderOptions,
    layout: SiteLayout<'a>,
    markup: R,
    bibliography: OnceCell<Bibliography>,
}

impl<'a> SiteRenderer<'a> {
    /// Renderer using markdown-rs for plain markup.
    pub fn new(book: &'a Book, options: RenderOptions) -> Self {
        Self::with_markup_renderer(book, options, MarkdownRenderer::default())
    }
}

impl<'a, R: MarkupRenderer> SiteRenderer<'a, R> {
    /// Renderer with a custom plain-markup renderer.
    pub fn with_markup_renderer(book: &'a Book, options: RenderOptions, markup: R) -> Self {
        Self {
            book,
            layout: SiteLayout::new(book, options.site_kind),
            options,
            markup,
            bibliography: OnceCell::new(),
        }
    }

    /// Uses `bibliography` instead of loading the file named in the book metadata.
    pub fn with_bibliography(mut self, bibliography: Bibliography) -> Self {
        self.bibliography = OnceCell::with_value(bibliography);
        self
    }

    /// File layout of the rendered site.
    pub fn layout(&self) -> &SiteLayout<'a> {
        &self.layout
    }

    /// Bibliography, loaded on first use.
    fn bibliography(&self, section: &str, key: &str) -> Result<&Bibliography, RenderError> {
        self.bibliography
            .get_or_try_init(|| match self.book.bibliography_path() {
                Some(path) => Ok(Bibliography::load(path)?),
                None => Err(RenderError::MissingBibliography {
                    section: section.to_string(),
                    key: key.to_string(),
                }),
            })
    }

    /// Runs one complete rendering pass.
    ///
    /// Nothing is returned unless the whole book renders.
    pub fn render(&self) -> Result<RenderedSite, RenderError> {
        let lang = self.book.lang();
        let kind = self.options.site_kind;
        log::info!("rendering {:?} as {kind}", self.book.title());

        let mut pass = RenderPass::new(lang, self.options.reset_ibid_per_chapter);
        let mut documents = Vec::new();
        for unit in self.book.rendering_units() {
            pass.start_unit();
            documents.push(self.render_unit(unit, &mut pass)?);
        }

        let (notes, cited) = pass.finish()?;
        if !notes.is_empty() {
            documents.push(RenderedDocument {
                identifier: ENDNOTES_NAME.to_string(),
                title: lang.endnotes_title().to_string(),
                kind: DocumentKind::Endnotes,
                path: self.layout.endnotes_path(),
                body: endnotes_body(&notes, kind, lang),
            });
        }

        let bibliography = match self.bibliography.get() {
            Some(db) if !cited.is_empty() => {
                bibliography_entries(db, cited.iter().map(String::as_str), lang)?
            }
            _ => Vec::new(),
        };
        if !bibliography.is_empty() {
            documents.push(RenderedDocument {
                identifier: BIBLIOGRAPHY_NAME.to_string(),
                title: lang.bibliography_title().to_string(),
                kind: DocumentKind::Bibliography,
                path: self.layout.bibliography_path(),
                body: bibliography_body(&bibliography, kind, lang),
            });
        }

        log::info!(
            "rendered {} documents with {} notes and {} bibliography entries",
            documents.len(),
            notes.len(),
            bibliography.len()
        );
        Ok(RenderedSite {
            documents,
            notes,
            bibliography,
        })
    }

    fn render_unit(
        &self,
        unit: Section<'_>,
        pass: &mut RenderPass,
    ) -> Result<RenderedDocument, RenderError> {
        let identifier = unit.identifier().unwrap_or_default().to_string();
        let path = self
            .layout
            .document_path(unit)
            .ok_or_else(|| BookError::UnknownSection {
                identifier: identifier.clone(),
            })?;
        let href = Location {
            path: path.clone(),
            anchor: None,
        }
        .href();

        let mut html = Vec::new();
        self.render_section(unit, &href, pass, &mut html)?;
        if unit.kind() == SectionKind::Chapter {
            for subchapter in unit.children() {
                self.render_section(subchapter, &href, pass, &mut html)?;
            }
        }
        if html.is_empty() {
            log::warn!("section {identifier} rendered to an empty document");
        }

        Ok(RenderedDocument {
            title: unit.title().to_string(),
            kind: match unit.kind() {
                SectionKind::Part => DocumentKind::Part,
                _ => DocumentKind::Chapter,
            },
            identifier,
            path,
            body: html.join("\n"),
        })
    }

    /// Headers become `<hN>`; the text between them is rendered item by item.
    fn render_section(
        &self,
        section: Section<'_>,
        unit_href: &str,
        pass: &mut RenderPass,
        html: &mut Vec<String>,
    ) -> Result<(), RenderError> {
        let identifier = section.identifier().unwrap_or_default();
        log::debug!("rendering section {identifier}");

        let mut fragment = String::new();
        let mut section_anchor = Some(identifier);
        for line in section.markup_lines()? {
            let line = line?;
            if !is_header_line(&line) {
                fragment.push_str(&line);
                continue;
            }

            self.render_text(&fragment, identifier, unit_href, pass, html)?;
            fragment.clear();

            let header = parse_header_line(&line)?;
            let id_attr = match section_anchor.take() {
                Some(anchor) => format!(r#" id="{}""#, encode_double_quoted_attribute(anchor)),
                None => String::new(),
            };
            html.push(format!(
                "<h{level}{id_attr}>{}</h{level}>",
                encode_text(&header.text),
                level = header.level
            ));
        }
        self.render_text(&fragment, identifier, unit_href, pass, html)
    }

    fn render_text(
        &self,
        text: &str,
        section: &str,
        unit_href: &str,
        pass: &mut RenderPass,
        html: &mut Vec<String>,
    ) -> Result<(), RenderError> {
        let fragment = text.trim();
        if fragment.is_empty() {
            return Ok(());
        }

        let mut items = split(fragment);
        if !self.options.paragraph_breaks {
            items = items.without_paragraph_breaks();
        }

        let mut paragraph = String::new();
        for item in items {
            let item = item?;
            match item.kind {
                ItemKind::Markup => match render_fragment(&self.markup, item.text, section)? {
                    Fragment::Inline(inline) => push_inline(&mut paragraph, item.text, &inline),
                    Fragment::Block(block) => {
                        flush_paragraph(&mut paragraph, html);
                        html.push(block);
                    }
                },
                ItemKind::ParagraphBreak => flush_paragraph(&mut paragraph, html),
                ItemKind::FootnoteReference { id } => {
                    let reference = pass.reference_footnote(&id, item.span.start, unit_href);
                    paragraph.push_str(&self.note_reference(&reference));
                }
                ItemKind::FootnoteDefinition { id, content } => {
                    let body = self.render_note_body(&id, &content, section, pass)?;
                    pass.define_footnote(&id, body)?;
                }
                ItemKind::Citation { cites } => {
                    let Some(first) = cites.first() else {
                        paragraph.push_str(&encode_text(item.text));
                        continue;
                    };
                    let body = self.citation_text(&cites, section, pass)?;
                    let reference =
                        pass.add_citation_note(&first.key, item.span.start, body, unit_href);
                    paragraph.push_str(&self.note_reference(&reference));
                }
                ItemKind::InternalLink { text, target } => {
                    paragraph.push_str(&self.internal_link(&text, &target, section)?);
                }
            }
        }
        flush_paragraph(&mut paragraph, html);
        pass.advance(fragment.len());
        Ok(())
    }

    /// Body of footnote `id`.
    ///
    /// Citations inside a footnote are written out in place; they get no
    /// note of their own. Notes cannot nest.
    fn render_note_body(
        &self,
        id: &str,
        content: &str,
        section: &str,
        pass: &mut RenderPass,
    ) -> Result<String, RenderError> {
        let mut body = String::new();
        for item in split(content).without_paragraph_breaks() {
            let item = item?;
            match item.kind {
                ItemKind::Markup => match render_fragment(&self.markup, item.text, section)? {
                    Fragment::Inline(inline) => push_inline(&mut body, item.text, &inline),
                    Fragment::Block(block) => body.push_str(&block),
                },
                ItemKind::Citation { cites } => {
                    let text = self.citation_text(&cites, section, pass)?;
                    push_inline(&mut body, item.text, &text);
                }
                ItemKind::InternalLink { text, target } => {
                    body.push_str(&self.internal_link(&text, &target, section)?);
                }
                ItemKind::FootnoteReference { .. } | ItemKind::FootnoteDefinition { .. } => {
                    return Err(RenderError::NestedNote {
                        section: section.to_string(),
                        id: id.to_string(),
                    });
                }
                ItemKind::ParagraphBreak => {}
            }
        }
        Ok(body.trim().to_string())
    }

    /// Note text for a bracketed citation; records the cited keys.
    fn citation_text(
        &self,
        cites: &[Cite],
        section: &str,
        pass: &mut RenderPass,
    ) -> Result<String, RenderError> {
        let Some(first) = cites.first() else {
            return Ok(String::new());
        };
        let bibliography = self.bibliography(section, &first.key)?;
        Ok(pass.citation_text(bibliography, cites)?)
    }

    fn internal_link(&self, text: &str, target: &str, section: &str) -> Result<String, RenderError> {
        let location = self.layout.resolve(target).map_err(|err| match err {
            RenderError::Book(BookError::UnknownSection { .. }) => RenderError::UnknownLinkTarget {
                section: section.to_string(),
                target: target.to_string(),
            },
            other => other,
        })?;
        Ok(format!(
            r#"<a href="{}">{}</a>"#,
            encode_double_quoted_attribute(&location.href()),
            encode_text(text)
        ))
    }

    /// In-text anchor pointing at a note; repeated references carry no id.
    fn note_reference(&self, reference: &NoteReference) -> String {
        let id_attr = if reference.first {
            format!(
                r#" id="{}""#,
                encode_double_quoted_attribute(&reference_anchor(&reference.note_id))
            )
        } else {
            String::new()
        };
        let epub_type = if self.layout.kind().is_epub() {
            r#" epub:type="noteref""#
        } else {
            ""
        };
        let target = Location {
            path: self.layout.endnotes_path(),
            anchor: Some(note_anchor(&reference.note_id)),
        };
        format!(
            r#"<a{id_attr} href="{}" role="doc-noteref"{epub_type}><sup>{}</sup></a>"#,
            encode_double_quoted_attribute(&target.href()),
            reference.number
        )
    }
}

/// Appends inline output, keeping the spacing the source had around it.
fn push_inline(paragraph: &mut String, source: &str, inline: &str) {
    if source.starts_with(char::is_whitespace)
        && !paragraph.is_empty()
        && !paragraph.ends_with(' ')
    {
        paragraph.push(' ');
    }
    paragraph.push_str(inline);
    if source.ends_with(char::is_whitespace) && !inline.is_empty() {
        paragraph.push(' ');
    }
}

fn flush_paragraph(paragraph: &mut String, html: &mut Vec<String>) {
    let text = paragraph.trim();
    if !text.is_empty() {
        html.push(format!("<p>{text}</p>"));
    }
    paragraph.clear();
}
