//! Book section tree built from a directory hierarchy.
//!
//! Every directory is one section. The book root owns the metadata; below
//! it come parts and chapters, chapters hold subchapters. Sections live in
//! an arena owned by [`Book`]; parents are plain indices into it, so the
//! tree has no reference cycles.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::BookError;
use crate::metadata::BookMetadata;
use crate::header::{Header, SectionKind, parse_header_line};
use crate::locale::Lang;
use crate::markup::{MarkupLines, MarkupShape, SourceFile, first_visible_header, read_sources};

const MARKUP_EXTENSION: &str = "md";

/// Index of a section inside its [`Book`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SectionId(usize);

impl SectionId {
    /// The book root.
    pub const ROOT: SectionId = SectionId(0);
}

#[derive(Debug)]
struct SectionNode {
    dir: PathBuf,
    kind: SectionKind,
    parent: Option<SectionId>,
    children: Vec<SectionId>,
    files: Vec<PathBuf>,
    header: Option<Header>,
    index: usize,
    identifier: Option<String>,
    title: Option<String>,
}

/// A book assembled from a directory tree of markup files.
#[derive(Debug)]
pub struct Book {
    dir: PathBuf,
    metadata: BookMetadata,
    /// Sections in document order; the root is always first.
    nodes: Vec<SectionNode>,
    by_identifier: HashMap<String, SectionId>,
}

impl Book {
    /// Scans `dir` and builds the whole section tree.
    ///
    /// Fails on any structural problem: inadmissible kinds, sections nested
    /// below a subchapter, missing titles, a missing book title, or
    /// repeated identifiers.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, BookError> {
        let dir = dir.as_ref().to_path_buf();
        let mut builder = TreeBuilder::default();
        builder.add_section(&dir, None)?;

        let metadata = read_book_metadata(&dir, &builder.nodes[SectionId::ROOT.0].files)?;
        let mut book = Book {
            dir,
            metadata,
            nodes: builder.nodes,
            by_identifier: HashMap::new(),
        };
        book.assign_indices();
        book.assign_identifiers_and_titles()?;
        log::debug!(
            "loaded book {:?} with {} sections",
            book.metadata.title,
            book.nodes.len()
        );
        Ok(book)
    }

    /// Book directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Metadata block of the root.
    pub fn metadata(&self) -> &BookMetadata {
        &self.metadata
    }

    /// Book title.
    pub fn title(&self) -> &str {
        &self.metadata.title
    }

    /// Book language.
    pub fn lang(&self) -> Lang {
        self.metadata.lang
    }

    /// Bibliography file declared in the metadata, resolved against the book directory.
    pub fn bibliography_path(&self) -> Option<PathBuf> {
        self.metadata
            .bibliography
            .as_ref()
            .map(|path| self.dir.join(path))
    }

    /// The book root section.
    pub fn root(&self) -> Section<'_> {
        self.section(SectionId::ROOT)
    }

    /// Section handle for `id`.
    ///
    /// # Panics
    /// If `id` does not come from this book.
    pub fn section(&self, id: SectionId) -> Section<'_> {
        assert!(id.0 < self.nodes.len(), "section id out of range");
        Section { book: self, id }
    }

    /// Every section, root included, in document order.
    pub fn sections(&self) -> impl Iterator<Item = Section<'_>> {
        (0..self.nodes.len()).map(|index| self.section(SectionId(index)))
    }

    /// Parts and chapters in document order: one output document each.
    pub fn rendering_units(&self) -> impl Iterator<Item = Section<'_>> {
        self.sections()
            .filter(|section| matches!(section.kind(), SectionKind::Part | SectionKind::Chapter))
    }

    /// Looks a section up by identifier.
    pub fn section_by_identifier(&self, identifier: &str) -> Result<Section<'_>, BookError> {
        self.by_identifier
            .get(identifier)
            .map(|id| self.section(*id))
            .ok_or_else(|| BookError::UnknownSection {
                identifier: identifier.to_string(),
            })
    }

    /// Whether any top-level section is a part.
    pub fn has_parts(&self) -> bool {
        self.root()
            .children()
            .any(|section| section.kind() == SectionKind::Part)
    }

    fn node(&self, id: SectionId) -> &SectionNode {
        &self.nodes[id.0]
    }

    /// Counts same-kind sections in document order.
    fn assign_indices(&mut self) {
        let mut counts: HashMap<SectionKind, usize> = HashMap::new();
        for node in self.nodes.iter_mut().skip(1) {
            let count = counts.entry(node.kind).or_insert(0);
            *count += 1;
            node.index = *count;
        }
    }

    fn assign_identifiers_and_titles(&mut self) -> Result<(), BookError> {
        for position in 1..self.nodes.len() {
            let node = &self.nodes[position];
            let header = node.header.as_ref().ok_or_else(|| BookError::MissingTitle {
                dir: node.dir.clone(),
            })?;
            let title = header.text.clone();

            let identifier = match &header.id {
                Some(id) => id.clone(),
                None => match node.kind {
                    SectionKind::Part => format!("part_{}", node.index),
                    SectionKind::Chapter => format!("chapter_{}", node.index),
                    SectionKind::Subchapter => {
                        // Parents precede children in document order.
                        let parent = node.parent.unwrap_or(SectionId::ROOT);
                        let parent_identifier =
                            self.nodes[parent.0].identifier.as_deref().unwrap_or_default();
                        format!("{parent_identifier}_{}", node.index)
                    }
                    SectionKind::Book => unreachable!("only the root is a book"),
                },
            };

            if self
                .by_identifier
                .insert(identifier.clone(), SectionId(position))
                .is_some()
            {
                return Err(BookError::DuplicateSectionId { identifier });
            }

            let node = &mut self.nodes[position];
            node.identifier = Some(identifier);
            node.title = Some(title);
        }
        Ok(())
    }
}

/// Borrowed view of one section of a [`Book`].
#[derive(Clone, Copy)]
pub struct Section<'a> {
    book: &'a Book,
    id: SectionId,
}

impl<'a> Section<'a> {
    fn node(&self) -> &'a SectionNode {
        self.book.node(self.id)
    }

    /// Arena index of this section.
    pub fn id(&self) -> SectionId {
        self.id
    }

    /// Owning book.
    pub fn book(&self) -> &'a Book {
        self.book
    }

    /// The book root, reached by walking parents.
    pub fn root(&self) -> Section<'a> {
        self.ancestors().last().unwrap_or(*self)
    }

    /// Section kind.
    pub fn kind(&self) -> SectionKind {
        self.node().kind
    }

    /// Identifier; `None` only for the book root.
    pub fn identifier(&self) -> Option<&'a str> {
        self.node().identifier.as_deref()
    }

    /// Display title; the book title for the root.
    pub fn title(&self) -> &'a str {
        match &self.node().title {
            Some(title) => title,
            None => self.book.title(),
        }
    }

    /// 1-based count of same-kind sections up to this one in document order; 0 for the root.
    pub fn index(&self) -> usize {
        self.node().index
    }

    /// Section directory.
    pub fn dir(&self) -> &'a Path {
        &self.node().dir
    }

    /// Markup files backing this section, in filename order.
    pub fn markup_files(&self) -> &'a [PathBuf] {
        &self.node().files
    }

    /// First visible header of the section's markup.
    pub fn header(&self) -> Option<&'a Header> {
        self.node().header.as_ref()
    }

    /// Enclosing section.
    pub fn parent(&self) -> Option<Section<'a>> {
        self.node().parent.map(|id| self.book.section(id))
    }

    /// Child sections in directory-name order.
    pub fn children(&self) -> impl Iterator<Item = Section<'a>> + use<'a> {
        let book = self.book;
        self.node().children.iter().map(move |id| book.section(*id))
    }

    /// Whether this section has child sections.
    pub fn has_children(&self) -> bool {
        !self.node().children.is_empty()
    }

    /// Enclosing sections, nearest first.
    pub fn ancestors(&self) -> impl Iterator<Item = Section<'a>> + use<'a> {
        std::iter::successors(self.parent(), |section| section.parent())
    }

    /// Whether an enclosing section is a part.
    ///
    /// `None` for the book root and for parts, where the question does not apply.
    pub fn is_within_a_part(&self) -> Option<bool> {
        match self.kind() {
            SectionKind::Book | SectionKind::Part => None,
            _ => Some(
                self.ancestors()
                    .any(|section| section.kind() == SectionKind::Part),
            ),
        }
    }

    /// Header level this section's main header is rendered at.
    pub fn base_header_level(&self) -> usize {
        match (self.kind(), self.is_within_a_part()) {
            (SectionKind::Book | SectionKind::Part, _) => 1,
            (SectionKind::Chapter, Some(true)) => 2,
            (SectionKind::Chapter, _) => 1,
            (SectionKind::Subchapter, Some(true)) => 3,
            (SectionKind::Subchapter, _) => 2,
        }
    }

    /// Looks up a section by identifier anywhere in the book.
    pub fn section_by_identifier(&self, identifier: &str) -> Result<Section<'a>, BookError> {
        self.book.section_by_identifier(identifier)
    }

    /// Book language.
    pub fn lang(&self) -> Lang {
        self.book.lang()
    }

    /// Bibliography file of the book.
    pub fn bibliography_path(&self) -> Option<PathBuf> {
        self.book.bibliography_path()
    }

    /// Whether there is no markup behind this section.
    pub fn has_no_markup(&self) -> bool {
        self.node().files.is_empty()
    }

    /// Fresh iterator over the section's normalized markup lines.
    ///
    /// Files are read when this is called; normalization happens lazily.
    pub fn markup_lines(&self) -> Result<MarkupLines, BookError> {
        let sources = read_sources(self.markup_files())?;
        Ok(MarkupLines::new(
            sources,
            MarkupShape {
                base_level: self.base_header_level(),
                strip_metadata: self.kind() == SectionKind::Book,
                single_header: self.has_children() && self.kind() != SectionKind::Book,
            },
        ))
    }

    /// The whole normalized markup as one string.
    pub fn markup_text(&self) -> Result<String, BookError> {
        self.markup_lines()?.collect()
    }
}

impl fmt::Debug for Section<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Section")
            .field("kind", &self.kind())
            .field("identifier", &self.identifier())
            .field("title", &self.title())
            .field("dir", &self.dir())
            .finish()
    }
}

impl PartialEq for Section<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.book, other.book) && self.id == other.id
    }
}

#[derive(Default)]
struct TreeBuilder {
    nodes: Vec<SectionNode>,
}

impl TreeBuilder {
    fn add_section(&mut self, dir: &Path, parent: Option<SectionId>) -> Result<SectionId, BookError> {
        let parent_kind = parent.map(|id| self.nodes[id.0].kind);
        if parent_kind == Some(SectionKind::Subchapter) {
            return Err(BookError::SectionTooDeep {
                dir: dir.to_path_buf(),
            });
        }

        let files = markup_files_in(dir)?;
        if files.is_empty() {
            log::warn!("section directory without markup files: {}", dir.display());
        }
        let sources = read_sources(&files)?;
        let header = first_visible_header(&sources, parent.is_none())
            .map(parse_header_line)
            .transpose()?;
        let kind = decide_kind(dir, parent_kind, header.as_ref().and_then(|h| h.section_kind))?;
        log::debug!("{} is a {kind}", dir.display());

        let id = SectionId(self.nodes.len());
        self.nodes.push(SectionNode {
            dir: dir.to_path_buf(),
            kind,
            parent,
            children: Vec::new(),
            files,
            header,
            index: 0,
            identifier: None,
            title: None,
        });

        for subdir in subdirs_in(dir)? {
            let child = self.add_section(&subdir, Some(id))?;
            self.nodes[id.0].children.push(child);
        }
        Ok(id)
    }
}

fn decide_kind(
    dir: &Path,
    parent_kind: Option<SectionKind>,
    hint: Option<SectionKind>,
) -> Result<SectionKind, BookError> {
    let Some(parent_kind) = parent_kind else {
        return match hint {
            None | Some(SectionKind::Book) => Ok(SectionKind::Book),
            Some(kind) => Err(BookError::InadmissibleKind {
                kind,
                parent: SectionKind::Book,
                allowed: SectionKind::Book.to_string(),
                dir: dir.to_path_buf(),
            }),
        };
    };

    let admissible = parent_kind.admissible_children();
    match hint {
        None => admissible.first().copied().ok_or_else(|| BookError::SectionTooDeep {
            dir: dir.to_path_buf(),
        }),
        Some(kind) if admissible.contains(&kind) => Ok(kind),
        Some(kind) => Err(BookError::InadmissibleKind {
            kind,
            parent: parent_kind,
            allowed: admissible
                .iter()
                .map(|kind| kind.as_str())
                .collect::<Vec<_>>()
                .join(","),
            dir: dir.to_path_buf(),
        }),
    }
}

fn read_book_metadata(dir: &Path, files: &[PathBuf]) -> Result<BookMetadata, BookError> {
    let Some(first) = files.first() else {
        return Err(BookError::MissingBookTitle {
            dir: dir.to_path_buf(),
        });
    };
    let source = SourceFile::read(first)?;
    BookMetadata::from_markup(&source.text)?.ok_or_else(|| BookError::MissingBookTitle {
        dir: dir.to_path_buf(),
    })
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with('.'))
}

fn sorted_entries(dir: &Path, keep: impl Fn(&Path) -> bool) -> Result<Vec<PathBuf>, BookError> {
    let entries = std::fs::read_dir(dir).map_err(|err| BookError::io(dir, err))?;
    let mut paths = Vec::new();
    for entry in entries {
        let path = entry.map_err(|err| BookError::io(dir, err))?.path();
        if !is_hidden(&path) && keep(&path) {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

fn markup_files_in(dir: &Path) -> Result<Vec<PathBuf>, BookError> {
    sorted_entries(dir, |path| {
        path.is_file() && path.extension().is_some_and(|ext| ext == MARKUP_EXTENSION)
    })
}

fn subdirs_in(dir: &Path) -> Result<Vec<PathBuf>, BookError> {
    sorted_entries(dir, Path::is_dir)
}
