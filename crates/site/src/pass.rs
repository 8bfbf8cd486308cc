//! Per-pass rendering state.

use std::collections::BTreeSet;

use mkbook_core::{
    Bibliography, BookError, Cite, CitationCache, Lang, NoteAggregator, NoteDefinition,
    NoteReference,
};

/// Mutable state of one rendering pass over a book.
///
/// The citation cache, the note aggregator and the set of cited entries
/// live here and nowhere else; every pass starts from a fresh value.
#[derive(Debug)]
pub struct RenderPass {
    lang: Lang,
    reset_ibid_per_unit: bool,
    clear_next_citation: bool,
    citations: CitationCache,
    notes: NoteAggregator,
    cited: BTreeSet<String>,
    offset_base: usize,
}

impl RenderPass {
    /// Fresh pass for a book in `lang`.
    pub fn new(lang: Lang, reset_ibid_per_unit: bool) -> Self {
        Self {
            lang,
            reset_ibid_per_unit,
            clear_next_citation: false,
            citations: CitationCache::new(),
            notes: NoteAggregator::new(),
            cited: BTreeSet::new(),
            offset_base: 0,
        }
    }

    /// Marks the start of a new output document.
    pub fn start_unit(&mut self) {
        if self.reset_ibid_per_unit {
            self.clear_next_citation = true;
        }
    }

    /// Pass-wide offset of position `local` in the current fragment.
    pub fn offset(&self, local: usize) -> usize {
        self.offset_base + local
    }

    /// Moves past a fragment of `len` bytes so later offsets stay larger.
    pub fn advance(&mut self, len: usize) {
        self.offset_base += len + 1;
    }

    /// Renders the note text for a bracketed citation, one sentence per cite.
    pub fn citation_text(
        &mut self,
        bibliography: &Bibliography,
        cites: &[Cite],
    ) -> Result<String, BookError> {
        let mut sentences = Vec::with_capacity(cites.len());
        for cite in cites {
            let clear = std::mem::take(&mut self.clear_next_citation);
            sentences.push(self.citations.render_note(
                bibliography,
                &cite.key,
                cite.locator.as_ref(),
                clear,
                self.lang,
            )?);
            self.cited.insert(cite.key.clone());
        }
        Ok(sentences.join(" "))
    }

    /// Registers a reference to footnote `id`.
    pub fn reference_footnote(&mut self, id: &str, local: usize, backlink: &str) -> NoteReference {
        let offset = self.offset(local);
        self.notes.reference_footnote(id, offset, backlink)
    }

    /// Registers the body of footnote `id`.
    pub fn define_footnote(&mut self, id: &str, body: String) -> Result<(), BookError> {
        self.notes.define_footnote(id, body)
    }

    /// Adds the note of a citation referenced at `local`.
    pub fn add_citation_note(
        &mut self,
        key: &str,
        local: usize,
        body: String,
        backlink: &str,
    ) -> NoteReference {
        let offset = self.offset(local);
        self.notes.add_citation_note(key, offset, body, backlink)
    }

    /// Ends the pass: ordered notes plus every cited entry key.
    pub fn finish(self) -> Result<(Vec<NoteDefinition>, BTreeSet<String>), BookError> {
        let notes = self.notes.finalize_ordering()?;
        Ok((notes, self.cited))
    }
}
