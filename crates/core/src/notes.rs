//! Endnote collection for one rendering pass.
//!
//! Footnote and citation notes are numbered as their references are met
//! and ordered for the back matter by where they are referenced, not by
//! where a footnote happens to be defined.
//!
//! Note ids live in two namespaces: `fn_<id>` for footnotes and
//! `cite_<key>_<number>` for citations.

use std::collections::{HashMap, HashSet};

use crate::error::BookError;

/// Where a note is referenced from the main text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteReference {
    /// Anchor identifier shared by the reference and the note.
    pub note_id: String,
    /// Visible note number.
    pub number: usize,
    /// Whether this is the first reference to the note.
    pub first: bool,
}

/// A note ready for the back matter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteDefinition {
    /// Anchor identifier shared with the reference.
    pub note_id: String,
    /// Visible note number.
    pub number: usize,
    /// Rendered note body.
    pub body: String,
    /// Href of the document holding the first reference.
    pub backlink: String,
    /// Offset of the reference within the pass; drives ordering.
    pub reference_offset: usize,
    /// Footnote identifier, for footnotes.
    pub footnote_id: Option<String>,
}

#[derive(Debug)]
struct PendingNote {
    note_id: String,
    number: usize,
    reference_offset: usize,
    backlink: String,
    footnote_id: Option<String>,
    body: Option<String>,
}

/// Collects note references and definitions during a rendering pass.
#[derive(Debug, Default)]
pub struct NoteAggregator {
    notes: Vec<PendingNote>,
    footnotes_by_id: HashMap<String, usize>,
    definitions: Vec<(String, String)>,
    defined: HashSet<String>,
    count: usize,
}

impl NoteAggregator {
    /// Empty aggregator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of notes assigned so far.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Registers a reference to footnote `id` found at `offset`.
    ///
    /// Referencing a footnote again is allowed and reuses its number.
    pub fn reference_footnote(&mut self, id: &str, offset: usize, backlink: &str) -> NoteReference {
        if let Some(&position) = self.footnotes_by_id.get(id) {
            let note = &self.notes[position];
            return NoteReference {
                note_id: note.note_id.clone(),
                number: note.number,
                first: false,
            };
        }

        self.count += 1;
        log::debug!("footnote {id} is note {}", self.count);
        self.footnotes_by_id.insert(id.to_string(), self.notes.len());
        self.push(format!("fn_{id}"), offset, backlink, Some(id.to_string()), None)
    }

    /// Registers the body of footnote `id`; each footnote is defined once.
    pub fn define_footnote(&mut self, id: &str, body: impl Into<String>) -> Result<(), BookError> {
        if !self.defined.insert(id.to_string()) {
            return Err(BookError::DuplicateFootnoteDefinition { id: id.to_string() });
        }
        self.definitions.push((id.to_string(), body.into()));
        Ok(())
    }

    /// Adds a citation note referenced at `offset`; its id is `cite_<key>_<number>`.
    pub fn add_citation_note(
        &mut self,
        key: &str,
        offset: usize,
        body: impl Into<String>,
        backlink: &str,
    ) -> NoteReference {
        self.count += 1;
        let note_id = format!("cite_{key}_{}", self.count);
        log::debug!("citation {key} is note {}", self.count);
        self.push(note_id, offset, backlink, None, Some(body.into()))
    }

    fn push(
        &mut self,
        note_id: String,
        offset: usize,
        backlink: &str,
        footnote_id: Option<String>,
        body: Option<String>,
    ) -> NoteReference {
        let reference = NoteReference {
            note_id: note_id.clone(),
            number: self.count,
            first: true,
        };
        self.notes.push(PendingNote {
            note_id,
            number: self.count,
            reference_offset: offset,
            backlink: backlink.to_string(),
            footnote_id,
            body,
        });
        reference
    }

    /// Matches footnote bodies to their references and returns every note
    /// ordered by reference offset.
    ///
    /// Fails on a referenced footnote without a definition and on a
    /// definition nothing refers to.
    pub fn finalize_ordering(self) -> Result<Vec<NoteDefinition>, BookError> {
        let NoteAggregator {
            mut notes,
            footnotes_by_id,
            definitions,
            ..
        } = self;

        for (id, body) in definitions {
            let Some(&position) = footnotes_by_id.get(&id) else {
                return Err(BookError::UnreferencedFootnote { id });
            };
            notes[position].body = Some(body);
        }

        let mut ordered = notes
            .into_iter()
            .map(|note| {
                let Some(body) = note.body else {
                    return Err(BookError::UnresolvedFootnote {
                        id: note.footnote_id.unwrap_or(note.note_id),
                    });
                };
                Ok(NoteDefinition {
                    note_id: note.note_id,
                    number: note.number,
                    body,
                    backlink: note.backlink,
                    reference_offset: note.reference_offset,
                    footnote_id: note.footnote_id,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        ordered.sort_by_key(|note| note.reference_offset);
        Ok(ordered)
    }
}
