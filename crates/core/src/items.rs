//! Splits a markup fragment into a flat stream of typed inline items.
//!
//! Recognized items: paragraph breaks (`\n\n`), footnote definitions
//! (`[^id]: text`), footnote references (`[^id]`), citations
//! (`[@key, página 10; @other]`) and internal links (`[text](#section-id)`).
//! Everything between them is plain markup.

use std::ops::Range;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::citation::Locator;
use crate::error::BookError;

const CITE: &str = r"@[^ \],;]+,? *(?:[^\W\d]\w*\.?)?:? *(?:\d+(?:-\d+)?)?";

static PARAGRAPH_BREAK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n{2,}").expect("paragraph regex is valid"));
static FOOTNOTE_DEFINITION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[\^(?P<id>[^\]]*)\]:(?P<content>[^\n]+)")
        .expect("footnote definition regex is valid")
});
static FOOTNOTE_REFERENCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r" *\[\^(?P<id>[^\]]+)\]").expect("footnote reference regex is valid")
});
static CITATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r" *\[(?P<cites>{CITE}(?: *; *{CITE})*)\]"))
        .expect("citation regex is valid")
});
static CITE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^@(?P<key>[^ \],;]+),? *(?P<term>[^\W\d]\w*\.?)?:? *(?:(?P<first>\d+)(?:-(?P<last>\d+))?)?$",
    )
    .expect("cite regex is valid")
});
static INTERNAL_LINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[(?P<text>[^\]]+)\]\(#(?P<target>[^\)]+)\)").expect("internal link regex is valid")
});

/// One entry of a bracketed citation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cite {
    /// Bibliography key.
    pub key: String,
    /// Optional page reference.
    pub locator: Option<Locator>,
}

/// What an inline item is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemKind {
    /// Plain markup, handed to the basic renderer.
    Markup,
    /// Two or more consecutive newlines.
    ParagraphBreak,
    /// `[^id]: content`
    FootnoteDefinition {
        /// Footnote identifier.
        id: String,
        /// Definition text, trimmed.
        content: String,
    },
    /// `[^id]`
    FootnoteReference {
        /// Footnote identifier.
        id: String,
    },
    /// `[@key, term 10; @other]`
    Citation {
        /// Entries cited in the bracket, in order.
        cites: Vec<Cite>,
    },
    /// `[text](#section-id)`
    InternalLink {
        /// Link text.
        text: String,
        /// Identifier of the target section.
        target: String,
    },
}

/// A typed span of the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item<'a> {
    /// Item kind and payload.
    pub kind: ItemKind,
    /// Byte range in the input.
    pub span: Range<usize>,
    /// Source text of the span.
    pub text: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pattern {
    ParagraphBreak,
    FootnoteDefinition,
    FootnoteReference,
    Citation,
    InternalLink,
}

impl Pattern {
    /// Tie-break order for matches starting at the same offset.
    const PRIORITY: [Pattern; 5] = [
        Pattern::ParagraphBreak,
        Pattern::FootnoteDefinition,
        Pattern::FootnoteReference,
        Pattern::Citation,
        Pattern::InternalLink,
    ];

    fn regex(self) -> &'static Regex {
        match self {
            Pattern::ParagraphBreak => &*PARAGRAPH_BREAK_RE,
            Pattern::FootnoteDefinition => &*FOOTNOTE_DEFINITION_RE,
            Pattern::FootnoteReference => &*FOOTNOTE_REFERENCE_RE,
            Pattern::Citation => &*CITATION_RE,
            Pattern::InternalLink => &*INTERNAL_LINK_RE,
        }
    }
}

/// Splits `text` into inline items, paragraph breaks included.
///
/// A citation whose entries cannot be parsed is an error; after it the
/// iterator is exhausted.
pub fn split(text: &str) -> Items<'_> {
    Items::new(text)
}

/// Iterator over the inline items of a fragment.
///
/// Items partition the input: their spans are contiguous and cover it
/// completely. Empty input yields a single empty markup item.
#[derive(Debug, Clone)]
pub struct Items<'a> {
    text: &'a str,
    position: usize,
    paragraph_breaks: bool,
    /// Next match per pattern, `Some(None)` once a pattern is exhausted.
    lookahead: [Option<Option<Range<usize>>>; 5],
    pending: Option<Item<'a>>,
    done: bool,
}

impl<'a> Items<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            position: 0,
            paragraph_breaks: true,
            lookahead: Default::default(),
            pending: None,
            done: false,
        }
    }

    /// Treats paragraph breaks as plain markup.
    pub fn without_paragraph_breaks(mut self) -> Self {
        self.paragraph_breaks = false;
        self
    }

    fn next_match(&mut self, slot: usize, pattern: Pattern) -> Option<Range<usize>> {
        let stale = match &self.lookahead[slot] {
            None => true,
            Some(Some(range)) => range.start < self.position,
            Some(None) => false,
        };
        if stale {
            self.lookahead[slot] = Some(
                pattern
                    .regex()
                    .find_at(self.text, self.position)
                    .map(|found| found.range()),
            );
        }
        self.lookahead[slot].clone().flatten()
    }

    fn earliest_match(&mut self) -> Option<(Pattern, Range<usize>)> {
        let mut best: Option<(Pattern, Range<usize>)> = None;
        for (slot, pattern) in Pattern::PRIORITY.into_iter().enumerate() {
            if pattern == Pattern::ParagraphBreak && !self.paragraph_breaks {
                continue;
            }
            let Some(range) = self.next_match(slot, pattern) else {
                continue;
            };
            if best.as_ref().is_none_or(|(_, current)| range.start < current.start) {
                best = Some((pattern, range));
            }
        }
        best
    }

    fn typed_item(&self, pattern: Pattern, span: Range<usize>) -> Result<Item<'a>, BookError> {
        let text = &self.text[span.clone()];
        let kind = match pattern {
            Pattern::ParagraphBreak => ItemKind::ParagraphBreak,
            Pattern::FootnoteDefinition => {
                let captures = captures(pattern, text);
                ItemKind::FootnoteDefinition {
                    id: captures["id"].to_string(),
                    content: captures["content"].trim().to_string(),
                }
            }
            Pattern::FootnoteReference => ItemKind::FootnoteReference {
                id: captures(pattern, text)["id"].to_string(),
            },
            Pattern::Citation => ItemKind::Citation {
                cites: captures(pattern, text)["cites"]
                    .split(';')
                    .map(parse_cite)
                    .collect::<Result<_, _>>()?,
            },
            Pattern::InternalLink => {
                let captures = captures(pattern, text);
                ItemKind::InternalLink {
                    text: captures["text"].to_string(),
                    target: captures["target"].to_string(),
                }
            }
        };
        Ok(Item { kind, span, text })
    }

    fn markup(&self, span: Range<usize>) -> Item<'a> {
        Item {
            kind: ItemKind::Markup,
            text: &self.text[span.clone()],
            span,
        }
    }
}

/// Re-runs `pattern` on a span it is known to match in full.
fn captures(pattern: Pattern, text: &str) -> Captures<'_> {
    match pattern.regex().captures(text) {
        Some(captures) => captures,
        None => unreachable!("{pattern:?} matched this span"),
    }
}

fn parse_cite(raw: &str) -> Result<Cite, BookError> {
    let raw = raw.trim();
    let Some(captures) = CITE_RE.captures(raw) else {
        return Err(BookError::MalformedCitation {
            citation: raw.to_string(),
        });
    };
    let positions = ["first", "last"]
        .into_iter()
        .filter_map(|name| captures.name(name))
        .map(|found| {
            found
                .as_str()
                .parse::<u32>()
                .map_err(|_| BookError::LocatorOutOfRange {
                    citation: raw.to_string(),
                    position: found.as_str().to_string(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;
    let term = captures.name("term").map(|term| term.as_str());
    let locator = (term.is_some() || !positions.is_empty()).then(|| Locator::new(term, &positions));
    Ok(Cite {
        key: captures["key"].to_string(),
        locator,
    })
}

impl<'a> Iterator for Items<'a> {
    type Item = Result<Item<'a>, BookError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(item) = self.pending.take() {
            return Some(Ok(item));
        }
        if self.done {
            return None;
        }

        let Some((pattern, span)) = self.earliest_match() else {
            self.done = true;
            return Some(Ok(self.markup(self.position..self.text.len())));
        };

        let start = self.position;
        self.position = span.end;
        if self.position >= self.text.len() {
            self.done = true;
        }

        let item = match self.typed_item(pattern, span.clone()) {
            Ok(item) => item,
            Err(err) => {
                self.done = true;
                return Some(Err(err));
            }
        };
        if start < span.start {
            self.pending = Some(item);
            return Some(Ok(self.markup(start..span.start)));
        }
        Some(Ok(item))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn items(text: &str) -> Vec<Item<'_>> {
        split(text).collect::<Result<_, _>>().unwrap()
    }

    fn kinds(text: &str) -> Vec<ItemKind> {
        items(text).into_iter().map(|item| item.kind).collect()
    }

    fn texts(text: &str) -> Vec<&str> {
        items(text).into_iter().map(|item| item.text).collect()
    }

    #[test]
    fn footnote_and_citation_in_source_order() {
        let text = "See this[^1] and that [@pigli2013, página 10].";
        assert_eq!(
            kinds(text),
            vec![
                ItemKind::Markup,
                ItemKind::FootnoteReference { id: "1".into() },
                ItemKind::Markup,
                ItemKind::Citation {
                    cites: vec![Cite {
                        key: "pigli2013".into(),
                        locator: Some(Locator::new(Some("página"), &[10])),
                    }],
                },
                ItemKind::Markup,
            ]
        );
        assert_eq!(
            texts(text),
            vec!["See this", "[^1]", " and that", " [@pigli2013, página 10]", "."]
        );
    }

    #[test]
    fn spans_partition_the_input() {
        let text = "Intro[^a].\n\nMore [link](#chapter_2) text [@hebb].\n\n[^a]: The note";
        let mut cursor = 0;
        for item in items(text) {
            assert_eq!(item.span.start, cursor);
            assert_eq!(&text[item.span.clone()], item.text);
            cursor = item.span.end;
        }
        assert_eq!(cursor, text.len());
    }

    #[test]
    fn definition_wins_over_reference_at_same_offset() {
        assert_eq!(
            kinds("[^2]: Second note"),
            vec![ItemKind::FootnoteDefinition {
                id: "2".into(),
                content: "Second note".into(),
            }]
        );
    }

    #[test]
    fn paragraph_breaks_can_be_disabled() {
        assert_eq!(
            kinds("one\n\ntwo"),
            vec![ItemKind::Markup, ItemKind::ParagraphBreak, ItemKind::Markup]
        );
        let items: Vec<_> = split("one\n\ntwo")
            .without_paragraph_breaks()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].text, "one\n\ntwo");
    }

    #[test]
    fn empty_input_is_one_empty_item() {
        let items = items("");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].kind, ItemKind::Markup);
        assert_eq!(items[0].text, "");
    }

    #[test]
    fn no_trailing_item_when_match_ends_the_text() {
        assert_eq!(texts("text[^1]"), vec!["text", "[^1]"]);
    }

    #[test]
    fn multiple_cites_share_a_bracket() {
        let items = items("[@okasha; @pigli2013, p. 3-5; @hebb 12]");
        assert_eq!(items.len(), 1);
        let ItemKind::Citation { cites } = &items[0].kind else {
            panic!("expected a citation, got {:?}", items[0].kind);
        };
        assert_eq!(
            cites,
            &vec![
                Cite {
                    key: "okasha".into(),
                    locator: None,
                },
                Cite {
                    key: "pigli2013".into(),
                    locator: Some(Locator::new(Some("p."), &[3, 5])),
                },
                Cite {
                    key: "hebb".into(),
                    locator: Some(Locator::new(None, &[12])),
                },
            ]
        );
    }

    #[test]
    fn internal_links_capture_target() {
        assert_eq!(
            kinds("[the second chapter](#chapter_2)"),
            vec![ItemKind::InternalLink {
                text: "the second chapter".into(),
                target: "chapter_2".into(),
            }]
        );
    }

    #[test]
    fn oversized_page_numbers_are_errors() {
        let err = split("[@hebb 99999999999]")
            .collect::<Result<Vec<_>, _>>()
            .unwrap_err();
        assert!(
            matches!(err, BookError::LocatorOutOfRange { ref position, .. } if position == "99999999999"),
            "{err}"
        );

        let mut items = split("Text [@okasha; @hebb, p. 12-99999999999] after");
        assert!(matches!(
            items.next(),
            Some(Err(BookError::LocatorOutOfRange { .. }))
        ));
        assert!(items.next().is_none());
    }

    #[test]
    fn malformed_cites_are_errors() {
        assert!(matches!(
            parse_cite("@hebb p. 10 extra"),
            Err(BookError::MalformedCitation { ref citation }) if citation == "@hebb p. 10 extra"
        ));
        assert_eq!(
            parse_cite(" @hebb, p. 10 ").unwrap(),
            Cite {
                key: "hebb".into(),
                locator: Some(Locator::new(Some("p."), &[10])),
            }
        );
    }

    #[test]
    fn plain_brackets_are_markup() {
        assert_eq!(kinds("[not a citation] and [x](http://a.b)"), vec![ItemKind::Markup]);
    }
}
