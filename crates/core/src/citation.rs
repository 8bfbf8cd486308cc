//! Citation notes with "ibid" detection, and full reference-list entries.

use chrono::{Datelike, NaiveDate};

use crate::bibliography::{Bibliography, Entry, Name};
use crate::error::BookError;
use crate::locale::{Lang, join_with_conjunction};

/// Page or position reference attached to a citation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Locator {
    /// Word printed before the positions (`página`, `p.`, `chapter`).
    pub term: Option<String>,
    /// One position or a `first-last` range.
    pub positions: Vec<u32>,
}

impl Locator {
    /// Builds a locator; an empty term counts as no term.
    pub fn new(term: Option<&str>, positions: &[u32]) -> Self {
        Self {
            term: term.filter(|term| !term.is_empty()).map(str::to_string),
            positions: positions.to_vec(),
        }
    }

    /// Renders `term 10` or `term 10-12`.
    pub fn text(&self) -> Result<String, BookError> {
        let mut text = match &self.term {
            Some(term) => format!("{term} "),
            None => String::new(),
        };
        match self.positions.as_slice() {
            [page] => text.push_str(&page.to_string()),
            [first, last] => text.push_str(&format!("{first}-{last}")),
            other => {
                return Err(BookError::MalformedLocator { count: other.len() });
            }
        }
        Ok(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CachedCitation {
    key: String,
    locator: Option<Locator>,
}

/// Memo of the last rendered citation, used to abbreviate repeats as "Ibid".
///
/// One cache belongs to one rendering pass.
#[derive(Debug, Clone, Default)]
pub struct CitationCache {
    last: Option<CachedCitation>,
}

impl CitationCache {
    /// Empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Forgets the last citation.
    pub fn clear(&mut self) {
        self.last = None;
    }

    /// Whether no citation has been rendered since the last clear.
    pub fn is_empty(&self) -> bool {
        self.last.is_none()
    }

    /// Renders the note text for one citation and remembers it.
    ///
    /// Citing the cached entry again renders "Ibid", unless the cached
    /// citation had a locator and this one has none. The locator is left
    /// out of an "Ibid" when it equals the cached one.
    ///
    /// `clear_cache` takes effect only once `key` is found, so a lookup
    /// error leaves the cache as it was.
    pub fn render_note(
        &mut self,
        bibliography: &Bibliography,
        key: &str,
        locator: Option<&Locator>,
        clear_cache: bool,
        lang: Lang,
    ) -> Result<String, BookError> {
        let entry = bibliography.entry(key)?;
        if clear_cache {
            self.clear();
        }

        let cached = self.last.as_ref();
        let cached_locator = cached.and_then(|cached| cached.locator.as_ref());
        let same_entry = cached.is_some_and(|cached| cached.key == key);
        let is_ibid = same_entry && !(locator.is_none() && cached_locator.is_some());

        let locator_text = if is_ibid && locator == cached_locator {
            None
        } else {
            locator.map(Locator::text).transpose()?
        };

        let note = if is_ibid {
            match locator_text {
                Some(locator) => format!("Ibid, {locator}."),
                None => "Ibid.".to_string(),
            }
        } else {
            let title = entry.plain_title();
            match (surname_text(entry, key, lang)?, locator_text) {
                (Some(surnames), Some(locator)) => {
                    format!("{surnames}, <i>{title}</i>, {locator}.")
                }
                (Some(surnames), None) => format!("{surnames}, <i>{title}</i>."),
                (None, Some(locator)) => format!("“{title}”, {locator}."),
                (None, None) => match lang {
                    Lang::En => format!("“{title}.”"),
                    Lang::Es => format!("“{title}”."),
                },
            }
        };

        self.last = Some(CachedCitation {
            key: key.to_string(),
            locator: locator.cloned(),
        });
        Ok(note)
    }
}

/// Surnames of the authors, or of the editors when there are no authors.
fn surname_text(entry: &Entry, key: &str, lang: Lang) -> Result<Option<String>, BookError> {
    let mut people = entry.authors(key)?;
    if people.is_empty() {
        people = entry.editors(key)?;
    }
    if people.is_empty() {
        return Ok(None);
    }
    let surnames: Vec<&str> = people.iter().map(|name| name.last.as_str()).collect();
    Ok(Some(join_with_conjunction(&surnames, lang)))
}

/// `Last, First`, then `First Last` for the rest, joined with the conjunction.
fn names_list(names: &[Name], lang: Lang) -> String {
    let rendered: Vec<String> = names
        .iter()
        .enumerate()
        .map(|(position, name)| {
            if position == 0 {
                name.last_first()
            } else {
                name.first_last()
            }
        })
        .collect();
    join_with_conjunction(&rendered, lang)
}

fn access_date(key: &str, value: &str, lang: Lang) -> Result<String, BookError> {
    let invalid = || BookError::InvalidUrlDate {
        key: key.to_string(),
        value: value.to_string(),
    };
    let date = NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| invalid())?;
    let month = lang.month_name(date.month()).ok_or_else(invalid)?;
    Ok(match lang {
        Lang::Es => format!("Consultado el {:02} de {month} de {}", date.day(), date.year()),
        Lang::En => format!("Accessed {month} {:02}, {}", date.day(), date.year()),
    })
}

/// Renders the reference-list line for `key`.
///
/// Online sources render as container, quoted title, access date and
/// address. Published works need authors or editors, a publisher and a
/// year; anything less is [`BookError::IncompleteBibliographyEntry`].
pub fn render_bibliography_entry(
    bibliography: &Bibliography,
    key: &str,
    lang: Lang,
) -> Result<String, BookError> {
    let entry = bibliography.entry(key)?;
    let title = entry.plain_title();

    let text = if let Some(url) = &entry.url {
        let mut parts = Vec::new();
        if let Some(booktitle) = &entry.booktitle {
            parts.push(booktitle.clone());
        }
        parts.push(format!("“{title}”"));
        if let Some(urldate) = &entry.urldate {
            parts.push(access_date(key, urldate, lang)?);
        }
        parts.push(url.clone());
        format!("{}.", parts.join(". "))
    } else {
        let incomplete = || BookError::IncompleteBibliographyEntry {
            key: key.to_string(),
        };
        let (Some(publisher), Some(year)) = (&entry.publisher, &entry.year) else {
            return Err(incomplete());
        };
        if title.is_empty() {
            return Err(incomplete());
        }

        let authors = entry.authors(key)?;
        if !authors.is_empty() {
            format!(
                "{}. <i>{title}</i>. {publisher}, {year}.",
                names_list(&authors, lang)
            )
        } else {
            let editors = entry.editors(key)?;
            if editors.is_empty() {
                return Err(incomplete());
            }
            format!(
                "{}, ed. <i>{title}</i>. {publisher}, {year}.",
                names_list(&editors, lang)
            )
        }
    };

    Ok(text.replace("..", "."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;

    fn bibliography() -> Bibliography {
        Bibliography::from_json_str(include_str!("../tests/fixtures/bibliography.json")).unwrap()
    }

    fn page(term: &str, positions: &[u32]) -> Locator {
        Locator::new(Some(term), positions)
    }

    #[test]
    fn ibid_sequence() {
        let db = bibliography();
        let mut cache = CitationCache::new();
        let mut note = |key: &str, locator: Option<Locator>, clear: bool| {
            cache
                .render_note(&db, key, locator.as_ref(), clear, Lang::Es)
                .unwrap()
        };

        assert_eq!(
            note("shortintro", None, false),
            "Okasha, <i>Philosophy of science : a very short introduction</i>."
        );
        assert_eq!(
            note("pigli2013", Some(page("página", &[10])), false),
            "Pigliucci y Boudry, <i>Philosophy of Pseudoscience: Reconsidering the Demarcation Problem</i>, página 10."
        );
        assert_eq!(note("pigli2013", Some(page("página", &[10])), false), "Ibid.");
        assert_eq!(
            note("pigli2013", Some(page("página", &[11])), false),
            "Ibid, página 11."
        );
        assert_eq!(
            note("pigli2013", Some(page("página", &[11])), true),
            "Pigliucci y Boudry, <i>Philosophy of Pseudoscience: Reconsidering the Demarcation Problem</i>, página 11."
        );
        assert_eq!(
            note("pigli2013", None, false),
            "Pigliucci y Boudry, <i>Philosophy of Pseudoscience: Reconsidering the Demarcation Problem</i>."
        );
        assert_eq!(note("pigli2013", None, false), "Ibid.");
        assert_eq!(note("hebb", None, false), "“Hebbian theory”.");
    }

    #[test]
    fn adding_a_locator_after_a_bare_citation_is_still_ibid() {
        let db = bibliography();
        let mut cache = CitationCache::new();
        cache
            .render_note(&db, "shortintro", None, false, Lang::En)
            .unwrap();
        let note = cache
            .render_note(&db, "shortintro", Some(&page("p.", &[3, 5])), false, Lang::En)
            .unwrap();
        assert_snapshot!(note, @"Ibid, p. 3-5.");
    }

    #[test]
    fn title_only_forms_depend_on_language() {
        let db = bibliography();
        let mut cache = CitationCache::new();
        assert_eq!(
            cache.render_note(&db, "hebb", None, false, Lang::En).unwrap(),
            "“Hebbian theory.”"
        );
        let note = cache
            .render_note(&db, "hebb", Some(&page("", &[4])), true, Lang::Es)
            .unwrap();
        assert_snapshot!(note, @"“Hebbian theory”, 4.");
    }

    #[test]
    fn malformed_locator_is_fatal() {
        let db = bibliography();
        let mut cache = CitationCache::new();
        let err = cache
            .render_note(&db, "pigli2013", Some(&page("página", &[1, 2, 3])), false, Lang::Es)
            .unwrap_err();
        assert!(matches!(err, BookError::MalformedLocator { count: 3 }), "{err:?}");
        assert!(cache.is_empty());
    }

    #[test]
    fn unknown_key_leaves_cache_untouched() {
        let db = bibliography();
        let mut cache = CitationCache::new();
        cache.render_note(&db, "hebb", None, false, Lang::Es).unwrap();
        let err = cache
            .render_note(&db, "missing", None, true, Lang::Es)
            .unwrap_err();
        assert!(matches!(err, BookError::EntryNotFound { .. }));
        assert_eq!(
            cache.render_note(&db, "hebb", None, false, Lang::Es).unwrap(),
            "Ibid."
        );
    }

    #[test]
    fn full_entries() {
        let db = bibliography();
        assert_eq!(
            render_bibliography_entry(&db, "shortintro", Lang::Es).unwrap(),
            "Okasha, Samir. <i>Philosophy of science : a very short introduction</i>. Oxford University Press, 2002."
        );
        assert_eq!(
            render_bibliography_entry(&db, "pigli2013", Lang::Es).unwrap(),
            "Pigliucci, Massimo y Maarten Boudry, ed. <i>Philosophy of Pseudoscience: Reconsidering the Demarcation Problem</i>. The University of Chicago Press, 2013."
        );
        assert_eq!(
            render_bibliography_entry(&db, "deceptive", Lang::Es).unwrap(),
            "The Great Courses. “Your Deceptive Mind: A Scientific Guide to Critical Thinking”. Consultado el 23 de septiembre de 2016. http://www.thegreatcourses.com/courses/your-deceptive-mind-a-scientific-guide-to-critical-thinking-skills.html."
        );
    }

    #[test]
    fn english_full_entries() {
        let db = bibliography();
        assert_snapshot!(
            render_bibliography_entry(&db, "yale", Lang::En).unwrap(),
            @"Yale University. “About Yale: Yale Facts”. Accessed May 01, 2017. https://www.yale.edu/about-yale/yale-facts."
        );
        assert_snapshot!(
            render_bibliography_entry(&db, "trio", Lang::En).unwrap(),
            @"Sober, Elliott, David Sloan Wilson, and Michael Ruse. <i>Unto Others</i>. Harvard University Press, 1998."
        );
    }

    #[test]
    fn incomplete_entry_is_an_error() {
        let db = bibliography();
        let err = render_bibliography_entry(&db, "hebb", Lang::Es).unwrap_err();
        assert!(
            matches!(err, BookError::IncompleteBibliographyEntry { ref key } if key == "hebb"),
            "{err:?}"
        );
    }

    #[test]
    fn invalid_urldate_is_reported() {
        let db: Bibliography = [(
            "site".to_string(),
            Entry {
                title: "Home".into(),
                url: Some("https://example.org".into()),
                urldate: Some("last week".into()),
                ..Entry::default()
            },
        )]
        .into_iter()
        .collect();
        assert!(matches!(
            render_bibliography_entry(&db, "site", Lang::En),
            Err(BookError::InvalidUrlDate { .. })
        ));
    }
}
