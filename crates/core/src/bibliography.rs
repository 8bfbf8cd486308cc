//! Bibliography database: entry records keyed by citation key.
//!
//! Entries are read from a JSON or YAML mapping of key to record. Author and
//! editor fields keep the BibTeX convention of names joined by `and`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer};

use crate::error::BookError;

/// One bibliography record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Entry {
    /// `Last, First and First Last` style author list.
    #[serde(default)]
    pub author: Option<String>,
    /// Editor list, same syntax as `author`.
    #[serde(default)]
    pub editor: Option<String>,
    /// Title, possibly wrapped in BibTeX braces.
    pub title: String,
    /// Publisher name.
    #[serde(default)]
    pub publisher: Option<String>,
    /// Publication year; numbers and strings are both accepted.
    #[serde(default, deserialize_with = "string_or_number")]
    pub year: Option<String>,
    /// Address of an online source.
    #[serde(default)]
    pub url: Option<String>,
    /// Access date of `url`, `YYYY-MM-DD`.
    #[serde(default, deserialize_with = "string_or_number")]
    pub urldate: Option<String>,
    /// Title of the container (site, collection) of an online source.
    #[serde(default)]
    pub booktitle: Option<String>,
}

impl Entry {
    /// Title with enclosing BibTeX braces removed.
    pub fn plain_title(&self) -> &str {
        self.title.trim_start_matches('{').trim_end_matches('}')
    }

    /// Parsed authors; empty when the field is absent.
    pub fn authors(&self, key: &str) -> Result<Vec<Name>, BookError> {
        parse_names(self.author.as_deref(), key)
    }

    /// Parsed editors; empty when the field is absent.
    pub fn editors(&self, key: &str) -> Result<Vec<Name>, BookError> {
        parse_names(self.editor.as_deref(), key)
    }
}

/// A personal name split into surname and given names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Name {
    /// Surname.
    pub last: String,
    /// Given names, when present.
    pub first: Option<String>,
}

impl Name {
    /// Parses `Last, First` or `First Last` (the last word is the surname).
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if let Some((last, first)) = raw.split_once(',') {
            let last = last.trim();
            if last.is_empty() {
                return None;
            }
            let first = first.trim();
            return Some(Self {
                last: last.to_string(),
                first: (!first.is_empty()).then(|| first.to_string()),
            });
        }

        let (first, last) = match raw.rsplit_once(char::is_whitespace) {
            Some((first, last)) => (Some(first.trim()), last),
            None => (None, raw),
        };
        if last.is_empty() {
            return None;
        }
        Some(Self {
            last: last.to_string(),
            first: first.filter(|first| !first.is_empty()).map(str::to_string),
        })
    }

    /// `Last, First`.
    pub fn last_first(&self) -> String {
        match &self.first {
            Some(first) => format!("{}, {first}", self.last),
            None => self.last.clone(),
        }
    }

    /// `First Last`.
    pub fn first_last(&self) -> String {
        match &self.first {
            Some(first) => format!("{first} {}", self.last),
            None => self.last.clone(),
        }
    }
}

/// Splits a BibTeX name list on ` and `.
pub fn parse_names(raw: Option<&str>, key: &str) -> Result<Vec<Name>, BookError> {
    let Some(raw) = raw.filter(|raw| !raw.trim().is_empty()) else {
        return Ok(Vec::new());
    };
    raw.split(" and ")
        .map(|name| {
            Name::parse(name).ok_or_else(|| BookError::MalformedName {
                key: key.to_string(),
                name: name.to_string(),
            })
        })
        .collect()
}

/// Entry records keyed by citation key.
#[derive(Debug, Clone, Default)]
pub struct Bibliography {
    entries: BTreeMap<String, Entry>,
}

impl Bibliography {
    /// Loads a database file; the format follows the extension
    /// (`.json`, or `.yaml`/`.yml`).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, BookError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|err| BookError::io(path, err))?;
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        let bibliography = match extension.as_deref() {
            Some("yaml" | "yml") => Self::parse_yaml(&text, path)?,
            Some("json") => Self::parse_json(&text, path)?,
            _ => {
                return Err(BookError::BibliographyParse {
                    path: path.to_path_buf(),
                    message: "expected a .json, .yaml or .yml file".to_string(),
                });
            }
        };
        log::debug!(
            "loaded {} bibliography entries from {}",
            bibliography.len(),
            path.display()
        );
        Ok(bibliography)
    }

    /// Parses a JSON object of key to entry.
    pub fn from_json_str(text: &str) -> Result<Self, BookError> {
        Self::parse_json(text, Path::new("<json>"))
    }

    /// Parses a YAML mapping of key to entry.
    pub fn from_yaml_str(text: &str) -> Result<Self, BookError> {
        Self::parse_yaml(text, Path::new("<yaml>"))
    }

    fn parse_json(text: &str, path: &Path) -> Result<Self, BookError> {
        serde_json::from_str(text)
            .map(|entries| Self { entries })
            .map_err(|err| parse_error(path, err))
    }

    fn parse_yaml(text: &str, path: &Path) -> Result<Self, BookError> {
        serde_yaml::from_str(text)
            .map(|entries| Self { entries })
            .map_err(|err| parse_error(path, err))
    }

    /// Looks an entry up.
    pub fn entry(&self, key: &str) -> Result<&Entry, BookError> {
        self.entries.get(key).ok_or_else(|| BookError::EntryNotFound {
            key: key.to_string(),
        })
    }

    /// Whether `key` is in the database.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Entry keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the database holds no entry.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, Entry)> for Bibliography {
    fn from_iter<T: IntoIterator<Item = (String, Entry)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

fn parse_error(path: &Path, err: impl std::fmt::Display) -> BookError {
    BookError::BibliographyParse {
        path: PathBuf::from(path),
        message: err.to_string(),
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Text(String),
        Integer(i64),
    }

    Ok(Option::<Scalar>::deserialize(deserializer)?.map(|scalar| match scalar {
        Scalar::Text(text) => text,
        Scalar::Integer(number) => number.to_string(),
    }))
}
