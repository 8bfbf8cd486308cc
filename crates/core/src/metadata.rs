//! Book metadata, read from the YAML block that opens the root markup file.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::locale::Lang;

/// The metadata block of a markup file.
#[derive(Debug)]
pub struct MetadataBlock {
    /// Block contents as a JSON mapping.
    pub value: JsonValue,
    /// Byte offset of the first line after the closing fence.
    pub body_start: usize,
}

/// Errors raised while reading the metadata block.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// Opening `---` with no closing one.
    #[error("Unterminated YAML metadata block: expected closing '---'")]
    Unterminated,
    /// Invalid YAML.
    #[error("Metadata parse error: {0}")]
    Yaml(String),
    /// The block is a scalar or a sequence.
    #[error("Metadata must be a YAML mapping at the top level")]
    NotAMapping,
    /// The mapping does not fit [`BookMetadata`].
    #[error("Metadata schema error: {0}")]
    Schema(String),
}

impl MetadataBlock {
    /// Finds the block at the start of `input`, after any blank lines.
    ///
    /// `Ok(None)` when the first non-blank line is not a fence.
    pub fn extract(input: &str) -> Result<Option<Self>, MetadataError> {
        let (text, bom_len) = match input.strip_prefix('\u{feff}') {
            Some(rest) => (rest, '\u{feff}'.len_utf8()),
            None => (input, 0),
        };

        let mut lines = text.split_inclusive('\n');
        let mut offset = 0;
        let opening = loop {
            let Some(line) = lines.next() else {
                return Ok(None);
            };
            offset += line.len();
            if !line.trim().is_empty() {
                break line;
            }
        };
        if !is_fence(opening) {
            return Ok(None);
        }

        let block_start = offset;
        for line in lines {
            if is_fence(line) {
                let value = parse_block(&text[block_start..offset])?;
                return Ok(Some(Self {
                    value,
                    body_start: bom_len + offset + line.len(),
                }));
            }
            offset += line.len();
        }
        Err(MetadataError::Unterminated)
    }
}

fn parse_block(block: &str) -> Result<JsonValue, MetadataError> {
    let yaml: serde_yaml::Value =
        serde_yaml::from_str(block).map_err(|err| MetadataError::Yaml(err.to_string()))?;
    match serde_json::to_value(yaml).map_err(|err| MetadataError::Yaml(err.to_string()))? {
        JsonValue::Null => Ok(JsonValue::Object(Default::default())),
        value @ JsonValue::Object(_) => Ok(value),
        _ => Err(MetadataError::NotAMapping),
    }
}

/// Any line opening with `---` delimits the metadata block.
pub(crate) fn is_fence(line: &str) -> bool {
    line.starts_with("---")
}

/// Author field: a single name or a list of names.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Authors {
    /// `author: Jane Doe`
    One(String),
    /// `author: [Jane Doe, John Roe]`
    Many(Vec<String>),
}

impl Authors {
    /// All author names in declaration order.
    pub fn names(&self) -> Vec<&str> {
        match self {
            Authors::One(name) => vec![name.as_str()],
            Authors::Many(names) => names.iter().map(String::as_str).collect(),
        }
    }
}

/// Document-wide metadata carried by the book root.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BookMetadata {
    /// Book title (required).
    pub title: String,
    /// Book language; Spanish when absent.
    #[serde(default)]
    pub lang: Lang,
    /// Book author(s).
    #[serde(default)]
    pub author: Option<Authors>,
    /// Bibliography file, relative to the book directory.
    #[serde(default)]
    pub bibliography: Option<PathBuf>,
    /// Unique identifier used by the packaging layer.
    #[serde(default)]
    pub uid: Option<String>,
    /// Any other keys, kept for the packaging layer.
    #[serde(flatten)]
    pub extra: BTreeMap<String, JsonValue>,
}

impl BookMetadata {
    /// Reads book metadata from the leading block of `input`.
    ///
    /// Returns `Ok(None)` when the block is missing or has no `title`.
    pub fn from_markup(input: &str) -> Result<Option<Self>, MetadataError> {
        let Some(block) = MetadataBlock::extract(input)? else {
            return Ok(None);
        };
        if block.value.get("title").is_none() {
            return Ok(None);
        }
        serde_json::from_value(block.value)
            .map(Some)
            .map_err(|err| MetadataError::Schema(err.to_string()))
    }
}
