//! Language-dependent wording: conjunctions, month names, back-matter titles.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Languages a book can be rendered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    /// Spanish.
    #[default]
    Es,
    /// English.
    En,
}

const SPANISH_MONTHS: [&str; 12] = [
    "enero",
    "febrero",
    "marzo",
    "abril",
    "mayo",
    "junio",
    "julio",
    "agosto",
    "septiembre",
    "octubre",
    "noviembre",
    "diciembre",
];

const ENGLISH_MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

impl Lang {
    /// ISO 639-1 code.
    pub fn code(self) -> &'static str {
        match self {
            Lang::Es => "es",
            Lang::En => "en",
        }
    }

    /// Copulative conjunction used to join the last item of a list.
    pub fn conjunction(self) -> &'static str {
        match self {
            Lang::Es => "y",
            Lang::En => "and",
        }
    }

    /// Month name for a 1-based month number.
    pub fn month_name(self, month: u32) -> Option<&'static str> {
        let index = usize::try_from(month).ok()?.checked_sub(1)?;
        match self {
            Lang::Es => SPANISH_MONTHS.get(index).copied(),
            Lang::En => ENGLISH_MONTHS.get(index).copied(),
        }
    }

    /// Title of the endnotes chapter.
    pub fn endnotes_title(self) -> &'static str {
        match self {
            Lang::Es => "Notas",
            Lang::En => "Notes",
        }
    }

    /// Title of the bibliography chapter.
    pub fn bibliography_title(self) -> &'static str {
        match self {
            Lang::Es => "Bibliografía",
            Lang::En => "Bibliography",
        }
    }

    /// Accessible label for the link from a note back to its reference.
    pub fn back_to_reference(self) -> &'static str {
        match self {
            Lang::Es => "Volver a la nota",
            Lang::En => "Go to note reference",
        }
    }
}

impl FromStr for Lang {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "es" => Ok(Lang::Es),
            "en" => Ok(Lang::En),
            other => Err(format!("unsupported language: {other}")),
        }
    }
}

impl fmt::Display for Lang {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Joins items with commas and the language's conjunction before the last one.
///
/// English lists of three or more items get the serial (Oxford) comma.
pub fn join_with_conjunction<S: AsRef<str>>(items: &[S], lang: Lang) -> String {
    match items {
        [] => String::new(),
        [only] => only.as_ref().to_string(),
        [init @ .., last] => {
            let mut text = init
                .iter()
                .map(AsRef::as_ref)
                .collect::<Vec<_>>()
                .join(", ");
            if lang == Lang::En && init.len() > 1 {
                text.push(',');
            }
            text.push(' ');
            text.push_str(lang.conjunction());
            text.push(' ');
            text.push_str(last.as_ref());
            text
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_two_items_without_comma() {
        assert_eq!(
            join_with_conjunction(&["Pigliucci", "Boudry"], Lang::Es),
            "Pigliucci y Boudry"
        );
        assert_eq!(
            join_with_conjunction(&["Pigliucci", "Boudry"], Lang::En),
            "Pigliucci and Boudry"
        );
    }

    #[test]
    fn english_uses_serial_comma() {
        assert_eq!(
            join_with_conjunction(&["A", "B", "C"], Lang::En),
            "A, B, and C"
        );
        assert_eq!(join_with_conjunction(&["A", "B", "C"], Lang::Es), "A, B y C");
    }

    #[test]
    fn single_and_empty_lists() {
        assert_eq!(join_with_conjunction(&["Okasha"], Lang::Es), "Okasha");
        assert_eq!(join_with_conjunction::<&str>(&[], Lang::Es), "");
    }

    #[test]
    fn month_names() {
        assert_eq!(Lang::Es.month_name(9), Some("septiembre"));
        assert_eq!(Lang::En.month_name(5), Some("May"));
        assert_eq!(Lang::En.month_name(0), None);
        assert_eq!(Lang::En.month_name(13), None);
    }
}
