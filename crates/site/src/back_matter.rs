//! Endnotes and bibliography documents.

use mkbook_core::{Bibliography, BookError, Lang, NoteDefinition, render_bibliography_entry};

use crate::options::SiteKind;

const BACK_ARROW: &str = "&#8592;";

/// Anchor id of a note in the endnotes document.
pub fn note_anchor(note_id: &str) -> String {
    format!("ftd_{note_id}")
}

/// Anchor id of a note reference in the main text.
pub fn reference_anchor(note_id: &str) -> String {
    format!("ft_{note_id}")
}

fn back_link(note: &NoteDefinition, lang: Lang) -> String {
    format!(
        r#"<a href="{}#{}" role="doc-backlink" aria-label="{}">{BACK_ARROW}</a>"#,
        note.backlink,
        reference_anchor(&note.note_id),
        lang.back_to_reference()
    )
}

/// Body of the endnotes document, notes in the given order.
pub fn endnotes_body(notes: &[NoteDefinition], kind: SiteKind, lang: Lang) -> String {
    let mut html = vec![format!("<h1>{}</h1>", lang.endnotes_title())];
    match kind {
        SiteKind::Epub3 => {
            html.push(r#"<section epub:type="endnotes" role="doc-endnotes">"#.to_string());
            for note in notes {
                html.push(format!(
                    r#"<aside id="{}" class="endnote" epub:type="endnote" role="doc-endnote"><span class="note-number">{}.</span> {} {}</aside>"#,
                    note_anchor(&note.note_id),
                    note.number,
                    note.body,
                    back_link(note, lang)
                ));
            }
            html.push("</section>".to_string());
        }
        SiteKind::Html => {
            html.push(r#"<div id="doc-endnotes">"#.to_string());
            html.push("<ol>".to_string());
            for note in notes {
                html.push(format!(
                    r#"<li id="{}">{} {}</li>"#,
                    note_anchor(&note.note_id),
                    note.body,
                    back_link(note, lang)
                ));
            }
            html.push("</ol>".to_string());
            html.push("</div>".to_string());
        }
    }
    html.join("\n")
}

/// Reference-list lines for `keys`, sorted and without repeats.
pub fn bibliography_entries<'k>(
    bibliography: &Bibliography,
    keys: impl IntoIterator<Item = &'k str>,
    lang: Lang,
) -> Result<Vec<String>, BookError> {
    let mut entries = keys
        .into_iter()
        .map(|key| render_bibliography_entry(bibliography, key, lang))
        .collect::<Result<Vec<_>, _>>()?;
    entries.sort();
    entries.dedup();
    Ok(entries)
}

/// Body of the bibliography document.
pub fn bibliography_body(entries: &[String], kind: SiteKind, lang: Lang) -> String {
    let mut html = vec![format!("<h1>{}</h1>", lang.bibliography_title())];
    let item_role = match kind {
        SiteKind::Epub3 => {
            html.push(r#"<section epub:type="bibliography" role="doc-bibliography">"#.to_string());
            r#" role="doc-biblioentry""#
        }
        SiteKind::Html => {
            html.push(r#"<div id="doc-bibliography">"#.to_string());
            ""
        }
    };
    html.push("<ul>".to_string());
    html.extend(entries.iter().map(|entry| format!("<li{item_role}>{entry}</li>")));
    html.push("</ul>".to_string());
    html.push(match kind {
        SiteKind::Epub3 => "</section>".to_string(),
        SiteKind::Html => "</div>".to_string(),
    });
    html.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;

    fn note(note_id: &str, number: usize, body: &str) -> NoteDefinition {
        NoteDefinition {
            note_id: note_id.to_string(),
            number,
            body: body.to_string(),
            backlink: "../section/chapter_1.html".to_string(),
            reference_offset: number,
            footnote_id: None,
        }
    }

    #[test]
    fn html_endnotes_are_an_ordered_list() {
        let body = endnotes_body(&[note("fn_1", 1, "La primera nota")], SiteKind::Html, Lang::Es);
        assert_snapshot!(body, @r#"
        <h1>Notas</h1>
        <div id="doc-endnotes">
        <ol>
        <li id="ftd_fn_1">La primera nota <a href="../section/chapter_1.html#ft_fn_1" role="doc-backlink" aria-label="Volver a la nota">&#8592;</a></li>
        </ol>
        </div>
        "#);
    }

    #[test]
    fn epub_endnotes_are_asides() {
        let body = endnotes_body(&[note("cite_hebb_1", 1, "“Hebbian theory.”")], SiteKind::Epub3, Lang::En);
        assert!(body.starts_with("<h1>Notes</h1>\n<section epub:type=\"endnotes\""));
        assert!(body.contains(
            r#"<aside id="ftd_cite_hebb_1" class="endnote" epub:type="endnote" role="doc-endnote"><span class="note-number">1.</span> “Hebbian theory.” "#
        ));
        assert!(body.ends_with("</aside>\n</section>"));
    }

    #[test]
    fn bibliography_is_sorted_and_deduplicated() {
        let db = Bibliography::from_yaml_str(
            "b:\n  author: Zeta, Ana\n  title: Last\n  publisher: P\n  year: 2000\na:\n  author: Alfa, Bea\n  title: First\n  publisher: P\n  year: 1999\n",
        )
        .unwrap();
        let entries = bibliography_entries(&db, ["b", "a", "b"], Lang::Es).unwrap();
        assert_eq!(
            entries,
            vec![
                "Alfa, Bea. <i>First</i>. P, 1999.".to_string(),
                "Zeta, Ana. <i>Last</i>. P, 2000.".to_string(),
            ]
        );
        let body = bibliography_body(&entries, SiteKind::Html, Lang::Es);
        assert_snapshot!(body, @r#"
        <h1>Bibliografía</h1>
        <div id="doc-bibliography">
        <ul>
        <li>Alfa, Bea. <i>First</i>. P, 1999.</li>
        <li>Zeta, Ana. <i>Last</i>. P, 2000.</li>
        </ul>
        </div>
        "#);
    }
}
