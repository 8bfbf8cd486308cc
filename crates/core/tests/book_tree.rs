use std::fs;
use std::path::{Path, PathBuf};

use mkbook_core::{Book, BookError, Lang, SectionKind};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

const ONE_CHAPTER: &str = "### This is one chapter {#capitulo1 $chapter}
Chapter content.

One note here[^1].

[^1]: La primera nota

";

const CHAPTER_WITH_NO_ID_AND_NO_KIND: &str = "# A chapter with no id
blah, blah, blah.
";

const ONE_SUBCHAPTER: &str = "# This is one subchapter
Some text in the subchapter.

And here we have a citation [@neolithic] a note [^2] and
another citation to the same book [@neolithic].

[^2]: Just another note.
";

const PART1: &str = "# Part1 Title {$part}
Some intro to the part.
";

const BOOK_METADATA: &str = "---
title:  'The book title'
lang: 'es'
bibliography: 'bibliografia.json'
uid: 'anUniqueIdForTheBook'
author:
- Jose Blanca
---

%%%
This is a comment
%%%
";

/// Writes `files` (relative path, contents) under a fresh temporary directory.
fn book_dir(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().expect("create temp dir");
    for (path, contents) in files {
        let path = dir.path().join(path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create section dir");
        }
        fs::write(&path, contents).expect("write markup file");
    }
    dir
}

fn book1() -> TempDir {
    book_dir(&[
        ("book.md", BOOK_METADATA),
        ("chapter1/chapter_one.md", ONE_CHAPTER),
        ("chapter2/chapter_two.md", CHAPTER_WITH_NO_ID_AND_NO_KIND),
    ])
}

fn book2() -> TempDir {
    book_dir(&[
        ("book.md", BOOK_METADATA),
        ("00_part1/part.md", PART1),
        ("00_part1/chapter1/chapter_one.md", ONE_CHAPTER),
        ("chapter2/chapter_two.md", CHAPTER_WITH_NO_ID_AND_NO_KIND),
        ("chapter2/subchapter/subchapter.md", ONE_SUBCHAPTER),
    ])
}

fn relative(paths: &[PathBuf], base: &Path) -> Vec<PathBuf> {
    paths
        .iter()
        .map(|path| path.strip_prefix(base).expect("path inside book").to_path_buf())
        .collect()
}

fn lines(section: mkbook_core::Section<'_>) -> Vec<String> {
    section
        .markup_lines()
        .expect("read markup")
        .collect::<Result<_, _>>()
        .expect("normalize markup")
}

#[test]
fn book_with_two_chapters() {
    let dir = book1();
    let book = Book::load(dir.path()).unwrap();
    let root = book.root();

    assert_eq!(relative(root.markup_files(), dir.path()), vec![PathBuf::from("book.md")]);
    assert_eq!(root.kind(), SectionKind::Book);
    assert_eq!(root.identifier(), None);
    assert_eq!(root.title(), "The book title");
    assert_eq!(root.markup_text().unwrap(), "\n");
    assert_eq!(root.is_within_a_part(), None);
    assert_eq!(book.lang(), Lang::Es);
    assert_eq!(
        book.bibliography_path(),
        Some(dir.path().join("bibliografia.json"))
    );
    assert_eq!(book.metadata().uid.as_deref(), Some("anUniqueIdForTheBook"));
    assert_eq!(
        book.section_by_identifier("capitulo1").unwrap().title(),
        "This is one chapter"
    );
    assert!(!book.has_parts());

    let children: Vec<_> = root.children().collect();
    let [chapter1, chapter2] = children.as_slice() else {
        panic!("expected two chapters, got {children:?}");
    };

    assert_eq!(chapter1.index(), 1);
    assert_eq!(chapter1.dir(), dir.path().join("chapter1"));
    assert_eq!(
        relative(chapter1.markup_files(), dir.path()),
        vec![PathBuf::from("chapter1/chapter_one.md")]
    );
    assert_eq!(chapter1.kind(), SectionKind::Chapter);
    assert_eq!(chapter1.identifier(), Some("capitulo1"));
    assert_eq!(chapter1.title(), "This is one chapter");
    assert!(!chapter1.has_children());
    assert_eq!(chapter1.is_within_a_part(), Some(false));
    assert_eq!(
        lines(*chapter1),
        vec![
            "# This is one chapter\n",
            "\n",
            "Chapter content.\n",
            "\n",
            "One note here[^1].\n",
            "\n",
            "[^1]: La primera nota\n",
            "\n",
        ]
    );

    assert_eq!(chapter2.kind(), SectionKind::Chapter);
    assert_eq!(chapter2.index(), 2);
    assert_eq!(chapter2.identifier(), Some("chapter_2"));
    assert_eq!(chapter2.title(), "A chapter with no id");
    assert_eq!(chapter2.is_within_a_part(), Some(false));
    assert_eq!(
        lines(*chapter2),
        vec!["# A chapter with no id\n", "\n", "blah, blah, blah.\n"]
    );
}

#[test]
fn book_with_a_part() {
    let dir = book2();
    let book = Book::load(dir.path()).unwrap();
    assert!(book.has_parts());

    let children: Vec<_> = book.root().children().collect();
    let [part1, chapter2] = children.as_slice() else {
        panic!("expected a part and a chapter, got {children:?}");
    };

    assert_eq!(part1.index(), 1);
    assert_eq!(part1.kind(), SectionKind::Part);
    assert_eq!(part1.identifier(), Some("part_1"));
    assert_eq!(part1.title(), "Part1 Title");
    assert_eq!(part1.is_within_a_part(), None);
    assert_eq!(
        lines(*part1),
        vec!["# Part1 Title\n", "\n", "Some intro to the part.\n"]
    );

    let part_children: Vec<_> = part1.children().collect();
    let [chapter1] = part_children.as_slice() else {
        panic!("expected one chapter in the part");
    };
    assert_eq!(chapter1.index(), 1);
    assert_eq!(chapter1.dir(), dir.path().join("00_part1/chapter1"));
    assert_eq!(chapter1.kind(), SectionKind::Chapter);
    assert_eq!(chapter1.identifier(), Some("capitulo1"));
    assert_eq!(chapter1.is_within_a_part(), Some(true));
    assert_eq!(chapter1.base_header_level(), 2);
    assert_eq!(lines(*chapter1)[0], "## This is one chapter\n");

    assert_eq!(chapter2.kind(), SectionKind::Chapter);
    assert_eq!(chapter2.index(), 2);
    assert_eq!(chapter2.identifier(), Some("chapter_2"));
    assert_eq!(chapter2.is_within_a_part(), Some(false));
    assert_eq!(
        lines(*chapter2),
        vec!["# A chapter with no id\n", "\n", "blah, blah, blah.\n"]
    );

    let subchapter = chapter2.children().next().expect("one subchapter");
    assert_eq!(subchapter.kind(), SectionKind::Subchapter);
    assert_eq!(subchapter.identifier(), Some("chapter_2_1"));
    assert_eq!(subchapter.parent(), Some(*chapter2));
    assert_eq!(subchapter.base_header_level(), 2);
    assert_eq!(lines(subchapter)[0], "## This is one subchapter\n");
    assert_eq!(subchapter.root(), book.root());
}

#[test]
fn rendering_units_are_parts_and_chapters_in_order() {
    let dir = book2();
    let book = Book::load(dir.path()).unwrap();
    let units: Vec<_> = book
        .rendering_units()
        .map(|section| section.identifier().unwrap_or_default().to_string())
        .collect();
    assert_eq!(units, vec!["part_1", "capitulo1", "chapter_2"]);
}

#[test]
fn identifiers_are_unique_and_stable() {
    let dir = book2();
    let book = Book::load(dir.path()).unwrap();
    let first: Vec<_> = book.sections().map(|s| s.identifier()).collect();
    let second: Vec<_> = book.sections().map(|s| s.identifier()).collect();
    assert_eq!(first, second);

    let mut ids: Vec<_> = first.into_iter().flatten().collect();
    let total = ids.len();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), total);
}

#[test]
fn duplicate_identifiers_fail() {
    let dir = book_dir(&[
        ("book.md", BOOK_METADATA),
        ("a/a.md", "# A {#same}\n"),
        ("b/b.md", "# B {#same}\n"),
    ]);
    let err = Book::load(dir.path()).unwrap_err();
    assert!(
        matches!(err, BookError::DuplicateSectionId { ref identifier } if identifier == "same"),
        "{err:?}"
    );
}

#[test]
fn inadmissible_kind_fails() {
    let dir = book_dir(&[
        ("book.md", BOOK_METADATA),
        ("part/part.md", "# Part {$part}\n"),
        ("part/sub/sub.md", "# Sub {$subchapter}\n"),
    ]);
    assert!(matches!(
        Book::load(dir.path()),
        Err(BookError::InadmissibleKind { .. })
    ));
}

#[test]
fn missing_book_title_fails() {
    let dir = book_dir(&[("book.md", "---\nlang: en\n---\n"), ("c/c.md", "# C\n")]);
    assert!(matches!(
        Book::load(dir.path()),
        Err(BookError::MissingBookTitle { .. })
    ));
}

#[test]
fn section_without_header_fails() {
    let dir = book_dir(&[("book.md", BOOK_METADATA), ("c/c.md", "No header here.\n")]);
    assert!(matches!(
        Book::load(dir.path()),
        Err(BookError::MissingTitle { .. })
    ));
}

#[test]
fn sections_below_subchapters_fail() {
    let dir = book_dir(&[
        ("book.md", BOOK_METADATA),
        ("c/c.md", "# C\n"),
        ("c/s/s.md", "# S\n"),
        ("c/s/deeper/d.md", "# D\n"),
    ]);
    assert!(matches!(
        Book::load(dir.path()),
        Err(BookError::SectionTooDeep { .. })
    ));
}

#[test]
fn second_header_in_section_with_children_fails() {
    let dir = book_dir(&[
        ("book.md", BOOK_METADATA),
        ("c/c.md", "# C\nText\n## Stray\n"),
        ("c/s/s.md", "# S\n"),
    ]);
    let book = Book::load(dir.path()).unwrap();
    let chapter = book.section_by_identifier("chapter_1").unwrap();
    assert!(matches!(
        chapter.markup_text(),
        Err(BookError::MultipleHeaders { .. })
    ));
}

#[test]
fn hidden_entries_are_skipped() {
    let dir = book_dir(&[
        ("book.md", BOOK_METADATA),
        (".git/config.md", "# Not a chapter\n"),
        ("c/.draft.md", "# Draft\n"),
        ("c/c.md", "# C\n"),
        ("c/notes.txt", "# Not markup\n"),
    ]);
    let book = Book::load(dir.path()).unwrap();
    let chapters: Vec<_> = book.root().children().collect();
    assert_eq!(chapters.len(), 1);
    assert_eq!(chapters[0].markup_files().len(), 1);
    assert_eq!(chapters[0].title(), "C");
}

#[test]
fn unknown_identifier_lookup_fails() {
    let dir = book1();
    let book = Book::load(dir.path()).unwrap();
    let chapter = book.section_by_identifier("chapter_2").unwrap();
    assert!(matches!(
        chapter.section_by_identifier("nope"),
        Err(BookError::UnknownSection { .. })
    ));
}
