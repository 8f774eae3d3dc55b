use std::fs;

use super::*;
use crate::error::ParseErrorKind;
use crate::model::ContentBlock;
use crate::render::render_document;

fn parser() -> MarkdownParser {
    MarkdownParser::new().expect("parser regexes compile")
}

fn strip_whitespace(text: &str) -> String {
    text.chars().filter(|ch| !ch.is_whitespace()).collect()
}

const CHAPTER_ONE: &str = "\
Reading notes, first pass.

# Chapter 1: The Basics

The `main` function is the entry point.

## Functions

A function declaration gives the name, return type and argument types.

```cpp
double sqrt(double);   // return the square root of a double
```

### Overloading

Two functions may share a name if their argument types differ.

## Types

| Type | Size |
|------|-----:|
| bool | 1 |
| int  | 4 |

# Summary

Keep functions short.
";

#[test]
fn parse_nests_sections_by_heading_level() {
    let body = parser().parse("chapter-01.md", CHAPTER_ONE).expect("parses");

    assert_eq!(body.preamble.len(), 1);
    assert_eq!(body.sections.len(), 2);

    let basics = &body.sections[0];
    assert_eq!(basics.heading, "Chapter 1: The Basics");
    assert_eq!(basics.level, 1);
    assert_eq!(basics.line, 3);
    assert_eq!(basics.children.len(), 2);
    assert_eq!(basics.children[0].heading, "Functions");
    assert_eq!(basics.children[0].children.len(), 1);
    assert_eq!(basics.children[0].children[0].heading, "Overloading");
    assert_eq!(basics.children[1].heading, "Types");
    assert_eq!(body.sections[1].heading, "Summary");
    assert!(
        body.sections
            .iter()
            .all(|section| section.document == "chapter-01.md")
    );
}

#[test]
fn parse_recognizes_code_and_table_blocks() {
    let body = parser().parse("chapter-01.md", CHAPTER_ONE).expect("parses");
    let functions = &body.sections[0].children[0];

    assert_eq!(functions.blocks.len(), 2);
    assert_eq!(functions.blocks[1].kind(), "code");
    assert_eq!(functions.blocks[1].language(), Some("cpp"));

    let types = &body.sections[0].children[1];
    match &types.blocks[0] {
        ContentBlock::Table { rows, alignment } => {
            assert_eq!(rows.len(), 3);
            assert_eq!(rows[0], vec!["Type".to_string(), "Size".to_string()]);
            assert_eq!(alignment, &vec!["------".to_string(), "-----:".to_string()]);
        }
        other => panic!("expected table, got {other:?}"),
    }
}

#[test]
fn headings_inside_code_fences_are_text() {
    let source = "# Preprocessor\n\n```cpp\n#include <iostream>\n# not a heading\n```\n";
    let body = parser().parse("notes.md", source).expect("parses");

    assert_eq!(body.sections.len(), 1);
    assert!(body.sections[0].children.is_empty());
    assert_eq!(
        body.sections[0].blocks[0].plain_text(),
        "#include <iostream>\n# not a heading"
    );
}

#[test]
fn closing_hashes_and_hashtags_are_handled() {
    let body = parser()
        .parse("notes.md", "## Scope ##\n\n#hashtag line\n\n# C#\n")
        .expect("parses");

    assert_eq!(body.sections[0].heading, "Scope");
    assert_eq!(body.sections[0].level, 2);
    assert_eq!(
        body.sections[0].blocks,
        vec![ContentBlock::Paragraph("#hashtag line".to_string())]
    );
    assert_eq!(body.sections[1].heading, "C#");
}

#[test]
fn unterminated_fence_reports_opening_line() {
    let source = "# Constants\n\nText.\n\n```cpp\nconstexpr int x = 1;\n";
    let err = parser().parse("chapter-02.md", source).expect_err("must fail");

    assert_eq!(err.document, "chapter-02.md");
    assert_eq!(err.line, 5);
    assert_eq!(
        err.kind,
        ParseErrorKind::UnterminatedFence {
            fence: "```".to_string()
        }
    );
}

#[test]
fn shorter_closing_fence_does_not_close() {
    let source = "````md\n```cpp\nint x;\n```\n````\n";
    let body = parser().parse("nested.md", source).expect("parses");

    assert_eq!(body.preamble.len(), 1);
    assert_eq!(body.preamble[0].plain_text(), "```cpp\nint x;\n```");
}

#[test]
fn delimiter_cell_count_mismatch_is_malformed_table() {
    let source = "# Types\n\n| a | b | c |\n|---|---|\n| 1 | 2 | 3 |\n";
    let err = parser().parse("types.md", source).expect_err("must fail");

    assert_eq!(err.line, 4);
    assert_eq!(
        err.kind,
        ParseErrorKind::MalformedTable {
            header_cells: 3,
            delimiter_cells: 2
        }
    );
}

#[test]
fn split_table_row_keeps_escaped_pipes() {
    assert_eq!(
        split_table_row(r"| `a \|\| b` | logical or |"),
        vec![r"`a \|\| b`".to_string(), "logical or".to_string()]
    );
}

#[test]
fn render_round_trips_up_to_whitespace() {
    let loader = DocumentLoader::new(Path::new(".")).expect("loader");
    let document = loader
        .parse_document(
            "chapter-01.md",
            Path::new("chapter-01.md"),
            CHAPTER_ONE.to_string(),
        )
        .expect("parses");

    assert_eq!(
        strip_whitespace(&render_document(&document)),
        strip_whitespace(CHAPTER_ONE)
    );
}

#[test]
fn metadata_reads_chapter_prefix_then_file_stem() {
    let metadata = ChapterMetadataParser::new().expect("metadata regexes compile");
    let body = parser().parse("chapter-01.md", CHAPTER_ONE).expect("parses");
    assert_eq!(
        metadata.derive("chapter-01.md", &body.sections),
        (Some(1), Some("The Basics".to_string()))
    );

    let body = parser()
        .parse("07-templates.md", "# Templates\n\nGeneric code.\n")
        .expect("parses");
    assert_eq!(
        metadata.derive("07-templates.md", &body.sections),
        (Some(7), Some("Templates".to_string()))
    );

    assert_eq!(metadata.derive("README.md", &[]), (None, None));
}

#[test]
fn load_all_isolates_parse_failures() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join("chapter-01.md"), CHAPTER_ONE).expect("write");
    fs::write(
        dir.path().join("chapter-02.md"),
        "# Chapter 2: User-Defined Types\n\n```cpp\nstruct Vector {\n",
    )
    .expect("write");
    fs::write(
        dir.path().join("chapter-03.md"),
        "# Chapter 3: Modularity\n\nSeparate compilation.\n",
    )
    .expect("write");
    fs::write(dir.path().join("diagram.png"), [0_u8, 159, 146, 150]).expect("write");
    fs::write(dir.path().join(".draft.md"), "# Hidden\n").expect("write");

    let loader = DocumentLoader::new(dir.path()).expect("loader");
    let notes = loader.load_all().expect("directory loads");

    let ids = notes
        .documents
        .iter()
        .map(|document| document.id.as_str())
        .collect::<Vec<&str>>();
    assert_eq!(ids, vec!["chapter-01.md", "chapter-03.md"]);
    assert_eq!(notes.failures.len(), 1);
    assert_eq!(notes.failures[0].document(), "chapter-02.md");
    assert_eq!(notes.failures[0].line(), Some(3));
}

#[test]
fn documents_is_restartable_and_skips_excluded_index() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join("README.md"), "| 1 | The Basics | chapter-01.md |\n").expect("write");
    fs::write(dir.path().join("chapter-01.md"), CHAPTER_ONE).expect("write");

    let loader = DocumentLoader::new(dir.path())
        .expect("loader")
        .excluding(&dir.path().join("README.md"));

    let first = loader.documents().expect("listing").count();
    let second = loader
        .documents()
        .expect("listing")
        .filter_map(Result::ok)
        .map(|document| document.id)
        .collect::<Vec<String>>();

    assert_eq!(first, 1);
    assert_eq!(second, vec!["chapter-01.md".to_string()]);
}

#[test]
fn non_utf8_file_is_an_encoding_failure() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join("broken.md"), [0xff_u8, 0xfe, 0x00]).expect("write");

    let loader = DocumentLoader::new(dir.path()).expect("loader");
    let notes = loader.load_all().expect("directory loads");

    assert!(notes.documents.is_empty());
    assert!(matches!(notes.failures[0], LoadError::Encoding { .. }));
}

#[test]
fn byte_order_mark_does_not_hide_first_heading() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("notes-a.md");
    fs::write(&path, "\u{feff}# Chapter 1: The Basics\n\nText.\n").expect("write");

    let document = DocumentLoader::new(dir.path())
        .expect("loader")
        .load_file(&path)
        .expect("document loads");

    assert!(document.preamble.is_empty(), "{:?}", document.preamble);
    assert_eq!(document.sections.len(), 1);
    assert_eq!(document.sections[0].heading, "Chapter 1: The Basics");
    assert_eq!(document.chapter, Some(1));
    assert_eq!(document.title.as_deref(), Some("The Basics"));
    assert!(!document.source.starts_with(BYTE_ORDER_MARK));
}
