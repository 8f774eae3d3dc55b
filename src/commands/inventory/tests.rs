use std::fs;

use super::*;

fn notes_dir(files: &[(&str, &str)]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    for (name, contents) in files {
        fs::write(dir.path().join(name), contents).expect("write note");
    }
    dir
}

#[test]
fn build_manifest_summarizes_each_document_in_chapter_order() {
    let dir = notes_dir(&[
        (
            "chapter-02.md",
            "# Chapter 2: User-Defined Types\n\n```rust title=\"demo\"\nlet x = 1;\n```\n",
        ),
        (
            "01-basics.md",
            "# The Basics\n\nText.\n\n| a | b |\n|---|---|\n| 1 | 2 |\n\n## Advice\n\nShort.\n",
        ),
        ("notes.json", "{}"),
    ]);

    let manifest = build_manifest(dir.path()).expect("manifest");
    assert_eq!(manifest.document_count, 2);
    assert!(manifest.failures.is_empty());

    let basics = &manifest.documents[0];
    assert_eq!(basics.file, "01-basics.md");
    assert_eq!(basics.chapter, Some(1));
    assert_eq!(basics.title.as_deref(), Some("The Basics"));
    assert_eq!(basics.sections, 2);
    assert_eq!(basics.blocks.get("paragraph"), Some(&2));
    assert_eq!(basics.blocks.get("table"), Some(&1));
    assert_eq!(basics.sha256.len(), 64);

    let types = &manifest.documents[1];
    assert_eq!(types.chapter, Some(2));
    assert_eq!(types.title.as_deref(), Some("User-Defined Types"));
    assert_eq!(types.blocks.get("code"), Some(&1));
    assert!(types.code_languages.contains("rust"));
}

#[test]
fn build_manifest_rejects_an_empty_directory() {
    let dir = notes_dir(&[("README.json", "{}")]);

    let err = build_manifest(dir.path()).expect_err("no notes");
    assert!(err.to_string().contains("no note files found"), "{err}");
}

#[test]
fn run_writes_manifest_and_flags_failures() {
    let dir = notes_dir(&[
        ("chapter-01.md", "# Chapter 1: The Basics\n\nText.\n"),
        ("chapter-02.md", "# Chapter 2\n\n~~~\nunclosed\n"),
    ]);
    let manifest_path = dir.path().join("cache").join("inventory.json");

    let exit_code = run(InventoryArgs {
        notes_dir: dir.path().to_path_buf(),
        manifest_path: manifest_path.clone(),
        dry_run: false,
    })
    .expect("inventory runs");
    assert_eq!(exit_code, EXIT_PARSE_FAILURE);

    let written: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&manifest_path).expect("manifest written"))
            .expect("manifest json");
    assert_eq!(written["document_count"], 1);
    assert_eq!(written["failures"][0]["file"], "chapter-02.md");
    assert_eq!(written["failures"][0]["line"], 3);
}

#[test]
fn dry_run_leaves_no_manifest_behind() {
    let dir = notes_dir(&[("chapter-01.md", "# Chapter 1: The Basics\n\nText.\n")]);
    let manifest_path = dir.path().join("inventory.json");

    let exit_code = run(InventoryArgs {
        notes_dir: dir.path().to_path_buf(),
        manifest_path: manifest_path.clone(),
        dry_run: true,
    })
    .expect("inventory runs");
    assert_eq!(exit_code, EXIT_OK);
    assert!(!manifest_path.exists());
}
