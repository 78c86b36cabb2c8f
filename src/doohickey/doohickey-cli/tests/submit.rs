//! Integration tests for appending submissions to a catalog file.

use expect_test::expect;
use std::path::PathBuf;

fn fixtures_dir() -> PathBuf {
    let manifest_dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .join("tests/fixtures")
}

#[test]
fn submit_appends_to_copy_of_catalog() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = dir.path().join("apps.json");
    std::fs::copy(fixtures_dir().join("apps.json"), &catalog).unwrap();

    doohickey_cli::submit_cmd(&fixtures_dir().join("submission.md"), &catalog).unwrap();

    let loaded = doohickey_catalog::load_catalog(&catalog).unwrap();
    let names: Vec<&str> = loaded.iter().map(|app| app.name.as_str()).collect();
    expect![[r#"
        [
            "Widget Studio",
            "Note Pad/+ 100%",
            "Terminal Pal",
            "Color Picker Deluxe",
        ]"#]]
    .assert_eq(&format!("{names:#?}"));
}

#[test]
fn submit_creates_missing_catalog_with_indentation() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = dir.path().join("new.json");

    doohickey_cli::submit_cmd(&fixtures_dir().join("submission.md"), &catalog).unwrap();

    let written = std::fs::read_to_string(&catalog).unwrap();
    assert!(written.starts_with("[\n  {\n    \"name\": \"Color Picker Deluxe\""));
}

#[test]
fn submit_incomplete_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = dir.path().join("apps.json");
    std::fs::copy(fixtures_dir().join("apps.json"), &catalog).unwrap();
    let before = std::fs::read_to_string(&catalog).unwrap();

    let err = doohickey_cli::submit_cmd(&fixtures_dir().join("submission-incomplete.md"), &catalog)
        .unwrap_err();

    expect![[r#"submission has 8 error(s)"#]].assert_eq(&err.to_string());
    assert_eq!(std::fs::read_to_string(&catalog).unwrap(), before);
}

#[test]
fn submit_incomplete_diagnostics() {
    let text = std::fs::read_to_string(fixtures_dir().join("submission-incomplete.md")).unwrap();
    let submission = doohickey_catalog::parse_submission(&text).unwrap();
    let report = doohickey_catalog::validate_submission(&submission);
    let lines: Vec<String> = report
        .diagnostics
        .iter()
        .map(|d| format!("{}: {}", d.rule, d.message))
        .collect();
    expect![[r#"
        submission.field.required: Missing required field: longDescription
        submission.field.required: Missing required field: downloadUrl
        submission.field.required: Missing required field: version
        submission.field.required: Missing required field: releaseDate
        submission.field.required: Missing required field: size
        submission.field.required: Missing required field: requirements
        submission.developer.fields: Developer object is missing required fields.
        submission.features.list: Features must be a list."#]]
    .assert_eq(&lines.join("\n"));
}
