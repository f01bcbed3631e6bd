use std::path::Path;

use rdx_manifest::{load_manifest, LoadError, SchemaError};
use tempfile::tempdir;

fn write(dir: &Path, name: &str, body: &str) {
    std::fs::write(dir.join(name), body).unwrap();
}

fn record(id: &str, family: &str, split: &str) -> String {
    format!(
        r#"{{"id":"{id}","split":"{split}","family":"{family}","prompt_path":"prompt.txt","source_path":"src.rs"}}"#
    )
}

#[test]
fn duplicate_id_fails_the_whole_load() {
    let dir = tempdir().unwrap();
    write(dir.path(), "prompt.txt", "adds 5 to input");
    write(dir.path(), "src.rs", "pub fn f(x: i32) -> i32 { x + 5 }");
    let manifest = format!("{}\n{}\n", record("a", "f", "train"), record("a", "f", "train"));
    write(dir.path(), "manifest.jsonl", &manifest);

    match load_manifest(&dir.path().join("manifest.jsonl")) {
        Err(LoadError::Schema { errors, .. }) => {
            assert_eq!(
                errors,
                vec![SchemaError::DuplicateId {
                    line: 2,
                    id: "a".into()
                }]
            );
            assert_eq!(errors[0].to_string(), "line 2: duplicate id 'a'");
        }
        other => panic!("expected schema error, got {other:?}"),
    }
}

#[test]
fn missing_referenced_file_is_a_schema_error() {
    let dir = tempdir().unwrap();
    write(dir.path(), "prompt.txt", "p");
    write(dir.path(), "manifest.jsonl", &record("a", "f", "test"));

    let err = load_manifest(&dir.path().join("manifest.jsonl")).unwrap_err();
    let LoadError::Schema { errors, .. } = err else {
        panic!("expected schema error");
    };
    assert!(matches!(
        &errors[0],
        SchemaError::MissingPath { field: "source_path", .. }
    ));
    assert_eq!(errors.last(), Some(&SchemaError::NoRecords));
}

#[test]
fn errors_from_all_lines_surface_together() {
    let dir = tempdir().unwrap();
    write(dir.path(), "prompt.txt", "p");
    write(dir.path(), "src.rs", "pub fn f() {}");
    let manifest = format!("{{oops\n{}\n\"str\"\n", record("ok", "f", "val"));
    write(dir.path(), "manifest.jsonl", &manifest);

    let LoadError::Schema { errors, .. } = load_manifest(&dir.path().join("manifest.jsonl")).unwrap_err() else {
        panic!("expected schema error");
    };
    assert_eq!(errors.len(), 2);
    assert_eq!(errors[0].line(), Some(1));
    assert_eq!(errors[1], SchemaError::NotAnObject { line: 3 });
}

#[test]
fn valid_manifest_carries_digest() {
    let dir = tempdir().unwrap();
    write(dir.path(), "prompt.txt", "p");
    write(dir.path(), "src.rs", "pub fn f() {}");
    write(
        dir.path(),
        "manifest.jsonl",
        &format!("{}\n{}\n", record("a", "f", "train"), record("b", "g", "test")),
    );

    let m = load_manifest(&dir.path().join("manifest.jsonl")).unwrap();
    assert_eq!(m.records.len(), 2);
    assert_eq!(m.digest.len(), 64);
    let again = load_manifest(&dir.path().join("manifest.jsonl")).unwrap();
    assert_eq!(m.digest, again.digest);
}

#[test]
fn missing_manifest_is_io_error() {
    let dir = tempdir().unwrap();
    let err = load_manifest(&dir.path().join("nope.jsonl")).unwrap_err();
    assert!(matches!(err, LoadError::Io { .. }));
}

#[test]
fn invalid_utf8_is_rejected_not_rewritten() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("manifest.jsonl");
    let mut bytes = format!("{}\n", record("a", "f", "train")).into_bytes();
    bytes.extend_from_slice(b"{\"id\":\"b\xff\"}\n");
    std::fs::write(&path, bytes).unwrap();

    match load_manifest(&path).unwrap_err() {
        LoadError::Schema { errors, .. } => assert_eq!(errors, vec![SchemaError::NotUtf8 { line: 2 }]),
        other => panic!("expected schema error, got {other}"),
    }
}
