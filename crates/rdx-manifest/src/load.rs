use std::collections::HashSet;
use std::path::{Path, PathBuf};

use rdx_core::{Split, TaskRecord};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::error::{LoadError, SchemaError};

/// A fully validated manifest.
#[derive(Clone, Debug)]
pub struct Manifest {
    pub path: PathBuf,
    /// SHA-256 of the manifest bytes, hex encoded.
    pub digest: String,
    pub records: Vec<TaskRecord>,
}

pub fn load_manifest(path: &Path) -> Result<Manifest, LoadError> {
    let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let text = std::str::from_utf8(&bytes).map_err(|err| {
        let line = bytes[..err.valid_up_to()].iter().filter(|b| **b == b'\n').count() + 1;
        LoadError::Schema {
            path: path.to_path_buf(),
            errors: vec![SchemaError::NotUtf8 { line }],
        }
    })?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));

    let (records, errors) = parse_manifest(text, base_dir);
    if !errors.is_empty() {
        return Err(LoadError::Schema {
            path: path.to_path_buf(),
            errors,
        });
    }

    tracing::debug!(path = %path.display(), records = records.len(), "manifest loaded");
    Ok(Manifest {
        path: path.to_path_buf(),
        digest: digest_bytes(&bytes),
        records,
    })
}

pub fn digest_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Parse every non-blank line; returns the valid records and every schema
/// error found, so callers see all problems at once.
pub fn parse_manifest(text: &str, base_dir: &Path) -> (Vec<TaskRecord>, Vec<SchemaError>) {
    let mut records = Vec::new();
    let mut errors = Vec::new();
    let mut seen_ids = HashSet::new();

    for (idx, line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let stripped = line.trim();
        if stripped.is_empty() {
            continue;
        }

        let raw: Value = match serde_json::from_str(stripped) {
            Ok(v) => v,
            Err(e) => {
                errors.push(SchemaError::InvalidJson {
                    line: line_no,
                    message: e.to_string(),
                });
                continue;
            }
        };
        let Value::Object(obj) = raw else {
            errors.push(SchemaError::NotAnObject { line: line_no });
            continue;
        };

        let record = match parse_record(&obj, base_dir, line_no) {
            Ok(r) => r,
            Err(mut line_errors) => {
                errors.append(&mut line_errors);
                continue;
            }
        };

        if !seen_ids.insert(record.id.clone()) {
            errors.push(SchemaError::DuplicateId {
                line: line_no,
                id: record.id,
            });
            continue;
        }
        records.push(record);
    }

    if records.is_empty() {
        errors.push(SchemaError::NoRecords);
    }
    (records, errors)
}

fn parse_record(
    obj: &Map<String, Value>,
    base_dir: &Path,
    line: usize,
) -> Result<TaskRecord, Vec<SchemaError>> {
    let mut errors = Vec::new();
    let bad = |field, expected| SchemaError::BadField { line, field, expected };

    let id = non_empty_str(obj, "id");
    if id.is_none() {
        errors.push(bad("id", "must be a non-empty string"));
    }
    let split = obj
        .get("split")
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<Split>().ok());
    if split.is_none() {
        errors.push(bad("split", "must be one of [\"test\", \"train\", \"val\"]"));
    }
    let family = non_empty_str(obj, "family");
    if family.is_none() {
        errors.push(bad("family", "must be a non-empty string"));
    }
    let prompt = non_empty_str(obj, "prompt_path");
    if prompt.is_none() {
        errors.push(bad("prompt_path", "must be a non-empty string"));
    }
    let source = non_empty_str(obj, "source_path").or_else(|| non_empty_str(obj, "rust_path"));
    if source.is_none() {
        errors.push(bad("source_path", "must be a non-empty string"));
    }

    let tests = match obj.get("tests_path") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.is_empty() => None,
        Some(Value::String(s)) => Some(s.as_str()),
        Some(_) => {
            errors.push(bad("tests_path", "must be a string when present"));
            None
        }
    };

    let deps = match obj.get("deps") {
        None => Some(vec![]),
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| v.as_str().map(str::to_string))
            .collect::<Option<Vec<_>>>(),
        Some(_) => None,
    };
    if deps.is_none() {
        errors.push(bad("deps", "must be a string list"));
    }

    let unsafe_code = match obj.get("unsafe") {
        None => Some(false),
        Some(v) => v.as_bool(),
    };
    if unsafe_code.is_none() {
        errors.push(bad("unsafe", "must be boolean"));
    }

    let (Some(id), Some(split), Some(family), Some(prompt), Some(source), Some(deps), Some(unsafe_code)) =
        (id, split, family, prompt, source, deps, unsafe_code)
    else {
        return Err(errors);
    };
    if !errors.is_empty() {
        return Err(errors);
    }

    let prompt_path = resolve_path(base_dir, &prompt);
    let source_path = resolve_path(base_dir, &source);
    let tests_path = tests.map(|t| resolve_path(base_dir, t));

    for (field, path) in [
        ("prompt_path", Some(&prompt_path)),
        ("source_path", Some(&source_path)),
        ("tests_path", tests_path.as_ref()),
    ] {
        if let Some(path) = path {
            if !path.exists() {
                errors.push(SchemaError::MissingPath {
                    line,
                    field,
                    path: path.clone(),
                });
            }
        }
    }
    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(TaskRecord {
        id,
        split,
        family,
        prompt_path,
        source_path,
        tests_path,
        deps,
        unsafe_code,
    })
}

fn non_empty_str(obj: &Map<String, Value>, field: &str) -> Option<String> {
    match obj.get(field) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

/// Relative paths are anchored at the manifest's directory.
pub fn resolve_path(base_dir: &Path, value: &str) -> PathBuf {
    let p = Path::new(value);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base_dir.join(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), "x").unwrap();
    }

    #[test]
    fn resolves_relative_paths_against_base() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "p.txt");
        touch(dir.path(), "s.rs");
        let line = r#"{"id":"a","split":"train","family":"f","prompt_path":"p.txt","source_path":"s.rs"}"#;
        let (records, errors) = parse_manifest(line, dir.path());
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(records[0].source_path, dir.path().join("s.rs"));
        assert!(records[0].deps.is_empty());
        assert!(!records[0].unsafe_code);
    }

    #[test]
    fn accepts_legacy_rust_path_field() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "p.txt");
        touch(dir.path(), "s.rs");
        let line = r#"{"id":"a","split":"val","family":"f","prompt_path":"p.txt","rust_path":"s.rs"}"#;
        let (records, errors) = parse_manifest(line, dir.path());
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(records[0].split, Split::Val);
    }

    #[test]
    fn collects_every_field_error_on_a_line() {
        let dir = tempdir().unwrap();
        let line = r#"{"id":"","split":"dev","deps":"serde","unsafe":"no"}"#;
        let (records, errors) = parse_manifest(line, dir.path());
        assert!(records.is_empty());
        let fields: Vec<_> = errors
            .iter()
            .filter_map(|e| match e {
                SchemaError::BadField { field, .. } => Some(*field),
                _ => None,
            })
            .collect();
        assert_eq!(
            fields,
            vec!["id", "split", "family", "prompt_path", "source_path", "deps", "unsafe"]
        );
        assert_eq!(errors.last(), Some(&SchemaError::NoRecords));
    }

    #[test]
    fn blank_lines_are_skipped_and_line_numbers_kept() {
        let dir = tempdir().unwrap();
        let text = "\n\n[1, 2]\n";
        let (_, errors) = parse_manifest(text, dir.path());
        assert_eq!(errors[0], SchemaError::NotAnObject { line: 3 });
    }
}
