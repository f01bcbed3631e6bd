use std::path::PathBuf;

use thiserror::Error;

/// One problem found in a manifest. Loading collects all of them before failing.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("line {line}: invalid JSON ({message})")]
    InvalidJson { line: usize, message: String },
    #[error("line {line}: not valid UTF-8")]
    NotUtf8 { line: usize },
    #[error("line {line}: each JSONL record must be an object")]
    NotAnObject { line: usize },
    #[error("line {line}: '{field}' {expected}")]
    BadField {
        line: usize,
        field: &'static str,
        expected: &'static str,
    },
    #[error("line {line}: {field} does not exist: {}", path.display())]
    MissingPath {
        line: usize,
        field: &'static str,
        path: PathBuf,
    },
    #[error("line {line}: duplicate id '{id}'")]
    DuplicateId { line: usize, id: String },
    #[error("manifest contains no task records")]
    NoRecords,
}

impl SchemaError {
    pub fn line(&self) -> Option<usize> {
        match self {
            SchemaError::InvalidJson { line, .. }
            | SchemaError::NotUtf8 { line }
            | SchemaError::NotAnObject { line }
            | SchemaError::BadField { line, .. }
            | SchemaError::MissingPath { line, .. }
            | SchemaError::DuplicateId { line, .. } => Some(*line),
            SchemaError::NoRecords => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{} schema error(s) in {}", errors.len(), path.display())]
    Schema {
        path: PathBuf,
        errors: Vec<SchemaError>,
    },
}
