use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{LoadError, SchemaError};

/// One model prediction to evaluate.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PredictionRow {
    #[serde(default = "unknown_id")]
    pub id: String,
    #[serde(default)]
    pub family: String,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub prediction: String,
}

fn unknown_id() -> String {
    "unknown".to_string()
}

pub fn load_predictions(path: &Path) -> Result<Vec<PredictionRow>, LoadError> {
    let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut rows = Vec::new();
    let mut errors = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<PredictionRow>(line) {
            Ok(row) => rows.push(row),
            Err(e) => errors.push(SchemaError::InvalidJson {
                line: idx + 1,
                message: e.to_string(),
            }),
        }
    }

    if !errors.is_empty() {
        return Err(LoadError::Schema {
            path: path.to_path_buf(),
            errors,
        });
    }
    Ok(rows)
}
