use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::model::*;

/// One evaluable unit from a manifest. Paths are already resolved.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskRecord {
    pub id: String,
    pub split: Split,
    pub family: String,
    pub prompt_path: PathBuf,
    pub source_path: PathBuf,
    #[serde(default)]
    pub tests_path: Option<PathBuf>,
    #[serde(default)]
    pub deps: Vec<String>,
    #[serde(default, rename = "unsafe")]
    pub unsafe_code: bool,
}

/// First hard failure of a task; the only one the taxonomy classifies.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Failure {
    pub stage: Stage,
    pub kind: FailureKind,
    /// Normalized, length-capped diagnostic text.
    pub detail: String,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StageOutcomes {
    pub reduce: StageStatus,
    pub oxidize: StageStatus,
    pub compile: StageStatus,
    pub behavior: StageStatus,
}

impl StageOutcomes {
    pub fn set(&mut self, stage: Stage, status: StageStatus) {
        match stage {
            Stage::Reduce => self.reduce = status,
            Stage::Oxidize => self.oxidize = status,
            Stage::Compile => self.compile = status,
            Stage::Behavior => self.behavior = status,
        }
    }
}

/// Accumulator filled stage by stage while one task is processed.
///
/// Stages that never ran stay [`StageStatus::NotAttempted`]; only the stage
/// that actually failed is marked [`StageStatus::Fail`].
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskResult {
    pub id: String,
    #[serde(default)]
    pub split: Option<Split>,
    pub family: String,
    #[serde(default)]
    pub stages: StageOutcomes,
    #[serde(default)]
    pub reduce_deterministic: bool,
    /// `None` unless reverse-transform determinism was checked.
    #[serde(default)]
    pub oxidize_deterministic: Option<bool>,
    #[serde(default)]
    pub used_verbatim: bool,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub failure: Option<Failure>,
}

impl TaskResult {
    pub fn new(id: impl Into<String>, split: Option<Split>, family: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            split,
            family: family.into(),
            stages: StageOutcomes::default(),
            reduce_deterministic: false,
            oxidize_deterministic: None,
            used_verbatim: false,
            errors: vec![],
            warnings: vec![],
            failure: None,
        }
    }

    pub fn for_record(record: &TaskRecord) -> Self {
        Self::new(record.id.clone(), Some(record.split), record.family.clone())
    }

    pub fn pass(&mut self, stage: Stage) {
        self.stages.set(stage, StageStatus::Pass);
    }

    /// Record a hard failure: marks the stage failed, appends `"{label}: {detail}"`
    /// to the error list and keeps the first failure for classification.
    pub fn fail(&mut self, stage: Stage, kind: FailureKind, label: &str, detail: impl Into<String>) {
        let detail = detail.into();
        self.stages.set(stage, StageStatus::Fail);
        if detail.is_empty() {
            self.errors.push(label.to_string());
        } else {
            self.errors.push(format!("{label}: {detail}"));
        }
        if self.failure.is_none() {
            self.failure = Some(Failure { stage, kind, detail });
        }
    }

    /// Record a problem that does not stop the task, such as unstable output.
    /// The stage keeps its status; the problem still counts as a failure when
    /// nothing harder happened first.
    pub fn flag(&mut self, stage: Stage, kind: FailureKind, message: &str) {
        self.errors.push(message.to_string());
        if self.failure.is_none() {
            self.failure = Some(Failure {
                stage,
                kind,
                detail: message.to_string(),
            });
        }
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Forward and reverse transform both succeeded.
    pub fn transform_stable(&self) -> bool {
        self.stages.reduce.is_pass() && self.stages.oxidize.is_pass()
    }

    /// Forward output was identical across runs, and so was the reverse output
    /// when that was checked.
    pub fn deterministic(&self) -> bool {
        self.reduce_deterministic && self.oxidize_deterministic.unwrap_or(true)
    }

    pub fn compile_ok(&self) -> bool {
        self.stages.compile.is_pass()
    }

    pub fn behavior_ok(&self) -> bool {
        self.stages.behavior.is_pass()
    }
}
