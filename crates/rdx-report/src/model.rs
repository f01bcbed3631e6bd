use rdx_core::{Failure, Split, StageOutcomes, StageStatus, TaskResult};
use rdx_validate::{ErrorTaxonomy, GateResult, GateStats};
use serde::{Deserialize, Serialize};

/// Per-task row of a validation report.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskEntry {
    pub id: String,
    pub split: Option<Split>,
    pub family: String,
    pub used_verbatim: bool,
    pub reduce_ok: bool,
    pub reduce_deterministic: bool,
    pub oxidize_ok: bool,
    #[serde(default)]
    pub oxidize_deterministic: Option<bool>,
    #[serde(alias = "roundtrip_compile_ok")]
    pub compile_ok: bool,
    #[serde(default)]
    pub behavior: StageStatus,
    #[serde(default)]
    pub stages: StageOutcomes,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    #[serde(default)]
    pub failure: Option<Failure>,
}

impl From<&TaskResult> for TaskEntry {
    fn from(result: &TaskResult) -> Self {
        Self {
            id: result.id.clone(),
            split: result.split,
            family: result.family.clone(),
            used_verbatim: result.used_verbatim,
            reduce_ok: result.stages.reduce.is_pass(),
            reduce_deterministic: result.reduce_deterministic,
            oxidize_ok: result.stages.oxidize.is_pass(),
            oxidize_deterministic: result.oxidize_deterministic,
            compile_ok: result.compile_ok(),
            behavior: result.stages.behavior,
            stages: result.stages,
            errors: result.errors.clone(),
            warnings: result.warnings.clone(),
            failure: result.failure.clone(),
        }
    }
}

impl TaskEntry {
    pub fn split_label(&self) -> &'static str {
        self.split.map_or("-", |s| s.as_str())
    }
}

/// Everything the human validation summary needs, so it can be re-rendered
/// without running any tool.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ValidationReport {
    pub gates: GateResult,
    pub stats: GateStats,
    pub split_errors: Vec<String>,
    pub tasks: Vec<TaskEntry>,
    pub purity_threshold: f64,
    pub manifest_task_count: usize,
    #[serde(default)]
    pub manifest_digest: String,
    #[serde(default)]
    pub taxonomy: ErrorTaxonomy,
}

impl ValidationReport {
    pub fn failing_tasks(&self) -> impl Iterator<Item = &TaskEntry> {
        self.tasks.iter().filter(|t| !t.errors.is_empty())
    }

    pub fn warned_tasks(&self) -> impl Iterator<Item = &TaskEntry> {
        self.tasks.iter().filter(|t| !t.warnings.is_empty())
    }
}
