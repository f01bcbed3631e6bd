use std::collections::BTreeMap;
use std::path::PathBuf;

use rdx_core::{Arm, Phase, Stage, StageStatus, TaskResult};
use serde::{Deserialize, Serialize};

use crate::classify::{classify_failed, classify_failure, FailureClass};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClassCount {
    pub label: FailureClass,
    pub count: usize,
}

/// Failure label counts, most common first (ties by label).
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct ErrorTaxonomy(Vec<ClassCount>);

impl ErrorTaxonomy {
    pub fn from_labels<I: IntoIterator<Item = FailureClass>>(labels: I) -> Self {
        let mut counts: BTreeMap<FailureClass, usize> = BTreeMap::new();
        for label in labels {
            *counts.entry(label).or_insert(0) += 1;
        }
        Self::from_counts(counts)
    }

    fn from_counts(counts: BTreeMap<FailureClass, usize>) -> Self {
        let mut entries: Vec<ClassCount> = counts
            .into_iter()
            .map(|(label, count)| ClassCount { label, count })
            .collect();
        entries.sort_by(|a, b| b.count.cmp(&a.count).then(a.label.cmp(&b.label)));
        Self(entries)
    }

    pub fn entries(&self) -> &[ClassCount] {
        &self.0
    }

    pub fn top(&self, n: usize) -> &[ClassCount] {
        &self.0[..n.min(self.0.len())]
    }

    pub fn count(&self, label: FailureClass) -> usize {
        self.0.iter().find(|e| e.label == label).map_or(0, |e| e.count)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn merge(&self, other: &ErrorTaxonomy) -> ErrorTaxonomy {
        let mut counts: BTreeMap<FailureClass, usize> = BTreeMap::new();
        for entry in self.0.iter().chain(other.0.iter()) {
            *counts.entry(entry.label).or_insert(0) += entry.count;
        }
        Self::from_counts(counts)
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PhaseCounts {
    pub transform: usize,
    pub compile: usize,
    pub test: usize,
}

impl PhaseCounts {
    pub fn bump(&mut self, phase: Phase) {
        match phase {
            Phase::Transform => self.transform += 1,
            Phase::Compile => self.compile += 1,
            Phase::Test => self.test += 1,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FamilyCounts {
    pub total: usize,
    pub compile: usize,
    pub test: usize,
}

/// One evaluated prediction.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct EvalRow {
    pub id: String,
    pub family: String,
    pub arm: Arm,
    pub transform_ok: bool,
    pub compile_ok: bool,
    pub test_ok: bool,
    #[serde(default)]
    pub transform_error: String,
    #[serde(default)]
    pub compile_error: String,
    #[serde(default)]
    pub test_error: String,
}

impl EvalRow {
    /// Flatten a processed prediction. A reverse transform that never ran
    /// (the `rust` arm) counts as passed.
    pub fn from_result(arm: Arm, result: &TaskResult) -> Self {
        let mut row = Self {
            id: result.id.clone(),
            family: result.family.clone(),
            arm,
            transform_ok: result.stages.oxidize != StageStatus::Fail,
            compile_ok: result.compile_ok(),
            test_ok: result.behavior_ok(),
            transform_error: String::new(),
            compile_error: String::new(),
            test_error: String::new(),
        };
        if let Some(failure) = &result.failure {
            let slot = match failure.stage {
                Stage::Reduce | Stage::Oxidize => &mut row.transform_error,
                Stage::Compile => &mut row.compile_error,
                Stage::Behavior => &mut row.test_error,
            };
            *slot = failure.detail.clone();
        }
        row
    }

    /// The first failing phase and its diagnostic, if any.
    pub fn first_failure(&self) -> Option<(Phase, &str)> {
        if !self.transform_ok {
            Some((Phase::Transform, self.transform_error.as_str()))
        } else if !self.compile_ok {
            Some((Phase::Compile, self.compile_error.as_str()))
        } else if !self.test_ok {
            Some((Phase::Test, self.test_error.as_str()))
        } else {
            None
        }
    }

    pub fn failure_class(&self) -> Option<(Phase, FailureClass)> {
        self.first_failure()
            .map(|(phase, text)| (phase, classify_failed(text, phase)))
    }
}

fn ratio(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ArmSummary {
    pub arm: Arm,
    pub total: usize,
    pub transform_pass: usize,
    pub compile_pass: usize,
    pub test_pass: usize,
    pub compile_at_1: f64,
    pub test_at_1: f64,
    pub per_family: BTreeMap<String, FamilyCounts>,
    pub failure_phase_counts: PhaseCounts,
    pub failure_taxonomy: ErrorTaxonomy,
    pub per_family_failure_phase_counts: BTreeMap<String, PhaseCounts>,
    pub per_family_failure_taxonomy: BTreeMap<String, ErrorTaxonomy>,
    pub rows: Vec<EvalRow>,
}

impl ArmSummary {
    pub fn transform_rate(&self) -> f64 {
        ratio(self.transform_pass, self.total)
    }
}

/// Pure reduction of one arm's rows. Only a row's first failing phase is classified.
pub fn summarize_arm(arm: Arm, rows: Vec<EvalRow>) -> ArmSummary {
    let total = rows.len();
    let mut per_family: BTreeMap<String, FamilyCounts> = BTreeMap::new();
    let mut failure_phase_counts = PhaseCounts::default();
    let mut labels = Vec::new();
    let mut family_phases: BTreeMap<String, PhaseCounts> = BTreeMap::new();
    let mut family_labels: BTreeMap<String, Vec<FailureClass>> = BTreeMap::new();

    for row in &rows {
        let fam = per_family.entry(row.family.clone()).or_default();
        fam.total += 1;
        fam.compile += usize::from(row.compile_ok);
        fam.test += usize::from(row.test_ok);

        if let Some((phase, label)) = row.failure_class() {
            failure_phase_counts.bump(phase);
            labels.push(label);
            family_phases.entry(row.family.clone()).or_default().bump(phase);
            family_labels.entry(row.family.clone()).or_default().push(label);
        }
    }

    let transform_pass = rows.iter().filter(|r| r.transform_ok).count();
    let compile_pass = rows.iter().filter(|r| r.compile_ok).count();
    let test_pass = rows.iter().filter(|r| r.test_ok).count();

    ArmSummary {
        arm,
        total,
        transform_pass,
        compile_pass,
        test_pass,
        compile_at_1: ratio(compile_pass, total),
        test_at_1: ratio(test_pass, total),
        per_family,
        failure_phase_counts,
        failure_taxonomy: ErrorTaxonomy::from_labels(labels),
        per_family_failure_phase_counts: family_phases,
        per_family_failure_taxonomy: family_labels
            .into_iter()
            .map(|(family, labels)| (family, ErrorTaxonomy::from_labels(labels)))
            .collect(),
        rows,
    }
}

/// Labels of the first failure of every task in a validation run.
pub fn validation_taxonomy(results: &[TaskResult]) -> ErrorTaxonomy {
    ErrorTaxonomy::from_labels(results.iter().filter_map(|r| r.failure.as_ref()).map(classify_failure))
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct EvalInputs {
    pub rust: PathBuf,
    pub iron: PathBuf,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct EvalReport {
    pub inputs: EvalInputs,
    pub rust: ArmSummary,
    pub iron: ArmSummary,
}

impl EvalReport {
    pub fn arms(&self) -> [&ArmSummary; 2] {
        [&self.rust, &self.iron]
    }
}
