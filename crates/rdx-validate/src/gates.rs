use std::collections::BTreeSet;

use rdx_core::{StageStatus, TaskResult};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PURITY_THRESHOLD: f64 = 0.98;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct GateResult {
    pub gate_pipeline_stability: bool,
    pub gate_determinism: bool,
    pub gate_data_quality: bool,
    pub gate_iron_purity: bool,
    pub gate_split_hygiene: bool,
    pub all_pass: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct GateStats {
    pub total_tasks: usize,
    pub tasks_with_errors: usize,
    pub stable_count: usize,
    pub deterministic_count: usize,
    pub compile_count: usize,
    pub non_verbatim_count: usize,
    pub purity_ratio: f64,
    pub families: usize,
    /// Tasks whose behavior probe ran (pass or fail); zero when checks are off.
    #[serde(default)]
    pub behavior_checked: usize,
    #[serde(default)]
    pub behavior_pass_count: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct GateOutcome {
    pub gates: GateResult,
    pub stats: GateStats,
}

/// Reduce a finished result set to the five release gates.
///
/// Stability, determinism and data quality are unanimous; purity is the
/// non-verbatim ratio compared against `purity_threshold` (0.0 for an empty
/// set); hygiene passes when `split_errors` is empty. Behavior outcomes are
/// counted but gate nothing.
pub fn compute_gates(results: &[TaskResult], split_errors: &[String], purity_threshold: f64) -> GateOutcome {
    let total = results.len();
    let stable_count = results.iter().filter(|r| r.transform_stable()).count();
    let deterministic_count = results.iter().filter(|r| r.deterministic()).count();
    let compile_count = results.iter().filter(|r| r.compile_ok()).count();
    let non_verbatim_count = results.iter().filter(|r| !r.used_verbatim).count();
    let purity_ratio = if total == 0 {
        0.0
    } else {
        non_verbatim_count as f64 / total as f64
    };

    let gates = {
        let gate_pipeline_stability = stable_count == total;
        let gate_determinism = deterministic_count == total;
        let gate_data_quality = compile_count == total;
        let gate_iron_purity = purity_ratio >= purity_threshold;
        let gate_split_hygiene = split_errors.is_empty();
        GateResult {
            gate_pipeline_stability,
            gate_determinism,
            gate_data_quality,
            gate_iron_purity,
            gate_split_hygiene,
            all_pass: gate_pipeline_stability
                && gate_determinism
                && gate_data_quality
                && gate_iron_purity
                && gate_split_hygiene,
        }
    };

    let stats = GateStats {
        total_tasks: total,
        tasks_with_errors: results.iter().filter(|r| r.has_errors()).count(),
        stable_count,
        deterministic_count,
        compile_count,
        non_verbatim_count,
        purity_ratio,
        families: results.iter().map(|r| r.family.as_str()).collect::<BTreeSet<_>>().len(),
        behavior_checked: results
            .iter()
            .filter(|r| r.stages.behavior != StageStatus::NotAttempted)
            .count(),
        behavior_pass_count: results.iter().filter(|r| r.behavior_ok()).count(),
    };

    GateOutcome { gates, stats }
}
