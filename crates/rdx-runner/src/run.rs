use std::time::Instant;

use rdx_core::Arm;
use rdx_manifest::{Manifest, PredictionRow};
use rdx_report::{TaskEntry, ValidationReport};
use rdx_validate::{
    check_split_hygiene, compute_gates, family_count, summarize_arm, validation_taxonomy, ArmSummary, EvalInputs,
    EvalReport, EvalRow,
};

use crate::pipeline::Pipeline;
use crate::pool::run_pool;

/// Validate every record of a loaded manifest and reduce the results to gates.
/// Tasks are listed by id in the report.
pub fn run_validation(pipeline: &Pipeline, manifest: &Manifest, purity_threshold: f64, jobs: usize) -> ValidationReport {
    let started = Instant::now();
    let split_errors = check_split_hygiene(&manifest.records);
    tracing::info!(
        manifest = %manifest.path.display(),
        tasks = manifest.records.len(),
        families = family_count(&manifest.records),
        split_issues = split_errors.len(),
        "validation started"
    );

    let mut results = run_pool(&manifest.records, jobs, |record| {
        let result = pipeline.validate_task(record);
        tracing::info!(task = %record.id, errors = result.errors.len(), "task validated");
        result
    });
    results.sort_by(|a, b| a.id.cmp(&b.id));

    let outcome = compute_gates(&results, &split_errors, purity_threshold);
    tracing::info!(
        tasks = results.len(),
        all_pass = outcome.gates.all_pass,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "validation finished"
    );

    ValidationReport {
        gates: outcome.gates,
        stats: outcome.stats,
        split_errors,
        tasks: results.iter().map(TaskEntry::from).collect(),
        purity_threshold,
        manifest_task_count: manifest.records.len(),
        manifest_digest: manifest.digest.clone(),
        taxonomy: validation_taxonomy(&results),
    }
}

fn evaluate_arm(pipeline: &Pipeline, arm: Arm, rows: &[PredictionRow], jobs: usize) -> ArmSummary {
    let started = Instant::now();
    let results = run_pool(rows, jobs, |row| {
        let result = pipeline.evaluate_prediction(arm, row);
        tracing::info!(arm = arm.as_str(), task = %row.id, ok = result.behavior_ok(), "prediction evaluated");
        result
    });
    tracing::info!(
        arm = arm.as_str(),
        rows = rows.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "arm finished"
    );
    summarize_arm(arm, results.iter().map(|r| EvalRow::from_result(arm, r)).collect())
}

/// Evaluate both arms. Rows keep their input order.
pub fn run_evaluation(
    pipeline: &Pipeline,
    rust_rows: &[PredictionRow],
    iron_rows: &[PredictionRow],
    inputs: EvalInputs,
    jobs: usize,
) -> EvalReport {
    EvalReport {
        inputs,
        rust: evaluate_arm(pipeline, Arm::Rust, rust_rows, jobs),
        iron: evaluate_arm(pipeline, Arm::Iron, iron_rows, jobs),
    }
}
