#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rdx_behavior::ProbeRegistry;
use rdx_core::{Arm, FailureKind, Stage, StageStatus};
use rdx_exec::Invoker;
use rdx_manifest::{load_manifest, PredictionRow};
use rdx_runner::{run_evaluation, run_validation, Pipeline, PipelineOptions};
use rdx_toolchain::{RedoxTool, Rustc};
use rdx_validate::{classify_failure, EvalInputs, FailureClass};

/// Pass-through tool: both directions print the input file unchanged.
const IDENTITY_TOOL: &str = r#"cat "$2""#;

fn write_script(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("redox");
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

fn pipeline(script: &Path, timeout: Duration, options: PipelineOptions) -> Pipeline {
    let invoker = Invoker::new(timeout);
    Pipeline::new(
        Box::new(RedoxTool::new(vec![script.display().to_string()], invoker.clone())),
        Box::new(Rustc::new("rustc", "2021", invoker)),
        ProbeRegistry::with_builtin().unwrap(),
        timeout,
        options,
    )
}

struct Task<'a> {
    id: &'a str,
    split: &'a str,
    family: &'a str,
    prompt: &'a str,
    source: &'a str,
    extra: &'a str,
}

impl<'a> Task<'a> {
    fn new(id: &'a str, source: &'a str) -> Self {
        Self {
            id,
            split: "train",
            family: "closure_shift_const",
            prompt: "Write a function that adds 5 to input.",
            source,
            extra: "",
        }
    }
}

/// Write sources, prompts and a manifest into `dir`; returns the manifest path.
fn write_manifest(dir: &Path, tasks: &[Task]) -> PathBuf {
    let mut lines = Vec::new();
    for task in tasks {
        std::fs::write(dir.join(format!("{}.rs", task.id)), task.source).unwrap();
        std::fs::write(dir.join(format!("{}.md", task.id)), task.prompt).unwrap();
        lines.push(format!(
            r#"{{"id":"{id}","split":"{split}","family":"{family}","prompt_path":"{id}.md","source_path":"{id}.rs"{extra}}}"#,
            id = task.id,
            split = task.split,
            family = task.family,
            extra = task.extra,
        ));
    }
    let path = dir.join("manifest.jsonl");
    std::fs::write(&path, lines.join("\n") + "\n").unwrap();
    path
}

const ADD_FIVE: &str = "pub fn add_five(x: i32) -> i32 {\n    let add = |v: i32| v + 5;\n    add(x)\n}\n";
const ADD_SIX: &str = "pub fn add_five(x: i32) -> i32 {\n    x + 6\n}\n";

#[test]
fn clean_dataset_passes_every_gate() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), IDENTITY_TOOL);
    let manifest = load_manifest(&write_manifest(
        dir.path(),
        &[Task::new("t1", ADD_FIVE), Task::new("2nd", ADD_FIVE)],
    ))
    .unwrap();

    let report = run_validation(&pipeline(&script, Duration::from_secs(60), PipelineOptions::default()), &manifest, 0.98, 2);
    assert!(report.gates.all_pass, "{:?}", report.tasks);
    assert_eq!(report.stats.total_tasks, 2);
    assert_eq!(report.stats.purity_ratio, 1.0);
    assert_eq!(report.manifest_digest, manifest.digest);
    assert_eq!(report.tasks[0].id, "2nd");
    assert!(report.tasks.iter().all(|t| t.reduce_ok && t.oxidize_ok && t.compile_ok));
    assert!(report.taxonomy.is_empty());
}

#[test]
fn reduce_failure_skips_later_stages() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(
        dir.path(),
        r#"if grep -q BROKEN "$2"; then echo "parse error: unexpected item" >&2; exit 1; fi
cat "$2""#,
    );
    let manifest = load_manifest(&write_manifest(
        dir.path(),
        &[Task::new("good", ADD_FIVE), Task::new("bad", "// BROKEN\npub fn f( {\n")],
    ))
    .unwrap();

    let report = run_validation(&pipeline(&script, Duration::from_secs(60), PipelineOptions::default()), &manifest, 0.98, 1);
    let bad = report.tasks.iter().find(|t| t.id == "bad").unwrap();
    assert!(!bad.reduce_ok);
    assert_eq!(bad.stages.reduce, StageStatus::Fail);
    assert_eq!(bad.stages.oxidize, StageStatus::NotAttempted);
    assert_eq!(bad.stages.compile, StageStatus::NotAttempted);
    assert_eq!(bad.errors[0], "reduce failed: parse error: unexpected item");
    assert_eq!(bad.errors.len(), 1);
    assert!(!report.gates.gate_pipeline_stability);
    assert!(!report.gates.gate_data_quality);
    assert!(!report.gates.all_pass);
    assert_eq!(report.taxonomy.count(FailureClass::IronParseError), 1);
}

#[test]
fn unstable_reduce_fails_determinism_only() {
    let dir = tempfile::tempdir().unwrap();
    // the pid differs between the two reduce runs
    let script = write_script(
        dir.path(),
        r#"cat "$2"; if [ "$1" = reduce ]; then echo "// run $$"; fi"#,
    );
    let manifest = load_manifest(&write_manifest(dir.path(), &[Task::new("t1", ADD_FIVE)])).unwrap();

    let report = run_validation(&pipeline(&script, Duration::from_secs(60), PipelineOptions::default()), &manifest, 0.98, 1);
    let task = &report.tasks[0];
    assert!(!task.reduce_deterministic);
    assert!(task.compile_ok);
    assert!(task.errors.contains(&"reduce output is non-deterministic".to_string()));
    assert!(!report.gates.gate_determinism);
    assert!(report.gates.gate_pipeline_stability);
    assert!(report.gates.gate_data_quality);
}

#[test]
fn oxidize_determinism_is_opt_in() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(
        dir.path(),
        r#"cat "$2"; if [ "$1" = oxidize ]; then echo "// run $$"; fi"#,
    );
    let manifest = load_manifest(&write_manifest(dir.path(), &[Task::new("t1", ADD_FIVE)])).unwrap();

    let relaxed = run_validation(&pipeline(&script, Duration::from_secs(60), PipelineOptions::default()), &manifest, 0.98, 1);
    assert!(relaxed.gates.all_pass);
    assert_eq!(relaxed.tasks[0].oxidize_deterministic, None);

    let options = PipelineOptions {
        check_oxidize_determinism: true,
        ..PipelineOptions::default()
    };
    let strict = run_validation(&pipeline(&script, Duration::from_secs(60), options), &manifest, 0.98, 1);
    assert_eq!(strict.tasks[0].oxidize_deterministic, Some(false));
    assert!(strict.tasks[0].errors.contains(&"oxidize output is non-deterministic".to_string()));
    assert!(!strict.gates.gate_determinism);
}

#[test]
fn verbatim_output_lowers_purity() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(
        dir.path(),
        r#"if [ "$1" = reduce ] && grep -q macro_rules "$2"; then echo '// verbatim item "macro"'; fi
cat "$2""#,
    );
    let macro_src = "macro_rules! five { () => { 5 }; }\npub fn add_five(x: i32) -> i32 { x + five!() }\n";
    let manifest = load_manifest(&write_manifest(
        dir.path(),
        &[Task::new("plain", ADD_FIVE), Task::new("macro", macro_src)],
    ))
    .unwrap();

    let report = run_validation(&pipeline(&script, Duration::from_secs(60), PipelineOptions::default()), &manifest, 0.98, 2);
    assert_eq!(report.stats.non_verbatim_count, 1);
    assert_eq!(report.stats.purity_ratio, 0.5);
    assert!(!report.gates.gate_iron_purity);
    assert!(report.gates.gate_data_quality);
    assert!(report.tasks.iter().find(|t| t.id == "macro").unwrap().used_verbatim);
}

#[test]
fn strict_mode_errors_do_not_stop_the_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), IDENTITY_TOOL);
    let mut task = Task::new("t1", ADD_FIVE);
    task.extra = r#","deps":["serde"],"unsafe":true"#;
    let manifest = load_manifest(&write_manifest(dir.path(), &[task])).unwrap();

    let report = run_validation(&pipeline(&script, Duration::from_secs(60), PipelineOptions::default()), &manifest, 0.98, 1);
    let entry = &report.tasks[0];
    assert_eq!(entry.errors.len(), 2);
    assert!(entry.errors[0].starts_with("deps is non-empty"));
    assert!(entry.compile_ok);
    assert!(report.gates.all_pass);
    assert_eq!(report.stats.tasks_with_errors, 1);

    let options = PipelineOptions {
        allow_deps: true,
        allow_unsafe: true,
        ..PipelineOptions::default()
    };
    let relaxed = run_validation(&pipeline(&script, Duration::from_secs(60), options), &manifest, 0.98, 1);
    assert!(relaxed.tasks[0].errors.is_empty());
}

#[test]
fn split_leak_fails_hygiene() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), IDENTITY_TOOL);
    let mut held_out = Task::new("t2", ADD_FIVE);
    held_out.split = "test";
    let manifest = load_manifest(&write_manifest(dir.path(), &[Task::new("t1", ADD_FIVE), held_out])).unwrap();

    let report = run_validation(&pipeline(&script, Duration::from_secs(60), PipelineOptions::default()), &manifest, 0.98, 2);
    assert_eq!(
        report.split_errors,
        vec!["family 'closure_shift_const' appears in multiple splits: test, train".to_string()]
    );
    assert!(!report.gates.gate_split_hygiene);
    assert!(report.gates.gate_data_quality);
}

#[test]
fn behavior_checks_run_on_the_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), IDENTITY_TOOL);
    let mut other_family = Task::new("t3", "pub fn noop() {}\n");
    other_family.family = "hashmap_insert";
    let manifest = load_manifest(&write_manifest(
        dir.path(),
        &[Task::new("t1", ADD_FIVE), Task::new("t2", ADD_SIX), other_family],
    ))
    .unwrap();

    let options = PipelineOptions {
        behavior_checks: true,
        ..PipelineOptions::default()
    };
    let report = run_validation(&pipeline(&script, Duration::from_secs(60), options), &manifest, 0.98, 3);
    let by_id = |id: &str| report.tasks.iter().find(|t| t.id == id).unwrap();

    assert_eq!(by_id("t1").behavior, StageStatus::Pass);
    assert_eq!(by_id("t2").behavior, StageStatus::Fail);
    assert!(by_id("t2").errors[0].starts_with("behavior failed: "));
    assert_eq!(by_id("t3").behavior, StageStatus::NotAttempted);
    assert!(by_id("t3").warnings[0].contains("Unsupported family for behavior checks: hashmap_insert"));
    assert!(by_id("t3").errors.is_empty());

    assert_eq!(report.stats.behavior_checked, 2);
    assert_eq!(report.stats.behavior_pass_count, 1);
    assert!(report.gates.all_pass);
    assert_eq!(report.taxonomy.count(FailureClass::BehaviorAssertion), 1);
}

#[test]
fn hung_tool_times_out() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), "sleep 10; cat \"$2\"");
    let manifest = load_manifest(&write_manifest(dir.path(), &[Task::new("t1", ADD_FIVE)])).unwrap();

    let report = run_validation(&pipeline(&script, Duration::from_secs(1), PipelineOptions::default()), &manifest, 0.98, 1);
    let failure = report.tasks[0].failure.as_ref().unwrap();
    assert_eq!(failure.kind, FailureKind::Timeout);
    assert_eq!(failure.stage, Stage::Reduce);
    assert_eq!(report.taxonomy.count(FailureClass::Timeout), 1);
}

#[test]
fn missing_tool_is_a_task_failure_not_a_crash() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = load_manifest(&write_manifest(dir.path(), &[Task::new("t1", ADD_FIVE)])).unwrap();
    let missing = dir.path().join("no-such-redox");

    let report = run_validation(&pipeline(&missing, Duration::from_secs(5), PipelineOptions::default()), &manifest, 0.98, 1);
    let failure = report.tasks[0].failure.as_ref().unwrap();
    assert_eq!(failure.kind, FailureKind::ToolInvocation);
    assert_eq!(report.taxonomy.count(FailureClass::ToolInvocation), 1);
    assert!(!report.gates.all_pass);
}

fn prediction(id: &str, prediction: &str) -> PredictionRow {
    PredictionRow {
        id: id.into(),
        family: "closure_shift_const".into(),
        prompt: "Write a function using a closure that adds 5 to input.".into(),
        prediction: prediction.into(),
    }
}

#[test]
fn evaluation_scores_both_arms() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(
        dir.path(),
        r#"if grep -q BROKEN "$2"; then echo "oxidation failed: bad token" >&2; exit 1; fi
cat "$2""#,
    );
    let rust_rows = vec![
        prediction("1", ADD_FIVE),
        prediction("2", ADD_SIX),
        prediction("3", "pub fn add_five(x: i32) -> i32 { y }\n"),
    ];
    let iron_rows = vec![prediction("1", ADD_FIVE), prediction("2", "BROKEN")];
    let inputs = EvalInputs {
        rust: PathBuf::from("rust.jsonl"),
        iron: PathBuf::from("iron.jsonl"),
    };

    let report = run_evaluation(
        &pipeline(&script, Duration::from_secs(60), PipelineOptions::default()),
        &rust_rows,
        &iron_rows,
        inputs,
        2,
    );

    let rust = &report.rust;
    assert_eq!(rust.arm, Arm::Rust);
    assert_eq!(rust.total, 3);
    assert_eq!(rust.transform_pass, 3);
    assert_eq!(rust.compile_pass, 2);
    assert_eq!(rust.test_pass, 1);
    assert_eq!(rust.failure_taxonomy.count(FailureClass::BehaviorAssertion), 1);
    assert_eq!(rust.failure_taxonomy.count(FailureClass::NameResolution), 1);
    assert_eq!(rust.rows.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(), ["1", "2", "3"]);

    let iron = &report.iron;
    assert_eq!(iron.transform_pass, 1);
    assert_eq!(iron.test_pass, 1);
    assert_eq!(iron.failure_phase_counts.transform, 1);
    assert_eq!(iron.failure_taxonomy.count(FailureClass::OxidationError), 1);
    assert!(!iron.rows[1].compile_ok);
}

#[test]
fn evaluation_reports_unsupported_family_and_missing_function() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), IDENTITY_TOOL);
    let mut unknown = prediction("1", "pub fn f() {}\n");
    unknown.family = "hashmap_insert".into();
    let rows = vec![unknown, prediction("2", "pub const X: i32 = 1;\n")];
    let inputs = EvalInputs {
        rust: PathBuf::from("r.jsonl"),
        iron: PathBuf::from("i.jsonl"),
    };

    let report = run_evaluation(
        &pipeline(&script, Duration::from_secs(60), PipelineOptions::default()),
        &rows,
        &[],
        inputs,
        1,
    );
    assert_eq!(report.rust.compile_pass, 2);
    assert_eq!(report.rust.test_pass, 0);
    assert_eq!(report.rust.failure_taxonomy.count(FailureClass::UnsupportedFamily), 1);
    assert_eq!(report.rust.failure_taxonomy.count(FailureClass::MissingFunction), 1);
    assert_eq!(report.iron.total, 0);
    assert_eq!(report.iron.compile_at_1, 0.0);
}

#[test]
fn prompt_without_a_parameter_is_its_own_failure_kind() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), IDENTITY_TOOL);
    let mut row = prediction("1", ADD_FIVE);
    row.prompt = "Write a function using a closure.".into();

    let result = pipeline(&script, Duration::from_secs(60), PipelineOptions::default())
        .evaluate_prediction(Arm::Rust, &row);
    assert_eq!(result.stages.compile, StageStatus::Pass);
    let failure = result.failure.as_ref().unwrap();
    assert_eq!(failure.kind, FailureKind::MissingParameter);
    assert_eq!(failure.stage, Stage::Behavior);
    assert_eq!(classify_failure(failure), FailureClass::MissingParameter);
}
