use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use rdx_behavior::{ProbeRegistry, SynthesisError};
use rdx_core::{
    normalize_diagnostic, sanitize_crate_name, Arm, FailureKind, Stage, TaskRecord, TaskResult, EVAL_DIAGNOSTIC_CAP,
    VALIDATE_DIAGNOSTIC_CAP,
};
use rdx_exec::{InvokeError, Invoker, ProcessOutput};
use rdx_manifest::PredictionRow;
use rdx_toolchain::{uses_verbatim, NativeCompiler, RedoxTool, RunOutcome, Rustc, TransformTool};

use crate::RunConfig;

/// Dataset validation or prediction evaluation; they differ in diagnostic
/// cap and crate-name prefix.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    Validate,
    Evaluate,
}

impl Mode {
    fn cap(self) -> usize {
        match self {
            Mode::Validate => VALIDATE_DIAGNOSTIC_CAP,
            Mode::Evaluate => EVAL_DIAGNOSTIC_CAP,
        }
    }

    fn crate_prefix(self) -> &'static str {
        match self {
            Mode::Validate => "task",
            Mode::Evaluate => "pred",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PipelineOptions {
    pub allow_deps: bool,
    pub allow_unsafe: bool,
    pub behavior_checks: bool,
    pub check_oxidize_determinism: bool,
}

/// Stage orchestration for one task at a time. Shared read-only across workers.
pub struct Pipeline {
    tool: Box<dyn TransformTool>,
    compiler: Box<dyn NativeCompiler>,
    probes: ProbeRegistry,
    timeout: Duration,
    pub options: PipelineOptions,
}

/// A stage outcome that stops the task; its detail is already recorded.
struct Halt;

type Step<T> = std::result::Result<T, Halt>;

impl Pipeline {
    pub fn new(
        tool: Box<dyn TransformTool>,
        compiler: Box<dyn NativeCompiler>,
        probes: ProbeRegistry,
        timeout: Duration,
        options: PipelineOptions,
    ) -> Self {
        Self {
            tool,
            compiler,
            probes,
            timeout,
            options,
        }
    }

    pub fn from_config(cfg: &RunConfig) -> Result<Self> {
        let invoker = Invoker::new(cfg.timeout());
        let tool = RedoxTool::new(cfg.tool_argv()?, invoker.clone());
        let compiler = Rustc::new(cfg.compiler_program()?, cfg.edition.clone(), invoker);
        let probes = ProbeRegistry::with_builtin().context("compile behavior probes")?;
        let options = PipelineOptions {
            allow_deps: cfg.allow_deps,
            allow_unsafe: cfg.allow_unsafe,
            behavior_checks: cfg.behavior_checks,
            check_oxidize_determinism: cfg.check_oxidize_determinism,
        };
        Ok(Self::new(Box::new(tool), Box::new(compiler), probes, cfg.timeout(), options))
    }

    /// Strict checks, reduce twice, oxidize, compile the round trip and
    /// optionally probe its behavior. Never fails; problems land in the result.
    pub fn validate_task(&self, record: &TaskRecord) -> TaskResult {
        let mut result = TaskResult::for_record(record);
        if self.validate_into(record, &mut result).is_err() {
            tracing::debug!(id = %record.id, "validation stopped early");
        }
        result
    }

    fn validate_into(&self, record: &TaskRecord, result: &mut TaskResult) -> Step<()> {
        let mode = Mode::Validate;
        if !record.deps.is_empty() && !self.options.allow_deps {
            result.error("deps is non-empty (strict mode requires no dependencies)");
        }
        if record.unsafe_code && !self.options.allow_unsafe {
            result.error("unsafe=true is disallowed in strict mode");
        }

        let source = read_text(result, Stage::Reduce, FailureKind::TransformFailure, &record.source_path, mode)?;
        let file_name = record
            .source_path
            .file_name()
            .map_or_else(|| "input.rs".to_string(), |n| n.to_string_lossy().into_owned());
        let roundtrip = self.transform_stage(result, &source, &file_name, mode)?;

        let crate_name = sanitize_crate_name(&record.id, mode.crate_prefix());
        self.compile_stage(result, &roundtrip, &crate_name, "roundtrip compile failed", mode)?;

        if self.options.behavior_checks {
            let prompt = read_text(result, Stage::Behavior, FailureKind::BehaviorFailure, &record.prompt_path, mode)?;
            let unit = sanitize_crate_name(&format!("{}_behavior", record.id), mode.crate_prefix());
            self.behavior_stage(result, &record.family, &roundtrip, &prompt, &unit, mode)?;
        }
        Ok(())
    }

    /// Forward transform twice, reverse transform once (twice when configured).
    /// Returns the round-tripped source.
    fn transform_stage(&self, result: &mut TaskResult, source: &str, file_name: &str, mode: Mode) -> Step<String> {
        let first = self.tool.reduce(source, file_name);
        let second = self.tool.reduce(source, file_name);
        let kind = FailureKind::TransformFailure;
        let iron = self.checked(result, Stage::Reduce, kind, "reduce failed", first, mode)?;
        let iron_again = self.checked(result, Stage::Reduce, kind, "second reduce failed", second, mode)?;
        result.pass(Stage::Reduce);

        result.reduce_deterministic = iron == iron_again;
        if !result.reduce_deterministic {
            tracing::warn!(task = %result.id, "reduce output differs between runs");
            result.flag(Stage::Reduce, FailureKind::NonDeterminism, "reduce output is non-deterministic");
        }
        result.used_verbatim = uses_verbatim(&iron);

        let kind = FailureKind::OxidizeFailure;
        let rust = self.checked(result, Stage::Oxidize, kind, "oxidize failed", self.tool.oxidize(&iron), mode)?;
        if self.options.check_oxidize_determinism {
            let again = self.tool.oxidize(&iron);
            let rust_again = self.checked(result, Stage::Oxidize, kind, "second oxidize failed", again, mode)?;
            let stable = rust == rust_again;
            result.oxidize_deterministic = Some(stable);
            if !stable {
                tracing::warn!(task = %result.id, "oxidize output differs between runs");
                result.flag(Stage::Oxidize, FailureKind::NonDeterminism, "oxidize output is non-deterministic");
            }
        }
        result.pass(Stage::Oxidize);
        Ok(rust)
    }

    fn compile_stage(&self, result: &mut TaskResult, source: &str, crate_name: &str, label: &str, mode: Mode) -> Step<()> {
        let out = self.compiler.check_library(source, crate_name);
        self.checked(result, Stage::Compile, FailureKind::CompileFailure, label, out, mode)?;
        result.pass(Stage::Compile);
        Ok(())
    }

    fn behavior_stage(
        &self,
        result: &mut TaskResult,
        family: &str,
        source: &str,
        prompt: &str,
        crate_name: &str,
        mode: Mode,
    ) -> Step<()> {
        let label = "behavior failed";
        let program = match self.probes.synthesize(family, source, prompt) {
            Ok(program) => program,
            Err(err @ SynthesisError::UnsupportedFamily(_)) if mode == Mode::Validate => {
                result.warn(format!("behavior check skipped: {err}"));
                return Ok(());
            }
            Err(err) => {
                let kind = match &err {
                    SynthesisError::MissingFunction(_) => FailureKind::MissingFunction,
                    SynthesisError::MissingParameter(_) => FailureKind::MissingParameter,
                    SynthesisError::UnsupportedFamily(_) => FailureKind::UnsupportedFamily,
                };
                result.fail(Stage::Behavior, kind, label, err.to_string());
                return Err(Halt);
            }
        };

        // a harness that does not build fails the stage the same way a failing run does
        let ran = self
            .compiler
            .build_and_run(&program, crate_name)
            .map(|outcome| match outcome {
                RunOutcome::BuildFailed(out) | RunOutcome::Ran(out) => out,
            });
        self.checked(result, Stage::Behavior, FailureKind::BehaviorFailure, label, ran, mode)?;
        result.pass(Stage::Behavior);
        Ok(())
    }

    /// Record a failed or timed-out invocation against `stage`, or hand back stdout.
    fn checked(
        &self,
        result: &mut TaskResult,
        stage: Stage,
        kind: FailureKind,
        label: &str,
        outcome: std::result::Result<ProcessOutput, InvokeError>,
        mode: Mode,
    ) -> Step<String> {
        let out = match outcome {
            Ok(out) => out,
            Err(err) => {
                tracing::debug!(task = %result.id, ?stage, error = %err, "invocation failed");
                let detail = normalize_diagnostic(&err.to_string(), mode.cap());
                result.fail(stage, FailureKind::ToolInvocation, label, detail);
                return Err(Halt);
            }
        };
        if out.timed_out() {
            tracing::warn!(task = %result.id, ?stage, timeout_secs = self.timeout.as_secs(), "stage timed out");
            let detail = format!("timed out after {}s", self.timeout.as_secs());
            result.fail(stage, FailureKind::Timeout, label, detail);
            return Err(Halt);
        }
        if !out.success() {
            tracing::debug!(task = %result.id, ?stage, exit = ?out.exit, "stage failed");
            result.fail(stage, kind, label, normalize_diagnostic(out.diagnostic(), mode.cap()));
            return Err(Halt);
        }
        Ok(out.stdout)
    }

    /// One prediction through one arm: oxidize (iron only), compile, behavior.
    pub fn evaluate_prediction(&self, arm: Arm, row: &PredictionRow) -> TaskResult {
        let mut result = TaskResult::new(row.id.clone(), None, row.family.clone());
        if self.evaluate_into(arm, row, &mut result).is_err() {
            tracing::debug!(id = %row.id, arm = arm.as_str(), "evaluation stopped early");
        }
        result
    }

    fn evaluate_into(&self, arm: Arm, row: &PredictionRow, result: &mut TaskResult) -> Step<()> {
        let mode = Mode::Evaluate;
        let source = match arm {
            Arm::Rust => row.prediction.clone(),
            Arm::Iron => {
                let out = self.tool.oxidize(&row.prediction);
                let rust = self.checked(result, Stage::Oxidize, FailureKind::OxidizeFailure, "oxidize failed", out, mode)?;
                result.pass(Stage::Oxidize);
                rust
            }
        };

        let unit = format!("{}_{}", arm.as_str(), row.id);
        let crate_name = sanitize_crate_name(&unit, mode.crate_prefix());
        self.compile_stage(result, &source, &crate_name, "compile failed", mode)?;

        let behavior_unit = sanitize_crate_name(&format!("{unit}_behavior"), mode.crate_prefix());
        self.behavior_stage(result, &row.family, &source, &row.prompt, &behavior_unit, mode)
    }
}

fn read_text(result: &mut TaskResult, stage: Stage, kind: FailureKind, path: &Path, mode: Mode) -> Step<String> {
    std::fs::read_to_string(path).map_err(|err| {
        let detail = normalize_diagnostic(&format!("read {}: {err}", path.display()), mode.cap());
        result.fail(stage, kind, "failed to read input", detail);
        Halt
    })
}
