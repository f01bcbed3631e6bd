use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use rdx_manifest::{load_manifest, load_predictions, LoadError};
use rdx_report::{read_json, render_aggregate, render_evaluation, render_validation, write_json, ValidationReport};
use rdx_runner::{doctor, run_evaluation, run_validation, Pipeline, RunConfig};
use rdx_validate::{aggregate_reports, EvalInputs, EvalReport};

#[derive(Parser)]
#[command(name = "rdx", version, about = "Round-trip validation and evaluation for the redox toolchain")]
struct Cli {
    /// Debug logging on stderr (RUST_LOG still wins)
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

/// Settings shared by every subcommand that runs the toolchain.
#[derive(Args)]
struct RunArgs {
    /// TOML file with run settings; flags override it
    #[arg(long)]
    config: Option<PathBuf>,
    /// Command prefix for the transformation tool
    #[arg(long)]
    tool_cmd: Option<String>,
    /// Native compiler program
    #[arg(long)]
    compiler: Option<String>,
    #[arg(long)]
    timeout_secs: Option<u64>,
    /// Worker threads
    #[arg(long)]
    jobs: Option<usize>,
}

impl RunArgs {
    fn resolve(&self) -> Result<RunConfig> {
        let config = self
            .config
            .as_deref()
            .map(|p| shellexpand::tilde(&p.display().to_string()).into_owned())
            .map(PathBuf::from);
        let mut cfg = RunConfig::resolve(config.as_deref())?;
        if let Some(tool_cmd) = &self.tool_cmd {
            cfg.tool_cmd = tool_cmd.clone();
        }
        if let Some(compiler) = &self.compiler {
            cfg.compiler = compiler.clone();
        }
        if let Some(timeout_secs) = self.timeout_secs {
            cfg.timeout_secs = timeout_secs;
        }
        if let Some(jobs) = self.jobs {
            cfg.jobs = jobs;
        }
        Ok(cfg)
    }
}

#[derive(Subcommand)]
enum Command {
    /// Validate a task manifest and check the release gates
    Validate {
        /// JSONL task manifest
        manifest: PathBuf,
        #[command(flatten)]
        run: RunArgs,
        #[arg(long)]
        purity_threshold: Option<f64>,
        /// Accept tasks that declare dependencies
        #[arg(long)]
        allow_deps: bool,
        /// Accept tasks marked unsafe
        #[arg(long)]
        allow_unsafe: bool,
        /// Also run family behavior probes on the round-tripped source
        #[arg(long)]
        behavior: bool,
        /// Run oxidize twice and require identical output
        #[arg(long)]
        check_oxidize_determinism: bool,
        /// Write the structured report here
        #[arg(long)]
        report_json: Option<PathBuf>,
    },

    /// Score rust and iron prediction files
    Evaluate {
        #[arg(long)]
        rust: PathBuf,
        #[arg(long)]
        iron: PathBuf,
        #[command(flatten)]
        run: RunArgs,
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Mean and spread over several evaluation reports
    Aggregate {
        #[arg(required = true)]
        reports: Vec<PathBuf>,
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Re-render a stored validation report
    Summarize { report: PathBuf },

    /// Write a default config file
    Init {
        #[arg(long, default_value = "rdx.toml")]
        path: PathBuf,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match dispatch(cli.cmd) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("ERROR: {err:#}");
            ExitCode::from(2)
        }
    }
}

fn dispatch(cmd: Command) -> Result<ExitCode> {
    match cmd {
        Command::Validate {
            manifest,
            run,
            purity_threshold,
            allow_deps,
            allow_unsafe,
            behavior,
            check_oxidize_determinism,
            report_json,
        } => {
            let mut cfg = run.resolve()?;
            if let Some(threshold) = purity_threshold {
                cfg.purity_threshold = threshold;
            }
            cfg.allow_deps |= allow_deps;
            cfg.allow_unsafe |= allow_unsafe;
            cfg.behavior_checks |= behavior;
            cfg.check_oxidize_determinism |= check_oxidize_determinism;
            validate(&manifest, &cfg, report_json.as_deref())
        }
        Command::Evaluate { rust, iron, run, out } => {
            let cfg = run.resolve()?;
            evaluate(rust, iron, &cfg, out.as_deref())?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Aggregate { reports, out } => {
            let loaded = reports
                .iter()
                .map(|path| read_json::<EvalReport>(path))
                .collect::<Result<Vec<_>>>()?;
            let agg = aggregate_reports(&loaded);
            print!("{}", render_aggregate(&agg));
            if let Some(out) = out {
                write_json(&out, &agg)?;
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Summarize { report } => {
            let report: ValidationReport = read_json(&report)?;
            print!("{}", render_validation(&report));
            Ok(ExitCode::SUCCESS)
        }
        Command::Init { path } => {
            RunConfig::default().save_to(&path)?;
            println!("Wrote default config to {}", path.display());
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn validate(manifest_path: &Path, cfg: &RunConfig, report_json: Option<&Path>) -> Result<ExitCode> {
    let manifest = match load_manifest(manifest_path) {
        Ok(manifest) => manifest,
        Err(LoadError::Schema { errors, .. }) => {
            println!("Manifest schema errors:");
            for err in &errors {
                println!("- {err}");
            }
            return Ok(ExitCode::from(1));
        }
        Err(err @ LoadError::Io { .. }) => return Err(err).context("load manifest"),
    };

    tracing::debug!(?cfg, "resolved run config");
    doctor(cfg)?;
    let pipeline = Pipeline::from_config(cfg)?;
    let report = run_validation(&pipeline, &manifest, cfg.purity_threshold, cfg.jobs());

    print!("{}", render_validation(&report));
    if let Some(path) = report_json {
        write_json(path, &report)?;
    }
    Ok(if report.gates.all_pass {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}

fn evaluate(rust: PathBuf, iron: PathBuf, cfg: &RunConfig, out: Option<&Path>) -> Result<()> {
    let rust_rows = load_predictions(&rust).with_context(|| format!("load {}", rust.display()))?;
    let iron_rows = load_predictions(&iron).with_context(|| format!("load {}", iron.display()))?;

    tracing::debug!(?cfg, rust_rows = rust_rows.len(), iron_rows = iron_rows.len(), "resolved run config");
    doctor(cfg)?;
    let pipeline = Pipeline::from_config(cfg)?;
    let report = run_evaluation(&pipeline, &rust_rows, &iron_rows, EvalInputs { rust, iron }, cfg.jobs());

    print!("{}", render_evaluation(&report));
    if let Some(path) = out {
        write_json(path, &report)?;
    }
    Ok(())
}
