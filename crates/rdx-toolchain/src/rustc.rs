use std::ffi::OsString;
use std::path::Path;

use rdx_exec::{InvokeError, Invoker, ProcessOutput};

use crate::types::{NativeCompiler, RunOutcome};

pub const DEFAULT_EDITION: &str = "2021";

#[derive(Clone, Debug)]
pub struct Rustc {
    pub program: String,
    pub edition: String,
    invoker: Invoker,
}

impl Rustc {
    pub fn new(program: impl Into<String>, edition: impl Into<String>, invoker: Invoker) -> Self {
        Self {
            program: program.into(),
            edition: edition.into(),
            invoker,
        }
    }

    /// `rustc --version`; used as a reachability probe.
    pub fn version(&self) -> Result<ProcessOutput, InvokeError> {
        self.invoker.run(&[self.program.as_str(), "--version"], Path::new("."))
    }

    fn base_args(&self, crate_name: &str) -> Vec<OsString> {
        vec![
            OsString::from(&self.program),
            "--crate-name".into(),
            crate_name.into(),
            "--edition".into(),
            OsString::from(&self.edition),
        ]
    }
}

impl NativeCompiler for Rustc {
    fn check_library(&self, source: &str, crate_name: &str) -> Result<ProcessOutput, InvokeError> {
        let invoker = self.invoker.clone().with_scratch_prefix("redox_compile_");
        let scratch = invoker.scratch()?;
        let src = scratch.write("roundtrip.rs", source).map_err(InvokeError::Scratch)?;

        let mut argv = self.base_args(crate_name);
        argv.extend([
            OsString::from("--crate-type"),
            "lib".into(),
            "-A".into(),
            "dead_code".into(),
            "-o".into(),
            scratch.join("out.rlib").into_os_string(),
            src.into_os_string(),
        ]);
        tracing::debug!(crate_name, "library check");
        invoker.run(&argv, scratch.path())
    }

    fn build_and_run(&self, source: &str, crate_name: &str) -> Result<RunOutcome, InvokeError> {
        let invoker = self.invoker.clone().with_scratch_prefix("redox_behavior_");
        let scratch = invoker.scratch()?;
        let src = scratch.write("behavior.rs", source).map_err(InvokeError::Scratch)?;
        let bin = scratch.join("behavior_bin");

        let mut argv = self.base_args(crate_name);
        argv.extend([
            OsString::from("-A"),
            "dead_code".into(),
            "-o".into(),
            bin.clone().into_os_string(),
            src.into_os_string(),
        ]);
        let build = invoker.run(&argv, scratch.path())?;
        if !build.success() {
            return Ok(RunOutcome::BuildFailed(build));
        }

        tracing::debug!(crate_name, "running behavior binary");
        let ran = invoker.run(&[bin.into_os_string()], scratch.path())?;
        Ok(RunOutcome::Ran(ran))
    }
}
