use rdx_exec::{InvokeError, ProcessOutput};

/// Literal the tool emits when it falls back to embedding raw Rust.
pub const VERBATIM_MARKER: &str = "verbatim item \"";

pub fn uses_verbatim(iron: &str) -> bool {
    iron.contains(VERBATIM_MARKER)
}

/// The external Rust <-> Iron transformation tool.
pub trait TransformTool: Send + Sync {
    /// Rust -> Iron. `file_name` is the name the source is written under.
    fn reduce(&self, source: &str, file_name: &str) -> Result<ProcessOutput, InvokeError>;

    /// Iron -> Rust.
    fn oxidize(&self, iron: &str) -> Result<ProcessOutput, InvokeError>;
}

#[derive(Clone, Debug)]
pub enum RunOutcome {
    /// The program did not compile; holds the compiler's output.
    BuildFailed(ProcessOutput),
    /// The program compiled; holds the output of running it.
    Ran(ProcessOutput),
}

pub trait NativeCompiler: Send + Sync {
    /// Library-mode build with unused-code warnings off; the artifact is discarded.
    fn check_library(&self, source: &str, crate_name: &str) -> Result<ProcessOutput, InvokeError>;

    /// Build `source` as an executable and run it with no arguments.
    fn build_and_run(&self, source: &str, crate_name: &str) -> Result<RunOutcome, InvokeError>;
}
