use rdx_exec::{InvokeError, Invoker, ProcessOutput};

use crate::types::TransformTool;

/// `redox reduce <file>` / `redox oxidize <file>` driven through a command prefix.
#[derive(Clone, Debug)]
pub struct RedoxTool {
    pub argv: Vec<String>,
    invoker: Invoker,
}

impl RedoxTool {
    pub fn new(argv: Vec<String>, invoker: Invoker) -> Self {
        Self { argv, invoker }
    }

    fn subcommand(&self, name: &str) -> Vec<String> {
        let mut argv = self.argv.clone();
        argv.push(name.to_string());
        argv
    }
}

impl TransformTool for RedoxTool {
    fn reduce(&self, source: &str, file_name: &str) -> Result<ProcessOutput, InvokeError> {
        let invoker = self.invoker.clone().with_scratch_prefix("redox_reduce_");
        invoker.invoke(&self.subcommand("reduce"), source, file_name)
    }

    fn oxidize(&self, iron: &str) -> Result<ProcessOutput, InvokeError> {
        let invoker = self.invoker.clone().with_scratch_prefix("redox_oxidize_");
        invoker.invoke(&self.subcommand("oxidize"), iron, "input.iron")
    }
}
