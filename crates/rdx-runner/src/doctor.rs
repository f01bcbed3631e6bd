use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use rdx_exec::Invoker;
use rdx_toolchain::Rustc;

use crate::RunConfig;

/// `name` as found on `PATH`, if it is an existing file there.
pub fn find_on_path(name: &str) -> Option<PathBuf> {
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

fn program_available(program: &str) -> bool {
    let path = Path::new(program);
    if path.components().count() > 1 || path.is_absolute() {
        path.is_file()
    } else {
        find_on_path(program).is_some()
    }
}

/// Check the tool and compiler before any task runs.
pub fn doctor(cfg: &RunConfig) -> Result<()> {
    let argv = cfg.tool_argv()?;
    let tool = argv.first().ok_or_else(|| anyhow!("tool command cannot be empty"))?;
    if !program_available(tool) {
        return Err(anyhow!(
            "redox tool not found: {tool}. Build it with `cargo build --bin redox` or pass --tool-cmd"
        ));
    }

    let compiler = cfg.compiler_program()?;
    let rustc = Rustc::new(compiler.clone(), cfg.edition.clone(), Invoker::new(cfg.timeout()));
    match rustc.version() {
        Ok(out) if out.success() => {
            tracing::debug!(compiler = %compiler, version = %out.stdout.trim(), "compiler ok");
            Ok(())
        }
        Ok(out) => Err(anyhow!(
            "compiler '{compiler}' did not answer --version: {}",
            out.diagnostic().trim()
        )),
        Err(err) => Err(anyhow!("compiler '{compiler}' is not usable: {err}")),
    }
}
