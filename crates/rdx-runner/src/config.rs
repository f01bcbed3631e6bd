use std::path::{Path, PathBuf, MAIN_SEPARATOR};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_TOOL_CMD: &str = "target/debug/redox";
pub const MAX_DEFAULT_JOBS: usize = 8;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RunConfig {
    /// Command prefix for the transformation tool, split on whitespace.
    pub tool_cmd: String,
    pub compiler: String,
    pub edition: String,
    pub timeout_secs: u64,
    pub jobs: usize,
    pub purity_threshold: f64,
    pub allow_deps: bool,
    pub allow_unsafe: bool,
    pub behavior_checks: bool,
    pub check_oxidize_determinism: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            tool_cmd: DEFAULT_TOOL_CMD.to_string(),
            compiler: "rustc".to_string(),
            edition: rdx_toolchain::DEFAULT_EDITION.to_string(),
            timeout_secs: rdx_exec::DEFAULT_TIMEOUT.as_secs(),
            jobs: Self::default_jobs(),
            purity_threshold: rdx_validate::DEFAULT_PURITY_THRESHOLD,
            allow_deps: false,
            allow_unsafe: false,
            behavior_checks: false,
            check_oxidize_determinism: false,
        }
    }
}

impl RunConfig {
    pub fn default_jobs() -> usize {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
            .min(MAX_DEFAULT_JOBS)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        let cfg: RunConfig = toml::from_str(&s).with_context(|| format!("parse {}", path.display()))?;
        Ok(cfg)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
        }
        let s = toml::to_string_pretty(self).with_context(|| "serialize toml")?;
        std::fs::write(path, s).with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }

    /// Defaults, overlaid by `path` when given.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => Ok(Self::default()),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    pub fn jobs(&self) -> usize {
        self.jobs.max(1)
    }

    /// Tool argv prefix with `~` expanded. A relative program path that
    /// contains a separator is anchored at the current directory, since the
    /// tool runs inside scratch directories.
    pub fn tool_argv(&self) -> Result<Vec<String>> {
        let mut argv: Vec<String> = self
            .tool_cmd
            .split_whitespace()
            .map(|part| shellexpand::tilde(part).to_string())
            .collect();
        let Some(program) = argv.first_mut() else {
            bail!("tool command cannot be empty");
        };
        let cwd = std::env::current_dir().context("current directory")?;
        *program = anchor_program(program, &cwd).display().to_string();
        Ok(argv)
    }

    pub fn compiler_program(&self) -> Result<String> {
        let expanded = shellexpand::tilde(self.compiler.trim()).to_string();
        if expanded.is_empty() {
            bail!("compiler command cannot be empty");
        }
        let cwd = std::env::current_dir().context("current directory")?;
        Ok(anchor_program(&expanded, &cwd).display().to_string())
    }
}

fn anchor_program(program: &str, cwd: &Path) -> PathBuf {
    let path = Path::new(program);
    if path.is_relative() && (program.contains('/') || program.contains(MAIN_SEPARATOR)) {
        cwd.join(path)
    } else {
        path.to_path_buf()
    }
}
