use std::ffi::{OsStr, OsString};
use std::io::{self, Read};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::scratch::ScratchDir;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// How long output readers may keep draining once the process group is gone.
const READER_GRACE: Duration = Duration::from_secs(2);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExitKind {
    Code(i32),
    /// Terminated by a signal it did not ask for (crash, external kill).
    Signal(i32),
    /// Killed by us after the wall-clock limit.
    TimedOut,
}

#[derive(Clone, Debug)]
pub struct ProcessOutput {
    pub exit: ExitKind,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit == ExitKind::Code(0)
    }

    pub fn timed_out(&self) -> bool {
        self.exit == ExitKind::TimedOut
    }

    /// Standard error, or standard output when stderr is blank.
    pub fn diagnostic(&self) -> &str {
        if self.stderr.trim().is_empty() {
            &self.stdout
        } else {
            &self.stderr
        }
    }
}

#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("empty command")]
    EmptyCommand,
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to wait for '{program}': {source}")]
    Wait {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("scratch directory: {0}")]
    Scratch(#[source] io::Error),
}

/// Runs external commands with a bounded wall-clock time. One attempt per call.
#[derive(Clone, Debug)]
pub struct Invoker {
    pub timeout: Duration,
    pub scratch_prefix: String,
}

impl Default for Invoker {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl Invoker {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            scratch_prefix: "rdx_".to_string(),
        }
    }

    pub fn with_scratch_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.scratch_prefix = prefix.into();
        self
    }

    pub fn scratch(&self) -> Result<ScratchDir, InvokeError> {
        ScratchDir::create(&self.scratch_prefix).map_err(InvokeError::Scratch)
    }

    /// Write `payload` to `file_name` in a fresh scratch directory, run
    /// `argv + [path-to-payload]` there and remove the directory afterwards.
    pub fn invoke(&self, argv: &[String], payload: &str, file_name: &str) -> Result<ProcessOutput, InvokeError> {
        let scratch = self.scratch()?;
        let input = scratch.write(file_name, payload).map_err(InvokeError::Scratch)?;

        let mut full: Vec<OsString> = argv.iter().map(OsString::from).collect();
        full.push(input.into_os_string());
        self.run(&full, scratch.path())
    }

    /// Run `argv` in `cwd`, killing it once the timeout elapses.
    pub fn run<S: AsRef<OsStr>>(&self, argv: &[S], cwd: &Path) -> Result<ProcessOutput, InvokeError> {
        run_with_timeout(argv, cwd, self.timeout)
    }
}

pub fn run_with_timeout<S: AsRef<OsStr>>(
    argv: &[S],
    cwd: &Path,
    timeout: Duration,
) -> Result<ProcessOutput, InvokeError> {
    let (program, args) = argv.split_first().ok_or(InvokeError::EmptyCommand)?;
    let program_name = program.as_ref().to_string_lossy().to_string();

    let mut cmd = Command::new(program);
    cmd.args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt as _;
        // own process group so a timeout can take down grandchildren too
        cmd.process_group(0);
    }

    let started = Instant::now();
    let mut child = cmd.spawn().map_err(|source| InvokeError::Spawn {
        program: program_name.clone(),
        source,
    })?;

    let stdout_rx = spawn_reader(child.stdout.take());
    let stderr_rx = spawn_reader(child.stderr.take());

    let waited = wait_with_deadline(&mut child, timeout);
    // anything the tool left running in the background would keep the pipes open
    kill_group(child.id());
    let drain_until = Instant::now() + READER_GRACE;
    let stdout = collect(&stdout_rx, drain_until);
    let stderr = collect(&stderr_rx, drain_until);
    let (status, timed_out) = waited.map_err(|source| InvokeError::Wait {
        program: program_name.clone(),
        source,
    })?;
    let elapsed = started.elapsed();

    let exit = if timed_out {
        ExitKind::TimedOut
    } else {
        exit_kind(status)
    };
    tracing::debug!(program = %program_name, ?exit, elapsed_ms = elapsed.as_millis() as u64, "process finished");

    Ok(ProcessOutput {
        exit,
        stdout: String::from_utf8_lossy(&stdout).into_owned(),
        stderr: String::from_utf8_lossy(&stderr).into_owned(),
        elapsed,
    })
}

fn spawn_reader<R: Read + Send + 'static>(stream: Option<R>) -> Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut s) = stream {
            let _ = s.read_to_end(&mut buf);
        }
        let _ = tx.send(buf);
    });
    rx
}

/// Whatever the reader gathered, or nothing if it is still blocked at `deadline`.
fn collect(rx: &Receiver<Vec<u8>>, deadline: Instant) -> Vec<u8> {
    rx.recv_timeout(deadline.saturating_duration_since(Instant::now()))
        .unwrap_or_default()
}

fn wait_with_deadline(child: &mut Child, timeout: Duration) -> io::Result<(ExitStatus, bool)> {
    let deadline = Instant::now().checked_add(timeout.max(Duration::from_millis(1)));
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok((status, false));
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            kill_tree(child);
            let status = child.wait()?;
            return Ok((status, true));
        }
        std::thread::sleep(Duration::from_millis(5));
    }
}

fn kill_tree(child: &mut Child) {
    kill_group(child.id());
    let _ = child.kill();
}

#[cfg(unix)]
fn kill_group(pid: u32) {
    if let Ok(pid) = i32::try_from(pid) {
        // SAFETY: plain syscall; the child leads its own process group, so
        // -pid addresses it and every descendant still in the group.
        unsafe {
            libc::kill(-pid, libc::SIGKILL);
        }
    }
}

#[cfg(not(unix))]
fn kill_group(_pid: u32) {}

fn exit_kind(status: ExitStatus) -> ExitKind {
    if let Some(code) = status.code() {
        return ExitKind::Code(code);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt as _;
        if let Some(sig) = status.signal() {
            return ExitKind::Signal(sig);
        }
    }
    ExitKind::Code(1)
}
