//! Synchronous sub-process execution with full output capture
//!
//! Both external tools (the build script and the comparison script) are
//! run to completion here. Output is collected on reader threads so a
//! chatty child cannot deadlock on a full pipe, and an optional deadline
//! kills a child that never exits.

use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Interval between exit checks while waiting on a child
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// A program plus fixed arguments, written in TOML as a string array
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new<I, S>(program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Shell-ish rendering for log lines
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl TryFrom<Vec<String>> for CommandSpec {
    type Error = String;

    fn try_from(mut parts: Vec<String>) -> Result<Self, Self::Error> {
        if parts.is_empty() || parts[0].trim().is_empty() {
            return Err("command must name a program".to_string());
        }
        let program = parts.remove(0);
        Ok(Self {
            program,
            args: parts,
        })
    }
}

impl From<CommandSpec> for Vec<String> {
    fn from(spec: CommandSpec) -> Self {
        std::iter::once(spec.program).chain(spec.args).collect()
    }
}

/// How a child process ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessStatus {
    /// Exited normally with a code
    Exited(i32),
    /// Terminated by a signal
    Signalled,
    /// Killed after exceeding its deadline
    TimedOut(Duration),
    /// Could not be started at all
    LaunchFailed(String),
}

impl ProcessStatus {
    pub fn success(&self) -> bool {
        matches!(self, ProcessStatus::Exited(0))
    }

    fn from_exit(status: ExitStatus) -> Self {
        match status.code() {
            Some(code) => ProcessStatus::Exited(code),
            None => ProcessStatus::Signalled,
        }
    }
}

impl std::fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessStatus::Exited(code) => write!(f, "exit code {}", code),
            ProcessStatus::Signalled => write!(f, "terminated by signal"),
            ProcessStatus::TimedOut(limit) => write!(f, "timed out after {}s", limit.as_secs()),
            ProcessStatus::LaunchFailed(reason) => write!(f, "failed to launch: {}", reason),
        }
    }
}

/// Everything captured from one run
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub status: ProcessStatus,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }
}

/// Run `spec` with `extra_args` appended, blocking until it exits.
///
/// Never returns an error: launch failures and timeouts are folded into
/// [`ProcessStatus`], with the launch error text placed in `stderr`.
pub fn run_captured(
    spec: &CommandSpec,
    extra_args: &[String],
    cwd: &Path,
    timeout: Option<Duration>,
) -> ProcessOutput {
    let start = Instant::now();

    tracing::debug!(
        command = %spec.display(),
        extra = ?extra_args,
        cwd = %cwd.display(),
        "spawning"
    );

    let mut command = Command::new(&spec.program);
    command
        .args(&spec.args)
        .args(extra_args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    // Under a deadline the child leads its own process group.
    #[cfg(unix)]
    if timeout.is_some() {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }
    let spawned = command.spawn();

    let mut child = match spawned {
        Ok(child) => child,
        Err(e) => {
            let reason = format!("{}: {}", spec.program, e);
            tracing::warn!(%reason, "launch failed");
            return ProcessOutput {
                status: ProcessStatus::LaunchFailed(reason.clone()),
                stdout: String::new(),
                stderr: reason,
                duration: start.elapsed(),
            };
        }
    };

    let stdout_handle = drain(child.stdout.take());
    let stderr_handle = drain(child.stderr.take());

    let status = wait_with_deadline(&mut child, start, timeout);

    let stdout = join_output(stdout_handle);
    let mut stderr = join_output(stderr_handle);
    if let ProcessStatus::TimedOut(limit) = &status {
        if !stderr.is_empty() && !stderr.ends_with('\n') {
            stderr.push('\n');
        }
        stderr.push_str(&format!(
            "{} killed after exceeding {}s timeout\n",
            spec.program,
            limit.as_secs()
        ));
    }

    let duration = start.elapsed();
    tracing::debug!(status = %status, elapsed_ms = duration.as_millis() as u64, "child finished");

    ProcessOutput {
        status,
        stdout,
        stderr,
        duration,
    }
}

fn wait_with_deadline(child: &mut Child, start: Instant, timeout: Option<Duration>) -> ProcessStatus {
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return ProcessStatus::from_exit(status),
            Ok(None) => {}
            Err(e) => return ProcessStatus::LaunchFailed(format!("wait failed: {}", e)),
        }

        if let Some(limit) = timeout {
            if start.elapsed() >= limit {
                kill_tree(child);
                let _ = child.wait();
                return ProcessStatus::TimedOut(limit);
            }
        }

        thread::sleep(WAIT_POLL_INTERVAL);
    }
}

/// Kill the child and everything it spawned.
///
/// Descendants may hold the output pipes open; the readers only finish
/// once the whole group is gone.
fn kill_tree(child: &mut Child) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        let group = Pid::from_raw(child.id() as i32);
        if let Err(e) = killpg(group, Signal::SIGKILL) {
            tracing::debug!(error = %e, "killpg failed, killing child only");
        }
    }
    let _ = child.kill();
}

fn drain<R: Read + Send + 'static>(stream: Option<R>) -> Option<JoinHandle<String>> {
    stream.map(|mut stream| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = stream.read_to_end(&mut buf);
            String::from_utf8_lossy(&buf).into_owned()
        })
    })
}

fn join_output(handle: Option<JoinHandle<String>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}
