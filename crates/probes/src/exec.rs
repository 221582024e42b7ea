//! Subprocess execution with captured output.
//!
//! Foreground runs capture stdout and stderr on reader threads while the
//! parent polls `try_wait` against a deadline; a child that outlives its
//! deadline is killed and reported as timed out. Detached runs spawn with
//! null stdio and return immediately with the child pid.

use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::debug;

const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(25);

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("command cannot be empty")]
    EmptyCommand,
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
}

/// One command execution request.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub command: Vec<String>,
    pub cwd: PathBuf,
    pub detached: bool,
    pub timeout: Duration,
}

/// What this runner can actually enforce and observe.
#[derive(Debug, Clone, Copy)]
pub struct RunCapabilities {
    pub pid: bool,
    pub timeout: bool,
    pub separate_stderr: bool,
}

impl RunCapabilities {
    const NATIVE: Self = Self {
        pid: true,
        timeout: true,
        separate_stderr: true,
    };
}

/// Outcome of one execution.
#[derive(Debug)]
pub struct RunOutcome {
    pub completed: bool,
    pub timed_out: bool,
    pub exit_code: Option<i32>,
    pub pid: Option<u32>,
    pub stdout: String,
    pub stderr: String,
    pub capabilities: RunCapabilities,
}

fn spawn_reader<R: Read + Send + 'static>(stream: Option<R>) -> Option<JoinHandle<Vec<u8>>> {
    stream.map(|mut handle| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = handle.read_to_end(&mut buf);
            buf
        })
    })
}

fn join_reader(handle: Option<JoinHandle<Vec<u8>>>) -> String {
    match handle {
        Some(handle) => match handle.join() {
            Ok(buf) => String::from_utf8_lossy(&buf).into_owned(),
            Err(_) => String::new(),
        },
        None => String::new(),
    }
}

fn reap_in_background(mut child: Child) {
    thread::spawn(move || {
        let _ = child.wait();
    });
}

/// Runs `request.command`, returning `Err` only when the child could not be
/// launched at all.
pub fn run_command(request: &RunRequest) -> Result<RunOutcome, ExecError> {
    let (program, args) = request
        .command
        .split_first()
        .ok_or(ExecError::EmptyCommand)?;

    if request.detached {
        let child = Command::new(program)
            .args(args)
            .current_dir(&request.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| ExecError::Spawn {
                program: program.clone(),
                source,
            })?;

        let pid = child.id();
        debug!(program = %program, pid, "detached child launched");
        reap_in_background(child);

        return Ok(RunOutcome {
            completed: false,
            timed_out: false,
            exit_code: None,
            pid: Some(pid),
            stdout: String::new(),
            stderr: String::new(),
            capabilities: RunCapabilities::NATIVE,
        });
    }

    let mut child = Command::new(program)
        .args(args)
        .current_dir(&request.cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| ExecError::Spawn {
            program: program.clone(),
            source,
        })?;

    let pid = child.id();
    let stdout_reader = spawn_reader(child.stdout.take());
    let stderr_reader = spawn_reader(child.stderr.take());

    let start = Instant::now();
    let mut timed_out = false;
    let exit_status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break Some(status),
            Ok(None) => {
                if start.elapsed() >= request.timeout {
                    timed_out = true;
                    let _ = child.kill();
                    let _ = child.wait();
                    break None;
                }
                thread::sleep(WAIT_POLL_INTERVAL);
            }
            Err(_) => {
                let _ = child.kill();
                let _ = child.wait();
                break None;
            }
        }
    };

    let stdout = join_reader(stdout_reader);
    let stderr = join_reader(stderr_reader);

    debug!(
        program = %program,
        pid,
        timed_out,
        exit_code = ?exit_status.and_then(|s| s.code()),
        duration_ms = start.elapsed().as_millis() as u64,
        "foreground child finished"
    );

    Ok(RunOutcome {
        completed: exit_status.is_some(),
        timed_out,
        exit_code: exit_status.and_then(|status| status.code()),
        pid: Some(pid),
        stdout,
        stderr,
        capabilities: RunCapabilities::NATIVE,
    })
}
