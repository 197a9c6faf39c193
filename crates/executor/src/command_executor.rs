use serde::Serialize;
use std::io;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use toolbridge_core::expand_home;
use tracing::{debug, info, warn};

use crate::environment::ToolEnvironment;

/// Exit code reported when the child never produced a status of its own.
pub const TIMEOUT_EXIT_CODE: i32 = -1;

const DEFAULT_SHELL: &str = "/bin/sh";

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("Working directory does not exist: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("Timeout must be greater than zero")]
    InvalidTimeout,

    #[error("Failed to spawn shell: {0}")]
    Spawn(#[source] io::Error),

    #[error("I/O failure while running command: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    pub command_line: String,
    /// Raw directory as supplied by the caller; `~` is expanded at execution time.
    pub working_directory: String,
    pub environment: ToolEnvironment,
    pub timeout: Duration,
}

impl ExecutionRequest {
    pub fn new(
        command_line: impl Into<String>,
        working_directory: impl Into<String>,
        environment: ToolEnvironment,
        timeout: Duration,
    ) -> Self {
        Self {
            command_line: command_line.into(),
            working_directory: working_directory.into(),
            environment,
            timeout,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    pub command_line: String,
    pub working_directory: PathBuf,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
    pub elapsed: Duration,
}

impl ExecutionResult {
    /// Only a real zero exit status counts; a timeout never does.
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == 0
    }
}

/// Runs command lines through a shell with a deadline.
pub struct CommandExecutor {
    shell: PathBuf,
}

impl CommandExecutor {
    pub fn new() -> Self {
        Self::with_shell(DEFAULT_SHELL)
    }

    pub fn with_shell(shell: impl Into<PathBuf>) -> Self {
        Self {
            shell: shell.into(),
        }
    }

    pub async fn execute(
        &self,
        request: &ExecutionRequest,
    ) -> Result<ExecutionResult, ExecutorError> {
        if request.timeout.is_zero() {
            return Err(ExecutorError::InvalidTimeout);
        }

        let cwd = resolve_working_directory(&request.working_directory)?;

        info!(
            "Executing command: {} (cwd: {}, timeout: {}s)",
            request.command_line,
            cwd.display(),
            request.timeout.as_secs()
        );

        let mut cmd = Command::new(&self.shell);
        cmd.arg("-c")
            .arg(&request.command_line)
            .current_dir(&cwd)
            .env_clear()
            .envs(request.environment.iter())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Own session so a timeout can take down the shell and everything it started.
        #[cfg(unix)]
        {
            unsafe {
                cmd.pre_exec(|| {
                    libc::setsid();
                    Ok(())
                });
            }
        }

        let started = Instant::now();
        let mut child = cmd.spawn().map_err(ExecutorError::Spawn)?;
        let pid = child.id();

        let mut stdout_task = tokio::spawn(read_stream(child.stdout.take()));
        let mut stderr_task = tokio::spawn(read_stream(child.stderr.take()));

        let outcome = timeout(request.timeout, async {
            let status = child.wait().await?;
            let stdout = join_reader(&mut stdout_task).await?;
            let stderr = join_reader(&mut stderr_task).await?;
            Ok::<_, io::Error>((status, stdout, stderr))
        })
        .await;

        match outcome {
            Ok(Ok((status, stdout, stderr))) => {
                let exit_code = exit_code(status);
                debug!(
                    "Command finished with exit code {} in {:?}",
                    exit_code,
                    started.elapsed()
                );
                Ok(ExecutionResult {
                    command_line: request.command_line.clone(),
                    working_directory: cwd,
                    exit_code,
                    stdout: String::from_utf8_lossy(&stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&stderr).into_owned(),
                    timed_out: false,
                    elapsed: started.elapsed(),
                })
            }
            Ok(Err(e)) => {
                warn!("I/O failure while running command: {}", e);
                terminate(&mut child, pid).await;
                stdout_task.abort();
                stderr_task.abort();
                Err(ExecutorError::Io(e))
            }
            Err(_) => {
                warn!(
                    "Command timed out after {}s: {}",
                    request.timeout.as_secs(),
                    request.command_line
                );
                terminate(&mut child, pid).await;
                stdout_task.abort();
                stderr_task.abort();
                Ok(ExecutionResult {
                    command_line: request.command_line.clone(),
                    working_directory: cwd,
                    exit_code: TIMEOUT_EXIT_CODE,
                    stdout: String::new(),
                    stderr: String::new(),
                    timed_out: true,
                    elapsed: started.elapsed(),
                })
            }
        }
    }
}

impl Default for CommandExecutor {
    fn default() -> Self {
        Self::new()
    }
}

/// Expands `~`, makes the path absolute and requires an existing directory.
pub fn resolve_working_directory(raw: &str) -> Result<PathBuf, ExecutorError> {
    let expanded = expand_home(raw);
    let absolute = if expanded.is_absolute() {
        expanded
    } else {
        std::env::current_dir()?.join(expanded)
    };

    match std::fs::canonicalize(&absolute) {
        Ok(path) if path.is_dir() => Ok(path),
        _ => Err(ExecutorError::DirectoryNotFound(absolute)),
    }
}

async fn read_stream<R>(reader: Option<R>) -> io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    if let Some(mut reader) = reader {
        reader.read_to_end(&mut buf).await?;
    }
    Ok(buf)
}

async fn join_reader(handle: &mut JoinHandle<io::Result<Vec<u8>>>) -> io::Result<Vec<u8>> {
    match handle.await {
        Ok(result) => result,
        Err(join_err) => Err(io::Error::new(io::ErrorKind::Other, join_err)),
    }
}

/// Kills the child's process group, then the child itself, and reaps it.
async fn terminate(child: &mut Child, pid: Option<u32>) {
    #[cfg(unix)]
    if let Some(pid) = pid {
        unsafe {
            libc::killpg(pid as libc::pid_t, libc::SIGKILL);
        }
    }
    #[cfg(not(unix))]
    let _ = pid;

    if let Err(e) = child.start_kill() {
        debug!("Child already gone before kill: {}", e);
    }
    if let Err(e) = child.wait().await {
        warn!("Failed to reap killed child: {}", e);
    }
}

fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return -signal;
        }
    }

    TIMEOUT_EXIT_CODE
}
