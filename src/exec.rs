//! Shell command execution
//!
//! All Slurm and kubectl interaction goes through [`CommandRunner`] so the
//! prober, lifecycle controller and dispatcher can be driven by fakes in tests.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, trace};

use crate::error::{Error, Result};

/// What happens to a command's stdout/stderr
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Streams {
    /// Collect output into [`CommandOutput`]
    Capture,
    /// Pass output straight through to this process's stdout/stderr
    Forward,
}

/// Exit code and (when captured) output of a finished command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` when the command was terminated by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Human readable reason for a non-successful completion
    pub fn failure_reason(&self) -> String {
        let status = match self.code {
            Some(code) => format!("exit status: {code}"),
            None => "terminated by signal".to_string(),
        };
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            status
        } else {
            format!("{status}: {stderr}")
        }
    }
}

/// Runs a single shell command line to completion
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Spawn errors surface as `Err`; a non-zero exit is a successful `Ok` with
    /// the code recorded in the output.
    async fn run(&self, command: &str, streams: Streams) -> std::io::Result<CommandOutput>;
}

/// Runs commands through `bash -c`
pub struct ShellRunner {
    shell: String,
    dry_run: bool,
}

impl ShellRunner {
    pub fn new() -> Self {
        Self {
            shell: "bash".to_string(),
            dry_run: false,
        }
    }

    /// In dry-run mode forwarded (mutating) commands are echoed and reported
    /// as successful without running. Captured queries still run.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(&self, command: &str, streams: Streams) -> std::io::Result<CommandOutput> {
        let mut cmd = Command::new(&self.shell);
        cmd.arg("-c").arg(command).stdin(Stdio::null());

        match streams {
            Streams::Capture => {
                trace!(shell = %self.shell, %command, "spawn (captured)");
                let output = cmd.output().await?;
                Ok(CommandOutput {
                    code: output.status.code(),
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                })
            }
            Streams::Forward if self.dry_run => {
                info!("[dry-run] would execute: {}", command);
                Ok(CommandOutput::ok(""))
            }
            Streams::Forward => {
                trace!(shell = %self.shell, %command, "spawn (forwarded)");
                let status = cmd
                    .stdout(Stdio::inherit())
                    .stderr(Stdio::inherit())
                    .status()
                    .await?;
                Ok(CommandOutput {
                    code: status.code(),
                    ..Default::default()
                })
            }
        }
    }
}

/// Echo, run with forwarded streams, and turn any failure into
/// [`Error::CommandError`] naming the command.
pub async fn execute(runner: &dyn CommandRunner, command: &str) -> Result<()> {
    println!("Executing command: {command}");
    info!("Executing command: {}", command);

    let output = runner
        .run(command, Streams::Forward)
        .await
        .map_err(|e| Error::command(command, e.to_string()))?;

    if !output.success() {
        debug!("Command '{}' failed: {}", command, output.failure_reason());
        return Err(Error::command(command, output.failure_reason()));
    }
    Ok(())
}
