//! External tool invocation

use std::ffi::{OsStr, OsString};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, warn};

use super::error::PackError;
use super::Result;

/// Captured result of one external command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// Exit code, `None` if the process was terminated by a signal
    pub exit_code: Option<i32>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Short human-readable reason for a failed command
    pub fn failure_message(&self) -> String {
        let status = match self.exit_code {
            Some(code) => format!("exit code {}", code),
            None => "terminated by signal".to_string(),
        };
        let detail = if self.stderr.trim().is_empty() {
            self.stdout.trim()
        } else {
            self.stderr.trim()
        };
        if detail.is_empty() {
            status
        } else {
            format!("{}: {}", status, detail)
        }
    }
}

/// Runs external commands and captures their output
pub trait Runner {
    /// Run `program` with `args` to completion.
    ///
    /// Returns `Err` only when the command could not be run at all; a non-zero
    /// exit is reported through [`CommandOutput::exit_code`].
    fn invoke(&self, program: &OsStr, args: &[OsString]) -> Result<CommandOutput>;
}

/// Runs commands on the local machine
pub struct SystemRunner {
    timeout: Option<Duration>,
}

impl SystemRunner {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    async fn run(&self, program: &OsStr, args: &[OsString]) -> Result<CommandOutput> {
        let tool = program.to_string_lossy().to_string();
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| PackError::FatalToolFailure {
                tool: tool.clone(),
                message: format!("failed to start: {}", e),
            })?;

        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| {
                    warn!("{} timed out after {:?}", tool, limit);
                    PackError::FatalToolFailure {
                        tool: tool.clone(),
                        message: format!("timed out after {} seconds", limit.as_secs()),
                    }
                })??,
            None => child.wait_with_output().await?,
        };

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code(),
        })
    }
}

impl Runner for SystemRunner {
    fn invoke(&self, program: &OsStr, args: &[OsString]) -> Result<CommandOutput> {
        debug!("Running {:?} {:?}", program, args);
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        runtime.block_on(self.run(program, args))
    }
}
