//! Execution of gcloud commands

use crate::error::{CliError, Result};
use crate::gcp::GcloudCommand;
use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

/// Captured result of a finished command
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Runs gcloud commands (swapped for a recorder in tests)
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run to completion; a non-zero exit is an error
    async fn run(&self, command: &GcloudCommand) -> Result<CommandOutput>;
}

/// Spawns the real gcloud executable
pub struct ProcessRunner {
    program: String,
}

impl ProcessRunner {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, command: &GcloudCommand) -> Result<CommandOutput> {
        let rendered = command.to_shell(&self.program);
        info!(command = %rendered, "Running gcloud");

        let output = Command::new(&self.program)
            .args(&command.args)
            .arg("--quiet")
            .output()
            .await
            .map_err(|e| {
                CliError::config(format!("Could not start '{}': {}. Is the Google Cloud SDK installed?", self.program, e))
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        debug!(status = %output.status, "gcloud finished");

        if !output.status.success() {
            return Err(CliError::Gcloud {
                command: rendered,
                status: output.status.to_string(),
                stderr: stderr.trim().to_string(),
            });
        }

        Ok(CommandOutput { stdout, stderr })
    }
}
