//! Utilities for the deployer commands

use std::process::{Command, Stdio};

use tracing::debug;

use crate::errors::DeployError;

/// Execute a command with its output streamed to the terminal, failing on a
/// non-zero exit status
pub fn run_command(mut cmd: Command) -> Result<(), DeployError> {
    cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
    debug!("running {:?}", cmd);

    let status = cmd.status().map_err(|e| DeployError::Build(e.to_string()))?;
    if status.success() {
        Ok(())
    } else {
        Err(DeployError::Build(format!("command failed with status: {}", status)))
    }
}
