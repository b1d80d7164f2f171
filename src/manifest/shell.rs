// src/manifest/shell.rs

//! Blocking shell command execution for manifest tasks.

use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result, bail};
use tracing::{debug, info};

/// Run `cmd` through the platform shell in `dir` and return its trimmed stdout.
///
/// A non-zero exit status is an error carrying the exit code and stderr.
/// Meant to run inside a blocking job, never on an async worker.
pub fn run_shell(cmd: &str, dir: &Path) -> Result<String> {
    info!(cmd = %cmd, ?dir, "running command");

    let mut command = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(cmd);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(cmd);
        c
    };
    command.current_dir(dir);

    let output = command
        .output()
        .with_context(|| format!("spawning process for command `{cmd}`"))?;

    let stderr = String::from_utf8_lossy(&output.stderr);
    for line in stderr.lines() {
        debug!(cmd = %cmd, "stderr: {}", line);
    }

    if !output.status.success() {
        bail!(
            "command `{}` exited with code {}: {}",
            cmd,
            output.status.code().unwrap_or(-1),
            stderr.trim()
        );
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}
