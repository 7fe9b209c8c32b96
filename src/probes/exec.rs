//! External tool invocation: spawn, capture output, enforce a hard timeout.
//!
//! Every probe goes through `run_tool` so timeout and process-cleanup policy
//! live in exactly one place. A timed-out child is killed, never left hanging.

use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("`{program}` not found on PATH (is it installed?)")]
    NotFound { program: String },

    #[error("failed to launch `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{program}` exceeded the {}s timeout and was killed", timeout.as_secs())]
    Timeout { program: String, timeout: Duration },
}

/// Captured output of a finished tool invocation. A nonzero exit status is
/// not a `ToolError`; callers decide what stderr means for their probe.
#[derive(Debug)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub elapsed: Duration,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Stdout and stderr merged for diagnostic text, trimmed.
    pub fn combined(&self) -> String {
        let mut text = self.stdout.trim().to_string();
        let err = self.stderr.trim();
        if !err.is_empty() {
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(err);
        }
        text
    }
}

/// Run `program` with `args`, capturing output, bounded by `timeout`.
pub async fn run_tool(
    program: &str,
    args: &[&str],
    timeout: Duration,
) -> Result<ToolOutput, ToolError> {
    let start = Instant::now();
    debug!(program, ?args, timeout_secs = timeout.as_secs(), "spawning tool");

    let mut command = tokio::process::Command::new(program);
    command
        .args(args)
        .stdin(std::process::Stdio::null())
        .kill_on_drop(true);

    // Dropping the output future on timeout kills the child via kill_on_drop.
    let result = tokio::time::timeout(timeout, command.output()).await;

    let output = match result {
        Ok(Ok(output)) => output,
        Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ToolError::NotFound {
                program: program.to_string(),
            });
        }
        Ok(Err(e)) => {
            return Err(ToolError::Spawn {
                program: program.to_string(),
                source: e,
            });
        }
        Err(_) => {
            return Err(ToolError::Timeout {
                program: program.to_string(),
                timeout,
            });
        }
    };

    let elapsed = start.elapsed();
    debug!(
        program,
        exit_code = ?output.status.code(),
        elapsed_ms = elapsed.as_millis() as u64,
        "tool finished"
    );

    Ok(ToolOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        exit_code: output.status.code(),
        elapsed,
    })
}

/// Check whether a tool responds to `--version`. Used to pick between
/// equivalent CLIs (e.g. `speedtest` vs `speedtest-cli`).
pub async fn tool_available(program: &str) -> bool {
    matches!(
        run_tool(program, &["--version"], Duration::from_secs(5)).await,
        Ok(_)
    )
}
