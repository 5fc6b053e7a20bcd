use std::{process::Stdio, time::Duration};

use tracing::{debug, trace};

use crate::{
    ProcSpec,
    error::{ExecError, ExecResult},
    util::{cmd_program, spawn_error},
};

/// What to do with a helper script's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptOutput {
    /// Keep stderr for inspection; stdout is discarded.
    Capture,
    /// Discard everything.
    Discard,
}

#[derive(Debug, Clone, Default)]
pub struct ScriptOutcome {
    /// Exit code; `None` if terminated by a signal.
    pub code: Option<i32>,
    pub success: bool,
    pub stderr: String,
}

/// Run a short-lived script to completion, killing it after `timeout`.
pub async fn run_script(
    spec: &ProcSpec,
    output: ScriptOutput,
    timeout: Duration,
) -> ExecResult<ScriptOutcome> {
    if spec.program.trim().is_empty() {
        return Err(ExecError::MissingProgram);
    }
    trace!(program = %spec.program, args = ?spec.args, ?output, "run script");

    let mut cmd = cmd_program(spec);
    cmd.kill_on_drop(true);
    cmd.stdin(Stdio::null()).stdout(Stdio::null());
    cmd.stderr(match output {
        ScriptOutput::Capture => Stdio::piped(),
        ScriptOutput::Discard => Stdio::null(),
    });

    let child = cmd.spawn().map_err(|e| spawn_error(&spec.program, e))?;
    let out = tokio::time::timeout(timeout, child.wait_with_output())
        .await
        .map_err(|_| ExecError::Timeout {
            ms: timeout.as_millis(),
        })??;

    let outcome = ScriptOutcome {
        code: out.status.code(),
        success: out.status.success(),
        stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
    };
    debug!(program = %spec.program, code = ?outcome.code, "script finished");
    Ok(outcome)
}
