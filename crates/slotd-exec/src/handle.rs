use std::{process::ExitStatus, time::Duration};

use tokio::process::Child;
use tracing::{debug, trace, warn};

use slotd_model::Pid;

use crate::{
    ProcSpec,
    error::{ExecError, ExecResult},
    util::{cmd_program, send_sigterm, spawn_error},
};

/// How a process ended up terminated by [`ProcessHandle::shutdown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// It had exited before shutdown was requested.
    AlreadyExited,
    /// It exited within the grace period after SIGTERM.
    Graceful,
    /// It ignored SIGTERM and was killed.
    Forced,
}

/// Exclusive owner of one spawned child process.
#[derive(Debug)]
pub struct ProcessHandle {
    pid: Pid,
    program: String,
    child: Child,
    exit: Option<ExitStatus>,
}

impl ProcessHandle {
    /// Spawn `spec` with inherited stdio.
    pub fn spawn(spec: &ProcSpec) -> ExecResult<Self> {
        if spec.program.trim().is_empty() {
            return Err(ExecError::MissingProgram);
        }
        trace!(program = %spec.program, args = ?spec.args, "spawn");

        let child = cmd_program(spec)
            .spawn()
            .map_err(|e| spawn_error(&spec.program, e))?;
        let pid = child.id().ok_or_else(|| {
            ExecError::Spawn(format!("{}: exited before pid was read", spec.program))
        })?;

        debug!(pid, program = %spec.program, "process spawned");
        Ok(Self {
            pid,
            program: spec.program.clone(),
            child,
            exit: None,
        })
    }

    #[inline]
    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// Exit status, once observed.
    pub fn exit_status(&self) -> Option<ExitStatus> {
        self.exit
    }

    /// Non-blocking liveness check. Reaps the child if it has exited.
    ///
    /// A failed status query is treated as alive so that a live process is
    /// never replaced by a duplicate.
    pub fn is_alive(&mut self) -> bool {
        if self.exit.is_some() {
            return false;
        }
        match self.child.try_wait() {
            Ok(None) => true,
            Ok(Some(status)) => {
                debug!(pid = self.pid, program = %self.program, %status, "process has exited");
                self.exit = Some(status);
                false
            }
            Err(e) => {
                warn!(pid = self.pid, error = %e, "liveness query failed; assuming alive");
                true
            }
        }
    }

    /// Ask the process to exit (SIGTERM). Does not wait.
    pub fn request_termination(&self) -> ExecResult<()> {
        trace!(pid = self.pid, "sending SIGTERM");
        send_sigterm(self.pid)
    }

    /// Wait for exit for at most `timeout`. `Ok(None)` means still running.
    pub async fn wait_timeout(&mut self, timeout: Duration) -> ExecResult<Option<ExitStatus>> {
        if let Some(status) = self.exit {
            return Ok(Some(status));
        }
        match tokio::time::timeout(timeout, self.child.wait()).await {
            Ok(status) => {
                let status = status?;
                self.exit = Some(status);
                Ok(Some(status))
            }
            Err(_) => Ok(None),
        }
    }

    /// SIGKILL and reap.
    pub async fn force_kill(&mut self) -> ExecResult<()> {
        if self.exit.is_some() {
            return Ok(());
        }
        debug!(pid = self.pid, "force killing process");
        self.child.kill().await?;
        self.exit = self.child.try_wait()?;
        Ok(())
    }

    /// Graceful-then-forced termination bounded by `grace`.
    ///
    /// A failed SIGTERM goes straight to the force kill.
    pub async fn shutdown(&mut self, grace: Duration) -> ExecResult<Termination> {
        if !self.is_alive() {
            return Ok(Termination::AlreadyExited);
        }

        match self.request_termination() {
            Ok(()) => {
                if let Some(status) = self.wait_timeout(grace).await? {
                    debug!(pid = self.pid, %status, "process exited after SIGTERM");
                    return Ok(Termination::Graceful);
                }
                warn!(
                    pid = self.pid,
                    program = %self.program,
                    grace_ms = grace.as_millis() as u64,
                    "process ignored SIGTERM; escalating to SIGKILL"
                );
            }
            Err(e) => {
                warn!(pid = self.pid, error = %e, "SIGTERM failed; escalating to SIGKILL");
            }
        }

        self.force_kill().await?;
        Ok(Termination::Forced)
    }
}
