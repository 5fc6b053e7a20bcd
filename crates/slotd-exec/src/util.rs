use tokio::process::Command;

use slotd_model::Pid;

use crate::{ProcSpec, error::ExecError};

pub fn cmd_program(spec: &ProcSpec) -> Command {
    let mut cmd = Command::new(&spec.program);
    cmd.args(spec.args.iter().map(|s| s.as_str()));
    if let Some(cwd) = &spec.cwd {
        cmd.current_dir(cwd);
    }
    for (k, v) in &spec.env {
        cmd.env(k, v);
    }
    cmd.kill_on_drop(spec.kill_on_drop);
    cmd
}

pub fn spawn_error(program: &str, e: std::io::Error) -> ExecError {
    match e.kind() {
        std::io::ErrorKind::NotFound => ExecError::ProgramNotFound(program.to_string()),
        _ => ExecError::Spawn(format!("{program}: {e}")),
    }
}

#[cfg(target_family = "unix")]
pub fn send_sigterm(pid: Pid) -> Result<(), ExecError> {
    let rc = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
    if rc == 0 {
        return Ok(());
    }
    let err = std::io::Error::last_os_error();
    // ESRCH: the process is already gone, which is what the caller wanted.
    if err.raw_os_error() == Some(libc::ESRCH) {
        return Ok(());
    }
    Err(ExecError::Signal {
        pid,
        reason: err.to_string(),
    })
}

#[cfg(not(target_family = "unix"))]
pub fn send_sigterm(_pid: Pid) -> Result<(), ExecError> {
    Err(ExecError::Signal {
        pid: _pid,
        reason: "graceful termination is not supported on this platform".into(),
    })
}
