use thiserror::Error;

use slotd_model::Pid;

pub type ExecResult<T> = Result<T, ExecError>;

#[derive(Error, Debug)]
pub enum ExecError {
    #[error("missing program")]
    MissingProgram,
    #[error("program not found: {0}")]
    ProgramNotFound(String),
    #[error("spawn failed: {0}")]
    Spawn(String),
    #[error("signal to pid {pid} failed: {reason}")]
    Signal { pid: Pid, reason: String },
    #[error("timed out after {ms}ms")]
    Timeout { ms: u128 },
    #[error("io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for ExecError {
    fn from(e: std::io::Error) -> Self {
        ExecError::Io(e.to_string())
    }
}
