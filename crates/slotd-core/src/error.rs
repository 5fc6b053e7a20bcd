use std::path::PathBuf;

use thiserror::Error;

use slotd_exec::ExecError;
use slotd_model::{FailureKind, LaunchFailure, Role, SlotId};

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid slot {slot}: expected 1..={max}")]
    InvalidSlot { slot: SlotId, max: u32 },

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid supervisor config: {0}")]
    InvalidConfig(String),
}

/// Failures while turning a request payload into a slot config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing field: {0}")]
    MissingField(String),

    #[error("field {field} is not an integer: {value}")]
    InvalidNumber { field: String, value: String },

    #[error("field {field} has an unsupported value: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    /// Request field the error refers to, if any.
    pub fn field(&self) -> Option<&str> {
        match self {
            ConfigError::MissingField(field)
            | ConfigError::InvalidNumber { field, .. }
            | ConfigError::InvalidValue { field, .. } => Some(field),
            ConfigError::Io { .. } => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("{role} script not found: {}", path.display())]
    ScriptNotFound { role: Role, path: PathBuf },

    #[error("failed to spawn {role}: {source}")]
    Spawn {
        role: Role,
        #[source]
        source: ExecError,
    },

    #[error("{role} exited during warm-up: {status}")]
    ExitedDuringWarmup { role: Role, status: String },
}

impl LaunchError {
    pub fn role(&self) -> Role {
        match self {
            LaunchError::ScriptNotFound { role, .. }
            | LaunchError::Spawn { role, .. }
            | LaunchError::ExitedDuringWarmup { role, .. } => *role,
        }
    }

    /// Structured form attached to a start report.
    pub fn to_failure(&self) -> LaunchFailure {
        let (kind, script) = match self {
            LaunchError::ScriptNotFound { path, .. } => {
                (FailureKind::ScriptNotFound, Some(path.display().to_string()))
            }
            LaunchError::Spawn { .. } => (FailureKind::Spawn, None),
            LaunchError::ExitedDuringWarmup { .. } => (FailureKind::Exited, None),
        };
        LaunchFailure {
            role: self.role(),
            kind,
            message: self.to_string(),
            script,
        }
    }
}
