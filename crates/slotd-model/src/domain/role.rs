use std::fmt;

use serde::{Deserialize, Serialize};

/// Which of the two per-slot processes a handle belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Role {
    /// Primary process doing the actual work.
    Worker,
    /// Real-time channel the worker connects to; must be up before the worker.
    Companion,
}

impl Role {
    /// Both roles in teardown order: the worker goes first so it never outlives its channel.
    pub const TEARDOWN: [Role; 2] = [Role::Worker, Role::Companion];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Worker => "worker",
            Role::Companion => "companion",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
