use serde::{Deserialize, Serialize};

use crate::{Pid, Role, SlotId};

/// Process that ended up running for a role after `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleOutcome {
    pub pid: Pid,
    /// `false` when an already running process was reused.
    pub spawned: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FailureKind {
    ScriptNotFound,
    Spawn,
    /// Spawned but died before the warm-up barrier elapsed.
    Exited,
    /// Not attempted because a process it depends on failed to launch.
    Skipped,
}

/// Per-role launch failure attached to a start report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchFailure {
    pub role: Role,
    pub kind: FailureKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
}

/// Result of a `start` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartReport {
    pub slot: SlotId,
    pub worker: Option<RoleOutcome>,
    pub companion: Option<RoleOutcome>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<LaunchFailure>,
}

impl StartReport {
    pub fn new(slot: SlotId) -> Self {
        Self {
            slot,
            worker: None,
            companion: None,
            failures: Vec::new(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.worker.is_some() && self.companion.is_some()
    }

    /// First failure caused by a missing script, if any.
    pub fn missing_script(&self) -> Option<&LaunchFailure> {
        self.failures
            .iter()
            .find(|f| f.kind == FailureKind::ScriptNotFound)
    }
}

/// Result of a `stop` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopReport {
    pub slot: SlotId,
    /// Pid of the worker that was terminated, if one was alive.
    pub worker_pid: Option<Pid>,
    /// Pid of the companion that was terminated, if one was alive.
    pub companion_pid: Option<Pid>,
    /// Roles that ignored the graceful signal and had to be killed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub forced: Vec<Role>,
    /// Cleanup script diagnostics left after filtering.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl StopReport {
    pub fn new(slot: SlotId) -> Self {
        Self {
            slot,
            worker_pid: None,
            companion_pid: None,
            forced: Vec::new(),
            warning: None,
        }
    }

    pub fn pid_mut(&mut self, role: Role) -> &mut Option<Pid> {
        match role {
            Role::Worker => &mut self.worker_pid,
            Role::Companion => &mut self.companion_pid,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_report_complete_only_with_both_roles() {
        let mut report = StartReport::new(SlotId::new(1));
        assert!(!report.is_complete());

        report.worker = Some(RoleOutcome { pid: 10, spawned: true });
        report.companion = Some(RoleOutcome { pid: 11, spawned: false });
        assert!(report.is_complete());
    }

    #[test]
    fn missing_script_lookup() {
        let mut report = StartReport::new(SlotId::new(3));
        report.failures.push(LaunchFailure {
            role: Role::Worker,
            kind: FailureKind::ScriptNotFound,
            message: "worker script not found".into(),
            script: Some("galaxy_3.js".into()),
        });

        let failure = report.missing_script().expect("missing script recorded");
        assert_eq!(failure.role, Role::Worker);
        assert_eq!(failure.script.as_deref(), Some("galaxy_3.js"));
    }

    #[test]
    fn stop_report_skips_empty_fields() {
        let report = StopReport::new(SlotId::new(1));
        let json = serde_json::to_string(&report).unwrap();
        assert!(!json.contains("warning"));
        assert!(!json.contains("forced"));
        assert!(json.contains(r#""workerPid":null"#));
    }
}
