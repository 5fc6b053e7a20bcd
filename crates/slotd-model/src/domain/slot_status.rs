use serde::{Deserialize, Serialize};

use crate::{Pid, SlotId, SlotPhase};

/// Observed state of a slot's processes.
///
/// Pids are only reported for processes that passed the liveness check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotStatus {
    pub slot: SlotId,
    pub phase: SlotPhase,
    pub worker_running: bool,
    pub companion_running: bool,
    pub worker_pid: Option<Pid>,
    pub companion_pid: Option<Pid>,
}

impl SlotStatus {
    pub fn new(slot: SlotId, worker_pid: Option<Pid>, companion_pid: Option<Pid>) -> Self {
        Self {
            slot,
            phase: SlotPhase::from_liveness(worker_pid.is_some(), companion_pid.is_some()),
            worker_running: worker_pid.is_some(),
            companion_running: companion_pid.is_some(),
            worker_pid,
            companion_pid,
        }
    }
}
