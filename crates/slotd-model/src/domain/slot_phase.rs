use serde::{Deserialize, Serialize};

/// Lifecycle phase of a slot.
///
/// `Starting` and `Stopping` are only held while the slot lock is taken by a
/// lifecycle operation; `Degraded` is a reporting state for a slot where only
/// one of the two processes is alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SlotPhase {
    #[default]
    Idle,
    Starting,
    Running,
    Degraded,
    Stopping,
}

impl SlotPhase {
    /// Phase implied by the liveness of the two processes.
    pub fn from_liveness(worker_alive: bool, companion_alive: bool) -> Self {
        match (worker_alive, companion_alive) {
            (true, true) => SlotPhase::Running,
            (false, false) => SlotPhase::Idle,
            _ => SlotPhase::Degraded,
        }
    }

    /// Returns `true` while a lifecycle operation is in flight.
    pub fn is_transitional(&self) -> bool {
        matches!(self, SlotPhase::Starting | SlotPhase::Stopping)
    }
}
