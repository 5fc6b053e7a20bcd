mod slot_id;
pub use slot_id::SlotId;

mod role;
pub use role::Role;

mod slot_phase;
pub use slot_phase::SlotPhase;

mod config_record;
pub use config_record::ConfigRecord;

mod slot_status;
pub use slot_status::SlotStatus;

mod reports;
pub use reports::{FailureKind, LaunchFailure, RoleOutcome, StartReport, StopReport};

/// Request payload as received from the control UI.
///
/// Keys carry the slot number as a suffix (`RC1`, `AttackTime1`, ...).
/// Values are kept as raw JSON so numbers and strings are both accepted.
/// The sorted key order makes every derived argument vector reproducible.
pub type RawFields = std::collections::BTreeMap<String, serde_json::Value>;

/// Process identifier as reported by the OS.
pub type Pid = u32;
