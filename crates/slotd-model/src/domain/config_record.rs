use serde::{Deserialize, Serialize};

/// Per-slot configuration snapshot read by the worker process.
///
/// Key names are fixed and do not carry the slot number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigRecord {
    /// Reaction-condition identifier.
    #[serde(rename = "RC")]
    pub rc: String,
    #[serde(rename = "AttackTime")]
    pub attack_time: i64,
    #[serde(rename = "DefenceTime")]
    pub defence_time: i64,
    #[serde(rename = "planetName")]
    pub planet_name: String,
    /// Polling interval.
    pub interval: i64,
    /// Rival identifiers in request order.
    pub rival: Vec<String>,
}
