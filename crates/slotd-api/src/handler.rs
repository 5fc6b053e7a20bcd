use async_trait::async_trait;
use slotd_model::{RawFields, SlotId, SlotStatus, StartReport, StopReport};

use crate::error::ApiError;

/// Slot lifecycle API handler.
///
/// Abstracts the backend so the transport can be driven by the provided
/// `SupervisorApiAdapter` or by a custom implementation (auth, audit, fakes in tests).
#[async_trait]
pub trait ApiHandler: Send + Sync + 'static {
    /// Write the slot config and bring both processes up.
    async fn start_slot(&self, slot: SlotId, fields: RawFields) -> Result<StartReport, ApiError>;

    /// Rewrite the slot config only.
    async fn update_slot(&self, slot: SlotId, fields: RawFields) -> Result<(), ApiError>;

    /// Terminate both processes and run the cleanup script.
    async fn stop_slot(&self, slot: SlotId) -> Result<StopReport, ApiError>;

    async fn slot_status(&self, slot: SlotId) -> Result<SlotStatus, ApiError>;

    /// Status of every slot in slot order.
    async fn all_status(&self) -> Result<Vec<SlotStatus>, ApiError>;
}
