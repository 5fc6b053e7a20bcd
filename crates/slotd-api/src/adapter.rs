use std::{future::Future, sync::Arc};

use async_trait::async_trait;
use slotd_core::{CoreError, Supervisor};
use slotd_model::{RawFields, SlotId, SlotStatus, StartReport, StopReport};
use tracing::error;

use crate::error::ApiError;
use crate::handler::ApiHandler;

/// Adapter that bridges [`Supervisor`] to [`ApiHandler`].
///
/// Every lifecycle call runs on its own task, so a client that disconnects
/// mid-request cannot abandon a slot halfway through a start or stop.
pub struct SupervisorApiAdapter {
    supervisor: Arc<Supervisor>,
}

impl SupervisorApiAdapter {
    pub fn new(supervisor: Arc<Supervisor>) -> Self {
        Self { supervisor }
    }

    async fn detached<T, F>(&self, op: F) -> Result<T, ApiError>
    where
        T: Send + 'static,
        F: Future<Output = Result<T, CoreError>> + Send + 'static,
    {
        match tokio::spawn(op).await {
            Ok(result) => result.map_err(ApiError::from),
            Err(e) => {
                error!(error = %e, "supervisor task aborted");
                Err(ApiError::Internal(format!("supervisor task aborted: {e}")))
            }
        }
    }
}

#[async_trait]
impl ApiHandler for SupervisorApiAdapter {
    async fn start_slot(&self, slot: SlotId, fields: RawFields) -> Result<StartReport, ApiError> {
        let supervisor = Arc::clone(&self.supervisor);
        self.detached(async move { supervisor.start(slot, &fields).await })
            .await
    }

    async fn update_slot(&self, slot: SlotId, fields: RawFields) -> Result<(), ApiError> {
        let supervisor = Arc::clone(&self.supervisor);
        self.detached(async move { supervisor.update(slot, &fields).await })
            .await
    }

    async fn stop_slot(&self, slot: SlotId) -> Result<StopReport, ApiError> {
        let supervisor = Arc::clone(&self.supervisor);
        self.detached(async move { supervisor.stop(slot).await })
            .await
    }

    async fn slot_status(&self, slot: SlotId) -> Result<SlotStatus, ApiError> {
        self.supervisor.status(slot).await.map_err(ApiError::from)
    }

    async fn all_status(&self) -> Result<Vec<SlotStatus>, ApiError> {
        Ok(self.supervisor.status_all().await)
    }
}
