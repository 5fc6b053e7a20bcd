use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    response::IntoResponse,
    routing::{get, post},
};
use serde::Serialize;
use slotd_model::{RawFields, SlotId};
use tower_http::cors::CorsLayer;
use tracing::debug;

use crate::{error::ApiError, handler::ApiHandler};

/// HTTP API service builder.
pub struct HttpApi<H> {
    handler: Arc<H>,
}

impl<H> HttpApi<H>
where
    H: ApiHandler,
{
    pub fn new(handler: Arc<H>) -> Self {
        Self { handler }
    }

    /// Build axum router with mounted endpoints.
    ///
    /// Routes:
    /// - POST /start/{slot_id} - write config, start companion then worker
    /// - POST /update/{slot_id} - rewrite config only
    /// - POST /stop/{slot_id} - terminate both processes, run cleanup
    /// - GET /status - every slot
    /// - GET /status/{slot_id} - one slot
    /// - GET /health - liveness of the control plane itself
    pub fn router(self) -> Router {
        Router::new()
            .route("/start/{slot_id}", post(start_slot::<H>))
            .route("/update/{slot_id}", post(update_slot::<H>))
            .route("/stop/{slot_id}", post(stop_slot::<H>))
            .route("/status", get(all_status::<H>))
            .route("/status/{slot_id}", get(slot_status::<H>))
            .route("/health", get(health))
            .layer(CorsLayer::permissive())
            .with_state(self.handler)
    }
}

// ============================================================================
// Response types
// ============================================================================

/// Human-readable message alongside the structured body.
#[derive(Debug, Serialize)]
struct Reply<T> {
    message: String,
    #[serde(flatten)]
    body: T,
}

#[derive(Debug, Serialize)]
struct SlotRef {
    slot: SlotId,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /start/{slot_id}
async fn start_slot<H>(
    State(handler): State<Arc<H>>,
    Path(raw): Path<String>,
    body: Result<Json<RawFields>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
    H: ApiHandler,
{
    let slot = parse_slot(&raw)?;
    let fields = parse_body(body)?;
    debug!(%slot, fields = fields.len(), "starting slot");

    let report = handler.start_slot(slot, fields).await?;
    if !report.is_complete() {
        return Err(ApiError::from_start_report(report));
    }

    Ok(Json(Reply {
        message: format!("slot {slot} started"),
        body: report,
    }))
}

/// POST /update/{slot_id}
async fn update_slot<H>(
    State(handler): State<Arc<H>>,
    Path(raw): Path<String>,
    body: Result<Json<RawFields>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
    H: ApiHandler,
{
    let slot = parse_slot(&raw)?;
    let fields = parse_body(body)?;
    debug!(%slot, "updating slot config");

    handler.update_slot(slot, fields).await?;
    Ok(Json(Reply {
        message: format!("slot {slot} config updated"),
        body: SlotRef { slot },
    }))
}

/// POST /stop/{slot_id}
async fn stop_slot<H>(
    State(handler): State<Arc<H>>,
    Path(raw): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    H: ApiHandler,
{
    let slot = parse_slot(&raw)?;
    debug!(%slot, "stopping slot");

    let report = handler.stop_slot(slot).await?;
    let message = match &report.warning {
        Some(_) => format!("slot {slot} stopped with cleanup warnings"),
        None => format!("slot {slot} stopped"),
    };
    Ok(Json(Reply {
        message,
        body: report,
    }))
}

/// GET /status
async fn all_status<H>(State(handler): State<Arc<H>>) -> Result<impl IntoResponse, ApiError>
where
    H: ApiHandler,
{
    let slots = handler.all_status().await?;
    Ok(Json(slots))
}

/// GET /status/{slot_id}
async fn slot_status<H>(
    State(handler): State<Arc<H>>,
    Path(raw): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    H: ApiHandler,
{
    let slot = parse_slot(&raw)?;
    let status = handler.slot_status(slot).await?;
    Ok(Json(status))
}

/// GET /health
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Parse a slot id path segment. Range checks happen in the supervisor.
fn parse_slot(raw: &str) -> Result<SlotId, ApiError> {
    raw.trim()
        .parse::<u32>()
        .map(SlotId::new)
        .map_err(|_| ApiError::InvalidSlot(format!("'{raw}' is not a slot number")))
}

fn parse_body(body: Result<Json<RawFields>, JsonRejection>) -> Result<RawFields, ApiError> {
    body.map(|Json(fields)| fields)
        .map_err(|e| ApiError::InvalidRequest(e.body_text()))
}
