use slotd_core::{ConfigError, CoreError};
use slotd_model::StartReport;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid slot: {0}")]
    InvalidSlot(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// A start that could not find a required script. The partial report
    /// still says which processes did come up.
    #[error("script not found for slot {}", .0.slot)]
    ScriptNotFound(Box<StartReport>),

    #[error("launch failed for slot {}", .0.slot)]
    LaunchFailed(Box<StartReport>),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            e @ CoreError::InvalidSlot { .. } => ApiError::InvalidSlot(e.to_string()),
            CoreError::Config(e) => ApiError::Config(e),
            e @ CoreError::InvalidConfig(_) => ApiError::Internal(e.to_string()),
        }
    }
}

impl ApiError {
    /// Classify a start report that did not bring both processes up.
    pub fn from_start_report(report: StartReport) -> Self {
        if report.missing_script().is_some() {
            ApiError::ScriptNotFound(Box::new(report))
        } else {
            ApiError::LaunchFailed(Box::new(report))
        }
    }
}

#[cfg(feature = "http")]
mod response {
    use axum::{
        Json,
        http::StatusCode,
        response::{IntoResponse, Response},
    };
    use serde::Serialize;
    use slotd_model::StartReport;

    use super::ApiError;

    #[derive(Serialize)]
    struct ErrorBody<'a> {
        error: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        field: Option<&'a str>,
    }

    #[derive(Serialize)]
    struct ReportBody<'a> {
        error: String,
        #[serde(flatten)]
        report: &'a StartReport,
    }

    impl ApiError {
        pub fn status_code(&self) -> StatusCode {
            match self {
                ApiError::InvalidSlot(_) | ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
                ApiError::ScriptNotFound(_) => StatusCode::NOT_FOUND,
                ApiError::Config(_) | ApiError::LaunchFailed(_) | ApiError::Internal(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            }
        }
    }

    impl IntoResponse for ApiError {
        fn into_response(self) -> Response {
            let status = self.status_code();
            if status.is_server_error() {
                tracing::error!(error = %self, "request failed");
            } else {
                tracing::debug!(error = %self, "request rejected");
            }

            let error = self.to_string();
            match &self {
                ApiError::ScriptNotFound(report) | ApiError::LaunchFailed(report) => {
                    let body = ReportBody {
                        error,
                        report: report.as_ref(),
                    };
                    (status, Json(body)).into_response()
                }
                ApiError::Config(e) => (
                    status,
                    Json(ErrorBody {
                        error,
                        field: e.field(),
                    }),
                )
                    .into_response(),
                _ => (status, Json(ErrorBody { error, field: None })).into_response(),
            }
        }
    }
}
