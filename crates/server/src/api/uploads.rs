//! Upload orchestrator API handlers.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use chunkline_core::{DryRunReport, OrchestratorError, StatusSnapshot, UploadRequest};

use crate::state::AppState;

/// `job_id` value that cancels every job after the current one.
const CANCEL_REMAINING: &str = "remaining";

// ============================================================================
// Request/Response Types
// ============================================================================

/// Start a batch of uploads
#[derive(Debug, Deserialize)]
pub struct StartUploadsRequest {
    pub uploads: Vec<UploadRequest>,
    /// Report what would happen without uploading or touching the status
    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Debug, Serialize)]
pub struct StartUploadsResponse {
    pub message: String,
    /// Assigned job ids in submission order
    pub job_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct DryRunResponse {
    pub dry_run: bool,
    pub report: DryRunReport,
}

/// Cancel request. No body cancels the whole batch.
#[derive(Debug, Default, Deserialize)]
pub struct CancelRequest {
    /// `"remaining"` or a queued job id
    #[serde(default)]
    pub job_id: Option<String>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Simple message response
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
}

fn message(message: impl Into<String>) -> Json<MessageResponse> {
    Json(MessageResponse {
        message: message.into(),
    })
}

fn orchestrator_error(e: OrchestratorError) -> ApiError {
    let status = match e {
        OrchestratorError::EmptyBatch => StatusCode::BAD_REQUEST,
        OrchestratorError::AlreadyActive | OrchestratorError::StillActive => StatusCode::CONFLICT,
    };
    api_error(status, e.to_string())
}

// ============================================================================
// Handlers
// ============================================================================

/// Start uploading a batch, or report on it when `dry_run` is set
pub async fn start_uploads(
    State(state): State<Arc<AppState>>,
    Json(request): Json<StartUploadsRequest>,
) -> Result<Response, ApiError> {
    let count = request.uploads.len();
    if request.dry_run {
        let report = state
            .orchestrator()
            .dry_run(request.uploads)
            .await
            .map_err(orchestrator_error)?;
        info!("Dry run of {} uploads", count);
        return Ok(Json(DryRunResponse {
            dry_run: true,
            report,
        })
        .into_response());
    }

    let job_ids = state
        .orchestrator()
        .start(request.uploads)
        .await
        .map_err(orchestrator_error)?;

    info!("Accepted batch of {} uploads", count);
    Ok((
        StatusCode::ACCEPTED,
        Json(StartUploadsResponse {
            message: format!("Started {} uploads", count),
            job_ids,
        }),
    )
        .into_response())
}

/// Get batch status
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusSnapshot> {
    Json(state.orchestrator().status().await)
}

/// Pause the batch
pub async fn pause(
    State(state): State<Arc<AppState>>,
) -> Result<Json<MessageResponse>, ApiError> {
    if state.orchestrator().pause().await {
        Ok(message("Uploads paused"))
    } else {
        Err(api_error(StatusCode::CONFLICT, "No uploads in progress"))
    }
}

/// Resume the batch
pub async fn resume(
    State(state): State<Arc<AppState>>,
) -> Result<Json<MessageResponse>, ApiError> {
    if state.orchestrator().resume().await {
        Ok(message("Uploads resumed"))
    } else {
        Err(api_error(StatusCode::CONFLICT, "No uploads in progress"))
    }
}

/// Cancel all, the remaining, or one queued upload
pub async fn cancel(
    State(state): State<Arc<AppState>>,
    request: Option<Json<CancelRequest>>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Json(request) = request.unwrap_or_default();
    let orchestrator = state.orchestrator();

    match request.job_id.as_deref() {
        None => {
            orchestrator.cancel_all().await;
            Ok(message("Cancelling all uploads"))
        }
        Some(CANCEL_REMAINING) => {
            orchestrator.cancel_remaining().await;
            Ok(message("Cancelling remaining uploads"))
        }
        Some(job_id) => {
            if orchestrator.cancel_by_id(job_id).await {
                Ok(message(format!("Cancelled upload {}", job_id)))
            } else {
                Err(api_error(
                    StatusCode::NOT_FOUND,
                    format!("Upload {} is not queued", job_id),
                ))
            }
        }
    }
}

/// Reset status to idle
pub async fn clear_status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .orchestrator()
        .clear_status()
        .await
        .map_err(orchestrator_error)?;
    Ok(message("Upload status cleared"))
}
