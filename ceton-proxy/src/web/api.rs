//! REST endpoints for stream allocation and tuner status.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use ceton_protocol::{ApiErrorBody, StreamGrant, StreamRequestBody, TunerStatus};

use crate::tuner::{AllocateError, AllocationOutcome, ReleaseError};
use crate::web::state::WebState;

/// Server statistics.
#[derive(Debug, Serialize, Deserialize)]
pub struct ServerStats {
    pub total_tuners: usize,
    pub active_tuners: usize,
    pub stop_pending_tuners: usize,
    pub external_tuners: usize,
    pub uptime_seconds: u64,
}

fn error_response(status: StatusCode, error: impl ToString) -> Response {
    (
        status,
        Json(ApiErrorBody {
            success: false,
            error: error.to_string(),
        }),
    )
        .into_response()
}

/// Allocate a tuner and tune it to the requested channel.
pub async fn allocate_stream(
    State(web_state): State<Arc<WebState>>,
    Json(payload): Json<StreamRequestBody>,
) -> Response {
    match web_state
        .allocator
        .find_and_allocate(payload.channel, payload.context)
        .await
    {
        Ok(AllocationOutcome::Allocated(allocation)) => Json(StreamGrant {
            tuner: allocation.tuner,
            locator: allocation.locator,
        })
        .into_response(),
        Ok(AllocationOutcome::NoTunerAvailable) => error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "All tuners already in use",
        ),
        Err(e @ AllocateError::Dispatch { .. }) => error_response(StatusCode::BAD_GATEWAY, e),
    }
}

/// Release a tuner previously handed out by [`allocate_stream`].
pub async fn release_stream(
    State(web_state): State<Arc<WebState>>,
    Path(tuner): Path<usize>,
) -> Response {
    match web_state.allocator.release(tuner).await {
        Ok(()) => Json(json!({ "success": true, "tuner": tuner })).into_response(),
        Err(e @ ReleaseError::UnknownTuner(_)) => error_response(StatusCode::NOT_FOUND, e),
        Err(e @ ReleaseError::NotAllocated { .. }) => error_response(StatusCode::CONFLICT, e),
        Err(e @ ReleaseError::Dispatch { .. }) => error_response(StatusCode::BAD_GATEWAY, e),
    }
}

/// Get every tuner with refreshed signal data.
pub async fn get_tuners(State(web_state): State<Arc<WebState>>) -> impl IntoResponse {
    web_state.allocator.refresh_signals().await;
    let tuners = web_state.allocator.snapshot().await;

    Json(json!({
        "success": true,
        "count": tuners.len(),
        "tuners": tuners,
    }))
}

/// Reconcile every non-active tuner with the hardware.
pub async fn reconcile_tuners(State(web_state): State<Arc<WebState>>) -> impl IntoResponse {
    web_state.allocator.reconcile().await;
    let tuners = web_state.allocator.snapshot().await;

    Json(json!({
        "success": true,
        "count": tuners.len(),
        "tuners": tuners,
    }))
}

pub async fn get_devices(State(web_state): State<Arc<WebState>>) -> impl IntoResponse {
    let devices = web_state.allocator.devices().await;
    Json(json!({
        "success": true,
        "count": devices.len(),
        "devices": devices,
    }))
}

pub async fn get_channels(State(web_state): State<Arc<WebState>>) -> impl IntoResponse {
    let channels = web_state.channels.collect().await;
    Json(json!({
        "success": true,
        "count": channels.len(),
        "channels": channels,
    }))
}

/// Get server statistics from the status table without probing hardware.
pub async fn get_stats(State(web_state): State<Arc<WebState>>) -> impl IntoResponse {
    let tuners = web_state.allocator.snapshot().await;
    let count = |status: TunerStatus| tuners.iter().filter(|t| t.status == status).count();

    Json(ServerStats {
        total_tuners: tuners.len(),
        active_tuners: count(TunerStatus::Active),
        stop_pending_tuners: count(TunerStatus::StopPending),
        external_tuners: count(TunerStatus::External),
        uptime_seconds: web_state.uptime_secs(),
    })
}
