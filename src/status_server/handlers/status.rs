//! JSON status handler.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use super::super::types::{StatusResponse, StatusState};

/// JSON status endpoint with the latest latency samples
pub async fn status_handler(State(state): State<StatusState>) -> Response {
    let response = StatusResponse {
        uptime_seconds: state.start_time.elapsed().as_secs_f64(),
        latency: state.metric.snapshot().report(),
    };

    (StatusCode::OK, Json(response)).into_response()
}
