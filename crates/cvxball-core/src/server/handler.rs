//! Axum request handlers for the transport verbs.

use super::TransportServer;
use crate::codec::WireRecord;
use crate::compute::Compute;
use crate::config::TransportConfig;
use crate::protocol::ErrorResponse;
use crate::TransportError;
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, warn};

/// Health check endpoint.
pub async fn handle_health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

/// `PUT /commands/{token}`: parse the IPC frame and store the record.
pub async fn handle_put<F: Compute>(
    State(server): State<Arc<TransportServer<F>>>,
    Path(token): Path<String>,
    body: Bytes,
) -> Response {
    match WireRecord::from_ipc_bytes(&body) {
        Ok(record) => {
            server.handle_put(&token, record);
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => error_response(&token, e),
    }
}

/// `GET /commands/{token}`: decode, compute, and return the result record.
pub async fn handle_get<F: Compute>(
    State(server): State<Arc<TransportServer<F>>>,
    Path(token): Path<String>,
) -> Response {
    let task_token = token.clone();
    let result = tokio::task::spawn_blocking(move || {
        server
            .handle_get(&task_token)
            .and_then(|record| record.to_ipc_bytes())
    })
    .await;

    match result {
        Ok(Ok(bytes)) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, TransportConfig::ARROW_MIME)],
            bytes,
        )
            .into_response(),
        Ok(Err(e)) => error_response(&token, e),
        Err(e) => error_response(
            &token,
            TransportError::ComputeFailed {
                message: format!("Compute task aborted: {}", e),
            },
        ),
    }
}

fn error_response(token: &str, err: TransportError) -> Response {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    if status.is_server_error() {
        error!("Request for command {} failed: {}", token, err);
    } else {
        warn!("Request for command {} rejected: {}", token, err);
    }

    (status, Json(ErrorResponse::from(&err))).into_response()
}
