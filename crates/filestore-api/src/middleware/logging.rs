//! Request logging middleware.
//!
//! Every request is logged through `tracing` and published to real-time
//! subscribers as a `log_entry` update.

use std::net::SocketAddr;
use std::time::Instant;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::header::{HeaderValue, USER_AGENT};
use axum::http::HeaderName;
use axum::middleware::Next;
use axum::response::Response;
use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use filestore_realtime::Update;
use filestore_realtime::update::LogEntry;

use crate::state::AppState;

/// Header carrying the request correlation ID.
pub static REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Logs method, path, status, and latency, then publishes the same record
/// to the hub. The request ID is echoed on the response.
pub async fn request_logging(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let started = Instant::now();
    let timestamp = Utc::now();

    let request_id = request
        .headers()
        .get(&REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        request.headers_mut().insert(REQUEST_ID_HEADER.clone(), value);
    }

    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let user_agent = request
        .headers()
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let remote_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string());

    let mut response = next.run(request).await;

    let entry = LogEntry {
        request_id,
        method,
        path,
        remote_addr,
        user_agent,
        status: response.status().as_u16(),
        latency_ms: started.elapsed().as_secs_f64() * 1000.0,
        timestamp,
    };

    info!(
        request_id = %entry.request_id,
        method = %entry.method,
        path = %entry.path,
        status = entry.status,
        latency_ms = entry.latency_ms,
        remote_addr = entry.remote_addr.as_deref().unwrap_or("-"),
        "HTTP request"
    );

    if let Ok(value) = HeaderValue::from_str(&entry.request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER.clone(), value);
    }

    match Update::log_entry(&entry) {
        Ok(update) => {
            if let Err(e) = state.hub.publish(update) {
                debug!(error = %e, "Request log not published");
            }
        }
        Err(e) => debug!(error = %e, "Request log not serializable"),
    }

    response
}
