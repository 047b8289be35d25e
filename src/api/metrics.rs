//! Metrics Handlers
//!
//! HTTP handlers for counters, gauges, the active-user set and the
//! Prometheus scrape endpoint.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use tracing::debug;

use crate::aggregate::{
    Direction, MetricKind, ACTIVE_REQUESTS, ACTIVE_USERS, EXPOSITION_CONTENT_TYPE,
    TOTAL_CACHING_DATA, TOTAL_RECEIVED_HISTORICAL_DATA, TOTAL_RECEIVED_ONLINE_DATA,
    TOTAL_REQUESTS,
};
use crate::api::AppState;
use crate::error::{Result, StoreError};
use crate::models::{ActiveUsersResponse, IdentityRequest, MetricUpdateRequest};

/// Route segment under `/metrics/` -> metric name.
pub const METRIC_ROUTES: &[(&str, &str)] = &[
    ("total_requests", TOTAL_REQUESTS),
    ("received_historical_data", TOTAL_RECEIVED_HISTORICAL_DATA),
    ("received_online_data", TOTAL_RECEIVED_ONLINE_DATA),
    ("caching_data", TOTAL_CACHING_DATA),
    ("active_requests", ACTIVE_REQUESTS),
];

fn metric_for_route(route: &str) -> Option<&'static str> {
    METRIC_ROUTES
        .iter()
        .find(|(segment, _)| *segment == route)
        .map(|(_, name)| *name)
}

/// Handler for POST /metrics/:metric
///
/// Counters grow by `value`. Gauges move one step up, or one step down when
/// `value` is negative. A missing `value` changes nothing.
pub async fn update_metric_handler(
    State(state): State<AppState>,
    Path(route): Path<String>,
    Json(req): Json<MetricUpdateRequest>,
) -> Result<StatusCode> {
    let name = metric_for_route(&route)
        .ok_or_else(|| StoreError::NotFound(format!("metric '{}'", route)))?;

    match state.metrics.kind_of(name) {
        Some(MetricKind::Gauge) => {
            if let Some(sign) = req.signed() {
                let value = state
                    .metrics
                    .gauge_adjust(name, Direction::from_signed(sign))?;
                debug!(metric = name, value, "gauge adjusted");
            }
        }
        _ => {
            if let Some(amount) = req.amount() {
                let amount = amount.map_err(StoreError::InvalidArgument)?;
                let value = state.metrics.counter_add(name, amount)?;
                debug!(metric = name, value, "counter incremented");
            }
        }
    }

    Ok(StatusCode::OK)
}

/// Handler for POST /metrics/active_users
pub async fn enter_user_handler(
    State(state): State<AppState>,
    Json(req): Json<IdentityRequest>,
) -> Result<StatusCode> {
    if let Some(username) = req.value {
        let count = state.metrics.identity_enter(ACTIVE_USERS, &username)?;
        debug!(user = %username, count, "user entered");
    }
    Ok(StatusCode::OK)
}

/// Handler for DELETE /metrics/active_users
///
/// Leaving for a user who is not active is ignored.
pub async fn leave_user_handler(
    State(state): State<AppState>,
    Json(req): Json<IdentityRequest>,
) -> StatusCode {
    if let Some(username) = req.value {
        state.metrics.identity_leave(ACTIVE_USERS, &username);
    }
    StatusCode::OK
}

/// Handler for GET /metrics/active_users
pub async fn list_users_handler(State(state): State<AppState>) -> Json<ActiveUsersResponse> {
    Json(ActiveUsersResponse {
        active_users: state.metrics.identities(ACTIVE_USERS),
    })
}

/// Handler for GET /metrics
pub async fn exposition_handler(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let body = state
        .metrics
        .render_exposition()
        .map_err(|e| StoreError::Internal(format!("metrics encode error: {}", e)))?;

    Ok(([(header::CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)], body))
}
