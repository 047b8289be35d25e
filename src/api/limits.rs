//! Limit Handlers
//!
//! HTTP handlers for the global limits and per-user overrides.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::info;

use crate::api::AppState;
use crate::error::{Result, StoreError};
use crate::limits::LimitKind;
use crate::models::{LimitResponse, LimitSetRequest};

fn parse_kind(name: &str) -> Result<LimitKind> {
    LimitKind::from_name(name).ok_or_else(|| StoreError::NotFound(format!("limit '{}'", name)))
}

/// Handler for GET /:limit
pub async fn get_limit_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<LimitResponse>> {
    let kind = parse_kind(&name)?;
    let value = state.limits.read().await.get(kind);
    Ok(Json(LimitResponse::new(value)))
}

/// Handler for POST /:limit
pub async fn set_limit_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(req): Json<LimitSetRequest>,
) -> Result<StatusCode> {
    let kind = parse_kind(&name)?;
    let value = req.limit().map_err(StoreError::InvalidArgument)?;

    state.limits.write().await.set(kind, value);
    info!(limit = kind.name(), value, "limit updated");
    Ok(StatusCode::OK)
}

/// Handler for GET /user_limit/:username
///
/// Falls back to the default user limit when no override exists.
pub async fn get_user_limit_handler(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Json<LimitResponse> {
    let value = state.limits.read().await.user_limit(&username);
    Json(LimitResponse::new(value))
}

/// Handler for POST /user_limit/:username
pub async fn set_user_limit_handler(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Json(req): Json<LimitSetRequest>,
) -> Result<StatusCode> {
    let value = req.limit().map_err(StoreError::InvalidArgument)?;

    info!(user = %username, value, "user limit updated");
    state.limits.write().await.set_user_limit(username, value);
    Ok(StatusCode::OK)
}
