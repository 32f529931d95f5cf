// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Record endpoints. Every handler is scoped to the authenticated user.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::auth::Auth;
use crate::error::ApiError;
use crate::models::{AnyRecord, CreatedResponse, RecordBatch, RecordKind, Snapshot};
use crate::server::fanout;
use crate::state::AppState;

/// `POST /v1/records`
pub async fn create_record(
    Auth(user): Auth,
    State(state): State<AppState>,
    Json(record): Json<AnyRecord>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let id = state.vault.create_record(user.user_id, record)?;
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

/// `PUT /v1/records/{id}`
pub async fn update_record(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(record): Json<AnyRecord>,
) -> Result<StatusCode, ApiError> {
    if record.id() != id {
        return Err(ApiError::bad_request(format!(
            "record id {} does not match path id {id}",
            record.id()
        )));
    }
    state.vault.update_record(user.user_id, record)?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /v1/records/{kind}`
pub async fn list_records(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(kind): Path<String>,
) -> Result<Json<RecordBatch>, ApiError> {
    let kind: RecordKind = kind
        .parse()
        .map_err(|e: crate::models::UnknownKind| ApiError::bad_request(e.to_string()))?;
    let batch = state.vault.list_records(user.user_id, kind)?;
    Ok(Json(batch))
}

/// `GET /v1/records`: all four kinds, or an error.
pub async fn snapshot(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<Snapshot>, ApiError> {
    let snapshot = fanout::fetch_snapshot(Arc::clone(&state.vault), user.user_id).await?;
    Ok(Json(snapshot))
}
