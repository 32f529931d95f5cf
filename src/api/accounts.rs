// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Registration, login and verification key endpoints.

use std::sync::Arc;

use axum::{
    extract::State,
    http::header::CONTENT_TYPE,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::{LoginRequest, TokenResponse};
use crate::server::{RecordVault, VaultResult};
use crate::state::AppState;

fn validate(req: &LoginRequest) -> Result<(), ApiError> {
    if req.login.trim().is_empty() {
        return Err(ApiError::bad_request("login is required"));
    }
    if req.password.is_empty() {
        return Err(ApiError::bad_request("password is required"));
    }
    Ok(())
}

/// Run a password-hashing vault call off the async workers.
async fn with_vault<F>(state: &AppState, op: F) -> Result<Uuid, ApiError>
where
    F: FnOnce(&RecordVault) -> VaultResult<Uuid> + Send + 'static,
{
    let vault = Arc::clone(&state.vault);
    let user_id = tokio::task::spawn_blocking(move || op(&vault))
        .await
        .map_err(|e| ApiError::internal(format!("account task failed: {e}")))??;
    Ok(user_id)
}

/// `POST /v1/auth/register`
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    validate(&req)?;
    let user_id = with_vault(&state, move |vault| vault.register(&req.login, &req.password)).await?;
    let token = state.issuer.issue(user_id)?;
    Ok(Json(TokenResponse { token }))
}

/// `POST /v1/auth/login`
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    validate(&req)?;
    let user_id =
        with_vault(&state, move |vault| vault.authenticate(&req.login, &req.password)).await?;
    let token = state.issuer.issue(user_id)?;
    tracing::info!(user_id = %user_id, "User logged in");
    Ok(Json(TokenResponse { token }))
}

/// `GET /v1/auth/key`: the token verification key as PEM.
pub async fn verification_key(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(CONTENT_TYPE, "text/plain; charset=utf-8")],
        state.issuer.public_key_pem().to_vec(),
    )
}
