// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Agent-side session token guard.
//!
//! ## Validation
//!
//! 1. Without a cached verification key, fetch one from the remote service,
//!    persist it (encrypted) and cache it. Fetch errors propagate as-is.
//! 2. Verify signature and expiry against the cached key.
//! 3. On any failure, re-fetch the key once, replace the cache and verify
//!    again. A second failure is [`AuthError::InvalidToken`].
//! 4. A subject that is not a UUID is [`AuthError::InvalidToken`].
//!
//! The single re-fetch separates a rotated server key (passes on the second
//! attempt) from a forged or expired token (fails twice).

use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use super::{verify_token, AuthError};
use crate::remote::SecretService;
use crate::storage::KeyMaterialStore;

/// Validates bearer tokens against the remote service's verification key.
pub struct TokenGuard<S: ?Sized> {
    remote: Arc<S>,
    keyring: KeyMaterialStore,
    key: RwLock<Option<Vec<u8>>>,
}

impl<S: SecretService + ?Sized> TokenGuard<S> {
    /// Guard with an empty cache; the key is fetched on first use.
    pub fn new(remote: Arc<S>, keyring: KeyMaterialStore) -> Self {
        Self {
            remote,
            keyring,
            key: RwLock::new(None),
        }
    }

    /// Guard primed with the key persisted by a previous run, if any.
    pub fn load(remote: Arc<S>, keyring: KeyMaterialStore) -> Result<Self, AuthError> {
        let cached = keyring.load_verification_key()?;
        if cached.is_some() {
            tracing::debug!("Loaded persisted verification key");
        }
        Ok(Self {
            remote,
            keyring,
            key: RwLock::new(cached),
        })
    }

    /// Validate `token` and return the user it asserts.
    pub async fn validate(&self, token: &str) -> Result<Uuid, AuthError> {
        let cached = self.key.read().await.clone();
        let key = match cached {
            Some(key) => key,
            None => self.refresh_key().await?,
        };

        let claims = match verify_token(token, &key) {
            Ok(claims) => claims,
            Err(first) => {
                tracing::debug!(error = %first, "Token rejected with cached key, refetching");
                let key = self.refresh_key().await?;
                verify_token(token, &key).map_err(|second| {
                    tracing::warn!(error = %second, "Token rejected after key refresh");
                    AuthError::InvalidToken
                })?
            }
        };

        claims.user_id()
    }

    /// Drop the cached and persisted key.
    pub async fn forget_key(&self) -> Result<(), AuthError> {
        *self.key.write().await = None;
        self.keyring.clear_verification_key()?;
        tracing::debug!("Verification key forgotten");
        Ok(())
    }

    /// Whether a verification key is currently cached.
    pub async fn has_key(&self) -> bool {
        self.key.read().await.is_some()
    }

    async fn refresh_key(&self) -> Result<Vec<u8>, AuthError> {
        let key = self.remote.verification_key().await?;
        self.keyring.save_verification_key(&key)?;
        *self.key.write().await = Some(key.clone());
        tracing::info!("Verification key refreshed");
        Ok(key)
    }
}
