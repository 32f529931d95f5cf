// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session token claims and the authenticated principal.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AuthError;

/// Claims carried by a vaultsync session token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionClaims {
    /// Subject: the user id, hyphenated.
    pub sub: String,

    /// Issued at (unix seconds)
    pub iat: i64,

    /// Expiration (unix seconds)
    pub exp: i64,
}

impl SessionClaims {
    /// Claims for `user_id`, valid for `ttl_secs` from now.
    pub fn new(user_id: Uuid, ttl_secs: i64) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub: user_id.to_string(),
            iat: now,
            exp: now + ttl_secs,
        }
    }

    /// The subject as a user id. Anything that is not a UUID is rejected.
    pub fn user_id(&self) -> Result<Uuid, AuthError> {
        Uuid::parse_str(&self.sub).map_err(|_| AuthError::InvalidToken)
    }
}

/// User identity attached to an authenticated request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,

    /// Token expiration (unix seconds)
    pub expires_at: i64,
}

impl TryFrom<SessionClaims> for AuthenticatedUser {
    type Error = AuthError;

    fn try_from(claims: SessionClaims) -> Result<Self, Self::Error> {
        Ok(Self {
            user_id: claims.user_id()?,
            expires_at: claims.exp,
        })
    }
}
