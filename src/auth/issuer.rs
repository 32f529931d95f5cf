// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session token signing and verification (EdDSA / Ed25519).
//!
//! The remote service signs tokens with its private key and publishes the
//! matching public key as PEM at `GET /v1/auth/key`. Agents verify tokens
//! against that PEM through [`verify_token`].

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use super::{AuthError, AuthenticatedUser, SessionClaims};

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

/// Default token lifetime (24 hours).
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 24 * 60 * 60;

fn validation() -> Validation {
    let mut validation = Validation::new(Algorithm::EdDSA);
    validation.leeway = CLOCK_SKEW_LEEWAY;
    validation.validate_aud = false;
    validation
}

/// Verify `token` against an Ed25519 public key in PEM form.
///
/// Checks signature and expiry only; the subject is returned unparsed.
pub fn verify_token(token: &str, public_pem: &[u8]) -> Result<SessionClaims, AuthError> {
    let key = DecodingKey::from_ed_pem(public_pem)
        .map_err(|e| AuthError::InvalidKeyMaterial(e.to_string()))?;
    decode::<SessionClaims>(token, &key, &validation())
        .map(|data| data.claims)
        .map_err(|e| AuthError::from_jwt(&e))
}

/// Issues and checks session tokens for the remote service.
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    public_pem: Vec<u8>,
    ttl_secs: i64,
}

impl TokenIssuer {
    /// Build from an Ed25519 key pair in PEM form.
    pub fn from_pem(private_pem: &[u8], public_pem: &[u8], ttl_secs: i64) -> Result<Self, AuthError> {
        let encoding = EncodingKey::from_ed_pem(private_pem)
            .map_err(|e| AuthError::InvalidKeyMaterial(format!("signing key: {e}")))?;
        let decoding = DecodingKey::from_ed_pem(public_pem)
            .map_err(|e| AuthError::InvalidKeyMaterial(format!("verification key: {e}")))?;
        Ok(Self {
            encoding,
            decoding,
            public_pem: public_pem.to_vec(),
            ttl_secs,
        })
    }

    /// Sign a fresh token for `user_id`.
    pub fn issue(&self, user_id: Uuid) -> Result<String, AuthError> {
        let claims = SessionClaims::new(user_id, self.ttl_secs);
        encode(&Header::new(Algorithm::EdDSA), &claims, &self.encoding)
            .map_err(|e| AuthError::InternalError(format!("failed to sign token: {e}")))
    }

    /// Verify a token presented to the service.
    pub fn verify(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        let data = decode::<SessionClaims>(token, &self.decoding, &validation())
            .map_err(|e| AuthError::from_jwt(&e))?;
        AuthenticatedUser::try_from(data.claims)
    }

    /// Public half of the signing key, as served to agents.
    pub fn public_key_pem(&self) -> &[u8] {
        &self.public_pem
    }
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("ttl_secs", &self.ttl_secs)
            .finish_non_exhaustive()
    }
}
