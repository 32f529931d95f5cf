// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Session tokens for the vaultsync service.
//!
//! ## Auth Flow
//!
//! 1. The agent registers or logs in; the service answers with an EdDSA JWT
//!    whose `sub` is the user id.
//! 2. The agent sends `Authorization: Bearer <token>` on every record call.
//! 3. The service verifies the token with its own key ([`TokenIssuer`]).
//! 4. The agent independently checks the token with the service's published
//!    verification key ([`TokenGuard`]) before trusting the user id.
//!
//! ## Security
//!
//! - All record endpoints require authentication
//! - The agent's verification key is cached and persisted encrypted
//! - Clock skew tolerance is 60 seconds

pub mod claims;
pub mod error;
pub mod extractor;
pub mod guard;
pub mod issuer;

pub use claims::{AuthenticatedUser, SessionClaims};
pub use error::AuthError;
pub use extractor::Auth;
pub use guard::TokenGuard;
pub use issuer::{verify_token, TokenIssuer, DEFAULT_TOKEN_TTL_SECS};
