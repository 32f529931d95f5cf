// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Remote Secret Service Backend
//!
//! Storage and account logic behind the HTTP API:
//!
//! - [`vault`]: accounts and per-user records in redb, sealed at rest
//! - [`password`]: PBKDF2 password hashing
//! - [`fanout`]: concurrent fetch-all for full-sync requests

pub mod fanout;
pub mod password;
pub mod vault;

pub use vault::{RecordVault, VaultError, VaultResult};
