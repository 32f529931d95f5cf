// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! vaultsync - Local-first Encrypted Secret Manager
//!
//! A local agent keeps free text, binary blobs, credentials and payment cards
//! in an encrypted embedded store and mirrors an authoritative remote service
//! over a TLS, bearer-token authenticated channel.
//!
//! ## Modules
//!
//! - `crypto` - AES-GCM envelope encryption
//! - `storage` - Per-user, per-kind encrypted repositories (redb) and the unit of work
//! - `auth` - Session tokens: issuer, axum extractor and the agent's token guard
//! - `remote` - The remote service contract and its HTTP client
//! - `sync` - Replace-all synchronization
//! - `agent` - Local application context and use cases
//! - `server` - Record vault, password hashing, concurrent fetch-all
//! - `api` - HTTP API handlers (Axum)

pub mod agent;
pub mod api;
pub mod auth;
pub mod config;
pub mod crypto;
pub mod error;
pub mod models;
pub mod remote;
pub mod server;
pub mod state;
pub mod storage;
pub mod sync;

#[cfg(test)]
mod testutil;
