// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Table naming for the local store.
//!
//! ```text
//! namespaces                 user_id → created_at (unix seconds)
//! keyring                    "session" | "verification_key" → nonce||ciphertext
//! ns/{user_id}/{kind}        record_id → nonce||ciphertext
//! ```

use std::path::{Path, PathBuf};

use redb::TableDefinition;
use uuid::Uuid;

use crate::models::RecordKind;

/// File name of the local database inside the data directory.
pub const DATABASE_FILE: &str = "vaultsync.redb";

/// Registry of user namespaces.
pub const NAMESPACES: TableDefinition<&str, i64> = TableDefinition::new("namespaces");

/// Process-wide key material (current session, verification key).
pub const KEYRING: TableDefinition<&str, &[u8]> = TableDefinition::new("keyring");

/// Keyring entry holding the current session.
pub const SESSION_ENTRY: &str = "session";

/// Keyring entry holding the cached verification key.
pub const VERIFICATION_KEY_ENTRY: &str = "verification_key";

/// Definition type for per-user record tables (name borrowed from the caller).
pub type RecordTable<'n> = TableDefinition<'n, &'static str, &'static [u8]>;

/// Name of the table holding `kind` records for `user_id`.
pub fn record_table_name(user_id: Uuid, kind: RecordKind) -> String {
    format!("ns/{user_id}/{kind}")
}

/// Path of the database file under `data_dir`.
pub fn database_path(data_dir: impl AsRef<Path>) -> PathBuf {
    data_dir.as_ref().join(DATABASE_FILE)
}
