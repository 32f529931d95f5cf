// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Server-side encrypted record vault backed by redb.
//!
//! ## Table Layout
//!
//! - `users`: login → sealed [`StoredUser`] JSON
//! - `records/{kind}`: `{user_id}/{record_id}` → sealed record JSON
//!
//! Record keys start with the owner's id, so listing a user's records is a
//! range scan over `{user_id}/`.

use std::path::Path;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::password::{hash_password, verify_password};
use crate::crypto::{CryptoError, CryptoService};
use crate::models::{
    AnyRecord, BinaryRecord, CardRecord, CredentialRecord, Record, RecordBatch, RecordKind,
    TextRecord,
};

// =============================================================================
// Table Definitions
// =============================================================================

const USERS: TableDefinition<&str, &[u8]> = TableDefinition::new("users");

const TEXTS: TableDefinition<&str, &[u8]> = TableDefinition::new("records/text");
const BINARIES: TableDefinition<&str, &[u8]> = TableDefinition::new("records/binary");
const CREDENTIALS: TableDefinition<&str, &[u8]> = TableDefinition::new("records/credential");
const CARDS: TableDefinition<&str, &[u8]> = TableDefinition::new("records/card");

/// File name of the vault database inside the data directory.
pub const VAULT_FILE: &str = "vault.redb";

fn records_table(kind: RecordKind) -> TableDefinition<'static, &'static str, &'static [u8]> {
    match kind {
        RecordKind::Text => TEXTS,
        RecordKind::Binary => BINARIES,
        RecordKind::Credential => CREDENTIALS,
        RecordKind::Card => CARDS,
    }
}

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    #[error("login is already taken")]
    LoginTaken,

    #[error("invalid login or password")]
    InvalidCredentials,

    #[error("{kind} record not found: {id}")]
    RecordNotFound { kind: RecordKind, id: Uuid },

    #[error("{kind} record already exists: {id}")]
    RecordExists { kind: RecordKind, id: Uuid },

    #[error("password hashing failed")]
    Hashing,

    #[error("background task failed: {0}")]
    Task(String),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),
}

pub type VaultResult<T> = Result<T, VaultError>;

// =============================================================================
// Key Helpers
// =============================================================================

fn record_key(user_id: Uuid, record_id: Uuid) -> String {
    format!("{user_id}/{record_id}")
}

/// Lower bound of a user's key range.
fn make_prefix(user_id: Uuid) -> String {
    format!("{user_id}/")
}

/// Exclusive upper bound of a user's key range ('0' follows '/').
fn make_prefix_end(user_id: Uuid) -> String {
    format!("{user_id}0")
}

// =============================================================================
// RecordVault
// =============================================================================

/// Account stored in the `users` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredUser {
    pub id: Uuid,
    pub login: String,
    pub password_hash: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Authoritative per-user record store for the service.
pub struct RecordVault {
    db: Database,
    crypto: CryptoService,
}

impl RecordVault {
    /// Open (or create) the vault inside `data_dir`.
    pub fn open(data_dir: &Path, crypto: CryptoService) -> VaultResult<Self> {
        std::fs::create_dir_all(data_dir)?;
        let db = Database::create(data_dir.join(VAULT_FILE))?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(USERS)?;
            for kind in RecordKind::ALL {
                let _ = write_txn.open_table(records_table(kind))?;
            }
        }
        write_txn.commit()?;

        tracing::info!(path = %data_dir.display(), "Record vault opened");
        Ok(Self { db, crypto })
    }

    /// Whether a read transaction can be opened.
    pub fn is_healthy(&self) -> bool {
        self.db.begin_read().is_ok()
    }

    // -------------------------------------------------------------------------
    // Accounts
    // -------------------------------------------------------------------------

    /// Create an account. Fails with [`VaultError::LoginTaken`] on duplicates.
    pub fn register(&self, login: &str, password: &str) -> VaultResult<Uuid> {
        let password_hash = hash_password(password).map_err(|_| VaultError::Hashing)?;
        let user = StoredUser {
            id: Uuid::new_v4(),
            login: login.to_string(),
            password_hash,
            created_at: chrono::Utc::now(),
        };
        let sealed = self.crypto.encrypt(&serde_json::to_vec(&user)?)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(USERS)?;
            if table.get(login)?.is_some() {
                drop(table);
                write_txn.abort()?;
                return Err(VaultError::LoginTaken);
            }
            table.insert(login, sealed.as_slice())?;
        }
        write_txn.commit()?;

        tracing::info!(user_id = %user.id, "User registered");
        Ok(user.id)
    }

    /// Check a login/password pair and return the user id.
    pub fn authenticate(&self, login: &str, password: &str) -> VaultResult<Uuid> {
        let sealed = {
            let read_txn = self.db.begin_read()?;
            let table = read_txn.open_table(USERS)?;
            let value = table.get(login)?.map(|v| v.value().to_vec());
            value
        };
        let sealed = sealed.ok_or(VaultError::InvalidCredentials)?;
        let user: StoredUser = serde_json::from_slice(&self.crypto.decrypt(&sealed)?)?;

        if !verify_password(password, &user.password_hash) {
            return Err(VaultError::InvalidCredentials);
        }
        Ok(user.id)
    }

    // -------------------------------------------------------------------------
    // Records
    // -------------------------------------------------------------------------

    /// Store a new record for `user_id`, assigning an id if it has none.
    pub fn create_record(&self, user_id: Uuid, mut record: AnyRecord) -> VaultResult<Uuid> {
        if record.id().is_nil() {
            record.set_id(Uuid::new_v4());
        }
        let (kind, id) = (record.kind(), record.id());
        let sealed = self.seal(&record)?;
        let key = record_key(user_id, id);

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(records_table(kind))?;
            if table.get(key.as_str())?.is_some() {
                drop(table);
                write_txn.abort()?;
                return Err(VaultError::RecordExists { kind, id });
            }
            table.insert(key.as_str(), sealed.as_slice())?;
        }
        write_txn.commit()?;

        tracing::debug!(user_id = %user_id, kind = %kind, record_id = %id, "Record stored");
        Ok(id)
    }

    /// Overwrite an existing record owned by `user_id`.
    pub fn update_record(&self, user_id: Uuid, record: AnyRecord) -> VaultResult<()> {
        let (kind, id) = (record.kind(), record.id());
        let sealed = self.seal(&record)?;
        let key = record_key(user_id, id);

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(records_table(kind))?;
            if table.get(key.as_str())?.is_none() {
                drop(table);
                write_txn.abort()?;
                return Err(VaultError::RecordNotFound { kind, id });
            }
            table.insert(key.as_str(), sealed.as_slice())?;
        }
        write_txn.commit()?;

        tracing::debug!(user_id = %user_id, kind = %kind, record_id = %id, "Record updated");
        Ok(())
    }

    /// Every record of `kind` owned by `user_id`.
    pub fn list_records(&self, user_id: Uuid, kind: RecordKind) -> VaultResult<RecordBatch> {
        Ok(match kind {
            RecordKind::Text => TextRecord::into_batch(self.list::<TextRecord>(user_id)?),
            RecordKind::Binary => BinaryRecord::into_batch(self.list::<BinaryRecord>(user_id)?),
            RecordKind::Credential => {
                CredentialRecord::into_batch(self.list::<CredentialRecord>(user_id)?)
            }
            RecordKind::Card => CardRecord::into_batch(self.list::<CardRecord>(user_id)?),
        })
    }

    fn list<R: Record>(&self, user_id: Uuid) -> VaultResult<Vec<R>> {
        let prefix = make_prefix(user_id);
        let prefix_end = make_prefix_end(user_id);

        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(records_table(R::KIND))?;

        let mut records = Vec::new();
        for entry in table.range(prefix.as_str()..prefix_end.as_str())? {
            let (_, value) = entry?;
            let json = self.crypto.decrypt(value.value())?;
            records.push(serde_json::from_slice(&json)?);
        }
        Ok(records)
    }

    fn seal(&self, record: &AnyRecord) -> VaultResult<Vec<u8>> {
        let json = match record {
            AnyRecord::Text(r) => serde_json::to_vec(r)?,
            AnyRecord::Binary(r) => serde_json::to_vec(r)?,
            AnyRecord::Credential(r) => serde_json::to_vec(r)?,
            AnyRecord::Card(r) => serde_json::to_vec(r)?,
        };
        Ok(self.crypto.encrypt(&json)?)
    }
}

impl std::fmt::Debug for RecordVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordVault").finish_non_exhaustive()
    }
}
