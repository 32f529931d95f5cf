// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Local Encrypted Storage
//!
//! The local agent keeps every secret in an embedded redb database. Values
//! are sealed with the agent's [`CryptoService`] before they reach the
//! database, so nothing sensitive is ever written in plaintext.
//!
//! ## Storage Layout
//!
//! See [`layout`]: one registry of user namespaces, one keyring table for the
//! current session and verification key, and one table per (user, kind).
//!
//! ## Transactions
//!
//! Each repository call is its own redb transaction unless the repository was
//! obtained from a [`UnitOfWork`], in which case every call joins the unit's
//! single write transaction. redb admits one writer at a time; a second
//! `begin_write` blocks until the first one finishes.

pub mod keyring;
pub mod layout;
pub mod repository;
pub mod unit_of_work;

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable};
use uuid::Uuid;

use crate::crypto::{CryptoError, CryptoService};
use crate::models::{BinaryRecord, CardRecord, CredentialRecord, Record, RecordKind, TextRecord};

pub use keyring::KeyMaterialStore;
pub use repository::RecordRepository;
pub use unit_of_work::UnitOfWork;

use layout::{KEYRING, NAMESPACES};

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("no namespace for user {0}")]
    UserNamespaceNotFound(Uuid),

    #[error("{kind} record not found: {id}")]
    RecordNotFound { kind: RecordKind, id: Uuid },

    #[error("no active transaction")]
    NoActiveTransaction,

    #[error("a transaction is already active")]
    TransactionActive,

    #[error("invalid record: {0}")]
    InvalidRecord(String),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

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

impl StorageError {
    /// Whether the addressed record, collection or namespace is absent.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StorageError::RecordNotFound { .. } | StorageError::UserNamespaceNotFound(_)
        )
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

// =============================================================================
// LocalStore
// =============================================================================

/// Encrypted local database shared by the agent's repositories.
pub struct LocalStore {
    db: Database,
    crypto: Arc<CryptoService>,
}

impl LocalStore {
    /// Open (or create) the store inside `data_dir`.
    pub fn open(data_dir: &Path, crypto: Arc<CryptoService>) -> StorageResult<Self> {
        std::fs::create_dir_all(data_dir)?;
        let db = Database::create(layout::database_path(data_dir))?;

        // Pre-create the fixed tables so read transactions never miss them
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(NAMESPACES)?;
            let _ = write_txn.open_table(KEYRING)?;
        }
        write_txn.commit()?;

        tracing::debug!(path = %data_dir.display(), "Local store opened");
        Ok(Self { db, crypto })
    }

    pub fn crypto(&self) -> &CryptoService {
        &self.crypto
    }

    pub(crate) fn database(&self) -> &Database {
        &self.db
    }

    /// Register a namespace for `user_id`. Returns `true` if it was created.
    pub fn ensure_namespace(&self, user_id: Uuid) -> StorageResult<bool> {
        let key = user_id.to_string();
        let write_txn = self.db.begin_write()?;
        let created = {
            let mut table = write_txn.open_table(NAMESPACES)?;
            let exists = table.get(key.as_str())?.is_some();
            if !exists {
                table.insert(key.as_str(), chrono::Utc::now().timestamp())?;
            }
            !exists
        };
        write_txn.commit()?;

        if created {
            tracing::info!(user_id = %user_id, "Created user namespace");
        }
        Ok(created)
    }

    /// Whether a namespace exists for `user_id`.
    pub fn has_namespace(&self, user_id: Uuid) -> StorageResult<bool> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(NAMESPACES)?;
        Ok(table.get(user_id.to_string().as_str())?.is_some())
    }

    /// Repository for `R` that runs each call in its own transaction.
    pub fn repository<R: Record>(&self) -> RecordRepository<'_, R> {
        RecordRepository::new(&self.db, &self.crypto)
    }

    pub fn texts(&self) -> RecordRepository<'_, TextRecord> {
        self.repository()
    }

    pub fn binaries(&self) -> RecordRepository<'_, BinaryRecord> {
        self.repository()
    }

    pub fn credentials(&self) -> RecordRepository<'_, CredentialRecord> {
        self.repository()
    }

    pub fn cards(&self) -> RecordRepository<'_, CardRecord> {
        self.repository()
    }

    /// An idle unit of work over this store.
    pub fn unit_of_work(&self) -> UnitOfWork<'_> {
        UnitOfWork::new(self)
    }

    /// Key-material store sharing this database.
    pub fn keyring(self: &Arc<Self>) -> KeyMaterialStore {
        KeyMaterialStore::new(Arc::clone(self))
    }
}

impl std::fmt::Debug for LocalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalStore")
            .field("crypto", &self.crypto)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::temp_store;

    #[test]
    fn namespace_is_created_once() {
        let (store, _dir) = temp_store();
        let user = Uuid::new_v4();

        assert!(!store.has_namespace(user).unwrap());
        assert!(store.ensure_namespace(user).unwrap());
        assert!(!store.ensure_namespace(user).unwrap());
        assert!(store.has_namespace(user).unwrap());
        assert!(!store.has_namespace(Uuid::new_v4()).unwrap());
    }

    #[test]
    fn reopening_keeps_namespaces() {
        let dir = tempfile::tempdir().unwrap();
        let crypto = Arc::new(CryptoService::new(&[3u8; 32]).unwrap());
        let user = Uuid::new_v4();
        {
            let store = LocalStore::open(dir.path(), Arc::clone(&crypto)).unwrap();
            store.ensure_namespace(user).unwrap();
        }
        let store = LocalStore::open(dir.path(), crypto).unwrap();
        assert!(store.has_namespace(user).unwrap());
    }

    #[test]
    fn not_found_classification() {
        assert!(StorageError::UserNamespaceNotFound(Uuid::nil()).is_not_found());
        assert!(StorageError::RecordNotFound {
            kind: RecordKind::Card,
            id: Uuid::nil()
        }
        .is_not_found());
        assert!(!StorageError::NoActiveTransaction.is_not_found());
    }
}
