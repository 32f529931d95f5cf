// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Unit of Work spanning every record repository.
//!
//! ```text
//! idle ──begin()──▶ active ──commit() / rollback()──▶ idle
//! ```
//!
//! While active, a single redb write transaction is open and every repository
//! handed out by the unit writes into it. Nothing becomes visible to other
//! readers until `commit()` succeeds. Callers must `rollback()` on every exit
//! path that does not commit; dropping an active unit aborts as a last resort.

use redb::WriteTransaction;

use super::{LocalStore, RecordRepository, StorageError, StorageResult};
use crate::models::{BinaryRecord, CardRecord, CredentialRecord, Record, TextRecord};

/// Atomic boundary over all four record kinds.
pub struct UnitOfWork<'s> {
    store: &'s LocalStore,
    txn: Option<WriteTransaction>,
}

impl<'s> UnitOfWork<'s> {
    pub(crate) fn new(store: &'s LocalStore) -> Self {
        Self { store, txn: None }
    }

    pub fn is_active(&self) -> bool {
        self.txn.is_some()
    }

    /// Open the write transaction. Never nests.
    pub fn begin(&mut self) -> StorageResult<()> {
        if self.txn.is_some() {
            return Err(StorageError::TransactionActive);
        }
        self.txn = Some(self.store.database().begin_write()?);
        tracing::debug!("Unit of work started");
        Ok(())
    }

    /// Durably apply every write made since `begin()`.
    pub fn commit(&mut self) -> StorageResult<()> {
        let txn = self.txn.take().ok_or(StorageError::NoActiveTransaction)?;
        txn.commit()?;
        tracing::debug!("Unit of work committed");
        Ok(())
    }

    /// Discard every write made since `begin()`. A no-op while idle.
    pub fn rollback(&mut self) -> StorageResult<()> {
        match self.txn.take() {
            Some(txn) => {
                txn.abort()?;
                tracing::debug!("Unit of work rolled back");
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Repository for `R` bound to the open transaction.
    pub fn repository<R: Record>(&self) -> StorageResult<RecordRepository<'_, R>> {
        let txn = self.txn.as_ref().ok_or(StorageError::NoActiveTransaction)?;
        Ok(RecordRepository::in_transaction(txn, self.store.crypto()))
    }

    pub fn texts(&self) -> StorageResult<RecordRepository<'_, TextRecord>> {
        self.repository()
    }

    pub fn binaries(&self) -> StorageResult<RecordRepository<'_, BinaryRecord>> {
        self.repository()
    }

    pub fn credentials(&self) -> StorageResult<RecordRepository<'_, CredentialRecord>> {
        self.repository()
    }

    pub fn cards(&self) -> StorageResult<RecordRepository<'_, CardRecord>> {
        self.repository()
    }
}

impl Drop for UnitOfWork<'_> {
    fn drop(&mut self) {
        if let Some(txn) = self.txn.take() {
            tracing::warn!("Unit of work dropped while active, aborting transaction");
            if let Err(e) = txn.abort() {
                tracing::warn!(error = %e, "Failed to abort dropped unit of work");
            }
        }
    }
}
