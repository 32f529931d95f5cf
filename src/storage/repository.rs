// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Generic encrypted record repository.
//!
//! One [`RecordRepository`] instance serves one record kind. Records are
//! serialized to JSON, sealed with the store's crypto service and written
//! under `ns/{user_id}/{kind}` keyed by the record id.
//!
//! A repository either owns its transactions (obtained from
//! [`LocalStore`](super::LocalStore)) or joins the write transaction of a
//! [`UnitOfWork`](super::UnitOfWork).

use std::marker::PhantomData;

use redb::{
    Database, ReadableDatabase, ReadableTable, TableError, TableHandle, WriteTransaction,
};
use uuid::Uuid;

use super::layout::{record_table_name, RecordTable, NAMESPACES};
use super::{StorageError, StorageResult};
use crate::crypto::CryptoService;
use crate::models::{Record, RecordKind};

#[derive(Clone, Copy)]
enum Scope<'a> {
    Store(&'a Database),
    Transaction(&'a WriteTransaction),
}

/// Encrypted repository for one record kind.
pub struct RecordRepository<'a, R> {
    scope: Scope<'a>,
    crypto: &'a CryptoService,
    _record: PhantomData<fn() -> R>,
}

impl<'a, R: Record> RecordRepository<'a, R> {
    pub(crate) fn new(db: &'a Database, crypto: &'a CryptoService) -> Self {
        Self {
            scope: Scope::Store(db),
            crypto,
            _record: PhantomData,
        }
    }

    pub(crate) fn in_transaction(txn: &'a WriteTransaction, crypto: &'a CryptoService) -> Self {
        Self {
            scope: Scope::Transaction(txn),
            crypto,
            _record: PhantomData,
        }
    }

    pub fn kind(&self) -> RecordKind {
        R::KIND
    }

    /// Store a new record. The user must already have a namespace.
    pub fn create(&self, user_id: Uuid, record: &R) -> StorageResult<()> {
        let id = checked_id(record)?;
        let sealed = self.seal(record)?;

        self.write(|txn| {
            if !namespace_exists(txn, user_id)? {
                return Err(StorageError::UserNamespaceNotFound(user_id));
            }
            let name = record_table_name(user_id, R::KIND);
            let mut table = txn.open_table(RecordTable::new(&name))?;
            table.insert(id.as_str(), sealed.as_slice())?;
            Ok(())
        })?;

        tracing::debug!(user_id = %user_id, kind = %R::KIND, record_id = %id, "Record created");
        Ok(())
    }

    /// Overwrite a record. Never creates the kind's collection.
    pub fn update(&self, user_id: Uuid, record: &R) -> StorageResult<()> {
        let id = checked_id(record)?;
        let sealed = self.seal(record)?;

        self.write(|txn| {
            let name = record_table_name(user_id, R::KIND);
            if !table_exists(txn, &name)? {
                return Err(StorageError::RecordNotFound {
                    kind: R::KIND,
                    id: record.id(),
                });
            }
            let mut table = txn.open_table(RecordTable::new(&name))?;
            table.insert(id.as_str(), sealed.as_slice())?;
            Ok(())
        })?;

        tracing::debug!(user_id = %user_id, kind = %R::KIND, record_id = %id, "Record updated");
        Ok(())
    }

    /// Load and decrypt a single record.
    pub fn get(&self, user_id: Uuid, id: Uuid) -> StorageResult<R> {
        let name = record_table_name(user_id, R::KIND);
        let key = id.to_string();

        let sealed = match self.scope {
            Scope::Store(db) => {
                let read_txn = db.begin_read()?;
                match read_txn.open_table(RecordTable::new(&name)) {
                    Ok(table) => read_value(&table, &key)?,
                    Err(TableError::TableDoesNotExist(_)) => None,
                    Err(e) => return Err(e.into()),
                }
            }
            Scope::Transaction(txn) => {
                if table_exists(txn, &name)? {
                    let table = txn.open_table(RecordTable::new(&name))?;
                    read_value(&table, &key)?
                } else {
                    None
                }
            }
        };

        let sealed = sealed.ok_or(StorageError::RecordNotFound { kind: R::KIND, id })?;
        self.open(&sealed)
    }

    /// Every record of this kind for `user_id`; empty when nothing was stored.
    ///
    /// A single undecryptable entry fails the whole call.
    pub fn get_all(&self, user_id: Uuid) -> StorageResult<Vec<R>> {
        let name = record_table_name(user_id, R::KIND);

        let sealed = match self.scope {
            Scope::Store(db) => {
                let read_txn = db.begin_read()?;
                match read_txn.open_table(RecordTable::new(&name)) {
                    Ok(table) => read_values(&table)?,
                    Err(TableError::TableDoesNotExist(_)) => Vec::new(),
                    Err(e) => return Err(e.into()),
                }
            }
            Scope::Transaction(txn) => {
                if table_exists(txn, &name)? {
                    let table = txn.open_table(RecordTable::new(&name))?;
                    read_values(&table)?
                } else {
                    Vec::new()
                }
            }
        };

        sealed.iter().map(|value| self.open(value)).collect()
    }

    /// Drop the kind's collection and rebuild it from `records`.
    pub fn replace_all(&self, user_id: Uuid, records: &[R]) -> StorageResult<()> {
        let sealed = records
            .iter()
            .map(|record| Ok((checked_id(record)?, self.seal(record)?)))
            .collect::<StorageResult<Vec<(String, Vec<u8>)>>>()?;

        self.write(|txn| {
            if !namespace_exists(txn, user_id)? {
                return Err(StorageError::UserNamespaceNotFound(user_id));
            }
            let name = record_table_name(user_id, R::KIND);
            txn.delete_table(RecordTable::new(&name))?;
            let mut table = txn.open_table(RecordTable::new(&name))?;
            for (id, value) in &sealed {
                table.insert(id.as_str(), value.as_slice())?;
            }
            Ok(())
        })?;

        tracing::debug!(
            user_id = %user_id,
            kind = %R::KIND,
            count = records.len(),
            "Record collection replaced"
        );
        Ok(())
    }

    fn seal(&self, record: &R) -> StorageResult<Vec<u8>> {
        let json = serde_json::to_vec(record)?;
        Ok(self.crypto.encrypt(&json)?)
    }

    fn open(&self, sealed: &[u8]) -> StorageResult<R> {
        let json = self.crypto.decrypt(sealed)?;
        Ok(serde_json::from_slice(&json)?)
    }

    /// Run `op` inside the bound transaction, or inside a fresh one that is
    /// committed on success and aborted on failure.
    fn write<T>(
        &self,
        op: impl FnOnce(&WriteTransaction) -> StorageResult<T>,
    ) -> StorageResult<T> {
        match self.scope {
            Scope::Transaction(txn) => op(txn),
            Scope::Store(db) => {
                let txn = db.begin_write()?;
                match op(&txn) {
                    Ok(value) => {
                        txn.commit()?;
                        Ok(value)
                    }
                    Err(err) => {
                        if let Err(abort_err) = txn.abort() {
                            tracing::warn!(error = %abort_err, "Failed to abort write transaction");
                        }
                        Err(err)
                    }
                }
            }
        }
    }
}

/// Reject records that cannot be addressed.
fn checked_id<R: Record>(record: &R) -> StorageResult<String> {
    let id = record.id();
    if id.is_nil() {
        return Err(StorageError::InvalidRecord(format!(
            "{} record has a nil id",
            R::KIND
        )));
    }
    Ok(id.to_string())
}

fn namespace_exists(txn: &WriteTransaction, user_id: Uuid) -> StorageResult<bool> {
    let table = txn.open_table(NAMESPACES)?;
    let exists = table.get(user_id.to_string().as_str())?.is_some();
    Ok(exists)
}

/// Check for a table without creating it as `open_table` would.
fn table_exists(txn: &WriteTransaction, name: &str) -> StorageResult<bool> {
    Ok(txn.list_tables()?.any(|handle| handle.name() == name))
}

fn read_value<T>(table: &T, key: &str) -> StorageResult<Option<Vec<u8>>>
where
    T: ReadableTable<&'static str, &'static [u8]>,
{
    Ok(table.get(key)?.map(|value| value.value().to_vec()))
}

fn read_values<T>(table: &T) -> StorageResult<Vec<Vec<u8>>>
where
    T: ReadableTable<&'static str, &'static [u8]>,
{
    let mut values = Vec::new();
    for entry in table.iter()? {
        let (_, value) = entry?;
        values.push(value.value().to_vec());
    }
    Ok(values)
}
