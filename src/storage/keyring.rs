// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Persisted key material: the current session and the cached token
//! verification key. Both survive restarts and are sealed like records.

use std::sync::Arc;

use redb::ReadableDatabase;

use super::layout::{KEYRING, SESSION_ENTRY, VERIFICATION_KEY_ENTRY};
use super::{LocalStore, StorageResult};
use crate::models::Session;

/// Single-entry encrypted slots in the `keyring` table.
#[derive(Clone)]
pub struct KeyMaterialStore {
    store: Arc<LocalStore>,
}

impl KeyMaterialStore {
    pub fn new(store: Arc<LocalStore>) -> Self {
        Self { store }
    }

    pub fn load_session(&self) -> StorageResult<Option<Session>> {
        match self.read(SESSION_ENTRY)? {
            Some(json) => Ok(Some(serde_json::from_slice(&json)?)),
            None => Ok(None),
        }
    }

    pub fn save_session(&self, session: &Session) -> StorageResult<()> {
        let json = serde_json::to_vec(session)?;
        self.write(SESSION_ENTRY, &json)
    }

    pub fn clear_session(&self) -> StorageResult<()> {
        self.remove(SESSION_ENTRY)
    }

    pub fn load_verification_key(&self) -> StorageResult<Option<Vec<u8>>> {
        self.read(VERIFICATION_KEY_ENTRY)
    }

    pub fn save_verification_key(&self, key: &[u8]) -> StorageResult<()> {
        self.write(VERIFICATION_KEY_ENTRY, key)
    }

    pub fn clear_verification_key(&self) -> StorageResult<()> {
        self.remove(VERIFICATION_KEY_ENTRY)
    }

    fn read(&self, entry: &str) -> StorageResult<Option<Vec<u8>>> {
        let sealed = {
            let read_txn = self.store.database().begin_read()?;
            let table = read_txn.open_table(KEYRING)?;
            let value = table.get(entry)?.map(|v| v.value().to_vec());
            value
        };
        match sealed {
            Some(sealed) => Ok(Some(self.store.crypto().decrypt(&sealed)?)),
            None => Ok(None),
        }
    }

    fn write(&self, entry: &str, plaintext: &[u8]) -> StorageResult<()> {
        let sealed = self.store.crypto().encrypt(plaintext)?;
        let write_txn = self.store.database().begin_write()?;
        {
            let mut table = write_txn.open_table(KEYRING)?;
            table.insert(entry, sealed.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn remove(&self, entry: &str) -> StorageResult<()> {
        let write_txn = self.store.database().begin_write()?;
        {
            let mut table = write_txn.open_table(KEYRING)?;
            table.remove(entry)?;
        }
        write_txn.commit()?;
        Ok(())
    }
}
