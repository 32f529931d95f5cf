// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Sync Orchestrator
//!
//! Makes the local store mirror the remote service for the session's user.
//! Sync is last-writer-wins: the remote list replaces the local one.
//!
//! - [`SyncOrchestrator::sync_kind`] replaces one kind directly.
//! - [`SyncOrchestrator::sync_all`] replaces all four kinds inside a single
//!   [`UnitOfWork`](crate::storage::UnitOfWork). Any failure rolls the unit
//!   back, so the local data is either fully replaced or untouched.

use serde::Serialize;
use uuid::Uuid;

use crate::auth::{AuthError, TokenGuard};
use crate::models::{
    BinaryRecord, CardRecord, CredentialRecord, Record, RecordKind, Session, Snapshot, TextRecord,
};
use crate::remote::{RemoteError, SecretService};
use crate::storage::{LocalStore, StorageError, StorageResult, UnitOfWork};

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("remote returned {actual} records for a {expected} sync")]
    KindMismatch {
        expected: RecordKind,
        actual: RecordKind,
    },
}

pub type SyncResult<T> = Result<T, SyncError>;

/// Record counts written by a full sync.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub texts: usize,
    pub binaries: usize,
    pub credentials: usize,
    pub cards: usize,
}

impl SyncReport {
    pub fn total(&self) -> usize {
        self.texts + self.binaries + self.credentials + self.cards
    }
}

/// Pulls remote state into the local store.
pub struct SyncOrchestrator<'a, S: ?Sized> {
    store: &'a LocalStore,
    guard: &'a TokenGuard<S>,
    remote: &'a S,
}

impl<'a, S: SecretService + ?Sized> SyncOrchestrator<'a, S> {
    pub fn new(store: &'a LocalStore, guard: &'a TokenGuard<S>, remote: &'a S) -> Self {
        Self {
            store,
            guard,
            remote,
        }
    }

    /// Replace the local `R` collection with the remote one.
    pub async fn sync_kind<R: Record>(&self, session: &Session) -> SyncResult<usize> {
        let user_id = self.authorize(session).await?;

        let batch = self.remote.fetch_records(session, R::KIND).await?;
        let actual = batch.kind();
        let records = R::from_batch(batch).ok_or(SyncError::KindMismatch {
            expected: R::KIND,
            actual,
        })?;

        self.store.repository::<R>().replace_all(user_id, &records)?;
        tracing::info!(user_id = %user_id, kind = %R::KIND, count = records.len(), "Kind synced");
        Ok(records.len())
    }

    /// [`sync_kind`](Self::sync_kind) for a kind chosen at runtime.
    pub async fn sync_kind_dyn(&self, session: &Session, kind: RecordKind) -> SyncResult<usize> {
        match kind {
            RecordKind::Text => self.sync_kind::<TextRecord>(session).await,
            RecordKind::Binary => self.sync_kind::<BinaryRecord>(session).await,
            RecordKind::Credential => self.sync_kind::<CredentialRecord>(session).await,
            RecordKind::Card => self.sync_kind::<CardRecord>(session).await,
        }
    }

    /// Replace every local collection atomically.
    pub async fn sync_all(&self, session: &Session) -> SyncResult<SyncReport> {
        let user_id = self.authorize(session).await?;
        let snapshot = self.remote.fetch_snapshot(session).await?;

        let mut uow = self.store.unit_of_work();
        uow.begin()?;

        let result = apply_snapshot(&uow, user_id, &snapshot).and_then(|report| {
            uow.commit()?;
            Ok(report)
        });

        match result {
            Ok(report) => {
                tracing::info!(
                    user_id = %user_id,
                    total = report.total(),
                    "Full sync committed"
                );
                Ok(report)
            }
            Err(err) => {
                if let Err(rollback_err) = uow.rollback() {
                    tracing::warn!(error = %rollback_err, "Rollback after failed sync failed");
                }
                tracing::warn!(user_id = %user_id, error = %err, "Full sync rolled back");
                Err(err.into())
            }
        }
    }

    /// The token must be valid and must assert the session's own user.
    async fn authorize(&self, session: &Session) -> SyncResult<Uuid> {
        let user_id = self.guard.validate(&session.token).await?;
        if user_id != session.user_id {
            tracing::warn!(
                session_user = %session.user_id,
                token_user = %user_id,
                "Session token asserts a different user"
            );
            return Err(AuthError::InvalidToken.into());
        }
        Ok(user_id)
    }
}

/// Replace each kind in sync order through the unit's repositories.
fn apply_snapshot(uow: &UnitOfWork<'_>, user_id: Uuid, snapshot: &Snapshot) -> StorageResult<SyncReport> {
    uow.texts()?.replace_all(user_id, &snapshot.texts)?;
    uow.binaries()?.replace_all(user_id, &snapshot.binaries)?;
    uow.credentials()?.replace_all(user_id, &snapshot.credentials)?;
    uow.cards()?.replace_all(user_id, &snapshot.cards)?;

    Ok(SyncReport {
        texts: snapshot.texts.len(),
        binaries: snapshot.binaries.len(),
        credentials: snapshot.credentials.len(),
        cards: snapshot.cards.len(),
    })
}
