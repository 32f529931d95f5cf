// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Concurrent fetch-all for the snapshot endpoint.
//!
//! The four per-kind fetch-and-decrypt jobs run as blocking tasks on a
//! [`JoinSet`]. Every task runs to completion; the first error to arrive is
//! the result and every other outcome is discarded. A partial snapshot is
//! never returned.

use std::sync::Arc;

use tokio::task::JoinSet;
use uuid::Uuid;

use super::vault::{RecordVault, VaultError, VaultResult};
use crate::models::{RecordKind, Snapshot};

/// Fetch and decrypt all four kinds for `user_id` concurrently.
pub async fn fetch_snapshot(vault: Arc<RecordVault>, user_id: Uuid) -> VaultResult<Snapshot> {
    let mut tasks = JoinSet::new();
    for kind in RecordKind::ALL {
        let vault = Arc::clone(&vault);
        tasks.spawn_blocking(move || vault.list_records(user_id, kind));
    }

    let batches = first_error_wins(tasks).await?;
    let mut snapshot = Snapshot::default();
    for batch in batches {
        snapshot.insert(batch);
    }
    Ok(snapshot)
}

/// Drain `tasks`, keeping either every value or the first error seen.
pub async fn first_error_wins<T: 'static>(mut tasks: JoinSet<VaultResult<T>>) -> VaultResult<Vec<T>> {
    let mut values = Vec::with_capacity(tasks.len());
    let mut first_error = None;

    while let Some(joined) = tasks.join_next().await {
        let outcome = joined
            .map_err(|e| VaultError::Task(e.to_string()))
            .and_then(|result| result);
        match outcome {
            Ok(value) => values.push(value),
            Err(err) if first_error.is_none() => first_error = Some(err),
            Err(err) => tracing::debug!(error = %err, "Discarding later fan-out error"),
        }
    }

    match first_error {
        Some(err) => Err(err),
        None => Ok(values),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{CryptoError, CryptoService};
    use crate::models::Record;
    use crate::testutil::{blob, card, credential, note};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn snapshot_contains_every_kind() {
        let dir = tempfile::tempdir().unwrap();
        let vault = Arc::new(RecordVault::open(dir.path(), CryptoService::new(&[1u8; 16]).unwrap()).unwrap());
        let user = Uuid::new_v4();
        vault.create_record(user, note("n").into_any()).unwrap();
        vault.create_record(user, blob("b", &[1]).into_any()).unwrap();
        vault.create_record(user, credential("c", "l", "p").into_any()).unwrap();
        vault.create_record(user, card("4111111111111111").into_any()).unwrap();
        vault.create_record(Uuid::new_v4(), note("other user").into_any()).unwrap();

        let snapshot = fetch_snapshot(vault, user).await.unwrap();
        assert_eq!(snapshot.texts.len(), 1);
        assert_eq!(snapshot.binaries.len(), 1);
        assert_eq!(snapshot.credentials.len(), 1);
        assert_eq!(snapshot.cards.len(), 1);
    }

    #[tokio::test]
    async fn decryption_failure_fails_the_whole_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let user = Uuid::new_v4();
        {
            let vault = RecordVault::open(dir.path(), CryptoService::new(&[1u8; 32]).unwrap()).unwrap();
            vault.create_record(user, credential("c", "l", "p").into_any()).unwrap();
        }

        let vault = Arc::new(RecordVault::open(dir.path(), CryptoService::new(&[2u8; 32]).unwrap()).unwrap());
        let err = fetch_snapshot(vault, user).await.unwrap_err();
        assert!(matches!(err, VaultError::Crypto(CryptoError::DecryptionFailed)));
    }

    #[tokio::test]
    async fn all_tasks_finish_and_first_error_is_reported() {
        let finished = Arc::new(AtomicUsize::new(0));
        let mut tasks = JoinSet::new();

        tasks.spawn_blocking(|| Err(VaultError::Task("first".into())));
        for _ in 0..3 {
            let finished = Arc::clone(&finished);
            tasks.spawn_blocking(move || {
                std::thread::sleep(Duration::from_millis(50));
                finished.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
        }

        let err = first_error_wins(tasks).await.unwrap_err();
        assert!(matches!(err, VaultError::Task(msg) if msg == "first"));
        assert_eq!(finished.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn all_values_are_collected_on_success() {
        let mut tasks = JoinSet::new();
        for i in 0..4 {
            tasks.spawn_blocking(move || Ok(i));
        }
        let mut values = first_error_wins(tasks).await.unwrap();
        values.sort();
        assert_eq!(values, vec![0, 1, 2, 3]);
    }
}
