// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Remote Secret Service
//!
//! The agent talks to the authoritative service through [`SecretService`].
//! [`HttpSecretService`] is the production implementation; tests substitute
//! an in-memory fake.

pub mod http;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{AnyRecord, RecordBatch, RecordKind, Session, Snapshot};

pub use http::HttpSecretService;

/// Failures reported by the remote service or the channel to it.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("unauthorized")]
    Unauthorized,

    #[error("login is already taken")]
    LoginConflict,

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found")]
    NotFound,

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("unexpected status {status}")]
    Unexpected { status: u16 },

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Operations the agent needs from the remote service.
#[async_trait]
pub trait SecretService: Send + Sync {
    /// Create an account and return a session token.
    async fn register(&self, login: &str, password: &str) -> RemoteResult<String>;

    /// Authenticate and return a session token.
    async fn login(&self, login: &str, password: &str) -> RemoteResult<String>;

    /// Current token verification key (Ed25519 public key, PEM).
    async fn verification_key(&self) -> RemoteResult<Vec<u8>>;

    /// Store a new record; the service assigns the id.
    async fn create_record(&self, session: &Session, record: AnyRecord) -> RemoteResult<Uuid>;

    async fn update_record(&self, session: &Session, record: AnyRecord) -> RemoteResult<()>;

    /// Every record of `kind` owned by the session's user.
    async fn fetch_records(&self, session: &Session, kind: RecordKind) -> RemoteResult<RecordBatch>;

    /// All four kinds at once. The default issues the per-kind fetches
    /// concurrently and fails if any of them fails.
    async fn fetch_snapshot(&self, session: &Session) -> RemoteResult<Snapshot> {
        let (texts, binaries, credentials, cards) = tokio::try_join!(
            self.fetch_records(session, RecordKind::Text),
            self.fetch_records(session, RecordKind::Binary),
            self.fetch_records(session, RecordKind::Credential),
            self.fetch_records(session, RecordKind::Card),
        )?;

        let mut snapshot = Snapshot::default();
        for (expected, batch) in [
            (RecordKind::Text, texts),
            (RecordKind::Binary, binaries),
            (RecordKind::Credential, credentials),
            (RecordKind::Card, cards),
        ] {
            if batch.kind() != expected {
                return Err(RemoteError::InvalidResponse(format!(
                    "asked for {expected} records, got {}",
                    batch.kind()
                )));
            }
            snapshot.insert(batch);
        }
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{card, credential, note, FakeService};

    #[tokio::test]
    async fn default_snapshot_collects_every_kind() {
        let remote = FakeService::new();
        let user = Uuid::new_v4();
        let session = Session {
            user_id: user,
            token: remote.token_for(user),
        };
        remote.set_snapshot(
            user,
            Snapshot {
                texts: vec![note("n1"), note("n2")],
                binaries: vec![],
                credentials: vec![credential("site", "bob", "pw")],
                cards: vec![card("4111111111111111")],
            },
        );

        let snapshot = remote.fetch_snapshot(&session).await.unwrap();
        assert_eq!(snapshot.texts.len(), 2);
        assert!(snapshot.binaries.is_empty());
        assert_eq!(snapshot.credentials[0].login, "bob");
        assert_eq!(snapshot.cards.len(), 1);
    }

    #[tokio::test]
    async fn default_snapshot_fails_as_a_whole() {
        let remote = FakeService::new();
        let user = Uuid::new_v4();
        let session = Session {
            user_id: user,
            token: "not-a-token".into(),
        };
        assert!(matches!(
            remote.fetch_snapshot(&session).await,
            Err(RemoteError::Unauthorized)
        ));
    }
}
