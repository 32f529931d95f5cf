// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Local Agent
//!
//! [`Agent`] is the application context of a local client: the encrypted
//! store, the key-material store, the token guard, the remote service and the
//! current session. There is no global state; every use case runs against an
//! `Agent` value.
//!
//! Writes go to the remote service first. The local copy is only touched once
//! the service has accepted the change, so a failed call never leaves a record
//! that exists locally but not remotely.

use std::sync::Arc;

use uuid::Uuid;

use crate::auth::{AuthError, TokenGuard};
use crate::config::{AgentConfig, ConfigError};
use crate::crypto::{CryptoError, CryptoService};
use crate::models::{Record, RecordKind, Session};
use crate::remote::{HttpSecretService, RemoteError, SecretService};
use crate::storage::{KeyMaterialStore, LocalStore, StorageError};
use crate::sync::{SyncError, SyncOrchestrator, SyncReport};

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("not logged in")]
    NotLoggedIn,

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl AgentError {
    /// Whether the user has to log in again before retrying.
    pub fn requires_reauth(&self) -> bool {
        match self {
            AgentError::NotLoggedIn => true,
            AgentError::Auth(err) | AgentError::Sync(SyncError::Auth(err)) => is_session_error(err),
            AgentError::Remote(RemoteError::Unauthorized)
            | AgentError::Sync(SyncError::Remote(RemoteError::Unauthorized)) => true,
            _ => false,
        }
    }
}

fn is_session_error(err: &AuthError) -> bool {
    matches!(
        err,
        AuthError::InvalidToken
            | AuthError::TokenExpired
            | AuthError::InvalidSignature
            | AuthError::MalformedToken
    )
}

pub type AgentResult<T> = Result<T, AgentError>;

/// Local client bound to one store and one remote service.
pub struct Agent<S: SecretService + ?Sized> {
    store: Arc<LocalStore>,
    keyring: KeyMaterialStore,
    guard: TokenGuard<S>,
    remote: Arc<S>,
    session: Option<Session>,
}

impl Agent<HttpSecretService> {
    /// Open the local store and connect to the configured service.
    pub fn from_config(config: &AgentConfig) -> AgentResult<Self> {
        let crypto = Arc::new(CryptoService::new(&config.encryption_key)?);
        let store = Arc::new(LocalStore::open(&config.data_dir, crypto)?);

        let ca_pem = match &config.ca_cert_path {
            Some(path) => Some(std::fs::read(path)?),
            None => None,
        };
        let remote = HttpSecretService::new(
            config.server_url.clone(),
            config.timeout,
            ca_pem.as_deref(),
        )?;

        Self::open(store, Arc::new(remote))
    }

    pub fn from_env() -> AgentResult<Self> {
        Self::from_config(&AgentConfig::from_env()?)
    }
}

impl<S: SecretService + ?Sized> Agent<S> {
    /// Build an agent, restoring the session and key a previous run persisted.
    pub fn open(store: Arc<LocalStore>, remote: Arc<S>) -> AgentResult<Self> {
        let keyring = store.keyring();
        let session = keyring.load_session()?;
        let guard = TokenGuard::load(Arc::clone(&remote), keyring.clone())?;

        if let Some(session) = &session {
            tracing::debug!(user_id = %session.user_id, "Restored persisted session");
        }

        Ok(Self {
            store,
            keyring,
            guard,
            remote,
            session,
        })
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.session.as_ref().map(|session| session.user_id)
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    pub fn guard(&self) -> &TokenGuard<S> {
        &self.guard
    }

    // -------------------------------------------------------------------------
    // Session lifecycle
    // -------------------------------------------------------------------------

    /// Create an account and log in as it.
    pub async fn register(&mut self, login: &str, password: &str) -> AgentResult<Uuid> {
        let token = self.remote.register(login, password).await?;
        self.establish(token).await
    }

    pub async fn login(&mut self, login: &str, password: &str) -> AgentResult<Uuid> {
        let token = self.remote.login(login, password).await?;
        self.establish(token).await
    }

    /// Forget the session and the verification key.
    pub async fn logout(&mut self) -> AgentResult<()> {
        self.keyring.clear_session()?;
        self.guard.forget_key().await?;
        if let Some(session) = self.session.take() {
            tracing::info!(user_id = %session.user_id, "Logged out");
        }
        Ok(())
    }

    async fn establish(&mut self, token: String) -> AgentResult<Uuid> {
        let user_id = self.guard.validate(&token).await?;
        self.store.ensure_namespace(user_id)?;

        let session = Session { user_id, token };
        self.keyring.save_session(&session)?;
        self.session = Some(session);

        tracing::info!(user_id = %user_id, "Session established");
        Ok(user_id)
    }

    /// The current session, with its token checked by the guard.
    async fn authenticate(&self) -> AgentResult<&Session> {
        let session = self.session.as_ref().ok_or(AgentError::NotLoggedIn)?;
        let user_id = self.guard.validate(&session.token).await?;
        if user_id != session.user_id {
            tracing::warn!(
                session_user = %session.user_id,
                token_user = %user_id,
                "Session token names another user"
            );
            return Err(AuthError::InvalidToken.into());
        }
        Ok(session)
    }

    // -------------------------------------------------------------------------
    // Records
    // -------------------------------------------------------------------------

    /// Store `record` remotely, then locally under the id the service chose.
    pub async fn create<R: Record>(&self, mut record: R) -> AgentResult<R> {
        let session = self.authenticate().await?;
        let id = self
            .remote
            .create_record(session, record.clone().into_any())
            .await?;
        record.set_id(id);

        self.store.repository::<R>().create(session.user_id, &record)?;
        tracing::info!(user_id = %session.user_id, kind = %R::KIND, record_id = %id, "Record created");
        Ok(record)
    }

    pub async fn update<R: Record>(&self, record: &R) -> AgentResult<()> {
        let session = self.authenticate().await?;
        self.remote
            .update_record(session, record.clone().into_any())
            .await?;
        self.store.repository::<R>().update(session.user_id, record)?;
        Ok(())
    }

    /// Read one record from the local store.
    pub async fn show<R: Record>(&self, id: Uuid) -> AgentResult<R> {
        let session = self.authenticate().await?;
        Ok(self.store.repository::<R>().get(session.user_id, id)?)
    }

    /// Every local record of kind `R`.
    pub async fn list<R: Record>(&self) -> AgentResult<Vec<R>> {
        let session = self.authenticate().await?;
        Ok(self.store.repository::<R>().get_all(session.user_id)?)
    }

    // -------------------------------------------------------------------------
    // Sync
    // -------------------------------------------------------------------------

    fn orchestrator(&self) -> SyncOrchestrator<'_, S> {
        SyncOrchestrator::new(&self.store, &self.guard, &*self.remote)
    }

    pub async fn sync<R: Record>(&self) -> AgentResult<usize> {
        let session = self.session.as_ref().ok_or(AgentError::NotLoggedIn)?;
        Ok(self.orchestrator().sync_kind::<R>(session).await?)
    }

    pub async fn sync_kind(&self, kind: RecordKind) -> AgentResult<usize> {
        let session = self.session.as_ref().ok_or(AgentError::NotLoggedIn)?;
        Ok(self.orchestrator().sync_kind_dyn(session, kind).await?)
    }

    /// Replace every local kind with the remote state in one unit of work.
    pub async fn sync_all(&self) -> AgentResult<SyncReport> {
        let session = self.session.as_ref().ok_or(AgentError::NotLoggedIn)?;
        Ok(self.orchestrator().sync_all(session).await?)
    }
}
