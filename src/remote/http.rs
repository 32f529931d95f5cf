// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTPS client for the vaultsync service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;
use uuid::Uuid;

use super::{RemoteError, RemoteResult, SecretService};
use crate::models::{
    AnyRecord, CreatedResponse, LoginRequest, RecordBatch, RecordKind, Session, Snapshot,
    TokenResponse,
};

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            RemoteError::InvalidResponse(err.to_string())
        } else {
            RemoteError::Connection(err.to_string())
        }
    }
}

/// [`SecretService`] over HTTPS with JSON bodies and bearer tokens.
#[derive(Debug, Clone)]
pub struct HttpSecretService {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpSecretService {
    /// Client for the service at `base_url`.
    ///
    /// `ca_pem` adds a trusted root for deployments with a private CA.
    pub fn new(base_url: Url, timeout: Duration, ca_pem: Option<&[u8]>) -> RemoteResult<Self> {
        if base_url.cannot_be_a_base() {
            return Err(RemoteError::Connection(format!(
                "{base_url} cannot be used as a service URL"
            )));
        }

        let mut builder = reqwest::Client::builder().use_rustls_tls().timeout(timeout);
        if let Some(pem) = ca_pem {
            let cert = reqwest::Certificate::from_pem(pem)
                .map_err(|e| RemoteError::Connection(format!("invalid CA certificate: {e}")))?;
            builder = builder.add_root_certificate(cert);
        }
        let client = builder
            .build()
            .map_err(|e| RemoteError::Connection(format!("failed to build HTTP client: {e}")))?;

        // Url::join drops the last segment unless the base ends with '/'
        let mut base_url = base_url;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> RemoteResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| RemoteError::Connection(format!("invalid request URL {path}: {e}")))
    }

    async fn authenticate(&self, path: &str, login: &str, password: &str) -> RemoteResult<String> {
        let body = LoginRequest {
            login: login.to_string(),
            password: password.to_string(),
        };
        let response = self.client.post(self.url(path)?).json(&body).send().await?;
        let token: TokenResponse = json(check(response).await?).await?;
        Ok(token.token)
    }
}

#[async_trait]
impl SecretService for HttpSecretService {
    async fn register(&self, login: &str, password: &str) -> RemoteResult<String> {
        self.authenticate("v1/auth/register", login, password).await
    }

    async fn login(&self, login: &str, password: &str) -> RemoteResult<String> {
        self.authenticate("v1/auth/login", login, password).await
    }

    async fn verification_key(&self) -> RemoteResult<Vec<u8>> {
        let response = self.client.get(self.url("v1/auth/key")?).send().await?;
        let bytes = check(response).await?.bytes().await?;
        Ok(bytes.to_vec())
    }

    async fn create_record(&self, session: &Session, record: AnyRecord) -> RemoteResult<Uuid> {
        let response = self
            .client
            .post(self.url("v1/records")?)
            .bearer_auth(&session.token)
            .json(&record)
            .send()
            .await?;
        let created: CreatedResponse = json(check(response).await?).await?;
        Ok(created.id)
    }

    async fn update_record(&self, session: &Session, record: AnyRecord) -> RemoteResult<()> {
        let response = self
            .client
            .put(self.url(&format!("v1/records/{}", record.id()))?)
            .bearer_auth(&session.token)
            .json(&record)
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn fetch_records(&self, session: &Session, kind: RecordKind) -> RemoteResult<RecordBatch> {
        let response = self
            .client
            .get(self.url(&format!("v1/records/{kind}"))?)
            .bearer_auth(&session.token)
            .send()
            .await?;
        let batch: RecordBatch = json(check(response).await?).await?;
        if batch.kind() != kind {
            return Err(RemoteError::InvalidResponse(format!(
                "asked for {kind} records, got {}",
                batch.kind()
            )));
        }
        Ok(batch)
    }

    /// One request; the service fans out per kind on its side.
    async fn fetch_snapshot(&self, session: &Session) -> RemoteResult<Snapshot> {
        let response = self
            .client
            .get(self.url("v1/records")?)
            .bearer_auth(&session.token)
            .send()
            .await?;
        json(check(response).await?).await
    }
}

/// Turn non-2xx responses into the matching [`RemoteError`].
async fn check(response: Response) -> RemoteResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    tracing::debug!(status = %status, "Remote service rejected request");
    Err(status_error(status, &body))
}

fn status_error(status: StatusCode, body: &str) -> RemoteError {
    match status {
        StatusCode::UNAUTHORIZED => RemoteError::Unauthorized,
        StatusCode::CONFLICT => RemoteError::LoginConflict,
        StatusCode::NOT_FOUND => RemoteError::NotFound,
        StatusCode::BAD_REQUEST => RemoteError::BadRequest(error_message(body)),
        other => RemoteError::Unexpected {
            status: other.as_u16(),
        },
    }
}

/// The `error` field of a JSON error body, or the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| value.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

async fn json<T: DeserializeOwned>(response: Response) -> RemoteResult<T> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| RemoteError::InvalidResponse(e.to_string()))
}
