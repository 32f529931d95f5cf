// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::state::AppState;

pub mod accounts;
pub mod health;
pub mod records;

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/auth/register", post(accounts::register))
        .route("/auth/login", post(accounts::login))
        .route("/auth/key", get(accounts::verification_key))
        .route(
            "/records",
            get(records::snapshot).post(records::create_record),
        )
        // `key` is a record kind for GET and a record id for PUT
        .route(
            "/records/{key}",
            get(records::list_records).put(records::update_record),
        )
        .with_state(state.clone());

    Router::new()
        .route("/health", get(health::health))
        .with_state(state)
        .nest("/v1", v1_routes)
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CredentialRecord, Record, TextRecord};
    use crate::testutil::{credential, note, test_state, VERIFYING_KEY_PEM};
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Vec<u8>) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }

    fn json_body(bytes: &[u8]) -> Value {
        serde_json::from_slice(bytes).unwrap()
    }

    async fn register(app: &Router, login: &str) -> String {
        let (status, body) = send(
            app,
            Method::POST,
            "/v1/auth/register",
            None,
            Some(json!({"login": login, "password": "pw"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        json_body(&body)["token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (state, _dir) = test_state();
        let app = router(state);
        let (status, body) = send(&app, Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json_body(&body)["status"], "ok");
    }

    #[tokio::test]
    async fn registration_and_login_rules() {
        let (state, _dir) = test_state();
        let app = router(state);
        register(&app, "alice").await;

        let creds = json!({"login": "alice", "password": "pw"});
        let (status, _) = send(&app, Method::POST, "/v1/auth/register", None, Some(creds.clone())).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, body) = send(&app, Method::POST, "/v1/auth/login", None, Some(creds)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(json_body(&body)["token"].is_string());

        let wrong = json!({"login": "alice", "password": "nope"});
        let (status, _) = send(&app, Method::POST, "/v1/auth/login", None, Some(wrong)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let empty = json!({"login": " ", "password": "pw"});
        let (status, body) = send(&app, Method::POST, "/v1/auth/register", None, Some(empty)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json_body(&body)["error"], "login is required");
    }

    #[tokio::test]
    async fn verification_key_is_served_as_pem() {
        let (state, _dir) = test_state();
        let app = router(state);
        let (status, body) = send(&app, Method::GET, "/v1/auth/key", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, VERIFYING_KEY_PEM.as_bytes());
    }

    #[tokio::test]
    async fn record_routes_require_a_token() {
        let (state, _dir) = test_state();
        let app = router(state);
        let (status, body) = send(&app, Method::GET, "/v1/records", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(&body)["error_code"], "missing_auth_header");

        let (status, _) = send(&app, Method::GET, "/v1/records/text", Some("garbage"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn record_lifecycle() {
        let (state, _dir) = test_state();
        let app = router(state);
        let token = register(&app, "bob").await;

        // Create with a server-assigned id
        let mut record = credential("site", "bob", "pw");
        record.id = uuid::Uuid::nil();
        let body = serde_json::to_value(record.clone().into_any()).unwrap();
        let (status, created) = send(&app, Method::POST, "/v1/records", Some(&token), Some(body)).await;
        assert_eq!(status, StatusCode::CREATED);
        record.id = serde_json::from_value(json_body(&created)["id"].clone()).unwrap();

        // Update
        record.password = "rotated".into();
        let body = serde_json::to_value(record.clone().into_any()).unwrap();
        let uri = format!("/v1/records/{}", record.id);
        let (status, _) = send(&app, Method::PUT, &uri, Some(&token), Some(body.clone())).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        // Path and body ids must agree
        let other = format!("/v1/records/{}", uuid::Uuid::new_v4());
        let (status, _) = send(&app, Method::PUT, &other, Some(&token), Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        // Unknown records are 404
        let ghost = note("ghost");
        let uri = format!("/v1/records/{}", ghost.id);
        let body = serde_json::to_value(ghost.into_any()).unwrap();
        let (status, _) = send(&app, Method::PUT, &uri, Some(&token), Some(body)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        // Per-kind listing
        let (status, body) = send(&app, Method::GET, "/v1/records/credential", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        let batch = serde_json::from_slice(&body).unwrap();
        assert_eq!(CredentialRecord::from_batch(batch).unwrap(), vec![record]);

        let (status, _) = send(&app, Method::GET, "/v1/records/wallet", Some(&token), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        // Snapshot
        let (status, body) = send(&app, Method::GET, "/v1/records", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        let snapshot = json_body(&body);
        assert_eq!(snapshot["credentials"].as_array().unwrap().len(), 1);
        assert!(snapshot["texts"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn users_only_see_their_own_records() {
        let (state, _dir) = test_state();
        let app = router(state);
        let alice = register(&app, "alice").await;
        let bob = register(&app, "bob").await;

        let body = serde_json::to_value(note("alice only").into_any()).unwrap();
        let (status, _) = send(&app, Method::POST, "/v1/records", Some(&alice), Some(body)).await;
        assert_eq!(status, StatusCode::CREATED);

        let (_, body) = send(&app, Method::GET, "/v1/records/text", Some(&bob), None).await;
        let batch = serde_json::from_slice(&body).unwrap();
        assert!(TextRecord::from_batch(batch).unwrap().is_empty());
    }
}
