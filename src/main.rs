// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum_server::{tls_rustls::RustlsConfig, Handle};
use tracing_subscriber::EnvFilter;

use vaultsync::api::router;
use vaultsync::auth::TokenIssuer;
use vaultsync::config::{LogFormat, ServerConfig};
use vaultsync::crypto::CryptoService;
use vaultsync::server::RecordVault;
use vaultsync::state::AppState;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));

    match LogFormat::from_env() {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

#[tokio::main]
async fn main() {
    // Install the ring crypto provider for rustls (must be done before any TLS operations)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    init_tracing();

    let config = ServerConfig::from_env().expect("Invalid server configuration");
    tracing::info!(?config, "Configuration loaded");

    let private_pem = std::fs::read(&config.token_private_key_path)
        .expect("Failed to read token signing key");
    let public_pem = std::fs::read(&config.token_public_key_path)
        .expect("Failed to read token verification key");
    let issuer = TokenIssuer::from_pem(&private_pem, &public_pem, config.token_ttl_secs)
        .expect("Invalid token key pair");

    let crypto =
        CryptoService::new(&config.encryption_key).expect("Invalid SERVER_ENCRYPTION_KEY");
    let vault = RecordVault::open(&config.data_dir, crypto).expect("Failed to open record vault");

    let state = AppState::new(vault, issuer);
    let app = router(state);

    let tls_config = RustlsConfig::from_pem_file(&config.tls_cert_path, &config.tls_key_path)
        .await
        .expect("Failed to load TLS certificate");

    // Stop accepting on Ctrl-C and let in-flight requests finish
    let handle = Handle::new();
    let shutdown = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received");
            shutdown.graceful_shutdown(Some(std::time::Duration::from_secs(10)));
        }
    });

    tracing::info!(addr = %config.bind_addr, "vaultsync server listening");

    // TLS is mandatory, there is no HTTP listener
    axum_server::bind_rustls(config.bind_addr, tls_config)
        .handle(handle)
        .serve(app.into_make_service())
        .await
        .expect("HTTPS server failed");

    tracing::info!("Server stopped");
}
