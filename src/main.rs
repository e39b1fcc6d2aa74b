// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{error::Error, net::SocketAddr, sync::Arc};

use axum_server::tls_rustls::RustlsConfig;
use ring::rand::{SecureRandom, SystemRandom};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use device_pair::{
    api::router,
    auth::{SessionVerifier, TokenCodec},
    clock::{Clock, SystemClock},
    config::{Config, StorageLocation},
    logging::init_tracing,
    pairing::PairingService,
    rate_limit::FixedWindowLimiter,
    state::AppState,
    storage::{SecretDatabase, SecretStore},
};

const EPHEMERAL_SECRET_BYTES: usize = 32;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = Config::from_env()?;
    init_tracing(config.log_format);

    let store: Arc<dyn SecretStore> = match &config.storage {
        StorageLocation::InMemory => {
            warn!("Secret store is in memory; paired devices are lost on restart");
            Arc::new(SecretDatabase::in_memory()?)
        }
        StorageLocation::File(path) => {
            info!(path = %path.display(), "Opening secret store");
            Arc::new(SecretDatabase::open(path)?)
        }
    };

    let access_secret = match config.access_token_secret() {
        Some(secret) => secret.as_bytes().to_vec(),
        None => {
            warn!("MOBILE_JWT_SECRET not set; access tokens will not survive a restart");
            ephemeral_secret()?
        }
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let codec = TokenCodec::new(&access_secret, clock.clone());
    let limiter = FixedWindowLimiter::new(config.exchange_rate_limit_config(), clock.clone());

    let mut state = AppState::new(PairingService::new(store, codec, clock), Arc::new(limiter));
    match config.session_secret.as_deref() {
        Some(secret) => state = state.with_session_verifier(SessionVerifier::new(secret.as_bytes())),
        None => warn!("SESSION_SECRET not set; pairing-code requests will be rejected"),
    }

    let app = router(state).into_make_service_with_connect_info::<SocketAddr>();
    let addr = config.bind_addr;

    let shutdown = CancellationToken::new();
    tokio::spawn(wait_for_shutdown_signal(shutdown.clone()));

    match &config.tls {
        Some(tls) => {
            // Must be installed before any TLS operation
            rustls::crypto::ring::default_provider()
                .install_default()
                .map_err(|_| "failed to install rustls crypto provider")?;
            let tls_config = RustlsConfig::from_pem_file(&tls.cert, &tls.key).await?;

            info!(%addr, "Device pair server listening on https (docs at /docs)");
            tokio::select! {
                result = axum_server::bind_rustls(addr, tls_config).serve(app) => result?,
                _ = shutdown.cancelled() => {}
            }
        }
        None => {
            let listener = tokio::net::TcpListener::bind(addr).await?;
            info!(%addr, "Device pair server listening on http (docs at /docs)");
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown.clone().cancelled_owned())
                .await?;
        }
    }

    info!("Server stopped");
    Ok(())
}

/// Per-process signing secret for when none is configured.
fn ephemeral_secret() -> Result<Vec<u8>, &'static str> {
    let mut bytes = vec![0u8; EPHEMERAL_SECRET_BYTES];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| "secure random source unavailable")?;
    Ok(bytes)
}

/// Cancel `shutdown` on Ctrl+C or SIGTERM.
async fn wait_for_shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C signal"),
        _ = terminate => info!("Received terminate signal"),
    }

    shutdown.cancel();
}
