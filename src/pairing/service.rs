// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Pairing, token exchange and refresh-token rotation.
//!
//! ## Device-code lifecycle
//!
//! ```text
//! ISSUED ──exchange──▶ CONSUMED
//!    └──── 10 min ───▶ EXPIRED
//! ```
//!
//! Both end states are terminal. A code yields at most one token pair: the
//! conditional consume in the store picks a single winner and every loser is
//! reported exactly like an unknown code.

use std::sync::Arc;

use chrono::Duration;
use ring::rand::SystemRandom;
use tracing::{debug, info, warn};

use super::secrets::{
    generate_device_code, generate_device_id, generate_refresh_token, hash_secret,
    normalize_code, RandomError,
};
use crate::auth::{authenticate, MobileIdentity, TokenCodec};
use crate::clock::Clock;
use crate::storage::{NewRefreshToken, SecretStore, StoreError};

/// Device code lifetime (10 minutes).
pub const DEVICE_CODE_TTL_SECS: i64 = 10 * 60;

/// Refresh token lifetime, renewed on every rotation (90 days).
pub const REFRESH_TOKEN_TTL_DAYS: i64 = 90;

/// Fresh codes drawn when the store reports the hash is held by a live code.
const DEVICE_CODE_DRAWS: usize = 5;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Unknown, expired, consumed or revoked credential, or a lost race.
    #[error("invalid or expired credential")]
    InvalidCredential,

    #[error("secret store error: {0}")]
    Store(#[from] StoreError),

    #[error("token signing error: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),

    #[error(transparent)]
    Random(#[from] RandomError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// A freshly issued pairing code. The plaintext exists only here.
#[derive(Debug, Clone)]
pub struct PairingCode {
    pub code: String,
    /// Seconds until expiry
    pub expires_in: i64,
}

/// Credentials handed to a mobile client.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    /// Plaintext refresh token; only its hash is kept server-side
    pub refresh_token: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
}

/// Mobile pairing protocol over a [`SecretStore`].
pub struct PairingService {
    store: Arc<dyn SecretStore>,
    codec: TokenCodec,
    clock: Arc<dyn Clock>,
    rng: SystemRandom,
}

impl PairingService {
    pub fn new(store: Arc<dyn SecretStore>, codec: TokenCodec, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            codec,
            clock,
            rng: SystemRandom::new(),
        }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    pub fn store(&self) -> &Arc<dyn SecretStore> {
        &self.store
    }

    /// Issue a pairing code for an already-authenticated web user.
    ///
    /// Stale codes of that user are purged first; there is no background
    /// cleanup.
    pub fn request_pairing_code(&self, user_id: &str) -> ServiceResult<PairingCode> {
        let now = self.clock.now();

        let purged = self.store.purge_stale_device_codes(user_id, now)?;
        if purged > 0 {
            debug!(user_id = %user_id, purged, "Purged stale device codes");
        }

        let expires_at = now + Duration::seconds(DEVICE_CODE_TTL_SECS);
        let mut draws = 0;
        loop {
            draws += 1;
            let code = generate_device_code(&self.rng)?;
            match self
                .store
                .create_device_code(user_id, &hash_secret(&code), expires_at, now)
            {
                Ok(record) => {
                    info!(user_id = %user_id, code_id = %record.id, "Issued device code");
                    return Ok(PairingCode {
                        code,
                        expires_in: DEVICE_CODE_TTL_SECS,
                    });
                }
                Err(StoreError::AlreadyExists(_)) if draws < DEVICE_CODE_DRAWS => {
                    warn!(user_id = %user_id, draws, "Device code collided with a live code");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Trade a pairing code for a token pair, binding a new device.
    pub fn exchange(&self, code: &str, device_name: Option<&str>) -> ServiceResult<TokenPair> {
        let now = self.clock.now();
        let code_hash = hash_secret(&normalize_code(code));

        let Some(device_code) = self.store.find_usable_device_code(&code_hash, now)? else {
            debug!("Exchange rejected: no usable device code");
            return Err(ServiceError::InvalidCredential);
        };

        if !self.store.consume_device_code(&device_code.id, now)? {
            warn!(code_id = %device_code.id, "Exchange lost race for device code");
            return Err(ServiceError::InvalidCredential);
        }

        let device_id = generate_device_id(&self.rng)?;
        let refresh_token = generate_refresh_token(&self.rng)?;
        self.store.create_refresh_token(
            NewRefreshToken {
                user_id: &device_code.user_id,
                token_hash: &hash_secret(&refresh_token),
                device_id: &device_id,
                device_name,
                expires_at: now + Duration::days(REFRESH_TOKEN_TTL_DAYS),
            },
            now,
        )?;

        let access_token = self.codec.issue(&device_code.user_id, &device_id)?;

        info!(
            user_id = %device_code.user_id,
            device_id = %device_id,
            device_name = device_name.unwrap_or("-"),
            "Device paired"
        );

        Ok(TokenPair {
            access_token,
            refresh_token,
            expires_in: self.codec.expires_in(),
        })
    }

    /// Rotate a refresh token and mint a new access token.
    ///
    /// The presented plaintext stops working as soon as this returns `Ok`.
    pub fn refresh(&self, refresh_token: &str) -> ServiceResult<TokenPair> {
        let now = self.clock.now();
        let current_hash = hash_secret(refresh_token);

        let Some(record) = self.store.find_usable_refresh_token(&current_hash, now)? else {
            debug!("Refresh rejected: no usable refresh token");
            return Err(ServiceError::InvalidCredential);
        };

        let next_token = generate_refresh_token(&self.rng)?;
        let rotated = self.store.rotate_refresh_token(
            &record.id,
            &current_hash,
            &hash_secret(&next_token),
            now + Duration::days(REFRESH_TOKEN_TTL_DAYS),
            now,
        )?;
        if !rotated {
            warn!(device_id = %record.device_id, "Refresh lost race for token rotation");
            return Err(ServiceError::InvalidCredential);
        }

        let access_token = self.codec.issue(&record.user_id, &record.device_id)?;

        debug!(user_id = %record.user_id, device_id = %record.device_id, "Refresh token rotated");

        Ok(TokenPair {
            access_token,
            refresh_token: next_token,
            expires_in: self.codec.expires_in(),
        })
    }

    /// Revoke a refresh token.
    ///
    /// Returns whether a live session was revoked; unknown and already
    /// revoked tokens return `Ok(false)` so callers can treat logout as
    /// idempotent.
    pub fn logout(&self, refresh_token: &str) -> ServiceResult<bool> {
        let revoked = self
            .store
            .revoke_refresh_token(&hash_secret(refresh_token), self.clock.now())?;
        if revoked {
            info!("Refresh token revoked");
        } else {
            debug!("Logout for unknown or already revoked token");
        }
        Ok(revoked)
    }

    /// Resolve an `Authorization` header value to a mobile identity.
    pub fn authenticate(&self, authorization: Option<&str>) -> Option<MobileIdentity> {
        authenticate(&self.codec, authorization)
    }
}
