// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::SessionVerifier;
use crate::pairing::PairingService;
use crate::rate_limit::RateLimiter;

#[derive(Clone)]
pub struct AppState {
    pub pairing: Arc<PairingService>,
    /// `None` when no session secret is configured; pairing-code requests
    /// are then always rejected.
    pub sessions: Option<Arc<SessionVerifier>>,
    pub exchange_limiter: Arc<dyn RateLimiter>,
}

impl AppState {
    pub fn new(pairing: PairingService, exchange_limiter: Arc<dyn RateLimiter>) -> Self {
        Self {
            pairing: Arc::new(pairing),
            sessions: None,
            exchange_limiter,
        }
    }

    pub fn with_session_verifier(mut self, verifier: SessionVerifier) -> Self {
        self.sessions = Some(Arc::new(verifier));
        self
    }
}

#[cfg(test)]
pub mod test_support {
    use super::*;
    use crate::auth::TokenCodec;
    use crate::clock::{Clock, ManualClock};
    use crate::rate_limit::{FixedWindowLimiter, RateLimitConfig};
    use crate::storage::{
        NewRefreshToken, SecretDatabase, SecretStore, StoreError, StoreResult, StoredDeviceCode,
        StoredRefreshToken,
    };
    use chrono::{DateTime, Utc};

    pub const TEST_ACCESS_SECRET: &[u8] = b"test-mobile-access-secret";
    pub const TEST_SESSION_SECRET: &[u8] = b"test-web-session-secret";

    /// State over an in-memory store, driven by a manual clock that starts
    /// at the current wall time (session tokens are checked against it).
    pub fn test_state() -> (AppState, ManualClock) {
        let store: Arc<dyn SecretStore> =
            Arc::new(SecretDatabase::in_memory().expect("in-memory database"));
        state_over(store)
    }

    /// Same wiring as [`test_state`], over a store where every call fails.
    pub fn failing_state() -> (AppState, ManualClock) {
        state_over(Arc::new(FailingStore))
    }

    fn state_over(store: Arc<dyn SecretStore>) -> (AppState, ManualClock) {
        let clock = ManualClock::new(Utc::now());
        let clock_arc: Arc<dyn Clock> = Arc::new(clock.clone());

        let codec = TokenCodec::new(TEST_ACCESS_SECRET, clock_arc.clone());
        let limiter = FixedWindowLimiter::new(RateLimitConfig::default(), clock_arc.clone());

        let state = AppState::new(PairingService::new(store, codec, clock_arc), Arc::new(limiter))
            .with_session_verifier(SessionVerifier::new(TEST_SESSION_SECRET));
        (state, clock)
    }

    /// Store whose disk went away.
    pub struct FailingStore;

    fn offline<T>() -> StoreResult<T> {
        Err(StoreError::Io(std::io::Error::other("secret store offline")))
    }

    impl SecretStore for FailingStore {
        fn create_device_code(
            &self,
            _user_id: &str,
            _code_hash: &str,
            _expires_at: DateTime<Utc>,
            _now: DateTime<Utc>,
        ) -> StoreResult<StoredDeviceCode> {
            offline()
        }

        fn find_usable_device_code(
            &self,
            _code_hash: &str,
            _now: DateTime<Utc>,
        ) -> StoreResult<Option<StoredDeviceCode>> {
            offline()
        }

        fn consume_device_code(&self, _id: &str, _now: DateTime<Utc>) -> StoreResult<bool> {
            offline()
        }

        fn purge_stale_device_codes(&self, _user_id: &str, _now: DateTime<Utc>) -> StoreResult<usize> {
            offline()
        }

        fn create_refresh_token(
            &self,
            _token: NewRefreshToken<'_>,
            _now: DateTime<Utc>,
        ) -> StoreResult<StoredRefreshToken> {
            offline()
        }

        fn find_usable_refresh_token(
            &self,
            _token_hash: &str,
            _now: DateTime<Utc>,
        ) -> StoreResult<Option<StoredRefreshToken>> {
            offline()
        }

        fn rotate_refresh_token(
            &self,
            _id: &str,
            _current_hash: &str,
            _new_hash: &str,
            _new_expires_at: DateTime<Utc>,
            _now: DateTime<Utc>,
        ) -> StoreResult<bool> {
            offline()
        }

        fn revoke_refresh_token(&self, _token_hash: &str, _now: DateTime<Utc>) -> StoreResult<bool> {
            offline()
        }

        fn ping(&self) -> StoreResult<()> {
            offline()
        }
    }
}
