// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Persisted pairing secrets.
//!
//! Neither record ever holds a plaintext secret: codes and refresh tokens are
//! stored as lowercase hex SHA-256 digests and looked up by that digest.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A one-time pairing code issued to an authenticated web user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredDeviceCode {
    /// Unique record identifier (UUID)
    pub id: String,
    /// Account the code was issued for
    pub user_id: String,
    /// SHA-256 of the normalized plaintext code
    pub code_hash: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Set once, by the exchange that won the code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consumed_at: Option<DateTime<Utc>>,
}

impl StoredDeviceCode {
    /// Usable means not yet consumed and strictly before expiry.
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.consumed_at.is_none() && now < self.expires_at
    }

    /// Stale codes are the ones a new pairing request may purge.
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        !self.is_usable(now)
    }
}

/// One paired device session.
///
/// Rotation rewrites `token_hash`, `expires_at` and `last_used_at` in place,
/// so a record lives for as long as the device stays signed in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredRefreshToken {
    /// Unique record identifier (UUID)
    pub id: String,
    pub user_id: String,
    /// SHA-256 of the current plaintext refresh token
    pub token_hash: String,
    /// Opaque per-device identifier minted at exchange time
    pub device_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Terminal: a revoked record is kept but never usable again
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revoked_at: Option<DateTime<Utc>>,
}

impl StoredRefreshToken {
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.revoked_at.is_none() && now < self.expires_at
    }
}
