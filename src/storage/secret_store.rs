// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Data-access contract for pairing secrets.
//!
//! Every method is atomic with respect to concurrent callers. The two
//! conditional updates (`consume_device_code`, `rotate_refresh_token`) report
//! whether they won, which is what makes one-time use hold under races.

use chrono::{DateTime, Utc};

use super::records::{StoredDeviceCode, StoredRefreshToken};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("already exists: {0}")]
    AlreadyExists(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Fields for a new refresh-token record.
#[derive(Debug, Clone)]
pub struct NewRefreshToken<'a> {
    pub user_id: &'a str,
    pub token_hash: &'a str,
    pub device_id: &'a str,
    pub device_name: Option<&'a str>,
    pub expires_at: DateTime<Utc>,
}

pub trait SecretStore: Send + Sync {
    /// Persist a freshly issued pairing code.
    ///
    /// Fails with [`StoreError::AlreadyExists`] while a usable code already
    /// holds `code_hash`.
    fn create_device_code(
        &self,
        user_id: &str,
        code_hash: &str,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> StoreResult<StoredDeviceCode>;

    /// Only matches codes that are unconsumed and unexpired at `now`.
    fn find_usable_device_code(
        &self,
        code_hash: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<StoredDeviceCode>>;

    /// Mark a code consumed if, and only if, it is still usable.
    ///
    /// Returns `false` when another caller already consumed it or it expired
    /// in the meantime.
    fn consume_device_code(&self, id: &str, now: DateTime<Utc>) -> StoreResult<bool>;

    /// Delete expired or consumed codes belonging to `user_id`.
    fn purge_stale_device_codes(&self, user_id: &str, now: DateTime<Utc>) -> StoreResult<usize>;

    fn create_refresh_token(
        &self,
        token: NewRefreshToken<'_>,
        now: DateTime<Utc>,
    ) -> StoreResult<StoredRefreshToken>;

    /// Only matches unrevoked, unexpired records holding exactly this hash.
    fn find_usable_refresh_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<StoredRefreshToken>>;

    /// Replace the hash and expiry of record `id` in place.
    ///
    /// Conditional on the record still holding `current_hash` and still being
    /// usable; a racing second rotation of the same plaintext gets `false`.
    fn rotate_refresh_token(
        &self,
        id: &str,
        current_hash: &str,
        new_hash: &str,
        new_expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> StoreResult<bool>;

    /// Set `revoked_at` on the record holding `token_hash`.
    ///
    /// Returns whether a record changed; unknown and already-revoked tokens
    /// both return `false`.
    fn revoke_refresh_token(&self, token_hash: &str, now: DateTime<Utc>) -> StoreResult<bool>;

    /// Cheap liveness check for health endpoints.
    fn ping(&self) -> StoreResult<()>;
}
