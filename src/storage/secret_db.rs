// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded secret database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `device_codes`: code id → serialized StoredDeviceCode
//! - `device_code_hashes`: code hash → code id
//! - `user_device_codes`: composite key (len(user_id)|user_id|code id) → code id
//! - `refresh_tokens`: record id → serialized StoredRefreshToken
//! - `refresh_token_hashes`: current token hash → record id
//!
//! redb serializes write transactions, so every read-check-write sequence
//! below runs inside a single `begin_write()` and cannot interleave with
//! another writer.

use std::path::Path;

use chrono::{DateTime, Utc};
use redb::{
    backends::InMemoryBackend, Database, ReadableDatabase, ReadableTable, TableDefinition,
};
use uuid::Uuid;

use super::records::{StoredDeviceCode, StoredRefreshToken};
use super::secret_store::{NewRefreshToken, SecretStore, StoreError, StoreResult};

// =============================================================================
// Table Definitions
// =============================================================================

const DEVICE_CODES: TableDefinition<&str, &[u8]> = TableDefinition::new("device_codes");

/// Lookup by hash. A new code may only take over an entry whose code is no
/// longer usable.
const DEVICE_CODE_HASHES: TableDefinition<&str, &str> = TableDefinition::new("device_code_hashes");

/// Per-user index used by the lazy purge on each pairing request.
const USER_DEVICE_CODES: TableDefinition<&[u8], &str> = TableDefinition::new("user_device_codes");

const REFRESH_TOKENS: TableDefinition<&str, &[u8]> = TableDefinition::new("refresh_tokens");

/// Only the current hash of each record is indexed.
const REFRESH_TOKEN_HASHES: TableDefinition<&str, &str> =
    TableDefinition::new("refresh_token_hashes");

// =============================================================================
// Index Key Helpers
// =============================================================================

/// Format: `len(user_id) as u32 BE | user_id | code_id`.
///
/// The length prefix keeps one user's range from containing another user's
/// keys, whatever bytes the user id holds.
fn make_user_key(user_id: &str, code_id: &str) -> Vec<u8> {
    let mut key = make_user_prefix(user_id);
    key.extend_from_slice(code_id.as_bytes());
    key
}

fn make_user_prefix(user_id: &str) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(4 + user_id.len());
    prefix.extend_from_slice(&(user_id.len() as u32).to_be_bytes());
    prefix.extend_from_slice(user_id.as_bytes());
    prefix
}

/// Exclusive upper bound. Code ids are ASCII UUIDs, so every key of this
/// user sorts below `prefix | 0xFF`.
fn make_user_prefix_end(user_id: &str) -> Vec<u8> {
    let mut end = make_user_prefix(user_id);
    end.push(0xFF);
    end
}

// =============================================================================
// SecretDatabase
// =============================================================================

/// redb-backed implementation of [`SecretStore`].
pub struct SecretDatabase {
    db: Database,
}

impl SecretDatabase {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;
        Self::with_tables(db)
    }

    /// Volatile database, used by tests and by `DATA_DIR=:memory:`.
    pub fn in_memory() -> StoreResult<Self> {
        let db = Database::builder().create_with_backend(InMemoryBackend::new())?;
        Self::with_tables(db)
    }

    fn with_tables(db: Database) -> StoreResult<Self> {
        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(DEVICE_CODES)?;
            let _ = write_txn.open_table(DEVICE_CODE_HASHES)?;
            let _ = write_txn.open_table(USER_DEVICE_CODES)?;
            let _ = write_txn.open_table(REFRESH_TOKENS)?;
            let _ = write_txn.open_table(REFRESH_TOKEN_HASHES)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Load a refresh-token record by id, regardless of state.
    pub fn get_refresh_token(&self, id: &str) -> StoreResult<Option<StoredRefreshToken>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(REFRESH_TOKENS)?;
        match table.get(id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// All device codes on record for a user, consumed and expired included.
    pub fn list_device_codes(&self, user_id: &str) -> StoreResult<Vec<StoredDeviceCode>> {
        let read_txn = self.db.begin_read()?;
        let by_user = read_txn.open_table(USER_DEVICE_CODES)?;
        let codes = read_txn.open_table(DEVICE_CODES)?;

        let prefix = make_user_prefix(user_id);
        let prefix_end = make_user_prefix_end(user_id);

        let mut results = Vec::new();
        for entry in by_user.range(prefix.as_slice()..prefix_end.as_slice())? {
            let (_, id) = entry?;
            if let Some(value) = codes.get(id.value())? {
                results.push(serde_json::from_slice(value.value())?);
            }
        }
        Ok(results)
    }
}

impl SecretStore for SecretDatabase {
    fn create_device_code(
        &self,
        user_id: &str,
        code_hash: &str,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> StoreResult<StoredDeviceCode> {
        let code = StoredDeviceCode {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            code_hash: code_hash.to_string(),
            created_at: now,
            expires_at,
            consumed_at: None,
        };
        let json = serde_json::to_vec(&code)?;
        let user_key = make_user_key(user_id, &code.id);

        let write_txn = self.db.begin_write()?;
        {
            let mut codes = write_txn.open_table(DEVICE_CODES)?;
            let mut hashes = write_txn.open_table(DEVICE_CODE_HASHES)?;

            let holder = hashes.get(code_hash)?.map(|v| v.value().to_string());
            if let Some(holder) = holder {
                let existing = codes.get(holder.as_str())?.map(|v| v.value().to_vec());
                if let Some(bytes) = existing {
                    let current: StoredDeviceCode = serde_json::from_slice(&bytes)?;
                    if current.is_usable(now) {
                        return Err(StoreError::AlreadyExists("device code hash".to_string()));
                    }
                }
            }

            codes.insert(code.id.as_str(), json.as_slice())?;
            hashes.insert(code_hash, code.id.as_str())?;

            let mut by_user = write_txn.open_table(USER_DEVICE_CODES)?;
            by_user.insert(user_key.as_slice(), code.id.as_str())?;
        }
        write_txn.commit()?;
        Ok(code)
    }

    fn find_usable_device_code(
        &self,
        code_hash: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<StoredDeviceCode>> {
        let read_txn = self.db.begin_read()?;
        let hashes = read_txn.open_table(DEVICE_CODE_HASHES)?;
        let Some(id) = hashes.get(code_hash)?.map(|v| v.value().to_string()) else {
            return Ok(None);
        };

        let codes = read_txn.open_table(DEVICE_CODES)?;
        let Some(bytes) = codes.get(id.as_str())?.map(|v| v.value().to_vec()) else {
            return Ok(None);
        };

        let code: StoredDeviceCode = serde_json::from_slice(&bytes)?;
        Ok((code.code_hash == code_hash && code.is_usable(now)).then_some(code))
    }

    fn consume_device_code(&self, id: &str, now: DateTime<Utc>) -> StoreResult<bool> {
        let write_txn = self.db.begin_write()?;
        let consumed = {
            let mut codes = write_txn.open_table(DEVICE_CODES)?;

            // Read existing value and deserialize before mutating
            let existing = codes.get(id)?.map(|v| v.value().to_vec());
            match existing {
                Some(bytes) => {
                    let mut code: StoredDeviceCode = serde_json::from_slice(&bytes)?;
                    if code.is_usable(now) {
                        code.consumed_at = Some(now);
                        let json = serde_json::to_vec(&code)?;
                        codes.insert(id, json.as_slice())?;
                        true
                    } else {
                        false
                    }
                }
                None => false,
            }
        };
        write_txn.commit()?;
        Ok(consumed)
    }

    fn purge_stale_device_codes(&self, user_id: &str, now: DateTime<Utc>) -> StoreResult<usize> {
        let prefix = make_user_prefix(user_id);
        let prefix_end = make_user_prefix_end(user_id);

        let write_txn = self.db.begin_write()?;
        let purged = {
            let mut by_user = write_txn.open_table(USER_DEVICE_CODES)?;
            let mut codes = write_txn.open_table(DEVICE_CODES)?;
            let mut hashes = write_txn.open_table(DEVICE_CODE_HASHES)?;

            let mut candidates: Vec<(Vec<u8>, String)> = Vec::new();
            for entry in by_user.range(prefix.as_slice()..prefix_end.as_slice())? {
                let (key, id) = entry?;
                candidates.push((key.value().to_vec(), id.value().to_string()));
            }

            let mut purged = 0;
            for (key, id) in candidates {
                let existing = codes.get(id.as_str())?.map(|v| v.value().to_vec());
                let Some(bytes) = existing else {
                    // Dangling index entry
                    by_user.remove(key.as_slice())?;
                    continue;
                };

                let code: StoredDeviceCode = serde_json::from_slice(&bytes)?;
                if !code.is_stale(now) {
                    continue;
                }

                codes.remove(id.as_str())?;
                by_user.remove(key.as_slice())?;

                let indexed_here = hashes
                    .get(code.code_hash.as_str())?
                    .map(|v| v.value() == id)
                    .unwrap_or(false);
                if indexed_here {
                    hashes.remove(code.code_hash.as_str())?;
                }
                purged += 1;
            }
            purged
        };
        write_txn.commit()?;
        Ok(purged)
    }

    fn create_refresh_token(
        &self,
        token: NewRefreshToken<'_>,
        now: DateTime<Utc>,
    ) -> StoreResult<StoredRefreshToken> {
        let record = StoredRefreshToken {
            id: Uuid::new_v4().to_string(),
            user_id: token.user_id.to_string(),
            token_hash: token.token_hash.to_string(),
            device_id: token.device_id.to_string(),
            device_name: token.device_name.map(str::to_string),
            created_at: now,
            last_used_at: now,
            expires_at: token.expires_at,
            revoked_at: None,
        };
        let json = serde_json::to_vec(&record)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut hashes = write_txn.open_table(REFRESH_TOKEN_HASHES)?;
            if hashes.get(token.token_hash)?.is_some() {
                return Err(StoreError::AlreadyExists("refresh token hash".to_string()));
            }
            hashes.insert(token.token_hash, record.id.as_str())?;

            let mut tokens = write_txn.open_table(REFRESH_TOKENS)?;
            tokens.insert(record.id.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(record)
    }

    fn find_usable_refresh_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<StoredRefreshToken>> {
        let read_txn = self.db.begin_read()?;
        let hashes = read_txn.open_table(REFRESH_TOKEN_HASHES)?;
        let Some(id) = hashes.get(token_hash)?.map(|v| v.value().to_string()) else {
            return Ok(None);
        };

        let tokens = read_txn.open_table(REFRESH_TOKENS)?;
        let Some(bytes) = tokens.get(id.as_str())?.map(|v| v.value().to_vec()) else {
            return Ok(None);
        };

        let record: StoredRefreshToken = serde_json::from_slice(&bytes)?;
        Ok((record.token_hash == token_hash && record.is_usable(now)).then_some(record))
    }

    fn rotate_refresh_token(
        &self,
        id: &str,
        current_hash: &str,
        new_hash: &str,
        new_expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let write_txn = self.db.begin_write()?;
        let rotated = {
            let mut tokens = write_txn.open_table(REFRESH_TOKENS)?;
            let mut hashes = write_txn.open_table(REFRESH_TOKEN_HASHES)?;

            let existing = tokens.get(id)?.map(|v| v.value().to_vec());
            match existing {
                Some(bytes) => {
                    let mut record: StoredRefreshToken = serde_json::from_slice(&bytes)?;
                    if record.token_hash != current_hash || !record.is_usable(now) {
                        false
                    } else {
                        if hashes.get(new_hash)?.is_some() {
                            return Err(StoreError::AlreadyExists(
                                "refresh token hash".to_string(),
                            ));
                        }
                        hashes.remove(current_hash)?;
                        hashes.insert(new_hash, id)?;

                        record.token_hash = new_hash.to_string();
                        record.expires_at = new_expires_at;
                        record.last_used_at = now;
                        let json = serde_json::to_vec(&record)?;
                        tokens.insert(id, json.as_slice())?;
                        true
                    }
                }
                None => false,
            }
        };
        write_txn.commit()?;
        Ok(rotated)
    }

    fn revoke_refresh_token(&self, token_hash: &str, now: DateTime<Utc>) -> StoreResult<bool> {
        let write_txn = self.db.begin_write()?;
        let revoked = {
            let hashes = write_txn.open_table(REFRESH_TOKEN_HASHES)?;
            let id = hashes.get(token_hash)?.map(|v| v.value().to_string());
            drop(hashes);

            match id {
                Some(id) => {
                    let mut tokens = write_txn.open_table(REFRESH_TOKENS)?;
                    let existing = tokens.get(id.as_str())?.map(|v| v.value().to_vec());
                    match existing {
                        Some(bytes) => {
                            let mut record: StoredRefreshToken = serde_json::from_slice(&bytes)?;
                            if record.revoked_at.is_some() {
                                false
                            } else {
                                record.revoked_at = Some(now);
                                let json = serde_json::to_vec(&record)?;
                                tokens.insert(id.as_str(), json.as_slice())?;
                                true
                            }
                        }
                        None => false,
                    }
                }
                None => false,
            }
        };
        write_txn.commit()?;
        Ok(revoked)
    }

    fn ping(&self) -> StoreResult<()> {
        let read_txn = self.db.begin_read()?;
        let _ = read_txn.open_table(REFRESH_TOKENS)?;
        Ok(())
    }
}
