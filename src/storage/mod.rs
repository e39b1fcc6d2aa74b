// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Secret Storage Module
//!
//! Durable state for the pairing protocol: one-time device codes and
//! rotating refresh tokens. Plaintext secrets never reach this layer; records
//! are keyed by SHA-256 digests.
//!
//! ## Layout
//!
//! - `records` - persisted record types and their usability rules
//! - `secret_store` - the [`SecretStore`] contract the protocol depends on
//! - `secret_db` - redb implementation, file-backed or in-memory

pub mod records;
pub mod secret_db;
pub mod secret_store;

pub use records::{StoredDeviceCode, StoredRefreshToken};
pub use secret_db::SecretDatabase;
pub use secret_store::{NewRefreshToken, SecretStore, StoreError, StoreResult};
