// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Mobile Pairing Protocol
//!
//! 1. A signed-in web user requests a pairing code (6 symbols, 10 minutes)
//! 2. The user types the code into the mobile app
//! 3. The app exchanges it for an access token (15 minutes) and a refresh
//!    token (90 days, sliding)
//! 4. Each refresh rotates the refresh token; logout revokes it
//!
//! Access tokens are never looked up server-side, so a revoked device keeps
//! API access until its current access token expires.

pub mod secrets;
pub mod service;

pub use secrets::{hash_secret, normalize_code, CODE_ALPHABET, CODE_LENGTH};
pub use service::{
    PairingCode, PairingService, ServiceError, ServiceResult, TokenPair, DEVICE_CODE_TTL_SECS,
    REFRESH_TOKEN_TTL_DAYS,
};
