// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Device Pair - Mobile Pairing & Token Service
//!
//! A signed-in web user asks for a short one-time code, types it into the
//! mobile app, and the app trades it for a short-lived access token plus a
//! rotating refresh token.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Access-token codec, web-session verification, extractors
//! - `pairing` - Code issuance, exchange, refresh rotation, logout
//! - `storage` - Hashed secret records (redb)
//! - `rate_limit` - Exchange attempt limiting

pub mod api;
pub mod auth;
pub mod clock;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod pairing;
pub mod rate_limit;
pub mod state;
pub mod storage;
