// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Two kinds of callers reach this server:
//!
//! 1. **Web sessions** - the web tier forwards `Authorization: Bearer
//!    <session token>` (HS256, `SESSION_SECRET`) when a signed-in user asks
//!    for a pairing code
//! 2. **Paired mobile devices** - send `Authorization: Bearer <access token>`
//!    minted by the pairing protocol
//!
//! ## Security
//!
//! - Access tokens are verified statelessly: signature, `type == "access"`
//!   and expiry, with no clock-skew leeway
//! - Every verification failure is reported the same way
//! - Session tokens get 60 seconds of clock-skew tolerance, since they are
//!   minted by another system

pub mod claims;
pub mod codec;
pub mod error;
pub mod extractor;
pub mod session;

pub use claims::{AccessClaims, MobileIdentity, SessionUser, ACCESS_TOKEN_KIND};
pub use codec::{TokenCodec, ACCESS_TOKEN_TTL_SECS};
pub use error::AuthError;
pub use extractor::{authenticate, bearer_token, MobileAuth, WebSession};
pub use session::SessionVerifier;
