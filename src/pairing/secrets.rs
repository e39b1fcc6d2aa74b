// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Generation, normalization and hashing of pairing secrets.

use base64ct::{Base64UrlUnpadded, Encoding};
use ring::rand::{SecureRandom, SystemRandom};
use sha2::{Digest, Sha256};
use unicode_normalization::UnicodeNormalization;

/// Pairing-code symbols. `0`, `O`, `1` and `I` are left out because they
/// are easy to misread.
pub const CODE_ALPHABET: &[u8; 32] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Number of symbols in a pairing code (~30 bits of entropy).
pub const CODE_LENGTH: usize = 6;

/// Refresh tokens carry 256 bits of randomness.
const REFRESH_TOKEN_BYTES: usize = 32;

const DEVICE_ID_BYTES: usize = 16;

/// The system random source failed.
#[derive(Debug, thiserror::Error)]
#[error("secure random source unavailable")]
pub struct RandomError;

fn random_bytes<const N: usize>(rng: &SystemRandom) -> Result<[u8; N], RandomError> {
    let mut bytes = [0u8; N];
    rng.fill(&mut bytes).map_err(|_| RandomError)?;
    Ok(bytes)
}

/// Draw a fresh pairing code.
///
/// The alphabet has 32 symbols, so `byte % 32` keeps the distribution
/// uniform.
pub fn generate_device_code(rng: &SystemRandom) -> Result<String, RandomError> {
    let bytes = random_bytes::<CODE_LENGTH>(rng)?;
    Ok(bytes
        .iter()
        .map(|b| CODE_ALPHABET[(*b as usize) % CODE_ALPHABET.len()] as char)
        .collect())
}

/// Fresh plaintext refresh token (URL-safe base64, 43 characters).
pub fn generate_refresh_token(rng: &SystemRandom) -> Result<String, RandomError> {
    let bytes = random_bytes::<REFRESH_TOKEN_BYTES>(rng)?;
    Ok(Base64UrlUnpadded::encode_string(&bytes))
}

/// Fresh opaque device identifier (32 lowercase hex characters).
pub fn generate_device_id(rng: &SystemRandom) -> Result<String, RandomError> {
    let bytes = random_bytes::<DEVICE_ID_BYTES>(rng)?;
    Ok(bytes.iter().map(|b| format!("{b:02x}")).collect())
}

/// Canonical form of a typed pairing code.
///
/// Mobile keyboards may auto-capitalize inconsistently or substitute
/// full-width forms, so input is NFKC-folded, trimmed and uppercased.
pub fn normalize_code(input: &str) -> String {
    input.nfkc().collect::<String>().trim().to_uppercase()
}

/// One-way digest under which a secret is stored (lowercase hex SHA-256).
pub fn hash_secret(secret: &str) -> String {
    format!("{:x}", Sha256::digest(secret.as_bytes()))
}
