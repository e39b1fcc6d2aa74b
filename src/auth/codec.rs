// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Access-token codec.
//!
//! Access tokens are HS256 JWTs verified without touching the store. Expiry is
//! checked here, against the injected [`Clock`], rather than by
//! `jsonwebtoken`'s own system-time check, so issuing and verifying always
//! read the same clock. There is no leeway window.

use std::sync::Arc;

use chrono::Duration;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use super::claims::{AccessClaims, MobileIdentity, ACCESS_TOKEN_KIND};
use crate::clock::Clock;

/// Access token lifetime (15 minutes).
pub const ACCESS_TOKEN_TTL_SECS: i64 = 15 * 60;

/// Signs and verifies mobile access tokens.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    clock: Arc<dyn Clock>,
}

impl TokenCodec {
    pub fn new(secret: &[u8], clock: Arc<dyn Clock>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.required_spec_claims.clear();

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            clock,
        }
    }

    /// Lifetime of tokens minted by [`issue`](Self::issue), in seconds.
    pub fn expires_in(&self) -> i64 {
        ACCESS_TOKEN_TTL_SECS
    }

    /// Mint an access token for `(user_id, device_id)`.
    pub fn issue(&self, user_id: &str, device_id: &str) -> Result<String, jsonwebtoken::errors::Error> {
        let issued_at = self.clock.now();
        let claims = AccessClaims {
            user_id: user_id.to_string(),
            device_id: device_id.to_string(),
            kind: ACCESS_TOKEN_KIND.to_string(),
            iat: issued_at.timestamp(),
            exp: (issued_at + Duration::seconds(ACCESS_TOKEN_TTL_SECS)).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
    }

    /// Verify signature, kind and lifetime.
    ///
    /// Every failure collapses to `None`.
    pub fn verify(&self, token: &str) -> Option<MobileIdentity> {
        let claims = decode::<AccessClaims>(token, &self.decoding_key, &self.validation)
            .ok()?
            .claims;

        let now = self.clock.now().timestamp();
        let live = claims.iat <= now && now < claims.exp;
        if claims.kind != ACCESS_TOKEN_KIND || !live {
            return None;
        }

        Some(claims.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    use chrono::{TimeZone, Utc};

    const SECRET: &[u8] = b"test-secret-with-enough-length-000";

    fn codec() -> (TokenCodec, ManualClock) {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2026, 2, 10, 8, 0, 0).unwrap());
        (TokenCodec::new(SECRET, Arc::new(clock.clone())), clock)
    }

    /// Re-sign arbitrary claims with the given secret.
    fn sign_raw(claims: &serde_json::Value, secret: &[u8]) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret),
        )
        .unwrap()
    }

    #[test]
    fn issued_token_verifies() {
        let (codec, _clock) = codec();
        let token = codec.issue("user_1", "device_1").unwrap();

        let identity = codec.verify(&token).expect("fresh token verifies");
        assert_eq!(identity.user_id, "user_1");
        assert_eq!(identity.device_id, "device_1");
    }

    #[test]
    fn token_valid_until_fifteen_minutes() {
        let (codec, clock) = codec();
        let token = codec.issue("user_1", "device_1").unwrap();

        clock.advance(Duration::seconds(ACCESS_TOKEN_TTL_SECS - 1));
        assert!(codec.verify(&token).is_some());

        clock.advance(Duration::seconds(1));
        assert!(codec.verify(&token).is_none());
    }

    #[test]
    fn token_rejected_before_issued_at() {
        let (codec, clock) = codec();
        let token = codec.issue("user_1", "device_1").unwrap();

        clock.advance(Duration::seconds(-5));
        assert!(codec.verify(&token).is_none());
    }

    #[test]
    fn different_secret_rejected() {
        let (codec, clock) = codec();
        let other = TokenCodec::new(b"some-other-secret", Arc::new(clock));
        let token = other.issue("user_1", "device_1").unwrap();

        assert!(codec.verify(&token).is_none());
    }

    #[test]
    fn wrong_kind_rejected() {
        let (codec, clock) = codec();
        let now = clock.now().timestamp();
        let token = sign_raw(
            &serde_json::json!({
                "userId": "user_1",
                "deviceId": "device_1",
                "type": "refresh",
                "iat": now,
                "exp": now + 900,
            }),
            SECRET,
        );

        assert!(codec.verify(&token).is_none());
    }

    #[test]
    fn any_modified_byte_rejected() {
        let (codec, _clock) = codec();
        let token = codec.issue("user_1", "device_1").unwrap();

        // The final character only carries two signature bits plus padding
        // bits, so it is left out.
        for index in 0..token.len() - 1 {
            let mut bytes = token.clone().into_bytes();
            bytes[index] = if bytes[index] == b'A' { b'B' } else { b'A' };
            let tampered = String::from_utf8(bytes).unwrap();
            if tampered == token {
                continue;
            }
            assert!(codec.verify(&tampered).is_none(), "byte {index} tamper accepted");
        }
    }

    #[test]
    fn forged_payload_rejected() {
        let (codec, _clock) = codec();
        let token = codec.issue("user_1", "device_1").unwrap();
        let parts: Vec<&str> = token.split('.').collect();

        let payload = URL_SAFE_NO_PAD.decode(parts[1]).unwrap();
        let mut claims: serde_json::Value = serde_json::from_slice(&payload).unwrap();
        claims["userId"] = serde_json::Value::String("admin".to_string());
        let forged_payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap());

        let forged = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);
        assert!(codec.verify(&forged).is_none());
    }

    #[test]
    fn garbage_rejected() {
        let (codec, _clock) = codec();
        assert!(codec.verify("").is_none());
        assert!(codec.verify("not-a-jwt").is_none());
        assert!(codec.verify("a.b.c").is_none());
    }
}
