// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Web-session verification.
//!
//! The web tier owns sign-in. When a signed-in user asks for a pairing code
//! it forwards its session as an HS256 token signed with `SESSION_SECRET`;
//! this server only checks that token and trusts the `sub` it carries.

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

use super::claims::{SessionClaims, SessionUser};

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

/// Verifies session tokens issued by the web tier.
#[derive(Clone)]
pub struct SessionVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl SessionVerifier {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = CLOCK_SKEW_LEEWAY;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Resolve the signed-in user, or `None` for any invalid token.
    pub fn verify(&self, token: &str) -> Option<SessionUser> {
        let claims = decode::<SessionClaims>(token, &self.decoding_key, &self.validation)
            .ok()?
            .claims;

        // A mobile access token is never a web session, even when both
        // secrets are the same.
        if claims.kind.is_some() || claims.sub.is_empty() {
            return None;
        }

        Some(SessionUser { user_id: claims.sub })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &[u8] = b"web-session-secret";

    fn sign(claims: serde_json::Value, secret: &[u8]) -> String {
        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret)).unwrap()
    }

    #[test]
    fn valid_session_resolves_user() {
        let exp = Utc::now().timestamp() + 3600;
        let token = sign(serde_json::json!({ "sub": "user_42", "exp": exp }), SECRET);

        let user = SessionVerifier::new(SECRET).verify(&token).unwrap();
        assert_eq!(user.user_id, "user_42");
    }

    #[test]
    fn expired_session_rejected() {
        let exp = Utc::now().timestamp() - 3600;
        let token = sign(serde_json::json!({ "sub": "user_42", "exp": exp }), SECRET);
        assert!(SessionVerifier::new(SECRET).verify(&token).is_none());
    }

    #[test]
    fn wrong_secret_rejected() {
        let exp = Utc::now().timestamp() + 3600;
        let token = sign(serde_json::json!({ "sub": "user_42", "exp": exp }), b"other");
        assert!(SessionVerifier::new(SECRET).verify(&token).is_none());
    }

    #[test]
    fn access_token_is_not_a_session() {
        let exp = Utc::now().timestamp() + 900;
        let token = sign(
            serde_json::json!({
                "sub": "user_42",
                "userId": "user_42",
                "deviceId": "d",
                "type": "access",
                "exp": exp,
            }),
            SECRET,
        );
        assert!(SessionVerifier::new(SECRET).verify(&token).is_none());
    }
}
