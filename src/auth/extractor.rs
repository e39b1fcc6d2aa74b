// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for mobile clients and web sessions.
//!
//! Use `MobileAuth` in handlers that require a paired device:
//!
//! ```rust,ignore
//! async fn my_handler(MobileAuth(identity): MobileAuth) -> impl IntoResponse {
//!     // identity.user_id, identity.device_id
//! }
//! ```
//!
//! Verification never touches the secret store.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use super::{AuthError, MobileIdentity, SessionUser, TokenCodec};
use crate::state::AppState;

/// Extract the token from a `Bearer <token>` header value.
pub fn bearer_token(authorization: &str) -> Option<&str> {
    let token = authorization.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

/// Resolve an `Authorization` header value to a mobile identity.
///
/// A missing header, any other scheme and every invalid token all yield
/// `None` (anonymous). Whether anonymous is acceptable is the caller's call.
pub fn authenticate(codec: &TokenCodec, authorization: Option<&str>) -> Option<MobileIdentity> {
    let token = bearer_token(authorization?)?;
    codec.verify(token)
}

fn authorization_header(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
}

/// Extractor for requests from a paired mobile device.
pub struct MobileAuth(pub MobileIdentity);

impl FromRequestParts<AppState> for MobileAuth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        state
            .pairing
            .authenticate(authorization_header(parts))
            .map(MobileAuth)
            .ok_or(AuthError::Unauthorized)
    }
}

/// Extractor for signed-in web users.
pub struct WebSession(pub SessionUser);

impl FromRequestParts<AppState> for WebSession {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let verifier = state
            .sessions
            .as_ref()
            .ok_or(AuthError::SessionAuthDisabled)?;

        authorization_header(parts)
            .and_then(bearer_token)
            .and_then(|token| verifier.verify(token))
            .map(WebSession)
            .ok_or(AuthError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::{test_state, TEST_SESSION_SECRET};
    use axum::http::Request;
    use chrono::Utc;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn parts_with(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/test");
        if let Some(value) = header {
            builder = builder.header("Authorization", value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn bearer_token_requires_scheme() {
        assert_eq!(bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(bearer_token("Bearer   "), None);
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("bearer abc"), None);
        assert_eq!(bearer_token("abc"), None);
    }

    #[test]
    fn authenticate_is_anonymous_without_header() {
        let (state, _clock) = test_state();
        assert!(authenticate(state.pairing.codec(), None).is_none());
        assert!(authenticate(state.pairing.codec(), Some("Token xyz")).is_none());
    }

    #[tokio::test]
    async fn mobile_auth_requires_header() {
        let (state, _clock) = test_state();
        let mut parts = parts_with(None);

        let result = MobileAuth::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::Unauthorized)));
    }

    #[tokio::test]
    async fn mobile_auth_accepts_issued_token() {
        let (state, _clock) = test_state();
        let token = state.pairing.codec().issue("user_123", "device_9").unwrap();
        let mut parts = parts_with(Some(&format!("Bearer {token}")));

        let MobileAuth(identity) = MobileAuth::from_request_parts(&mut parts, &state)
            .await
            .expect("issued token authenticates");
        assert_eq!(identity.user_id, "user_123");
        assert_eq!(identity.device_id, "device_9");
    }

    #[tokio::test]
    async fn mobile_auth_only_trusts_the_header() {
        let (state, _clock) = test_state();
        let mut parts = parts_with(Some("Bearer not.a.token"));
        parts.extensions.insert(MobileIdentity {
            user_id: "planted".to_string(),
            device_id: "d".to_string(),
        });

        let result = MobileAuth::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::Unauthorized)));
    }

    #[tokio::test]
    async fn web_session_verifies_session_token() {
        let (state, _clock) = test_state();
        let token = encode(
            &Header::default(),
            &serde_json::json!({ "sub": "web_user", "exp": Utc::now().timestamp() + 600 }),
            &EncodingKey::from_secret(TEST_SESSION_SECRET),
        )
        .unwrap();
        let mut parts = parts_with(Some(&format!("Bearer {token}")));

        let WebSession(user) = WebSession::from_request_parts(&mut parts, &state)
            .await
            .unwrap();
        assert_eq!(user.user_id, "web_user");
    }

    #[tokio::test]
    async fn web_session_rejects_mobile_access_token() {
        let (state, _clock) = test_state();
        let token = state.pairing.codec().issue("user_123", "device_9").unwrap();
        let mut parts = parts_with(Some(&format!("Bearer {token}")));

        let result = WebSession::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::Unauthorized)));
    }

    #[tokio::test]
    async fn web_session_disabled_without_verifier() {
        let (mut state, _clock) = test_state();
        state.sessions = None;
        let mut parts = parts_with(Some("Bearer anything"));

        let result = WebSession::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::SessionAuthDisabled)));
    }
}
