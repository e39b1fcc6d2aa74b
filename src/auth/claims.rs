// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Access-token claims and the identity they resolve to.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Discriminator carried in every access token (`type` claim).
pub const ACCESS_TOKEN_KIND: &str = "access";

/// Claims signed into a mobile access token.
///
/// Field names follow the wire format the mobile client already decodes:
/// `{ userId, deviceId, type, iat, exp }`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessClaims {
    #[serde(rename = "userId")]
    pub user_id: String,

    #[serde(rename = "deviceId")]
    pub device_id: String,

    /// Always [`ACCESS_TOKEN_KIND`] for tokens minted here
    #[serde(rename = "type")]
    pub kind: String,

    /// Issued at (Unix seconds)
    pub iat: i64,

    /// Expiration (Unix seconds, exclusive)
    pub exp: i64,
}

/// The caller behind a verified access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MobileIdentity {
    pub user_id: String,
    /// Stable identifier of the paired device
    pub device_id: String,
}

impl From<AccessClaims> for MobileIdentity {
    fn from(claims: AccessClaims) -> Self {
        Self {
            user_id: claims.user_id,
            device_id: claims.device_id,
        }
    }
}

/// Claims of a web-session token forwarded by the web tier.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionClaims {
    /// Account id of the signed-in web user
    pub sub: String,
    pub exp: i64,
    /// Set on mobile access tokens; must be absent on session tokens
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

/// Web user resolved from a session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    pub user_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_claims_use_wire_names() {
        let claims = AccessClaims {
            user_id: "user_123".to_string(),
            device_id: "dev_abc".to_string(),
            kind: ACCESS_TOKEN_KIND.to_string(),
            iat: 1_700_000_000,
            exp: 1_700_000_900,
        };

        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["userId"], "user_123");
        assert_eq!(json["deviceId"], "dev_abc");
        assert_eq!(json["type"], "access");
    }

    #[test]
    fn identity_serializes_camel_case() {
        let identity = MobileIdentity {
            user_id: "u".to_string(),
            device_id: "d".to_string(),
        };
        let body = serde_json::to_string(&identity).unwrap();
        assert_eq!(body, r#"{"userId":"u","deviceId":"d"}"#);
    }
}
