// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response bodies of the pairing API. All types derive
//! `ToSchema` for OpenAPI documentation and use camelCase on the wire,
//! which is what the mobile client sends and decodes.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::pairing::{PairingCode, TokenPair};

/// Accepted pairing-code input length, in characters, before normalization.
pub const CODE_INPUT_MIN_CHARS: usize = 6;
pub const CODE_INPUT_MAX_CHARS: usize = 10;

/// Refresh tokens minted here are 43 characters; anything far longer is
/// malformed.
pub const REFRESH_TOKEN_MAX_CHARS: usize = 512;

/// Device names are stored truncated to this many characters.
pub const DEVICE_NAME_MAX_CHARS: usize = 64;

// =============================================================================
// Pairing Models
// =============================================================================

/// A freshly issued pairing code for the signed-in web user.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeviceCodeResponse {
    pub success: bool,
    /// Code to type into the mobile app (6 characters).
    pub code: String,
    /// Seconds until the code expires.
    pub expires_in: i64,
    pub message: String,
}

impl From<PairingCode> for DeviceCodeResponse {
    fn from(pairing: PairingCode) -> Self {
        Self {
            success: true,
            code: pairing.code,
            expires_in: pairing.expires_in,
            message: "Enter this code in your mobile app to pair the device".to_string(),
        }
    }
}

// =============================================================================
// Mobile Auth Models
// =============================================================================

/// Request to trade a pairing code for tokens.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeRequest {
    /// The pairing code (case-insensitive).
    pub code: String,
    /// Optional display name; derived from `User-Agent` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,
}

impl ExchangeRequest {
    pub fn is_well_formed(&self) -> bool {
        let chars = self.code.chars().count();
        (CODE_INPUT_MIN_CHARS..=CODE_INPUT_MAX_CHARS).contains(&chars)
    }
}

/// Body of the refresh and logout requests.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

impl RefreshTokenRequest {
    pub fn is_well_formed(&self) -> bool {
        let chars = self.refresh_token.chars().count();
        (1..=REFRESH_TOKEN_MAX_CHARS).contains(&chars)
    }
}

/// Credentials for a paired device.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenPairResponse {
    pub success: bool,
    /// Bearer token for API calls.
    pub access_token: String,
    /// Single-use token for the next refresh. Store it securely.
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
}

impl From<TokenPair> for TokenPairResponse {
    fn from(pair: TokenPair) -> Self {
        Self {
            success: true,
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            expires_in: pair.expires_in,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LogoutResponse {
    pub success: bool,
    pub message: String,
}

/// Display name for a device, from an explicit name or the `User-Agent`.
pub fn device_display_name(explicit: Option<&str>, user_agent: Option<&str>) -> String {
    let name = match explicit.map(str::trim).filter(|name| !name.is_empty()) {
        Some(name) => name,
        None => device_name_from_user_agent(user_agent.unwrap_or_default()),
    };
    name.chars().take(DEVICE_NAME_MAX_CHARS).collect()
}

fn device_name_from_user_agent(user_agent: &str) -> &'static str {
    if user_agent.contains("iPhone") {
        "iPhone"
    } else if user_agent.contains("iPad") {
        "iPad"
    } else if user_agent.contains("Android") {
        "Android Device"
    } else if user_agent.contains("Expo") {
        "Expo App"
    } else {
        "Mobile Device"
    }
}
