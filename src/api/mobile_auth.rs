// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Unauthenticated mobile endpoints: code exchange, refresh and logout.
//!
//! Every invalid credential gets the same 401 body per endpoint, whatever
//! the underlying cause (unknown, expired, consumed, revoked, lost race).

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, FromRequestParts, State},
    http::{header::USER_AGENT, request::Parts, HeaderMap},
    Json,
};
use tracing::{error, warn};

use crate::{
    error::ApiError,
    models::{
        device_display_name, ExchangeRequest, LogoutResponse, RefreshTokenRequest,
        TokenPairResponse,
    },
    pairing::ServiceError,
    state::AppState,
};

const INVALID_BODY: &str = "Invalid request body";

/// Rate-limit key of the caller: first `X-Forwarded-For` entry, then
/// `X-Real-IP`, then the peer address.
pub struct ClientKey(pub String);

impl<S: Send + Sync> FromRequestParts<S> for ClientKey {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts.extensions.get::<ConnectInfo<SocketAddr>>();
        Ok(ClientKey(client_key(&parts.headers, peer)))
    }
}

fn client_key(headers: &HeaderMap, peer: Option<&ConnectInfo<SocketAddr>>) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    };

    if let Some(first) = header("x-forwarded-for").and_then(|list| list.split(',').next()) {
        let first = first.trim();
        if !first.is_empty() {
            return first.to_string();
        }
    }
    if let Some(real_ip) = header("x-real-ip") {
        return real_ip.to_string();
    }
    peer.map(|info| info.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Map a service failure to the endpoint's response. Only invalid
/// credentials are a client error; the rest are logged and hidden.
fn service_failure(err: ServiceError, invalid: &'static str, failed: &'static str) -> ApiError {
    match err {
        ServiceError::InvalidCredential => ApiError::unauthorized(invalid),
        other => {
            error!(error = %other, "{failed}");
            ApiError::internal(failed)
        }
    }
}

/// Trade a pairing code for an access/refresh token pair.
///
/// Attempts are rate limited per client before the body is read.
#[utoipa::path(
    post,
    path = "/v1/mobile/auth/exchange",
    request_body = ExchangeRequest,
    tag = "Mobile Auth",
    responses(
        (status = 200, body = TokenPairResponse),
        (status = 400, description = "Malformed body"),
        (status = 401, description = "Invalid or expired device code"),
        (status = 429, description = "Too many attempts"),
        (status = 500, description = "Exchange failed")
    )
)]
pub async fn exchange(
    ClientKey(client): ClientKey,
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<ExchangeRequest>, JsonRejection>,
) -> Result<Json<TokenPairResponse>, ApiError> {
    if !state.exchange_limiter.allow(&client) {
        warn!(client = %client, "Exchange attempts rate limited");
        return Err(ApiError::too_many_requests(
            "Too many attempts. Please wait a minute.",
            state.exchange_limiter.retry_after_secs(),
        ));
    }

    let Json(request) = body.map_err(|_| ApiError::bad_request(INVALID_BODY))?;
    if !request.is_well_formed() {
        return Err(ApiError::bad_request(INVALID_BODY));
    }

    let user_agent = headers.get(USER_AGENT).and_then(|value| value.to_str().ok());
    let device_name = device_display_name(request.device_name.as_deref(), user_agent);

    state
        .pairing
        .exchange(&request.code, Some(&device_name))
        .map(|pair| Json(pair.into()))
        .map_err(|e| {
            service_failure(e, "Invalid or expired device code", "Failed to exchange device code")
        })
}

/// Rotate a refresh token and mint a new access token.
///
/// The presented refresh token stops working once this succeeds.
#[utoipa::path(
    post,
    path = "/v1/mobile/auth/refresh",
    request_body = RefreshTokenRequest,
    tag = "Mobile Auth",
    responses(
        (status = 200, body = TokenPairResponse),
        (status = 400, description = "Malformed body"),
        (status = 401, description = "Invalid or expired refresh token"),
        (status = 500, description = "Refresh failed")
    )
)]
pub async fn refresh(
    State(state): State<AppState>,
    body: Result<Json<RefreshTokenRequest>, JsonRejection>,
) -> Result<Json<TokenPairResponse>, ApiError> {
    let Json(request) = body.map_err(|_| ApiError::bad_request(INVALID_BODY))?;
    if !request.is_well_formed() {
        return Err(ApiError::bad_request(INVALID_BODY));
    }

    state
        .pairing
        .refresh(&request.refresh_token)
        .map(|pair| Json(pair.into()))
        .map_err(|e| {
            service_failure(e, "Invalid or expired refresh token", "Failed to refresh token")
        })
}

/// Revoke a refresh token.
///
/// Succeeds for unknown and already revoked tokens, and when the store is
/// unreachable; the failure is only logged. Access tokens already issued
/// stay valid until they expire.
#[utoipa::path(
    post,
    path = "/v1/mobile/auth/logout",
    request_body = RefreshTokenRequest,
    tag = "Mobile Auth",
    responses(
        (status = 200, body = LogoutResponse),
        (status = 400, description = "Malformed body")
    )
)]
pub async fn logout(
    State(state): State<AppState>,
    body: Result<Json<RefreshTokenRequest>, JsonRejection>,
) -> Result<Json<LogoutResponse>, ApiError> {
    let Json(request) = body.map_err(|_| ApiError::bad_request(INVALID_BODY))?;
    if !request.is_well_formed() {
        return Err(ApiError::bad_request(INVALID_BODY));
    }

    if let Err(e) = state.pairing.logout(&request.refresh_token) {
        error!(error = %e, "Failed to revoke refresh token");
    }

    Ok(Json(LogoutResponse {
        success: true,
        message: "Logged out successfully".to_string(),
    }))
}
