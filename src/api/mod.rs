// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    body::Body,
    http::Request,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::MobileIdentity,
    models::{
        DeviceCodeResponse, ExchangeRequest, LogoutResponse, RefreshTokenRequest,
        TokenPairResponse,
    },
    state::AppState,
};

pub mod device_code;
pub mod health;
pub mod mobile;
pub mod mobile_auth;

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/device-code/create", post(device_code::create_device_code))
        .route("/mobile/auth/exchange", post(mobile_auth::exchange))
        .route("/mobile/auth/refresh", post(mobile_auth::refresh))
        .route("/mobile/auth/logout", post(mobile_auth::logout))
        .route("/mobile/me", get(mobile::me));

    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness));

    // Paths only; query strings never reach the logs.
    let trace = TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
        let request_id = request
            .headers()
            .get("x-request-id")
            .and_then(|value| value.to_str().ok())
            .unwrap_or("-");
        tracing::info_span!(
            "http_request",
            method = %request.method(),
            path = %request.uri().path(),
            request_id = %request_id,
        )
    });

    Router::new()
        .nest("/v1", v1_routes)
        .merge(health_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(trace)
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
        .layer(CorsLayer::permissive())
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        device_code::create_device_code,
        mobile_auth::exchange,
        mobile_auth::refresh,
        mobile_auth::logout,
        mobile::me,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            DeviceCodeResponse,
            ExchangeRequest,
            RefreshTokenRequest,
            TokenPairResponse,
            LogoutResponse,
            MobileIdentity,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Pairing", description = "Pairing codes for signed-in web users"),
        (name = "Mobile Auth", description = "Code exchange, refresh and logout"),
        (name = "Mobile", description = "Authenticated mobile endpoints"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;
