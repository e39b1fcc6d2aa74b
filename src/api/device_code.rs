// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, Json};
use tracing::error;

use crate::{
    auth::WebSession, error::ApiError, models::DeviceCodeResponse, state::AppState,
};

/// Issue a pairing code for the signed-in web user.
///
/// The plaintext code appears only in this response. Each call purges the
/// user's expired and consumed codes; live codes stay valid.
#[utoipa::path(
    post,
    path = "/v1/device-code/create",
    tag = "Pairing",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = DeviceCodeResponse),
        (status = 401, description = "Missing or invalid web session"),
        (status = 500, description = "Secret store unavailable")
    )
)]
pub async fn create_device_code(
    WebSession(user): WebSession,
    State(state): State<AppState>,
) -> Result<Json<DeviceCodeResponse>, ApiError> {
    let pairing = state
        .pairing
        .request_pairing_code(&user.user_id)
        .map_err(|e| {
            error!(user_id = %user.user_id, error = %e, "Failed to create device code");
            ApiError::internal("Failed to create device code")
        })?;

    Ok(Json(pairing.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::SessionUser;
    use crate::state::test_support::test_state;

    fn web_user(user_id: &str) -> WebSession {
        WebSession(SessionUser {
            user_id: user_id.to_string(),
        })
    }

    #[tokio::test]
    async fn create_returns_fresh_code() {
        let (state, _clock) = test_state();

        let Json(first) = create_device_code(web_user("user_1"), State(state.clone()))
            .await
            .expect("code issued");
        assert!(first.success);
        assert_eq!(first.expires_in, 600);
        assert_eq!(first.code.len(), 6);

        let Json(second) = create_device_code(web_user("user_1"), State(state.clone()))
            .await
            .unwrap();
        assert_ne!(first.code, second.code);

        // Both codes remain exchangeable.
        assert!(state.pairing.exchange(&first.code, None).is_ok());
        assert!(state.pairing.exchange(&second.code, None).is_ok());
    }
}
