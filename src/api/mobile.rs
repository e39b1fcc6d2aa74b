// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::Json;

use crate::auth::{MobileAuth, MobileIdentity};

/// Identity behind the presented access token.
#[utoipa::path(
    get,
    path = "/v1/mobile/me",
    tag = "Mobile",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = MobileIdentity),
        (status = 401, description = "Missing, invalid or expired access token")
    )
)]
pub async fn me(MobileAuth(identity): MobileAuth) -> Json<MobileIdentity> {
    Json(identity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn me_echoes_identity() {
        let identity = MobileIdentity {
            user_id: "user_1".to_string(),
            device_id: "device_1".to_string(),
        };
        let Json(body) = me(MobileAuth(identity.clone())).await;
        assert_eq!(body, identity);
    }
}
