// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session issuance.

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    audit_log,
    auth::{password, AuthError},
    error::ApiError,
    models::LoginRequest,
    state::AppState,
    storage::{AuditEvent, AuditEventType, UserRepository, UserResponse},
};

/// Issued session.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserResponse,
}

fn login_failed(state: &AppState, username: &str, reason: &str) -> ApiError {
    tracing::info!(username = %username, reason = %reason, "Login rejected");
    audit_log!(
        &state.db,
        AuditEvent::new(AuditEventType::LoginFailed)
            .with_details(serde_json::json!({ "username": username, "reason": reason }))
            .failed("Invalid credentials")
    );
    AuthError::InvalidCredentials.into()
}

/// Exchange username and password for a bearer token.
///
/// Unknown users and wrong passwords return the same error.
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session issued", body = LoginResponse),
        (status = 400, description = "Malformed body"),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(request) = body?;
    let users = UserRepository::new(&state.db);

    let Some(user) = users.find_by_username(&request.username)? else {
        password::verify_dummy(&request.password);
        return Err(login_failed(&state, &request.username, "unknown_user"));
    };

    if !password::verify_password(&request.password, &user.password_hash) {
        return Err(login_failed(&state, &request.username, "wrong_password"));
    }

    let issued = state.tokens.issue(&user).map_err(|e| {
        if matches!(e, AuthError::InvalidRole) {
            tracing::warn!(user_id = %user.id, role = %user.role, "Stored user has an unknown role");
        }
        ApiError::from(e)
    })?;

    audit_log!(
        &state.db,
        AuditEvent::new(AuditEventType::LoginSucceeded).with_user(&user.id)
    );

    Ok(Json(LoginResponse {
        access_token: issued.token,
        token_type: "Bearer".to_string(),
        expires_at: issued.expires_at,
        user: user.into(),
    }))
}
