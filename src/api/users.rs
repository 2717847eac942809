// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User endpoints.
//!
//! Signup is public. Everything else requires a session; listing, editing
//! and deleting accounts is reserved to `juan`.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    audit_log,
    auth::{password, Auth, Authorized, JuanOnly, JuanOrSlave, Role},
    error::ApiError,
    models::{SetUserRewardRequest, SignupRequest, UpdateUserRequest},
    state::AppState,
    storage::{AuditEvent, AuditEventType, StoredUser, UserRepository, UserResponse},
};

const CAPTURE_RANKING_LIMIT: usize = 10;

/// Response after deleting a resource.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeleteResponse {
    pub message: String,
    pub id: String,
}

fn to_responses(users: Vec<StoredUser>) -> Json<Vec<UserResponse>> {
    Json(users.into_iter().map(UserResponse::from).collect())
}

/// Create an account.
#[utoipa::path(
    post,
    path = "/users/signup",
    tag = "Users",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created", body = UserResponse),
        (status = 400, description = "Invalid body or role"),
        (status = 409, description = "Username already taken")
    )
)]
pub async fn signup(
    State(state): State<AppState>,
    body: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let Json(request) = body?;
    if request.password.is_empty() {
        return Err(ApiError::bad_request("password must not be empty"));
    }

    let hash = password::hash_password(&request.password)?;
    let user = UserRepository::new(&state.db).create(&request.username, &hash, request.role)?;

    tracing::info!(user_id = %user.id, role = %user.role, "User signed up");
    audit_log!(
        &state.db,
        AuditEvent::new(AuditEventType::UserSignedUp)
            .with_user(&user.id)
            .with_resource("user", &user.id)
    );

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// List every account.
#[utoipa::path(
    get,
    path = "/users",
    tag = "Users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All users", body = Vec<UserResponse>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not juan")
    )
)]
pub async fn list_users(
    _caller: Authorized<JuanOnly>,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    Ok(to_responses(UserRepository::new(&state.db).list()?))
}

/// The caller's own account.
#[utoipa::path(
    get,
    path = "/users/me",
    tag = "Users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Account no longer exists")
    )
)]
pub async fn get_current_user(
    Authorized(caller, _): Auth,
    State(state): State<AppState>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = UserRepository::new(&state.db).get(&caller.user_id)?;
    Ok(Json(user.into()))
}

/// Slaves ranked by capture count, top ten.
#[utoipa::path(
    get,
    path = "/users/leaderboard",
    tag = "Users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Capture ranking", body = Vec<UserResponse>),
        (status = 403, description = "Not juan")
    )
)]
pub async fn capture_leaderboard(
    _caller: Authorized<JuanOnly>,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    Ok(to_responses(
        UserRepository::new(&state.db).capture_ranking(CAPTURE_RANKING_LIMIT)?,
    ))
}

/// All developer accounts.
#[utoipa::path(
    get,
    path = "/users/developers",
    tag = "Users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Developers", body = Vec<UserResponse>),
        (status = 403, description = "Developers may not list developers")
    )
)]
pub async fn list_developers(
    _caller: Authorized<JuanOrSlave>,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    Ok(to_responses(
        UserRepository::new(&state.db).list_by_role(Role::Developer)?,
    ))
}

/// Developers that can still be captured.
#[utoipa::path(
    get,
    path = "/users/available",
    tag = "Users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Uncaptured developers", body = Vec<UserResponse>),
        (status = 403, description = "Developers may not list developers")
    )
)]
pub async fn list_available(
    _caller: Authorized<JuanOrSlave>,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    Ok(to_responses(UserRepository::new(&state.db).list_developers(false)?))
}

/// Developers already captured.
#[utoipa::path(
    get,
    path = "/users/victims",
    tag = "Users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Captured developers", body = Vec<UserResponse>),
        (status = 403, description = "Developers may not list developers")
    )
)]
pub async fn list_captured(
    _caller: Authorized<JuanOrSlave>,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    Ok(to_responses(UserRepository::new(&state.db).list_developers(true)?))
}

#[utoipa::path(
    get,
    path = "/users/{user_id}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("user_id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "User", body = UserResponse),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    _caller: Auth,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    Ok(Json(UserRepository::new(&state.db).get(&user_id)?.into()))
}

/// Rename a user or change their role.
#[utoipa::path(
    patch,
    path = "/users/{user_id}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("user_id" = String, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated user", body = UserResponse),
        (status = 400, description = "Field outside the allow-list"),
        (status = 404, description = "User not found"),
        (status = 409, description = "Username already taken")
    )
)]
pub async fn update_user(
    Authorized(caller, _): Authorized<JuanOnly>,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    body: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<Json<UserResponse>, ApiError> {
    let Json(patch) = body?;
    let user = UserRepository::new(&state.db).update(&user_id, &patch)?;

    audit_log!(
        &state.db,
        AuditEvent::new(AuditEventType::UserUpdated)
            .with_user(&caller.user_id)
            .with_resource("user", &user_id)
            .with_details(serde_json::json!(patch))
    );

    Ok(Json(user.into()))
}

/// Attach free-text reward to a user.
#[utoipa::path(
    patch,
    path = "/users/{user_id}/reward",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("user_id" = String, Path, description = "User ID")),
    request_body = SetUserRewardRequest,
    responses(
        (status = 200, description = "Updated user", body = UserResponse),
        (status = 404, description = "User not found")
    )
)]
pub async fn set_user_reward(
    Authorized(caller, _): Authorized<JuanOnly>,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    body: Result<Json<SetUserRewardRequest>, JsonRejection>,
) -> Result<Json<UserResponse>, ApiError> {
    let Json(request) = body?;
    let user = UserRepository::new(&state.db).set_reward(&user_id, &request.reward)?;

    audit_log!(
        &state.db,
        AuditEventType::UserRewardSet,
        &caller,
        "user",
        &user_id
    );

    Ok(Json(user.into()))
}

/// Delete an account. Victim and reward records are left in place.
#[utoipa::path(
    delete,
    path = "/users/{user_id}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("user_id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "User deleted", body = DeleteResponse),
        (status = 404, description = "User not found")
    )
)]
pub async fn delete_user(
    Authorized(caller, _): Authorized<JuanOnly>,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    UserRepository::new(&state.db).delete(&user_id)?;

    audit_log!(&state.db, AuditEventType::UserDeleted, &caller, "user", &user_id);

    Ok(Json(DeleteResponse {
        message: "User deleted successfully".to_string(),
        id: user_id,
    }))
}
