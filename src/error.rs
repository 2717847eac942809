// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::auth::AuthError;
use crate::storage::StorageError;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    error_code: &'static str,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "bad_request", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "forbidden", message)
    }

    pub fn conflict(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, code, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, "unavailable", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        if err.is_unavailable() {
            tracing::error!(error = %err, "Store unavailable");
            return Self::service_unavailable("Storage is unavailable");
        }

        match err {
            StorageError::NotFound(what) => Self::not_found(format!("{what} not found")),
            StorageError::DuplicateUsername(name) => {
                Self::conflict("duplicate_username", format!("Username {name} is already taken"))
            }
            StorageError::AlreadyVictim(id) => {
                Self::conflict("already_victim", format!("Developer {id} is already a victim"))
            }
            StorageError::PermissionDenied { resource, .. } => {
                Self::forbidden(format!("You don't have permission to modify {resource}"))
            }
            StorageError::InvalidInput(msg) => Self::bad_request(msg),
            other => {
                tracing::error!(error = %other, "Storage failure");
                Self::internal("Internal storage error")
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        Self::new(err.status_code(), err.error_code(), err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
            error_code: self.code,
        });
        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn constructors_set_status_and_code() {
        let nf = ApiError::not_found("missing");
        assert_eq!(nf.status, StatusCode::NOT_FOUND);
        assert_eq!(nf.code, "not_found");
        assert_eq!(nf.message, "missing");

        let bad = ApiError::bad_request("bad");
        assert_eq!(bad.status, StatusCode::BAD_REQUEST);

        let down = ApiError::service_unavailable("down");
        assert_eq!(down.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(down.code, "unavailable");
    }

    #[test]
    fn storage_errors_map_to_kinds() {
        let cases = [
            (StorageError::NotFound("Victim v1".into()), StatusCode::NOT_FOUND, "not_found"),
            (
                StorageError::DuplicateUsername("neo".into()),
                StatusCode::CONFLICT,
                "duplicate_username",
            ),
            (
                StorageError::AlreadyVictim("d1".into()),
                StatusCode::CONFLICT,
                "already_victim",
            ),
            (
                StorageError::PermissionDenied {
                    user_id: "s2".into(),
                    resource: "victim v1".into(),
                },
                StatusCode::FORBIDDEN,
                "forbidden",
            ),
            (
                StorageError::InvalidInput("nope".into()),
                StatusCode::BAD_REQUEST,
                "bad_request",
            ),
            (
                StorageError::RedbStorage(redb::StorageError::Io(std::io::Error::other("gone"))),
                StatusCode::SERVICE_UNAVAILABLE,
                "unavailable",
            ),
        ];

        for (err, status, code) in cases {
            let api: ApiError = err.into();
            assert_eq!(api.status, status);
            assert_eq!(api.code, code);
        }
    }

    #[test]
    fn auth_errors_keep_their_code() {
        let api: ApiError = AuthError::InsufficientRole.into();
        assert_eq!(api.status, StatusCode::FORBIDDEN);
        assert_eq!(api.code, "insufficient_role");

        let api: ApiError = AuthError::TokenExpired.into();
        assert_eq!(api.status, StatusCode::UNAUTHORIZED);
        assert_eq!(api.code, "token_expired");
    }

    #[tokio::test]
    async fn into_response_returns_json_body() {
        let response = ApiError::bad_request("bad data").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body_bytes.to_vec()).unwrap();
        assert_eq!(body, r#"{"error":"bad data","error_code":"bad_request"}"#);
    }
}
