// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session claims and authenticated user representation.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{AuthError, Role};

/// Claims carried by a session token.
///
/// `role` stays a plain string on the wire so a token minted with a role
/// outside the closed set is rejected at verification time instead of
/// failing deserialization with a generic error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (user ID)
    pub sub: String,
    /// Username at the time of login
    pub username: String,
    /// Role name
    pub role: String,
    /// Issued at timestamp
    pub iat: i64,
    /// Expiration timestamp
    pub exp: i64,
}

/// Authenticated user information extracted from a verified session.
///
/// This is the primary type used throughout the application to represent
/// the caller making a request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatedUser {
    /// User ID (`sub` claim)
    pub user_id: String,

    /// Username
    pub username: String,

    /// User's role
    pub role: Role,

    /// Token expiration (Unix timestamp)
    #[serde(skip)]
    pub expires_at: i64,
}

impl AuthenticatedUser {
    /// Build from verified claims, rejecting unknown roles.
    pub fn from_claims(claims: SessionClaims) -> Result<Self, AuthError> {
        let role = Role::parse(&claims.role).ok_or(AuthError::InvalidRole)?;
        Ok(Self {
            user_id: claims.sub,
            username: claims.username,
            role,
            expires_at: claims.exp,
        })
    }

    /// Check if the user holds the given role.
    pub fn has_role(&self, role: Role) -> bool {
        self.role == role
    }

    /// Check if the user is the administrator.
    pub fn is_juan(&self) -> bool {
        self.has_role(Role::Juan)
    }
}
