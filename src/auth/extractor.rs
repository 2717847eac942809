// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for authenticated callers.
//!
//! Use `Authorized<P>` in handlers to require a session admitted by policy `P`:
//!
//! ```rust,ignore
//! async fn list_users(
//!     Authorized(caller, _): Authorized<JuanOnly>,
//!     State(state): State<AppState>,
//! ) -> Result<Json<Vec<UserResponse>>, ApiError> {
//!     // caller is AuthenticatedUser with role juan
//! }
//! ```

use std::marker::PhantomData;

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use super::policy::{authorize, AnyRole, RoutePolicy};
use super::{AuthError, AuthenticatedUser};
use crate::state::AppState;

/// Resolve the caller from the request, if any.
///
/// A user placed in the request extensions (e.g. by a test harness) wins over
/// the Authorization header. A missing header yields `Ok(None)`; a present
/// but unusable header is an error.
fn caller_from_parts(
    parts: &Parts,
    state: &AppState,
) -> Result<Option<AuthenticatedUser>, AuthError> {
    if let Some(user) = parts.extensions.get::<AuthenticatedUser>().cloned() {
        return Ok(Some(user));
    }

    let Some(header) = parts.headers.get(AUTHORIZATION) else {
        return Ok(None);
    };

    let token = header
        .to_str()
        .map_err(|_| AuthError::InvalidAuthHeader)?
        .strip_prefix("Bearer ")
        .ok_or(AuthError::InvalidAuthHeader)?;

    state.tokens.verify(token).map(Some)
}

/// Extractor for callers admitted by policy `P`.
pub struct Authorized<P: RoutePolicy>(pub AuthenticatedUser, pub PhantomData<fn() -> P>);

impl<P: RoutePolicy> FromRequestParts<AppState> for Authorized<P> {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let caller = caller_from_parts(parts, state)?;
        authorize(caller.as_ref().map(|u| u.role), P::ACCESS)?;

        // Non-public policies only pass `authorize` with a caller present
        let user = caller.ok_or(AuthError::Unauthenticated)?;
        Ok(Authorized(user, PhantomData))
    }
}

/// Extractor for any authenticated caller.
pub type Auth = Authorized<AnyRole>;
