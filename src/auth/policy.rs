// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Route access rules.
//!
//! Every route declares its rule statically, either by taking an
//! [`Authorized<P>`](super::Authorized) extractor whose policy type carries
//! the rule, or by taking no auth extractor at all (public). The decision
//! itself is the pure function [`authorize`].

use super::{AuthError, Role};

/// Access rule attached to a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// No session required.
    Public,
    /// Any valid session.
    Authenticated,
    /// A valid session whose role is in the list.
    Roles(&'static [Role]),
}

/// Decide whether a caller may enter a route.
///
/// `caller` is the role from a verified session, or `None` when the request
/// carries no session.
pub fn authorize(caller: Option<Role>, access: Access) -> Result<(), AuthError> {
    match (access, caller) {
        (Access::Public, _) => Ok(()),
        (_, None) => Err(AuthError::Unauthenticated),
        (Access::Authenticated, Some(_)) => Ok(()),
        (Access::Roles(allowed), Some(role)) if allowed.contains(&role) => Ok(()),
        (Access::Roles(_), Some(_)) => Err(AuthError::InsufficientRole),
    }
}

/// A named access rule usable as a type parameter.
pub trait RoutePolicy {
    const ACCESS: Access;
}

/// Any authenticated caller.
pub struct AnyRole;

/// Administrator only.
pub struct JuanOnly;

/// Administrator or capture agent.
pub struct JuanOrSlave;

/// Capture agent only.
pub struct SlaveOnly;

/// Developer only.
pub struct DeveloperOnly;

impl RoutePolicy for AnyRole {
    const ACCESS: Access = Access::Authenticated;
}

impl RoutePolicy for JuanOnly {
    const ACCESS: Access = Access::Roles(&[Role::Juan]);
}

impl RoutePolicy for JuanOrSlave {
    const ACCESS: Access = Access::Roles(&[Role::Juan, Role::Slave]);
}

impl RoutePolicy for SlaveOnly {
    const ACCESS: Access = Access::Roles(&[Role::Slave]);
}

impl RoutePolicy for DeveloperOnly {
    const ACCESS: Access = Access::Roles(&[Role::Developer]);
}
