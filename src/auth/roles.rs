// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User roles for authorization.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// User roles for authorization.
///
/// ## Roles
///
/// - `Juan` - Administrator, full access to every collection
/// - `Slave` - Capture agent, captures developers and owns the resulting victims
/// - `Developer` - Resistance member, posts and votes on feedback
///
/// There is no hierarchy: access rules name the roles they admit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Administrator
    Juan,
    /// Capture agent
    Slave,
    /// Developer (potential victim)
    Developer,
}

impl Role {
    /// Parse a stored or claimed role name.
    ///
    /// Matching is exact and case-sensitive; anything outside the closed
    /// set is rejected.
    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "juan" => Some(Role::Juan),
            "slave" => Some(Role::Slave),
            "developer" => Some(Role::Developer),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Juan => "juan",
            Role::Slave => "slave",
            Role::Developer => "developer",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
