// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Username/password login backed by argon2 hashes, HS256 session tokens,
//! and static per-route access rules.
//!
//! ## Auth Flow
//!
//! 1. Client posts credentials to `/auth/login`
//! 2. Server verifies the argon2 hash and signs `{sub, username, role, iat, exp}`
//! 3. Client sends `Authorization: Bearer <token>`
//! 4. The `Authorized<P>` extractor verifies the token and checks the
//!    caller's role against policy `P`
//!
//! ## Security
//!
//! - Login failures never reveal whether the username exists
//! - Roles are a closed set; unknown role strings never authorize
//! - Clock skew tolerance is 60 seconds

pub mod claims;
pub mod error;
pub mod extractor;
pub mod password;
pub mod policy;
pub mod roles;
pub mod tokens;

pub use claims::{AuthenticatedUser, SessionClaims};
pub use error::AuthError;
pub use extractor::{Auth, Authorized};
pub use policy::{authorize, Access, AnyRole, DeveloperOnly, JuanOnly, JuanOrSlave, RoutePolicy, SlaveOnly};
pub use roles::Role;
pub use tokens::{IssuedToken, TokenIssuer};
