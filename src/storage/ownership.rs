// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ownership enforcement for storage operations.
//!
//! Victims are owned by their captor and rewards by their recipient.
//! Mutations go through these checks inside the write transaction that
//! performs them.

use crate::auth::AuthenticatedUser;

use super::{StorageError, StorageResult};

/// Trait for resources that have an owner.
pub trait OwnedResource {
    /// Get the owner's user ID.
    fn owner_user_id(&self) -> &str;

    /// Human-readable name used in denial errors.
    fn resource_name(&self) -> String {
        "resource".to_string()
    }
}

/// Trait for enforcing ownership on storage operations.
pub trait OwnershipEnforcer {
    /// Verify that the user owns this resource.
    ///
    /// # Errors
    /// Returns `StorageError::PermissionDenied` if the user doesn't own the resource.
    fn verify_ownership(&self, user: &AuthenticatedUser) -> StorageResult<()>;

    /// Like [`verify_ownership`](Self::verify_ownership), but juan always passes.
    fn verify_ownership_or_admin(&self, user: &AuthenticatedUser) -> StorageResult<()> {
        if user.is_juan() {
            return Ok(());
        }
        self.verify_ownership(user)
    }
}

impl<T: OwnedResource> OwnershipEnforcer for T {
    fn verify_ownership(&self, user: &AuthenticatedUser) -> StorageResult<()> {
        if self.owner_user_id() == user.user_id {
            Ok(())
        } else {
            tracing::warn!(
                user_id = %user.user_id,
                resource = %self.resource_name(),
                "Ownership check failed"
            );
            Err(StorageError::PermissionDenied {
                user_id: user.user_id.clone(),
                resource: self.resource_name(),
            })
        }
    }
}
