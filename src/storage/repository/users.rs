// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User repository.
//!
//! Usernames are unique through the `usernames` index table, which is read
//! and written in the same write transaction as the user document, so two
//! concurrent signups for one name cannot both commit.
//!
//! ## Security
//!
//! - Password hashes never leave this module through [`UserResponse`]
//! - `capture_count` and `is_victim` are only changed by the capture workflow

use chrono::{DateTime, Utc};
use redb::ReadableTable;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::Role;
use crate::models::UpdateUserRequest;

use super::super::database::{put_doc, remove_doc, DocumentReader, USERNAMES, USERS};
use super::super::{Database, StorageError, StorageResult};

/// User document as stored.
///
/// `role` is kept as the raw stored string; [`StoredUser::role`] parses it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredUser {
    pub id: String,
    pub username: String,
    pub password_hash: String,
    pub role: String,
    pub capture_count: u32,
    pub is_victim: bool,
    #[serde(default)]
    pub reward: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl StoredUser {
    /// Parsed role, or `None` if the stored value is outside the closed set.
    pub fn role(&self) -> Option<Role> {
        Role::parse(&self.role)
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.role() == Some(role)
    }
}

/// User as returned to API clients (never includes the password hash).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub role: String,
    pub capture_count: u32,
    pub is_victim: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reward: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<StoredUser> for UserResponse {
    fn from(user: StoredUser) -> Self {
        Self {
            id: user.id,
            username: user.username,
            role: user.role,
            capture_count: user.capture_count,
            is_victim: user.is_victim,
            reward: user.reward,
            created_at: user.created_at,
        }
    }
}

fn validate_username(username: &str) -> StorageResult<()> {
    if username.trim().is_empty() {
        return Err(StorageError::InvalidInput("username must not be empty".into()));
    }
    Ok(())
}

/// Repository for user operations.
pub struct UserRepository<'a> {
    db: &'a Database,
}

impl<'a> UserRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Create a user with a pre-hashed password.
    ///
    /// # Returns
    /// - `Err(StorageError::DuplicateUsername)` if the name is taken
    pub fn create(&self, username: &str, password_hash: &str, role: Role) -> StorageResult<StoredUser> {
        validate_username(username)?;

        let user = StoredUser {
            id: uuid::Uuid::new_v4().to_string(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            role: role.to_string(),
            capture_count: 0,
            is_victim: false,
            reward: None,
            created_at: Utc::now(),
        };

        self.db.write(|txn| {
            {
                let mut index = txn.open_table(USERNAMES)?;
                if index.get(username)?.is_some() {
                    return Err(StorageError::DuplicateUsername(username.to_string()));
                }
                index.insert(username, user.id.as_str())?;
            }
            put_doc(txn, USERS, &user.id, &user)
        })?;

        Ok(user)
    }

    /// Get a user by ID.
    pub fn get(&self, user_id: &str) -> StorageResult<StoredUser> {
        self.db
            .read(|txn| txn.get_doc(USERS, user_id))?
            .ok_or_else(|| StorageError::NotFound(format!("User {user_id}")))
    }

    /// Look a user up through the username index.
    pub fn find_by_username(&self, username: &str) -> StorageResult<Option<StoredUser>> {
        self.db.read(|txn| {
            let user_id = {
                let index = txn.open_table(USERNAMES)?;
                let id = index.get(username)?.map(|v| v.value().to_string());
                id
            };
            match user_id {
                Some(id) => txn.get_doc(USERS, &id),
                None => Ok(None),
            }
        })
    }

    /// List every user, oldest account first.
    pub fn list(&self) -> StorageResult<Vec<StoredUser>> {
        let mut users: Vec<StoredUser> = self.db.read(|txn| txn.scan_docs(USERS))?;
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(users)
    }

    /// List users holding a role.
    pub fn list_by_role(&self, role: Role) -> StorageResult<Vec<StoredUser>> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|u| u.has_role(role))
            .collect())
    }

    /// Developers filtered by capture state.
    pub fn list_developers(&self, is_victim: bool) -> StorageResult<Vec<StoredUser>> {
        Ok(self
            .list_by_role(Role::Developer)?
            .into_iter()
            .filter(|u| u.is_victim == is_victim)
            .collect())
    }

    /// Slaves ranked by capture count, highest first. Equal counts keep
    /// account-creation order.
    pub fn capture_ranking(&self, limit: usize) -> StorageResult<Vec<StoredUser>> {
        let mut slaves = self.list_by_role(Role::Slave)?;
        slaves.sort_by(|a, b| b.capture_count.cmp(&a.capture_count));
        slaves.truncate(limit);
        Ok(slaves)
    }

    /// Apply an admin patch. Renames keep the username index in sync.
    pub fn update(&self, user_id: &str, patch: &UpdateUserRequest) -> StorageResult<StoredUser> {
        if let Some(username) = &patch.username {
            validate_username(username)?;
        }

        self.db.write(|txn| {
            let mut user: StoredUser = txn
                .get_doc(USERS, user_id)?
                .ok_or_else(|| StorageError::NotFound(format!("User {user_id}")))?;

            if let Some(new_name) = patch.username.as_deref().filter(|n| *n != user.username) {
                let mut index = txn.open_table(USERNAMES)?;
                if index.get(new_name)?.is_some() {
                    return Err(StorageError::DuplicateUsername(new_name.to_string()));
                }
                index.remove(user.username.as_str())?;
                index.insert(new_name, user_id)?;
                user.username = new_name.to_string();
            }

            if let Some(role) = patch.role {
                user.role = role.to_string();
            }

            put_doc(txn, USERS, user_id, &user)?;
            Ok(user)
        })
    }

    /// Set the admin-assigned reward text.
    pub fn set_reward(&self, user_id: &str, reward: &str) -> StorageResult<StoredUser> {
        self.db.write(|txn| {
            let mut user: StoredUser = txn
                .get_doc(USERS, user_id)?
                .ok_or_else(|| StorageError::NotFound(format!("User {user_id}")))?;
            user.reward = Some(reward.to_string());
            put_doc(txn, USERS, user_id, &user)?;
            Ok(user)
        })
    }

    /// Delete a user. Victims, feedback and rewards referencing the user
    /// are left in place.
    pub fn delete(&self, user_id: &str) -> StorageResult<()> {
        self.db.write(|txn| {
            let user: StoredUser = txn
                .get_doc(USERS, user_id)?
                .ok_or_else(|| StorageError::NotFound(format!("User {user_id}")))?;
            {
                let mut index = txn.open_table(USERNAMES)?;
                index.remove(user.username.as_str())?;
            }
            remove_doc(txn, USERS, user_id)?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> Database {
        Database::in_memory().unwrap()
    }

    #[test]
    fn create_and_get_user() {
        let db = setup();
        let repo = UserRepository::new(&db);

        let created = repo.create("d1", "hash", Role::Developer).unwrap();
        assert_eq!(created.capture_count, 0);
        assert!(!created.is_victim);

        let fetched = repo.get(&created.id).unwrap();
        assert_eq!(fetched.username, "d1");
        assert_eq!(fetched.role(), Some(Role::Developer));
    }

    #[test]
    fn duplicate_username_rejected() {
        let db = setup();
        let repo = UserRepository::new(&db);

        repo.create("taken", "hash", Role::Slave).unwrap();
        let result = repo.create("taken", "hash", Role::Developer);
        assert!(matches!(result, Err(StorageError::DuplicateUsername(_))));
        assert_eq!(repo.list().unwrap().len(), 1);
    }

    #[test]
    fn empty_username_rejected() {
        let db = setup();
        let repo = UserRepository::new(&db);
        assert!(matches!(
            repo.create("  ", "hash", Role::Slave),
            Err(StorageError::InvalidInput(_))
        ));
    }

    #[test]
    fn find_by_username_uses_index() {
        let db = setup();
        let repo = UserRepository::new(&db);
        let created = repo.create("s1", "hash", Role::Slave).unwrap();

        assert_eq!(repo.find_by_username("s1").unwrap().unwrap().id, created.id);
        assert!(repo.find_by_username("nobody").unwrap().is_none());
    }

    #[test]
    fn rename_moves_index_entry() {
        let db = setup();
        let repo = UserRepository::new(&db);
        let user = repo.create("old", "hash", Role::Slave).unwrap();
        repo.create("other", "hash", Role::Slave).unwrap();

        let clash = UpdateUserRequest {
            username: Some("other".into()),
            role: None,
        };
        assert!(matches!(
            repo.update(&user.id, &clash),
            Err(StorageError::DuplicateUsername(_))
        ));

        let rename = UpdateUserRequest {
            username: Some("new".into()),
            role: Some(Role::Juan),
        };
        let updated = repo.update(&user.id, &rename).unwrap();
        assert_eq!(updated.username, "new");
        assert_eq!(updated.role(), Some(Role::Juan));
        assert!(repo.find_by_username("old").unwrap().is_none());
        assert_eq!(repo.find_by_username("new").unwrap().unwrap().id, user.id);

        // The old name is free again
        assert!(repo.create("old", "hash", Role::Developer).is_ok());
    }

    #[test]
    fn developer_filters() {
        let db = setup();
        let repo = UserRepository::new(&db);
        repo.create("d1", "hash", Role::Developer).unwrap();
        repo.create("s1", "hash", Role::Slave).unwrap();

        assert_eq!(repo.list_developers(false).unwrap().len(), 1);
        assert!(repo.list_developers(true).unwrap().is_empty());
    }

    #[test]
    fn delete_frees_username() {
        let db = setup();
        let repo = UserRepository::new(&db);
        let user = repo.create("gone", "hash", Role::Developer).unwrap();

        repo.delete(&user.id).unwrap();
        assert!(matches!(repo.get(&user.id), Err(StorageError::NotFound(_))));
        assert!(matches!(repo.delete(&user.id), Err(StorageError::NotFound(_))));
        assert!(repo.create("gone", "hash", Role::Developer).is_ok());
    }

    #[test]
    fn response_strips_password_hash() {
        let db = setup();
        let repo = UserRepository::new(&db);
        let user = repo.create("s1", "secret-hash", Role::Slave).unwrap();

        let json = serde_json::to_string(&UserResponse::from(user)).unwrap();
        assert!(!json.contains("secret-hash"));
        assert!(json.contains("\"captureCount\":0"));
    }
}
