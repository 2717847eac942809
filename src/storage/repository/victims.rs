// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Victim capture workflow.
//!
//! ## Lifecycle
//!
//! ```text
//! captured ──► in_progress ──► transformed (terminal)
//!     │             │
//!     └──► resisting ◄┘
//! ```
//!
//! A capture touches three documents: the developer (`is_victim = true`),
//! the captor (`capture_count += 1`) and the new victim. All three writes
//! happen in one redb write transaction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::{AuthenticatedUser, Role};
use crate::models::{CaptureRequest, UpdateVictimRequest};

use super::super::database::{put_doc, remove_doc, DocumentReader, USERS, VICTIMS};
use super::super::{Database, OwnedResource, OwnershipEnforcer, StorageError, StorageResult};
use super::users::StoredUser;

/// Transformation status of a captured developer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TransformationStatus {
    Captured,
    InProgress,
    Transformed,
    Resisting,
}

impl TransformationStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TransformationStatus::Transformed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TransformationStatus::Captured => "captured",
            TransformationStatus::InProgress => "in_progress",
            TransformationStatus::Transformed => "transformed",
            TransformationStatus::Resisting => "resisting",
        }
    }
}

/// Status as sent by clients: one of the known statuses, or free text
/// (e.g. "Learning Pandas") that is stored as the display label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum StatusInput {
    Known(TransformationStatus),
    Label(String),
}

/// Victim document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StoredVictim {
    pub id: String,
    pub skills: Vec<String>,
    pub last_seen: String,
    pub transformation_status: TransformationStatus,
    /// Free-form presentation text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_label: Option<String>,
    pub captured_by: String,
    pub developer_id: String,
    pub capture_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_date: Option<DateTime<Utc>>,
}

impl OwnedResource for StoredVictim {
    fn owner_user_id(&self) -> &str {
        &self.captured_by
    }

    fn resource_name(&self) -> String {
        format!("victim {}", self.id)
    }
}

impl StoredVictim {
    /// Apply an allow-listed patch.
    ///
    /// Entering `transformed` stamps `completion_date`; leaving it is rejected.
    pub fn apply_patch(&mut self, patch: &UpdateVictimRequest, now: DateTime<Utc>) -> StorageResult<()> {
        let mut label = patch.status_label.clone();

        match &patch.transformation_status {
            Some(StatusInput::Known(next)) => {
                let current = self.transformation_status;
                if current.is_terminal() && !next.is_terminal() {
                    return Err(StorageError::InvalidInput(format!(
                        "victim {} is already transformed and cannot move to {}",
                        self.id,
                        next.as_str()
                    )));
                }
                if next.is_terminal() && !current.is_terminal() {
                    self.completion_date = Some(now);
                }
                self.transformation_status = *next;
            }
            Some(StatusInput::Label(text)) => {
                label.get_or_insert_with(|| text.clone());
            }
            None => {}
        }

        if let Some(skills) = &patch.skills {
            self.skills = skills.clone();
        }
        if let Some(last_seen) = &patch.last_seen {
            self.last_seen = last_seen.clone();
        }
        if label.is_some() {
            self.status_label = label;
        }
        Ok(())
    }
}

fn sort_by_capture(victims: &mut [StoredVictim]) {
    victims.sort_by(|a, b| a.capture_date.cmp(&b.capture_date).then_with(|| a.id.cmp(&b.id)));
}

/// Repository for victim records and the capture workflow.
pub struct VictimRepository<'a> {
    db: &'a Database,
}

impl<'a> VictimRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Capture a developer on behalf of `captor_id`.
    ///
    /// # Returns
    /// - `Err(StorageError::NotFound)` if the developer is missing or is not a developer,
    ///   or if the captor record no longer exists
    /// - `Err(StorageError::InvalidInput)` if the captor targets itself or its
    ///   stored role is no longer `slave` or `juan`
    /// - `Err(StorageError::AlreadyVictim)` if the developer was captured before
    pub fn capture(&self, captor_id: &str, request: &CaptureRequest) -> StorageResult<StoredVictim> {
        let developer_id = request.developer_id.as_str();

        let (status, free_text) = match &request.transformation_status {
            Some(StatusInput::Known(status)) => (*status, None),
            Some(StatusInput::Label(text)) => (TransformationStatus::Captured, Some(text.clone())),
            None => (TransformationStatus::Captured, None),
        };

        if captor_id == developer_id {
            return Err(StorageError::InvalidInput(format!(
                "user {captor_id} cannot capture themselves"
            )));
        }

        self.db.write(|txn| {
            let mut developer: StoredUser = txn
                .get_doc(USERS, developer_id)?
                .filter(|u: &StoredUser| u.has_role(Role::Developer))
                .ok_or_else(|| StorageError::NotFound(format!("Developer {developer_id}")))?;

            if developer.is_victim {
                return Err(StorageError::AlreadyVictim(developer_id.to_string()));
            }

            let mut captor: StoredUser = txn
                .get_doc(USERS, captor_id)?
                .ok_or_else(|| StorageError::NotFound(format!("Captor {captor_id}")))?;

            // The session role may be stale after an admin role change.
            if !(captor.has_role(Role::Slave) || captor.has_role(Role::Juan)) {
                return Err(StorageError::InvalidInput(format!(
                    "user {captor_id} is not allowed to capture developers"
                )));
            }

            let now = Utc::now();
            let victim = StoredVictim {
                id: uuid::Uuid::new_v4().to_string(),
                skills: request.skills.clone(),
                last_seen: request.last_seen.clone().unwrap_or_default(),
                transformation_status: status,
                status_label: request.status_label.clone().or(free_text),
                captured_by: captor_id.to_string(),
                developer_id: developer_id.to_string(),
                capture_date: now,
                completion_date: status.is_terminal().then_some(now),
            };

            developer.is_victim = true;
            captor.capture_count = captor.capture_count.saturating_add(1);

            put_doc(txn, USERS, developer_id, &developer)?;
            put_doc(txn, USERS, captor_id, &captor)?;
            put_doc(txn, VICTIMS, &victim.id, &victim)?;

            tracing::info!(
                victim_id = %victim.id,
                developer_id = %developer_id,
                captor_id = %captor_id,
                capture_count = captor.capture_count,
                "Developer captured"
            );

            Ok(victim)
        })
    }

    /// Get a victim by ID.
    pub fn get(&self, victim_id: &str) -> StorageResult<StoredVictim> {
        self.db
            .read(|txn| txn.get_doc(VICTIMS, victim_id))?
            .ok_or_else(|| StorageError::NotFound(format!("Victim {victim_id}")))
    }

    /// All victims by capture date, then ID.
    pub fn list_all(&self) -> StorageResult<Vec<StoredVictim>> {
        let mut victims: Vec<StoredVictim> = self.db.read(|txn| txn.scan_docs(VICTIMS))?;
        sort_by_capture(&mut victims);
        Ok(victims)
    }

    /// Victims captured by one captor.
    pub fn list_by_captor(&self, captor_id: &str) -> StorageResult<Vec<StoredVictim>> {
        Ok(self
            .list_all()?
            .into_iter()
            .filter(|v| v.captured_by == captor_id)
            .collect())
    }

    /// Update a victim as `actor`, who must be the captor or an admin.
    pub fn update(
        &self,
        victim_id: &str,
        patch: &UpdateVictimRequest,
        actor: &AuthenticatedUser,
    ) -> StorageResult<StoredVictim> {
        self.db.write(|txn| {
            let mut victim: StoredVictim = txn
                .get_doc(VICTIMS, victim_id)?
                .ok_or_else(|| StorageError::NotFound(format!("Victim {victim_id}")))?;

            victim.verify_ownership_or_admin(actor)?;
            victim.apply_patch(patch, Utc::now())?;

            put_doc(txn, VICTIMS, victim_id, &victim)?;
            Ok(victim)
        })
    }

    /// Delete a victim as `actor`, who must be the captor or an admin.
    ///
    /// The developer stays marked as a victim.
    pub fn delete(&self, victim_id: &str, actor: &AuthenticatedUser) -> StorageResult<()> {
        self.db.write(|txn| {
            let victim: StoredVictim = txn
                .get_doc(VICTIMS, victim_id)?
                .ok_or_else(|| StorageError::NotFound(format!("Victim {victim_id}")))?;

            victim.verify_ownership_or_admin(actor)?;
            remove_doc(txn, VICTIMS, victim_id)?;
            Ok(())
        })
    }
}
