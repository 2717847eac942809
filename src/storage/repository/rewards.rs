// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Reward repository.
//!
//! ## Status Flow
//!
//! ```text
//! pending ──► awarded ──► claimed
//!                │
//!                └──► expired
//! ```
//!
//! Rewards are created directly in `awarded`. Only the recipient may claim,
//! and only from `awarded`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{CreateRewardRequest, UpdateRewardRequest};

use super::super::database::{put_doc, remove_doc, DocumentReader, REWARDS, USERS};
use super::super::{Database, OwnedResource, OwnershipEnforcer, StorageError, StorageResult};
use super::users::StoredUser;
use crate::auth::AuthenticatedUser;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RewardType {
    MonthlyTopCapturer,
    WeeklyAchievement,
    SpecialRecognition,
    TransformationBonus,
    StreakReward,
}

impl RewardType {
    pub fn as_str(self) -> &'static str {
        match self {
            RewardType::MonthlyTopCapturer => "monthly_top_capturer",
            RewardType::WeeklyAchievement => "weekly_achievement",
            RewardType::SpecialRecognition => "special_recognition",
            RewardType::TransformationBonus => "transformation_bonus",
            RewardType::StreakReward => "streak_reward",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RewardStatus {
    Pending,
    Awarded,
    Claimed,
    Expired,
}

impl RewardStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RewardStatus::Pending => "pending",
            RewardStatus::Awarded => "awarded",
            RewardStatus::Claimed => "claimed",
            RewardStatus::Expired => "expired",
        }
    }
}

/// Snapshot of the performance a reward was granted for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AchievementData {
    #[serde(default)]
    pub captures_count: u32,
    #[serde(default)]
    pub transformations_count: u32,
    #[serde(default)]
    pub streak_days: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_milestone: Option<String>,
}

/// Reward document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StoredReward {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub reward_type: RewardType,
    pub status: RewardStatus,
    pub recipient_id: String,
    /// User ID of the awarding admin, or `system`
    pub awarded_by: String,
    pub points: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,
    #[serde(default)]
    pub special_privileges: Vec<String>,
    /// `YYYY-MM` for monthly awards
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub achievement_data: Option<AchievementData>,
    pub awarded_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claimed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl OwnedResource for StoredReward {
    fn owner_user_id(&self) -> &str {
        &self.recipient_id
    }

    fn resource_name(&self) -> String {
        format!("reward {}", self.id)
    }
}

impl StoredReward {
    /// Build an `awarded` reward from an admin request.
    pub fn from_request(request: &CreateRewardRequest, awarded_by: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: request.title.clone(),
            description: request.description.clone(),
            reward_type: request.reward_type,
            status: RewardStatus::Awarded,
            recipient_id: request.recipient_id.clone(),
            awarded_by: awarded_by.to_string(),
            points: request.points,
            badge: request.badge.clone(),
            special_privileges: request.special_privileges.clone(),
            period: request.period.clone(),
            achievement_data: request.achievement_data.clone(),
            awarded_at: now,
            claimed_at: None,
            expires_at: request.expires_at,
            notes: request.notes.clone(),
        }
    }

    fn apply_patch(&mut self, patch: &UpdateRewardRequest) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(description) = &patch.description {
            self.description = description.clone();
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(points) = patch.points {
            self.points = points;
        }
        if let Some(badge) = &patch.badge {
            self.badge = Some(badge.clone());
        }
        if let Some(privileges) = &patch.special_privileges {
            self.special_privileges = privileges.clone();
        }
        if let Some(expires_at) = patch.expires_at {
            self.expires_at = Some(expires_at);
        }
        if let Some(notes) = &patch.notes {
            self.notes = Some(notes.clone());
        }
    }
}

fn newest_first(rewards: &mut [StoredReward]) {
    rewards.sort_by(|a, b| b.awarded_at.cmp(&a.awarded_at).then_with(|| a.id.cmp(&b.id)));
}

/// Repository for rewards.
pub struct RewardRepository<'a> {
    db: &'a Database,
}

impl<'a> RewardRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Store a new reward. The recipient must exist.
    pub fn create(&self, reward: &StoredReward) -> StorageResult<()> {
        if reward.title.trim().is_empty() {
            return Err(StorageError::InvalidInput("title must not be empty".into()));
        }

        self.db.write(|txn| {
            let recipient: Option<StoredUser> = txn.get_doc(USERS, &reward.recipient_id)?;
            if recipient.is_none() {
                return Err(StorageError::NotFound(format!("User {}", reward.recipient_id)));
            }
            put_doc(txn, REWARDS, &reward.id, reward)
        })
    }

    pub fn get(&self, reward_id: &str) -> StorageResult<StoredReward> {
        self.db
            .read(|txn| txn.get_doc(REWARDS, reward_id))?
            .ok_or_else(|| StorageError::NotFound(format!("Reward {reward_id}")))
    }

    /// Get a reward the caller may see: juan sees all, others only their own.
    pub fn get_for(&self, reward_id: &str, caller: &AuthenticatedUser) -> StorageResult<StoredReward> {
        let reward = self.get(reward_id)?;
        reward.verify_ownership_or_admin(caller)?;
        Ok(reward)
    }

    /// All rewards, newest first.
    pub fn list_all(&self) -> StorageResult<Vec<StoredReward>> {
        let mut rewards: Vec<StoredReward> = self.db.read(|txn| txn.scan_docs(REWARDS))?;
        newest_first(&mut rewards);
        Ok(rewards)
    }

    /// Rewards held by one user, newest first.
    pub fn list_by_recipient(&self, recipient_id: &str) -> StorageResult<Vec<StoredReward>> {
        Ok(self
            .list_all()?
            .into_iter()
            .filter(|r| r.recipient_id == recipient_id)
            .collect())
    }

    /// Apply an admin patch.
    pub fn update(&self, reward_id: &str, patch: &UpdateRewardRequest) -> StorageResult<StoredReward> {
        self.db.write(|txn| {
            let mut reward: StoredReward = txn
                .get_doc(REWARDS, reward_id)?
                .ok_or_else(|| StorageError::NotFound(format!("Reward {reward_id}")))?;
            reward.apply_patch(patch);
            put_doc(txn, REWARDS, reward_id, &reward)?;
            Ok(reward)
        })
    }

    pub fn delete(&self, reward_id: &str) -> StorageResult<()> {
        self.db.write(|txn| {
            if !remove_doc(txn, REWARDS, reward_id)? {
                return Err(StorageError::NotFound(format!("Reward {reward_id}")));
            }
            Ok(())
        })
    }

    /// Claim a reward as its recipient.
    ///
    /// # Returns
    /// - `Err(StorageError::PermissionDenied)` if the caller is not the recipient
    /// - `Err(StorageError::InvalidInput)` if the reward is not in `awarded`
    pub fn claim(&self, reward_id: &str, caller: &AuthenticatedUser) -> StorageResult<StoredReward> {
        self.db.write(|txn| {
            let mut reward: StoredReward = txn
                .get_doc(REWARDS, reward_id)?
                .ok_or_else(|| StorageError::NotFound(format!("Reward {reward_id}")))?;

            reward.verify_ownership(caller)?;
            if reward.status != RewardStatus::Awarded {
                return Err(StorageError::InvalidInput(format!(
                    "reward {reward_id} is {} and cannot be claimed",
                    reward.status.as_str()
                )));
            }

            reward.status = RewardStatus::Claimed;
            reward.claimed_at = Some(Utc::now());
            put_doc(txn, REWARDS, reward_id, &reward)?;
            Ok(reward)
        })
    }

    /// Insert candidate rewards of `reward_type` for `period`, skipping any
    /// recipient that already holds one. Check and insert share one write
    /// transaction, so repeated runs never duplicate.
    pub fn insert_once_per_period(
        &self,
        reward_type: RewardType,
        period: &str,
        candidates: Vec<StoredReward>,
    ) -> StorageResult<Vec<StoredReward>> {
        self.db.write(|txn| {
            let existing: Vec<StoredReward> = txn.scan_docs(REWARDS)?;
            let mut inserted = Vec::new();

            for candidate in candidates {
                let already_awarded = existing.iter().chain(inserted.iter()).any(|r: &StoredReward| {
                    r.reward_type == reward_type
                        && r.period.as_deref() == Some(period)
                        && r.recipient_id == candidate.recipient_id
                });
                if already_awarded {
                    continue;
                }
                put_doc(txn, REWARDS, &candidate.id, &candidate)?;
                inserted.push(candidate);
            }

            Ok(inserted)
        })
    }
}
