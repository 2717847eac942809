// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Repository layer providing typed access to the document database.
//!
//! Each repository provides CRUD operations for a specific entity type.
//! Operations that must read and write together run inside a single
//! `Database::write` closure.

pub mod feedback;
pub mod rewards;
pub mod users;
pub mod victims;

pub use feedback::{FeedbackRepository, FeedbackType, StoredFeedback, VoteOutcome, VoteType};
pub use rewards::{AchievementData, RewardRepository, RewardStatus, RewardType, StoredReward};
pub use users::{StoredUser, UserRepository, UserResponse};
pub use victims::{StatusInput, StoredVictim, TransformationStatus, VictimRepository};
