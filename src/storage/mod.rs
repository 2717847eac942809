// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! Persistent storage in a single embedded **redb** database file.
//!
//! ## Guarantees
//!
//! - Every multi-document workflow (capture, vote, monthly award) runs in
//!   one write transaction and commits atomically
//! - redb admits one writer at a time, which serializes read-check-write
//!   sequences such as voting
//! - Readers see a consistent snapshot and never block writers
//!
//! ## Storage Layout
//!
//! ```text
//! users         user_id     → StoredUser
//! usernames     username    → user_id
//! victims       victim_id   → StoredVictim
//! feedback      feedback_id → StoredFeedback
//! rewards       reward_id   → StoredReward
//! audit_events  micros|id   → AuditEvent
//! ```

pub mod audit;
pub mod database;
pub mod ownership;
pub mod repository;

pub use audit::{AuditEvent, AuditEventType, AuditFilter, AuditRepository};
pub use database::{Database, StorageError, StorageResult};
pub use ownership::{OwnedResource, OwnershipEnforcer};
pub use repository::{
    AchievementData, FeedbackRepository, FeedbackType, RewardRepository, RewardStatus, RewardType,
    StatusInput, StoredFeedback, StoredReward, StoredUser, StoredVictim, TransformationStatus,
    UserRepository, UserResponse, VictimRepository, VoteOutcome, VoteType,
};
