// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Feedback posts and voting.
//!
//! Voter sets are the source of truth: after every vote the counters are
//! recomputed from the set sizes, and a user id is in at most one set.
//! A vote is a read-modify-write of one document inside a redb write
//! transaction, and redb runs write transactions one at a time, so
//! concurrent voters cannot overwrite each other.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::CreateFeedbackRequest;

use super::super::database::{put_doc, DocumentReader, FEEDBACK};
use super::super::{Database, StorageError, StorageResult};

const RESISTANCE_TIPS_LIMIT: usize = 20;
const SURVIVAL_STORIES_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackType {
    ResistanceTip,
    SurvivalStory,
    SlaveActivityReport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum VoteType {
    Upvote,
    Downvote,
}

/// What a vote did to the caller's standing on a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    Cast,
    Flipped,
    Retracted,
}

impl VoteOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            VoteOutcome::Cast => "cast",
            VoteOutcome::Flipped => "flipped",
            VoteOutcome::Retracted => "retracted",
        }
    }
}

/// Feedback document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StoredFeedback {
    pub id: String,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub feedback_type: FeedbackType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reporter_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reporter_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suspicious_slave_activity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub author_id: String,
    pub upvotes: u32,
    pub downvotes: u32,
    pub upvoters: BTreeSet<String>,
    pub downvoters: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoredFeedback {
    /// Apply one vote: same type again retracts, the opposite type flips,
    /// otherwise the vote is added.
    pub fn apply_vote(&mut self, vote: VoteType, user_id: &str) -> VoteOutcome {
        let (same, opposite) = match vote {
            VoteType::Upvote => (&mut self.upvoters, &mut self.downvoters),
            VoteType::Downvote => (&mut self.downvoters, &mut self.upvoters),
        };

        let outcome = if same.remove(user_id) {
            VoteOutcome::Retracted
        } else {
            let flipped = opposite.remove(user_id);
            same.insert(user_id.to_string());
            if flipped {
                VoteOutcome::Flipped
            } else {
                VoteOutcome::Cast
            }
        };

        self.upvotes = count(&self.upvoters);
        self.downvotes = count(&self.downvoters);
        outcome
    }
}

fn count(voters: &BTreeSet<String>) -> u32 {
    u32::try_from(voters.len()).unwrap_or(u32::MAX)
}

fn required(field: &str, value: &str) -> StorageResult<()> {
    if value.trim().is_empty() {
        return Err(StorageError::InvalidInput(format!("{field} must not be empty")));
    }
    Ok(())
}

/// Repository for feedback posts.
pub struct FeedbackRepository<'a> {
    db: &'a Database,
}

impl<'a> FeedbackRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Create a post with empty voter sets.
    pub fn create(&self, author_id: &str, request: &CreateFeedbackRequest) -> StorageResult<StoredFeedback> {
        required("title", &request.title)?;
        required("message", &request.message)?;

        let now = Utc::now();
        let feedback = StoredFeedback {
            id: uuid::Uuid::new_v4().to_string(),
            title: request.title.clone(),
            message: request.message.clone(),
            feedback_type: request.feedback_type,
            reporter_name: request.reporter_name.clone(),
            reporter_email: request.reporter_email.clone(),
            suspicious_slave_activity: request.suspicious_slave_activity.clone(),
            location: request.location.clone(),
            author_id: author_id.to_string(),
            upvotes: 0,
            downvotes: 0,
            upvoters: BTreeSet::new(),
            downvoters: BTreeSet::new(),
            created_at: now,
            updated_at: now,
        };

        self.db
            .write(|txn| put_doc(txn, FEEDBACK, &feedback.id, &feedback))?;
        Ok(feedback)
    }

    pub fn get(&self, feedback_id: &str) -> StorageResult<StoredFeedback> {
        self.db
            .read(|txn| txn.get_doc(FEEDBACK, feedback_id))?
            .ok_or_else(|| StorageError::NotFound(format!("Feedback {feedback_id}")))
    }

    /// Posts of one type, ordered and capped per type:
    ///
    /// - resistance tips: most upvoted first, top 20
    /// - survival stories: most upvoted first, then newest, top 10
    /// - slave activity reports: newest first, all
    pub fn list_by_type(&self, feedback_type: FeedbackType) -> StorageResult<Vec<StoredFeedback>> {
        let all: Vec<StoredFeedback> = self.db.read(|txn| txn.scan_docs(FEEDBACK))?;
        let mut posts: Vec<StoredFeedback> = all
            .into_iter()
            .filter(|f| f.feedback_type == feedback_type)
            .collect();

        match feedback_type {
            FeedbackType::ResistanceTip => {
                posts.sort_by(|a, b| b.upvotes.cmp(&a.upvotes).then_with(|| a.created_at.cmp(&b.created_at)));
                posts.truncate(RESISTANCE_TIPS_LIMIT);
            }
            FeedbackType::SurvivalStory => {
                posts.sort_by(|a, b| b.upvotes.cmp(&a.upvotes).then_with(|| b.created_at.cmp(&a.created_at)));
                posts.truncate(SURVIVAL_STORIES_LIMIT);
            }
            FeedbackType::SlaveActivityReport => {
                posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            }
        }
        Ok(posts)
    }

    /// Record a vote by `user_id` and return the persisted post.
    ///
    /// # Returns
    /// - `Err(StorageError::InvalidInput)` if `user_id` is empty
    /// - `Err(StorageError::NotFound)` if the post does not exist
    pub fn vote(
        &self,
        feedback_id: &str,
        vote: VoteType,
        user_id: &str,
    ) -> StorageResult<(StoredFeedback, VoteOutcome)> {
        if user_id.is_empty() {
            return Err(StorageError::InvalidInput("user id is required to vote".into()));
        }

        self.db.write(|txn| {
            let mut feedback: StoredFeedback = txn
                .get_doc(FEEDBACK, feedback_id)?
                .ok_or_else(|| StorageError::NotFound(format!("Feedback {feedback_id}")))?;

            let outcome = feedback.apply_vote(vote, user_id);
            feedback.updated_at = Utc::now();

            put_doc(txn, FEEDBACK, feedback_id, &feedback)?;
            Ok((feedback, outcome))
        })
    }
}
