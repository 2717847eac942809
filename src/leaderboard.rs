// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Slave leaderboard, capture streaks and the monthly top-capturer award.

use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::Role;
use crate::stats::Snapshot;
use crate::storage::{
    AchievementData, Database, RewardRepository, RewardStatus, RewardType, StorageResult,
    StoredReward, StoredVictim, TransformationStatus,
};

/// Points, badge and title prefix for places 1, 2 and 3.
const MONTHLY_PRIZES: [(u32, &str, &str); 3] = [
    (100, "top_capturer_1", "1st Place"),
    (50, "top_capturer_2", "2nd Place"),
    (25, "top_capturer_3", "3rd Place"),
];
const MONTHLY_AWARD_DAYS: i64 = 30;
const SYSTEM_AWARDER: &str = "system";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub slave_id: String,
    pub slave_name: String,
    pub total_captures: u32,
    pub transformed_count: u32,
    pub current_streak: u32,
    pub total_points: u64,
    pub badges: Vec<String>,
    pub rank: usize,
    pub monthly_captures: u32,
    pub last_activity: DateTime<Utc>,
}

/// Number of consecutive UTC days, ending today, with at least one capture.
pub fn current_streak<'a>(
    capture_dates: impl IntoIterator<Item = &'a DateTime<Utc>>,
    today: NaiveDate,
) -> u32 {
    let days: BTreeSet<NaiveDate> = capture_dates.into_iter().map(|d| d.date_naive()).collect();

    let mut streak = 0;
    let mut expected = today;
    while days.contains(&expected) {
        streak += 1;
        match expected.pred_opt() {
            Some(prev) => expected = prev,
            None => break,
        }
    }
    streak
}

fn same_month(a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
    a.year() == b.year() && a.month() == b.month()
}

/// Rank every slave user by transformations, then by total captures.
///
/// Ties keep user creation order.
pub fn build_leaderboard(snapshot: &Snapshot, now: DateTime<Utc>) -> Vec<LeaderboardEntry> {
    let today = now.date_naive();

    let mut entries: Vec<LeaderboardEntry> = snapshot
        .users
        .iter()
        .filter(|u| u.has_role(Role::Slave))
        .map(|slave| {
            let captures: Vec<&StoredVictim> = snapshot
                .victims
                .iter()
                .filter(|v| v.captured_by == slave.id)
                .collect();
            let rewards: Vec<&StoredReward> = snapshot
                .rewards
                .iter()
                .filter(|r| r.recipient_id == slave.id)
                .collect();

            let transformed_count = captures
                .iter()
                .filter(|v| v.transformation_status == TransformationStatus::Transformed)
                .count() as u32;
            let monthly_captures = captures
                .iter()
                .filter(|v| same_month(v.capture_date, now))
                .count() as u32;
            let last_activity = captures
                .iter()
                .map(|v| v.capture_date)
                .max()
                .unwrap_or(slave.created_at);

            LeaderboardEntry {
                slave_id: slave.id.clone(),
                slave_name: slave.username.clone(),
                total_captures: captures.len() as u32,
                transformed_count,
                current_streak: current_streak(captures.iter().map(|v| &v.capture_date), today),
                total_points: rewards.iter().map(|r| u64::from(r.points)).sum(),
                badges: rewards.iter().filter_map(|r| r.badge.clone()).collect(),
                rank: 0,
                monthly_captures,
                last_activity,
            }
        })
        .collect();

    entries.sort_by(|a, b| {
        b.transformed_count
            .cmp(&a.transformed_count)
            .then_with(|| b.total_captures.cmp(&a.total_captures))
    });
    for (index, entry) in entries.iter_mut().enumerate() {
        entry.rank = index + 1;
    }
    entries
}

pub fn leaderboard(db: &Database) -> StorageResult<Vec<LeaderboardEntry>> {
    let snapshot = Snapshot::load(db)?;
    Ok(build_leaderboard(&snapshot, Utc::now()))
}

/// `YYYY-MM` for the UTC month containing `now`.
pub fn period_of(now: DateTime<Utc>) -> String {
    now.format("%Y-%m").to_string()
}

fn monthly_candidates(board: &[LeaderboardEntry], period: &str, now: DateTime<Utc>) -> Vec<StoredReward> {
    board
        .iter()
        .zip(MONTHLY_PRIZES)
        .map(|(entry, (points, badge, place))| StoredReward {
            id: uuid::Uuid::new_v4().to_string(),
            title: format!("{place} - Monthly Top Capturer"),
            description: format!(
                "Awarded to {} for finishing {place} in {period}",
                entry.slave_name
            ),
            reward_type: RewardType::MonthlyTopCapturer,
            status: RewardStatus::Awarded,
            recipient_id: entry.slave_id.clone(),
            awarded_by: SYSTEM_AWARDER.to_string(),
            points,
            badge: Some(badge.to_string()),
            special_privileges: vec![],
            period: Some(period.to_string()),
            achievement_data: Some(AchievementData {
                captures_count: entry.monthly_captures,
                transformations_count: entry.transformed_count,
                streak_days: entry.current_streak,
                special_milestone: None,
            }),
            awarded_at: now,
            claimed_at: None,
            expires_at: Some(now + Duration::days(MONTHLY_AWARD_DAYS)),
            notes: None,
        })
        .collect()
}

/// Grant the current month's top-three awards.
///
/// Returns only the rewards created by this call; a second run in the same
/// period returns an empty list.
pub fn auto_award_monthly(db: &Database, now: DateTime<Utc>) -> StorageResult<Vec<StoredReward>> {
    let snapshot = Snapshot::load(db)?;
    let board = build_leaderboard(&snapshot, now);
    let period = period_of(now);
    let candidates = monthly_candidates(&board, &period, now);

    let awarded = RewardRepository::new(db).insert_once_per_period(
        RewardType::MonthlyTopCapturer,
        &period,
        candidates,
    )?;

    tracing::info!(period = %period, awarded = awarded.len(), "Monthly awards granted");
    Ok(awarded)
}
