// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Capture and reward statistics.
//!
//! The aggregations are pure functions over a [`Snapshot`] so they can be
//! tested without a database; the snapshot itself is read in a single read
//! transaction.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::Role;
use crate::storage::database::{DocumentReader, REWARDS, USERS, VICTIMS};
use crate::storage::{Database, StorageResult, StoredReward, StoredUser, StoredVictim, TransformationStatus};

const TOP_CAPTURERS_LIMIT: usize = 10;
const RECENT_CAPTURES_LIMIT: usize = 5;
const RECENT_REWARDS_LIMIT: usize = 10;
const TOP_EARNERS_LIMIT: usize = 10;

/// Consistent copy of the collections the aggregations read.
///
/// Victims are ordered by capture date, users by creation date.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub users: Vec<StoredUser>,
    pub victims: Vec<StoredVictim>,
    pub rewards: Vec<StoredReward>,
}

impl Snapshot {
    pub fn load(db: &Database) -> StorageResult<Self> {
        let (mut users, mut victims, rewards) = db.read(|txn| {
            let users: Vec<StoredUser> = txn.scan_docs(USERS)?;
            let victims: Vec<StoredVictim> = txn.scan_docs(VICTIMS)?;
            let rewards: Vec<StoredReward> = txn.scan_docs(REWARDS)?;
            Ok((users, victims, rewards))
        })?;

        users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        victims.sort_by(|a, b| a.capture_date.cmp(&b.capture_date).then_with(|| a.id.cmp(&b.id)));
        Ok(Self { users, victims, rewards })
    }

    pub fn user(&self, user_id: &str) -> Option<&StoredUser> {
        self.users.iter().find(|u| u.id == user_id)
    }
}

/// Victim count per transformation status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusHistogram {
    pub captured: u32,
    pub in_progress: u32,
    pub transformed: u32,
    pub resisting: u32,
}

impl StatusHistogram {
    pub fn from_victims<'a>(victims: impl IntoIterator<Item = &'a StoredVictim>) -> Self {
        let mut histogram = Self::default();
        for victim in victims {
            let slot = match victim.transformation_status {
                TransformationStatus::Captured => &mut histogram.captured,
                TransformationStatus::InProgress => &mut histogram.in_progress,
                TransformationStatus::Transformed => &mut histogram.transformed,
                TransformationStatus::Resisting => &mut histogram.resisting,
            };
            *slot += 1;
        }
        histogram
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CapturerCount {
    pub slave_id: String,
    pub username: String,
    pub count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VictimStats {
    pub total_victims: usize,
    pub by_status: StatusHistogram,
    pub top_capturers: Vec<CapturerCount>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SlaveStats {
    pub total_captures: usize,
    pub by_status: StatusHistogram,
    /// Five most recent captures, newest first
    pub recent_captures: Vec<StoredVictim>,
    /// 1-based position among top capturers; one past the end if unranked
    pub ranking: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PointEarner {
    pub user_id: String,
    pub username: String,
    pub total_points: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RewardStats {
    pub total_rewards: usize,
    pub by_type: BTreeMap<String, u32>,
    pub by_status: BTreeMap<String, u32>,
    pub recent_rewards: Vec<StoredReward>,
    pub top_point_earners: Vec<PointEarner>,
}

/// Slave captors ranked by number of victims, top ten.
///
/// Equal counts keep the order in which each captor first captured.
pub fn top_capturers(snapshot: &Snapshot) -> Vec<CapturerCount> {
    let mut counts: Vec<CapturerCount> = Vec::new();
    for victim in &snapshot.victims {
        match counts.iter_mut().find(|c| c.slave_id == victim.captured_by) {
            Some(entry) => entry.count += 1,
            None => {
                let Some(user) = snapshot
                    .user(&victim.captured_by)
                    .filter(|u| u.has_role(Role::Slave))
                else {
                    continue;
                };
                counts.push(CapturerCount {
                    slave_id: user.id.clone(),
                    username: user.username.clone(),
                    count: 1,
                });
            }
        }
    }

    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts.truncate(TOP_CAPTURERS_LIMIT);
    counts
}

pub fn victim_stats(snapshot: &Snapshot) -> VictimStats {
    VictimStats {
        total_victims: snapshot.victims.len(),
        by_status: StatusHistogram::from_victims(&snapshot.victims),
        top_capturers: top_capturers(snapshot),
    }
}

pub fn slave_stats(snapshot: &Snapshot, captor_id: &str) -> SlaveStats {
    let mine: Vec<&StoredVictim> = snapshot
        .victims
        .iter()
        .filter(|v| v.captured_by == captor_id)
        .collect();

    let recent_captures = mine
        .iter()
        .rev()
        .take(RECENT_CAPTURES_LIMIT)
        .map(|v| (*v).clone())
        .collect();

    let top = top_capturers(snapshot);
    let ranking = top
        .iter()
        .position(|c| c.slave_id == captor_id)
        .map_or(top.len() + 1, |i| i + 1);

    SlaveStats {
        total_captures: mine.len(),
        by_status: StatusHistogram::from_victims(mine.iter().copied()),
        recent_captures,
        ranking,
    }
}

pub fn reward_stats(snapshot: &Snapshot) -> RewardStats {
    let mut by_type = BTreeMap::new();
    let mut by_status = BTreeMap::new();
    let mut totals: Vec<(String, u64)> = Vec::new();

    for reward in &snapshot.rewards {
        *by_type.entry(reward.reward_type.as_str().to_string()).or_insert(0) += 1;
        *by_status.entry(reward.status.as_str().to_string()).or_insert(0) += 1;
        match totals.iter_mut().find(|(id, _)| *id == reward.recipient_id) {
            Some((_, points)) => *points += u64::from(reward.points),
            None => totals.push((reward.recipient_id.clone(), u64::from(reward.points))),
        }
    }

    totals.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    let top_point_earners = totals
        .into_iter()
        .take(TOP_EARNERS_LIMIT)
        .map(|(user_id, total_points)| PointEarner {
            username: snapshot
                .user(&user_id)
                .map_or_else(|| "Unknown".to_string(), |u| u.username.clone()),
            user_id,
            total_points,
        })
        .collect();

    let mut recent_rewards = snapshot.rewards.clone();
    recent_rewards.sort_by(|a, b| b.awarded_at.cmp(&a.awarded_at));
    recent_rewards.truncate(RECENT_REWARDS_LIMIT);

    RewardStats {
        total_rewards: snapshot.rewards.len(),
        by_type,
        by_status,
        recent_rewards,
        top_point_earners,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    use crate::storage::{RewardStatus, RewardType};

    pub(crate) fn user(id: &str, role: &str) -> StoredUser {
        StoredUser {
            id: id.to_string(),
            username: format!("{id}_name"),
            password_hash: String::new(),
            role: role.to_string(),
            capture_count: 0,
            is_victim: false,
            reward: None,
            created_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    pub(crate) fn victim(
        id: &str,
        captor: &str,
        status: TransformationStatus,
        at: DateTime<Utc>,
    ) -> StoredVictim {
        StoredVictim {
            id: id.to_string(),
            skills: vec![],
            last_seen: String::new(),
            transformation_status: status,
            status_label: None,
            captured_by: captor.to_string(),
            developer_id: format!("dev_{id}"),
            capture_date: at,
            completion_date: None,
        }
    }

    pub(crate) fn reward(id: &str, recipient: &str, points: u32, at: DateTime<Utc>) -> StoredReward {
        StoredReward {
            id: id.to_string(),
            title: "t".to_string(),
            description: "d".to_string(),
            reward_type: RewardType::SpecialRecognition,
            status: RewardStatus::Awarded,
            recipient_id: recipient.to_string(),
            awarded_by: "juan".to_string(),
            points,
            badge: None,
            special_privileges: vec![],
            period: None,
            achievement_data: None,
            awarded_at: at,
            claimed_at: None,
            expires_at: None,
            notes: None,
        }
    }

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 1, 12, 0, 0).unwrap()
    }

    fn sample() -> Snapshot {
        use TransformationStatus::*;
        let t = base();
        Snapshot {
            users: vec![user("s1", "slave"), user("s2", "slave"), user("juan", "juan")],
            victims: vec![
                victim("v1", "s2", Captured, t),
                victim("v2", "s1", InProgress, t + Duration::hours(1)),
                victim("v3", "s1", Transformed, t + Duration::hours(2)),
                victim("v4", "juan", Resisting, t + Duration::hours(3)),
                victim("v5", "s2", Captured, t + Duration::hours(4)),
            ],
            rewards: vec![],
        }
    }

    #[test]
    fn histogram_counts_every_status() {
        let stats = victim_stats(&sample());
        assert_eq!(stats.total_victims, 5);
        assert_eq!(
            stats.by_status,
            StatusHistogram {
                captured: 2,
                in_progress: 1,
                transformed: 1,
                resisting: 1,
            }
        );
    }

    #[test]
    fn top_capturers_exclude_admin_and_keep_first_capture_order_on_ties() {
        let top = top_capturers(&sample());
        let ids: Vec<&str> = top.iter().map(|c| c.slave_id.as_str()).collect();
        // s2 captured first, both have two
        assert_eq!(ids, vec!["s2", "s1"]);
        assert_eq!(top[0].username, "s2_name");
    }

    #[test]
    fn slave_stats_ranking_and_recent() {
        let snapshot = sample();
        let stats = slave_stats(&snapshot, "s1");
        assert_eq!(stats.total_captures, 2);
        assert_eq!(stats.ranking, 2);
        assert_eq!(stats.recent_captures[0].id, "v3");
        assert_eq!(stats.by_status.transformed, 1);

        let unranked = slave_stats(&snapshot, "nobody");
        assert_eq!(unranked.total_captures, 0);
        assert_eq!(unranked.ranking, 3);
    }

    #[test]
    fn recent_captures_capped_at_five() {
        let t = base();
        let mut snapshot = sample();
        snapshot.victims = (0..8)
            .map(|i| victim(&format!("v{i}"), "s1", TransformationStatus::Captured, t + Duration::hours(i)))
            .collect();
        let stats = slave_stats(&snapshot, "s1");
        assert_eq!(stats.recent_captures.len(), 5);
        assert_eq!(stats.recent_captures[0].id, "v7");
    }

    #[test]
    fn reward_stats_groups_and_ranks() {
        let t = base();
        let mut snapshot = sample();
        snapshot.rewards = vec![
            reward("r1", "s1", 10, t),
            reward("r2", "s2", 50, t + Duration::hours(1)),
            reward("r3", "s1", 15, t + Duration::hours(2)),
            reward("r4", "ghost", 5, t + Duration::hours(3)),
        ];

        let stats = reward_stats(&snapshot);
        assert_eq!(stats.total_rewards, 4);
        assert_eq!(stats.by_type.get("special_recognition"), Some(&4));
        assert_eq!(stats.by_status.get("awarded"), Some(&4));
        assert_eq!(stats.recent_rewards[0].id, "r4");

        let earners: Vec<(&str, u64)> = stats
            .top_point_earners
            .iter()
            .map(|e| (e.user_id.as_str(), e.total_points))
            .collect();
        assert_eq!(earners, vec![("s2", 50), ("s1", 25), ("ghost", 5)]);
        assert_eq!(stats.top_point_earners[2].username, "Unknown");
    }

    #[test]
    fn snapshot_loads_sorted_collections() {
        use crate::models::CaptureRequest;
        use crate::storage::{UserRepository, VictimRepository};

        let db = Database::in_memory().unwrap();
        let users = UserRepository::new(&db);
        let slave = users.create("s1", "hash", Role::Slave).unwrap();
        let d1 = users.create("d1", "hash", Role::Developer).unwrap();
        let d2 = users.create("d2", "hash", Role::Developer).unwrap();
        let victims = VictimRepository::new(&db);
        for dev in [&d1, &d2] {
            victims
                .capture(
                    &slave.id,
                    &CaptureRequest {
                        developer_id: dev.id.clone(),
                        skills: vec![],
                        last_seen: None,
                        transformation_status: None,
                        status_label: None,
                    },
                )
                .unwrap();
        }

        let snapshot = Snapshot::load(&db).unwrap();
        assert_eq!(snapshot.users.len(), 3);
        assert_eq!(snapshot.victims.len(), 2);
        assert!(snapshot.victims[0].capture_date <= snapshot.victims[1].capture_date);
        assert_eq!(victim_stats(&snapshot).top_capturers[0].count, 2);
    }
}
