// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Reward endpoints.
//!
//! The leaderboard is public. Slaves read and claim their own rewards;
//! everything under `/rewards/admin` is reserved to `juan`.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    audit_log,
    auth::{Authorized, JuanOnly, JuanOrSlave, SlaveOnly},
    error::ApiError,
    leaderboard::{self, LeaderboardEntry},
    models::{CreateRewardRequest, SpecialRewardRequest, UpdateRewardRequest},
    state::AppState,
    stats::{self, RewardStats, Snapshot},
    storage::{AuditEvent, AuditEventType, RewardRepository, RewardType, StoredReward},
};

use super::{audit_denied, users::DeleteResponse};

const SPECIAL_REWARD_POINTS: u32 = 10;

/// Result of a monthly award run.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MonthlyAwardResponse {
    /// `YYYY-MM`
    pub period: String,
    /// Rewards created by this run; empty if the period was already awarded.
    pub awarded: Vec<StoredReward>,
}

fn audit_award(state: &AppState, awarded_by: &str, reward: &StoredReward) {
    audit_log!(
        &state.db,
        AuditEvent::new(AuditEventType::RewardAwarded)
            .with_user(awarded_by)
            .with_resource("reward", &reward.id)
            .with_details(serde_json::json!({
                "recipientId": reward.recipient_id,
                "type": reward.reward_type,
                "points": reward.points,
            }))
    );
}

/// Public slave standings.
#[utoipa::path(
    get,
    path = "/rewards/leaderboard",
    tag = "Rewards",
    responses((status = 200, description = "Ranked slaves", body = Vec<LeaderboardEntry>))
)]
pub async fn get_leaderboard(
    State(state): State<AppState>,
) -> Result<Json<Vec<LeaderboardEntry>>, ApiError> {
    Ok(Json(leaderboard::leaderboard(&state.db)?))
}

#[utoipa::path(
    get,
    path = "/rewards/my-rewards",
    tag = "Rewards",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Caller's rewards, newest first", body = Vec<StoredReward>),
        (status = 403, description = "Slaves only")
    )
)]
pub async fn my_rewards(
    Authorized(caller, _): Authorized<SlaveOnly>,
    State(state): State<AppState>,
) -> Result<Json<Vec<StoredReward>>, ApiError> {
    Ok(Json(RewardRepository::new(&state.db).list_by_recipient(&caller.user_id)?))
}

/// Claim an awarded reward.
#[utoipa::path(
    patch,
    path = "/rewards/{reward_id}/claim",
    tag = "Rewards",
    security(("bearer_auth" = [])),
    params(("reward_id" = String, Path, description = "Reward ID")),
    responses(
        (status = 200, description = "Reward claimed", body = StoredReward),
        (status = 400, description = "Reward is not in awarded state"),
        (status = 403, description = "Not the recipient"),
        (status = 404, description = "Reward not found")
    )
)]
pub async fn claim_reward(
    Authorized(caller, _): Authorized<SlaveOnly>,
    State(state): State<AppState>,
    Path(reward_id): Path<String>,
) -> Result<Json<StoredReward>, ApiError> {
    let reward = RewardRepository::new(&state.db)
        .claim(&reward_id, &caller)
        .map_err(|e| audit_denied(&state, &caller, "reward", &reward_id, e))?;

    audit_log!(&state.db, AuditEventType::RewardClaimed, &caller, "reward", &reward_id);

    Ok(Json(reward))
}

#[utoipa::path(
    get,
    path = "/rewards/{reward_id}",
    tag = "Rewards",
    security(("bearer_auth" = [])),
    params(("reward_id" = String, Path, description = "Reward ID")),
    responses(
        (status = 200, description = "Reward", body = StoredReward),
        (status = 403, description = "Not the recipient"),
        (status = 404, description = "Reward not found")
    )
)]
pub async fn get_reward(
    Authorized(caller, _): Authorized<JuanOrSlave>,
    State(state): State<AppState>,
    Path(reward_id): Path<String>,
) -> Result<Json<StoredReward>, ApiError> {
    let reward = RewardRepository::new(&state.db)
        .get_for(&reward_id, &caller)
        .map_err(|e| audit_denied(&state, &caller, "reward", &reward_id, e))?;
    Ok(Json(reward))
}

#[utoipa::path(
    get,
    path = "/rewards/admin/all",
    tag = "Rewards",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Every reward, newest first", body = Vec<StoredReward>))
)]
pub async fn list_all_rewards(
    _caller: Authorized<JuanOnly>,
    State(state): State<AppState>,
) -> Result<Json<Vec<StoredReward>>, ApiError> {
    Ok(Json(RewardRepository::new(&state.db).list_all()?))
}

#[utoipa::path(
    get,
    path = "/rewards/admin/stats",
    tag = "Rewards",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Reward statistics", body = RewardStats))
)]
pub async fn reward_stats(
    _caller: Authorized<JuanOnly>,
    State(state): State<AppState>,
) -> Result<Json<RewardStats>, ApiError> {
    let snapshot = Snapshot::load(&state.db)?;
    Ok(Json(stats::reward_stats(&snapshot)))
}

#[utoipa::path(
    post,
    path = "/rewards/admin/create",
    tag = "Rewards",
    security(("bearer_auth" = [])),
    request_body = CreateRewardRequest,
    responses(
        (status = 201, description = "Reward awarded", body = StoredReward),
        (status = 400, description = "Invalid body"),
        (status = 404, description = "Recipient not found")
    )
)]
pub async fn create_reward(
    Authorized(caller, _): Authorized<JuanOnly>,
    State(state): State<AppState>,
    body: Result<Json<CreateRewardRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<StoredReward>), ApiError> {
    let Json(request) = body?;
    let reward = StoredReward::from_request(&request, &caller.user_id, Utc::now());
    RewardRepository::new(&state.db).create(&reward)?;

    audit_award(&state, &caller.user_id, &reward);
    Ok((StatusCode::CREATED, Json(reward)))
}

/// Hand out a special recognition (10 points unless stated).
#[utoipa::path(
    post,
    path = "/rewards/admin/special-reward",
    tag = "Rewards",
    security(("bearer_auth" = [])),
    request_body = SpecialRewardRequest,
    responses(
        (status = 201, description = "Reward awarded", body = StoredReward),
        (status = 404, description = "Recipient not found")
    )
)]
pub async fn create_special_reward(
    Authorized(caller, _): Authorized<JuanOnly>,
    State(state): State<AppState>,
    body: Result<Json<SpecialRewardRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<StoredReward>), ApiError> {
    let Json(request) = body?;
    let full = CreateRewardRequest {
        title: request.title,
        description: request.description,
        reward_type: RewardType::SpecialRecognition,
        recipient_id: request.recipient_id,
        points: request.points.unwrap_or(SPECIAL_REWARD_POINTS),
        badge: request.badge,
        special_privileges: request.special_privileges,
        period: None,
        achievement_data: None,
        expires_at: None,
        notes: request.notes,
    };
    let reward = StoredReward::from_request(&full, &caller.user_id, Utc::now());
    RewardRepository::new(&state.db).create(&reward)?;

    audit_award(&state, &caller.user_id, &reward);
    Ok((StatusCode::CREATED, Json(reward)))
}

/// Award this month's top three capturers. Safe to call repeatedly.
#[utoipa::path(
    post,
    path = "/rewards/admin/auto-award-monthly",
    tag = "Rewards",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Awards created by this run", body = MonthlyAwardResponse))
)]
pub async fn auto_award_monthly(
    Authorized(caller, _): Authorized<JuanOnly>,
    State(state): State<AppState>,
) -> Result<Json<MonthlyAwardResponse>, ApiError> {
    let now = Utc::now();
    let awarded = leaderboard::auto_award_monthly(&state.db, now)?;
    let period = leaderboard::period_of(now);

    audit_log!(
        &state.db,
        AuditEvent::new(AuditEventType::MonthlyAwardsGranted)
            .with_user(&caller.user_id)
            .with_details(serde_json::json!({ "period": period, "awarded": awarded.len() }))
    );

    Ok(Json(MonthlyAwardResponse { period, awarded }))
}

#[utoipa::path(
    patch,
    path = "/rewards/admin/{reward_id}",
    tag = "Rewards",
    security(("bearer_auth" = [])),
    params(("reward_id" = String, Path, description = "Reward ID")),
    request_body = UpdateRewardRequest,
    responses(
        (status = 200, description = "Updated reward", body = StoredReward),
        (status = 400, description = "Field outside the allow-list"),
        (status = 404, description = "Reward not found")
    )
)]
pub async fn update_reward(
    Authorized(caller, _): Authorized<JuanOnly>,
    State(state): State<AppState>,
    Path(reward_id): Path<String>,
    body: Result<Json<UpdateRewardRequest>, JsonRejection>,
) -> Result<Json<StoredReward>, ApiError> {
    let Json(patch) = body?;
    let reward = RewardRepository::new(&state.db).update(&reward_id, &patch)?;

    audit_log!(&state.db, AuditEventType::RewardUpdated, &caller, "reward", &reward_id);

    Ok(Json(reward))
}

#[utoipa::path(
    delete,
    path = "/rewards/admin/{reward_id}",
    tag = "Rewards",
    security(("bearer_auth" = [])),
    params(("reward_id" = String, Path, description = "Reward ID")),
    responses(
        (status = 200, description = "Reward deleted", body = DeleteResponse),
        (status = 404, description = "Reward not found")
    )
)]
pub async fn delete_reward(
    Authorized(caller, _): Authorized<JuanOnly>,
    State(state): State<AppState>,
    Path(reward_id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    RewardRepository::new(&state.db).delete(&reward_id)?;

    audit_log!(&state.db, AuditEventType::RewardDeleted, &caller, "reward", &reward_id);

    Ok(Json(DeleteResponse {
        message: "Reward deleted successfully".to_string(),
        id: reward_id,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthenticatedUser, Role};
    use crate::storage::{RewardStatus, StoredUser, UserRepository};
    use std::marker::PhantomData;

    fn caller<P: crate::auth::RoutePolicy>(user: &StoredUser) -> Authorized<P> {
        Authorized(
            AuthenticatedUser {
                user_id: user.id.clone(),
                username: user.username.clone(),
                role: user.role().unwrap(),
                expires_at: 0,
            },
            PhantomData,
        )
    }

    fn special(recipient_id: &str) -> Result<Json<SpecialRewardRequest>, JsonRejection> {
        Ok(Json(SpecialRewardRequest {
            recipient_id: recipient_id.to_string(),
            title: "Above and beyond".to_string(),
            description: "Captured a 10x engineer".to_string(),
            points: None,
            badge: None,
            special_privileges: vec!["extra_coffee".to_string()],
            notes: None,
        }))
    }

    #[tokio::test]
    async fn special_reward_defaults_and_claim_flow() {
        let state = AppState::for_tests();
        let users = UserRepository::new(&state.db);
        let juan = users.create("juan", "hash", Role::Juan).unwrap();
        let s1 = users.create("s1", "hash", Role::Slave).unwrap();
        let s2 = users.create("s2", "hash", Role::Slave).unwrap();

        let (status, Json(reward)) =
            create_special_reward(caller(&juan), State(state.clone()), special(&s1.id))
                .await
                .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(reward.points, 10);
        assert_eq!(reward.reward_type, RewardType::SpecialRecognition);
        assert_eq!(reward.awarded_by, juan.id);

        let err = get_reward(caller(&s2), State(state.clone()), Path(reward.id.clone()))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::FORBIDDEN);

        let err = claim_reward(caller(&s2), State(state.clone()), Path(reward.id.clone()))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::FORBIDDEN);

        let Json(claimed) = claim_reward(caller(&s1), State(state.clone()), Path(reward.id.clone()))
            .await
            .unwrap();
        assert_eq!(claimed.status, RewardStatus::Claimed);

        let err = claim_reward(caller(&s1), State(state.clone()), Path(reward.id.clone()))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let Json(mine) = my_rewards(caller(&s1), State(state)).await.unwrap();
        assert_eq!(mine.len(), 1);
    }

    #[tokio::test]
    async fn monthly_award_twice_creates_no_duplicates() {
        let state = AppState::for_tests();
        let users = UserRepository::new(&state.db);
        let juan = users.create("juan", "hash", Role::Juan).unwrap();
        users.create("s1", "hash", Role::Slave).unwrap();
        users.create("s2", "hash", Role::Slave).unwrap();

        let Json(first) = auto_award_monthly(caller(&juan), State(state.clone())).await.unwrap();
        assert_eq!(first.awarded.len(), 2);

        let Json(second) = auto_award_monthly(caller(&juan), State(state.clone())).await.unwrap();
        assert!(second.awarded.is_empty());
        assert_eq!(first.period, second.period);

        let Json(board) = get_leaderboard(State(state.clone())).await.unwrap();
        assert_eq!(board[0].total_points, 100);
        assert_eq!(board[0].badges, vec!["top_capturer_1".to_string()]);

        let Json(stats) = reward_stats(caller(&juan), State(state)).await.unwrap();
        assert_eq!(stats.total_rewards, 2);
        assert_eq!(stats.by_type.get("monthly_top_capturer"), Some(&2));
    }

    #[tokio::test]
    async fn create_reward_for_missing_recipient_is_not_found() {
        let state = AppState::for_tests();
        let juan = UserRepository::new(&state.db)
            .create("juan", "hash", Role::Juan)
            .unwrap();
        let err = create_special_reward(caller(&juan), State(state), special("ghost"))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }
}
