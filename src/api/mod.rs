// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    routing::{get, patch, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    audit_log,
    auth::{AuthenticatedUser, Role},
    error::ApiError,
    leaderboard::LeaderboardEntry,
    models::{
        CaptureRequest, CreateFeedbackRequest, CreateRewardRequest, LoginRequest,
        SetUserRewardRequest, SignupRequest, SpecialRewardRequest, UpdateRewardRequest,
        UpdateUserRequest, UpdateVictimRequest, VoteRequest,
    },
    state::AppState,
    stats::{CapturerCount, PointEarner, RewardStats, SlaveStats, StatusHistogram, VictimStats},
    storage::{
        AchievementData, AuditEvent, AuditEventType, FeedbackType, RewardStatus, RewardType,
        StatusInput, StorageError, StoredFeedback, StoredReward, StoredVictim,
        TransformationStatus, UserResponse, VoteType,
    },
};

pub mod audit;
pub mod auth;
pub mod feedback;
pub mod health;
pub mod rewards;
pub mod users;
pub mod victims;

/// Convert a storage error, recording a denied ownership check first.
pub(crate) fn audit_denied(
    state: &AppState,
    caller: &AuthenticatedUser,
    resource_type: &str,
    resource_id: &str,
    err: StorageError,
) -> ApiError {
    if matches!(err, StorageError::PermissionDenied { .. }) {
        audit_log!(
            &state.db,
            AuditEvent::new(AuditEventType::PermissionDenied)
                .with_user(&caller.user_id)
                .with_resource(resource_type, resource_id)
                .failed(err.to_string())
        );
    }
    err.into()
}

pub fn router(state: AppState) -> Router {
    let routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .route("/auth/login", post(auth::login))
        // Users
        .route("/users", get(users::list_users))
        .route("/users/signup", post(users::signup))
        .route("/users/me", get(users::get_current_user))
        .route("/users/leaderboard", get(users::capture_leaderboard))
        .route("/users/developers", get(users::list_developers))
        .route("/users/available", get(users::list_available))
        .route("/users/victims", get(users::list_captured))
        .route(
            "/users/{user_id}",
            get(users::get_user)
                .patch(users::update_user)
                .delete(users::delete_user),
        )
        .route("/users/{user_id}/reward", patch(users::set_user_reward))
        // Victims
        .route("/victims", get(victims::list_victims))
        .route("/victims/create", post(victims::create_victim))
        .route("/victims/stats", get(victims::victim_stats))
        .route("/victims/my-stats", get(victims::my_stats))
        .route("/victims/slave/{slave_id}/victims", get(victims::slave_victims))
        .route("/victims/slave/{slave_id}/stats", get(victims::slave_stats))
        .route(
            "/victims/{victim_id}",
            get(victims::get_victim)
                .patch(victims::update_victim)
                .delete(victims::delete_victim),
        )
        // Feedback
        .route("/feedback", post(feedback::create_feedback))
        .route("/feedback/resistance-tips", get(feedback::resistance_tips))
        .route("/feedback/survival-stories", get(feedback::survival_stories))
        .route(
            "/feedback/slave-activity-reports",
            get(feedback::slave_activity_reports),
        )
        .route("/feedback/{feedback_id}", get(feedback::get_feedback))
        .route("/feedback/{feedback_id}/vote", patch(feedback::vote_feedback))
        // Rewards
        .route("/rewards/leaderboard", get(rewards::get_leaderboard))
        .route("/rewards/my-rewards", get(rewards::my_rewards))
        .route("/rewards/admin/all", get(rewards::list_all_rewards))
        .route("/rewards/admin/stats", get(rewards::reward_stats))
        .route("/rewards/admin/create", post(rewards::create_reward))
        .route(
            "/rewards/admin/special-reward",
            post(rewards::create_special_reward),
        )
        .route(
            "/rewards/admin/auto-award-monthly",
            post(rewards::auto_award_monthly),
        )
        .route(
            "/rewards/admin/{reward_id}",
            patch(rewards::update_reward).delete(rewards::delete_reward),
        )
        .route("/rewards/{reward_id}", get(rewards::get_reward))
        .route("/rewards/{reward_id}/claim", patch(rewards::claim_reward))
        // Audit
        .route("/audit/events", get(audit::query_audit_events))
        .with_state(state);

    Router::new()
        .merge(routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        health::liveness,
        health::readiness,
        auth::login,
        users::signup,
        users::list_users,
        users::get_current_user,
        users::capture_leaderboard,
        users::list_developers,
        users::list_available,
        users::list_captured,
        users::get_user,
        users::update_user,
        users::set_user_reward,
        users::delete_user,
        victims::create_victim,
        victims::list_victims,
        victims::victim_stats,
        victims::my_stats,
        victims::slave_victims,
        victims::slave_stats,
        victims::get_victim,
        victims::update_victim,
        victims::delete_victim,
        feedback::create_feedback,
        feedback::resistance_tips,
        feedback::survival_stories,
        feedback::slave_activity_reports,
        feedback::get_feedback,
        feedback::vote_feedback,
        rewards::get_leaderboard,
        rewards::my_rewards,
        rewards::claim_reward,
        rewards::get_reward,
        rewards::list_all_rewards,
        rewards::reward_stats,
        rewards::create_reward,
        rewards::create_special_reward,
        rewards::auto_award_monthly,
        rewards::update_reward,
        rewards::delete_reward,
        audit::query_audit_events
    ),
    components(
        schemas(
            Role,
            UserResponse,
            StoredVictim,
            TransformationStatus,
            StatusInput,
            StoredFeedback,
            FeedbackType,
            VoteType,
            StoredReward,
            RewardType,
            RewardStatus,
            AchievementData,
            AuditEvent,
            AuditEventType,
            LeaderboardEntry,
            StatusHistogram,
            CapturerCount,
            PointEarner,
            VictimStats,
            SlaveStats,
            RewardStats,
            LoginRequest,
            SignupRequest,
            UpdateUserRequest,
            SetUserRewardRequest,
            CaptureRequest,
            UpdateVictimRequest,
            CreateFeedbackRequest,
            VoteRequest,
            CreateRewardRequest,
            UpdateRewardRequest,
            SpecialRewardRequest,
            auth::LoginResponse,
            users::DeleteResponse,
            rewards::MonthlyAwardResponse,
            audit::AuditLogResponse,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Auth", description = "Session issuance"),
        (name = "Users", description = "Accounts and roles"),
        (name = "Victims", description = "Captures and transformation progress"),
        (name = "Feedback", description = "Developer resistance board"),
        (name = "Rewards", description = "Rewards and leaderboard"),
        (name = "Audit", description = "Security audit trail")
    )
)]
struct ApiDoc;
