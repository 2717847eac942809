// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Developer feedback board: posts and votes.
//!
//! Only developers may read, post or vote. Vote counts are always derived
//! from the stored voter sets, never from client input.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    audit_log,
    auth::{Authorized, DeveloperOnly},
    error::ApiError,
    models::{CreateFeedbackRequest, VoteRequest},
    state::AppState,
    storage::{AuditEvent, AuditEventType, FeedbackRepository, FeedbackType, StoredFeedback},
};

#[utoipa::path(
    post,
    path = "/feedback",
    tag = "Feedback",
    security(("bearer_auth" = [])),
    request_body = CreateFeedbackRequest,
    responses(
        (status = 201, description = "Feedback posted", body = StoredFeedback),
        (status = 400, description = "Missing title or message"),
        (status = 403, description = "Developers only")
    )
)]
pub async fn create_feedback(
    Authorized(caller, _): Authorized<DeveloperOnly>,
    State(state): State<AppState>,
    body: Result<Json<CreateFeedbackRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<StoredFeedback>), ApiError> {
    let Json(request) = body?;
    let feedback = FeedbackRepository::new(&state.db).create(&caller.user_id, &request)?;

    audit_log!(
        &state.db,
        AuditEventType::FeedbackCreated,
        &caller,
        "feedback",
        &feedback.id
    );

    Ok((StatusCode::CREATED, Json(feedback)))
}

fn list(state: &AppState, feedback_type: FeedbackType) -> Result<Json<Vec<StoredFeedback>>, ApiError> {
    Ok(Json(FeedbackRepository::new(&state.db).list_by_type(feedback_type)?))
}

/// Twenty most upvoted resistance tips.
#[utoipa::path(
    get,
    path = "/feedback/resistance-tips",
    tag = "Feedback",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Resistance tips", body = Vec<StoredFeedback>))
)]
pub async fn resistance_tips(
    _caller: Authorized<DeveloperOnly>,
    State(state): State<AppState>,
) -> Result<Json<Vec<StoredFeedback>>, ApiError> {
    list(&state, FeedbackType::ResistanceTip)
}

/// Ten most upvoted survival stories, newest first on ties.
#[utoipa::path(
    get,
    path = "/feedback/survival-stories",
    tag = "Feedback",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Survival stories", body = Vec<StoredFeedback>))
)]
pub async fn survival_stories(
    _caller: Authorized<DeveloperOnly>,
    State(state): State<AppState>,
) -> Result<Json<Vec<StoredFeedback>>, ApiError> {
    list(&state, FeedbackType::SurvivalStory)
}

/// All slave activity reports, newest first.
#[utoipa::path(
    get,
    path = "/feedback/slave-activity-reports",
    tag = "Feedback",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Slave activity reports", body = Vec<StoredFeedback>))
)]
pub async fn slave_activity_reports(
    _caller: Authorized<DeveloperOnly>,
    State(state): State<AppState>,
) -> Result<Json<Vec<StoredFeedback>>, ApiError> {
    list(&state, FeedbackType::SlaveActivityReport)
}

#[utoipa::path(
    get,
    path = "/feedback/{feedback_id}",
    tag = "Feedback",
    security(("bearer_auth" = [])),
    params(("feedback_id" = String, Path, description = "Feedback ID")),
    responses(
        (status = 200, description = "Feedback", body = StoredFeedback),
        (status = 404, description = "Feedback not found")
    )
)]
pub async fn get_feedback(
    _caller: Authorized<DeveloperOnly>,
    State(state): State<AppState>,
    Path(feedback_id): Path<String>,
) -> Result<Json<StoredFeedback>, ApiError> {
    Ok(Json(FeedbackRepository::new(&state.db).get(&feedback_id)?))
}

/// Toggle the caller's vote.
///
/// Voting the same way twice retracts the vote; voting the other way flips it.
#[utoipa::path(
    patch,
    path = "/feedback/{feedback_id}/vote",
    tag = "Feedback",
    security(("bearer_auth" = [])),
    params(("feedback_id" = String, Path, description = "Feedback ID")),
    request_body = VoteRequest,
    responses(
        (status = 200, description = "Feedback after the vote", body = StoredFeedback),
        (status = 400, description = "Unknown vote type"),
        (status = 404, description = "Feedback not found")
    )
)]
pub async fn vote_feedback(
    Authorized(caller, _): Authorized<DeveloperOnly>,
    State(state): State<AppState>,
    Path(feedback_id): Path<String>,
    body: Result<Json<VoteRequest>, JsonRejection>,
) -> Result<Json<StoredFeedback>, ApiError> {
    let Json(request) = body?;
    let (feedback, outcome) =
        FeedbackRepository::new(&state.db).vote(&feedback_id, request.vote_type, &caller.user_id)?;

    tracing::debug!(
        feedback_id = %feedback_id,
        outcome = outcome.as_str(),
        upvotes = feedback.upvotes,
        downvotes = feedback.downvotes,
        "Vote recorded"
    );
    audit_log!(
        &state.db,
        AuditEvent::new(AuditEventType::FeedbackVoted)
            .with_user(&caller.user_id)
            .with_resource("feedback", &feedback_id)
            .with_details(serde_json::json!({ "vote": request.vote_type, "outcome": outcome.as_str() }))
    );

    Ok(Json(feedback))
}
