// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Victim endpoints: capture, listing, statistics and captor edits.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    audit_log,
    auth::{Authorized, JuanOnly, JuanOrSlave},
    error::ApiError,
    models::{CaptureRequest, UpdateVictimRequest},
    state::AppState,
    stats::{self, SlaveStats, Snapshot, VictimStats},
    storage::{AuditEvent, AuditEventType, StoredVictim, VictimRepository},
};

use super::{audit_denied, users::DeleteResponse};

/// Capture a developer. The caller becomes the captor.
#[utoipa::path(
    post,
    path = "/victims/create",
    tag = "Victims",
    security(("bearer_auth" = [])),
    request_body = CaptureRequest,
    responses(
        (status = 201, description = "Developer captured", body = StoredVictim),
        (status = 400, description = "Malformed body"),
        (status = 403, description = "Only juan and slaves capture"),
        (status = 404, description = "Developer not found"),
        (status = 409, description = "Developer is already a victim")
    )
)]
pub async fn create_victim(
    Authorized(caller, _): Authorized<JuanOrSlave>,
    State(state): State<AppState>,
    body: Result<Json<CaptureRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<StoredVictim>), ApiError> {
    let Json(request) = body?;
    let victim = VictimRepository::new(&state.db).capture(&caller.user_id, &request)?;

    audit_log!(
        &state.db,
        AuditEvent::new(AuditEventType::DeveloperCaptured)
            .with_user(&caller.user_id)
            .with_resource("victim", &victim.id)
            .with_details(serde_json::json!({ "developerId": victim.developer_id }))
    );

    Ok((StatusCode::CREATED, Json(victim)))
}

/// Victims visible to the caller: all for juan, own captures for a slave.
#[utoipa::path(
    get,
    path = "/victims",
    tag = "Victims",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Victims", body = Vec<StoredVictim>),
        (status = 403, description = "Developers cannot list victims")
    )
)]
pub async fn list_victims(
    Authorized(caller, _): Authorized<JuanOrSlave>,
    State(state): State<AppState>,
) -> Result<Json<Vec<StoredVictim>>, ApiError> {
    let repo = VictimRepository::new(&state.db);
    let victims = if caller.is_juan() {
        repo.list_all()?
    } else {
        repo.list_by_captor(&caller.user_id)?
    };
    Ok(Json(victims))
}

#[utoipa::path(
    get,
    path = "/victims/stats",
    tag = "Victims",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Global capture statistics", body = VictimStats))
)]
pub async fn victim_stats(
    _caller: Authorized<JuanOrSlave>,
    State(state): State<AppState>,
) -> Result<Json<VictimStats>, ApiError> {
    let snapshot = Snapshot::load(&state.db)?;
    Ok(Json(stats::victim_stats(&snapshot)))
}

#[utoipa::path(
    get,
    path = "/victims/my-stats",
    tag = "Victims",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Caller's capture statistics", body = SlaveStats))
)]
pub async fn my_stats(
    Authorized(caller, _): Authorized<JuanOrSlave>,
    State(state): State<AppState>,
) -> Result<Json<SlaveStats>, ApiError> {
    let snapshot = Snapshot::load(&state.db)?;
    Ok(Json(stats::slave_stats(&snapshot, &caller.user_id)))
}

#[utoipa::path(
    get,
    path = "/victims/slave/{slave_id}/victims",
    tag = "Victims",
    security(("bearer_auth" = [])),
    params(("slave_id" = String, Path, description = "Captor user ID")),
    responses((status = 200, description = "Victims of one captor", body = Vec<StoredVictim>))
)]
pub async fn slave_victims(
    _caller: Authorized<JuanOnly>,
    State(state): State<AppState>,
    Path(slave_id): Path<String>,
) -> Result<Json<Vec<StoredVictim>>, ApiError> {
    Ok(Json(VictimRepository::new(&state.db).list_by_captor(&slave_id)?))
}

#[utoipa::path(
    get,
    path = "/victims/slave/{slave_id}/stats",
    tag = "Victims",
    security(("bearer_auth" = [])),
    params(("slave_id" = String, Path, description = "Captor user ID")),
    responses((status = 200, description = "Statistics of one captor", body = SlaveStats))
)]
pub async fn slave_stats(
    _caller: Authorized<JuanOnly>,
    State(state): State<AppState>,
    Path(slave_id): Path<String>,
) -> Result<Json<SlaveStats>, ApiError> {
    let snapshot = Snapshot::load(&state.db)?;
    Ok(Json(stats::slave_stats(&snapshot, &slave_id)))
}

#[utoipa::path(
    get,
    path = "/victims/{victim_id}",
    tag = "Victims",
    security(("bearer_auth" = [])),
    params(("victim_id" = String, Path, description = "Victim ID")),
    responses(
        (status = 200, description = "Victim", body = StoredVictim),
        (status = 404, description = "Victim not found")
    )
)]
pub async fn get_victim(
    _caller: Authorized<JuanOrSlave>,
    State(state): State<AppState>,
    Path(victim_id): Path<String>,
) -> Result<Json<StoredVictim>, ApiError> {
    Ok(Json(VictimRepository::new(&state.db).get(&victim_id)?))
}

/// Patch a victim. Only its captor or juan may do so.
///
/// Moving out of `transformed` is rejected.
#[utoipa::path(
    patch,
    path = "/victims/{victim_id}",
    tag = "Victims",
    security(("bearer_auth" = [])),
    params(("victim_id" = String, Path, description = "Victim ID")),
    request_body = UpdateVictimRequest,
    responses(
        (status = 200, description = "Updated victim", body = StoredVictim),
        (status = 400, description = "Unknown field or invalid transition"),
        (status = 403, description = "Not the captor"),
        (status = 404, description = "Victim not found")
    )
)]
pub async fn update_victim(
    Authorized(caller, _): Authorized<JuanOrSlave>,
    State(state): State<AppState>,
    Path(victim_id): Path<String>,
    body: Result<Json<UpdateVictimRequest>, JsonRejection>,
) -> Result<Json<StoredVictim>, ApiError> {
    let Json(patch) = body?;
    let victim = VictimRepository::new(&state.db)
        .update(&victim_id, &patch, &caller)
        .map_err(|e| audit_denied(&state, &caller, "victim", &victim_id, e))?;

    audit_log!(
        &state.db,
        AuditEvent::new(AuditEventType::VictimUpdated)
            .with_user(&caller.user_id)
            .with_resource("victim", &victim_id)
            .with_details(serde_json::json!({
                "transformationStatus": victim.transformation_status.as_str()
            }))
    );

    Ok(Json(victim))
}

/// Delete a victim record. The developer stays marked as captured.
#[utoipa::path(
    delete,
    path = "/victims/{victim_id}",
    tag = "Victims",
    security(("bearer_auth" = [])),
    params(("victim_id" = String, Path, description = "Victim ID")),
    responses(
        (status = 200, description = "Victim deleted", body = DeleteResponse),
        (status = 403, description = "Not juan"),
        (status = 404, description = "Victim not found")
    )
)]
pub async fn delete_victim(
    Authorized(caller, _): Authorized<JuanOnly>,
    State(state): State<AppState>,
    Path(victim_id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    VictimRepository::new(&state.db)
        .delete(&victim_id, &caller)
        .map_err(|e| audit_denied(&state, &caller, "victim", &victim_id, e))?;

    audit_log!(&state.db, AuditEventType::VictimDeleted, &caller, "victim", &victim_id);

    Ok(Json(DeleteResponse {
        message: "Victim deleted successfully".to_string(),
        id: victim_id,
    }))
}
