// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Audit trail query endpoint.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    auth::{Authorized, JuanOnly},
    error::ApiError,
    state::AppState,
    storage::{AuditEvent, AuditEventType, AuditFilter, AuditRepository},
};

const DEFAULT_LIMIT: usize = 100;
const MAX_LIMIT: usize = 1000;

/// Query parameters for audit log search.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct AuditQueryParams {
    /// Filter by user ID.
    pub user_id: Option<String>,
    /// Filter by event type (e.g. `login_failed`).
    pub event_type: Option<AuditEventType>,
    /// Maximum number of results (default 100, max 1000).
    pub limit: Option<usize>,
}

/// Response for audit log queries.
#[derive(Debug, Serialize, ToSchema)]
pub struct AuditLogResponse {
    /// Matching events, newest first.
    pub events: Vec<AuditEvent>,
    pub total: usize,
}

/// Query the audit log.
#[utoipa::path(
    get,
    path = "/audit/events",
    tag = "Audit",
    params(AuditQueryParams),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Audit events", body = AuditLogResponse),
        (status = 400, description = "Invalid query parameters"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not juan")
    )
)]
pub async fn query_audit_events(
    _caller: Authorized<JuanOnly>,
    Query(params): Query<AuditQueryParams>,
    State(state): State<AppState>,
) -> Result<Json<AuditLogResponse>, ApiError> {
    let filter = AuditFilter {
        user_id: params.user_id,
        event_type: params.event_type,
        limit: params.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT),
    };

    let events = AuditRepository::new(&state.db).recent(&filter)?;
    let total = events.len();
    Ok(Json(AuditLogResponse { events, total }))
}
