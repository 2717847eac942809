// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Audit logging for security-sensitive operations.
//!
//! Logins, captures, votes, reward changes, admin user edits and denied
//! ownership checks are appended to the `audit_events` table. Keys sort
//! chronologically, so the newest events are read with a reverse scan.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::database::AUDIT_EVENTS;
use super::{Database, StorageResult};
use redb::ReadableTable;

/// Types of auditable events.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    // Auth events
    UserSignedUp,
    LoginSucceeded,
    LoginFailed,

    // Capture events
    DeveloperCaptured,
    VictimUpdated,
    VictimDeleted,

    // Feedback events
    FeedbackCreated,
    FeedbackVoted,

    // Reward events
    RewardAwarded,
    RewardUpdated,
    RewardDeleted,
    RewardClaimed,
    MonthlyAwardsGranted,

    // Admin events
    UserUpdated,
    UserRewardSet,
    UserDeleted,
    PermissionDenied,
}

/// An audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    /// Unique event ID.
    pub event_id: String,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// Type of event.
    pub event_type: AuditEventType,
    /// User who triggered the event (if known).
    pub user_id: Option<String>,
    /// Resource affected (victim id, reward id, ...).
    pub resource_id: Option<String>,
    /// Resource type (victim, reward, ...).
    pub resource_type: Option<String>,
    /// Additional details as JSON.
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,
    /// Whether the operation succeeded.
    pub success: bool,
    /// Error message if operation failed.
    pub error: Option<String>,
}

impl AuditEvent {
    /// Create a new audit event.
    pub fn new(event_type: AuditEventType) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type,
            user_id: None,
            resource_id: None,
            resource_type: None,
            details: None,
            success: true,
            error: None,
        }
    }

    /// Set the user ID.
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Set the resource.
    pub fn with_resource(
        mut self,
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
    ) -> Self {
        self.resource_type = Some(resource_type.into());
        self.resource_id = Some(resource_id.into());
        self
    }

    /// Add details.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Mark as failed with error message.
    pub fn failed(mut self, error: impl Into<String>) -> Self {
        self.success = false;
        self.error = Some(error.into());
        self
    }

    fn storage_key(&self) -> String {
        let micros = self.timestamp.timestamp_micros().max(0);
        format!("{micros:020}|{}", self.event_id)
    }
}

/// Filters for reading the audit trail.
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub user_id: Option<String>,
    pub event_type: Option<AuditEventType>,
    pub limit: usize,
}

impl AuditFilter {
    fn matches(&self, event: &AuditEvent) -> bool {
        let user_ok = self
            .user_id
            .as_deref()
            .is_none_or(|id| event.user_id.as_deref() == Some(id));
        let type_ok = self.event_type.is_none_or(|t| event.event_type == t);
        user_ok && type_ok
    }
}

/// Repository for audit events.
pub struct AuditRepository<'a> {
    db: &'a Database,
}

impl<'a> AuditRepository<'a> {
    /// Create a new audit repository.
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Append an audit event.
    pub fn log(&self, event: &AuditEvent) -> StorageResult<()> {
        let json = serde_json::to_vec(event)?;
        let key = event.storage_key();
        self.db.write(|txn| {
            let mut table = txn.open_table(AUDIT_EVENTS)?;
            table.insert(key.as_str(), json.as_slice())?;
            Ok(())
        })
    }

    /// Newest events first, filtered and capped at `filter.limit`.
    pub fn recent(&self, filter: &AuditFilter) -> StorageResult<Vec<AuditEvent>> {
        self.db.read(|txn| {
            let table = txn.open_table(AUDIT_EVENTS)?;
            let mut events = Vec::new();
            for entry in table.iter()?.rev() {
                if events.len() >= filter.limit {
                    break;
                }
                let (_, value) = entry?;
                let event: AuditEvent = serde_json::from_slice(value.value())?;
                if filter.matches(&event) {
                    events.push(event);
                }
            }
            Ok(events)
        })
    }
}

/// Helper macro for logging audit events.
///
/// Audit writes are best-effort: a failure is logged and never fails the
/// request that triggered it.
#[macro_export]
macro_rules! audit_log {
    ($db:expr, $event:expr) => {{
        let repo = $crate::storage::AuditRepository::new($db);
        if let Err(e) = repo.log(&$event) {
            ::tracing::warn!(error = %e, "Failed to write audit event");
        }
    }};
    ($db:expr, $event_type:expr, $user:expr, $resource_type:expr, $resource_id:expr) => {{
        let event = $crate::storage::AuditEvent::new($event_type)
            .with_user(&$user.user_id)
            .with_resource($resource_type, $resource_id);
        $crate::audit_log!($db, event)
    }};
}
