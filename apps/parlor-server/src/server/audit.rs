use std::{collections::HashMap, sync::Arc};

use serde::Serialize;
use tokio::sync::RwLock;
use ulid::Ulid;

use parlor_core::AccountId;

use super::auth::now_unix;

/// Closed set of auditable state transitions. String codes are the wire
/// and sink format; the enum keeps the set exhaustive at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AuditEventKind {
    RoomCreated,
    SubroomCreated,
    SubroomDeleted,
    SubroomMaxPlayersUpdated,
    HomeSubroomUpdated,
    UserRolesUpdated,
    RoleCreated,
    RolePermissionsUpdated,
    RoleDeleted,
    TagsUpdated,
    DescriptionUpdated,
    ChangesetCreated,
    PublicVersionUpdated,
    ContentFlagsUpdated,
    RoomSuspended,
    RoomTerminated,
    RoomTerminatedForIllegalContent,
}

impl AuditEventKind {
    #[must_use]
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::RoomCreated => "room_created",
            Self::SubroomCreated => "subroom_created",
            Self::SubroomDeleted => "subroom_deleted",
            Self::SubroomMaxPlayersUpdated => "subroom_max_players_updated",
            Self::HomeSubroomUpdated => "home_subroom_updated",
            Self::UserRolesUpdated => "user_roles_updated",
            Self::RoleCreated => "role_created",
            Self::RolePermissionsUpdated => "role_permissions_updated",
            Self::RoleDeleted => "role_deleted",
            Self::TagsUpdated => "tags_updated",
            Self::DescriptionUpdated => "description_updated",
            Self::ChangesetCreated => "changeset_created",
            Self::PublicVersionUpdated => "public_version_updated",
            Self::ContentFlagsUpdated => "content_flags_updated",
            Self::RoomSuspended => "room_suspended",
            Self::RoomTerminated => "room_terminated",
            Self::RoomTerminatedForIllegalContent => "room_terminated_for_illegal_content",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct AuditEvent {
    pub(crate) audit_id: String,
    pub(crate) room_id: String,
    pub(crate) actor_id: AccountId,
    pub(crate) event_type: &'static str,
    pub(crate) previous_value: serde_json::Value,
    pub(crate) new_value: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) note: Option<String>,
    pub(crate) created_at_unix: i64,
}

/// Append-only, room-scoped audit trail. Recording is best-effort by
/// contract: it must never fail or block the primary operation, so the
/// signature is infallible. Each record is also emitted as a structured
/// tracing event for the external file/webhook sink.
#[derive(Clone)]
pub(crate) struct AuditRecorder {
    trails: Arc<RwLock<HashMap<String, Vec<AuditEvent>>>>,
}

impl AuditRecorder {
    pub(crate) fn new() -> Self {
        Self {
            trails: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub(crate) async fn record(
        &self,
        room_id: &str,
        actor_id: AccountId,
        kind: AuditEventKind,
        previous_value: serde_json::Value,
        new_value: serde_json::Value,
        note: Option<String>,
    ) {
        let event = AuditEvent {
            audit_id: Ulid::new().to_string(),
            room_id: room_id.to_owned(),
            actor_id,
            event_type: kind.as_str(),
            previous_value,
            new_value,
            note,
            created_at_unix: now_unix(),
        };
        tracing::info!(
            event = "audit.append",
            room_id = %event.room_id,
            actor_id = %event.actor_id,
            event_type = event.event_type,
            audit_id = %event.audit_id,
        );
        self.trails
            .write()
            .await
            .entry(room_id.to_owned())
            .or_default()
            .push(event);
    }

    /// Newest-first slice of a room's trail. The trail survives permanent
    /// room deletion for accountability.
    pub(crate) async fn list(&self, room_id: &str, limit: usize) -> Vec<AuditEvent> {
        let trails = self.trails.read().await;
        let Some(trail) = trails.get(room_id) else {
            return Vec::new();
        };
        trail.iter().rev().take(limit).cloned().collect()
    }
}
