use object_store::{ObjectStore, ObjectStoreExt};

use parlor_core::{AccountId, Permission};
use parlor_protocol::RoomNotification;

use crate::server::{
    audit::{AuditEventKind, AuditRecorder},
    auth::now_unix,
    errors::ApiFailure,
    notify::RoomNotifier,
    store::{ReportRecord, RoomStore},
};

use super::versions::payload_path;

pub(crate) const SUSPENDED_DESCRIPTION: &str =
    "This room has been suspended by platform moderation pending review.";
pub(crate) const TERMINATED_DESCRIPTION: &str =
    "This room has been terminated by platform moderation.";

/// Suspend a room: every explicit role assignment is dropped, the
/// `everyone` role loses view access and permission self-management, and
/// the description is replaced with the moderation notice. The creator's
/// implicit owner authority is untouched.
pub(crate) async fn suspend_room(
    rooms: &RoomStore,
    audit: &AuditRecorder,
    notifier: &RoomNotifier,
    room_id: &str,
    actor: AccountId,
    note: Option<String>,
) -> Result<(), ApiFailure> {
    let (creator, previous_description) = rooms
        .update(room_id, |record| {
            let previous = std::mem::replace(&mut record.description, SUSPENDED_DESCRIPTION.to_owned());
            record.user_permissions.clear();
            let mut everyone = record.role_permissions.everyone();
            everyone.remove(Permission::ViewAndJoin);
            everyone.remove(Permission::ManagePermissions);
            record.role_permissions.set_everyone(everyone);
            Ok((record.creator_id, previous))
        })
        .await?;
    audit
        .record(
            room_id,
            actor,
            AuditEventKind::RoomSuspended,
            serde_json::json!(previous_description),
            serde_json::json!(SUSPENDED_DESCRIPTION),
            note,
        )
        .await;
    notifier
        .notify(
            creator,
            RoomNotification::RoomSuspended {
                room_id: room_id.to_owned(),
                notice: SUSPENDED_DESCRIPTION.to_owned(),
            },
        )
        .await;
    tracing::warn!(event = "moderation.suspend", room_id, actor_id = %actor);
    Ok(())
}

/// Terminate a room. `permanent` deletes the document outright (and
/// sweeps its version payloads, best effort); otherwise the room is locked
/// down like a suspension but with every role's permission set stripped to
/// empty. Both paths alert and then close the creator's live connection.
pub(crate) async fn terminate_room(
    rooms: &RoomStore,
    audit: &AuditRecorder,
    notifier: &RoomNotifier,
    payload_store: &dyn ObjectStore,
    room_id: &str,
    actor: AccountId,
    note: Option<String>,
    permanent: bool,
) -> Result<(), ApiFailure> {
    if permanent {
        let record = rooms.remove(room_id).await?;
        for (subroom_id, subroom) in &record.subrooms {
            for (index, version) in subroom.versions.iter().enumerate() {
                if !version.associated_file {
                    continue;
                }
                let path = payload_path(room_id, subroom_id, index);
                if let Err(error) = payload_store.delete(&path).await {
                    tracing::warn!(
                        event = "moderation.terminate",
                        outcome = "blob_sweep_failed",
                        room_id,
                        error = %error,
                    );
                }
            }
        }
        audit
            .record(
                room_id,
                actor,
                AuditEventKind::RoomTerminatedForIllegalContent,
                serde_json::json!({ "name": record.name }),
                serde_json::Value::Null,
                note,
            )
            .await;
        notifier
            .notify(
                record.creator_id,
                RoomNotification::RoomTerminated {
                    room_id: room_id.to_owned(),
                    notice: TERMINATED_DESCRIPTION.to_owned(),
                },
            )
            .await;
        notifier.close_connection(record.creator_id).await;
        tracing::error!(event = "moderation.terminate", permanent = true, room_id, actor_id = %actor);
        return Ok(());
    }

    let (creator, previous_description) = rooms
        .update(room_id, |record| {
            let previous = std::mem::replace(&mut record.description, TERMINATED_DESCRIPTION.to_owned());
            record.user_permissions.clear();
            record.role_permissions.strip_all();
            Ok((record.creator_id, previous))
        })
        .await?;
    audit
        .record(
            room_id,
            actor,
            AuditEventKind::RoomTerminated,
            serde_json::json!(previous_description),
            serde_json::json!(TERMINATED_DESCRIPTION),
            note,
        )
        .await;
    notifier
        .notify(
            creator,
            RoomNotification::RoomTerminated {
                room_id: room_id.to_owned(),
                notice: TERMINATED_DESCRIPTION.to_owned(),
            },
        )
        .await;
    notifier.close_connection(creator).await;
    tracing::warn!(event = "moderation.terminate", permanent = false, room_id, actor_id = %actor);
    Ok(())
}

/// Escalation tier for an abuse report, routed to the external audit sink
/// with tier-dependent urgency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReportEscalation {
    IllegalContentAndDangerToLife,
    IllegalContent,
    DangerToLife,
    Routine,
}

impl ReportEscalation {
    pub(crate) const fn from_flags(alleges_illegal_content: bool, alleges_danger_to_life: bool) -> Self {
        match (alleges_illegal_content, alleges_danger_to_life) {
            (true, true) => Self::IllegalContentAndDangerToLife,
            (true, false) => Self::IllegalContent,
            (false, true) => Self::DangerToLife,
            (false, false) => Self::Routine,
        }
    }

    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::IllegalContentAndDangerToLife => "illegal_content_and_danger_to_life",
            Self::IllegalContent => "illegal_content",
            Self::DangerToLife => "danger_to_life",
            Self::Routine => "routine",
        }
    }
}

/// Append a moderation report to the room document and route it to the
/// external sink. Report cadence per reporter is enforced upstream, not
/// here.
pub(crate) async fn report_room(
    rooms: &RoomStore,
    room_id: &str,
    reporter: AccountId,
    reason: String,
    alleges_illegal_content: bool,
    alleges_danger_to_life: bool,
) -> Result<ReportEscalation, ApiFailure> {
    rooms
        .update(room_id, |record| {
            record.reports.push(ReportRecord {
                reporter_id: reporter,
                reason,
                alleges_illegal_content,
                alleges_danger_to_life,
                created_at: now_unix(),
            });
            Ok(())
        })
        .await?;

    let escalation = ReportEscalation::from_flags(alleges_illegal_content, alleges_danger_to_life);
    match escalation {
        ReportEscalation::IllegalContentAndDangerToLife => tracing::error!(
            event = "moderation.report",
            tier = escalation.as_str(),
            urgency = "page_on_call",
            room_id,
            reporter_id = %reporter,
        ),
        ReportEscalation::IllegalContent => tracing::error!(
            event = "moderation.report",
            tier = escalation.as_str(),
            urgency = "legal_review",
            room_id,
            reporter_id = %reporter,
        ),
        ReportEscalation::DangerToLife => tracing::warn!(
            event = "moderation.report",
            tier = escalation.as_str(),
            urgency = "safety_review",
            room_id,
            reporter_id = %reporter,
        ),
        ReportEscalation::Routine => tracing::info!(
            event = "moderation.report",
            tier = escalation.as_str(),
            urgency = "review_queue",
            room_id,
            reporter_id = %reporter,
        ),
    }
    Ok(escalation)
}
