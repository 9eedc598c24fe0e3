use bytes::Bytes;
use object_store::{path::Path as ObjectPath, ObjectStore, ObjectStoreExt};
use sha2::{Digest, Sha256};

use parlor_core::{AccountId, SpawnTransform, SubroomName};

use crate::server::{
    audit::{AuditEventKind, AuditRecorder},
    auth::now_unix,
    errors::ApiFailure,
    store::{RoomRecord, RoomStore, VersionRecord},
};

pub(crate) const LATEST_VERSION_SELECTOR: &str = "latest";

/// Client-supplied version metadata, already validated. Authorship is
/// deliberately absent: it is always taken from the bearer token.
#[derive(Debug, Clone)]
pub(crate) struct VersionDraft {
    pub(crate) base_scene_index: u32,
    pub(crate) spawn: SpawnTransform,
    pub(crate) commit_message: String,
    pub(crate) collaborators: Vec<AccountId>,
}

/// Append a new version to a subroom's ledger and return its index. The
/// index is computed under the document write lock, so concurrent appends
/// on the same subroom always get distinct consecutive indices.
pub(crate) async fn create_version(
    rooms: &RoomStore,
    audit: &AuditRecorder,
    room_id: &str,
    subroom_id: &SubroomName,
    author: AccountId,
    draft: VersionDraft,
) -> Result<usize, ApiFailure> {
    let index = rooms
        .update(room_id, |record| {
            let subroom = record
                .subrooms
                .get_mut(subroom_id)
                .ok_or(ApiFailure::NotFound)?;
            let index = subroom.versions.len();
            subroom.versions.push(VersionRecord {
                base_scene_index: draft.base_scene_index,
                spawn_position: draft.spawn.position,
                spawn_rotation: draft.spawn.rotation,
                commit_message: draft.commit_message,
                author,
                collaborators: draft.collaborators,
                associated_file: false,
                file_sha256: None,
                file_size_bytes: None,
                created_at: now_unix(),
            });
            Ok(index)
        })
        .await?;
    audit
        .record(
            room_id,
            author,
            AuditEventKind::ChangesetCreated,
            serde_json::Value::Null,
            serde_json::json!({ "subroom": subroom_id.as_str(), "version": index }),
            None,
        )
        .await;
    Ok(index)
}

/// Deterministic blob location for a version payload.
pub(crate) fn payload_path(room_id: &str, subroom_id: &SubroomName, index: usize) -> ObjectPath {
    ObjectPath::from(format!(
        "rooms/{room_id}/subrooms/{subroom_id}/versions/{index}.bin"
    ))
}

/// Attach the binary payload to a version, exactly once.
///
/// The `associatedFile` flag is reserved under the document lock before
/// the blob write, so a concurrent second association fails fast with
/// `file_already_associated` instead of racing the upload; a failed blob
/// write releases the reservation in a compensating update.
pub(crate) async fn associate_data(
    rooms: &RoomStore,
    payload_store: &dyn ObjectStore,
    room_id: &str,
    subroom_id: &SubroomName,
    index: usize,
    payload: Bytes,
) -> Result<(), ApiFailure> {
    let sha256 = format!("{:x}", Sha256::digest(&payload));
    let size_bytes = payload.len() as u64;

    rooms
        .update(room_id, |record| {
            let subroom = record
                .subrooms
                .get_mut(subroom_id)
                .ok_or(ApiFailure::NotFound)?;
            let version = subroom
                .versions
                .get_mut(index)
                .ok_or(ApiFailure::NotFound)?;
            if version.associated_file {
                return Err(ApiFailure::FileAlreadyAssociated);
            }
            version.associated_file = true;
            version.file_sha256 = Some(sha256);
            version.file_size_bytes = Some(size_bytes);
            Ok(())
        })
        .await?;

    let path = payload_path(room_id, subroom_id, index);
    if let Err(error) = payload_store.put(&path, payload.into()).await {
        tracing::error!(
            event = "version.associate",
            outcome = "blob_write_failed",
            room_id,
            subroom_id = %subroom_id,
            version = index,
            error = %error,
        );
        let rollback = rooms
            .update(room_id, |record| {
                let subroom = record
                    .subrooms
                    .get_mut(subroom_id)
                    .ok_or(ApiFailure::NotFound)?;
                let version = subroom
                    .versions
                    .get_mut(index)
                    .ok_or(ApiFailure::NotFound)?;
                version.associated_file = false;
                version.file_sha256 = None;
                version.file_size_bytes = None;
                Ok(())
            })
            .await;
        if rollback.is_err() {
            tracing::error!(
                event = "version.associate",
                outcome = "rollback_failed",
                room_id,
                version = index,
            );
        }
        return Err(ApiFailure::Internal);
    }
    Ok(())
}

/// Move a subroom's public-version pointer. Last write wins under
/// concurrency; the audit trail keeps every transition reconstructible.
pub(crate) async fn set_public_version(
    rooms: &RoomStore,
    audit: &AuditRecorder,
    room_id: &str,
    actor: AccountId,
    subroom_id: &SubroomName,
    index: usize,
) -> Result<(), ApiFailure> {
    let previous = rooms
        .update(room_id, |record| {
            let subroom = record
                .subrooms
                .get_mut(subroom_id)
                .ok_or(ApiFailure::NotFound)?;
            if index >= subroom.versions.len() {
                return Err(ApiFailure::NotFound);
            }
            let previous = subroom.public_version_id;
            subroom.public_version_id = index;
            Ok(previous)
        })
        .await?;
    audit
        .record(
            room_id,
            actor,
            AuditEventKind::PublicVersionUpdated,
            serde_json::json!({ "subroom": subroom_id.as_str(), "version": previous }),
            serde_json::json!({ "subroom": subroom_id.as_str(), "version": index }),
            None,
        )
        .await;
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum VersionSelector {
    Index(usize),
    Latest,
}

impl VersionSelector {
    pub(crate) fn parse(raw: &str) -> Result<Self, ApiFailure> {
        if raw == LATEST_VERSION_SELECTOR {
            return Ok(Self::Latest);
        }
        raw.parse::<usize>()
            .map(Self::Index)
            .map_err(|_| ApiFailure::InvalidRequest)
    }
}

/// Resolve a selector to the stored payload location. `Ok(None)` is the
/// cacheable "nothing to fetch" case: the version exists but no payload
/// has been attached yet.
pub(crate) fn resolve_download(
    record: &RoomRecord,
    subroom_id: &SubroomName,
    selector: VersionSelector,
) -> Result<Option<(usize, ObjectPath)>, ApiFailure> {
    let subroom = record.subrooms.get(subroom_id).ok_or(ApiFailure::NotFound)?;
    let index = match selector {
        VersionSelector::Latest => subroom.public_version_id,
        VersionSelector::Index(index) => index,
    };
    let version = subroom.versions.get(index).ok_or(ApiFailure::NotFound)?;
    if !version.associated_file {
        return Ok(None);
    }
    Ok(Some((index, payload_path(&record.id, subroom_id, index))))
}
