use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use object_store::ObjectStoreExt;

use parlor_core::{Permission, SubroomName};

use crate::server::{
    audit::AuditEventKind,
    auth::authenticate,
    core::{AppState, DEFAULT_SUBROOM_MAX_PLAYERS, MAX_SUBROOM_PLAYERS},
    domain::{payload_path, require_permission, require_view},
    errors::ApiFailure,
    store::SubroomRecord,
    types::{ActionResponse, CreateSubroomRequest, MaxPlayersPath, SubroomPath},
};

pub(crate) async fn create_subroom(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(path): Path<SubroomPath>,
    payload: Option<Json<CreateSubroomRequest>>,
) -> Result<Json<ActionResponse>, ApiFailure> {
    let auth = authenticate(&state, &headers)?;
    let record = state.rooms.load(&path.room_id).await?;
    require_view(&record, Some(&auth))?;
    require_permission(&record, &auth, Permission::ManageSubrooms)?;

    let name =
        SubroomName::try_from(path.subroom_id).map_err(|_| ApiFailure::InvalidRequest)?;
    let max_players = payload
        .and_then(|Json(payload)| payload.max_players)
        .unwrap_or(DEFAULT_SUBROOM_MAX_PLAYERS);
    if !(1..=MAX_SUBROOM_PLAYERS).contains(&max_players) {
        return Err(ApiFailure::InvalidRequest);
    }

    let max_subrooms = state.runtime.max_subrooms_per_room;
    state
        .rooms
        .update(&path.room_id, |record| {
            if record.subrooms.contains_key(&name) {
                return Err(ApiFailure::SubroomAlreadyExists);
            }
            if record.subrooms.len() >= max_subrooms {
                return Err(ApiFailure::InvalidRequest);
            }
            record
                .subrooms
                .insert(name.clone(), SubroomRecord::new(max_players));
            Ok(())
        })
        .await?;
    state
        .audit
        .record(
            &path.room_id,
            auth.account_id,
            AuditEventKind::SubroomCreated,
            serde_json::Value::Null,
            serde_json::json!({ "subroom": name.as_str(), "maxPlayers": max_players }),
            None,
        )
        .await;
    Ok(Json(ActionResponse { accepted: true }))
}

/// Deleting the home subroom is rejected outright: `homeSubroomId` must
/// always reference a live subroom.
pub(crate) async fn delete_subroom(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(path): Path<SubroomPath>,
) -> Result<Json<ActionResponse>, ApiFailure> {
    let auth = authenticate(&state, &headers)?;
    let record = state.rooms.load(&path.room_id).await?;
    require_view(&record, Some(&auth))?;
    require_permission(&record, &auth, Permission::ManageSubrooms)?;

    let name = SubroomName::try_from(path.subroom_id).map_err(|_| ApiFailure::NotFound)?;
    let removed = state
        .rooms
        .update(&path.room_id, |record| {
            if name == record.home_subroom_id {
                return Err(ApiFailure::InvalidRequest);
            }
            record
                .subrooms
                .remove(&name)
                .ok_or(ApiFailure::NotFound)
        })
        .await?;

    for (index, version) in removed.versions.iter().enumerate() {
        if !version.associated_file {
            continue;
        }
        let blob = payload_path(&path.room_id, &name, index);
        if let Err(error) = state.payload_store.delete(&blob).await {
            tracing::warn!(
                event = "subroom.delete",
                outcome = "blob_sweep_failed",
                room_id = %path.room_id,
                error = %error,
            );
        }
    }

    state
        .audit
        .record(
            &path.room_id,
            auth.account_id,
            AuditEventKind::SubroomDeleted,
            serde_json::json!({
                "subroom": name.as_str(),
                "versions": removed.versions.len(),
            }),
            serde_json::Value::Null,
            None,
        )
        .await;
    Ok(Json(ActionResponse { accepted: true }))
}

pub(crate) async fn set_max_players(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(path): Path<MaxPlayersPath>,
) -> Result<Json<ActionResponse>, ApiFailure> {
    let auth = authenticate(&state, &headers)?;
    let record = state.rooms.load(&path.room_id).await?;
    require_view(&record, Some(&auth))?;
    require_permission(&record, &auth, Permission::ManageSubrooms)?;

    let name = SubroomName::try_from(path.subroom_id).map_err(|_| ApiFailure::NotFound)?;
    if !(1..=MAX_SUBROOM_PLAYERS).contains(&path.max_players) {
        return Err(ApiFailure::InvalidRequest);
    }

    let previous = state
        .rooms
        .update(&path.room_id, |record| {
            let subroom = record.subrooms.get_mut(&name).ok_or(ApiFailure::NotFound)?;
            let previous = subroom.max_players;
            subroom.max_players = path.max_players;
            Ok(previous)
        })
        .await?;
    state
        .audit
        .record(
            &path.room_id,
            auth.account_id,
            AuditEventKind::SubroomMaxPlayersUpdated,
            serde_json::json!({ "subroom": name.as_str(), "maxPlayers": previous }),
            serde_json::json!({ "subroom": name.as_str(), "maxPlayers": path.max_players }),
            None,
        )
        .await;
    Ok(Json(ActionResponse { accepted: true }))
}

pub(crate) async fn set_home_subroom(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(path): Path<SubroomPath>,
) -> Result<Json<ActionResponse>, ApiFailure> {
    let auth = authenticate(&state, &headers)?;
    let record = state.rooms.load(&path.room_id).await?;
    require_view(&record, Some(&auth))?;
    require_permission(&record, &auth, Permission::ManageSubrooms)?;

    let name = SubroomName::try_from(path.subroom_id).map_err(|_| ApiFailure::NotFound)?;
    let previous = state
        .rooms
        .update(&path.room_id, |record| {
            if !record.subrooms.contains_key(&name) {
                return Err(ApiFailure::NotFound);
            }
            Ok(std::mem::replace(&mut record.home_subroom_id, name.clone()))
        })
        .await?;
    state
        .audit
        .record(
            &path.room_id,
            auth.account_id,
            AuditEventKind::HomeSubroomUpdated,
            serde_json::json!(previous.as_str()),
            serde_json::json!(name.as_str()),
            None,
        )
        .await;
    Ok(Json(ActionResponse { accepted: true }))
}
