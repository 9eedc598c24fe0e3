use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use ulid::Ulid;

use parlor_core::{Permission, RoleTable, RoomName, SubroomName};

use crate::server::{
    audit::AuditEventKind,
    auth::{authenticate, now_unix, optional_authenticate},
    core::{
        AppState, DEFAULT_SUBROOM_MAX_PLAYERS, MAX_DESCRIPTION_CHARS, MAX_SUBROOM_PLAYERS,
        MAX_TAGS_PER_ROOM, MAX_TAG_CHARS,
    },
    domain::{require_permission, require_view, viewer_permissions},
    errors::ApiFailure,
    store::{ContentFlags, RoomRecord, SubroomRecord},
    types::{
        ActionResponse, CoverImagePath, CreateRoomRequest, RoomCreatedResponse, RoomInfoResponse,
        RoomListItem, RoomListResponse, RoomPath, SearchMode, SearchQueryParams, SubroomSummary,
        UpdateDescriptionRequest, UpdateTagsRequest,
    },
};

pub(crate) fn validate_tags(tags: &[String]) -> Result<(), ApiFailure> {
    if tags.len() > MAX_TAGS_PER_ROOM {
        return Err(ApiFailure::InvalidRequest);
    }
    for tag in tags {
        if tag.is_empty() || tag.len() > MAX_TAG_CHARS {
            return Err(ApiFailure::InvalidRequest);
        }
        if !tag
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-'))
        {
            return Err(ApiFailure::InvalidRequest);
        }
    }
    Ok(())
}

pub(crate) async fn create_room(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateRoomRequest>,
) -> Result<Json<RoomCreatedResponse>, ApiFailure> {
    let auth = authenticate(&state, &headers)?;
    let name = RoomName::try_from(payload.name).map_err(|_| ApiFailure::InvalidRequest)?;
    let description = payload.description.unwrap_or_default();
    if description.len() > MAX_DESCRIPTION_CHARS {
        return Err(ApiFailure::InvalidRequest);
    }
    let tags = payload.tags.unwrap_or_default();
    validate_tags(&tags)?;
    let home_subroom_id = SubroomName::try_from(
        payload
            .home_subroom
            .unwrap_or_else(|| String::from("home")),
    )
    .map_err(|_| ApiFailure::InvalidRequest)?;
    let max_players = payload.max_players.unwrap_or(DEFAULT_SUBROOM_MAX_PLAYERS);
    if !(1..=MAX_SUBROOM_PLAYERS).contains(&max_players) {
        return Err(ApiFailure::InvalidRequest);
    }

    let room_id = Ulid::new().to_string();
    let mut subrooms = HashMap::new();
    subrooms.insert(home_subroom_id.clone(), SubroomRecord::new(max_players));
    let record = RoomRecord {
        id: room_id.clone(),
        name: name.as_str().to_owned(),
        description,
        creator_id: auth.account_id,
        tags,
        created_at: now_unix(),
        visits: 0,
        home_subroom_id,
        subrooms,
        role_permissions: RoleTable::new(),
        user_permissions: HashMap::new(),
        cover_image_id: None,
        content_flags: ContentFlags::default(),
        reports: Vec::new(),
    };

    let quota = state.runtime.max_created_rooms_per_account;
    if let Err(failure) = state.rooms.insert(record, quota).await {
        if matches!(failure, ApiFailure::RoomCreationLimitReached) {
            tracing::warn!(
                event = "room.create",
                outcome = "limit_reached",
                account_id = %auth.account_id,
                max_created_rooms_per_account = quota,
            );
        }
        return Err(failure);
    }
    state
        .audit
        .record(
            &room_id,
            auth.account_id,
            AuditEventKind::RoomCreated,
            serde_json::Value::Null,
            serde_json::json!(name.as_str()),
            None,
        )
        .await;

    Ok(Json(RoomCreatedResponse {
        room_id,
        name: name.as_str().to_owned(),
    }))
}

fn room_info_response(record: &RoomRecord) -> RoomInfoResponse {
    let mut subrooms: Vec<SubroomSummary> = record
        .subrooms
        .iter()
        .map(|(name, subroom)| SubroomSummary {
            name: name.as_str().to_owned(),
            max_players: subroom.max_players,
            public_version_id: subroom.public_version_id,
            version_count: subroom.versions.len(),
        })
        .collect();
    subrooms.sort_by(|left, right| left.name.cmp(&right.name));
    RoomInfoResponse {
        room_id: record.id.clone(),
        name: record.name.clone(),
        description: record.description.clone(),
        creator_id: record.creator_id.to_string(),
        tags: record.tags.clone(),
        created_at: record.created_at,
        visits: record.visits,
        home_subroom_id: record.home_subroom_id.as_str().to_owned(),
        subrooms,
        cover_image_id: record.cover_image_id.clone(),
        content_flags: record.content_flags,
    }
}

pub(crate) async fn room_info(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(path): Path<RoomPath>,
) -> Result<Json<RoomInfoResponse>, ApiFailure> {
    let auth = optional_authenticate(&state, &headers)?;
    let record = state.rooms.load(&path.room_id).await?;
    require_view(&record, auth.as_ref())?;

    let record = state
        .rooms
        .update(&path.room_id, |record| {
            record.visits += 1;
            Ok(record.clone())
        })
        .await?;
    Ok(Json(room_info_response(&record)))
}

fn room_list_item(record: &RoomRecord) -> RoomListItem {
    RoomListItem {
        room_id: record.id.clone(),
        name: record.name.clone(),
        creator_id: record.creator_id.to_string(),
        tags: record.tags.clone(),
        visits: record.visits,
    }
}

pub(crate) async fn search_rooms(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<SearchQueryParams>,
) -> Result<Json<RoomListResponse>, ApiFailure> {
    let auth = optional_authenticate(&state, &headers)?;
    let mut rooms: Vec<RoomRecord> = state
        .rooms
        .scan()
        .await
        .into_iter()
        .filter(|record| {
            viewer_permissions(record, auth.as_ref()).contains(Permission::ViewAndJoin)
        })
        .collect();

    match params.mode {
        SearchMode::Search => {
            let needle = params.query.unwrap_or_default().to_ascii_lowercase();
            rooms.retain(|record| record.name.to_ascii_lowercase().contains(&needle));
            rooms.sort_by(|left, right| left.name.cmp(&right.name));
        }
        SearchMode::Originals => {
            rooms.sort_by(|left, right| {
                left.created_at
                    .cmp(&right.created_at)
                    .then_with(|| left.name.cmp(&right.name))
            });
        }
        SearchMode::MostVisited => {
            rooms.sort_by(|left, right| {
                right
                    .visits
                    .cmp(&left.visits)
                    .then_with(|| left.name.cmp(&right.name))
            });
        }
        SearchMode::Mine => {
            let auth = auth.as_ref().ok_or(ApiFailure::Unauthorized)?;
            rooms.retain(|record| record.creator_id == auth.account_id);
            rooms.sort_by(|left, right| {
                left.created_at
                    .cmp(&right.created_at)
                    .then_with(|| left.name.cmp(&right.name))
            });
        }
    }
    rooms.truncate(state.runtime.max_search_results);

    Ok(Json(RoomListResponse {
        rooms: rooms.iter().map(room_list_item).collect(),
    }))
}

pub(crate) async fn update_tags(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(path): Path<RoomPath>,
    Json(payload): Json<UpdateTagsRequest>,
) -> Result<Json<ActionResponse>, ApiFailure> {
    let auth = authenticate(&state, &headers)?;
    let record = state.rooms.load(&path.room_id).await?;
    require_view(&record, Some(&auth))?;
    require_permission(&record, &auth, Permission::ManageMetadata)?;
    validate_tags(&payload.tags)?;

    let new_value = serde_json::json!(payload.tags);
    let previous = state
        .rooms
        .update(&path.room_id, |record| {
            Ok(std::mem::replace(&mut record.tags, payload.tags))
        })
        .await?;
    state
        .audit
        .record(
            &path.room_id,
            auth.account_id,
            AuditEventKind::TagsUpdated,
            serde_json::json!(previous),
            new_value,
            None,
        )
        .await;
    Ok(Json(ActionResponse { accepted: true }))
}

pub(crate) async fn update_description(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(path): Path<RoomPath>,
    Json(payload): Json<UpdateDescriptionRequest>,
) -> Result<Json<ActionResponse>, ApiFailure> {
    let auth = authenticate(&state, &headers)?;
    let record = state.rooms.load(&path.room_id).await?;
    require_view(&record, Some(&auth))?;
    require_permission(&record, &auth, Permission::ManageMetadata)?;
    if payload.description.len() > MAX_DESCRIPTION_CHARS {
        return Err(ApiFailure::InvalidRequest);
    }

    let new_value = serde_json::json!(payload.description);
    let previous = state
        .rooms
        .update(&path.room_id, |record| {
            Ok(std::mem::replace(&mut record.description, payload.description))
        })
        .await?;
    state
        .audit
        .record(
            &path.room_id,
            auth.account_id,
            AuditEventKind::DescriptionUpdated,
            serde_json::json!(previous),
            new_value,
            None,
        )
        .await;
    Ok(Json(ActionResponse { accepted: true }))
}

pub(crate) async fn update_content_flags(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(path): Path<RoomPath>,
    Json(payload): Json<ContentFlags>,
) -> Result<Json<ActionResponse>, ApiFailure> {
    let auth = authenticate(&state, &headers)?;
    let record = state.rooms.load(&path.room_id).await?;
    require_view(&record, Some(&auth))?;
    require_permission(&record, &auth, Permission::ManageMetadata)?;

    let previous = state
        .rooms
        .update(&path.room_id, |record| {
            Ok(std::mem::replace(&mut record.content_flags, payload))
        })
        .await?;
    state
        .audit
        .record(
            &path.room_id,
            auth.account_id,
            AuditEventKind::ContentFlagsUpdated,
            serde_json::json!(previous),
            serde_json::json!(payload),
            None,
        )
        .await;
    Ok(Json(ActionResponse { accepted: true }))
}

pub(crate) async fn set_cover_image(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(path): Path<CoverImagePath>,
) -> Result<Json<ActionResponse>, ApiFailure> {
    let auth = authenticate(&state, &headers)?;
    let record = state.rooms.load(&path.room_id).await?;
    require_view(&record, Some(&auth))?;
    require_permission(&record, &auth, Permission::ManageMetadata)?;
    if Ulid::from_string(&path.image_id).is_err() {
        return Err(ApiFailure::InvalidRequest);
    }

    state
        .rooms
        .update(&path.room_id, |record| {
            record.cover_image_id = Some(path.image_id.clone());
            Ok(())
        })
        .await?;
    Ok(Json(ActionResponse { accepted: true }))
}
