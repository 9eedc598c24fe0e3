use axum::{
    body::Body,
    extract::{Path, State},
    http::{header::CONTENT_LENGTH, header::CONTENT_TYPE, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use bytes::Bytes;
use object_store::ObjectStoreExt;

use parlor_core::{AccountId, Permission, SpawnTransform, SubroomName};

use crate::server::{
    auth::{authenticate, optional_authenticate},
    core::{AppState, MAX_VERSION_COLLABORATORS, MAX_VERSION_COMMIT_CHARS},
    domain::{
        associate_data, create_version, require_permission, require_view, resolve_download,
        set_public_version, VersionDraft, VersionSelector,
    },
    errors::ApiFailure,
    types::{
        ActionResponse, CreateVersionRequest, CreateVersionResponse, SubroomPath, VersionListResponse,
        VersionPath, VersionSummary,
    },
};

const PAYLOAD_CONTENT_TYPE: &str = "application/octet-stream";

fn subroom_name(raw: String) -> Result<SubroomName, ApiFailure> {
    SubroomName::try_from(raw).map_err(|_| ApiFailure::NotFound)
}

fn version_index(raw: &str) -> Result<usize, ApiFailure> {
    raw.parse::<usize>().map_err(|_| ApiFailure::InvalidRequest)
}

pub(crate) async fn list_versions(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(path): Path<SubroomPath>,
) -> Result<Json<VersionListResponse>, ApiFailure> {
    let auth = optional_authenticate(&state, &headers)?;
    let record = state.rooms.load(&path.room_id).await?;
    require_view(&record, auth.as_ref())?;

    let name = subroom_name(path.subroom_id)?;
    let subroom = record.subrooms.get(&name).ok_or(ApiFailure::NotFound)?;
    let versions = subroom
        .versions
        .iter()
        .enumerate()
        .map(|(index, version)| VersionSummary {
            index,
            author: version.author.to_string(),
            base_scene_index: version.base_scene_index,
            commit_message: version.commit_message.clone(),
            collaborators: version
                .collaborators
                .iter()
                .map(ToString::to_string)
                .collect(),
            associated_file: version.associated_file,
            file_size_bytes: version.file_size_bytes,
            created_at: version.created_at,
        })
        .collect();
    Ok(Json(VersionListResponse {
        public_version_id: subroom.public_version_id,
        versions,
    }))
}

pub(crate) async fn create_version_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(path): Path<SubroomPath>,
    Json(payload): Json<CreateVersionRequest>,
) -> Result<Json<CreateVersionResponse>, ApiFailure> {
    let auth = authenticate(&state, &headers)?;
    let record = state.rooms.load(&path.room_id).await?;
    require_view(&record, Some(&auth))?;
    require_permission(&record, &auth, Permission::CreateVersions)?;

    let name = subroom_name(path.subroom_id)?;
    let position = payload.spawn_position.ok_or(ApiFailure::InvalidRequest)?;
    let rotation = payload.spawn_rotation.ok_or(ApiFailure::InvalidRequest)?;
    let spawn =
        SpawnTransform::new(&position, &rotation).map_err(|_| ApiFailure::InvalidRequest)?;

    let commit_message = payload.commit_message.unwrap_or_default();
    if commit_message.len() > MAX_VERSION_COMMIT_CHARS {
        return Err(ApiFailure::InvalidRequest);
    }
    let raw_collaborators = payload.collaborators.unwrap_or_default();
    if raw_collaborators.len() > MAX_VERSION_COLLABORATORS {
        return Err(ApiFailure::InvalidRequest);
    }
    let mut collaborators = Vec::with_capacity(raw_collaborators.len());
    for raw in raw_collaborators {
        collaborators
            .push(AccountId::try_from(raw).map_err(|_| ApiFailure::InvalidRequest)?);
    }

    // payload.author is intentionally dropped here.
    let draft = VersionDraft {
        base_scene_index: payload.base_scene_index.unwrap_or(0),
        spawn,
        commit_message,
        collaborators,
    };
    let version = create_version(
        &state.rooms,
        &state.audit,
        &path.room_id,
        &name,
        auth.account_id,
        draft,
    )
    .await?;
    Ok(Json(CreateVersionResponse { version }))
}

pub(crate) async fn set_public_version_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(path): Path<VersionPath>,
) -> Result<Json<ActionResponse>, ApiFailure> {
    let auth = authenticate(&state, &headers)?;
    let record = state.rooms.load(&path.room_id).await?;
    require_view(&record, Some(&auth))?;
    require_permission(&record, &auth, Permission::PublishVersion)?;

    let name = subroom_name(path.subroom_id)?;
    let index = version_index(&path.version_id)?;
    set_public_version(
        &state.rooms,
        &state.audit,
        &path.room_id,
        auth.account_id,
        &name,
        index,
    )
    .await?;
    Ok(Json(ActionResponse { accepted: true }))
}

/// Body is the version payload as base64 text, decoded to raw bytes before
/// hitting the blob store.
pub(crate) async fn associate_data_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(path): Path<VersionPath>,
    body: String,
) -> Result<Json<ActionResponse>, ApiFailure> {
    let auth = authenticate(&state, &headers)?;
    let record = state.rooms.load(&path.room_id).await?;
    require_view(&record, Some(&auth))?;
    require_permission(&record, &auth, Permission::CreateVersions)?;

    let name = subroom_name(path.subroom_id)?;
    let index = version_index(&path.version_id)?;

    let decoded = BASE64_STANDARD
        .decode(body.trim())
        .map_err(|_| ApiFailure::InvalidRequest)?;
    if decoded.is_empty() {
        return Err(ApiFailure::InvalidRequest);
    }
    if decoded.len() > state.runtime.max_payload_bytes {
        return Err(ApiFailure::PayloadTooLarge);
    }

    associate_data(
        &state.rooms,
        state.payload_store.as_ref(),
        &path.room_id,
        &name,
        index,
        Bytes::from(decoded),
    )
    .await?;
    Ok(Json(ActionResponse { accepted: true }))
}

/// `{version_id}` is a numeric index or the literal `latest`. A version
/// with no payload answers 204: nothing to fetch, not a failure.
pub(crate) async fn download_version(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(path): Path<VersionPath>,
) -> Result<Response, ApiFailure> {
    let auth = optional_authenticate(&state, &headers)?;
    let record = state.rooms.load(&path.room_id).await?;
    require_view(&record, auth.as_ref())?;

    let name = subroom_name(path.subroom_id)?;
    let selector = VersionSelector::parse(&path.version_id)?;
    let Some((_, blob)) = resolve_download(&record, &name, selector)? else {
        return Ok(StatusCode::NO_CONTENT.into_response());
    };

    let payload = state
        .payload_store
        .get(&blob)
        .await
        .map_err(|error| {
            tracing::error!(
                event = "version.download",
                outcome = "blob_read_failed",
                room_id = %path.room_id,
                error = %error,
            );
            ApiFailure::Internal
        })?
        .bytes()
        .await
        .map_err(|_| ApiFailure::Internal)?;

    let mut response = Response::new(Body::from(payload.clone()));
    response
        .headers_mut()
        .insert(CONTENT_TYPE, PAYLOAD_CONTENT_TYPE.parse().map_err(|_| ApiFailure::Internal)?);
    response.headers_mut().insert(
        CONTENT_LENGTH,
        payload
            .len()
            .to_string()
            .parse()
            .map_err(|_| ApiFailure::Internal)?,
    );
    Ok(response)
}
