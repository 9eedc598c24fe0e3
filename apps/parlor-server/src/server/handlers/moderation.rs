use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};

use crate::server::{
    auth::authenticate,
    core::{AppState, MAX_REPORT_REASON_CHARS},
    domain::{report_room, require_developer, require_view, suspend_room, terminate_room},
    errors::ApiFailure,
    types::{
        ActionResponse, ModerationActionRequest, ReportRequest, ReportResponse, RoomPath,
        TerminateQuery,
    },
};

pub(crate) async fn submit_report(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(path): Path<RoomPath>,
    Json(payload): Json<ReportRequest>,
) -> Result<Json<ReportResponse>, ApiFailure> {
    let auth = authenticate(&state, &headers)?;
    let record = state.rooms.load(&path.room_id).await?;
    require_view(&record, Some(&auth))?;

    if payload.reason.is_empty() || payload.reason.len() > MAX_REPORT_REASON_CHARS {
        return Err(ApiFailure::InvalidRequest);
    }
    let escalation = report_room(
        &state.rooms,
        &path.room_id,
        auth.account_id,
        payload.reason,
        payload.alleges_illegal_content,
        payload.alleges_danger_to_life,
    )
    .await?;
    Ok(Json(ReportResponse {
        accepted: true,
        escalation: escalation.as_str(),
    }))
}

/// Developer-only. Developers bypass the view gate, so an absent room is a
/// genuine 404 here rather than information hiding.
pub(crate) async fn moderation_suspend(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(path): Path<RoomPath>,
    payload: Option<Json<ModerationActionRequest>>,
) -> Result<Json<ActionResponse>, ApiFailure> {
    let auth = authenticate(&state, &headers)?;
    require_developer(&auth)?;

    let note = payload.and_then(|Json(payload)| payload.note);
    suspend_room(
        &state.rooms,
        &state.audit,
        &state.notifier,
        &path.room_id,
        auth.account_id,
        note,
    )
    .await?;
    Ok(Json(ActionResponse { accepted: true }))
}

/// Developer-only. `?permanent=true` deletes the room outright; that is
/// irreversible and requires nothing beyond the explicit query flag.
pub(crate) async fn moderation_terminate(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(path): Path<RoomPath>,
    Query(query): Query<TerminateQuery>,
    payload: Option<Json<ModerationActionRequest>>,
) -> Result<Json<ActionResponse>, ApiFailure> {
    let auth = authenticate(&state, &headers)?;
    require_developer(&auth)?;

    let note = payload.and_then(|Json(payload)| payload.note);
    terminate_room(
        &state.rooms,
        &state.audit,
        &state.notifier,
        state.payload_store.as_ref(),
        &path.room_id,
        auth.account_id,
        note,
        query.permanent,
    )
    .await?;
    Ok(Json(ActionResponse { accepted: true }))
}
