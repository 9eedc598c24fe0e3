use axum::Json;
use serde::{Deserialize, Serialize};

use parlor_core::{PermissionFlags, RoleTable};

use super::{audit::AuditEvent, store::ContentFlags};

#[derive(Debug, Serialize)]
pub(crate) struct HealthResponse {
    pub(crate) status: &'static str,
}

pub(crate) async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

#[derive(Debug, Serialize)]
pub(crate) struct ApiError {
    pub(crate) error: &'static str,
}

#[derive(Debug, Serialize)]
pub(crate) struct ActionResponse {
    pub(crate) accepted: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct CreateRoomRequest {
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) tags: Option<Vec<String>>,
    pub(crate) home_subroom: Option<String>,
    pub(crate) max_players: Option<u32>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RoomCreatedResponse {
    pub(crate) room_id: String,
    pub(crate) name: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct SubroomSummary {
    pub(crate) name: String,
    pub(crate) max_players: u32,
    pub(crate) public_version_id: usize,
    pub(crate) version_count: usize,
}

#[derive(Debug, Serialize)]
pub(crate) struct RoomInfoResponse {
    pub(crate) room_id: String,
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) creator_id: String,
    pub(crate) tags: Vec<String>,
    pub(crate) created_at: i64,
    pub(crate) visits: u64,
    pub(crate) home_subroom_id: String,
    pub(crate) subrooms: Vec<SubroomSummary>,
    pub(crate) cover_image_id: Option<String>,
    pub(crate) content_flags: ContentFlags,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) enum SearchMode {
    Search,
    Originals,
    MostVisited,
    Mine,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchQueryParams {
    pub(crate) mode: SearchMode,
    pub(crate) query: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RoomListItem {
    pub(crate) room_id: String,
    pub(crate) name: String,
    pub(crate) creator_id: String,
    pub(crate) tags: Vec<String>,
    pub(crate) visits: u64,
}

#[derive(Debug, Serialize)]
pub(crate) struct RoomListResponse {
    pub(crate) rooms: Vec<RoomListItem>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct UpdateTagsRequest {
    pub(crate) tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct UpdateDescriptionRequest {
    pub(crate) description: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct CreateSubroomRequest {
    pub(crate) max_players: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct CreateVersionRequest {
    pub(crate) base_scene_index: Option<u32>,
    pub(crate) spawn_position: Option<Vec<f64>>,
    pub(crate) spawn_rotation: Option<Vec<f64>>,
    pub(crate) commit_message: Option<String>,
    pub(crate) collaborators: Option<Vec<String>>,
    // Accepted for wire compatibility, always discarded: authorship comes
    // from the bearer token.
    pub(crate) author: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateVersionResponse {
    pub(crate) version: usize,
}

#[derive(Debug, Serialize)]
pub(crate) struct VersionSummary {
    pub(crate) index: usize,
    pub(crate) author: String,
    pub(crate) base_scene_index: u32,
    pub(crate) commit_message: String,
    pub(crate) collaborators: Vec<String>,
    pub(crate) associated_file: bool,
    pub(crate) file_size_bytes: Option<u64>,
    pub(crate) created_at: i64,
}

#[derive(Debug, Serialize)]
pub(crate) struct VersionListResponse {
    pub(crate) public_version_id: usize,
    pub(crate) versions: Vec<VersionSummary>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct CreateRoleRequest {
    pub(crate) name: String,
}

/// Partial permission update for a role. Only present keys are applied;
/// the typed field set is what makes arbitrary-key injection impossible.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(crate) struct UpdateRolePermissionsRequest {
    pub(crate) view_and_join: Option<bool>,
    pub(crate) create_versions: Option<bool>,
    pub(crate) publish_version: Option<bool>,
    pub(crate) manage_subrooms: Option<bool>,
    pub(crate) manage_metadata: Option<bool>,
    pub(crate) manage_permissions: Option<bool>,
}

#[derive(Debug, Serialize)]
pub(crate) struct PermissionsResponse {
    pub(crate) role_permissions: RoleTable,
    pub(crate) user_permissions: std::collections::BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct MyPermissionsResponse {
    pub(crate) role: String,
    pub(crate) permissions: PermissionFlags,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ReportRequest {
    pub(crate) reason: String,
    #[serde(default)]
    pub(crate) alleges_illegal_content: bool,
    #[serde(default)]
    pub(crate) alleges_danger_to_life: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct ReportResponse {
    pub(crate) accepted: bool,
    pub(crate) escalation: &'static str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ModerationActionRequest {
    pub(crate) note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TerminateQuery {
    #[serde(default)]
    pub(crate) permanent: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct AuditListResponse {
    pub(crate) events: Vec<AuditEvent>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RoomPath {
    pub(crate) room_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubroomPath {
    pub(crate) room_id: String,
    pub(crate) subroom_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct VersionPath {
    pub(crate) room_id: String,
    pub(crate) subroom_id: String,
    pub(crate) version_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MaxPlayersPath {
    pub(crate) room_id: String,
    pub(crate) subroom_id: String,
    pub(crate) max_players: u32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RolePath {
    pub(crate) room_id: String,
    pub(crate) role: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserRolePath {
    pub(crate) room_id: String,
    pub(crate) user_id: String,
    pub(crate) role: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CoverImagePath {
    pub(crate) room_id: String,
    pub(crate) image_id: String,
}
