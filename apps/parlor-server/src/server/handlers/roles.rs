use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};

use parlor_core::{
    assigned_role, AccountId, Permission, PermissionFlags, RoleAssignment, RoleName,
};

use crate::server::{
    auth::authenticate,
    core::AppState,
    domain::{
        actor_permissions, create_role, delete_role, require_permission, require_view,
        set_user_role, update_role_permissions, PermissionUpdate,
    },
    errors::ApiFailure,
    types::{
        ActionResponse, AuditListResponse, CreateRoleRequest, MyPermissionsResponse,
        PermissionsResponse, RolePath, RoomPath, UpdateRolePermissionsRequest, UserRolePath,
    },
};

fn permission_updates(request: &UpdateRolePermissionsRequest) -> Vec<PermissionUpdate> {
    let keys = [
        (Permission::ViewAndJoin, request.view_and_join),
        (Permission::CreateVersions, request.create_versions),
        (Permission::PublishVersion, request.publish_version),
        (Permission::ManageSubrooms, request.manage_subrooms),
        (Permission::ManageMetadata, request.manage_metadata),
        (Permission::ManagePermissions, request.manage_permissions),
    ];
    keys.into_iter()
        .filter_map(|(permission, granted)| {
            granted.map(|granted| PermissionUpdate {
                permission,
                granted,
            })
        })
        .collect()
}

pub(crate) async fn create_role_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(path): Path<RoomPath>,
    Json(payload): Json<CreateRoleRequest>,
) -> Result<Json<ActionResponse>, ApiFailure> {
    let auth = authenticate(&state, &headers)?;
    let record = state.rooms.load(&path.room_id).await?;
    require_view(&record, Some(&auth))?;
    require_permission(&record, &auth, Permission::ManagePermissions)?;

    let name = RoleName::try_from(payload.name)?;
    create_role(
        &state.rooms,
        &state.audit,
        &path.room_id,
        auth.account_id,
        name,
        state.runtime.max_roles_per_room,
    )
    .await?;
    Ok(Json(ActionResponse { accepted: true }))
}

pub(crate) async fn update_role_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(path): Path<RolePath>,
    Json(payload): Json<UpdateRolePermissionsRequest>,
) -> Result<Json<ActionResponse>, ApiFailure> {
    let auth = authenticate(&state, &headers)?;
    let record = state.rooms.load(&path.room_id).await?;
    require_view(&record, Some(&auth))?;
    require_permission(&record, &auth, Permission::ManagePermissions)?;

    let role = RoleAssignment::parse(&path.role)?;
    let updates = permission_updates(&payload);
    update_role_permissions(
        &state.rooms,
        &state.audit,
        &path.room_id,
        auth.account_id,
        actor_permissions(&record, &auth),
        &role,
        &updates,
    )
    .await?;
    Ok(Json(ActionResponse { accepted: true }))
}

pub(crate) async fn delete_role_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(path): Path<RolePath>,
) -> Result<Json<ActionResponse>, ApiFailure> {
    let auth = authenticate(&state, &headers)?;
    let record = state.rooms.load(&path.room_id).await?;
    require_view(&record, Some(&auth))?;
    require_permission(&record, &auth, Permission::ManagePermissions)?;

    let name = match RoleAssignment::parse(&path.role)? {
        RoleAssignment::Owner | RoleAssignment::Everyone => {
            return Err(ApiFailure::ReservedRole);
        }
        RoleAssignment::Named(name) => name,
    };
    delete_role(
        &state.rooms,
        &state.audit,
        &state.notifier,
        &path.room_id,
        auth.account_id,
        &name,
    )
    .await?;
    Ok(Json(ActionResponse { accepted: true }))
}

pub(crate) async fn set_user_role_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(path): Path<UserRolePath>,
) -> Result<Json<ActionResponse>, ApiFailure> {
    let auth = authenticate(&state, &headers)?;
    let record = state.rooms.load(&path.room_id).await?;
    require_view(&record, Some(&auth))?;
    require_permission(&record, &auth, Permission::ManagePermissions)?;

    let target =
        AccountId::try_from(path.user_id).map_err(|_| ApiFailure::InvalidRequest)?;
    let role = RoleAssignment::parse(&path.role)?;
    set_user_role(
        &state.rooms,
        &state.audit,
        &state.notifier,
        &path.room_id,
        auth.account_id,
        target,
        &role,
    )
    .await?;
    Ok(Json(ActionResponse { accepted: true }))
}

pub(crate) async fn get_permissions(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(path): Path<RoomPath>,
) -> Result<Json<PermissionsResponse>, ApiFailure> {
    let auth = authenticate(&state, &headers)?;
    let record = state.rooms.load(&path.room_id).await?;
    require_view(&record, Some(&auth))?;
    require_permission(&record, &auth, Permission::ManagePermissions)?;

    let user_permissions = record
        .user_permissions
        .iter()
        .map(|(account, role)| (account.to_string(), role.as_str().to_owned()))
        .collect();
    Ok(Json(PermissionsResponse {
        role_permissions: record.role_permissions,
        user_permissions,
    }))
}

pub(crate) async fn my_permissions(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(path): Path<RoomPath>,
) -> Result<Json<MyPermissionsResponse>, ApiFailure> {
    let auth = authenticate(&state, &headers)?;
    let record = state.rooms.load(&path.room_id).await?;
    require_view(&record, Some(&auth))?;

    let role = assigned_role(&record.creator_id, &record.user_permissions, &auth.account_id);
    Ok(Json(MyPermissionsResponse {
        role: role.as_str().to_owned(),
        permissions: PermissionFlags::from(actor_permissions(&record, &auth)),
    }))
}

pub(crate) async fn list_audit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(path): Path<RoomPath>,
) -> Result<Json<AuditListResponse>, ApiFailure> {
    let auth = authenticate(&state, &headers)?;
    let record = state.rooms.load(&path.room_id).await?;
    require_view(&record, Some(&auth))?;
    require_permission(&record, &auth, Permission::ManagePermissions)?;

    let events = state
        .audit
        .list(&path.room_id, state.runtime.audit_list_limit)
        .await;
    Ok(Json(AuditListResponse { events }))
}
