use parlor_core::{all_permissions, effective_permissions, Permission, PermissionSet};

use crate::server::{auth::AuthContext, errors::ApiFailure, store::RoomRecord};

/// Effective permissions of an authenticated actor inside a room. The
/// developer override short-circuits the stored model entirely.
pub(crate) fn actor_permissions(record: &RoomRecord, auth: &AuthContext) -> PermissionSet {
    if auth.developer {
        return all_permissions();
    }
    effective_permissions(
        &record.creator_id,
        &record.user_permissions,
        &record.role_permissions,
        &auth.account_id,
    )
}

/// Effective permissions for a possibly-anonymous viewer. Anonymous
/// requests resolve to the `everyone` role.
pub(crate) fn viewer_permissions(record: &RoomRecord, auth: Option<&AuthContext>) -> PermissionSet {
    auth.map_or_else(
        || record.role_permissions.everyone(),
        |auth| actor_permissions(record, auth),
    )
}

/// View gate. A room the caller may not view is indistinguishable from one
/// that does not exist, so denial surfaces as `not_found`.
pub(crate) fn require_view(
    record: &RoomRecord,
    auth: Option<&AuthContext>,
) -> Result<PermissionSet, ApiFailure> {
    let permissions = viewer_permissions(record, auth);
    if permissions.contains(Permission::ViewAndJoin) {
        return Ok(permissions);
    }
    Err(ApiFailure::NotFound)
}

/// Management gate. Callers must have confirmed visibility first; denial
/// here is an explicit `forbidden`.
pub(crate) fn require_permission(
    record: &RoomRecord,
    auth: &AuthContext,
    permission: Permission,
) -> Result<(), ApiFailure> {
    if actor_permissions(record, auth).contains(permission) {
        return Ok(());
    }
    Err(ApiFailure::Forbidden)
}

pub(crate) fn require_developer(auth: &AuthContext) -> Result<(), ApiFailure> {
    if auth.developer {
        return Ok(());
    }
    Err(ApiFailure::Forbidden)
}
