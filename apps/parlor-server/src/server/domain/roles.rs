use parlor_core::{
    assigned_role, AccountId, Permission, PermissionFlags, PermissionSet, RoleAssignment, RoleName,
};
use parlor_protocol::RoomNotification;

use crate::server::{
    audit::{AuditEventKind, AuditRecorder},
    errors::ApiFailure,
    notify::RoomNotifier,
    store::RoomStore,
};

/// One permission key flipped by a role update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PermissionUpdate {
    pub(crate) permission: Permission,
    pub(crate) granted: bool,
}

pub(crate) async fn create_role(
    rooms: &RoomStore,
    audit: &AuditRecorder,
    room_id: &str,
    actor: AccountId,
    name: RoleName,
    max_roles_per_room: usize,
) -> Result<(), ApiFailure> {
    let name_for_audit = name.as_str().to_owned();
    rooms
        .update(room_id, |record| {
            if record.role_permissions.named_roles().count() >= max_roles_per_room {
                return Err(ApiFailure::InvalidRequest);
            }
            if !record.role_permissions.create(name) {
                return Err(ApiFailure::RoleAlreadyExists);
            }
            Ok(())
        })
        .await?;
    audit
        .record(
            room_id,
            actor,
            AuditEventKind::RoleCreated,
            serde_json::Value::Null,
            serde_json::json!(name_for_audit),
            None,
        )
        .await;
    Ok(())
}

/// Apply a bulk permission update to a role. Delegation is capped at the
/// granter's own grant set: flipping a key the actor does not hold fails,
/// whether granting or revoking. One audit record covers the whole update.
pub(crate) async fn update_role_permissions(
    rooms: &RoomStore,
    audit: &AuditRecorder,
    room_id: &str,
    actor: AccountId,
    actor_permissions: PermissionSet,
    role: &RoleAssignment,
    updates: &[PermissionUpdate],
) -> Result<(), ApiFailure> {
    if matches!(role, RoleAssignment::Owner) {
        return Err(ApiFailure::ReservedRole);
    }
    if updates.is_empty() {
        return Err(ApiFailure::InvalidRequest);
    }
    for update in updates {
        if !actor_permissions.contains(update.permission) {
            return Err(ApiFailure::Forbidden);
        }
    }

    let (previous, current) = rooms
        .update(room_id, |record| {
            let previous = match role {
                RoleAssignment::Owner => return Err(ApiFailure::ReservedRole),
                RoleAssignment::Everyone => record.role_permissions.everyone(),
                RoleAssignment::Named(name) => record
                    .role_permissions
                    .get_named(name)
                    .ok_or(ApiFailure::NotFound)?,
            };
            let mut current = previous;
            for update in updates {
                if update.granted {
                    current.insert(update.permission);
                } else {
                    current.remove(update.permission);
                }
            }
            match role {
                RoleAssignment::Owner => return Err(ApiFailure::ReservedRole),
                RoleAssignment::Everyone => record.role_permissions.set_everyone(current),
                RoleAssignment::Named(name) => {
                    record.role_permissions.set_named(name.clone(), current);
                }
            }
            Ok((previous, current))
        })
        .await?;
    audit
        .record(
            room_id,
            actor,
            AuditEventKind::RolePermissionsUpdated,
            serde_json::json!({
                "role": role.as_str(),
                "permissions": PermissionFlags::from(previous),
            }),
            serde_json::json!({
                "role": role.as_str(),
                "permissions": PermissionFlags::from(current),
            }),
            None,
        )
        .await;
    Ok(())
}

/// Delete a named role. Every account assigned to it falls back to
/// `everyone` (the mapping entry is removed, keeping the absent-key
/// convention canonical) and is told its permissions changed.
pub(crate) async fn delete_role(
    rooms: &RoomStore,
    audit: &AuditRecorder,
    notifier: &RoomNotifier,
    room_id: &str,
    actor: AccountId,
    name: &RoleName,
) -> Result<(), ApiFailure> {
    let (previous, affected) = rooms
        .update(room_id, |record| {
            let previous = record
                .role_permissions
                .remove(name)
                .ok_or(ApiFailure::NotFound)?;
            let affected: Vec<AccountId> = record
                .user_permissions
                .iter()
                .filter(|&(_, assigned)| assigned == name)
                .map(|(account, _)| *account)
                .collect();
            for account in &affected {
                record.user_permissions.remove(account);
            }
            Ok((previous, affected))
        })
        .await?;
    audit
        .record(
            room_id,
            actor,
            AuditEventKind::RoleDeleted,
            serde_json::json!({
                "role": name.as_str(),
                "permissions": PermissionFlags::from(previous),
            }),
            serde_json::Value::Null,
            None,
        )
        .await;
    for account in affected {
        notifier
            .notify(
                account,
                RoomNotification::PermissionsChanged {
                    room_id: room_id.to_owned(),
                },
            )
            .await;
    }
    Ok(())
}

/// Assign a role to an account. `owner` can never be granted this way, the
/// creator and the actor themselves can never be reassigned, and assigning
/// `everyone` removes the explicit mapping entry.
pub(crate) async fn set_user_role(
    rooms: &RoomStore,
    audit: &AuditRecorder,
    notifier: &RoomNotifier,
    room_id: &str,
    actor: AccountId,
    target: AccountId,
    role: &RoleAssignment,
) -> Result<(), ApiFailure> {
    if matches!(role, RoleAssignment::Owner) {
        return Err(ApiFailure::ReservedRole);
    }
    if target == actor {
        return Err(ApiFailure::Forbidden);
    }

    let previous = rooms
        .update(room_id, |record| {
            if target == record.creator_id {
                return Err(ApiFailure::Forbidden);
            }
            let previous = assigned_role(&record.creator_id, &record.user_permissions, &target);
            if matches!(previous, RoleAssignment::Owner) {
                return Err(ApiFailure::Forbidden);
            }
            match role {
                RoleAssignment::Owner => return Err(ApiFailure::ReservedRole),
                RoleAssignment::Everyone => {
                    record.user_permissions.remove(&target);
                }
                RoleAssignment::Named(name) => {
                    if !record.role_permissions.contains(name) {
                        return Err(ApiFailure::NotFound);
                    }
                    record.user_permissions.insert(target, name.clone());
                }
            }
            Ok(previous)
        })
        .await?;
    audit
        .record(
            room_id,
            actor,
            AuditEventKind::UserRolesUpdated,
            serde_json::json!({ "account": target.to_string(), "role": previous.as_str() }),
            serde_json::json!({ "account": target.to_string(), "role": role.as_str() }),
            None,
        )
        .await;
    notifier
        .notify(
            target,
            RoomNotification::PermissionsChanged {
                room_id: room_id.to_owned(),
            },
        )
        .await;
    Ok(())
}
