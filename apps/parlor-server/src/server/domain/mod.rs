mod moderation;
mod permissions_eval;
mod roles;
mod versions;

pub(crate) use moderation::{report_room, suspend_room, terminate_room};
pub(crate) use permissions_eval::{
    actor_permissions, require_developer, require_permission, require_view, viewer_permissions,
};
pub(crate) use roles::{
    create_role, delete_role, set_user_role, update_role_permissions, PermissionUpdate,
};
pub(crate) use versions::{
    associate_data, create_version, payload_path, resolve_download, set_public_version,
    VersionDraft, VersionSelector,
};
