pub(crate) mod moderation;
pub(crate) mod roles;
pub(crate) mod rooms;
pub(crate) mod subrooms;
pub(crate) mod versions;
