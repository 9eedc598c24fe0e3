#![forbid(unsafe_code)]

use std::collections::{BTreeMap, HashMap};

use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};
use ulid::Ulid;

/// Returns the project code name.
#[must_use]
pub const fn project_name() -> &'static str {
    "parlor"
}

pub const ROLE_OWNER: &str = "owner";
pub const ROLE_EVERYONE: &str = "everyone";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("account id is invalid")]
    InvalidAccountId,
    #[error("room name is invalid")]
    InvalidRoomName,
    #[error("subroom name is invalid")]
    InvalidSubroomName,
    #[error("role name is invalid")]
    InvalidRoleName,
    #[error("role name is reserved")]
    ReservedRoleName,
    #[error("spawn transform is invalid")]
    InvalidSpawnTransform,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccountId(Ulid);

impl AccountId {
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<String> for AccountId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let parsed = Ulid::from_string(&value).map_err(|_| DomainError::InvalidAccountId)?;
        Ok(Self(parsed))
    }
}

impl core::fmt::Display for AccountId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for AccountId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for AccountId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::try_from(raw).map_err(D::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoomName(String);

impl RoomName {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RoomName {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if !(1..=64).contains(&value.len()) {
            return Err(DomainError::InvalidRoomName);
        }
        if value.chars().all(|c| c.is_ascii_graphic() || c == ' ') && value.trim() == value {
            return Ok(Self(value));
        }
        Err(DomainError::InvalidRoomName)
    }
}

/// Subroom names double as blob-path segments, so the alphabet is tighter
/// than for room names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubroomName(String);

impl SubroomName {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for SubroomName {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if !(1..=64).contains(&value.len()) {
            return Err(DomainError::InvalidSubroomName);
        }
        if value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        {
            return Ok(Self(value));
        }
        Err(DomainError::InvalidSubroomName)
    }
}

impl core::fmt::Display for SubroomName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for SubroomName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for SubroomName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::try_from(raw).map_err(D::Error::custom)
    }
}

/// A named (non-system) role. The reserved `owner`/`everyone` names are
/// rejected here, which makes "a named role is never a system role" hold
/// by construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoleName(String);

impl RoleName {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RoleName {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.eq_ignore_ascii_case(ROLE_OWNER) || value.eq_ignore_ascii_case(ROLE_EVERYONE) {
            return Err(DomainError::ReservedRoleName);
        }
        if !(1..=32).contains(&value.len()) {
            return Err(DomainError::InvalidRoleName);
        }
        if value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-'))
        {
            return Ok(Self(value));
        }
        Err(DomainError::InvalidRoleName)
    }
}

impl core::fmt::Display for RoleName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for RoleName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for RoleName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::try_from(raw).map_err(D::Error::custom)
    }
}

/// The role an account holds inside a room. `Owner` is never stored; it is
/// implied by the room's creator id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleAssignment {
    Owner,
    Everyone,
    Named(RoleName),
}

impl RoleAssignment {
    /// Parse a client-supplied role selector.
    ///
    /// # Errors
    /// Returns [`DomainError`] if the selector is neither a reserved role
    /// nor a valid named role.
    pub fn parse(value: &str) -> Result<Self, DomainError> {
        match value {
            ROLE_OWNER => Ok(Self::Owner),
            ROLE_EVERYONE => Ok(Self::Everyone),
            other => Ok(Self::Named(RoleName::try_from(other.to_owned())?)),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Owner => ROLE_OWNER,
            Self::Everyone => ROLE_EVERYONE,
            Self::Named(name) => name.as_str(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    ViewAndJoin,
    CreateVersions,
    PublishVersion,
    ManageSubrooms,
    ManageMetadata,
    ManagePermissions,
}

pub const ALL_PERMISSIONS: [Permission; 6] = [
    Permission::ViewAndJoin,
    Permission::CreateVersions,
    Permission::PublishVersion,
    Permission::ManageSubrooms,
    Permission::ManageMetadata,
    Permission::ManagePermissions,
];

const fn permission_mask(permission: Permission) -> u64 {
    match permission {
        Permission::ViewAndJoin => 1 << 0,
        Permission::CreateVersions => 1 << 1,
        Permission::PublishVersion => 1 << 2,
        Permission::ManageSubrooms => 1 << 3,
        Permission::ManageMetadata => 1 << 4,
        Permission::ManagePermissions => 1 << 5,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PermissionSet(u64);

impl PermissionSet {
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    #[must_use]
    pub const fn bits(self) -> u64 {
        self.0
    }

    #[must_use]
    pub const fn contains(self, permission: Permission) -> bool {
        self.0 & permission_mask(permission) != 0
    }

    #[must_use]
    pub const fn contains_all(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn insert(&mut self, permission: Permission) {
        self.0 |= permission_mask(permission);
    }

    pub fn remove(&mut self, permission: Permission) {
        self.0 &= !permission_mask(permission);
    }
}

#[must_use]
pub fn all_permissions() -> PermissionSet {
    let mut set = PermissionSet::empty();
    for permission in ALL_PERMISSIONS {
        set.insert(permission);
    }
    set
}

/// Wire/storage form of a permission set. Unset keys default to false in
/// both directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PermissionFlags {
    pub view_and_join: bool,
    pub create_versions: bool,
    pub publish_version: bool,
    pub manage_subrooms: bool,
    pub manage_metadata: bool,
    pub manage_permissions: bool,
}

impl From<PermissionFlags> for PermissionSet {
    fn from(flags: PermissionFlags) -> Self {
        let mut set = Self::empty();
        if flags.view_and_join {
            set.insert(Permission::ViewAndJoin);
        }
        if flags.create_versions {
            set.insert(Permission::CreateVersions);
        }
        if flags.publish_version {
            set.insert(Permission::PublishVersion);
        }
        if flags.manage_subrooms {
            set.insert(Permission::ManageSubrooms);
        }
        if flags.manage_metadata {
            set.insert(Permission::ManageMetadata);
        }
        if flags.manage_permissions {
            set.insert(Permission::ManagePermissions);
        }
        set
    }
}

impl From<PermissionSet> for PermissionFlags {
    fn from(set: PermissionSet) -> Self {
        Self {
            view_and_join: set.contains(Permission::ViewAndJoin),
            create_versions: set.contains(Permission::CreateVersions),
            publish_version: set.contains(Permission::PublishVersion),
            manage_subrooms: set.contains(Permission::ManageSubrooms),
            manage_metadata: set.contains(Permission::ManageMetadata),
            manage_permissions: set.contains(Permission::ManagePermissions),
        }
    }
}

/// The per-room role/permission table. The reserved roles are dedicated
/// fields rather than map entries: `owner` is implied (all permissions,
/// never independently meaningful) and `everyone` is the default role for
/// unassigned accounts. On the wire the table still reads and writes as a
/// single map containing `owner` and `everyone` keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleTable {
    everyone: PermissionSet,
    named: BTreeMap<RoleName, PermissionSet>,
}

impl RoleTable {
    /// Fresh rooms grant `everyone` view access and nothing else.
    #[must_use]
    pub fn new() -> Self {
        let mut everyone = PermissionSet::empty();
        everyone.insert(Permission::ViewAndJoin);
        Self {
            everyone,
            named: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn everyone(&self) -> PermissionSet {
        self.everyone
    }

    pub fn set_everyone(&mut self, set: PermissionSet) {
        self.everyone = set;
    }

    #[must_use]
    pub fn contains(&self, name: &RoleName) -> bool {
        self.named.contains_key(name)
    }

    #[must_use]
    pub fn get_named(&self, name: &RoleName) -> Option<PermissionSet> {
        self.named.get(name).copied()
    }

    /// Returns false if the role already exists.
    pub fn create(&mut self, name: RoleName) -> bool {
        if self.named.contains_key(&name) {
            return false;
        }
        self.named.insert(name, PermissionSet::empty());
        true
    }

    pub fn set_named(&mut self, name: RoleName, set: PermissionSet) {
        self.named.insert(name, set);
    }

    pub fn remove(&mut self, name: &RoleName) -> Option<PermissionSet> {
        self.named.remove(name)
    }

    /// Strips every role, reserved and named, to the empty permission set.
    pub fn strip_all(&mut self) {
        self.everyone = PermissionSet::empty();
        for set in self.named.values_mut() {
            *set = PermissionSet::empty();
        }
    }

    pub fn named_roles(&self) -> impl Iterator<Item = (&RoleName, PermissionSet)> {
        self.named.iter().map(|(name, set)| (name, *set))
    }

    #[must_use]
    pub fn permissions_for(&self, assignment: &RoleAssignment) -> PermissionSet {
        match assignment {
            RoleAssignment::Owner => all_permissions(),
            RoleAssignment::Everyone => self.everyone,
            RoleAssignment::Named(name) => {
                self.named.get(name).copied().unwrap_or_else(PermissionSet::empty)
            }
        }
    }
}

impl Default for RoleTable {
    fn default() -> Self {
        Self::new()
    }
}

impl Serialize for RoleTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap as _;
        let mut map = serializer.serialize_map(Some(self.named.len() + 2))?;
        map.serialize_entry(ROLE_OWNER, &PermissionFlags::from(all_permissions()))?;
        map.serialize_entry(ROLE_EVERYONE, &PermissionFlags::from(self.everyone))?;
        for (name, set) in &self.named {
            map.serialize_entry(name.as_str(), &PermissionFlags::from(*set))?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for RoleTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, PermissionFlags>::deserialize(deserializer)?;
        let mut table = Self {
            everyone: PermissionSet::empty(),
            named: BTreeMap::new(),
        };
        for (key, flags) in raw {
            if key == ROLE_OWNER {
                // Stored owner rows are never meaningful.
                continue;
            }
            if key == ROLE_EVERYONE {
                table.everyone = PermissionSet::from(flags);
                continue;
            }
            let name = RoleName::try_from(key).map_err(D::Error::custom)?;
            table.named.insert(name, PermissionSet::from(flags));
        }
        Ok(table)
    }
}

/// Resolve which role an account holds in a room.
#[must_use]
pub fn assigned_role(
    creator: &AccountId,
    assignments: &HashMap<AccountId, RoleName>,
    account: &AccountId,
) -> RoleAssignment {
    if account == creator {
        return RoleAssignment::Owner;
    }
    assignments.get(account).map_or(RoleAssignment::Everyone, |name| {
        RoleAssignment::Named(name.clone())
    })
}

/// Resolve an account's effective permission set. The owner bypasses the
/// stored table entirely; everyone else gets exactly what the table grants.
#[must_use]
pub fn effective_permissions(
    creator: &AccountId,
    assignments: &HashMap<AccountId, RoleName>,
    roles: &RoleTable,
    account: &AccountId,
) -> PermissionSet {
    let assignment = assigned_role(creator, assignments, account);
    roles.permissions_for(&assignment)
}

/// Spawn placement for a subroom version: a complete position and a
/// complete quaternion, all finite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnTransform {
    pub position: [f64; 3],
    pub rotation: [f64; 4],
}

impl SpawnTransform {
    /// # Errors
    /// Returns [`DomainError::InvalidSpawnTransform`] unless `position` has
    /// exactly 3 finite components and `rotation` exactly 4.
    pub fn new(position: &[f64], rotation: &[f64]) -> Result<Self, DomainError> {
        let position: [f64; 3] = position
            .try_into()
            .map_err(|_| DomainError::InvalidSpawnTransform)?;
        let rotation: [f64; 4] = rotation
            .try_into()
            .map_err(|_| DomainError::InvalidSpawnTransform)?;
        if position.iter().chain(rotation.iter()).all(|v| v.is_finite()) {
            Ok(Self { position, rotation })
        } else {
            Err(DomainError::InvalidSpawnTransform)
        }
    }
}
