use std::{collections::HashMap, sync::Arc};

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use parlor_core::{AccountId, RoleName, RoleTable, SubroomName};

use super::errors::ApiFailure;

/// Persisted room document. Field names double as the wire/storage schema,
/// so the serde renames here are load-bearing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct RoomRecord {
    #[serde(rename = "_id")]
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) creator_id: AccountId,
    pub(crate) tags: Vec<String>,
    pub(crate) created_at: i64,
    pub(crate) visits: u64,
    #[serde(rename = "homeSubroomId")]
    pub(crate) home_subroom_id: SubroomName,
    pub(crate) subrooms: HashMap<SubroomName, SubroomRecord>,
    #[serde(rename = "rolePermissions")]
    pub(crate) role_permissions: RoleTable,
    #[serde(rename = "userPermissions")]
    pub(crate) user_permissions: HashMap<AccountId, RoleName>,
    pub(crate) cover_image_id: Option<String>,
    #[serde(rename = "contentFlags")]
    pub(crate) content_flags: ContentFlags,
    pub(crate) reports: Vec<ReportRecord>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct ContentFlags {
    pub(crate) nsfw: bool,
    pub(crate) gore: bool,
    pub(crate) violence: bool,
    pub(crate) suggestive: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct SubroomRecord {
    #[serde(rename = "maxPlayers")]
    pub(crate) max_players: u32,
    #[serde(rename = "publicVersionId")]
    pub(crate) public_version_id: usize,
    pub(crate) versions: Vec<VersionRecord>,
}

impl SubroomRecord {
    pub(crate) fn new(max_players: u32) -> Self {
        Self {
            max_players,
            public_version_id: 0,
            versions: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct VersionRecord {
    #[serde(rename = "baseSceneIndex")]
    pub(crate) base_scene_index: u32,
    #[serde(rename = "spawnPosition")]
    pub(crate) spawn_position: [f64; 3],
    #[serde(rename = "spawnRotation")]
    pub(crate) spawn_rotation: [f64; 4],
    #[serde(rename = "commitMessage")]
    pub(crate) commit_message: String,
    pub(crate) author: AccountId,
    pub(crate) collaborators: Vec<AccountId>,
    #[serde(rename = "associatedFile")]
    pub(crate) associated_file: bool,
    #[serde(rename = "fileSha256", skip_serializing_if = "Option::is_none", default)]
    pub(crate) file_sha256: Option<String>,
    #[serde(
        rename = "fileSizeBytes",
        skip_serializing_if = "Option::is_none",
        default
    )]
    pub(crate) file_size_bytes: Option<u64>,
    #[serde(rename = "createdAt")]
    pub(crate) created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ReportRecord {
    #[serde(rename = "reporterId")]
    pub(crate) reporter_id: AccountId,
    pub(crate) reason: String,
    #[serde(rename = "allegesIllegalContent")]
    pub(crate) alleges_illegal_content: bool,
    #[serde(rename = "allegesDangerToLife")]
    pub(crate) alleges_danger_to_life: bool,
    #[serde(rename = "createdAt")]
    pub(crate) created_at: i64,
}

/// Document-store collaborator. The room document is the unit of mutation:
/// every write goes through `update`, which runs the caller's closure under
/// the write lock, so partial-field updates and version appends are atomic
/// per document.
#[derive(Clone)]
pub(crate) struct RoomStore {
    documents: Arc<RwLock<HashMap<String, RoomRecord>>>,
}

impl RoomStore {
    pub(crate) fn new() -> Self {
        Self {
            documents: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Insert a fresh room, enforcing per-creator name uniqueness and the
    /// creation quota under the same lock.
    pub(crate) async fn insert(
        &self,
        record: RoomRecord,
        max_created_rooms_per_account: usize,
    ) -> Result<(), ApiFailure> {
        let mut documents = self.documents.write().await;
        let mut created = 0_usize;
        for existing in documents.values() {
            if existing.creator_id != record.creator_id {
                continue;
            }
            if existing.name == record.name {
                return Err(ApiFailure::RoomNameTaken);
            }
            created += 1;
        }
        if created >= max_created_rooms_per_account {
            return Err(ApiFailure::RoomCreationLimitReached);
        }
        documents.insert(record.id.clone(), record);
        Ok(())
    }

    pub(crate) async fn load(&self, room_id: &str) -> Result<RoomRecord, ApiFailure> {
        self.documents
            .read()
            .await
            .get(room_id)
            .cloned()
            .ok_or(ApiFailure::NotFound)
    }

    /// Atomic read-modify-write on a single room document.
    pub(crate) async fn update<R, F>(&self, room_id: &str, mutate: F) -> Result<R, ApiFailure>
    where
        F: FnOnce(&mut RoomRecord) -> Result<R, ApiFailure>,
    {
        let mut documents = self.documents.write().await;
        let record = documents.get_mut(room_id).ok_or(ApiFailure::NotFound)?;
        mutate(record)
    }

    /// Permanently delete a room document. There is no soft-delete path.
    pub(crate) async fn remove(&self, room_id: &str) -> Result<RoomRecord, ApiFailure> {
        self.documents
            .write()
            .await
            .remove(room_id)
            .ok_or(ApiFailure::NotFound)
    }

    pub(crate) async fn scan(&self) -> Vec<RoomRecord> {
        self.documents.read().await.values().cloned().collect()
    }
}

/// Test fixture shared by the store/domain unit suites.
#[cfg(test)]
pub(crate) fn sample_room(id: &str, creator: AccountId, name: &str) -> RoomRecord {
    let home = SubroomName::try_from(String::from("home")).expect("valid name");
    let mut subrooms = HashMap::new();
    subrooms.insert(home.clone(), SubroomRecord::new(16));
    RoomRecord {
        id: id.to_owned(),
        name: name.to_owned(),
        description: String::new(),
        creator_id: creator,
        tags: Vec::new(),
        created_at: 0,
        visits: 0,
        home_subroom_id: home,
        subrooms,
        role_permissions: RoleTable::new(),
        user_permissions: HashMap::new(),
        cover_image_id: None,
        content_flags: ContentFlags::default(),
        reports: Vec::new(),
    }
}
