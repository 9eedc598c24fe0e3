use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::anyhow;
use object_store::local::LocalFileSystem;
use pasetors::{keys::SymmetricKey, version4::V4};
use rand::{rngs::OsRng, RngCore};

use super::{audit::AuditRecorder, notify::RoomNotifier, store::RoomStore};

pub const DEFAULT_JSON_BODY_LIMIT_BYTES: usize = 1_048_576;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_RATE_LIMIT_REQUESTS_PER_MINUTE: u32 = 60;
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 25 * 1024 * 1024;
pub const DEFAULT_MAX_CREATED_ROOMS_PER_ACCOUNT: usize = 16;
pub const DEFAULT_MAX_SUBROOMS_PER_ROOM: usize = 32;
pub const DEFAULT_MAX_ROLES_PER_ROOM: usize = 64;
pub const DEFAULT_MAX_SEARCH_RESULTS: usize = 50;
pub const DEFAULT_AUDIT_LIST_LIMIT: usize = 100;
pub const DEFAULT_NOTIFY_QUEUE: usize = 64;

pub(crate) const ACCESS_TOKEN_TTL_SECS: i64 = 15 * 60;
pub(crate) const DEFAULT_SUBROOM_MAX_PLAYERS: u32 = 16;
pub(crate) const MAX_SUBROOM_PLAYERS: u32 = 256;
pub(crate) const MAX_TAGS_PER_ROOM: usize = 16;
pub(crate) const MAX_TAG_CHARS: usize = 32;
pub(crate) const MAX_DESCRIPTION_CHARS: usize = 2_048;
pub(crate) const MAX_REPORT_REASON_CHARS: usize = 1_024;
pub(crate) const MAX_VERSION_COMMIT_CHARS: usize = 512;
pub(crate) const MAX_VERSION_COLLABORATORS: usize = 16;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub max_body_bytes: usize,
    pub request_timeout: Duration,
    pub rate_limit_requests_per_minute: u32,
    pub max_payload_bytes: usize,
    pub max_created_rooms_per_account: usize,
    pub max_subrooms_per_room: usize,
    pub max_roles_per_room: usize,
    pub max_search_results: usize,
    pub audit_list_limit: usize,
    pub notify_queue: usize,
    pub payload_root: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: DEFAULT_JSON_BODY_LIMIT_BYTES,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            rate_limit_requests_per_minute: DEFAULT_RATE_LIMIT_REQUESTS_PER_MINUTE,
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
            max_created_rooms_per_account: DEFAULT_MAX_CREATED_ROOMS_PER_ACCOUNT,
            max_subrooms_per_room: DEFAULT_MAX_SUBROOMS_PER_ROOM,
            max_roles_per_room: DEFAULT_MAX_ROLES_PER_ROOM,
            max_search_results: DEFAULT_MAX_SEARCH_RESULTS,
            audit_list_limit: DEFAULT_AUDIT_LIST_LIMIT,
            notify_queue: DEFAULT_NOTIFY_QUEUE,
            payload_root: PathBuf::from("./data/payloads"),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct RuntimeLimits {
    pub(crate) max_payload_bytes: usize,
    pub(crate) max_created_rooms_per_account: usize,
    pub(crate) max_subrooms_per_room: usize,
    pub(crate) max_roles_per_room: usize,
    pub(crate) max_search_results: usize,
    pub(crate) audit_list_limit: usize,
}

/// Shared application state. Every collaborator the domain layer touches
/// (document store, audit trail, notifier, blob store) is constructed here
/// once and handed down as an explicit parameter, never reached through
/// globals.
#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) rooms: RoomStore,
    pub(crate) audit: AuditRecorder,
    pub(crate) notifier: RoomNotifier,
    pub(crate) payload_store: Arc<LocalFileSystem>,
    pub(crate) token_key: Arc<SymmetricKey<V4>>,
    pub(crate) runtime: Arc<RuntimeLimits>,
}

impl AppState {
    pub(crate) fn new(config: &AppConfig) -> anyhow::Result<Self> {
        let mut key_bytes = [0_u8; 32];
        OsRng.fill_bytes(&mut key_bytes);
        let token_key = SymmetricKey::<V4>::from(&key_bytes)
            .map_err(|e| anyhow!("token key init failed: {e}"))?;

        std::fs::create_dir_all(&config.payload_root)
            .map_err(|e| anyhow!("payload root init failed: {e}"))?;
        let payload_store = LocalFileSystem::new_with_prefix(&config.payload_root)
            .map_err(|e| anyhow!("payload store init failed: {e}"))?;

        Ok(Self {
            rooms: RoomStore::new(),
            audit: AuditRecorder::new(),
            notifier: RoomNotifier::new(config.notify_queue),
            payload_store: Arc::new(payload_store),
            token_key: Arc::new(token_key),
            runtime: Arc::new(RuntimeLimits {
                max_payload_bytes: config.max_payload_bytes,
                max_created_rooms_per_account: config.max_created_rooms_per_account,
                max_subrooms_per_room: config.max_subrooms_per_room,
                max_roles_per_room: config.max_roles_per_room,
                max_search_results: config.max_search_results,
                audit_list_limit: config.audit_list_limit,
            }),
        })
    }
}
