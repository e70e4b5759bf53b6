//! Durable storage for the session/cart record.
//!
//! The whole store is written as one JSON record under [`STORE_KEY`]:
//!
//! ```json
//! {"state": {"user": {...}, "token": "...", "hasShop": false, "carts": [...]}, "version": 0}
//! ```
//!
//! When that record is absent, a session is recovered from the keys older
//! clients wrote (`auth:user`, `currentUser`, `user`, `uid`, `token`,
//! `auth:token`).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use bazaar_core::{MemberId, SellerId};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use super::StoreState;
use super::cart::CartLine;
use super::session::Session;
use crate::models::User;
use crate::models::session::{STORE_KEY, STORE_VERSION, legacy};
use crate::payload::{bool_field, str_field, u64_field, unwrap_data};

/// Errors from the durable key-value storage.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the backing file failed.
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing file exists but is not a JSON object of strings.
    #[error("Storage file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// The record could not be encoded.
    #[error("Failed to encode record: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Minimal synchronous key-value storage.
pub trait KeyValueStorage: Send + Sync {
    /// Value stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing store cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing store cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key`. Removing an absent key is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing store cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

// =============================================================================
// FileStorage
// =============================================================================

/// Key-value storage backed by a single JSON file.
///
/// Writes go to a sibling temp file which is then renamed over the original.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    /// Storage at `path`. The file is created on first write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>, StorageError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let data = std::fs::read_to_string(&self.path)?;
        if data.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&data).map_err(|source| StorageError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    fn save(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(entries)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn update(
        &self,
        f: impl FnOnce(&mut BTreeMap<String, String>) -> bool,
    ) -> Result<(), StorageError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut entries = self.load()?;
        if f(&mut entries) {
            self.save(&entries)?;
        }
        Ok(())
    }
}

impl KeyValueStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.update(|entries| {
            entries.insert(key.to_string(), value.to_string());
            true
        })
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.update(|entries| entries.remove(key).is_some())
    }
}

// =============================================================================
// MemoryStorage
// =============================================================================

/// In-process storage, for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStorage {
    /// Empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-filled with `entries`.
    #[must_use]
    pub fn with_entries<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let map = entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self {
            entries: Mutex::new(map),
        }
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries().remove(key);
        Ok(())
    }
}

// =============================================================================
// Persistence
// =============================================================================

#[derive(Serialize)]
struct RecordOut<'a> {
    state: StateOut<'a>,
    version: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StateOut<'a> {
    user: Option<&'a User>,
    token: Option<&'a str>,
    has_shop: Option<bool>,
    carts: &'a [CartLine],
}

#[derive(Deserialize)]
struct RecordIn {
    #[serde(default)]
    state: StateIn,
    #[serde(default)]
    version: u32,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StateIn {
    #[serde(default)]
    user: Option<Value>,
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    has_shop: Option<bool>,
    #[serde(default)]
    carts: Vec<Value>,
}

/// Mirrors committed store snapshots into durable storage.
pub struct Persistence {
    storage: Arc<dyn KeyValueStorage>,
    write_lock: Mutex<()>,
}

impl std::fmt::Debug for Persistence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Persistence").finish_non_exhaustive()
    }
}

impl Persistence {
    /// Persistence over `storage`.
    #[must_use]
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self {
            storage,
            write_lock: Mutex::new(()),
        }
    }

    /// Rehydrate the store. Never fails: unreadable or malformed data yields
    /// an empty state, and malformed cart lines are dropped.
    #[must_use]
    pub fn load(&self) -> StoreState {
        match self.storage.get(STORE_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<RecordIn>(&raw) {
                Ok(record) => {
                    debug!(version = record.version, "Rehydrated store record");
                    state_from_record(record.state)
                }
                Err(e) => {
                    warn!(error = %e, "Discarding unreadable store record");
                    StoreState::default()
                }
            },
            Ok(None) => StoreState {
                session: self.load_legacy(),
                carts: Vec::new(),
            },
            Err(e) => {
                warn!(error = %e, "Failed to read store record");
                StoreState::default()
            }
        }
    }

    /// Write `latest()` under the write lock, so that concurrent commits
    /// always leave the most recent snapshot on disk.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be encoded or written.
    pub fn save_latest(
        &self,
        latest: impl FnOnce() -> Arc<StoreState>,
    ) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let state = latest();
        let record = RecordOut {
            state: StateOut {
                user: state.session.user.as_ref(),
                token: state.session.token_str(),
                has_shop: state.session.has_shop,
                carts: &state.carts,
            },
            version: STORE_VERSION,
        };
        let json = serde_json::to_string(&record)?;
        self.storage.set(STORE_KEY, &json)
    }

    /// Remove the record and every legacy key.
    ///
    /// # Errors
    ///
    /// Returns the first `StorageError` encountered; remaining keys are still
    /// attempted.
    pub fn wipe(&self) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut first_error = None;
        for key in std::iter::once(STORE_KEY).chain(legacy::ALL.iter().copied()) {
            if let Err(e) = self.storage.remove(key) {
                warn!(key, error = %e, "Failed to remove stored key");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn load_legacy(&self) -> Session {
        let user = legacy::USER_KEYS
            .iter()
            .find_map(|key| self.read(key).and_then(|raw| legacy_user(&raw)))
            .or_else(|| {
                self.read(legacy::UID)
                    .and_then(|raw| unquote(&raw).parse::<u64>().ok())
                    .map(|id| User::new(MemberId::new(id), "Me"))
            });
        let Some(user) = user else {
            return Session::default();
        };

        let token = legacy::TOKEN_KEYS
            .iter()
            .filter_map(|key| self.read(key))
            .map(|raw| unquote(&raw).to_string())
            .find(|t| !t.is_empty())
            .map(SecretString::from);

        debug!(member_id = %user.id, has_token = token.is_some(), "Recovered legacy session");
        let has_shop = Some(user.owns_shop());
        Session {
            user: Some(user),
            token,
            has_shop,
        }
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.storage.get(key) {
            Ok(value) => value.filter(|v| !v.trim().is_empty()),
            Err(e) => {
                warn!(key, error = %e, "Failed to read stored key");
                None
            }
        }
    }
}

fn state_from_record(state: StateIn) -> StoreState {
    let user = state.user.as_ref().and_then(parse_user);
    // A token without a user is not a session.
    let token = user
        .as_ref()
        .and(state.token)
        .filter(|t| !t.is_empty())
        .map(SecretString::from);
    let has_shop = user
        .as_ref()
        .map(|u| state.has_shop.unwrap_or_else(|| u.owns_shop()));

    let carts = state
        .carts
        .into_iter()
        .filter_map(|raw| match serde_json::from_value::<CartLine>(raw) {
            Ok(line) => Some(line),
            Err(e) => {
                warn!(error = %e, "Dropping malformed cart line");
                None
            }
        })
        .collect();

    StoreState {
        session: Session {
            user,
            token,
            has_shop,
        },
        carts,
    }
}

fn parse_user(raw: &Value) -> Option<User> {
    let id = u64_field(raw, &["id", "ID"])?;
    Some(User {
        id: MemberId::new(id),
        username: str_field(raw, &["username", "UserName", "userName"]).unwrap_or_default(),
        seller_id: u64_field(raw, &["sellerID", "sellerId", "seller_id"]).map(SellerId::new),
        has_shop: bool_field(raw, &["hasShop", "has_shop"]),
        people: raw
            .get("people")
            .and_then(|p| serde_json::from_value(p.clone()).ok()),
    })
}

fn legacy_user(raw: &str) -> Option<User> {
    let value: Value = serde_json::from_str(raw).ok()?;
    parse_user(&unwrap_data(value))
}

fn unquote(raw: &str) -> &str {
    let trimmed = raw.trim();
    trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(trimmed)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::store::cart::{ProductRef, add_line};
    use secrecy::ExposeSecret;
    use serde_json::json;

    fn persistence(storage: MemoryStorage) -> (Arc<MemoryStorage>, Persistence) {
        let storage = Arc::new(storage);
        let persistence = Persistence::new(storage.clone());
        (storage, persistence)
    }

    fn signed_in_state() -> StoreState {
        let user: User =
            serde_json::from_value(json!({"id": 7, "username": "alice", "sellerID": null}))
                .unwrap();
        let mut carts = Vec::new();
        add_line(
            &mut carts,
            ProductRef::try_from(json!({"ID": 3, "Product": {"price": 120}})).unwrap(),
        );
        StoreState {
            session: Session::signed_in(user, SecretString::from("tok123")),
            carts,
        }
    }

    #[test]
    fn test_record_shape() {
        let (storage, persistence) = persistence(MemoryStorage::new());
        persistence
            .save_latest(|| Arc::new(signed_in_state()))
            .unwrap();

        let raw = storage.get(STORE_KEY).unwrap().unwrap();
        let record: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(record["version"], 0);
        assert_eq!(record["state"]["token"], "tok123");
        assert_eq!(record["state"]["hasShop"], false);
        assert_eq!(record["state"]["user"]["id"], 7);
        assert_eq!(record["state"]["carts"][0]["count"], 1);
    }

    #[test]
    fn test_save_then_load() {
        let (_, persistence) = persistence(MemoryStorage::new());
        persistence
            .save_latest(|| Arc::new(signed_in_state()))
            .unwrap();

        let state = persistence.load();
        assert_eq!(state.session.member_id(), Some(MemberId::new(7)));
        assert_eq!(state.session.token_str(), Some("tok123"));
        assert_eq!(state.carts.len(), 1);
    }

    #[test]
    fn test_load_drops_malformed_lines_and_orphan_token() {
        let record = json!({
            "state": {
                "user": null,
                "token": "orphan",
                "hasShop": true,
                "carts": [{"product": {"ID": 1, "price": 5}, "count": 2}, {"nope": true}]
            },
            "version": 0
        });
        let (_, persistence) = persistence(MemoryStorage::with_entries([(
            STORE_KEY,
            record.to_string().as_str(),
        )]));

        let state = persistence.load();
        assert!(state.session.user.is_none());
        assert!(state.session.token.is_none());
        assert!(state.session.has_shop.is_none());
        assert_eq!(state.carts.len(), 1);
        assert_eq!(state.carts[0].count, 2);
    }

    #[test]
    fn test_corrupt_record_yields_empty_state() {
        let (_, persistence) =
            persistence(MemoryStorage::with_entries([(STORE_KEY, "{not json")]));
        let state = persistence.load();
        assert!(state.session.user.is_none());
        assert!(state.carts.is_empty());
    }

    #[test]
    fn test_legacy_user_wrapped_in_data() {
        let (_, persistence) = persistence(MemoryStorage::with_entries([
            ("currentUser", r#"{"data": {"ID": 12, "UserName": "nok"}}"#),
            ("auth:token", "\"abc.def.ghi\""),
        ]));
        let state = persistence.load();
        let user = state.session.user.unwrap();
        assert_eq!(user.id, MemberId::new(12));
        assert_eq!(user.username, "nok");
        assert_eq!(
            state.session.token.unwrap().expose_secret(),
            "abc.def.ghi"
        );
    }

    #[test]
    fn test_legacy_key_order() {
        let (_, persistence) = persistence(MemoryStorage::with_entries([
            ("user", r#"{"id": 2, "username": "second"}"#),
            ("auth:user", r#"{"id": 1, "username": "first"}"#),
        ]));
        let state = persistence.load();
        assert_eq!(state.session.member_id(), Some(MemberId::new(1)));
        assert!(state.session.token.is_none());
    }

    #[test]
    fn test_legacy_uid_only() {
        let (_, persistence) = persistence(MemoryStorage::with_entries([("uid", "33")]));
        let state = persistence.load();
        let user = state.session.user.unwrap();
        assert_eq!(user.id, MemberId::new(33));
        assert_eq!(user.username, "Me");
        assert_eq!(state.session.has_shop, Some(false));
    }

    #[test]
    fn test_legacy_token_without_user_is_ignored() {
        let (_, persistence) = persistence(MemoryStorage::with_entries([("token", "abc")]));
        let state = persistence.load();
        assert!(state.session.user.is_none());
        assert!(state.session.token.is_none());
    }

    #[test]
    fn test_wipe_removes_record_and_legacy_keys() {
        let (storage, persistence) = persistence(MemoryStorage::with_entries([
            (STORE_KEY, "{}"),
            ("uid", "1"),
            ("token", "t"),
            ("unrelated", "keep"),
        ]));
        persistence.wipe().unwrap();
        assert!(storage.get(STORE_KEY).unwrap().is_none());
        assert!(storage.get("uid").unwrap().is_none());
        assert!(storage.get("token").unwrap().is_none());
        assert_eq!(storage.get("unrelated").unwrap().as_deref(), Some("keep"));
    }

    #[test]
    fn test_file_storage_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("storage.json");

        let storage = FileStorage::new(&path);
        storage.set("a", "1").unwrap();
        storage.set("b", "2").unwrap();
        storage.remove("a").unwrap();

        let reopened = FileStorage::new(&path);
        assert!(reopened.get("a").unwrap().is_none());
        assert_eq!(reopened.get("b").unwrap().as_deref(), Some("2"));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_file_storage_reports_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        std::fs::write(&path, "[1, 2").unwrap();

        let storage = FileStorage::new(&path);
        assert!(matches!(
            storage.get("a"),
            Err(StorageError::Corrupt { .. })
        ));
    }
}
