//! Tracked state
//!
//! [`ObjectState`] is the state store handle for one managed object: typed
//! records are read from it with [`ObjectState::get`] and written back with
//! [`ObjectState::set`]. [`StateManager`] persists all objects of a project
//! in `.cldform/state.json`.

use crate::diag::Diagnostics;
use crate::error::{ProviderError, Result};
use crate::schema::Schema;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;

const STATE_VERSION: u32 = 1;
const STATE_DIR: &str = ".cldform";
const STATE_FILE: &str = "state.json";
const STATE_BACKUP: &str = "state.json.backup";
const LOCK_FILE: &str = "lock.json";

/// A typed model stored through [`ObjectState`]
pub trait Record: Serialize + DeserializeOwned {
    fn schema() -> Schema;
}

/// Attribute record of a single managed object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectState {
    /// Resource or data source type, e.g. `cloudinary_upload_mapping`
    pub type_name: String,

    /// Encoded attribute values keyed by attribute name
    #[serde(default)]
    pub attributes: BTreeMap<String, serde_json::Value>,

    #[serde(skip)]
    removed: bool,
}

impl ObjectState {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            attributes: BTreeMap::new(),
            removed: false,
        }
    }

    /// Build a state from a typed record
    pub fn from_record<R: Record>(
        type_name: impl Into<String>,
        record: &R,
    ) -> std::result::Result<Self, Diagnostics> {
        let mut state = Self::new(type_name);
        let diags = state.set(record);
        if diags.has_error() {
            return Err(diags);
        }
        Ok(state)
    }

    /// Decode the attributes into a typed record.
    ///
    /// Missing attributes decode as null.
    pub fn get<R: Record>(&self) -> std::result::Result<R, Diagnostics> {
        let mut diags = R::schema().validate(&self.attributes, false);
        if diags.has_error() {
            return Err(diags);
        }

        let object = serde_json::Value::Object(
            self.attributes
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        );
        serde_json::from_value(object).map_err(|e| {
            diags.add_error(
                "Value Conversion Error",
                format!(
                    "Unable to decode {} state into the expected record:\n\n{}",
                    self.type_name, e
                ),
            );
            diags
        })
    }

    /// Replace all attributes with the given record
    pub fn set<R: Record>(&mut self, record: &R) -> Diagnostics {
        let mut diags = Diagnostics::new();
        match serde_json::to_value(record) {
            Ok(serde_json::Value::Object(map)) => {
                self.attributes = map.into_iter().collect();
                self.removed = false;
            }
            Ok(other) => diags.add_error(
                "Value Conversion Error",
                format!("Expected an object record for {}, got {}", self.type_name, other),
            ),
            Err(e) => diags.add_error(
                "Value Conversion Error",
                format!("Unable to encode {} state:\n\n{}", self.type_name, e),
            ),
        }
        diags
    }

    /// Drop the tracked object entirely
    pub fn remove(&mut self) {
        self.attributes.clear();
        self.removed = true;
    }

    pub fn is_removed(&self) -> bool {
        self.removed
    }

    /// Known value of the `id` attribute
    pub fn id(&self) -> Option<String> {
        self.attributes
            .get("id")
            .filter(|v| v.get("state").and_then(|s| s.as_str()) == Some("known"))
            .and_then(|v| v.get("value"))
            .and_then(|v| v.as_str())
            .map(str::to_string)
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

/// All tracked objects of a project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateFile {
    /// State file version
    pub version: u32,

    /// Last modified timestamp
    pub updated_at: DateTime<Utc>,

    /// Objects indexed by `type.name`
    pub objects: BTreeMap<String, ObjectState>,
}

impl Default for StateFile {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            updated_at: Utc::now(),
            objects: BTreeMap::new(),
        }
    }
}

impl StateFile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key(type_name: &str, name: &str) -> String {
        format!("{}.{}", type_name, name)
    }

    /// Objects of one type as `(name, state)` pairs
    pub fn objects_of_type<'a>(
        &'a self,
        type_name: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a ObjectState)> + 'a {
        self.objects.iter().filter_map(move |(key, state)| {
            key.strip_prefix(type_name)
                .and_then(|rest| rest.strip_prefix('.'))
                .map(|name| (name, state))
        })
    }

    /// Add or update an object
    pub fn set_object(&mut self, key: String, state: ObjectState) {
        self.objects.insert(key, state);
        self.updated_at = Utc::now();
    }

    /// Remove an object
    pub fn remove_object(&mut self, key: &str) -> Option<ObjectState> {
        let result = self.objects.remove(key);
        if result.is_some() {
            self.updated_at = Utc::now();
        }
        result
    }

    pub fn get_object(&self, key: &str) -> Option<&ObjectState> {
        self.objects.get(key)
    }

    /// Store a response state, dropping the object when it was removed
    pub fn apply(&mut self, key: String, state: ObjectState) {
        if state.is_removed() {
            self.remove_object(&key);
        } else {
            self.set_object(key, state);
        }
    }
}

/// State manager for reading/writing state files
pub struct StateManager {
    /// Project root directory
    project_root: PathBuf,
}

impl StateManager {
    pub fn new(project_root: impl AsRef<Path>) -> Self {
        Self {
            project_root: project_root.as_ref().to_path_buf(),
        }
    }

    fn state_dir(&self) -> PathBuf {
        self.project_root.join(STATE_DIR)
    }

    pub fn state_path(&self) -> PathBuf {
        self.state_dir().join(STATE_FILE)
    }

    fn backup_path(&self) -> PathBuf {
        self.state_dir().join(STATE_BACKUP)
    }

    fn lock_path(&self) -> PathBuf {
        self.state_dir().join(LOCK_FILE)
    }

    async fn ensure_state_dir(&self) -> Result<()> {
        let dir = self.state_dir();
        if !dir.exists() {
            fs::create_dir_all(&dir).await?;
            tracing::debug!("Created state directory: {}", dir.display());
        }
        Ok(())
    }

    /// Load the current state
    pub async fn load(&self) -> Result<StateFile> {
        let path = self.state_path();
        if !path.exists() {
            tracing::debug!("State file not found, returning empty state");
            return Ok(StateFile::new());
        }

        let content = fs::read_to_string(&path).await?;
        let state: StateFile = serde_json::from_str(&content)?;

        if state.version > STATE_VERSION {
            return Err(ProviderError::State(format!(
                "State file version {} is newer than supported version {}",
                state.version, STATE_VERSION
            )));
        }

        tracing::debug!("Loaded state with {} objects", state.objects.len());
        Ok(state)
    }

    /// Save the state, keeping the previous file as a backup
    pub async fn save(&self, state: &StateFile) -> Result<()> {
        self.ensure_state_dir().await?;

        let path = self.state_path();
        let backup = self.backup_path();

        if path.exists() {
            if backup.exists() {
                fs::remove_file(&backup).await?;
            }
            fs::rename(&path, &backup).await?;
            tracing::debug!("Created state backup");
        }

        let content = serde_json::to_string_pretty(state)?;
        fs::write(&path, content).await?;

        tracing::debug!("Saved state with {} objects", state.objects.len());
        Ok(())
    }

    /// Acquire a lock for exclusive access
    pub async fn acquire_lock(&self) -> Result<StateLock> {
        self.ensure_state_dir().await?;

        let lock_path = self.lock_path();

        if lock_path.exists() {
            let content = fs::read_to_string(&lock_path).await?;
            let lock_info: LockInfo = serde_json::from_str(&content)?;

            // Locks older than an hour are stale
            let age = Utc::now().signed_duration_since(lock_info.acquired_at);
            if age.num_hours() < 1 {
                return Err(ProviderError::Lock(format!(
                    "State is locked by {} since {}",
                    lock_info.holder, lock_info.acquired_at
                )));
            }

            tracing::warn!("Removing stale lock from {}", lock_info.holder);
        }

        let lock_info = LockInfo {
            holder: std::env::var("HOSTNAME")
                .or_else(|_| std::env::var("HOST"))
                .unwrap_or_else(|_| "unknown".to_string()),
            acquired_at: Utc::now(),
        };

        let content = serde_json::to_string_pretty(&lock_info)?;
        fs::write(&lock_path, content).await?;

        tracing::debug!("Acquired state lock");
        Ok(StateLock {
            lock_path,
            released: false,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct LockInfo {
    holder: String,
    acquired_at: DateTime<Utc>,
}

/// RAII guard for state lock
pub struct StateLock {
    lock_path: PathBuf,
    released: bool,
}

impl StateLock {
    pub async fn release(mut self) -> Result<()> {
        if !self.released {
            if self.lock_path.exists() {
                fs::remove_file(&self.lock_path).await?;
                tracing::debug!("Released state lock");
            }
            self.released = true;
        }
        Ok(())
    }
}

impl Drop for StateLock {
    fn drop(&mut self) {
        if !self.released && self.lock_path.exists() {
            let _ = std::fs::remove_file(&self.lock_path);
        }
    }
}
