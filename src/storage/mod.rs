//! Profile persistence
//!
//! Core logic depends only on the [ProfileRepository] trait, never on a
//! concrete storage singleton. The file-backed implementation keeps one
//! JSON document mapping profile id to record and replaces the whole file
//! atomically on every save (write to a temp file, then rename), so a
//! crash mid-write never corrupts previously stored state.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use log::{info, warn};

use crate::config::StorageConfig;
use crate::error::ProgressionError;
use crate::progression::ProfileData;

/// Durable storage contract, keyed by profile id
pub trait ProfileRepository: Send {
    /// Load a profile record; `Ok(None)` when the profile has no record yet
    fn load(&self, profile_id: &str) -> Result<Option<ProfileData>, ProgressionError>;

    /// Persist a profile record, replacing any previous one atomically
    fn save(&self, profile_id: &str, record: &ProfileData) -> Result<(), ProgressionError>;
}

/// Single-file JSON store in the platform data directory
pub struct JsonFileRepository {
    path: PathBuf,
}

impl JsonFileRepository {
    /// Store under `<data_dir>/profiles.json`
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            path: data_dir.as_ref().join("profiles.json"),
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(config.resolve_data_dir())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<HashMap<String, ProfileData>, ProgressionError> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let contents =
            fs::read_to_string(&self.path).map_err(|e| ProgressionError::StorageRead {
                reason: e.to_string(),
            })?;
        serde_json::from_str(&contents).map_err(|e| ProgressionError::RecordCorrupt {
            reason: e.to_string(),
        })
    }

    fn write_all(&self, records: &HashMap<String, ProfileData>) -> Result<(), ProgressionError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| ProgressionError::StorageWrite {
                reason: e.to_string(),
            })?;
        }

        let contents =
            serde_json::to_string_pretty(records).map_err(|e| ProgressionError::StorageWrite {
                reason: e.to_string(),
            })?;

        // Atomic replace: temp file in the same directory, then rename
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, contents).map_err(|e| ProgressionError::StorageWrite {
            reason: e.to_string(),
        })?;
        fs::rename(&tmp_path, &self.path).map_err(|e| ProgressionError::StorageWrite {
            reason: e.to_string(),
        })
    }
}

impl ProfileRepository for JsonFileRepository {
    fn load(&self, profile_id: &str) -> Result<Option<ProfileData>, ProgressionError> {
        let mut records = self.read_all()?;
        Ok(records.remove(profile_id))
    }

    fn save(&self, profile_id: &str, record: &ProfileData) -> Result<(), ProgressionError> {
        // Other profiles in the store must survive this save; if the store
        // is unreadable it is already lost, start over rather than fail.
        let mut records = match self.read_all() {
            Ok(records) => records,
            Err(err) => {
                warn!(
                    "[Storage] Rebuilding unreadable profile store {:?}: {}",
                    self.path, err
                );
                HashMap::new()
            }
        };

        records.insert(profile_id.to_string(), record.clone());
        self.write_all(&records)?;
        info!("[Storage] Saved profile '{}'", profile_id);
        Ok(())
    }
}

/// Shared handles delegate, so one store can serve several owners
impl<R: ProfileRepository + Sync> ProfileRepository for std::sync::Arc<R> {
    fn load(&self, profile_id: &str) -> Result<Option<ProfileData>, ProgressionError> {
        (**self).load(profile_id)
    }

    fn save(&self, profile_id: &str, record: &ProfileData) -> Result<(), ProgressionError> {
        (**self).save(profile_id, record)
    }
}

/// In-memory store for tests and ephemeral sessions
#[derive(Default)]
pub struct MemoryRepository {
    records: Mutex<HashMap<String, ProfileData>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProfileRepository for MemoryRepository {
    fn load(&self, profile_id: &str) -> Result<Option<ProfileData>, ProgressionError> {
        let records = self
            .records
            .lock()
            .map_err(|_| ProgressionError::StatePoisoned)?;
        Ok(records.get(profile_id).cloned())
    }

    fn save(&self, profile_id: &str, record: &ProfileData) -> Result<(), ProgressionError> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| ProgressionError::StatePoisoned)?;
        records.insert(profile_id.to_string(), record.clone());
        Ok(())
    }
}
