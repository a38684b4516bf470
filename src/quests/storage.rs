use std::path::{Path, PathBuf};

use log::warn;
use sled::IVec;

use crate::quests::errors::QuestError;
use crate::quests::types::{
    ObjectiveEntry, ProgressEntry, OBJECTIVE_SCHEMA_VERSION, PROGRESS_SCHEMA_VERSION,
};

const TREE_PROGRESS: &str = "questlog_progress";
const TREE_OBJECTIVES: &str = "questlog_objectives";

/// Persistence collaborator for quest and objective progress.
///
/// A plain key/value store: no multi-key atomicity is assumed by callers.
pub trait ProgressBackend: Send + Sync {
    fn load_all_progress(&self) -> Result<Vec<ProgressEntry>, QuestError>;
    fn save_progress(&self, entry: &ProgressEntry) -> Result<(), QuestError>;
    fn save_progress_batch(&self, entries: &[ProgressEntry]) -> Result<(), QuestError>;
    fn delete_progress(&self, key: &str) -> Result<(), QuestError>;
    fn clear_all(&self) -> Result<(), QuestError>;

    fn load_all_objectives(&self) -> Result<Vec<ObjectiveEntry>, QuestError>;
    fn save_objective(&self, entry: &ObjectiveEntry) -> Result<(), QuestError>;
    fn delete_objective(&self, key: &str) -> Result<(), QuestError>;
    fn clear_objectives(&self) -> Result<(), QuestError>;
}

/// Helper builder so tests can easily create throwaway stores with custom paths.
pub struct ProgressDbBuilder {
    path: PathBuf,
    temporary: bool,
}

impl ProgressDbBuilder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            temporary: false,
        }
    }

    /// Delete the database files when the store is dropped.
    pub fn temporary(mut self) -> Self {
        self.temporary = true;
        self
    }

    pub fn open(self) -> Result<ProgressDb, QuestError> {
        ProgressDb::open_with_options(self.path, self.temporary)
    }
}

/// Sled-backed persistence for quest progress and objective flags.
pub struct ProgressDb {
    _db: sled::Db,
    progress: sled::Tree,
    objectives: sled::Tree,
}

impl ProgressDb {
    /// Open (or create) the progress database rooted at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, QuestError> {
        Self::open_with_options(path, false)
    }

    fn open_with_options<P: AsRef<Path>>(path: P, temporary: bool) -> Result<Self, QuestError> {
        let path_ref = path.as_ref();
        std::fs::create_dir_all(path_ref)?;
        let db = sled::Config::new()
            .path(path_ref)
            .temporary(temporary)
            .open()?;
        let progress = db.open_tree(TREE_PROGRESS)?;
        let objectives = db.open_tree(TREE_OBJECTIVES)?;
        Ok(Self {
            _db: db,
            progress,
            objectives,
        })
    }

    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, QuestError> {
        Ok(bincode::serialize(value)?)
    }

    fn deserialize<T: serde::de::DeserializeOwned>(bytes: IVec) -> Result<T, QuestError> {
        Ok(bincode::deserialize::<T>(&bytes)?)
    }

    /// Fetch one progress entry by storage key (`id:<id>` or `name:<name>`).
    pub fn get_progress(&self, key: &str) -> Result<ProgressEntry, QuestError> {
        let Some(bytes) = self.progress.get(key.as_bytes())? else {
            return Err(QuestError::NotFound(format!("progress: {}", key)));
        };
        let entry: ProgressEntry = Self::deserialize(bytes)?;
        if entry.schema_version != PROGRESS_SCHEMA_VERSION {
            return Err(QuestError::SchemaMismatch {
                entity: "progress",
                expected: PROGRESS_SCHEMA_VERSION,
                found: entry.schema_version,
            });
        }
        Ok(entry)
    }

    pub fn progress_keys(&self) -> Result<Vec<String>, QuestError> {
        let mut keys = Vec::new();
        for item in self.progress.iter() {
            let (key, _) = item?;
            keys.push(String::from_utf8_lossy(&key).into_owned());
        }
        Ok(keys)
    }
}

impl ProgressBackend for ProgressDb {
    fn load_all_progress(&self) -> Result<Vec<ProgressEntry>, QuestError> {
        let mut entries = Vec::new();
        for item in self.progress.iter() {
            let (key, bytes) = item?;
            let entry: ProgressEntry = match Self::deserialize(bytes) {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(
                        "Skipping unreadable progress record {}: {}",
                        String::from_utf8_lossy(&key),
                        e
                    );
                    continue;
                }
            };
            if entry.schema_version != PROGRESS_SCHEMA_VERSION {
                warn!(
                    "Skipping progress record {} with schema v{} (expected v{})",
                    String::from_utf8_lossy(&key),
                    entry.schema_version,
                    PROGRESS_SCHEMA_VERSION
                );
                continue;
            }
            entries.push(entry);
        }
        Ok(entries)
    }

    fn save_progress(&self, entry: &ProgressEntry) -> Result<(), QuestError> {
        let bytes = Self::serialize(entry)?;
        self.progress
            .insert(entry.key.storage_key().into_bytes(), bytes)?;
        self.progress.flush()?;
        Ok(())
    }

    fn save_progress_batch(&self, entries: &[ProgressEntry]) -> Result<(), QuestError> {
        let mut batch = sled::Batch::default();
        for entry in entries {
            batch.insert(entry.key.storage_key().into_bytes(), Self::serialize(entry)?);
        }
        self.progress.apply_batch(batch)?;
        self.progress.flush()?;
        Ok(())
    }

    fn delete_progress(&self, key: &str) -> Result<(), QuestError> {
        self.progress.remove(key.as_bytes())?;
        self.progress.flush()?;
        Ok(())
    }

    fn clear_all(&self) -> Result<(), QuestError> {
        self.progress.clear()?;
        self.progress.flush()?;
        Ok(())
    }

    fn load_all_objectives(&self) -> Result<Vec<ObjectiveEntry>, QuestError> {
        let mut entries = Vec::new();
        for item in self.objectives.iter() {
            let (key, bytes) = item?;
            match Self::deserialize::<ObjectiveEntry>(bytes) {
                Ok(entry) if entry.schema_version == OBJECTIVE_SCHEMA_VERSION => entries.push(entry),
                Ok(entry) => warn!(
                    "Skipping objective record {} with schema v{}",
                    String::from_utf8_lossy(&key),
                    entry.schema_version
                ),
                Err(e) => warn!(
                    "Skipping unreadable objective record {}: {}",
                    String::from_utf8_lossy(&key),
                    e
                ),
            }
        }
        Ok(entries)
    }

    fn save_objective(&self, entry: &ObjectiveEntry) -> Result<(), QuestError> {
        let bytes = Self::serialize(entry)?;
        self.objectives.insert(entry.key.as_bytes(), bytes)?;
        self.objectives.flush()?;
        Ok(())
    }

    fn delete_objective(&self, key: &str) -> Result<(), QuestError> {
        self.objectives.remove(key.as_bytes())?;
        self.objectives.flush()?;
        Ok(())
    }

    fn clear_objectives(&self) -> Result<(), QuestError> {
        self.objectives.clear()?;
        self.objectives.flush()?;
        Ok(())
    }
}
