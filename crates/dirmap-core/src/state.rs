use crate::directory::DirectoryRecord;
use crate::error::{DirMapError, Result};
use crate::local::LocalBackend;
use crate::paths;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

// ---------------------------------------------------------------------------
// MirrorState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorState {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub directories: BTreeMap<String, DirectoryRecord>,
    #[serde(default)]
    pub backend: LocalBackend,
    pub last_updated: DateTime<Utc>,
}

fn default_version() -> u32 {
    1
}

impl Default for MirrorState {
    fn default() -> Self {
        Self {
            version: default_version(),
            directories: BTreeMap::new(),
            backend: LocalBackend::default(),
            last_updated: Utc::now(),
        }
    }
}

impl MirrorState {
    // ---------------------------------------------------------------------------
    // Persistence
    // ---------------------------------------------------------------------------

    pub fn load(root: &Path) -> Result<Self> {
        crate::io::load_yaml(&paths::state_path(root))
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        crate::io::save_yaml(&paths::state_path(root), self)
    }

    // ---------------------------------------------------------------------------
    // Directories
    // ---------------------------------------------------------------------------

    pub fn add_directory(&mut self, path: &str) -> Result<&mut DirectoryRecord> {
        if self.directories.contains_key(path) {
            return Err(DirMapError::DirectoryExists(path.to_string()));
        }
        let record = DirectoryRecord::new(path)?;
        self.last_updated = Utc::now();
        Ok(self.directories.entry(path.to_string()).or_insert(record))
    }

    /// Stop tracking an idle directory.
    pub fn remove_directory(&mut self, path: &str) -> Result<DirectoryRecord> {
        let record = self.directory(path)?;
        if !record.is_idle() {
            return Err(DirMapError::NotIdle {
                directory: path.to_string(),
                state: record.state,
            });
        }
        self.last_updated = Utc::now();
        self.directories
            .remove(path)
            .ok_or_else(|| DirMapError::DirectoryNotFound(path.to_string()))
    }

    pub fn directory(&self, path: &str) -> Result<&DirectoryRecord> {
        self.directories
            .get(path)
            .ok_or_else(|| DirMapError::DirectoryNotFound(path.to_string()))
    }

    pub fn directory_mut(&mut self, path: &str) -> Result<&mut DirectoryRecord> {
        self.directories
            .get_mut(path)
            .ok_or_else(|| DirMapError::DirectoryNotFound(path.to_string()))
    }

    /// Borrow one record together with the backend it is driven against.
    pub fn split_mut(&mut self, path: &str) -> Result<(&mut DirectoryRecord, &mut LocalBackend)> {
        self.last_updated = Utc::now();
        let record = self
            .directories
            .get_mut(path)
            .ok_or_else(|| DirMapError::DirectoryNotFound(path.to_string()))?;
        Ok((record, &mut self.backend))
    }

    /// Records left mid-sequence, e.g. after an action ran out of attempts.
    pub fn stuck(&self) -> Vec<&DirectoryRecord> {
        self.directories.values().filter(|r| !r.is_idle()).collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
