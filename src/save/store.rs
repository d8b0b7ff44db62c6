//! State stores: where flushed records go
//!
//! The engine flushes every touched container immediately after a
//! successful mutation, on the same call stack. The store is behind a
//! small trait so tests and headless callers can keep everything in
//! memory while the shipped game writes JSON files.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use super::types::{ContainerRecord, ManifestRecord, CURRENT_SAVE_VERSION};
use super::SaveError;
use crate::inventory::ContainerId;

/// Destination for persisted container and manifest snapshots
pub trait StateStore {
    /// Writes a container snapshot, replacing any previous one
    fn flush_container(&mut self, record: &ContainerRecord) -> Result<(), SaveError>;

    /// Writes a world-chest manifest snapshot, replacing any previous one
    fn flush_manifest(&mut self, record: &ManifestRecord) -> Result<(), SaveError>;

    /// Reads back a container snapshot, if one was ever written
    fn load_container(&self, id: ContainerId) -> Result<Option<ContainerRecord>, SaveError>;

    /// Reads back one manifest snapshot
    fn load_manifest(&self, instance_id: u64) -> Result<Option<ManifestRecord>, SaveError>;

    /// Reads back every manifest snapshot (session start)
    fn load_all_manifests(&self) -> Result<Vec<ManifestRecord>, SaveError>;
}

/// In-memory store for tests and headless callers
#[derive(Debug, Default)]
pub struct MemoryStore {
    containers: HashMap<ContainerId, ContainerRecord>,
    manifests: HashMap<u64, ManifestRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Direct access to the last flushed container record
    pub fn container_record(&self, id: ContainerId) -> Option<&ContainerRecord> {
        self.containers.get(&id)
    }

    /// Direct access to the last flushed manifest record
    pub fn manifest_record(&self, instance_id: u64) -> Option<&ManifestRecord> {
        self.manifests.get(&instance_id)
    }
}

impl StateStore for MemoryStore {
    fn flush_container(&mut self, record: &ContainerRecord) -> Result<(), SaveError> {
        self.containers.insert(record.container_id, record.clone());
        Ok(())
    }

    fn flush_manifest(&mut self, record: &ManifestRecord) -> Result<(), SaveError> {
        self.manifests.insert(record.instance_id, record.clone());
        Ok(())
    }

    fn load_container(&self, id: ContainerId) -> Result<Option<ContainerRecord>, SaveError> {
        Ok(self.containers.get(&id).cloned())
    }

    fn load_manifest(&self, instance_id: u64) -> Result<Option<ManifestRecord>, SaveError> {
        Ok(self.manifests.get(&instance_id).cloned())
    }

    fn load_all_manifests(&self) -> Result<Vec<ManifestRecord>, SaveError> {
        Ok(self.manifests.values().cloned().collect())
    }
}

/// File-backed store: one pretty-printed JSON file per record
///
/// Layout under the save directory:
/// - `inventory.json`, `stash.json` — container records
/// - `chest_<instance>.json` — world-chest manifests
/// - `backup_<name>_<stamp>.json` — rotated copies, when enabled
pub struct FileStore {
    save_directory: PathBuf,
    backups_to_keep: usize,
}

impl FileStore {
    /// Creates a store rooted at the given directory
    ///
    /// The directory is created if it doesn't exist.
    pub fn new(save_directory: impl AsRef<Path>) -> Result<Self, SaveError> {
        let save_directory = save_directory.as_ref().to_path_buf();
        if !save_directory.exists() {
            fs::create_dir_all(&save_directory)?;
        }
        Ok(FileStore {
            save_directory,
            backups_to_keep: 0,
        })
    }

    /// Keeps up to `count` timestamped backups of each record file
    pub fn with_backups(mut self, count: usize) -> Self {
        self.backups_to_keep = count;
        self
    }

    /// Platform default save location
    pub fn default_directory() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("packrat")
            .join("saves")
    }

    fn container_filename(id: ContainerId) -> String {
        format!("{}.json", id)
    }

    fn manifest_filename(instance_id: u64) -> String {
        format!("chest_{}.json", instance_id)
    }

    fn write_record<T: serde::Serialize>(&self, filename: &str, record: &T) -> Result<(), SaveError> {
        let filepath = self.save_directory.join(filename);

        if self.backups_to_keep > 0 && filepath.exists() {
            self.rotate_backup(filename, &filepath)?;
        }

        // Pretty format for readability/debugging
        let json = serde_json::to_string_pretty(record)?;
        fs::write(&filepath, json)?;
        debug!("flushed {}", filepath.display());
        Ok(())
    }

    fn read_record<T: serde::de::DeserializeOwned>(
        &self,
        filename: &str,
    ) -> Result<Option<T>, SaveError> {
        let filepath = self.save_directory.join(filename);
        if !filepath.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(&filepath)?;
        Ok(Some(serde_json::from_str(&json)?))
    }

    fn rotate_backup(&self, filename: &str, filepath: &Path) -> Result<(), SaveError> {
        let stem = filename.trim_end_matches(".json");
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S%3f");
        let backup_name = format!("backup_{}_{}.json", stem, stamp);
        fs::copy(filepath, self.save_directory.join(backup_name))?;
        self.cleanup_backups(stem)?;
        Ok(())
    }

    /// Deletes old backups of one record, keeping the most recent N
    fn cleanup_backups(&self, stem: &str) -> Result<(), SaveError> {
        let prefix = format!("backup_{}_", stem);

        let mut backups: Vec<_> = fs::read_dir(&self.save_directory)?
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                entry
                    .file_name()
                    .to_str()
                    .map(|name| name.starts_with(&prefix))
                    .unwrap_or(false)
            })
            .collect();

        // Sort by modification time, newest first
        backups.sort_by_key(|entry| {
            entry
                .metadata()
                .and_then(|meta| meta.modified())
                .ok()
                .map(std::cmp::Reverse)
        });

        for entry in backups.iter().skip(self.backups_to_keep) {
            fs::remove_file(entry.path())?;
        }

        Ok(())
    }
}

impl StateStore for FileStore {
    fn flush_container(&mut self, record: &ContainerRecord) -> Result<(), SaveError> {
        self.write_record(&Self::container_filename(record.container_id), record)
    }

    fn flush_manifest(&mut self, record: &ManifestRecord) -> Result<(), SaveError> {
        self.write_record(&Self::manifest_filename(record.instance_id), record)
    }

    fn load_container(&self, id: ContainerId) -> Result<Option<ContainerRecord>, SaveError> {
        let record: Option<ContainerRecord> = self.read_record(&Self::container_filename(id))?;
        if let Some(record) = &record {
            if record.version > CURRENT_SAVE_VERSION {
                return Err(SaveError::InvalidVersion(record.version));
            }
        }
        Ok(record)
    }

    fn load_manifest(&self, instance_id: u64) -> Result<Option<ManifestRecord>, SaveError> {
        self.read_record(&Self::manifest_filename(instance_id))
    }

    fn load_all_manifests(&self) -> Result<Vec<ManifestRecord>, SaveError> {
        let mut manifests = Vec::new();

        for entry in fs::read_dir(&self.save_directory)? {
            let entry = entry?;
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            if !name.starts_with("chest_") || !name.ends_with(".json") {
                continue;
            }
            let json = fs::read_to_string(&path)?;
            match serde_json::from_str(&json) {
                Ok(record) => manifests.push(record),
                Err(err) => {
                    log::warn!("skipping unreadable manifest {}: {}", path.display(), err);
                }
            }
        }

        Ok(manifests)
    }
}
