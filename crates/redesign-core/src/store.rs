use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Resource;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("schema store I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("schema store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("invalid resource id '{0}'")]
    InvalidId(String),
    #[error("schema store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Listing entry for a stored resource.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSummary {
    pub id: String,
    pub name: String,
    pub entity_count: usize,
}

/// Where resources and their data models are read from.
#[async_trait]
pub trait SchemaStore: Send + Sync {
    /// Look a resource up by id. `Ok(None)` means it does not exist.
    async fn get_resource(&self, id: &str) -> Result<Option<Resource>, StoreError>;

    async fn list_resources(&self) -> Result<Vec<ResourceSummary>, StoreError>;

    async fn put_resource(&self, resource: &Resource) -> Result<(), StoreError>;
}

/// Stores one `<id>.json` file per resource under `<root>/resources/`.
#[derive(Debug, Clone)]
pub struct FileSchemaStore {
    dir: PathBuf,
}

impl FileSchemaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            dir: root.into().join("resources"),
        }
    }

    /// Store rooted at the global data directory (~/.redesign/).
    pub fn default_location() -> Self {
        Self::new(crate::data_dir())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &str) -> Result<PathBuf, StoreError> {
        if !is_valid_id(id) {
            return Err(StoreError::InvalidId(id.to_string()));
        }
        Ok(self.dir.join(format!("{}.json", id)))
    }

    pub fn read_resource(&self, id: &str) -> Result<Option<Resource>, StoreError> {
        let path = self.path_for(id)?;
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&raw)?))
    }

    /// Write a resource atomically. Each call stages into its own temp file,
    /// so concurrent writers of one id never race on the staging path.
    pub fn write_resource(&self, resource: &Resource) -> Result<(), StoreError> {
        let path = self.path_for(&resource.id)?;
        fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_string_pretty(resource)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.persist(&path).map_err(|e| e.error)?;
        tracing::debug!(resource_id = %resource.id, path = %path.display(), "resource written");
        Ok(())
    }

    /// List all stored resources, sorted by id.
    pub fn summaries(&self) -> Result<Vec<ResourceSummary>, StoreError> {
        if !self.dir.exists() {
            return Ok(vec![]);
        }
        let mut ids: Vec<String> = fs::read_dir(&self.dir)?
            .filter_map(|entry| {
                let entry = entry.ok()?;
                let name = entry.file_name().to_string_lossy().to_string();
                name.strip_suffix(".json")
                    .filter(|id| is_valid_id(id))
                    .map(|id| id.to_string())
            })
            .collect();
        ids.sort();

        let mut summaries = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(resource) = self.read_resource(&id)? {
                summaries.push(ResourceSummary {
                    id: resource.id,
                    name: resource.name,
                    entity_count: resource.entities.iter().filter(|e| !e.is_deleted()).count(),
                });
            }
        }
        Ok(summaries)
    }
}

// File access runs on the blocking pool to keep the runtime free.
#[async_trait]
impl SchemaStore for FileSchemaStore {
    async fn get_resource(&self, id: &str) -> Result<Option<Resource>, StoreError> {
        let store = self.clone();
        let id = id.to_string();
        tokio::task::spawn_blocking(move || store.read_resource(&id)).await?
    }

    async fn list_resources(&self) -> Result<Vec<ResourceSummary>, StoreError> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.summaries()).await?
    }

    async fn put_resource(&self, resource: &Resource) -> Result<(), StoreError> {
        let store = self.clone();
        let resource = resource.clone();
        tokio::task::spawn_blocking(move || store.write_resource(&resource)).await?
    }
}

fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
