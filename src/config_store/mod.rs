// Config store - endpoints and base tag persisted as one JSON document
mod error;
mod types;

pub use error::ConfigStoreError;
pub use types::*;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Handle on the JSON document. Every read goes back to disk.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the empty default document if the file does not exist yet.
    /// Returns whether a file was created.
    pub async fn ensure_exists(&self) -> Result<bool, ConfigStoreError> {
        if tokio::fs::try_exists(&self.path).await? {
            return Ok(false);
        }

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(&ConfigDocument::default())?;
        tokio::fs::write(&self.path, json).await?;
        info!("Created default endpoint configuration at {:?}", self.path);
        Ok(true)
    }

    /// Current document, or the empty default when the file is missing or
    /// cannot be parsed.
    pub async fn get_config(&self) -> ConfigDocument {
        match self.load().await {
            Ok(doc) => doc,
            Err(e) => {
                warn!("{}; using empty defaults", e);
                ConfigDocument::default()
            }
        }
    }

    /// Document for a read-modify-write. A missing file starts empty, but a
    /// file that exists and cannot be read or parsed is an error so the
    /// caller never overwrites it with the empty default.
    async fn load(&self) -> Result<ConfigDocument, ConfigStoreError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Endpoint configuration {:?} not found", self.path);
                return Ok(ConfigDocument::default());
            }
            Err(e) => {
                error!("Failed to read endpoint configuration {:?}: {}", self.path, e);
                return Err(ConfigStoreError::IoError(e));
            }
        };

        serde_json::from_str(&contents).map_err(|e| {
            ConfigStoreError::Unreadable(format!("{}: {}", self.path.display(), e))
        })
    }

    /// Overwrites the whole file. Failures are logged and reported as `false`.
    pub async fn save_config(&self, doc: &ConfigDocument) -> bool {
        let json = match serde_json::to_string_pretty(doc) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize endpoint configuration: {}", e);
                return false;
            }
        };

        match tokio::fs::write(&self.path, json).await {
            Ok(()) => true,
            Err(e) => {
                error!(
                    "Failed to write endpoint configuration {:?}: {}",
                    self.path, e
                );
                false
            }
        }
    }

    pub async fn list_endpoints(&self) -> BTreeMap<String, Endpoint> {
        self.get_config().await.api_urls
    }

    pub async fn get_endpoint(&self, name: &str) -> Option<Endpoint> {
        self.get_config().await.api_urls.remove(name)
    }

    pub async fn add_endpoint(
        &self,
        name: &str,
        endpoint: Endpoint,
    ) -> Result<(), ConfigStoreError> {
        validate_endpoint_name(name)?;

        let mut doc = self.load().await?;
        if doc.api_urls.contains_key(name) {
            return Err(ConfigStoreError::AlreadyExists(name.to_string()));
        }

        doc.api_urls.insert(name.to_string(), endpoint);
        self.persist(&doc).await?;
        info!("Added endpoint '{}'", name);
        Ok(())
    }

    pub async fn update_endpoint(
        &self,
        name: &str,
        endpoint: Endpoint,
    ) -> Result<(), ConfigStoreError> {
        let mut doc = self.load().await?;
        let Some(slot) = doc.api_urls.get_mut(name) else {
            return Err(ConfigStoreError::NotFound(name.to_string()));
        };

        *slot = endpoint;
        self.persist(&doc).await?;
        info!("Updated endpoint '{}'", name);
        Ok(())
    }

    pub async fn delete_endpoint(&self, name: &str) -> Result<(), ConfigStoreError> {
        let mut doc = self.load().await?;
        if doc.api_urls.remove(name).is_none() {
            return Err(ConfigStoreError::NotFound(name.to_string()));
        }

        self.persist(&doc).await?;
        info!("Deleted endpoint '{}'", name);
        Ok(())
    }

    pub async fn set_base_tag(&self, base_tag: &str) -> Result<(), ConfigStoreError> {
        let mut doc = self.load().await?;
        doc.base_tag = base_tag.trim().to_string();
        self.persist(&doc).await
    }

    async fn persist(&self, doc: &ConfigDocument) -> Result<(), ConfigStoreError> {
        if self.save_config(doc).await {
            Ok(())
        } else {
            Err(ConfigStoreError::SaveFailed)
        }
    }
}

/// Endpoint names become a single path segment, so they must not collide
/// with the router's own paths or look like static assets.
pub fn validate_endpoint_name(name: &str) -> Result<(), ConfigStoreError> {
    let trimmed = name.trim();
    if trimmed.is_empty()
        || trimmed != name
        || name.contains('/')
        || crate::forward::is_reserved_segment(name)
    {
        return Err(ConfigStoreError::InvalidName(name.to_string()));
    }
    Ok(())
}
