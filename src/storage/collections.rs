use super::{BACKGROUND_DIR, CollectionStore, is_reserved_collection_name, is_valid_collection_name};
use serde::Serialize;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Serialize)]
pub struct CollectionSummary {
    pub name: String,
    pub local_count: usize,
    pub external_count: usize,
    pub total: usize,
    pub has_content: bool,
    pub cover: Option<String>,
}

impl CollectionStore {
    /// Sorted names of every collection directory.
    pub async fn list_collections(&self) -> Vec<String> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Failed to read picture directory {:?}: {}", self.root, e);
                return Vec::new();
            }
        };

        let mut names = Vec::new();
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    error!("Failed to read entry in {:?}: {}", self.root, e);
                    break;
                }
            };

            let Ok(file_type) = entry.file_type().await else {
                continue;
            };
            if !file_type.is_dir() {
                continue;
            }

            let name = entry.file_name().to_string_lossy().to_string();
            if name.eq_ignore_ascii_case(BACKGROUND_DIR) {
                continue;
            }
            names.push(name);
        }

        names.sort();
        names
    }

    pub async fn collection_exists(&self, name: &str) -> bool {
        if name.eq_ignore_ascii_case(BACKGROUND_DIR) {
            return false;
        }
        self.existing_dir(name).await.is_some()
    }

    /// Creates an empty collection. `false` if the name is not acceptable or
    /// reserved, the directory already exists, or creation fails.
    pub async fn create_collection(&self, name: &str) -> bool {
        if !is_valid_collection_name(name)
            || name.eq_ignore_ascii_case(BACKGROUND_DIR)
            || is_reserved_collection_name(name)
        {
            debug!("Refusing to create collection with invalid name {:?}", name);
            return false;
        }
        let Some(dir) = self.collection_dir(name) else {
            return false;
        };

        if tokio::fs::try_exists(&dir).await.unwrap_or(true) {
            return false;
        }

        match tokio::fs::create_dir_all(&dir).await {
            Ok(()) => {
                info!("Created collection '{}'", name);
                true
            }
            Err(e) => {
                error!("Failed to create collection directory {:?}: {}", dir, e);
                false
            }
        }
    }

    /// Removes the collection directory with everything in it.
    pub async fn delete_collection(&self, name: &str) -> bool {
        if !self.collection_exists(name).await {
            return false;
        }
        let Some(dir) = self.collection_dir(name) else {
            return false;
        };

        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => {
                info!("Deleted collection '{}'", name);
                true
            }
            Err(e) => {
                error!("Failed to delete collection directory {:?}: {}", dir, e);
                false
            }
        }
    }

    /// Counts for one collection. With `with_cover` the cover is resolved too,
    /// which may download the first external link.
    pub async fn collection_summary(
        &self,
        name: &str,
        with_cover: bool,
    ) -> Option<CollectionSummary> {
        if !self.collection_exists(name).await {
            return None;
        }

        let local_count = self.list_local_images(name).await.len();
        let external_count = self.list_external_links(name).await.len();
        let total = local_count + external_count;
        let cover = if with_cover {
            self.get_cover(name).await
        } else {
            None
        };

        Some(CollectionSummary {
            name: name.to_string(),
            local_count,
            external_count,
            total,
            has_content: total > 0,
            cover,
        })
    }
}
