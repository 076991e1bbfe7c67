use super::{COVER_SENTINEL_STEM, CollectionStore, is_image_file, is_safe_segment, sanitize_filename};
use std::path::PathBuf;
use tracing::{debug, error, info, warn};

impl CollectionStore {
    /// File names of the collection's local images. Order follows the
    /// directory listing and is not stable.
    pub async fn list_local_images(&self, name: &str) -> Vec<String> {
        let Some(dir) = self.existing_dir(name).await else {
            return Vec::new();
        };

        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Failed to read collection directory {:?}: {}", dir, e);
                return Vec::new();
            }
        };

        let mut images = Vec::new();
        while let Ok(Some(entry)) = entries.next_entry().await {
            let file_name = entry.file_name().to_string_lossy().to_string();
            if file_name.starts_with(COVER_SENTINEL_STEM) || !is_image_file(&file_name) {
                continue;
            }
            if let Ok(file_type) = entry.file_type().await
                && file_type.is_file()
            {
                images.push(file_name);
            }
        }

        images
    }

    /// Absolute path of an image stored in a collection, if it exists. The
    /// cached cover counts as an image here.
    pub async fn local_image_path(&self, name: &str, filename: &str) -> Option<PathBuf> {
        if !is_safe_segment(filename) || !is_image_file(filename) {
            return None;
        }
        let path = self.existing_dir(name).await?.join(filename);
        match tokio::fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() => Some(path),
            _ => None,
        }
    }

    /// Stores an uploaded image under its sanitized name, replacing any file
    /// of the same name. Returns the stored name.
    pub async fn add_local_image(
        &self,
        name: &str,
        bytes: &[u8],
        suggested_filename: &str,
    ) -> Option<String> {
        let dir = self.existing_dir(name).await?;

        let Some(filename) = sanitize_filename(suggested_filename) else {
            warn!(
                "Upload name {:?} for collection '{}' is empty after sanitizing",
                suggested_filename, name
            );
            return None;
        };

        let path = dir.join(&filename);
        debug!("Saving image to {:?}", path);
        match tokio::fs::write(&path, bytes).await {
            Ok(()) => {
                info!("Saved image '{}' to collection '{}'", filename, name);
                Some(filename)
            }
            Err(e) => {
                error!("Failed to save image to {:?}: {}", path, e);
                None
            }
        }
    }

    pub async fn delete_local_image(&self, name: &str, filename: &str) -> bool {
        let Some(path) = self.local_image_path(name, filename).await else {
            return false;
        };

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                info!("Deleted image '{}' from collection '{}'", filename, name);
                true
            }
            Err(e) => {
                error!("Failed to delete image {:?}: {}", path, e);
                false
            }
        }
    }
}
