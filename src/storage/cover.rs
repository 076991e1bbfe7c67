use super::{
    COVER_SENTINEL_STEM, CollectionStore, DEFAULT_DOWNLOAD_EXTENSION, StorageError,
    extension_for_content_type,
};
use reqwest::header::CONTENT_TYPE;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

pub(crate) const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);

impl CollectionStore {
    /// Cover image file name for a collection.
    ///
    /// Local images win: the first one in name order is used. A collection
    /// with only external links gets its first link downloaded once and
    /// cached under [`COVER_SENTINEL_STEM`]; later calls reuse that file.
    pub async fn get_cover(&self, name: &str) -> Option<String> {
        let dir = self.existing_dir(name).await?;

        let mut images = self.list_local_images(name).await;
        images.sort();
        if let Some(first) = images.into_iter().next() {
            return Some(first);
        }

        if let Some(cached) = find_file_with_stem(&dir, COVER_SENTINEL_STEM).await {
            debug!("Using cached cover '{}' for collection '{}'", cached, name);
            return Some(cached);
        }

        let links = self.list_external_links(name).await;
        let first_link = links.first()?;

        match self.download_into(first_link, &dir, COVER_SENTINEL_STEM).await {
            Ok(filename) => {
                info!("Cached cover for collection '{}' as '{}'", name, filename);
                Some(filename)
            }
            Err(e) => {
                warn!(
                    "Failed to download cover for collection '{}' from {}: {}",
                    name, first_link, e
                );
                None
            }
        }
    }

    /// Downloads `url` into `dir` as `<stem>.<ext>`, the extension coming from
    /// the response content type.
    pub(crate) async fn download_into(
        &self,
        url: &str,
        dir: &Path,
        stem: &str,
    ) -> Result<String, StorageError> {
        let response = self
            .http
            .get(url)
            .timeout(self.download_timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(StorageError::UpstreamStatus(status.as_u16()));
        }

        let extension = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(extension_for_content_type)
            .unwrap_or(DEFAULT_DOWNLOAD_EXTENSION);

        let bytes = response.bytes().await?;
        let filename = format!("{}.{}", stem, extension);
        tokio::fs::write(dir.join(&filename), &bytes).await?;
        Ok(filename)
    }
}

/// First file in `dir` named `<stem>.<anything>`.
pub(crate) async fn find_file_with_stem(dir: &Path, stem: &str) -> Option<String> {
    let prefix = format!("{}.", stem);
    let mut entries = tokio::fs::read_dir(dir).await.ok()?;
    while let Ok(Some(entry)) = entries.next_entry().await {
        let file_name = entry.file_name().to_string_lossy().to_string();
        if file_name.starts_with(&prefix) {
            return Some(file_name);
        }
    }
    None
}
