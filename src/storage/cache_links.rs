use super::{CollectionStore, StorageError, cover::find_file_with_stem};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, error, info, warn};

const MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheReport {
    pub downloaded: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl CollectionStore {
    /// Downloads every external link of a collection into its directory.
    ///
    /// Links are fetched one at a time with a pause in between. A link whose
    /// file already exists is skipped; timeouts are retried up to three
    /// attempts, other failures are counted and the run moves on. Returns
    /// `None` if the collection does not exist.
    pub async fn cache_external_links(&self, name: &str) -> Option<CacheReport> {
        let dir = self.existing_dir(name).await?;
        let links = self.list_external_links(name).await;
        let mut report = CacheReport::default();

        info!(
            "Caching {} external link(s) for collection '{}'",
            links.len(),
            name
        );

        for (index, link) in links.iter().enumerate() {
            let stem = cached_link_stem(link);
            if let Some(existing) = find_file_with_stem(&dir, &stem).await {
                debug!("Link already cached as '{}': {}", existing, link);
                report.skipped += 1;
                continue;
            }

            if index > 0 && !self.link_pause.is_zero() {
                tokio::time::sleep(self.link_pause).await;
            }

            match self.download_with_retry(link, &dir, &stem).await {
                Ok(filename) => {
                    debug!("Cached {} as '{}'", link, filename);
                    report.downloaded += 1;
                }
                Err(e) => {
                    error!("Failed to cache {}: {}", link, e);
                    report.failed += 1;
                }
            }
        }

        info!(
            "Finished caching collection '{}': {} downloaded, {} skipped, {} failed",
            name, report.downloaded, report.skipped, report.failed
        );
        Some(report)
    }

    async fn download_with_retry(
        &self,
        link: &str,
        dir: &std::path::Path,
        stem: &str,
    ) -> Result<String, StorageError> {
        let mut attempt = 1;
        loop {
            match self.download_into(link, dir, stem).await {
                Ok(filename) => return Ok(filename),
                Err(e) if e.is_timeout() && attempt < MAX_ATTEMPTS => {
                    warn!(
                        "Timeout fetching {} (attempt {}/{}), retrying",
                        link, attempt, MAX_ATTEMPTS
                    );
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Stable file stem for a cached link so repeated runs find earlier downloads.
pub(crate) fn cached_link_stem(link: &str) -> String {
    let digest = Sha256::digest(link.as_bytes());
    let hex: String = digest[..8].iter().map(|b| format!("{:02x}", b)).collect();
    format!("link_{}", hex)
}
