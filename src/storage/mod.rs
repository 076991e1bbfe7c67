// Collection store - one directory per collection under the picture root
mod cache_links;
mod collections;
mod cover;
mod error;
mod images;
mod links;

pub use cache_links::CacheReport;
pub use collections::CollectionSummary;
pub use links::parse_links;
pub use error::StorageError;

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Extensions (lowercase) recognised as local images.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "webp", "psd", "tif"];

/// Directory under the picture root that holds background assets rather than
/// a collection.
pub const BACKGROUND_DIR: &str = "background";

/// Stem of the lazily downloaded cover. Sanitized upload names never start
/// with an underscore, so this cannot clash with an uploaded file.
pub const COVER_SENTINEL_STEM: &str = "_cover_cache";

const DEFAULT_DOWNLOAD_EXTENSION: &str = "jpg";

#[derive(Clone)]
pub struct CollectionStore {
    root: PathBuf,
    http: reqwest::Client,
    link_pause: Duration,
    download_timeout: Duration,
}

impl CollectionStore {
    pub fn new(root: PathBuf, http: reqwest::Client) -> Self {
        Self {
            root,
            http,
            link_pause: Duration::from_millis(500),
            download_timeout: cover::DOWNLOAD_TIMEOUT,
        }
    }

    /// Delay between consecutive downloads in [`CollectionStore::cache_external_links`].
    pub fn with_link_pause(mut self, pause: Duration) -> Self {
        self.link_pause = pause;
        self
    }

    /// Per-request timeout for cover and link downloads.
    pub fn with_download_timeout(mut self, timeout: Duration) -> Self {
        self.download_timeout = timeout;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn background_dir(&self) -> PathBuf {
        self.root.join(BACKGROUND_DIR)
    }

    /// Directory for `name`, or `None` when the name could escape the root.
    pub(crate) fn collection_dir(&self, name: &str) -> Option<PathBuf> {
        is_safe_segment(name).then(|| self.root.join(name))
    }

    pub(crate) fn links_file(&self, name: &str) -> Option<PathBuf> {
        self.collection_dir(name)
            .map(|dir| dir.join(format!("{}.txt", name)))
    }

    /// Directory for `name` if the collection exists.
    pub(crate) async fn existing_dir(&self, name: &str) -> Option<PathBuf> {
        let dir = self.collection_dir(name)?;
        match tokio::fs::metadata(&dir).await {
            Ok(metadata) if metadata.is_dir() => Some(dir),
            _ => None,
        }
    }
}

/// Collection names accepted at creation time: ASCII letters, digits and
/// underscores.
pub fn is_valid_collection_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Names the router owns. A collection called like this could never be
/// served from `/{name}`.
pub fn is_reserved_collection_name(name: &str) -> bool {
    crate::forward::RESERVED_PATHS.contains(&name)
}

pub fn is_image_file(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Reduces an uploaded file name to a single safe path component: path
/// separators become underscores, characters outside `[A-Za-z0-9._-]` are
/// dropped, runs of dots collapse to one and leading or trailing dots and
/// underscores are stripped.
pub fn sanitize_filename(name: &str) -> Option<String> {
    let spaced: String = name
        .chars()
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();
    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");
    let mut filtered: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();
    while filtered.contains("..") {
        filtered = filtered.replace("..", ".");
    }
    let trimmed = filtered.trim_matches(|c| c == '.' || c == '_');

    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Maps a `Content-Type` header to one of the allow-listed extensions.
pub fn extension_for_content_type(content_type: &str) -> Option<&'static str> {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    match mime.as_str() {
        "image/jpeg" | "image/jpg" | "image/pjpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        "image/bmp" | "image/x-ms-bmp" => Some("bmp"),
        "image/tiff" => Some("tif"),
        _ => None,
    }
}

pub(crate) fn is_safe_segment(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && !name.contains("..")
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains('\0')
}
