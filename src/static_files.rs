use axum::{
    body::Body,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use std::path::{Component, Path, PathBuf};
use std::time::UNIX_EPOCH;
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::{debug, error};

/// Serves files below one root directory.
#[derive(Clone)]
pub struct StaticFileHandler {
    pub static_dir: PathBuf,
}

impl StaticFileHandler {
    pub fn new(static_dir: PathBuf) -> Self {
        Self { static_dir }
    }

    pub async fn serve(&self, path: &str) -> Response {
        match resolve_under(&self.static_dir, path) {
            Some(file_path) => serve_file(&file_path).await,
            None => {
                error!("Path traversal attempt: {:?}", path);
                (StatusCode::FORBIDDEN, "Forbidden").into_response()
            }
        }
    }
}

/// Joins a client supplied relative path onto `root`. Only plain path
/// components are accepted, so the result can never leave `root`.
pub fn resolve_under(root: &Path, relative: &str) -> Option<PathBuf> {
    let relative = Path::new(relative.trim_start_matches('/'));
    let mut resolved = root.to_path_buf();
    let mut depth = 0;

    for component in relative.components() {
        match component {
            Component::Normal(part) => {
                resolved.push(part);
                depth += 1;
            }
            Component::CurDir => {}
            _ => return None,
        }
    }

    (depth > 0).then_some(resolved)
}

/// Streams one file with a guessed content type and cache validators.
pub async fn serve_file(file_path: &Path) -> Response {
    debug!("Attempting to serve file: {:?}", file_path);

    let metadata = match tokio::fs::metadata(file_path).await {
        Ok(m) if m.is_file() => m,
        Ok(_) => {
            debug!("Not a regular file: {:?}", file_path);
            return (StatusCode::NOT_FOUND, "File not found").into_response();
        }
        Err(e) => {
            debug!("Failed to get metadata for {:?}: {}", file_path, e);
            return (StatusCode::NOT_FOUND, "File not found").into_response();
        }
    };

    let file = match File::open(file_path).await {
        Ok(file) => file,
        Err(e) => {
            debug!("Failed to open file {:?}: {}", file_path, e);
            return (StatusCode::NOT_FOUND, "File not found").into_response();
        }
    };

    let content_type = mime_guess::from_path(file_path)
        .first_or_octet_stream()
        .to_string();

    // Collection contents change under the same name, so images are only
    // cached briefly.
    let cache_control = if content_type.starts_with("text/css")
        || content_type.starts_with("application/javascript")
        || content_type.starts_with("text/javascript")
    {
        "public, max-age=300, must-revalidate"
    } else if content_type.starts_with("image/") {
        "public, max-age=60"
    } else {
        "public, max-age=3600"
    };

    let mut response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CACHE_CONTROL, cache_control)
        .header(header::CONTENT_LENGTH, metadata.len());

    if let Ok(modified) = metadata.modified()
        && let Ok(duration) = modified.duration_since(UNIX_EPOCH)
    {
        response = response.header(header::LAST_MODIFIED, httpdate::fmt_http_date(modified));
        let etag = format!("\"{}-{}\"", duration.as_secs(), metadata.len());
        response = response.header(header::ETAG, etag);
    }

    let body = Body::from_stream(ReaderStream::new(file));
    response.body(body).unwrap_or_else(|e| {
        error!("Failed to build file response for {:?}: {}", file_path, e);
        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    })
}
