use super::{Flash, collection_page};
use crate::{AppState, storage};
use axum::{
    Form,
    extract::{Multipart, Path, State},
    response::Response,
};
use serde::Deserialize;
use tracing::{info, warn};

const ADMIN_HOME: &str = "/admin";

#[derive(Debug, Deserialize)]
pub struct CollectionForm {
    #[serde(default)]
    collection_name: String,
}

#[derive(Debug, Deserialize)]
pub struct LinksForm {
    #[serde(default)]
    links: String,
}

#[derive(Debug, Deserialize)]
pub struct ImageForm {
    #[serde(default)]
    image_name: String,
}

#[derive(Debug, Deserialize)]
pub struct LinkForm {
    #[serde(default)]
    link: String,
}

pub async fn create_collection(
    State(app_state): State<AppState>,
    Form(form): Form<CollectionForm>,
) -> Response {
    let name = form.collection_name.trim();

    let flash = if name.is_empty() {
        Flash::danger("Collection name cannot be empty")
    } else if !storage::is_valid_collection_name(name) {
        Flash::danger("Collection names may only contain letters, digits and underscores")
    } else if storage::is_reserved_collection_name(name) {
        Flash::danger(format!("\"{}\" is reserved by the application", name))
    } else if app_state.collections.collection_exists(name).await {
        Flash::warning(format!("Collection \"{}\" already exists", name))
    } else if app_state.collections.create_collection(name).await {
        Flash::success(format!("Collection \"{}\" created", name))
    } else {
        Flash::danger(format!("Failed to create collection \"{}\"", name))
    };

    flash.redirect(ADMIN_HOME)
}

pub async fn delete_collection(
    State(app_state): State<AppState>,
    Form(form): Form<CollectionForm>,
) -> Response {
    let name = form.collection_name.trim();

    let flash = if name.is_empty() {
        Flash::danger("Missing collection name")
    } else if app_state.collections.delete_collection(name).await {
        Flash::success(format!("Collection \"{}\" deleted", name))
    } else {
        Flash::danger(format!("Failed to delete collection \"{}\"", name))
    };

    flash.redirect(ADMIN_HOME)
}

/// Accepts any number of `images` (or `images[]`) file fields. Every file is
/// judged on its own; a rejected file does not stop the rest of the batch.
pub async fn upload_images(
    State(app_state): State<AppState>,
    Path(name): Path<String>,
    mut multipart: Multipart,
) -> Response {
    let store = &app_state.collections;
    if !store.collection_exists(&name).await {
        return Flash::danger(format!("Collection \"{}\" does not exist", name))
            .redirect(ADMIN_HOME);
    }

    let max_bytes = app_state.settings.storage.max_upload_bytes;
    let mut saved = 0usize;
    let mut problems = Vec::new();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                warn!("Upload to '{}' aborted: {}", name, e);
                problems.push(format!("upload interrupted ({})", e.body_text()));
                break;
            }
        };

        if !matches!(field.name(), Some("images" | "images[]")) {
            continue;
        }
        let Some(file_name) = field
            .file_name()
            .map(str::to_string)
            .filter(|n| !n.is_empty())
        else {
            continue;
        };

        if !storage::is_image_file(&file_name) {
            problems.push(format!("\"{}\" is not an allowed image type", file_name));
            continue;
        }

        let bytes = match field.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Failed to read upload {:?}: {}", file_name, e);
                problems.push(format!("\"{}\" could not be read", file_name));
                continue;
            }
        };

        if bytes.is_empty() {
            problems.push(format!("\"{}\" is empty", file_name));
        } else if bytes.len() > max_bytes {
            problems.push(format!("\"{}\" exceeds the upload limit", file_name));
        } else if store.add_local_image(&name, &bytes, &file_name).await.is_some() {
            saved += 1;
        } else {
            problems.push(format!("\"{}\" could not be saved", file_name));
        }
    }

    info!(
        "Upload to '{}': {} saved, {} rejected",
        name,
        saved,
        problems.len()
    );

    upload_flash(saved, &problems).redirect(&collection_page(&name))
}

fn upload_flash(saved: usize, problems: &[String]) -> Flash {
    match (saved, problems.is_empty()) {
        (0, true) => Flash::info("No images were uploaded"),
        (_, true) => Flash::success(format!("Uploaded {} image(s)", saved)),
        (0, false) => Flash::danger(format!("No images uploaded: {}", problems.join("; "))),
        (_, false) => Flash::warning(format!(
            "Uploaded {} image(s); {} failed: {}",
            saved,
            problems.len(),
            problems.join("; ")
        )),
    }
}

pub async fn add_links(
    State(app_state): State<AppState>,
    Path(name): Path<String>,
    Form(form): Form<LinksForm>,
) -> Response {
    let candidates = storage::parse_links(&form.links);
    if candidates.is_empty() {
        return Flash::warning("Enter at least one link").redirect(&collection_page(&name));
    }

    let accepted: Vec<&String> = candidates
        .iter()
        .filter(|link| link.starts_with("http://") || link.starts_with("https://"))
        .collect();
    if accepted.is_empty() {
        return Flash::warning("No valid links: every link must start with http:// or https://")
            .redirect(&collection_page(&name));
    }

    let added = app_state.collections.add_external_links(&name, &accepted).await;
    let skipped = candidates.len() - accepted.len();

    let flash = match (added, skipped) {
        (0, _) => Flash::danger("Failed to add links"),
        (added, 0) => Flash::success(format!("Added {} link(s)", added)),
        (added, skipped) => Flash::warning(format!(
            "Added {} link(s), ignored {} without http:// or https://",
            added, skipped
        )),
    };
    flash.redirect(&collection_page(&name))
}

pub async fn delete_image(
    State(app_state): State<AppState>,
    Path(name): Path<String>,
    Form(form): Form<ImageForm>,
) -> Response {
    let flash = if form.image_name.is_empty() {
        Flash::danger("Missing image name")
    } else if app_state
        .collections
        .delete_local_image(&name, &form.image_name)
        .await
    {
        Flash::success(format!("Image \"{}\" deleted", form.image_name))
    } else {
        Flash::danger(format!("Failed to delete image \"{}\"", form.image_name))
    };

    flash.redirect(&collection_page(&name))
}

pub async fn delete_link(
    State(app_state): State<AppState>,
    Path(name): Path<String>,
    Form(form): Form<LinkForm>,
) -> Response {
    let link = form.link.trim();
    let flash = if link.is_empty() {
        Flash::danger("Missing link")
    } else if app_state.collections.delete_external_link(&name, link).await {
        Flash::success("Link deleted")
    } else {
        Flash::danger("Failed to delete link")
    };

    flash.redirect(&collection_page(&name))
}

pub async fn cache_links(State(app_state): State<AppState>, Path(name): Path<String>) -> Response {
    let flash = match app_state.collections.cache_external_links(&name).await {
        None => Flash::danger(format!("Collection \"{}\" does not exist", name)),
        Some(report) if report.failed == 0 => Flash::success(format!(
            "Cached {} link(s), {} already cached",
            report.downloaded, report.skipped
        )),
        Some(report) => Flash::warning(format!(
            "Cached {} link(s), {} already cached, {} failed",
            report.downloaded, report.skipped, report.failed
        )),
    };

    flash.redirect(&collection_page(&name))
}
