// Admin pages - collection management and runtime display settings
mod collections;
mod flash;
mod settings;

pub use collections::*;
pub use flash::{Flash, FlashLevel};
pub use settings::*;

use crate::{AppState, pages, resolver};
use axum::{
    extract::{Path, Query, State},
    response::Response,
};
use tracing::debug;

pub async fn dashboard(State(app_state): State<AppState>, Query(flash): Query<Flash>) -> Response {
    let store = &app_state.collections;

    let mut collections = Vec::new();
    for name in store.list_collections().await {
        if let Some(summary) = store.collection_summary(&name, false).await {
            collections.push(summary);
        }
    }
    debug!("Admin dashboard with {} collection(s)", collections.len());

    let doc = app_state.config_store.get_config().await;
    let max_upload_mb = app_state.settings.storage.max_upload_bytes / (1024 * 1024);

    let mut globals = app_state.base_globals(true).await;
    globals.extend(liquid::object!({
        "collections": collections,
        "endpoint_groups": pages::group_endpoints(&doc),
        "base_tag": doc.base_tag,
        "max_upload_mb": max_upload_mb,
        "flash": flash.for_template(),
    }));

    pages::render(&app_state, "admin.html.liquid", globals).await
}

pub async fn manage_collection(
    State(app_state): State<AppState>,
    Path(name): Path<String>,
    Query(flash): Query<Flash>,
) -> Response {
    if !app_state.collections.collection_exists(&name).await {
        return Flash::danger(format!("Collection \"{}\" does not exist", name))
            .redirect("/admin");
    }

    let images: Vec<_> = resolver::list_resources(&app_state.collections, &name)
        .await
        .into_iter()
        .filter(|entry| entry.kind == "local")
        .collect();
    let links = app_state.collections.list_external_links(&name).await;

    let mut globals = app_state.base_globals(true).await;
    globals.extend(liquid::object!({
        "collection_name": name,
        "images": images,
        "links": links,
        "flash": flash.for_template(),
    }));

    pages::render(&app_state, "manage_collection.html.liquid", globals).await
}

/// Admin page for one collection.
pub(crate) fn collection_page(name: &str) -> String {
    format!("/admin/collection/{}", urlencoding::encode(name))
}
