//! Public HTML pages and the file routes they link to.

use crate::{
    AppState, config_store::ConfigDocument, login, resolver, static_files,
    storage::CollectionSummary,
};
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

const DEFAULT_GROUP: &str = "General";

#[derive(Debug, Serialize)]
struct CollectionCard {
    #[serde(flatten)]
    summary: CollectionSummary,
    cover_url: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct EndpointGroup {
    pub group: String,
    pub endpoints: Vec<EndpointCard>,
}

#[derive(Debug, Serialize)]
pub(crate) struct EndpointCard {
    pub name: String,
    pub path: String,
    pub description: String,
    pub method: String,
    pub enabled: bool,
}

/// Endpoints bucketed by their `group`, groups and names in sorted order.
pub(crate) fn group_endpoints(doc: &ConfigDocument) -> Vec<EndpointGroup> {
    let mut groups: BTreeMap<&str, Vec<EndpointCard>> = BTreeMap::new();
    for (name, endpoint) in &doc.api_urls {
        let group = match endpoint.group.trim() {
            "" => DEFAULT_GROUP,
            group => group,
        };
        groups.entry(group).or_default().push(EndpointCard {
            name: name.clone(),
            path: format!("/{}", urlencoding::encode(name)),
            description: endpoint.description.clone(),
            method: endpoint.method.map_or("", |m| m.as_str()).to_string(),
            enabled: endpoint.method.is_some(),
        });
    }

    groups
        .into_iter()
        .map(|(group, endpoints)| EndpointGroup {
            group: group.to_string(),
            endpoints,
        })
        .collect()
}

pub async fn index(State(app_state): State<AppState>, headers: HeaderMap) -> Response {
    let store = &app_state.collections;

    let mut cards = Vec::new();
    for name in store.list_collections().await {
        if let Some(summary) = store.collection_summary(&name, true).await {
            let cover_url = summary
                .cover
                .as_deref()
                .map(|cover| resolver::picture_url(&name, cover))
                .unwrap_or_default();
            cards.push(CollectionCard { summary, cover_url });
        }
    }

    let doc = app_state.config_store.get_config().await;
    let is_admin = login::is_admin(&headers, &app_state.settings.app.session_secret);

    let mut globals = app_state.base_globals(is_admin).await;
    globals.extend(liquid::object!({
        "collections": cards,
        "endpoint_groups": group_endpoints(&doc),
    }));

    render(&app_state, "index.html.liquid", globals).await
}

pub async fn view_collection(
    State(app_state): State<AppState>,
    Path(collection): Path<String>,
    headers: HeaderMap,
) -> Response {
    if !app_state.collections.collection_exists(&collection).await {
        return (StatusCode::NOT_FOUND, "Collection not found").into_response();
    }

    let resources = resolver::list_resources(&app_state.collections, &collection).await;
    let (images, links): (Vec<_>, Vec<_>) = resources
        .into_iter()
        .partition(|entry| entry.kind == "local");

    let is_admin = login::is_admin(&headers, &app_state.settings.app.session_secret);
    let mut globals = app_state.base_globals(is_admin).await;
    globals.extend(liquid::object!({
        "collection_name": collection,
        "random_url": format!("/{}", urlencoding::encode(&collection)),
        "images": images,
        "links": links,
    }));

    render(&app_state, "collection.html.liquid", globals).await
}

pub async fn picture(
    State(app_state): State<AppState>,
    Path((collection, filename)): Path<(String, String)>,
) -> Response {
    match app_state
        .collections
        .local_image_path(&collection, &filename)
        .await
    {
        Some(path) => static_files::serve_file(&path).await,
        None => {
            debug!("No picture '{}' in '{}'", filename, collection);
            (StatusCode::NOT_FOUND, "File not found").into_response()
        }
    }
}

pub async fn project_background(
    State(app_state): State<AppState>,
    Path(filename): Path<String>,
) -> Response {
    let background_dir = app_state.collections.background_dir();
    match static_files::resolve_under(&background_dir, &filename) {
        Some(path) => static_files::serve_file(&path).await,
        None => {
            debug!("Rejected background path {:?}", filename);
            (StatusCode::NOT_FOUND, "File not found").into_response()
        }
    }
}

pub(crate) async fn render(
    app_state: &AppState,
    template: &str,
    globals: liquid::Object,
) -> Response {
    match app_state.template_engine.render_page(template, globals).await {
        Ok(html) => html.into_response(),
        Err(status) => status.into_response(),
    }
}
