use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

use crate::{
    AppState,
    config_store::{ConfigDocument, ConfigStoreError, Endpoint},
    resolver::{self, ResourceEntry},
    storage::CollectionSummary,
};

#[derive(Deserialize)]
pub struct CreateEndpointRequest {
    pub name: String,
    #[serde(flatten)]
    pub endpoint: Endpoint,
}

#[derive(Deserialize)]
pub struct BaseTagRequest {
    #[serde(alias = "baseTag")]
    pub base_tag: String,
}

#[derive(Serialize)]
pub struct ApiResponse {
    success: bool,
    message: String,
}

impl ApiResponse {
    fn ok(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.into(),
        })
    }
}

#[derive(Serialize)]
pub struct CollectionListResponse {
    collections: Vec<CollectionSummary>,
}

#[derive(Serialize)]
pub struct CollectionResourcesResponse {
    name: String,
    resources: Vec<ResourceEntry>,
}

pub async fn get_config(State(app_state): State<AppState>) -> Json<ConfigDocument> {
    Json(app_state.config_store.get_config().await)
}

pub async fn list_endpoints(State(app_state): State<AppState>) -> Json<BTreeMap<String, Endpoint>> {
    Json(app_state.config_store.list_endpoints().await)
}

pub async fn create_endpoint(
    State(app_state): State<AppState>,
    Json(request): Json<CreateEndpointRequest>,
) -> Result<impl IntoResponse, ConfigStoreError> {
    app_state
        .config_store
        .add_endpoint(&request.name, request.endpoint)
        .await?;

    info!("Endpoint '{}' created via API", request.name);
    Ok((
        StatusCode::CREATED,
        ApiResponse::ok(format!("Endpoint '{}' created", request.name)),
    ))
}

pub async fn update_endpoint(
    State(app_state): State<AppState>,
    Path(name): Path<String>,
    Json(endpoint): Json<Endpoint>,
) -> Result<Json<ApiResponse>, ConfigStoreError> {
    app_state.config_store.update_endpoint(&name, endpoint).await?;
    Ok(ApiResponse::ok(format!("Endpoint '{}' updated", name)))
}

pub async fn delete_endpoint(
    State(app_state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ApiResponse>, ConfigStoreError> {
    app_state.config_store.delete_endpoint(&name).await?;
    Ok(ApiResponse::ok(format!("Endpoint '{}' deleted", name)))
}

pub async fn set_base_tag(
    State(app_state): State<AppState>,
    Json(request): Json<BaseTagRequest>,
) -> Result<Json<ApiResponse>, ConfigStoreError> {
    app_state.config_store.set_base_tag(&request.base_tag).await?;
    Ok(ApiResponse::ok("Base tag updated"))
}

/// Public listing of every collection with its counts.
pub async fn list_collections(State(app_state): State<AppState>) -> Json<CollectionListResponse> {
    let store = &app_state.collections;
    let mut collections = Vec::new();
    for name in store.list_collections().await {
        if let Some(summary) = store.collection_summary(&name, false).await {
            collections.push(summary);
        }
    }
    Json(CollectionListResponse { collections })
}

pub async fn collection_resources(
    State(app_state): State<AppState>,
    Path(name): Path<String>,
) -> Response {
    if !app_state.collections.collection_exists(&name).await {
        return (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": format!("Collection '{}' not found", name) })),
        )
            .into_response();
    }

    let resources = resolver::list_resources(&app_state.collections, &name).await;
    Json(CollectionResourcesResponse { name, resources }).into_response()
}
