use super::{Dispatch, dispatch, proxy_request, redirect_found};
use crate::{AppState, resolver, static_files};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::collections::HashMap;
use tracing::debug;

/// `GET /{segment}`: endpoint forwarding first, then random collection
/// serving.
pub async fn forward_handler(
    State(app_state): State<AppState>,
    Path(segment): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let plan = dispatch(
        &segment,
        &query,
        &app_state.config_store,
        &app_state.collections,
    )
    .await;

    match plan {
        Dispatch::NotFound => (StatusCode::NOT_FOUND, "Not Found").into_response(),
        Dispatch::Collection => serve_random_resource(&app_state, &segment).await,
        Dispatch::Redirect(target) | Dispatch::InternalRedirect(target) => {
            redirect_found(&target)
        }
        Dispatch::Proxy { target, settings } => {
            proxy_request(&app_state.http, &target, &settings).await
        }
        Dispatch::Rejected(e) => e.into_response(),
    }
}

async fn serve_random_resource(app_state: &AppState, collection: &str) -> Response {
    match resolver::pick_random(&app_state.collections, collection).await {
        Some(resolver::Resource::Local(path)) => {
            debug!("Serving {:?} from '{}'", path, collection);
            static_files::serve_file(&path).await
        }
        Some(resolver::Resource::External(link)) => {
            debug!("Redirecting '{}' to {}", collection, link);
            redirect_found(&link)
        }
        None => (StatusCode::NOT_FOUND, "Collection is empty").into_response(),
    }
}
