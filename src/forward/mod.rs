// Forward engine - decides what a single path segment refers to
mod error;
mod handlers;
mod params;
mod proxy;

pub use error::ForwardError;
pub use handlers::forward_handler;
pub use params::{append_query, resolve_params};
pub use proxy::{extract_by_path, is_image_url, proxy_request};

use crate::config_store::{ConfigStore, Endpoint, Method, ProxySettings, UrlConstruction};
use crate::storage::CollectionStore;
use axum::{
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use std::collections::HashMap;
use tracing::{debug, error};

/// Top-level paths owned by the application itself.
pub const RESERVED_PATHS: &[&str] = &[
    "config",
    "admin",
    "admin-login",
    "admin-logout",
    "api",
    "css",
    "js",
    "picture",
    "view",
    "project_bg",
    "static",
];

const FAVICON: &str = "favicon.ico";
const DEFAULT_DRAW_MODEL: &str = "flux";
const DEFAULT_IMAGE_FIELD: &str = "url";

/// Segments that are never looked up as endpoints or collections: anything
/// with a dot (asset-like), the favicon and the reserved system paths.
pub fn is_reserved_segment(segment: &str) -> bool {
    segment.contains('.') || segment == FAVICON || RESERVED_PATHS.contains(&segment)
}

/// Outcome of resolving one path segment.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    NotFound,
    /// Not an endpoint, but an existing collection: serve from it.
    Collection,
    /// 302 to an external URL.
    Redirect(String),
    /// 302 to another path on this server.
    InternalRedirect(String),
    Proxy {
        target: String,
        settings: ProxySettings,
    },
    Rejected(ForwardError),
}

pub async fn dispatch(
    segment: &str,
    query: &HashMap<String, String>,
    config_store: &ConfigStore,
    collections: &CollectionStore,
) -> Dispatch {
    if is_reserved_segment(segment) {
        debug!("Skipping reserved path: {}", segment);
        return Dispatch::NotFound;
    }

    let doc = config_store.get_config().await;
    let Some(endpoint) = doc.api_urls.get(segment) else {
        if collections.collection_exists(segment).await {
            debug!("'{}' is a collection", segment);
            return Dispatch::Collection;
        }
        debug!("'{}' is neither an endpoint nor a collection", segment);
        return Dispatch::NotFound;
    };

    plan_endpoint(segment, endpoint, query, &doc.base_tag)
}

/// Applies an endpoint's rules to the request query.
pub fn plan_endpoint(
    name: &str,
    endpoint: &Endpoint,
    query: &HashMap<String, String>,
    base_tag: &str,
) -> Dispatch {
    let Some(method) = endpoint.method else {
        debug!("Endpoint '{}' has no method, treating as disabled", name);
        return Dispatch::NotFound;
    };

    debug!("Handling endpoint '{}'", name);

    match endpoint.url_construction {
        Some(UrlConstruction::SpecialForward) => {
            let Some(target) = non_empty(query, "url") else {
                return Dispatch::Rejected(ForwardError::MissingParameter("url"));
            };
            let field = non_empty(query, "field")
                .or(endpoint
                    .proxy_settings
                    .image_url_field_from_param_default
                    .as_deref()
                    .filter(|f| !f.is_empty()))
                .unwrap_or(DEFAULT_IMAGE_FIELD);

            Dispatch::Proxy {
                target: target.to_string(),
                settings: ProxySettings {
                    image_url_field: Some(field.to_string()),
                    ..endpoint.proxy_settings.clone()
                },
            }
        }
        Some(UrlConstruction::SpecialPollinations) => {
            let Some(tags) = non_empty(query, "tags") else {
                return Dispatch::Rejected(ForwardError::MissingParameter("tags"));
            };
            Dispatch::Redirect(format!(
                "{}{}%2c{}?&model={}&nologo=true",
                endpoint.url,
                urlencoding::encode(tags),
                base_tag,
                endpoint.model_name,
            ))
        }
        Some(UrlConstruction::SpecialDrawRedirect) => {
            let Some(tags) = non_empty(query, "tags") else {
                return Dispatch::Rejected(ForwardError::MissingParameter("tags"));
            };
            let model = query
                .get("model")
                .cloned()
                .or_else(|| endpoint.param_default("model"))
                .unwrap_or_else(|| DEFAULT_DRAW_MODEL.to_string());
            Dispatch::InternalRedirect(format!(
                "/{}?tags={}",
                urlencoding::encode(&model),
                urlencoding::encode(tags)
            ))
        }
        None => {
            let params = match resolve_params(endpoint, query) {
                Ok(params) => params,
                Err(details) => {
                    debug!("Rejected parameters for '{}': {:?}", name, details);
                    return Dispatch::Rejected(ForwardError::InvalidParameters(details));
                }
            };

            if endpoint.url.is_empty() {
                error!("Endpoint '{}' has no target URL", name);
                return Dispatch::Rejected(ForwardError::MissingTargetUrl);
            }

            let target = append_query(&endpoint.url, &params);
            debug!("Target for '{}': {}", name, target);

            match method {
                Method::Proxy => Dispatch::Proxy {
                    target,
                    settings: endpoint.proxy_settings.clone(),
                },
                Method::Redirect => Dispatch::Redirect(target),
            }
        }
    }
}

/// `302 Found` pointing at `location`.
pub fn redirect_found(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => (StatusCode::FOUND, [(header::LOCATION, value)]).into_response(),
        Err(e) => {
            error!("Cannot redirect to {:?}: {}", location, e);
            ForwardError::InvalidRedirect.into_response()
        }
    }
}

fn non_empty<'a>(query: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    query
        .get(key)
        .map(String::as_str)
        .filter(|value| !value.is_empty())
}
