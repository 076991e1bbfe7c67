use super::{ForwardError, redirect_found};
use crate::config_store::{FallbackAction, ProxySettings};
use axum::{
    Json,
    body::{Body, Bytes},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use tracing::{debug, error, info, warn};

static IMAGE_URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\.(jpeg|jpg|gif|png|webp|bmp|svg)([^a-z0-9]|$)").expect("valid image pattern")
});

/// Whether `candidate` contains a known image extension anywhere, as long as
/// the extension is not the start of a longer word (`.png/large` and
/// `.jpg!w800` count, `.pngs` does not).
pub fn is_image_url(candidate: &str) -> bool {
    IMAGE_URL_PATTERN.is_match(candidate)
}

/// Walks `path` (dot separated) through nested JSON objects. Anything that is
/// not an object along the way, or a missing key, yields `None`.
pub fn extract_by_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return None;
    }
    path.split('.')
        .try_fold(value, |current, segment| current.as_object()?.get(segment))
}

/// Fetches `target` on behalf of the client.
///
/// Upstream errors are passed through with their status. A successful JSON
/// reply is searched for an image URL at `settings.image_url_field`; when one
/// is found the client is redirected to it, otherwise the fallback action
/// decides between a 404 and returning the upstream body unchanged. Network
/// failures become 504 (timeout) or 500 responses.
pub async fn proxy_request(
    client: &reqwest::Client,
    target: &str,
    settings: &ProxySettings,
) -> Response {
    info!("Proxying request to {}", target);

    let response = match client.get(target).send().await {
        Ok(response) => response,
        Err(e) => return network_failure(target, e),
    };

    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let is_json = content_type
        .as_deref()
        .is_some_and(|ct| ct.starts_with("application/json"));

    let body = match response.bytes().await {
        Ok(body) => body,
        Err(e) => return network_failure(target, e),
    };

    if status.as_u16() >= 400 {
        warn!("Upstream {} answered with status {}", target, status);
        let passthrough = is_json
            .then(|| serde_json::from_slice::<Value>(&body).ok())
            .flatten();
        let error_body = passthrough.unwrap_or_else(|| {
            serde_json::json!({ "error": format!("Target API error ({})", status.as_u16()) })
        });
        return (status, Json(error_body)).into_response();
    }

    let parsed = serde_json::from_slice::<Value>(&body).ok();

    if let Some(field) = settings.image_url_field()
        && is_json
        && let Some(Value::String(image_url)) =
            parsed.as_ref().and_then(|value| extract_by_path(value, field))
        && is_image_url(image_url)
    {
        info!("Redirecting to extracted image {}", image_url);
        return redirect_found(image_url);
    }

    match settings.fallback_action {
        FallbackAction::Error => {
            debug!("No image URL found in response from {}", target);
            ForwardError::ExtractionFailed.into_response()
        }
        FallbackAction::ReturnJson => match parsed {
            Some(value) => (status, Json(value)).into_response(),
            None => passthrough_raw(status, content_type.as_deref(), body),
        },
    }
}

fn passthrough_raw(status: StatusCode, content_type: Option<&str>, body: Bytes) -> Response {
    let content_type = content_type.unwrap_or("text/plain; charset=utf-8");
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .unwrap_or_else(|e| {
            error!("Failed to build passthrough response: {}", e);
            ForwardError::ProxyFailed.into_response()
        })
}

fn network_failure(target: &str, e: reqwest::Error) -> Response {
    if e.is_timeout() {
        error!("Proxy request to {} timed out: {}", target, e);
        ForwardError::Timeout.into_response()
    } else {
        error!("Proxy request to {} failed: {}", target, e);
        ForwardError::ProxyFailed.into_response()
    }
}
