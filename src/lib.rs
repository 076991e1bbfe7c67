use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub mod admin;
pub mod api;
pub mod config_store;
pub mod forward;
pub mod login;
pub mod pages;
pub mod resolver;
pub mod startup_checks;
pub mod static_files;
pub mod storage;
pub mod templating;

pub const DEFAULT_SESSION_SECRET: &str = "change-me-in-production";
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerConfig,
    pub app: AppConfig,
    pub storage: StorageConfig,
    pub templates: TemplateConfig,
    pub static_files: StaticConfig,
    pub display: DisplayConfig,
    pub proxy: ProxyConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub name: String,
    pub log_level: String,
    pub session_secret: String,
    pub admin_password: String,
    pub session_max_age_days: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    pub picture_dir: PathBuf,
    pub config_path: PathBuf,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TemplateConfig {
    pub directory: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StaticConfig {
    pub directory: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// File name inside `<picture_dir>/background/`.
    pub background_image: Option<String>,
    pub background_opacity: f64,
    pub navbar_opacity: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 46000,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: "Picforward".to_string(),
            log_level: "info".to_string(),
            session_secret: DEFAULT_SESSION_SECRET.to_string(),
            admin_password: DEFAULT_ADMIN_PASSWORD.to_string(),
            session_max_age_days: 7,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            picture_dir: PathBuf::from("picture"),
            config_path: PathBuf::from("config.json"),
            max_upload_bytes: 20 * 1024 * 1024,
        }
    }
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("templates"),
        }
    }
}

impl Default for StaticConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("static"),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            background_image: None,
            background_opacity: 0.25,
            navbar_opacity: 0.65,
        }
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self { timeout_secs: 15 }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Failed to read settings: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse settings: {0}")]
    Parse(#[from] toml_edit::de::Error),
}

impl Settings {
    /// Reads `path`, falling back to defaults when it does not exist, then
    /// applies environment overrides.
    pub fn load(path: &std::path::Path) -> Result<Self, SettingsError> {
        let mut settings = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml_edit::de::from_str::<Settings>(&content)?
        } else {
            tracing::info!("Config file not found at {:?}, using defaults", path);
            Settings::default()
        };

        settings.apply_overrides(|key| std::env::var(key).ok());
        Ok(settings)
    }

    /// Applies `KEY=value` overrides from `lookup`. Unparsable numbers are
    /// ignored with a warning.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parsed<T: std::str::FromStr>(key: &str, value: String) -> Option<T> {
            let result = value.trim().parse().ok();
            if result.is_none() {
                tracing::warn!("Ignoring invalid value for {}: {:?}", key, value);
            }
            result
        }

        if let Some(value) = lookup("ADMIN_PASSWORD") {
            self.app.admin_password = value;
        }
        if let Some(value) = lookup("SECRET_KEY") {
            self.app.session_secret = value;
        }
        if let Some(value) = lookup("APP_NAME") {
            self.app.name = value;
        }
        if let Some(value) = lookup("PICTURE_DIR") {
            self.storage.picture_dir = PathBuf::from(value);
        }
        if let Some(value) = lookup("CONFIG_PATH") {
            self.storage.config_path = PathBuf::from(value);
        }
        if let Some(value) = lookup("HOST") {
            self.server.host = value;
        }
        if let Some(port) = lookup("PORT").and_then(|v| parsed("PORT", v)) {
            self.server.port = port;
        }
        if let Some(value) = lookup("BACKGROUND_IMAGE_PATH") {
            self.display.background_image = Some(value).filter(|v| !v.is_empty());
        }
        if let Some(opacity) =
            lookup("BACKGROUND_OPACITY").and_then(|v| parsed("BACKGROUND_OPACITY", v))
        {
            self.display.background_opacity = opacity;
        }
        if let Some(opacity) = lookup("NAVBAR_OPACITY").and_then(|v| parsed("NAVBAR_OPACITY", v)) {
            self.display.navbar_opacity = opacity;
        }
    }
}

/// Presentation settings that admins may change while the server runs.
/// Changes live in memory only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplaySettings {
    pub app_name: String,
    pub background_image: Option<String>,
    pub background_opacity: f64,
    pub navbar_opacity: f64,
}

impl DisplaySettings {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            app_name: settings.app.name.clone(),
            background_image: settings.display.background_image.clone(),
            background_opacity: settings.display.background_opacity,
            navbar_opacity: settings.display.navbar_opacity,
        }
    }

    pub fn background_url(&self) -> Option<String> {
        self.background_image
            .as_deref()
            .map(|name| format!("/project_bg/{}", urlencoding::encode(name)))
    }
}

use axum::{
    Router,
    extract::{DefaultBodyLimit, Path, State},
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub config_store: config_store::ConfigStore,
    pub collections: Arc<storage::CollectionStore>,
    pub http: reqwest::Client,
    pub template_engine: Arc<templating::TemplateEngine>,
    pub static_handler: static_files::StaticFileHandler,
    pub display: Arc<RwLock<DisplaySettings>>,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        let http = build_http_client(&settings.proxy);
        let collections = storage::CollectionStore::new(
            settings.storage.picture_dir.clone(),
            http.clone(),
        );

        Self {
            config_store: config_store::ConfigStore::new(settings.storage.config_path.clone()),
            collections: Arc::new(collections),
            http,
            template_engine: Arc::new(templating::TemplateEngine::new(
                settings.templates.directory.clone(),
            )),
            static_handler: static_files::StaticFileHandler::new(
                settings.static_files.directory.clone(),
            ),
            display: Arc::new(RwLock::new(DisplaySettings::from_settings(&settings))),
            settings: Arc::new(settings),
        }
    }

    /// Variables every page template can rely on.
    pub async fn base_globals(&self, is_admin: bool) -> liquid::Object {
        let display = self.display.read().await;
        liquid::object!({
            "app_name": display.app_name.clone(),
            "background_url": display.background_url().unwrap_or_default(),
            "background_opacity": display.background_opacity,
            "navbar_opacity": display.navbar_opacity,
            "is_admin": is_admin,
        })
    }
}

fn build_http_client(proxy: &ProxyConfig) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(proxy.timeout_secs))
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|e| {
            tracing::error!("Failed to configure HTTP client, using defaults: {}", e);
            reqwest::Client::new()
        })
}

async fn static_file_handler(
    State(app_state): State<AppState>,
    Path(path): Path<String>,
) -> impl IntoResponse {
    app_state.static_handler.serve(&path).await
}

pub async fn create_app(settings: Settings) -> Router {
    create_app_with_state(AppState::new(settings))
}

pub fn create_app_with_state(app_state: AppState) -> Router {
    let upload_limit = app_state.settings.storage.max_upload_bytes;

    let admin_pages = Router::new()
        .route("/admin", get(admin::dashboard))
        .route("/admin/collection/create", post(admin::create_collection))
        .route("/admin/collection/delete", post(admin::delete_collection))
        .route("/admin/collection/{name}", get(admin::manage_collection))
        .route("/admin/collection/{name}/upload", post(admin::upload_images))
        .route("/admin/collection/{name}/add-links", post(admin::add_links))
        .route(
            "/admin/collection/{name}/delete-image",
            post(admin::delete_image),
        )
        .route(
            "/admin/collection/{name}/delete-link",
            post(admin::delete_link),
        )
        .route(
            "/admin/collection/{name}/cache-links",
            post(admin::cache_links),
        )
        .route("/admin/settings", post(admin::update_settings))
        .layer(DefaultBodyLimit::max(upload_limit))
        .route_layer(middleware::from_fn_with_state(
            app_state.clone(),
            login::require_admin_page,
        ));

    let admin_api = Router::new()
        .route("/api/config", get(api::get_config))
        .route(
            "/api/endpoints",
            get(api::list_endpoints).post(api::create_endpoint),
        )
        .route(
            "/api/endpoints/{name}",
            put(api::update_endpoint).delete(api::delete_endpoint),
        )
        .route("/api/base-tag", put(api::set_base_tag))
        .route_layer(middleware::from_fn_with_state(
            app_state.clone(),
            login::require_admin_api,
        ));

    Router::new()
        .route("/", get(pages::index))
        .route("/view/{collection}", get(pages::view_collection))
        .route("/picture/{collection}/{filename}", get(pages::picture))
        .route("/project_bg/{filename}", get(pages::project_background))
        .route("/static/{*path}", get(static_file_handler))
        .route("/api/collections", get(api::list_collections))
        .route("/api/collections/{name}", get(api::collection_resources))
        .route(
            "/admin/login",
            get(login::login_page).post(login::login_submit),
        )
        .route("/admin/logout", get(login::logout))
        .merge(admin_pages)
        .merge(admin_api)
        .route("/{segment}", get(forward::forward_handler))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    let method = request.method();
                    let uri = request.uri();
                    let matched_path = request
                        .extensions()
                        .get::<axum::extract::MatchedPath>()
                        .map(|matched_path| matched_path.as_str());

                    tracing::info_span!(
                        "http_request",
                        method = %method,
                        uri = %uri,
                        matched_path,
                    )
                })
                .on_request(|request: &axum::http::Request<_>, _span: &tracing::Span| {
                    let headers = request.headers();
                    let user_agent = headers
                        .get("user-agent")
                        .and_then(|h| h.to_str().ok())
                        .unwrap_or("-");

                    tracing::info!(
                        target: "access_log",
                        method = %request.method(),
                        path = %request.uri().path(),
                        query = ?request.uri().query(),
                        user_agent = %user_agent,
                        "request"
                    );
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     _span: &tracing::Span| {
                        let location = response
                            .headers()
                            .get("location")
                            .and_then(|h| h.to_str().ok())
                            .unwrap_or("-");

                        tracing::info!(
                            target: "access_log",
                            status = %response.status(),
                            location = %location,
                            latency_ms = %latency.as_millis(),
                            "response"
                        );
                    },
                ),
        )
        .with_state(app_state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings: Settings = toml_edit::de::from_str(
            r#"
[server]
port = 8080

[app]
admin_password = "s3cret"
"#,
        )
        .unwrap();

        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.app.admin_password, "s3cret");
        assert_eq!(settings.app.session_max_age_days, 7);
        assert_eq!(settings.storage.max_upload_bytes, 20 * 1024 * 1024);
        assert_eq!(settings.proxy.timeout_secs, 15);
    }

    #[test]
    fn test_environment_overrides() {
        let mut settings = Settings::default();
        settings.apply_overrides(lookup(&[
            ("ADMIN_PASSWORD", "pw"),
            ("SECRET_KEY", "key"),
            ("PICTURE_DIR", "/data/pictures"),
            ("PORT", "9000"),
            ("BACKGROUND_IMAGE_PATH", "bg.jpg"),
            ("BACKGROUND_OPACITY", "0.5"),
            ("NAVBAR_OPACITY", "not-a-number"),
        ]));

        assert_eq!(settings.app.admin_password, "pw");
        assert_eq!(settings.app.session_secret, "key");
        assert_eq!(settings.storage.picture_dir, PathBuf::from("/data/pictures"));
        assert_eq!(settings.server.port, 9000);
        assert_eq!(settings.display.background_image.as_deref(), Some("bg.jpg"));
        assert_eq!(settings.display.background_opacity, 0.5);
        assert_eq!(settings.display.navbar_opacity, 0.65);
    }

    #[test]
    fn test_background_url_is_encoded() {
        let mut display = DisplaySettings::from_settings(&Settings::default());
        assert_eq!(display.background_url(), None);

        display.background_image = Some("my bg.png".to_string());
        assert_eq!(
            display.background_url().as_deref(),
            Some("/project_bg/my%20bg.png")
        );
    }
}
