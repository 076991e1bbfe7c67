use axum::{
    Json, Router,
    http::{StatusCode, header},
    response::IntoResponse,
    routing::get,
};
use axum_test::TestServer;
use picforward::{AppState, Settings, create_app_with_state};
use serde_json::{Value, json};
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

/// Fake image API on a random local port.
async fn spawn_upstream() -> String {
    let app = Router::new()
        .route(
            "/json",
            get(|| async { Json(json!({ "data": { "img": "http://x/y.png" } })) }),
        )
        .route(
            "/not-image",
            get(|| async { Json(json!({ "data": { "img": "http://x/page.html" } })) }),
        )
        .route(
            "/cdn",
            get(|| async { Json(json!({ "data": { "img": "http://x/a.png/large" } })) }),
        )
        .route("/text", get(|| async { "plain upstream body" }))
        .route(
            "/down",
            get(|| async {
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(json!({ "error": "maintenance" })),
                )
            }),
        )
        .route(
            "/broken",
            get(|| async { (StatusCode::BAD_GATEWAY, "<html>oops</html>").into_response() }),
        )
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(json!({ "data": { "img": "http://x/late.png" } }))
            }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn templates_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("templates")
}

async fn setup_test_server(upstream: &str) -> (TempDir, TestServer) {
    let temp_dir = TempDir::new().unwrap();

    let config = json!({
        "apiUrls": {
            "sized": {
                "url": "https://api.example.com/gen",
                "method": "redirect",
                "queryParams": [{ "name": "size", "required": true }]
            },
            "styled": {
                "url": "https://api.example.com/gen",
                "method": "redirect",
                "queryParams": [{ "name": "style", "validValues": ["a", "b"] }]
            },
            "extract": {
                "url": format!("{}/json", upstream),
                "method": "proxy",
                "proxySettings": { "imageUrlField": "data.img" }
            },
            "strict": {
                "url": format!("{}/json", upstream),
                "method": "proxy",
                "proxySettings": { "imageUrlField": "data.missing", "fallbackAction": "error" }
            },
            "cdn": {
                "url": format!("{}/cdn", upstream),
                "method": "proxy",
                "proxySettings": { "imageUrlField": "data.img", "fallbackAction": "error" }
            },
            "lenient": {
                "url": format!("{}/not-image", upstream),
                "method": "proxy",
                "proxySettings": { "imageUrlField": "data.img" }
            },
            "textual": {
                "url": format!("{}/text", upstream),
                "method": "proxy"
            },
            "down": {
                "url": format!("{}/down", upstream),
                "method": "proxy"
            },
            "broken": {
                "url": format!("{}/broken", upstream),
                "method": "proxy"
            },
            "slow": {
                "url": format!("{}/slow", upstream),
                "method": "proxy",
                "proxySettings": { "imageUrlField": "data.img" }
            },
            "relay": {
                "method": "proxy",
                "urlConstruction": "special_forward"
            },
            "poll": {
                "url": "https://image.example.com/prompt/",
                "method": "redirect",
                "urlConstruction": "special_pollinations",
                "modelName": "flux"
            },
            "draw": {
                "method": "redirect",
                "urlConstruction": "special_draw_redirect"
            },
            "disabled": {
                "url": "https://api.example.com/off"
            },
            "config": {
                "url": "https://api.example.com/never",
                "method": "redirect"
            }
        },
        "baseTag": "best quality, masterpiece"
    });

    let config_path = temp_dir.path().join("config.json");
    std::fs::write(&config_path, serde_json::to_string_pretty(&config).unwrap()).unwrap();

    let mut settings = Settings::default();
    settings.storage.picture_dir = temp_dir.path().join("picture");
    settings.storage.config_path = config_path;
    settings.templates.directory = templates_dir();
    settings.proxy.timeout_secs = 1;
    std::fs::create_dir_all(&settings.storage.picture_dir).unwrap();

    let app = create_app_with_state(AppState::new(settings));
    let server = TestServer::new(app).unwrap();
    (temp_dir, server)
}

#[tokio::test]
async fn test_required_parameter_missing() {
    let upstream = spawn_upstream().await;
    let (_temp_dir, server) = setup_test_server(&upstream).await;

    let response = server.get("/sized").await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let body: Value = response.json();
    assert_eq!(body["error"], "Invalid parameters");
    assert_eq!(body["details"], json!(["Missing required parameter: size"]));

    let response = server.get("/sized").add_query_param("size", "512").await;
    assert_eq!(response.status_code(), StatusCode::FOUND);
    assert_eq!(
        response.header(header::LOCATION),
        "https://api.example.com/gen?size=512"
    );
}

#[tokio::test]
async fn test_valid_values_enforced() {
    let upstream = spawn_upstream().await;
    let (_temp_dir, server) = setup_test_server(&upstream).await;

    let response = server.get("/styled").add_query_param("style", "c").await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["details"], json!(["Invalid value for 'style'"]));

    let response = server.get("/styled").add_query_param("style", "a").await;
    assert_eq!(response.status_code(), StatusCode::FOUND);
    let location = response.header(header::LOCATION);
    assert!(location.to_str().unwrap().ends_with("?style=a"));

    // Optional parameter without a default is simply omitted.
    let response = server.get("/styled").await;
    assert_eq!(
        response.header(header::LOCATION),
        "https://api.example.com/gen"
    );
}

#[tokio::test]
async fn test_proxy_redirects_to_extracted_image() {
    let upstream = spawn_upstream().await;
    let (_temp_dir, server) = setup_test_server(&upstream).await;

    let response = server.get("/extract").await;
    assert_eq!(response.status_code(), StatusCode::FOUND);
    assert_eq!(response.header(header::LOCATION), "http://x/y.png");
}

#[tokio::test]
async fn test_proxy_redirects_to_cdn_style_image_url() {
    let upstream = spawn_upstream().await;
    let (_temp_dir, server) = setup_test_server(&upstream).await;

    let response = server.get("/cdn").await;
    assert_eq!(response.status_code(), StatusCode::FOUND);
    assert_eq!(response.header(header::LOCATION), "http://x/a.png/large");
}

#[tokio::test]
async fn test_proxy_error_fallback() {
    let upstream = spawn_upstream().await;
    let (_temp_dir, server) = setup_test_server(&upstream).await;

    let response = server.get("/strict").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["error"], "Could not extract image URL");
}

#[tokio::test]
async fn test_proxy_returns_json_when_value_is_not_an_image() {
    let upstream = spawn_upstream().await;
    let (_temp_dir, server) = setup_test_server(&upstream).await;

    let response = server.get("/lenient").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body, json!({ "data": { "img": "http://x/page.html" } }));
}

#[tokio::test]
async fn test_proxy_passes_raw_body_through() {
    let upstream = spawn_upstream().await;
    let (_temp_dir, server) = setup_test_server(&upstream).await;

    let response = server.get("/textual").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.text(), "plain upstream body");
}

#[tokio::test]
async fn test_upstream_errors_pass_through() {
    let upstream = spawn_upstream().await;
    let (_temp_dir, server) = setup_test_server(&upstream).await;

    let response = server.get("/down").await;
    assert_eq!(response.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = response.json();
    assert_eq!(body, json!({ "error": "maintenance" }));

    let response = server.get("/broken").await;
    assert_eq!(response.status_code(), StatusCode::BAD_GATEWAY);
    let body: Value = response.json();
    assert_eq!(body["error"], "Target API error (502)");
}

#[tokio::test]
async fn test_proxy_timeout() {
    let upstream = spawn_upstream().await;
    let (_temp_dir, server) = setup_test_server(&upstream).await;

    let response = server.get("/slow").await;
    assert_eq!(response.status_code(), StatusCode::GATEWAY_TIMEOUT);
    let body: Value = response.json();
    assert_eq!(body["error"], "Proxy request timeout");
}

#[tokio::test]
async fn test_special_forward() {
    let upstream = spawn_upstream().await;
    let (_temp_dir, server) = setup_test_server(&upstream).await;

    let response = server.get("/relay").await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "Missing url parameter");

    let response = server
        .get("/relay")
        .add_query_param("url", format!("{}/json", upstream))
        .add_query_param("field", "data.img")
        .await;
    assert_eq!(response.status_code(), StatusCode::FOUND);
    assert_eq!(response.header(header::LOCATION), "http://x/y.png");
}

#[tokio::test]
async fn test_pollinations_redirect_appends_base_tag() {
    let upstream = spawn_upstream().await;
    let (_temp_dir, server) = setup_test_server(&upstream).await;

    let response = server.get("/poll").add_query_param("tags", "a cat").await;
    assert_eq!(response.status_code(), StatusCode::FOUND);
    assert_eq!(
        response.header(header::LOCATION),
        "https://image.example.com/prompt/a%20cat%2cbest quality, masterpiece?&model=flux&nologo=true"
    );
}

#[tokio::test]
async fn test_draw_redirect_stays_on_server() {
    let upstream = spawn_upstream().await;
    let (_temp_dir, server) = setup_test_server(&upstream).await;

    let response = server
        .get("/draw")
        .add_query_param("tags", "blue sky")
        .await;
    assert_eq!(response.status_code(), StatusCode::FOUND);
    assert_eq!(response.header(header::LOCATION), "/flux?tags=blue%20sky");
}

#[tokio::test]
async fn test_disabled_and_unknown_endpoints_are_not_found() {
    let upstream = spawn_upstream().await;
    let (_temp_dir, server) = setup_test_server(&upstream).await;

    assert_eq!(
        server.get("/disabled").await.status_code(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        server.get("/nothing-here").await.status_code(),
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn test_reserved_paths_skip_lookup() {
    let upstream = spawn_upstream().await;
    let (temp_dir, server) = setup_test_server(&upstream).await;

    // A collection directory named like a reserved path is never served.
    std::fs::create_dir_all(temp_dir.path().join("picture").join("js")).unwrap();
    std::fs::write(
        temp_dir.path().join("picture").join("js").join("a.png"),
        b"png",
    )
    .unwrap();

    for path in ["/config", "/js", "/admin-login", "/favicon.ico", "/robots.txt"] {
        let response = server.get(path).await;
        assert_eq!(
            response.status_code(),
            StatusCode::NOT_FOUND,
            "{} should not be dispatched",
            path
        );
    }
}
