use axum::http::{StatusCode, header};
use axum_test::TestServer;
use picforward::{AppState, Settings, create_app_with_state};
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// Closed local port: cover downloads fail fast instead of hanging.
const DEAD_LINK: &str = "http://127.0.0.1:1/remote.png";

fn templates_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("templates")
}

fn write_file(path: &Path, contents: &[u8]) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

/// Picture root with three collections:
/// - `cats`: one local image plus a link that must never be served
/// - `remote`: links only
/// - `empty`: nothing at all
fn setup_picture_dir(root: &Path) {
    write_file(&root.join("cats").join("tabby.png"), b"\x89PNG fake");
    write_file(&root.join("cats").join("cats.txt"), format!("{}\n", DEAD_LINK).as_bytes());
    write_file(
        &root.join("remote").join("remote.txt"),
        format!("{}\n\n", DEAD_LINK).as_bytes(),
    );
    std::fs::create_dir_all(root.join("empty")).unwrap();
    write_file(&root.join("background").join("sky.jpg"), b"jpeg bytes");
}

fn setup_test_server() -> (TempDir, TestServer) {
    let temp_dir = TempDir::new().unwrap();
    let picture_dir = temp_dir.path().join("picture");
    setup_picture_dir(&picture_dir);

    let config_path = temp_dir.path().join("config.json");
    let config = json!({
        "apiUrls": {
            "remote": {
                "url": "https://api.example.com/remote",
                "method": "redirect",
                "group": "Landscapes",
                "description": "Remote landscapes"
            }
        },
        "baseTag": ""
    });
    std::fs::write(&config_path, config.to_string()).unwrap();

    let mut settings = Settings::default();
    settings.app.name = "Test Pictures".to_string();
    settings.storage.picture_dir = picture_dir;
    settings.storage.config_path = config_path;
    settings.templates.directory = templates_dir();
    settings.static_files.directory = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("static");

    let app = create_app_with_state(AppState::new(settings));
    (temp_dir, TestServer::new(app).unwrap())
}

#[tokio::test]
async fn test_local_image_served_directly() {
    let (_temp_dir, server) = setup_test_server();

    for _ in 0..20 {
        let response = server.get("/cats").await;
        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(response.header(header::CONTENT_TYPE), "image/png");
        assert_eq!(&response.as_bytes()[..], b"\x89PNG fake");
    }
}

#[tokio::test]
async fn test_links_only_collection_redirects() {
    let (temp_dir, server) = setup_test_server();

    // An endpoint named like a collection wins, so use a second links-only
    // collection to reach the collection branch.
    write_file(
        &temp_dir.path().join("picture").join("links").join("links.txt"),
        b"https://cdn.example.com/a.png\n",
    );

    let response = server.get("/links").await;
    assert_eq!(response.status_code(), StatusCode::FOUND);
    assert_eq!(
        response.header(header::LOCATION),
        "https://cdn.example.com/a.png"
    );
}

#[tokio::test]
async fn test_empty_collection_is_not_found() {
    let (_temp_dir, server) = setup_test_server();

    let response = server.get("/empty").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_endpoint_takes_precedence_over_collection() {
    let (_temp_dir, server) = setup_test_server();

    let response = server.get("/remote").await;
    assert_eq!(response.status_code(), StatusCode::FOUND);
    assert_eq!(
        response.header(header::LOCATION),
        "https://api.example.com/remote"
    );
}

#[tokio::test]
async fn test_background_directory_is_not_a_collection() {
    let (_temp_dir, server) = setup_test_server();

    let response = server.get("/background").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_view_collection_page() {
    let (_temp_dir, server) = setup_test_server();

    let response = server.get("/view/cats").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let html = response.text();
    assert!(html.contains("Test Pictures"));
    assert!(html.contains("/picture/cats/tabby.png"));
    assert!(html.contains(DEAD_LINK));
    assert!(html.contains("Local images (1)"));

    let response = server.get("/view/missing").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_picture_route() {
    let (_temp_dir, server) = setup_test_server();

    let response = server.get("/picture/cats/tabby.png").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.header(header::CONTENT_TYPE), "image/png");
    assert!(response.maybe_header(header::ETAG).is_some());

    let response = server.get("/picture/cats/cats.txt").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

    let response = server.get("/picture/cats/missing.png").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

    let response = server.get("/picture/cats/..%2F..%2Fconfig.json").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_project_background() {
    let (_temp_dir, server) = setup_test_server();

    let response = server.get("/project_bg/sky.jpg").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.header(header::CONTENT_TYPE), "image/jpeg");

    let response = server.get("/project_bg/..%2Fconfig.json").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_collection_listing_api() {
    let (_temp_dir, server) = setup_test_server();

    let response = server.get("/api/collections").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    let collections = body["collections"].as_array().unwrap();
    let names: Vec<&str> = collections
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["cats", "empty", "remote"]);

    assert_eq!(collections[0]["local_count"], 1);
    assert_eq!(collections[0]["external_count"], 1);
    assert_eq!(collections[0]["total"], 2);
    assert_eq!(collections[1]["has_content"], false);
    assert_eq!(collections[2]["local_count"], 0);
    assert_eq!(collections[2]["external_count"], 1);
}

#[tokio::test]
async fn test_collection_resources_api() {
    let (_temp_dir, server) = setup_test_server();

    let response = server.get("/api/collections/cats").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["name"], "cats");
    assert_eq!(
        body["resources"],
        json!([
            { "kind": "local", "name": "tabby.png", "url": "/picture/cats/tabby.png" },
            { "kind": "external", "name": DEAD_LINK, "url": DEAD_LINK }
        ])
    );

    let response = server.get("/api/collections/missing").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_index_lists_collections_and_endpoints() {
    let (_temp_dir, server) = setup_test_server();

    let response = server.get("/").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let html = response.text();

    assert!(html.contains("Test Pictures"));
    assert!(html.contains("/view/cats"));
    assert!(html.contains("/view/empty"));
    assert!(html.contains("/picture/cats/tabby.png"));
    assert!(html.contains("Landscapes"));
    assert!(html.contains("Remote landscapes"));
    assert!(html.contains("Admin login"));
}

#[tokio::test]
async fn test_static_assets() {
    let (_temp_dir, server) = setup_test_server();

    let response = server.get("/static/style.css").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert!(
        response
            .header(header::CONTENT_TYPE)
            .to_str()
            .unwrap()
            .starts_with("text/css")
    );

    let response = server.get("/static/missing.css").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}
