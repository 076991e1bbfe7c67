//! Picks the resource served for a collection request.
//!
//! Local images always win over external links: a collection with at least
//! one local image never redirects to an external link, however many links it
//! holds.

use crate::storage::CollectionStore;
use rand::Rng;
use rand::seq::IndexedRandom;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "locator", rename_all = "lowercase")]
pub enum Resource {
    Local(PathBuf),
    External(String),
}

impl Resource {
    pub fn is_local(&self) -> bool {
        matches!(self, Resource::Local(_))
    }
}

/// Entry of a collection listing, addressed the way clients fetch it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceEntry {
    pub kind: &'static str,
    pub name: String,
    pub url: String,
}

pub async fn pick_random(store: &CollectionStore, name: &str) -> Option<Resource> {
    if !store.collection_exists(name).await {
        return None;
    }

    let local_images = store.list_local_images(name).await;
    let links = if local_images.is_empty() {
        store.list_external_links(name).await
    } else {
        Vec::new()
    };

    let pick = choose(&local_images, &links, &mut rand::rng())?;
    match pick {
        Pick::Local(filename) => store
            .local_image_path(name, filename)
            .await
            .map(Resource::Local),
        Pick::External(link) => Some(Resource::External(link.to_string())),
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Pick<'a> {
    Local(&'a str),
    External(&'a str),
}

/// Uniform draw over the local images, or over the links when there are no
/// local images.
fn choose<'a, R: Rng + ?Sized>(
    local_images: &'a [String],
    links: &'a [String],
    rng: &mut R,
) -> Option<Pick<'a>> {
    if let Some(filename) = local_images.choose(rng) {
        return Some(Pick::Local(filename.as_str()));
    }
    links.choose(rng).map(|link| Pick::External(link.as_str()))
}

/// Every resource of a collection: local images in name order, then external
/// links in file order.
pub async fn list_resources(store: &CollectionStore, name: &str) -> Vec<ResourceEntry> {
    let mut local_images = store.list_local_images(name).await;
    local_images.sort();

    let mut entries: Vec<ResourceEntry> = local_images
        .into_iter()
        .map(|filename| ResourceEntry {
            kind: "local",
            url: picture_url(name, &filename),
            name: filename,
        })
        .collect();

    entries.extend(
        store
            .list_external_links(name)
            .await
            .into_iter()
            .map(|link| ResourceEntry {
                kind: "external",
                name: link.clone(),
                url: link,
            }),
    );

    entries
}

pub fn picture_url(collection: &str, filename: &str) -> String {
    format!(
        "/picture/{}/{}",
        urlencoding::encode(collection),
        urlencoding::encode(filename)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    async fn setup_store() -> (TempDir, CollectionStore) {
        let temp_dir = TempDir::new().unwrap();
        let store = CollectionStore::new(temp_dir.path().to_path_buf(), reqwest::Client::new())
            .with_link_pause(Duration::ZERO);
        store.create_collection("mixed").await;
        store.create_collection("links_only").await;
        store.create_collection("empty").await;
        (temp_dir, store)
    }

    #[tokio::test]
    async fn test_local_images_take_priority() {
        let (_temp_dir, store) = setup_store().await;
        store.add_local_image("mixed", b"x", "only.png").await.unwrap();
        let links: Vec<String> = (0..50).map(|i| format!("https://x/{}.png", i)).collect();
        store.add_external_links("mixed", &links).await;

        for _ in 0..1000 {
            let resource = pick_random(&store, "mixed").await.unwrap();
            assert!(resource.is_local(), "picked {:?}", resource);
        }
    }

    #[tokio::test]
    async fn test_picks_cover_all_local_images() {
        let (_temp_dir, store) = setup_store().await;
        for name in ["a.png", "b.png", "c.png"] {
            store.add_local_image("mixed", b"x", name).await.unwrap();
        }

        let mut seen = std::collections::HashSet::new();
        for _ in 0..300 {
            if let Some(Resource::Local(path)) = pick_random(&store, "mixed").await {
                seen.insert(path.file_name().unwrap().to_string_lossy().to_string());
            }
        }
        assert_eq!(seen.len(), 3);
    }

    #[tokio::test]
    async fn test_falls_back_to_external_links() {
        let (_temp_dir, store) = setup_store().await;
        store
            .add_external_links("links_only", &["https://x/1.png", "https://x/2.png"])
            .await;

        for _ in 0..100 {
            match pick_random(&store, "links_only").await {
                Some(Resource::External(url)) => {
                    assert!(url == "https://x/1.png" || url == "https://x/2.png")
                }
                other => panic!("unexpected pick {:?}", other),
            }
        }
    }

    #[test]
    fn test_choose_never_mixes_pools() {
        let local = vec!["a.png".to_string()];
        let links = vec!["https://x/1.png".to_string()];
        let mut rng = rand::rng();

        assert_eq!(choose(&local, &links, &mut rng), Some(Pick::Local("a.png")));
        assert_eq!(
            choose(&[], &links, &mut rng),
            Some(Pick::External("https://x/1.png"))
        );
        assert_eq!(choose(&[], &[], &mut rng), None);
    }

    #[tokio::test]
    async fn test_empty_or_missing_collection_yields_none() {
        let (_temp_dir, store) = setup_store().await;
        assert!(pick_random(&store, "empty").await.is_none());
        assert!(pick_random(&store, "nope").await.is_none());
    }

    #[tokio::test]
    async fn test_list_resources_orders_local_then_external() {
        let (_temp_dir, store) = setup_store().await;
        store.add_local_image("mixed", b"x", "b.png").await.unwrap();
        store.add_local_image("mixed", b"x", "a b.png").await.unwrap();
        store
            .add_external_links("mixed", &["https://x/2.png", "https://x/1.png"])
            .await;

        let entries = list_resources(&store, "mixed").await;
        let urls: Vec<&str> = entries.iter().map(|e| e.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "/picture/mixed/a_b.png",
                "/picture/mixed/b.png",
                "https://x/2.png",
                "https://x/1.png"
            ]
        );
        assert_eq!(entries[0].kind, "local");
        assert_eq!(entries[3].kind, "external");
    }

    #[test]
    fn test_resource_serializes_as_tagged_value() {
        let value = serde_json::to_value(Resource::External("https://x".to_string())).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"kind": "external", "locator": "https://x"})
        );
    }
}
