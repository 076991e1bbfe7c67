use super::CollectionStore;
use tokio::io::AsyncWriteExt;
use tracing::{error, info, warn};

impl CollectionStore {
    /// Non-blank lines of the collection's link file, in file order.
    pub async fn list_external_links(&self, name: &str) -> Vec<String> {
        if self.existing_dir(name).await.is_none() {
            return Vec::new();
        }
        let Some(path) = self.links_file(name) else {
            return Vec::new();
        };

        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => parse_links(&contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                warn!("Failed to read link file {:?}: {}", path, e);
                Vec::new()
            }
        }
    }

    /// Appends each non-blank link on its own line and returns how many were
    /// written.
    pub async fn add_external_links<S: AsRef<str>>(&self, name: &str, links: &[S]) -> usize {
        if self.existing_dir(name).await.is_none() {
            return 0;
        }
        let Some(path) = self.links_file(name) else {
            return 0;
        };

        let lines: Vec<&str> = links
            .iter()
            .map(|link| link.as_ref().trim())
            .filter(|link| !link.is_empty())
            .collect();
        if lines.is_empty() {
            return 0;
        }

        // A file edited by hand may lack its final newline.
        let mut buffer = String::new();
        if let Ok(existing) = tokio::fs::read(&path).await
            && existing.last().is_some_and(|byte| *byte != b'\n')
        {
            buffer.push('\n');
        }
        for line in &lines {
            buffer.push_str(line);
            buffer.push('\n');
        }

        let result = async {
            let mut file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .await?;
            file.write_all(buffer.as_bytes()).await?;
            file.flush().await
        }
        .await;

        match result {
            Ok(()) => {
                info!("Added {} link(s) to collection '{}'", lines.len(), name);
                lines.len()
            }
            Err(e) => {
                error!("Failed to append to link file {:?}: {}", path, e);
                0
            }
        }
    }

    /// Removes the first line equal to `link`, keeping the order of the rest.
    pub async fn delete_external_link(&self, name: &str, link: &str) -> bool {
        if self.existing_dir(name).await.is_none() {
            return false;
        }
        let Some(path) = self.links_file(name) else {
            return false;
        };

        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("Failed to read link file {:?}: {}", path, e);
                }
                return false;
            }
        };

        let mut links = parse_links(&contents);
        let Some(position) = links.iter().position(|existing| existing == link) else {
            return false;
        };
        links.remove(position);

        let mut rewritten = String::new();
        for remaining in &links {
            rewritten.push_str(remaining);
            rewritten.push('\n');
        }

        match tokio::fs::write(&path, rewritten).await {
            Ok(()) => {
                info!("Removed link from collection '{}'", name);
                true
            }
            Err(e) => {
                error!("Failed to rewrite link file {:?}: {}", path, e);
                false
            }
        }
    }
}

/// Trimmed non-blank lines, in order.
pub fn parse_links(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
