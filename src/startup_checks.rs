use crate::{DEFAULT_ADMIN_PASSWORD, DEFAULT_SESSION_SECRET, Settings, config_store::ConfigStore};
use std::path::Path;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum StartupCheckError {
    #[error("Failed to create picture directory: {0}")]
    PictureDirectoryCreationFailed(#[source] std::io::Error),

    #[error("Failed to create endpoint configuration: {0}")]
    ConfigDocumentCreationFailed(String),

    #[error("Templates directory does not exist: {0}")]
    TemplateDirectoryMissing(String),

    #[error("Required template missing: {0}")]
    RequiredTemplateMissing(String),
}

impl StartupCheckError {
    /// Errors that leave the server unable to store anything.
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            StartupCheckError::PictureDirectoryCreationFailed(_)
                | StartupCheckError::ConfigDocumentCreationFailed(_)
        )
    }
}

const REQUIRED_TEMPLATES: &[&str] = &[
    "index.html.liquid",
    "collection.html.liquid",
    "login.html.liquid",
    "admin.html.liquid",
    "manage_collection.html.liquid",
];

pub async fn perform_startup_checks(settings: &Settings) -> Result<(), Vec<StartupCheckError>> {
    let mut errors = Vec::new();

    info!("Performing startup checks...");

    let picture_dir = &settings.storage.picture_dir;
    if !picture_dir.exists() {
        info!("Picture directory does not exist, creating: {:?}", picture_dir);
        if let Err(e) = tokio::fs::create_dir_all(picture_dir).await {
            error!("Failed to create picture directory: {}", e);
            errors.push(StartupCheckError::PictureDirectoryCreationFailed(e));
        }
    } else {
        info!("Picture directory exists: {:?}", picture_dir);
    }

    let config_store = ConfigStore::new(settings.storage.config_path.clone());
    match config_store.ensure_exists().await {
        Ok(true) => info!(
            "Created empty endpoint configuration: {:?}",
            settings.storage.config_path
        ),
        Ok(false) => info!(
            "Endpoint configuration exists: {:?}",
            settings.storage.config_path
        ),
        Err(e) => {
            error!("Failed to create endpoint configuration: {}", e);
            errors.push(StartupCheckError::ConfigDocumentCreationFailed(e.to_string()));
        }
    }

    let templates_dir = Path::new(&settings.templates.directory);
    if !templates_dir.exists() {
        warn!("Templates directory does not exist: {:?}", templates_dir);
        warn!("This may cause issues with page rendering");
        errors.push(StartupCheckError::TemplateDirectoryMissing(
            templates_dir.display().to_string(),
        ));
    } else {
        for template in REQUIRED_TEMPLATES {
            if !templates_dir.join(template).exists() {
                warn!("Required template missing: {}", template);
                errors.push(StartupCheckError::RequiredTemplateMissing(
                    template.to_string(),
                ));
            }
        }
    }

    if settings.app.session_secret == DEFAULT_SESSION_SECRET {
        warn!("Using the default session secret; set SECRET_KEY or app.session_secret");
    }
    if settings.app.admin_password == DEFAULT_ADMIN_PASSWORD {
        warn!("Using the default admin password; set ADMIN_PASSWORD or app.admin_password");
    }

    if errors.is_empty() {
        info!("All startup checks passed");
        Ok(())
    } else {
        error!("Startup checks failed with {} errors", errors.len());
        Err(errors)
    }
}
