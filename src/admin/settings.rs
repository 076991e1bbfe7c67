use super::{Flash, FlashLevel};
use crate::AppState;
use axum::{
    extract::{Multipart, State},
    response::Response,
};
use std::path::Path;
use tracing::{error, info, warn};

const BACKGROUND_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];
const DEFAULT_BACKGROUND_STEM: &str = "default_background";

#[derive(Debug, Default)]
struct SettingsForm {
    app_name: Option<String>,
    background_opacity: Option<String>,
    background_image: Option<(String, Vec<u8>)>,
}

async fn read_form(multipart: &mut Multipart) -> Result<SettingsForm, String> {
    let mut form = SettingsForm::default();

    while let Some(field) = multipart.next_field().await.map_err(|e| e.body_text())? {
        match field.name() {
            Some("app_name") => form.app_name = Some(field.text().await.map_err(|e| e.body_text())?),
            Some("background_opacity") => {
                form.background_opacity = Some(field.text().await.map_err(|e| e.body_text())?)
            }
            Some("background_image") => {
                let file_name = field.file_name().unwrap_or("").to_string();
                let bytes = field.bytes().await.map_err(|e| e.body_text())?;
                if !file_name.is_empty() && !bytes.is_empty() {
                    form.background_image = Some((file_name, bytes.to_vec()));
                }
            }
            _ => {}
        }
    }

    Ok(form)
}

/// Background opacity as entered in the settings form.
pub fn parse_opacity(input: &str) -> Result<f64, &'static str> {
    let value: f64 = input
        .trim()
        .parse()
        .map_err(|_| "Invalid opacity value")?;
    if (0.1..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err("Opacity must be between 0.1 and 1.0")
    }
}

/// Lowercase extension of an uploaded background, if it is an accepted type.
pub fn background_extension(file_name: &str) -> Option<String> {
    let ext = Path::new(file_name)
        .extension()?
        .to_str()?
        .to_ascii_lowercase();
    BACKGROUND_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

/// Keeps the current background's stem so a new upload replaces it.
pub fn background_file_name(current: Option<&str>, extension: &str) -> String {
    let stem = current
        .and_then(|name| Path::new(name).file_stem())
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .unwrap_or(DEFAULT_BACKGROUND_STEM);
    format!("{}.{}", stem, extension)
}

/// `POST /admin/settings`. Changes apply to the running process only.
pub async fn update_settings(State(app_state): State<AppState>, mut multipart: Multipart) -> Response {
    let form = match read_form(&mut multipart).await {
        Ok(form) => form,
        Err(e) => {
            warn!("Failed to read settings form: {}", e);
            return Flash::danger(format!("Could not read the settings form: {}", e))
                .redirect("/admin");
        }
    };

    let mut updated = Vec::new();
    let mut problems = Vec::new();

    if let Some(name) = form.app_name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
        let mut display = app_state.display.write().await;
        if display.app_name != name {
            display.app_name = name.to_string();
            updated.push("application name");
        }
    }

    if let Some((file_name, bytes)) = form.background_image {
        match background_extension(&file_name) {
            None => problems.push(format!(
                "\"{}\" is not a valid background type (use {})",
                file_name,
                BACKGROUND_EXTENSIONS.join(", ")
            )),
            Some(ext) => {
                let current = app_state.display.read().await.background_image.clone();
                let new_name = background_file_name(current.as_deref(), &ext);
                let dir = app_state.collections.background_dir();

                let saved = async {
                    tokio::fs::create_dir_all(&dir).await?;
                    tokio::fs::write(dir.join(&new_name), &bytes).await
                }
                .await;

                match saved {
                    Ok(()) => {
                        info!("Saved background image as {:?}", dir.join(&new_name));
                        app_state.display.write().await.background_image = Some(new_name);
                        updated.push("background image");
                    }
                    Err(e) => {
                        error!("Failed to save background image {}: {}", new_name, e);
                        problems.push(format!("Failed to save background image: {}", e));
                    }
                }
            }
        }
    }

    if let Some(input) = form.background_opacity.as_deref().filter(|v| !v.trim().is_empty()) {
        match parse_opacity(input) {
            Ok(opacity) => {
                let mut display = app_state.display.write().await;
                if (display.background_opacity - opacity).abs() > 1e-5 {
                    display.background_opacity = opacity;
                    updated.push("background opacity");
                }
            }
            Err(message) => problems.push(message.to_string()),
        }
    }

    let flash = match (updated.is_empty(), problems.is_empty()) {
        (true, true) => Flash::info("No settings changed"),
        (false, true) => Flash::success(format!(
            "Updated {} for this session; edit config.toml to make it permanent",
            updated.join(", ")
        )),
        (true, false) => Flash::danger(problems.join("; ")),
        (false, false) => Flash::new(
            FlashLevel::Warning,
            format!("Updated {}; {}", updated.join(", "), problems.join("; ")),
        ),
    };

    flash.redirect("/admin")
}
