use axum::response::{IntoResponse, Redirect, Response};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    #[default]
    Info,
    Warning,
    Danger,
}

#[derive(Debug, Serialize)]
pub struct FlashView<'a> {
    level: FlashLevel,
    msg: &'a str,
}

/// One-shot feedback message carried on the redirect URL as
/// `?level=...&msg=...`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Flash {
    #[serde(default)]
    pub level: FlashLevel,
    #[serde(default)]
    pub msg: Option<String>,
}

impl Flash {
    pub fn new(level: FlashLevel, msg: impl Into<String>) -> Self {
        Self {
            level,
            msg: Some(msg.into()),
        }
    }

    pub fn success(msg: impl Into<String>) -> Self {
        Self::new(FlashLevel::Success, msg)
    }

    pub fn warning(msg: impl Into<String>) -> Self {
        Self::new(FlashLevel::Warning, msg)
    }

    pub fn danger(msg: impl Into<String>) -> Self {
        Self::new(FlashLevel::Danger, msg)
    }

    pub fn info(msg: impl Into<String>) -> Self {
        Self::new(FlashLevel::Info, msg)
    }

    /// `path` with the message appended as query parameters.
    pub fn location(&self, path: &str) -> String {
        let Some(msg) = self.msg.as_deref() else {
            return path.to_string();
        };
        let level = match self.level {
            FlashLevel::Success => "success",
            FlashLevel::Info => "info",
            FlashLevel::Warning => "warning",
            FlashLevel::Danger => "danger",
        };
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("level", level)
            .append_pair("msg", msg)
            .finish();
        format!("{}?{}", path, query)
    }

    pub fn redirect(&self, path: &str) -> Response {
        Redirect::to(&self.location(path)).into_response()
    }

    /// Template view: `nil` when there is no message.
    pub fn for_template(&self) -> Option<FlashView<'_>> {
        let msg = self.msg.as_deref().filter(|m| !m.is_empty())?;
        Some(FlashView {
            level: self.level,
            msg,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_encodes_message() {
        let flash = Flash::success("Collection \"cats\" created & ready");
        assert_eq!(
            flash.location("/admin"),
            "/admin?level=success&msg=Collection+%22cats%22+created+%26+ready"
        );
        assert_eq!(Flash::default().location("/admin"), "/admin");
    }

    #[test]
    fn test_flash_parses_from_query() {
        let flash: Flash = parse_query("level=danger&msg=Nope");
        assert_eq!(flash, Flash::danger("Nope"));

        let flash: Flash = parse_query("");
        assert_eq!(flash.level, FlashLevel::Info);
        assert!(flash.for_template().is_none());
    }

    fn parse_query(query: &str) -> Flash {
        let uri: axum::http::Uri = format!("/admin?{}", query).parse().unwrap();
        axum::extract::Query::<Flash>::try_from_uri(&uri).unwrap().0
    }
}
