use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

/// The persisted JSON document: named endpoints plus the shared base tag.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigDocument {
    #[serde(default, deserialize_with = "null_as_default")]
    pub api_urls: BTreeMap<String, Endpoint>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub base_tag: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    #[serde(default, deserialize_with = "lenient_string")]
    pub url: String,
    /// `None` marks a disabled endpoint.
    #[serde(
        default,
        deserialize_with = "deserialize_method",
        skip_serializing_if = "Option::is_none"
    )]
    pub method: Option<Method>,
    #[serde(
        default,
        deserialize_with = "deserialize_construction",
        skip_serializing_if = "Option::is_none"
    )]
    pub url_construction: Option<UrlConstruction>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub query_params: Vec<QueryParam>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub proxy_settings: ProxySettings,
    #[serde(default, deserialize_with = "lenient_string")]
    pub group: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub model_name: String,
}

impl Endpoint {
    /// Declared default for the parameter called `name`, if any.
    pub fn param_default(&self, name: &str) -> Option<String> {
        self.query_params
            .iter()
            .find(|p| p.name == name)
            .and_then(QueryParam::default_string)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Redirect,
    Proxy,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Redirect => "redirect",
            Method::Proxy => "proxy",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UrlConstruction {
    #[serde(rename = "special_forward")]
    SpecialForward,
    #[serde(rename = "special_pollinations")]
    SpecialPollinations,
    #[serde(rename = "special_draw_redirect")]
    SpecialDrawRedirect,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryParam {
    #[serde(deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<serde_json::Value>,
    #[serde(
        default,
        deserialize_with = "deserialize_valid_values",
        skip_serializing_if = "Option::is_none"
    )]
    pub valid_values: Option<Vec<String>>,
}

impl QueryParam {
    /// The default rendered as a query-string value. Scalars keep their
    /// natural text form, anything else falls back to compact JSON.
    pub fn default_string(&self) -> Option<String> {
        match self.default_value.as_ref()? {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    pub fn allowed_values(&self) -> Option<&[String]> {
        self.valid_values
            .as_deref()
            .filter(|values| !values.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxySettings {
    #[serde(
        default,
        deserialize_with = "lenient_optional_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub image_url_field: Option<String>,
    #[serde(default)]
    pub fallback_action: FallbackAction,
    #[serde(
        default,
        deserialize_with = "lenient_optional_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub image_url_field_from_param_default: Option<String>,
}

impl ProxySettings {
    pub fn image_url_field(&self) -> Option<&str> {
        self.image_url_field.as_deref().filter(|f| !f.is_empty())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FallbackAction {
    Error,
    #[default]
    ReturnJson,
}

impl Serialize for FallbackAction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(match self {
            FallbackAction::Error => "error",
            FallbackAction::ReturnJson => "returnJson",
        })
    }
}

impl<'de> Deserialize<'de> for FallbackAction {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = lenient_optional_string(deserializer)?;
        Ok(match raw.as_deref() {
            Some("error") => FallbackAction::Error,
            _ => FallbackAction::ReturnJson,
        })
    }
}

fn deserialize_method<'de, D>(deserializer: D) -> Result<Option<Method>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = lenient_optional_string(deserializer)?;
    Ok(match raw.as_deref() {
        None | Some("") => None,
        Some("proxy") => Some(Method::Proxy),
        Some(_) => Some(Method::Redirect),
    })
}

fn deserialize_construction<'de, D>(deserializer: D) -> Result<Option<UrlConstruction>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = lenient_optional_string(deserializer)?;
    Ok(match raw.as_deref() {
        Some("special_forward") => Some(UrlConstruction::SpecialForward),
        Some("special_pollinations") => Some(UrlConstruction::SpecialPollinations),
        Some("special_draw_redirect") => Some(UrlConstruction::SpecialDrawRedirect),
        _ => None,
    })
}

/// Text form of a JSON scalar. Arrays and objects have none.
fn scalar_to_string(value: serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// `null` reads as the type's default, so hand-edited documents with
/// explicit nulls still load.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Strings that may also be written as `null`, a number or a boolean.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_optional_string(deserializer)?.unwrap_or_default())
}

fn lenient_optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    scalar_to_string(value)
        .map(Some)
        .ok_or_else(|| serde::de::Error::custom("expected a string or scalar"))
}

/// Allowed values compare as strings against the query, so numeric entries
/// such as `[512, 1024]` are kept in their text form.
fn deserialize_valid_values<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<serde_json::Value>>::deserialize(deserializer)?;
    Ok(raw.map(|values| values.into_iter().filter_map(scalar_to_string).collect()))
}
