use crate::config_store::Endpoint;
use std::collections::HashMap;

/// Resolves the endpoint's declared query parameters against the request.
///
/// Supplied values must be in the parameter's allow-list when it has one,
/// required parameters must be present, and absent optional parameters take
/// their declared default. Every problem is collected, not just the first.
/// The result keeps the declaration order.
pub fn resolve_params(
    endpoint: &Endpoint,
    query: &HashMap<String, String>,
) -> Result<Vec<(String, String)>, Vec<String>> {
    let mut resolved = Vec::new();
    let mut errors = Vec::new();

    for param in &endpoint.query_params {
        match query.get(&param.name) {
            Some(value) => match param.allowed_values() {
                Some(allowed) if !allowed.contains(value) => {
                    errors.push(format!("Invalid value for '{}'", param.name));
                }
                _ => resolved.push((param.name.clone(), value.clone())),
            },
            None if param.required => {
                errors.push(format!("Missing required parameter: {}", param.name));
            }
            None => {
                if let Some(default) = param.default_string() {
                    resolved.push((param.name.clone(), default));
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(resolved)
    } else {
        Err(errors)
    }
}

/// Appends form-encoded parameters to `base`, joining with `&` when the URL
/// already carries a query string.
pub fn append_query(base: &str, params: &[(String, String)]) -> String {
    if params.is_empty() {
        return base.to_string();
    }

    let encoded = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params)
        .finish();
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{}{}{}", base, separator, encoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config_store::QueryParam;

    fn param(name: &str) -> QueryParam {
        QueryParam {
            name: name.to_string(),
            ..Default::default()
        }
    }

    fn query(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_collects_every_error() {
        let endpoint = Endpoint {
            query_params: vec![
                QueryParam {
                    required: true,
                    ..param("size")
                },
                QueryParam {
                    valid_values: Some(vec!["a".to_string(), "b".to_string()]),
                    ..param("style")
                },
                QueryParam {
                    required: true,
                    ..param("seed")
                },
            ],
            ..Default::default()
        };

        let errors = resolve_params(&endpoint, &query(&[("style", "c")])).unwrap_err();
        assert_eq!(
            errors,
            vec![
                "Missing required parameter: size",
                "Invalid value for 'style'",
                "Missing required parameter: seed",
            ]
        );
    }

    #[test]
    fn test_defaults_fill_absent_optional_params() {
        let endpoint = Endpoint {
            query_params: vec![
                QueryParam {
                    default_value: Some(serde_json::json!("square")),
                    ..param("shape")
                },
                QueryParam {
                    default_value: Some(serde_json::json!(4)),
                    ..param("count")
                },
                param("unset"),
            ],
            ..Default::default()
        };

        let resolved = resolve_params(&endpoint, &query(&[("shape", "wide"), ("extra", "1")]))
            .unwrap();
        assert_eq!(
            resolved,
            vec![
                ("shape".to_string(), "wide".to_string()),
                ("count".to_string(), "4".to_string()),
            ]
        );
    }

    #[test]
    fn test_empty_allow_list_accepts_anything() {
        let endpoint = Endpoint {
            query_params: vec![QueryParam {
                valid_values: Some(Vec::new()),
                ..param("style")
            }],
            ..Default::default()
        };

        assert!(resolve_params(&endpoint, &query(&[("style", "zzz")])).is_ok());
    }

    #[test]
    fn test_append_query() {
        let params = vec![
            ("style".to_string(), "a".to_string()),
            ("q".to_string(), "two words&more".to_string()),
        ];

        assert_eq!(
            append_query("https://api.example.com/gen", &params),
            "https://api.example.com/gen?style=a&q=two+words%26more"
        );
        assert_eq!(
            append_query("https://api.example.com/gen?key=1", &params[..1]),
            "https://api.example.com/gen?key=1&style=a"
        );
        assert_eq!(
            append_query("https://api.example.com/gen", &[]),
            "https://api.example.com/gen"
        );
    }
}
