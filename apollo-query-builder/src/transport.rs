//! HTTP plumbing shared by schema introspection and query execution.
use http::HeaderMap;
use http::HeaderName;
use http::HeaderValue;
use indexmap::IndexMap;

use crate::error::QueryBuilderError;

/// Convert caller supplied headers, rejecting names and values HTTP cannot carry.
pub(crate) fn header_map(headers: &IndexMap<String, String>) -> Result<HeaderMap, QueryBuilderError> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let header_name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|error| QueryBuilderError::InvalidHeader {
                name: name.clone(),
                reason: error.to_string(),
            })?;
        let header_value =
            HeaderValue::from_str(value).map_err(|error| QueryBuilderError::InvalidHeader {
                name: name.clone(),
                reason: error.to_string(),
            })?;
        map.insert(header_name, header_value);
    }
    Ok(map)
}

/// Session headers layered over the configured defaults. Names compare case-insensitively.
pub(crate) fn merge_headers(
    defaults: &IndexMap<String, String>,
    overrides: IndexMap<String, String>,
) -> IndexMap<String, String> {
    let mut merged = defaults.clone();
    for (name, value) in overrides {
        merged.retain(|existing, _| !existing.eq_ignore_ascii_case(&name));
        merged.insert(name, value);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_headers() {
        let headers = IndexMap::from_iter([("bad header".to_string(), "x".to_string())]);
        assert!(matches!(
            header_map(&headers),
            Err(QueryBuilderError::InvalidHeader { .. })
        ));
        let headers = IndexMap::from_iter([("x-token".to_string(), "line\nbreak".to_string())]);
        assert!(header_map(&headers).is_err());
    }

    #[test]
    fn overrides_replace_defaults_case_insensitively() {
        let defaults = IndexMap::from_iter([
            ("Authorization".to_string(), "Bearer default".to_string()),
            ("x-client".to_string(), "builder".to_string()),
        ]);
        let overrides =
            IndexMap::from_iter([("authorization".to_string(), "Bearer session".to_string())]);
        let merged = merge_headers(&defaults, overrides);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged["authorization"], "Bearer session");
        assert_eq!(merged["x-client"], "builder");
    }
}
