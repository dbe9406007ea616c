//! Caller identity and target table, read from the request.

use axum::http::HeaderMap;
use common::protocol::{APP_KEY_HEADER, APP_NAME_HEADER};
use common::ServiceError;

use crate::access::normalize_table_name;

/// The `(app name, app key)` pair presented by a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub app_name: String,
    pub app_key: String,
}

/// First value of `name`, if present, valid UTF-8, and non-empty.
fn first_header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
}

impl Identity {
    /// Read both identity headers.
    ///
    /// # Errors
    ///
    /// [`ServiceError::Forbidden`] if either header is missing.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, ServiceError> {
        match (
            first_header(headers, APP_NAME_HEADER),
            first_header(headers, APP_KEY_HEADER),
        ) {
            (Some(app_name), Some(app_key)) => Ok(Self {
                app_name: app_name.to_owned(),
                app_key: app_key.to_owned(),
            }),
            _ => Err(ServiceError::Forbidden(
                "the application name and application key both need to be specified with the request"
                    .into(),
            )),
        }
    }
}

/// Normalize the table segment of a request path.
///
/// # Errors
///
/// [`ServiceError::NotFound`] if nothing usable remains (empty or `*`).
pub fn target_table(raw: &str) -> Result<String, ServiceError> {
    let table = normalize_table_name(raw);
    if table.is_empty() {
        return Err(ServiceError::NotFound(
            "the table name must be specified with the request".into(),
        ));
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn both_headers_required() {
        let mut headers = HeaderMap::new();
        headers.insert(APP_NAME_HEADER, HeaderValue::from_static("app1"));
        assert!(matches!(
            Identity::from_headers(&headers),
            Err(ServiceError::Forbidden(_))
        ));
        headers.insert(APP_KEY_HEADER, HeaderValue::from_static("k"));
        let id = Identity::from_headers(&headers).unwrap();
        assert_eq!(id.app_name, "app1");
        assert_eq!(id.app_key, "k");
    }

    #[test]
    fn first_value_wins() {
        let mut headers = HeaderMap::new();
        headers.append(APP_NAME_HEADER, HeaderValue::from_static("first"));
        headers.append(APP_NAME_HEADER, HeaderValue::from_static("second"));
        headers.insert(APP_KEY_HEADER, HeaderValue::from_static("k"));
        assert_eq!(Identity::from_headers(&headers).unwrap().app_name, "first");
    }

    #[test]
    fn empty_header_counts_as_missing() {
        let mut headers = HeaderMap::new();
        headers.insert(APP_NAME_HEADER, HeaderValue::from_static(""));
        headers.insert(APP_KEY_HEADER, HeaderValue::from_static("k"));
        assert!(Identity::from_headers(&headers).is_err());
    }

    #[test]
    fn table_is_lowercased_and_wildcard_rejected() {
        assert_eq!(target_table("Widgets").unwrap(), "widgets");
        assert!(matches!(target_table("*"), Err(ServiceError::NotFound(_))));
    }
}
