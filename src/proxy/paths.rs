//! Path patterns and location rewriting for the session protocol.
//!
//! Creation requests are recognized by an exact path match. Session ids are
//! taken from the first `/session/<id>` segment whose id is `[a-z0-9]+` and
//! is followed by `/`, `?` or the end of the path.

use http::uri::{Authority, PathAndQuery, Scheme};
use http::{Method, Uri};

use crate::dispatch::BackendEndpoint;

/// Path of the new-session endpoint, on the proxy and on every backend.
pub const CREATE_SESSION_PATH: &str = "/wd/hub/session";

const SESSION_SEGMENT: &str = "/session/";

/// Returns whether a request opens a new session.
pub fn is_create_session(method: &Method, path: &str) -> bool {
    method == Method::POST && path == CREATE_SESSION_PATH
}

/// Extracts the session id from a request path.
///
/// Returns `None` when no `/session/<id>` segment is present.
pub fn extract_session_id(path: &str) -> Option<&str> {
    for (idx, _) in path.match_indices(SESSION_SEGMENT) {
        let rest = &path[idx + SESSION_SEGMENT.len()..];
        let end = rest
            .find(|c: char| !(c.is_ascii_lowercase() || c.is_ascii_digit()))
            .unwrap_or(rest.len());

        if end == 0 {
            continue;
        }

        // Id must end at a segment boundary, query, or end of path
        match rest[end..].chars().next() {
            None | Some('/') | Some('?') => return Some(&rest[..end]),
            Some(_) => continue,
        }
    }
    None
}

/// Extracts the session id from a `Location` value.
///
/// Only the path component is inspected; absolute and path-only locations
/// are both accepted.
pub fn session_id_from_location(location: &str) -> Option<String> {
    let uri = location.parse::<Uri>().ok()?;
    extract_session_id(uri.path()).map(str::to_string)
}

/// Points a `Location` value at `backend`.
///
/// Replaces the authority with the backend's `host:port`, keeps path and
/// query. Path-only locations gain an `http` scheme.
pub fn rewrite_location(location: &str, backend: &BackendEndpoint) -> Result<Uri, String> {
    let uri = location
        .parse::<Uri>()
        .map_err(|e| format!("invalid location '{}': {}", location, e))?;
    let authority = backend
        .authority()
        .parse::<Authority>()
        .map_err(|e| format!("invalid backend authority '{}': {}", backend, e))?;

    let mut parts = uri.into_parts();
    parts.authority = Some(authority);
    if parts.scheme.is_none() {
        parts.scheme = Some(Scheme::HTTP);
    }
    if parts.path_and_query.is_none() {
        parts.path_and_query = Some(PathAndQuery::from_static("/"));
    }

    Uri::from_parts(parts).map_err(|e| format!("cannot rebuild location '{}': {}", location, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========== Creation Path Matching ==========

    #[test]
    fn test_create_session_exact_post() {
        assert!(is_create_session(&Method::POST, "/wd/hub/session"));
    }

    #[test]
    fn test_create_session_requires_post() {
        assert!(!is_create_session(&Method::GET, "/wd/hub/session"));
        assert!(!is_create_session(&Method::DELETE, "/wd/hub/session"));
    }

    #[test]
    fn test_create_session_requires_exact_path() {
        assert!(!is_create_session(&Method::POST, "/wd/hub/session/"));
        assert!(!is_create_session(&Method::POST, "/wd/hub/session/abc/url"));
        assert!(!is_create_session(&Method::POST, "/wd/hub/sessions"));
    }

    // ========== Session Id Extraction ==========

    #[test]
    fn test_extract_at_end_of_path() {
        assert_eq!(extract_session_id("/wd/hub/session/abc123"), Some("abc123"));
    }

    #[test]
    fn test_extract_before_subpath() {
        assert_eq!(
            extract_session_id("/wd/hub/session/abc123/element/1/click"),
            Some("abc123")
        );
    }

    #[test]
    fn test_extract_before_query() {
        assert_eq!(extract_session_id("/wd/hub/session/abc123?x=1"), Some("abc123"));
    }

    #[test]
    fn test_extract_none_without_session_segment() {
        assert_eq!(extract_session_id("/wd/hub/status"), None);
        assert_eq!(extract_session_id("/wd/hub/session"), None);
        assert_eq!(extract_session_id("/wd/hub/session/"), None);
        assert_eq!(extract_session_id(""), None);
    }

    #[test]
    fn test_extract_rejects_invalid_characters() {
        assert_eq!(extract_session_id("/wd/hub/session/ABC123"), None);
        assert_eq!(extract_session_id("/wd/hub/session/abc-123"), None);
    }

    #[test]
    fn test_extract_uuid_style_id_not_matched() {
        // Dashes fall outside the id alphabet
        assert_eq!(
            extract_session_id("/wd/hub/session/3f2a9c1e-0b7d-4e5f-9a8b-1c2d3e4f5a6b"),
            None
        );
    }

    #[test]
    fn test_extract_skips_to_later_valid_segment() {
        assert_eq!(
            extract_session_id("/x/session/BAD/y/session/good1/url"),
            Some("good1")
        );
    }

    // ========== Location Handling ==========

    #[test]
    fn test_session_id_from_relative_location() {
        assert_eq!(
            session_id_from_location("/wd/hub/session/abc123"),
            Some("abc123".to_string())
        );
    }

    #[test]
    fn test_session_id_from_absolute_location() {
        assert_eq!(
            session_id_from_location("http://127.0.0.1:4723/wd/hub/session/abc123"),
            Some("abc123".to_string())
        );
    }

    #[test]
    fn test_session_id_from_location_without_id() {
        assert_eq!(session_id_from_location("/wd/hub/status"), None);
        assert_eq!(session_id_from_location(""), None);
    }

    #[test]
    fn test_rewrite_relative_location() {
        let backend = BackendEndpoint::new("localhost", 4723);
        let uri = rewrite_location("/wd/hub/session/abc123", &backend).unwrap();
        assert_eq!(uri.to_string(), "http://localhost:4723/wd/hub/session/abc123");
    }

    #[test]
    fn test_rewrite_absolute_location_replaces_authority() {
        let backend = BackendEndpoint::new("10.0.0.5", 4823);
        let uri = rewrite_location("http://proxy.local:7777/wd/hub/session/abc123?a=b", &backend)
            .unwrap();
        assert_eq!(uri.to_string(), "http://10.0.0.5:4823/wd/hub/session/abc123?a=b");
    }

    #[test]
    fn test_rewrite_keeps_https_scheme() {
        let backend = BackendEndpoint::new("grid", 443);
        let uri = rewrite_location("https://old:8443/wd/hub/session/abc", &backend).unwrap();
        assert_eq!(uri.scheme_str(), Some("https"));
        assert_eq!(uri.authority().map(|a| a.as_str()), Some("grid:443"));
    }

    #[test]
    fn test_rewrite_ipv6_backend() {
        let backend = BackendEndpoint::new("::1", 4723);
        let uri = rewrite_location("/wd/hub/session/abc", &backend).unwrap();
        assert_eq!(uri.to_string(), "http://[::1]:4723/wd/hub/session/abc");
    }

    #[test]
    fn test_rewrite_invalid_location() {
        let backend = BackendEndpoint::new("localhost", 4723);
        assert!(rewrite_location("not a uri", &backend).is_err());
    }
}
