//! Manual redirect handling.

use reqwest::header::{HeaderMap, LOCATION};
use url::Url;

use crate::error_handling::{ClassifiedError, ErrorKind};

/// Statuses followed as redirects (301, 302, 303, 307, 308).
///
/// Other 3xx codes (300, 304, ...) are returned to the caller as results.
pub fn is_redirect_status(status: u16) -> bool {
    matches!(status, 301 | 302 | 303 | 307 | 308)
}

/// Resolves the `Location` header against the current URL.
///
/// # Errors
///
/// `invalid_response` when the header is missing, not valid text, or not a
/// resolvable URL.
pub fn resolve_location(current: &Url, headers: &HeaderMap) -> Result<Url, ClassifiedError> {
    let location = headers
        .get(LOCATION)
        .ok_or_else(|| {
            ClassifiedError::new(
                ErrorKind::InvalidResponse,
                format!("redirect from {current} without a Location header"),
            )
        })?
        .to_str()
        .map_err(|_| {
            ClassifiedError::new(
                ErrorKind::InvalidResponse,
                format!("redirect from {current} has a non-text Location header"),
            )
        })?;

    current.join(location.trim()).map_err(|e| {
        ClassifiedError::new(
            ErrorKind::InvalidResponse,
            format!("redirect from {current} to unparseable location '{location}': {e}"),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn headers(location: &str) -> HeaderMap {
        let mut map = HeaderMap::new();
        map.insert(LOCATION, HeaderValue::from_str(location).unwrap());
        map
    }

    #[test]
    fn test_redirect_statuses() {
        for status in [301, 302, 303, 307, 308] {
            assert!(is_redirect_status(status));
        }
        for status in [200, 300, 304, 305, 404] {
            assert!(!is_redirect_status(status));
        }
    }

    #[test]
    fn test_resolve_relative_location() {
        let current = Url::parse("https://example.com/a/b").unwrap();
        let next = resolve_location(&current, &headers("../c?x=1")).unwrap();
        assert_eq!(next.as_str(), "https://example.com/c?x=1");

        let next = resolve_location(&current, &headers("/root")).unwrap();
        assert_eq!(next.as_str(), "https://example.com/root");
    }

    #[test]
    fn test_resolve_absolute_and_protocol_relative() {
        let current = Url::parse("https://example.com/").unwrap();
        let next = resolve_location(&current, &headers("http://169.254.169.254/")).unwrap();
        assert_eq!(next.host_str(), Some("169.254.169.254"));

        let next = resolve_location(&current, &headers("//cdn.example.net/x")).unwrap();
        assert_eq!(next.as_str(), "https://cdn.example.net/x");
    }

    #[test]
    fn test_missing_location_is_invalid_response() {
        let current = Url::parse("https://example.com/").unwrap();
        let err = resolve_location(&current, &HeaderMap::new()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidResponse);
    }
}
