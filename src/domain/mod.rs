//! Domain name normalization.
//!
//! Users paste all sorts of things into a domain field: bare names, full URLs,
//! names with trailing dots or mixed case, internationalized names. Everything
//! downstream (DoH queries, cache keys, RDAP lookups) works on the single
//! canonical form produced here.

use url::{Host, Url};

use crate::error_handling::{ClassifiedError, ErrorKind};

/// Maximum length of a DNS name in presentation form.
const MAX_DOMAIN_LENGTH: usize = 253;

/// Normalizes user input into a lowercase, ASCII (punycode) domain name.
///
/// Accepts a bare name (`Example.COM.`) or a URL (`https://example.com/path`).
///
/// # Errors
///
/// Returns `invalid_url` if the input is empty, is an IP literal, has no dot,
/// or is not a valid host name.
pub fn normalize_domain(input: &str) -> Result<String, ClassifiedError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ClassifiedError::new(ErrorKind::InvalidUrl, "empty domain"));
    }

    let host_part = if trimmed.contains("://") {
        let url = Url::parse(trimmed).map_err(|e| {
            ClassifiedError::new(ErrorKind::InvalidUrl, format!("{trimmed}: {e}"))
        })?;
        url.host_str()
            .ok_or_else(|| ClassifiedError::new(ErrorKind::InvalidUrl, "URL has no host"))?
            .to_string()
    } else {
        trimmed
            .split(['/', '?', '#'])
            .next()
            .unwrap_or_default()
            .to_string()
    };

    let without_dot = host_part.trim_end_matches('.');
    // Host::parse applies IDNA processing and lowercases.
    let host = Host::parse(without_dot).map_err(|e| {
        ClassifiedError::new(ErrorKind::InvalidUrl, format!("{without_dot}: {e}"))
    })?;

    let domain = match host {
        Host::Domain(d) => d,
        Host::Ipv4(_) | Host::Ipv6(_) => {
            return Err(ClassifiedError::new(
                ErrorKind::InvalidUrl,
                format!("IP addresses are not domains: {without_dot}"),
            ))
        }
    };

    if !domain.contains('.') || domain.len() > MAX_DOMAIN_LENGTH {
        return Err(ClassifiedError::new(
            ErrorKind::InvalidUrl,
            format!("not a fully qualified domain: {domain}"),
        ));
    }
    if domain
        .split('.')
        .any(|label| label.is_empty() || label.len() > 63 || label.starts_with('-'))
    {
        return Err(ClassifiedError::new(
            ErrorKind::InvalidUrl,
            format!("malformed label in {domain}"),
        ));
    }

    Ok(domain)
}

/// Returns the top-level label of an already normalized domain.
pub fn registrable_tld(domain: &str) -> &str {
    domain
        .trim_end_matches('.')
        .rsplit('.')
        .next()
        .unwrap_or(domain)
}
