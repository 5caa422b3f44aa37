//! Answer normalization, deduplication and ordering.

use std::collections::HashSet;
use std::net::IpAddr;

use super::types::{DnsAnswer, DohAnswer, RecordType};
use crate::providers::ProviderCatalog;

/// Converts one raw DoH answer into a [`DnsAnswer`].
///
/// Returns `None` when the answer's type code does not match the requested
/// type (CNAMEs inside an A response, or a malformed upstream), or when the
/// data is unusable (unparseable address, MX with an empty exchange).
pub(crate) fn normalize_answer(
    requested: RecordType,
    fallback_name: &str,
    raw: &DohAnswer,
    catalog: &dyn ProviderCatalog,
) -> Option<DnsAnswer> {
    if raw.record_type != requested.code() {
        return None;
    }

    let name = match strip_dot(&raw.name).to_lowercase() {
        n if n.is_empty() => fallback_name.to_string(),
        n => n,
    };

    let (value, priority, provider) = match requested {
        RecordType::A | RecordType::Aaaa => {
            let ip: IpAddr = raw.data.trim().parse().ok()?;
            let family_ok = match requested {
                RecordType::A => ip.is_ipv4(),
                _ => ip.is_ipv6(),
            };
            if !family_ok {
                return None;
            }
            (ip.to_string(), None, catalog.match_address(ip))
        }
        RecordType::Mx => {
            let (priority, host) = split_mx(&raw.data)?;
            let provider = catalog.match_provider(&host);
            (host, Some(priority), provider)
        }
        RecordType::Ns => {
            let host = strip_dot(raw.data.trim()).to_lowercase();
            if host.is_empty() {
                return None;
            }
            let provider = catalog.match_provider(&host);
            (host, None, provider)
        }
        RecordType::Txt => (unquote_txt(&raw.data), None, None),
    };

    Some(DnsAnswer {
        record_type: requested,
        name,
        value,
        ttl: raw.ttl,
        priority,
        provider,
    })
}

fn strip_dot(s: &str) -> &str {
    s.strip_suffix('.').unwrap_or(s)
}

/// Splits `"10 mail.example.com."` into `(10, "mail.example.com")`.
///
/// A null MX (`"0 ."`, RFC 7505) or a missing host yields `None`.
pub(crate) fn split_mx(data: &str) -> Option<(u16, String)> {
    let mut parts = data.split_whitespace();
    let priority = parts.next()?.parse::<u16>().ok()?;
    let host = strip_dot(parts.next().unwrap_or_default()).to_lowercase();
    if host.is_empty() {
        return None;
    }
    Some((priority, host))
}

/// Joins the character-strings of a TXT record.
///
/// Some providers return `"\"v=spf1 \" \"-all\""` (quoted, possibly split into
/// several strings), others the bare text. Both become `v=spf1 -all`.
pub(crate) fn unquote_txt(data: &str) -> String {
    let trimmed = data.trim();
    if !trimmed.starts_with('"') {
        return trimmed.to_string();
    }

    let mut out = String::with_capacity(trimmed.len());
    let mut in_quotes = false;
    let mut chars = trimmed.chars();
    while let Some(c) = chars.next() {
        match (c, in_quotes) {
            ('"', _) => in_quotes = !in_quotes,
            ('\\', true) => {
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            }
            (c, true) => out.push(c),
            // Whitespace between character-strings is not part of the value.
            (_, false) => {}
        }
    }
    out
}

/// Deduplicates by (type, name, value, priority) and sorts.
///
/// Types are ordered A, AAAA, MX, TXT, NS. MX sorts by priority then value;
/// every other type by value. The result is a fixed point: running it again on
/// its own output returns the same list.
pub fn dedupe_and_sort(records: Vec<DnsAnswer>) -> Vec<DnsAnswer> {
    let mut seen = HashSet::new();
    let mut unique: Vec<DnsAnswer> = records
        .into_iter()
        .filter(|r| {
            seen.insert((
                r.record_type,
                r.name.clone(),
                r.value.clone(),
                r.priority,
            ))
        })
        .collect();

    unique.sort_by(|a, b| {
        a.record_type
            .cmp(&b.record_type)
            .then_with(|| match a.record_type {
                RecordType::Mx => a.priority.cmp(&b.priority),
                _ => std::cmp::Ordering::Equal,
            })
            .then_with(|| a.value.cmp(&b.value))
            .then_with(|| a.name.cmp(&b.name))
    });
    unique
}
