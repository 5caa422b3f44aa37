//! RDAP response parsing.

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::types::RegistrationRecord;

/// Status values (normalized: lowercase, no spaces) that lock transfers.
const TRANSFER_LOCK_STATUSES: &[&str] = &["clienttransferprohibited", "servertransferprohibited"];

/// Converts an RDAP domain object into a [`RegistrationRecord`].
pub(crate) fn parse_rdap_domain(
    domain: &str,
    source: &str,
    body: &Value,
    include_raw: bool,
) -> RegistrationRecord {
    let status: Vec<String> = body
        .get("status")
        .and_then(Value::as_array)
        .map(|values| {
            values
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let transfer_locked = status.iter().any(|s| {
        let normalized: String = s.to_lowercase().split_whitespace().collect();
        TRANSFER_LOCK_STATUSES.contains(&normalized.as_str())
    });

    RegistrationRecord {
        domain: domain.to_string(),
        registrar: extract_registrar(body),
        creation_date: event_date(body, "registration"),
        expiration_date: event_date(body, "expiration"),
        updated_date: event_date(body, "last changed"),
        nameservers: extract_nameservers(body),
        status,
        transfer_locked,
        source: source.to_string(),
        raw: include_raw.then(|| body.clone()),
    }
}

/// The vCard `fn` of the first entity with role `registrar`.
fn extract_registrar(body: &Value) -> Option<String> {
    let entities = body.get("entities")?.as_array()?;
    entities
        .iter()
        .filter(|entity| {
            entity
                .get("roles")
                .and_then(Value::as_array)
                .is_some_and(|roles| roles.iter().any(|r| r.as_str() == Some("registrar")))
        })
        .find_map(vcard_full_name)
}

/// Reads `["fn", {}, "text", "<name>"]` out of a jCard `vcardArray`.
fn vcard_full_name(entity: &Value) -> Option<String> {
    let properties = entity.get("vcardArray")?.as_array()?.get(1)?.as_array()?;
    properties.iter().find_map(|property| {
        let property = property.as_array()?;
        if property.first()?.as_str()? != "fn" {
            return None;
        }
        let name = property.get(3)?.as_str()?.trim();
        (!name.is_empty()).then(|| name.to_string())
    })
}

fn event_date(body: &Value, action: &str) -> Option<DateTime<Utc>> {
    body.get("events")?
        .as_array()?
        .iter()
        .filter(|event| {
            event
                .get("eventAction")
                .and_then(Value::as_str)
                .is_some_and(|a| a.eq_ignore_ascii_case(action))
        })
        .find_map(|event| parse_date_string(event.get("eventDate")?.as_str()?))
}

fn extract_nameservers(body: &Value) -> Vec<String> {
    let mut nameservers: Vec<String> = body
        .get("nameservers")
        .and_then(Value::as_array)
        .map(|servers| {
            servers
                .iter()
                .filter_map(|ns| ns.get("ldhName").and_then(Value::as_str))
                .map(|name| name.trim().trim_end_matches('.').to_lowercase())
                .filter(|name| !name.is_empty())
                .collect()
        })
        .unwrap_or_default();
    nameservers.sort();
    nameservers.dedup();
    nameservers
}

/// Attempts to parse a date string in various formats.
///
/// RDAP mandates RFC 3339, but registries in the wild also emit the looser
/// forms below.
pub(crate) fn parse_date_string(date_str: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(date_str) {
        return Some(dt.with_timezone(&Utc));
    }

    let formats = [
        "%Y-%m-%dT%H:%M:%S%.fZ",
        "%Y-%m-%dT%H:%M:%SZ",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d",
        "%d-%b-%Y",
        "%d/%m/%Y",
    ];

    for format in &formats {
        if let Ok(naive_dt) = chrono::NaiveDateTime::parse_from_str(date_str, format) {
            return Some(naive_dt.and_utc());
        }
        if let Ok(naive_date) = chrono::NaiveDate::parse_from_str(date_str, format) {
            return Some(naive_date.and_hms_opt(0, 0, 0)?.and_utc());
        }
    }

    None
}
