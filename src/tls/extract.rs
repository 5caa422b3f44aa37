//! Certificate extraction utilities.

use chrono::{DateTime, Utc};
use x509_parser::certificate::X509Certificate;
use x509_parser::extensions::{GeneralName, ParsedExtension};
use x509_parser::time::ASN1Time;

use super::types::CertificateNode;
use crate::error_handling::{ClassifiedError, ErrorKind};
use crate::providers::ProviderCatalog;

/// Parses one DER certificate into a [`CertificateNode`].
///
/// # Errors
///
/// `tls_error` when the DER does not parse or carries an unrepresentable date.
pub(crate) fn node_from_der(
    der: &[u8],
    catalog: &dyn ProviderCatalog,
) -> Result<CertificateNode, ClassifiedError> {
    let (_, cert) = x509_parser::parse_x509_certificate(der).map_err(|e| {
        ClassifiedError::new(ErrorKind::TlsError, format!("unparseable certificate: {e}"))
    })?;
    let tbs = &cert.tbs_certificate;

    let issuer = tbs.issuer.to_string();
    Ok(CertificateNode {
        subject: tbs.subject.to_string(),
        issuer_provider: catalog.match_provider(&issuer),
        issuer,
        sans: extract_certificate_sans(&cert),
        not_before: to_utc(tbs.validity.not_before)?,
        not_after: to_utc(tbs.validity.not_after)?,
        serial: tbs.raw_serial_as_string(),
    })
}

fn to_utc(time: ASN1Time) -> Result<DateTime<Utc>, ClassifiedError> {
    DateTime::from_timestamp(time.timestamp(), 0).ok_or_else(|| {
        ClassifiedError::new(
            ErrorKind::TlsError,
            format!("certificate date out of range: {}", time.timestamp()),
        )
    })
}

/// Extracts the DNS names from the Subject Alternative Name extension.
///
/// IP addresses, e-mail addresses and other name forms are ignored.
pub(crate) fn extract_certificate_sans(cert: &X509Certificate<'_>) -> Vec<String> {
    let mut sans = Vec::new();

    for ext in cert.extensions() {
        if let ParsedExtension::SubjectAlternativeName(san) = ext.parsed_extension() {
            for general_name in &san.general_names {
                if let GeneralName::DNSName(dns_name) = general_name {
                    let name = dns_name.to_lowercase();
                    if !sans.contains(&name) {
                        sans.push(name);
                    }
                }
            }
        }
    }

    sans
}
