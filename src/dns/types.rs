//! DNS data structures.

use serde::{Deserialize, Serialize};

use crate::providers::ProviderRef;

/// Record types the acquisition engine asks for.
///
/// Declaration order is the order records of different types are sorted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordType {
    A,
    #[serde(rename = "AAAA")]
    Aaaa,
    Mx,
    Txt,
    Ns,
}

impl RecordType {
    /// Every type queried by a full resolution.
    pub const ALL: [RecordType; 5] = [
        RecordType::A,
        RecordType::Aaaa,
        RecordType::Mx,
        RecordType::Txt,
        RecordType::Ns,
    ];

    /// Types queried when only addresses are needed.
    pub const ADDRESSES: [RecordType; 2] = [RecordType::A, RecordType::Aaaa];

    /// RFC 1035 / RFC 3596 type code.
    pub fn code(&self) -> u16 {
        match self {
            RecordType::A => 1,
            RecordType::Ns => 2,
            RecordType::Mx => 15,
            RecordType::Txt => 16,
            RecordType::Aaaa => 28,
        }
    }

    /// Mnemonic used in the DoH `type` query parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
            RecordType::Mx => "MX",
            RecordType::Txt => "TXT",
            RecordType::Ns => "NS",
        }
    }
}

impl std::fmt::Display for RecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One normalized DNS answer.
///
/// Names are lowercase without a trailing dot. TXT values keep their case;
/// every other value is lowercase. Uniqueness is (type, name, value, priority).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsAnswer {
    #[serde(rename = "type")]
    pub record_type: RecordType,
    pub name: String,
    pub value: String,
    pub ttl: u32,
    /// MX preference; `None` for every other type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u16>,
    /// Known provider behind the answer (CDN edge for A/AAAA, operator for MX/NS)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderRef>,
}

impl DnsAnswer {
    /// The identity used for deduplication.
    pub fn key(&self) -> (RecordType, &str, &str, Option<u16>) {
        (self.record_type, &self.name, &self.value, self.priority)
    }
}

/// Result of resolving one domain against one provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsResolution {
    pub records: Vec<DnsAnswer>,
    /// Name of the provider whose answers were kept
    #[serde(rename = "resolver")]
    pub resolver_used: String,
}

impl DnsResolution {
    /// Smallest TTL among the records, used as the cache lifetime hint.
    pub fn min_ttl(&self) -> Option<u32> {
        self.records.iter().map(|r| r.ttl).min()
    }

    pub fn of_type(&self, record_type: RecordType) -> impl Iterator<Item = &DnsAnswer> {
        self.records
            .iter()
            .filter(move |r| r.record_type == record_type)
    }
}

/// Wire shape of a DoH JSON response (`application/dns-json`).
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct DohResponse {
    #[serde(rename = "Status")]
    pub(crate) status: u32,
    #[serde(rename = "Answer", default)]
    pub(crate) answer: Vec<DohAnswer>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct DohAnswer {
    #[serde(default)]
    pub(crate) name: String,
    #[serde(rename = "type")]
    pub(crate) record_type: u16,
    #[serde(rename = "TTL", default)]
    pub(crate) ttl: u32,
    #[serde(default)]
    pub(crate) data: String,
}
