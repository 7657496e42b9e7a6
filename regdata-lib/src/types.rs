//! Core data types for registration data resolution.
//!
//! This module defines all the main data structures used throughout the library,
//! including query classification, lookup configuration, parsed WHOIS records,
//! and the unified lookup report.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::net::IpAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::error::RegDataError;

lazy_static::lazy_static! {
    static ref ASN_TOKEN: regex::Regex =
        regex::Regex::new(r"^(?i)(?:as)?([0-9]+)$").expect("static regex");
}

/// The syntactic class of a queried identifier.
///
/// Classification is purely syntactic: RFC-compliant IP parsing first, then a
/// numeric token with an optional `AS` prefix, and everything else is treated
/// as a domain name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryTarget {
    /// A domain name (stored lower-cased)
    Domain(String),
    /// An IPv4 or IPv6 address
    Ip(IpAddr),
    /// An Autonomous System Number
    Asn(u32),
}

impl QueryTarget {
    /// Classify a raw input string into its resolution path.
    pub fn classify(input: &str) -> Self {
        let trimmed = input.trim();
        if let Ok(addr) = IpAddr::from_str(trimmed) {
            return QueryTarget::Ip(addr);
        }
        if let Some(caps) = ASN_TOKEN.captures(trimmed) {
            if let Ok(asn) = caps[1].parse::<u32>() {
                return QueryTarget::Asn(asn);
            }
        }
        QueryTarget::Domain(trimmed.to_lowercase())
    }

    /// The identifier as it goes on the wire (lower-cased, per the WHOIS
    /// request convention).
    pub fn query_string(&self) -> String {
        match self {
            QueryTarget::Domain(name) => name.to_lowercase(),
            QueryTarget::Ip(addr) => addr.to_string(),
            QueryTarget::Asn(asn) => asn.to_string(),
        }
    }

    /// Whether this target is numeric (IP or ASN) for WHOIS discovery purposes.
    pub fn is_numeric(&self) -> bool {
        matches!(self, QueryTarget::Ip(_) | QueryTarget::Asn(_))
    }
}

impl std::fmt::Display for QueryTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.query_string())
    }
}

/// How decode (and encode) failures are handled on the WHOIS wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DecodeErrorMode {
    /// Fail hard on invalid sequences (default)
    #[serde(rename = "strict")]
    #[default]
    Strict,

    /// Substitute invalid sequences with the replacement character
    #[serde(rename = "replace")]
    Replace,

    /// Drop invalid sequences entirely
    #[serde(rename = "ignore")]
    Ignore,
}

/// Which protocol produced the data in a lookup report.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Protocol {
    /// Legacy plaintext protocol on TCP port 43
    #[serde(rename = "whois")]
    Whois,

    /// Registration Data Access Protocol (HTTP/JSON)
    #[serde(rename = "rdap")]
    Rdap,
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Protocol::Whois => write!(f, "WHOIS"),
            Protocol::Rdap => write!(f, "RDAP"),
        }
    }
}

/// Configuration options for registration data lookups.
///
/// This struct allows fine-tuning of the resolution behavior, including
/// per-attempt timeouts, protocol preferences, and wire charsets.
#[derive(Debug, Clone)]
pub struct LookupConfig {
    /// Timeout for each individual candidate attempt (socket or HTTP)
    /// Default: 10 seconds
    pub timeout: Duration,

    /// Whether to fall back to RDAP when WHOIS does not succeed
    /// Default: true
    pub use_rdap: bool,

    /// Skip WHOIS entirely and go straight to RDAP
    /// Default: false
    pub force_rdap: bool,

    /// Explicit WHOIS servers to query, bypassing discovery
    /// Default: none (discovery runs)
    pub servers: Option<Vec<String>>,

    /// Charset label used to encode the outgoing query line
    /// Default: "utf-8"
    pub encode_charset: String,

    /// Charset label used to decode responses; None means statistical
    /// detection per response
    pub decode_charset: Option<String>,

    /// How encode/decode failures are handled
    /// Default: strict
    pub decode_errors: DecodeErrorMode,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            use_rdap: true,
            force_rdap: false,
            servers: None,
            encode_charset: "utf-8".to_string(),
            decode_charset: None,
            decode_errors: DecodeErrorMode::Strict,
        }
    }
}

impl LookupConfig {
    /// Set the per-attempt timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Enable or disable the RDAP fallback.
    pub fn with_rdap_fallback(mut self, enabled: bool) -> Self {
        self.use_rdap = enabled;
        self
    }

    /// Force RDAP-only resolution.
    pub fn with_force_rdap(mut self, enabled: bool) -> Self {
        self.force_rdap = enabled;
        self
    }

    /// Supply explicit WHOIS servers, bypassing discovery.
    pub fn with_servers(mut self, servers: Vec<String>) -> Self {
        self.servers = Some(servers);
        self
    }

    /// Pin the decode charset instead of auto-detecting.
    pub fn with_decode_charset<S: Into<String>>(mut self, charset: S) -> Self {
        self.decode_charset = Some(charset.into());
        self
    }

    /// Set the charset used to encode the outgoing query.
    pub fn with_encode_charset<S: Into<String>>(mut self, charset: S) -> Self {
        self.encode_charset = charset.into();
        self
    }

    /// Set the encode/decode error handling mode.
    pub fn with_decode_errors(mut self, mode: DecodeErrorMode) -> Self {
        self.decode_errors = mode;
        self
    }
}

/// A parsed WHOIS field value: a single string, promoted to a list when the
/// same key repeats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Scalar(String),
    List(Vec<String>),
}

impl FieldValue {
    /// All values as a slice-of-strings view, scalar or list.
    pub fn values(&self) -> Vec<&str> {
        match self {
            FieldValue::Scalar(s) => vec![s.as_str()],
            FieldValue::List(items) => items.iter().map(String::as_str).collect(),
        }
    }
}

/// An ordered mapping of uppercased WHOIS field names to values.
///
/// Insertion order is preserved; a repeated key promotes the existing scalar
/// to a list (never a silent overwrite). Reads are case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedRecord {
    fields: Vec<(String, FieldValue)>,
}

impl ParsedRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value under a (already normalized) key, promoting to a list
    /// on repetition.
    pub fn insert(&mut self, key: &str, value: String) {
        match self.position(key) {
            None => self.fields.push((key.to_string(), FieldValue::Scalar(value))),
            Some(idx) => {
                let slot = &mut self.fields[idx].1;
                match slot {
                    FieldValue::Scalar(existing) => {
                        let first = std::mem::take(existing);
                        *slot = FieldValue::List(vec![first, value]);
                    }
                    FieldValue::List(items) => items.push(value),
                }
            }
        }
    }

    /// Case-insensitive read.
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.position(key).map(|idx| &self.fields[idx].1)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Convert into a JSON object, preserving insertion order.
    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        for (key, value) in &self.fields {
            let json = match value {
                FieldValue::Scalar(s) => Value::String(s.clone()),
                FieldValue::List(items) => {
                    Value::Array(items.iter().cloned().map(Value::String).collect())
                }
            };
            map.insert(key.clone(), json);
        }
        map
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.fields
            .iter()
            .position(|(k, _)| k.eq_ignore_ascii_case(key))
    }
}

impl Serialize for ParsedRecord {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (key, value) in &self.fields {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Result of one full registration data resolution.
///
/// Mirrors the per-call surface the engine guarantees: an overall success
/// flag, the merged/normalized record, the raw bytes of the winning WHOIS
/// response, the servers that were considered, and the last recorded error.
#[derive(Debug, Clone, Serialize)]
pub struct LookupReport {
    /// The identifier that was resolved (as queried, lower-cased)
    pub target: String,

    /// Whether any candidate produced a valid, error-free record
    pub success: bool,

    /// Which protocol produced `data` (None if nothing succeeded)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<Protocol>,

    /// The unified record: WHOIS-style uppercased keys mapping to strings
    /// or lists of strings
    pub data: Map<String, Value>,

    /// The merged raw RDAP document (empty when resolution was WHOIS-only)
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub rdap: Map<String, Value>,

    /// Raw bytes of the last WHOIS response, if any
    #[serde(skip)]
    pub raw: Vec<u8>,

    /// WHOIS servers that were candidates for this resolution
    pub servers: Vec<String>,

    /// Human-readable form of the last recorded error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// The last recorded per-candidate error
    #[serde(skip)]
    pub last_error: Option<RegDataError>,
}

impl LookupReport {
    pub(crate) fn empty(target: String) -> Self {
        Self {
            target,
            success: false,
            protocol: None,
            data: Map::new(),
            rdap: Map::new(),
            raw: Vec::new(),
            servers: Vec::new(),
            error_message: None,
            last_error: None,
        }
    }

    pub(crate) fn record_error(&mut self, error: RegDataError) {
        self.error_message = Some(error.to_string());
        self.last_error = Some(error);
    }

    /// Case-insensitive field read from the unified record.
    pub fn get(&self, key: &str) -> Option<&Value> {
        let upper = key.to_uppercase();
        self.data.get(&upper).or_else(|| self.data.get(key))
    }

    /// Extract the typed convenience summary from the unified record.
    pub fn summary(&self) -> RecordSummary {
        RecordSummary::from_data(&self.data)
    }
}

/// A typed convenience view over the unified record's best-known fields.
///
/// Dates are ISO-8601 strings exactly as the registry supplied them.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RecordSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registry_domain_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registrar_whois_server: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registrar_url: Option<String>,
    pub registrar_name: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registrar_iana_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registrar_abuse_contact_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registrar_abuse_contact_phone: Option<String>,
    pub emails: Vec<String>,
    pub phone_numbers: Vec<String>,
    pub fax_numbers: Vec<String>,
    pub status: Vec<String>,
    pub name_servers: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_date: Option<String>,
}

impl RecordSummary {
    /// Build the summary from a unified record mapping.
    pub fn from_data(data: &Map<String, Value>) -> Self {
        Self {
            registry_domain_id: string_field(data, &["REGISTRY DOMAIN ID"]),
            registrar_whois_server: string_field(data, &["REGISTRAR WHOIS SERVER"]),
            registrar_url: string_field(data, &["REGISTRAR URL"]),
            registrar_name: list_field(data, &["REGISTRAR"]),
            registrar_iana_id: string_field(data, &["REGISTRAR IANA ID"]),
            registrar_abuse_contact_email: string_field(data, &["REGISTRAR ABUSE CONTACT EMAIL"]),
            registrar_abuse_contact_phone: string_field(data, &["REGISTRAR ABUSE CONTACT PHONE"]),
            emails: list_field(data, &["EMAIL", "E-MAIL"]),
            phone_numbers: list_field(data, &["PHONE"]),
            fax_numbers: list_field(data, &["FAX", "FAX-NO"]),
            status: list_field(data, &["DOMAIN STATUS"]),
            name_servers: list_field(data, &["NAME SERVER", "NSERVER"]),
            updated_date: string_field(data, &["UPDATED DATE", "UPDATED", "LAST UPDATED"]),
            creation_date: string_field(data, &["CREATION DATE", "CREATED DATE", "CREATED"]),
            expires_date: string_field(
                data,
                &[
                    "REGISTRY EXPIRY DATE",
                    "EXPIRY DATE",
                    "REGISTRAR REGISTRATION EXPIRATION DATE",
                ],
            ),
        }
    }
}

/// First non-empty string value among the given keys.
fn string_field(data: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    for key in keys {
        match data.get(*key) {
            Some(Value::String(s)) if !s.is_empty() => return Some(s.clone()),
            Some(Value::Array(items)) => {
                if let Some(Value::String(s)) = items.first() {
                    if !s.is_empty() {
                        return Some(s.clone());
                    }
                }
            }
            _ => {}
        }
    }
    None
}

/// Union of all string values among the given keys, in order.
fn list_field(data: &Map<String, Value>, keys: &[&str]) -> Vec<String> {
    let mut out = Vec::new();
    for key in keys {
        match data.get(*key) {
            Some(Value::String(s)) if !s.is_empty() => out.push(s.clone()),
            Some(Value::Array(items)) => {
                for item in items {
                    if let Value::String(s) = item {
                        if !s.is_empty() {
                            out.push(s.clone());
                        }
                    }
                }
            }
            _ => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_ip() {
        assert_eq!(
            QueryTarget::classify("8.8.8.8"),
            QueryTarget::Ip("8.8.8.8".parse().unwrap())
        );
        assert_eq!(
            QueryTarget::classify("2001:db8::1"),
            QueryTarget::Ip("2001:db8::1".parse().unwrap())
        );
    }

    #[test]
    fn test_classify_asn() {
        assert_eq!(QueryTarget::classify("AS15169"), QueryTarget::Asn(15169));
        assert_eq!(QueryTarget::classify("as15169"), QueryTarget::Asn(15169));
        assert_eq!(QueryTarget::classify("15169"), QueryTarget::Asn(15169));
    }

    #[test]
    fn test_classify_domain() {
        assert_eq!(
            QueryTarget::classify("example.org"),
            QueryTarget::Domain("example.org".to_string())
        );
        // Mixed case is normalized for the wire
        assert_eq!(
            QueryTarget::classify("Example.COM"),
            QueryTarget::Domain("example.com".to_string())
        );
        // An AS prefix without digits is not an ASN
        assert_eq!(
            QueryTarget::classify("asdf"),
            QueryTarget::Domain("asdf".to_string())
        );
    }

    #[test]
    fn test_parsed_record_promotion() {
        let mut record = ParsedRecord::new();
        record.insert("NAME SERVER", "ns1.example.com".to_string());
        assert_eq!(
            record.get("name server"),
            Some(&FieldValue::Scalar("ns1.example.com".to_string()))
        );

        record.insert("NAME SERVER", "ns2.example.com".to_string());
        record.insert("NAME SERVER", "ns3.example.com".to_string());
        assert_eq!(
            record.get("NAME SERVER"),
            Some(&FieldValue::List(vec![
                "ns1.example.com".to_string(),
                "ns2.example.com".to_string(),
                "ns3.example.com".to_string(),
            ]))
        );
    }

    #[test]
    fn test_parsed_record_preserves_order() {
        let mut record = ParsedRecord::new();
        record.insert("B", "1".to_string());
        record.insert("A", "2".to_string());
        record.insert("C", "3".to_string());

        let keys: Vec<&str> = record.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["B", "A", "C"]);

        let map = record.to_map();
        let map_keys: Vec<&String> = map.keys().collect();
        assert_eq!(map_keys, vec!["B", "A", "C"]);
    }

    #[test]
    fn test_record_summary_extraction() {
        let mut data = Map::new();
        data.insert(
            "REGISTRAR".to_string(),
            Value::String("Test Registrar".to_string()),
        );
        data.insert(
            "DOMAIN STATUS".to_string(),
            Value::Array(vec![Value::String("active".to_string())]),
        );
        data.insert(
            "NAME SERVER".to_string(),
            Value::Array(vec![
                Value::String("ns1.example.com".to_string()),
                Value::String("ns2.example.com".to_string()),
            ]),
        );
        data.insert(
            "CREATION DATE".to_string(),
            Value::String("1995-08-14T04:00:00Z".to_string()),
        );

        let summary = RecordSummary::from_data(&data);
        assert_eq!(summary.registrar_name, vec!["Test Registrar"]);
        assert_eq!(summary.status, vec!["active"]);
        assert_eq!(summary.name_servers.len(), 2);
        assert_eq!(
            summary.creation_date,
            Some("1995-08-14T04:00:00Z".to_string())
        );
        assert!(summary.expires_date.is_none());
    }

    #[test]
    fn test_lookup_config_builder() {
        let config = LookupConfig::default()
            .with_timeout(Duration::from_secs(5))
            .with_force_rdap(true)
            .with_decode_charset("latin1");

        assert_eq!(config.timeout, Duration::from_secs(5));
        assert!(config.force_rdap);
        assert_eq!(config.decode_charset.as_deref(), Some("latin1"));
        assert_eq!(config.decode_errors, DecodeErrorMode::Strict);
    }
}
