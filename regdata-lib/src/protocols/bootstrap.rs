//! IANA bootstrap registry matching (RFC 7484).
//!
//! A bootstrap document maps selector ranges — ASN ranges, IP networks, or
//! domain suffixes — to the RDAP base URLs authoritative for them. This
//! module parses the four IANA documents into immutable service lists and
//! answers "which base URLs should I query for this identifier".

use std::net::IpAddr;
use std::time::Duration;

use cidr::IpCidr;
use serde_json::Value;

use crate::error::RegDataError;
use crate::Result;

/// Which bootstrap document a registry was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapKind {
    Asn,
    Ipv4,
    Ipv6,
    Dns,
}

impl BootstrapKind {
    /// The published IANA location of this document.
    pub fn iana_url(&self) -> &'static str {
        match self {
            BootstrapKind::Asn => "https://data.iana.org/rdap/asn.json",
            BootstrapKind::Ipv4 => "https://data.iana.org/rdap/ipv4.json",
            BootstrapKind::Ipv6 => "https://data.iana.org/rdap/ipv6.json",
            BootstrapKind::Dns => "https://data.iana.org/rdap/dns.json",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BootstrapKind::Asn => "asn",
            BootstrapKind::Ipv4 => "ipv4",
            BootstrapKind::Ipv6 => "ipv6",
            BootstrapKind::Dns => "dns",
        }
    }
}

/// A half-open ASN range: `start <= asn < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AsnRange {
    pub start: u64,
    pub end: u64,
}

impl AsnRange {
    pub fn contains(&self, asn: u32) -> bool {
        let asn = asn as u64;
        self.start <= asn && asn < self.end
    }
}

/// One selector from a bootstrap service entry.
#[derive(Debug, Clone)]
enum Selector {
    AsnRange(AsnRange),
    Network(IpCidr),
    Suffix(String),
}

/// One `[selectors, urls]` entry from a bootstrap document: a set of
/// selectors and the ordered candidate base URLs serving them.
#[derive(Debug, Clone)]
pub struct BootstrapService {
    selectors: Vec<Selector>,
    urls: Vec<String>,
}

impl BootstrapService {
    /// Parse one service entry. A malformed entry (wrong arity, non-numeric
    /// range, bad CIDR) is a format error that fails the whole document.
    fn from_entry(kind: BootstrapKind, entry: &Value) -> Result<Self> {
        let parts = entry
            .as_array()
            .ok_or_else(|| RegDataError::bootstrap_format("service entry is not an array"))?;
        if parts.len() != 2 {
            return Err(RegDataError::bootstrap_format(format!(
                "service entry must have exactly 2 elements, got {}",
                parts.len()
            )));
        }

        let raw_selectors = parts[0]
            .as_array()
            .ok_or_else(|| RegDataError::bootstrap_format("selector list is not an array"))?;
        let raw_urls = parts[1]
            .as_array()
            .ok_or_else(|| RegDataError::bootstrap_format("url list is not an array"))?;

        let mut selectors = Vec::with_capacity(raw_selectors.len());
        for raw in raw_selectors {
            let text = raw
                .as_str()
                .ok_or_else(|| RegDataError::bootstrap_format("selector is not a string"))?;
            selectors.push(parse_selector(kind, text)?);
        }

        let mut urls = Vec::with_capacity(raw_urls.len());
        for raw in raw_urls {
            let url = raw
                .as_str()
                .ok_or_else(|| RegDataError::bootstrap_format("service url is not a string"))?;
            urls.push(url.to_string());
        }

        Ok(Self { selectors, urls })
    }

    /// The service's candidate base URLs, in document order.
    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    fn matches_asn(&self, asn: u32) -> bool {
        self.selectors.iter().any(|selector| match selector {
            Selector::AsnRange(range) => range.contains(asn),
            _ => false,
        })
    }

    fn matches_ip(&self, addr: &IpAddr) -> bool {
        self.selectors.iter().any(|selector| match selector {
            Selector::Network(network) => network.contains(addr),
            _ => false,
        })
    }

    fn matches_suffix(&self, suffixes: &[String]) -> bool {
        self.selectors.iter().any(|selector| match selector {
            Selector::Suffix(label) => suffixes.iter().any(|suffix| suffix == label),
            _ => false,
        })
    }
}

fn parse_selector(kind: BootstrapKind, text: &str) -> Result<Selector> {
    match kind {
        BootstrapKind::Asn => {
            let mut parts = text.split('-');
            let (start, end) = match (parts.next(), parts.next(), parts.next()) {
                (Some(start), Some(end), None) => (start, end),
                _ => {
                    return Err(RegDataError::bootstrap_format(format!(
                        "ASN selector '{}' is not of the form start-end",
                        text
                    )))
                }
            };
            let start: u64 = start.trim().parse().map_err(|_| {
                RegDataError::bootstrap_format(format!("non-numeric ASN range start '{}'", start))
            })?;
            let end: u64 = end.trim().parse().map_err(|_| {
                RegDataError::bootstrap_format(format!("non-numeric ASN range end '{}'", end))
            })?;
            Ok(Selector::AsnRange(AsnRange { start, end }))
        }
        BootstrapKind::Ipv4 | BootstrapKind::Ipv6 => {
            let network: IpCidr = text.parse().map_err(|_| {
                RegDataError::bootstrap_format(format!("invalid CIDR selector '{}'", text))
            })?;
            Ok(Selector::Network(network))
        }
        BootstrapKind::Dns => Ok(Selector::Suffix(text.to_lowercase())),
    }
}

/// A fully parsed bootstrap document: an immutable list of services.
#[derive(Debug, Clone)]
pub struct BootstrapRegistry {
    kind: BootstrapKind,
    services: Vec<BootstrapService>,
}

impl BootstrapRegistry {
    /// Parse a bootstrap document from its JSON text.
    pub fn from_json_str(kind: BootstrapKind, text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(kind, &value)
    }

    /// Parse a bootstrap document from a JSON value.
    ///
    /// Any malformed service entry fails the whole document — fatal for this
    /// document only, not for the caller's broader resolution.
    pub fn from_value(kind: BootstrapKind, document: &Value) -> Result<Self> {
        let entries = document
            .get("services")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                RegDataError::bootstrap_format("missing or invalid 'services' array")
            })?;

        let mut services = Vec::with_capacity(entries.len());
        for entry in entries {
            services.push(BootstrapService::from_entry(kind, entry)?);
        }

        Ok(Self { kind, services })
    }

    pub fn kind(&self) -> BootstrapKind {
        self.kind
    }

    pub fn services(&self) -> &[BootstrapService] {
        &self.services
    }

    /// Base URLs for an ASN: every service whose range contains it, in
    /// document order, per-service URL order preserved.
    pub fn match_asn(&self, asn: u32) -> Vec<String> {
        self.collect(|service| service.matches_asn(asn))
    }

    /// Base URLs for an IP address. A v4 registry never matches a v6
    /// address and vice versa.
    pub fn match_ip(&self, addr: &IpAddr) -> Vec<String> {
        let compatible = matches!(
            (self.kind, addr),
            (BootstrapKind::Ipv4, IpAddr::V4(_)) | (BootstrapKind::Ipv6, IpAddr::V6(_))
        );
        if !compatible {
            return Vec::new();
        }
        self.collect(|service| service.matches_ip(addr))
    }

    /// Base URLs for a domain: matched against the domain's whole suffix
    /// chain (the name itself, then each suffix with one leading label
    /// stripped).
    pub fn match_domain(&self, domain: &str) -> Vec<String> {
        let suffixes = domain_suffixes(domain);
        self.collect(|service| service.matches_suffix(&suffixes))
    }

    fn collect<F: Fn(&BootstrapService) -> bool>(&self, matches: F) -> Vec<String> {
        let mut urls = Vec::new();
        for service in &self.services {
            if matches(service) {
                for url in &service.urls {
                    if !urls.contains(url) {
                        urls.push(url.clone());
                    }
                }
            }
        }
        urls
    }
}

/// The suffix chain of a domain name: the name itself, then each suffix
/// obtained by stripping one leading label at a time.
pub fn domain_suffixes(domain: &str) -> Vec<String> {
    let lowered = domain.to_lowercase();
    let labels: Vec<&str> = lowered.split('.').collect();
    (0..labels.len()).map(|i| labels[i..].join(".")).collect()
}

/// Fetch and parse one IANA bootstrap document.
///
/// The library keeps no copy on disk and no global cache: the caller decides
/// how long to hold the returned registry.
pub async fn fetch_registry(kind: BootstrapKind, timeout: Duration) -> Result<BootstrapRegistry> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| RegDataError::internal(format!("failed to build HTTP client: {}", e)))?;

    let url = kind.iana_url();
    tracing::debug!(url, "fetching bootstrap document");

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| RegDataError::http(url, format!("failed to fetch bootstrap: {}", e)))?;

    if !response.status().is_success() {
        return Err(RegDataError::http_with_status(
            url,
            "bootstrap fetch failed",
            response.status().as_u16(),
        ));
    }

    let document: Value = response
        .json()
        .await
        .map_err(|e| RegDataError::http(url, format!("invalid bootstrap JSON: {}", e)))?;

    BootstrapRegistry::from_value(kind, &document)
}
