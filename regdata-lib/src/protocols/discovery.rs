//! WHOIS server discovery.
//!
//! Produces the candidate set of WHOIS hostnames for a target from two
//! independent sub-steps: a live referral query against `whois.iana.org`,
//! and a static table of per-TLD registrar quirks plus two synthesized
//! hostname guesses. Either sub-step may yield nothing; the union is what
//! the client walks.

use std::collections::{BTreeSet, HashMap};

use crate::protocols::whois::WhoisClient;
use crate::types::QueryTarget;

/// The IANA root referral server.
pub const IANA_HOST: &str = "whois.iana.org";

/// Regional registry host for numeric (IP/ASN) lookups.
const LACNIC_HOST: &str = "whois.lacnic.net";

/// Generic fallback host for numeric lookups.
const ARIN_HOST: &str = "whois.arin.net";

/// Built-in TLD -> known WHOIS hosts table, covering common gTLD/ccTLD
/// registrar quirks that the synthesized hostnames miss.
const BUILTIN_TLD_HOSTS: &[(&str, &[&str])] = &[
    ("ai", &["whois.nic.ai"]),
    ("app", &["whois.nic.google"]),
    ("ar", &["whois.nic.ar"]),
    ("by", &["whois.cctld.by"]),
    ("ca", &["whois.ca.fury.ca"]),
    ("chat", &["whois.nic.chat"]),
    ("cl", &["whois.nic.cl"]),
    (
        "com",
        &[
            "whois.crsnic.net",
            "whois.enom.com",
            "whois.joker.com",
            "whois.corporatedomains.com",
            "whois.verisign-grs.com",
        ],
    ),
    ("cr", &["whois.nic.cr"]),
    ("de", &["whois.denic.de"]),
    ("dev", &["whois.nic.google"]),
    ("do", &["whois.nic.do"]),
    ("edu", &["whois.crsnic.net", "whois.educause.net"]),
    ("games", &["whois.nic.games"]),
    ("goog", &["whois.nic.google"]),
    ("google", &["whois.nic.google"]),
    ("gov", &["whois.nic.gov"]),
    ("group", &["whois.namecheap.com"]),
    ("hk", &["whois.hkirc.hk"]),
    ("hn", &["whois.nic.hn"]),
    ("hr", &["whois.dns.hr"]),
    ("id", &["whois.pandi.or.id"]),
    ("ist", &["whois.afilias-srs.net"]),
    ("jobs", &["whois.nic.jobs"]),
    ("jp", &["whois.jprs.jp"]),
    ("kz", &["whois.nic.kz"]),
    ("lat", &["whois.nic.lat"]),
    ("li", &["whois.nic.li"]),
    ("lt", &["whois.domreg.lt"]),
    ("market", &["whois.nic.market"]),
    ("money", &["whois.nic.money"]),
    ("mx", &["whois.mx"]),
    ("net", &["whois.crsnic.net"]),
    ("nl", &["whois.domain-registry.nl"]),
    ("online", &["whois.nic.online"]),
    ("ooo", &["whois.nic.ooo"]),
    (
        "org",
        &[
            "whois.publicdomainregistry.com",
            "whois.gandi.net",
            "whois.markmonitor.com",
        ],
    ),
    ("page", &["whois.nic.page"]),
    ("pe", &["kero.yachay.pe"]),
    ("website", &["whois.nic.website"]),
    ("za", &["whois.registry.net.za"]),
];

/// Immutable TLD -> WHOIS host configuration.
///
/// Constructed once (optionally augmented from a `whois-servers.txt` style
/// listing) and injected into discovery; never mutated afterwards.
#[derive(Debug, Clone)]
pub struct ServerTable {
    tld_hosts: HashMap<String, BTreeSet<String>>,
    numeric_hosts: Vec<String>,
}

impl ServerTable {
    /// The built-in table.
    pub fn builtin() -> Self {
        let mut tld_hosts = HashMap::new();
        for (tld, hosts) in BUILTIN_TLD_HOSTS {
            let entry: BTreeSet<String> = hosts.iter().map(|h| h.to_string()).collect();
            tld_hosts.insert(tld.to_string(), entry);
        }
        Self {
            tld_hosts,
            numeric_hosts: vec![LACNIC_HOST.to_string(), ARIN_HOST.to_string()],
        }
    }

    /// An empty table (synthesized hostnames still apply at discovery time).
    pub fn empty() -> Self {
        Self {
            tld_hosts: HashMap::new(),
            numeric_hosts: vec![LACNIC_HOST.to_string(), ARIN_HOST.to_string()],
        }
    }

    /// Fold in a `whois-servers.txt` style listing: one `tld host` pair per
    /// line, `;`-prefixed comment lines ignored. Returns the augmented table
    /// (builder style — the table stays immutable once in use).
    pub fn merge_listing(mut self, listing: &str) -> Self {
        for line in listing.lines() {
            if line.starts_with(';') {
                continue;
            }
            let Some((tld, host)) = line.split_once(' ') else {
                continue;
            };
            let tld = tld.trim().to_lowercase();
            let host = host.trim();
            if tld.is_empty() || host.is_empty() {
                continue;
            }
            self.tld_hosts
                .entry(tld)
                .or_default()
                .insert(host.to_string());
        }
        self
    }

    /// Add one host for a TLD (builder style).
    pub fn with_host<T: Into<String>, H: Into<String>>(mut self, tld: T, host: H) -> Self {
        self.tld_hosts
            .entry(tld.into().to_lowercase())
            .or_default()
            .insert(host.into());
        self
    }

    /// Known hosts for a TLD, if any.
    pub fn hosts_for(&self, tld: &str) -> Option<&BTreeSet<String>> {
        self.tld_hosts.get(&tld.to_lowercase())
    }

    /// Regional registry hosts used for IP/ASN lookups.
    pub fn numeric_hosts(&self) -> &[String] {
        &self.numeric_hosts
    }
}

impl Default for ServerTable {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Scan an IANA referral response for a `whois:` line and return the server
/// hostname it names.
pub fn parse_iana_referral(response: &str) -> Option<String> {
    for line in response.lines() {
        if let Some(rest) = line.strip_prefix("whois:") {
            let server = rest.trim();
            if !server.is_empty() {
                return Some(server.to_string());
            }
        }
    }
    None
}

/// The static/TLD-derived sub-step of discovery.
///
/// Numeric targets get the regional registry hosts; named targets get the
/// static table entry for their TLD plus the two synthesized hostname
/// guesses.
pub fn static_candidates(target: &QueryTarget, table: &ServerTable) -> BTreeSet<String> {
    let mut candidates = BTreeSet::new();
    match target {
        QueryTarget::Ip(_) | QueryTarget::Asn(_) => {
            for host in table.numeric_hosts() {
                candidates.insert(host.clone());
            }
        }
        QueryTarget::Domain(name) => {
            let tld = name.rsplit('.').next().unwrap_or(name);
            if let Some(hosts) = table.hosts_for(tld) {
                for host in hosts {
                    candidates.insert(host.clone());
                }
            }
            candidates.insert(format!("{}.whois-servers.net", tld));
            candidates.insert(format!("whois.nic.{}", tld));
        }
    }
    candidates
}

/// Assemble the full candidate set: IANA referral union static fallback.
///
/// A failed or empty referral yields nothing from that sub-step but is never
/// fatal; an entirely empty union is the caller's "no servers found"
/// condition.
pub async fn discover_servers(
    target: &QueryTarget,
    table: &ServerTable,
    client: &WhoisClient,
) -> BTreeSet<String> {
    let mut candidates = BTreeSet::new();

    match client.raw_query(IANA_HOST, &target.query_string()).await {
        Ok(raw) => match client.decode(&raw) {
            Ok(text) => {
                if let Some(server) = parse_iana_referral(&text) {
                    candidates.insert(server);
                } else {
                    tracing::debug!(query = %target, "no whois server in IANA referral");
                }
            }
            Err(error) => {
                tracing::debug!(query = %target, %error, "failed to decode IANA referral");
            }
        },
        Err(error) => {
            tracing::debug!(query = %target, %error, "IANA referral query failed");
        }
    }

    candidates.extend(static_candidates(target, table));
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_iana_referral() {
        let response = "% IANA WHOIS server\n\ndomain:       COM\nwhois:        whois.verisign-grs.com\nstatus:       ACTIVE\n";
        assert_eq!(
            parse_iana_referral(response),
            Some("whois.verisign-grs.com".to_string())
        );

        // No whois line
        assert_eq!(parse_iana_referral("domain: TEST\nstatus: ACTIVE\n"), None);

        // Empty whois line yields nothing
        assert_eq!(parse_iana_referral("whois:    \ndomain: COM\n"), None);
    }

    #[test]
    fn test_static_candidates_for_known_tld() {
        let table = ServerTable::builtin();
        let target = QueryTarget::Domain("example.com".to_string());
        let candidates = static_candidates(&target, &table);

        assert!(candidates.contains("whois.verisign-grs.com"));
        assert!(candidates.contains("com.whois-servers.net"));
        assert!(candidates.contains("whois.nic.com"));
    }

    #[test]
    fn test_static_candidates_for_unknown_tld_only_synthesized() {
        let table = ServerTable::builtin();
        let target = QueryTarget::Domain("example.zz".to_string());
        let candidates = static_candidates(&target, &table);

        assert_eq!(candidates.len(), 2);
        assert!(candidates.contains("zz.whois-servers.net"));
        assert!(candidates.contains("whois.nic.zz"));
    }

    #[test]
    fn test_static_candidates_for_numeric_targets() {
        let table = ServerTable::builtin();

        let ip = QueryTarget::Ip("8.8.8.8".parse().unwrap());
        let candidates = static_candidates(&ip, &table);
        assert!(candidates.contains("whois.lacnic.net"));
        assert!(candidates.contains("whois.arin.net"));
        assert_eq!(candidates.len(), 2);

        let asn = QueryTarget::Asn(15169);
        assert_eq!(static_candidates(&asn, &table), candidates);
    }

    #[test]
    fn test_merge_listing() {
        let listing = "; whois-servers.txt\n; comment line\ncom whois.verisign-grs.com\nfo whois.nic.fo\n\nmalformed-line\n";
        let table = ServerTable::empty().merge_listing(listing);

        assert!(table
            .hosts_for("fo")
            .map(|hosts| hosts.contains("whois.nic.fo"))
            .unwrap_or(false));
        assert!(table.hosts_for("malformed-line").is_none());
        // Comment lines never become entries
        assert!(table.hosts_for(";").is_none());
    }

    #[test]
    fn test_table_is_case_insensitive_on_tld() {
        let table = ServerTable::builtin();
        assert!(table.hosts_for("COM").is_some());
        assert_eq!(table.hosts_for("COM"), table.hosts_for("com"));
    }
}
