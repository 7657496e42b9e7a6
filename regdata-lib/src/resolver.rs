//! The unified resolver.
//!
//! Classifies an identifier into its resolution path, attempts WHOIS first
//! (discovery, then sequential candidates, first success wins), and falls
//! back to bootstrap-driven RDAP when WHOIS does not succeed or the caller
//! forces it. Per-attempt failures are recorded and skipped; the resolution
//! as a whole fails only once everything has been exhausted.

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::net::IpAddr;

use serde_json::{Map, Value};

use crate::error::RegDataError;
use crate::merge::AccumulatedInfo;
use crate::normalize::whois_view;
use crate::protocols::bootstrap::{fetch_registry, BootstrapKind, BootstrapRegistry};
use crate::protocols::discovery::{discover_servers, ServerTable};
use crate::protocols::rdap::{RdapClient, RdapPath};
use crate::protocols::whois::{parse_response, validate_record, WhoisClient};
use crate::types::{LookupConfig, LookupReport, Protocol, QueryTarget};
use crate::Result;

/// The four bootstrap documents a resolver may consult, pre-loaded and
/// injected by the caller.
///
/// Any document left unset is fetched fresh from IANA for the call that
/// needs it and dropped afterwards — the library holds no mutable cache.
#[derive(Debug, Clone, Default)]
pub struct BootstrapRegistries {
    pub asn: Option<BootstrapRegistry>,
    pub ipv4: Option<BootstrapRegistry>,
    pub ipv6: Option<BootstrapRegistry>,
    pub dns: Option<BootstrapRegistry>,
}

impl BootstrapRegistries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_asn(mut self, registry: BootstrapRegistry) -> Self {
        self.asn = Some(registry);
        self
    }

    pub fn with_ipv4(mut self, registry: BootstrapRegistry) -> Self {
        self.ipv4 = Some(registry);
        self
    }

    pub fn with_ipv6(mut self, registry: BootstrapRegistry) -> Self {
        self.ipv6 = Some(registry);
        self
    }

    pub fn with_dns(mut self, registry: BootstrapRegistry) -> Self {
        self.dns = Some(registry);
        self
    }

    fn get(&self, kind: BootstrapKind) -> Option<&BootstrapRegistry> {
        match kind {
            BootstrapKind::Asn => self.asn.as_ref(),
            BootstrapKind::Ipv4 => self.ipv4.as_ref(),
            BootstrapKind::Ipv6 => self.ipv6.as_ref(),
            BootstrapKind::Dns => self.dns.as_ref(),
        }
    }
}

/// Which bootstrap document serves a target's RDAP path.
pub fn bootstrap_kind_for(target: &QueryTarget) -> BootstrapKind {
    match target {
        QueryTarget::Asn(_) => BootstrapKind::Asn,
        QueryTarget::Ip(IpAddr::V4(_)) => BootstrapKind::Ipv4,
        QueryTarget::Ip(IpAddr::V6(_)) => BootstrapKind::Ipv6,
        QueryTarget::Domain(_) => BootstrapKind::Dns,
    }
}

/// The RDAP object path for a target.
pub fn rdap_path_for(target: &QueryTarget) -> RdapPath {
    match target {
        QueryTarget::Asn(_) => RdapPath::Autnum,
        QueryTarget::Ip(_) => RdapPath::Ip,
        QueryTarget::Domain(_) => RdapPath::Domain,
    }
}

/// Main resolver coordinating WHOIS and RDAP resolution.
///
/// # Example
///
/// ```rust,no_run
/// use regdata_lib::RegistrationResolver;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let resolver = RegistrationResolver::new();
///     let report = resolver.lookup("example.com").await;
///     println!("success: {} via {:?}", report.success, report.protocol);
///     Ok(())
/// }
/// ```
pub struct RegistrationResolver {
    /// Configuration settings for this resolver instance
    config: LookupConfig,
    /// Immutable TLD -> WHOIS host table used by discovery
    server_table: ServerTable,
    /// Injected bootstrap documents (fetched per call when absent)
    registries: BootstrapRegistries,
    /// WHOIS wire client
    whois_client: WhoisClient,
    /// RDAP HTTP client
    rdap_client: RdapClient,
}

impl RegistrationResolver {
    /// Create a resolver with default configuration.
    pub fn new() -> Self {
        Self::with_config(LookupConfig::default())
    }

    /// Create a resolver with custom configuration.
    pub fn with_config(config: LookupConfig) -> Self {
        let whois_client = WhoisClient::from_config(&config);
        let rdap_client =
            RdapClient::new(config.timeout).expect("Failed to create RDAP client");
        Self {
            config,
            server_table: ServerTable::builtin(),
            registries: BootstrapRegistries::new(),
            whois_client,
            rdap_client,
        }
    }

    /// Replace the WHOIS server table.
    pub fn with_server_table(mut self, table: ServerTable) -> Self {
        self.server_table = table;
        self
    }

    /// Inject pre-loaded bootstrap registries.
    pub fn with_registries(mut self, registries: BootstrapRegistries) -> Self {
        self.registries = registries;
        self
    }

    /// Get the current configuration.
    pub fn config(&self) -> &LookupConfig {
        &self.config
    }

    /// Resolve registration data for a domain name, IP address, or ASN.
    ///
    /// WHOIS runs first unless RDAP is forced; RDAP runs when WHOIS did not
    /// succeed (and the fallback is enabled) or when forced. The report
    /// carries the merged record, the raw bytes of the winning WHOIS
    /// response, the servers considered, and — on failure — the last
    /// recorded error.
    pub async fn lookup(&self, input: &str) -> LookupReport {
        let target = QueryTarget::classify(input);
        let mut report = LookupReport::empty(target.query_string());

        let mut succeeded = false;
        if !self.config.force_rdap {
            succeeded = self.whois_attempt(&target, &mut report).await;
        }
        if (!succeeded && self.config.use_rdap) || self.config.force_rdap {
            succeeded = self.rdap_attempt(&target, &mut report).await;
        }

        report.success = succeeded;
        if succeeded {
            report.error_message = None;
            report.last_error = None;
        }
        report
    }

    /// Bootstrap-driven RDAP lookup only: the merged accumulation of every
    /// accepted document, `links` stripped, structural collisions resolved
    /// by the merge rules.
    pub async fn registration_data(&self, input: &str) -> Result<Map<String, Value>> {
        let target = QueryTarget::classify(input);
        let (documents, last_error) = self.collect_rdap(&target).await?;

        let mut info = AccumulatedInfo::new();
        for document in &documents {
            info.absorb_document(document);
        }
        if info.is_empty() {
            return Err(
                last_error.unwrap_or_else(|| RegDataError::parse("no rdap data found"))
            );
        }
        Ok(info.into_map())
    }

    /// The flat list of accepted RDAP documents for an identifier, before
    /// any merging.
    pub async fn rdap_documents(&self, input: &str) -> Result<Vec<Value>> {
        let target = QueryTarget::classify(input);
        let (documents, _) = self.collect_rdap(&target).await?;
        Ok(documents)
    }

    /// Sequential WHOIS attempt over the candidate set; first valid,
    /// error-free parse wins.
    async fn whois_attempt(&self, target: &QueryTarget, report: &mut LookupReport) -> bool {
        let query = target.query_string();

        let candidates: BTreeSet<String> = match &self.config.servers {
            Some(servers) => servers.iter().cloned().collect(),
            None => discover_servers(target, &self.server_table, &self.whois_client).await,
        };

        if candidates.is_empty() {
            tracing::debug!(query = %target, "no whois servers found");
            report.record_error(RegDataError::no_servers(&query));
            return false;
        }

        report.servers = candidates.iter().cloned().collect();
        tracing::debug!(query = %target, servers = ?report.servers, "whois candidates");

        for host in &candidates {
            let raw = match self.whois_client.raw_query(host, &query).await {
                Ok(raw) => raw,
                Err(error) => {
                    tracing::debug!(host, %error, "whois attempt failed");
                    report.record_error(error);
                    continue;
                }
            };
            report.raw = raw.clone();

            let text = match self.whois_client.decode(&raw) {
                Ok(text) => text,
                Err(error) => {
                    tracing::debug!(host, %error, "whois decode failed");
                    report.record_error(error);
                    continue;
                }
            };

            let record = parse_response(&text);
            match validate_record(&record, host) {
                Ok(()) => {
                    report.data = record.to_map();
                    report.protocol = Some(Protocol::Whois);
                    return true;
                }
                Err(error) => {
                    tracing::debug!(host, %error, "whois response rejected");
                    report.record_error(error);
                }
            }
        }

        false
    }

    /// RDAP attempt: walk every matching bootstrap base, merge accepted
    /// documents, and normalize into the WHOIS-style record.
    async fn rdap_attempt(&self, target: &QueryTarget, report: &mut LookupReport) -> bool {
        let (documents, walk_error) = match self.collect_rdap(target).await {
            Ok(result) => result,
            Err(error) => {
                tracing::debug!(query = %target, %error, "rdap lookup failed");
                report.record_error(error);
                return false;
            }
        };
        if let Some(error) = walk_error {
            report.record_error(error);
        }

        let mut info = AccumulatedInfo::new();
        for document in &documents {
            info.absorb_document(document);
        }

        if info.is_empty() {
            report.record_error(RegDataError::parse("no rdap data found"));
            return false;
        }
        if info.get("error").is_some() || info.get("errorCode").is_some() {
            report.record_error(RegDataError::protocol(
                "rdap",
                "error found in rdap data",
            ));
            return false;
        }

        let merged = info.into_map();
        report.data = whois_view(&merged);
        report.rdap = merged;
        report.protocol = Some(Protocol::Rdap);
        true
    }

    /// Dispatch the target to its bootstrap registry and walk the matching
    /// base URLs.
    async fn collect_rdap(
        &self,
        target: &QueryTarget,
    ) -> Result<(Vec<Value>, Option<RegDataError>)> {
        let kind = bootstrap_kind_for(target);
        let registry = self.registry_for(kind).await?;

        let bases = match target {
            QueryTarget::Asn(asn) => registry.match_asn(*asn),
            QueryTarget::Ip(addr) => registry.match_ip(addr),
            QueryTarget::Domain(name) => registry.match_domain(name),
        };
        if bases.is_empty() {
            tracing::debug!(query = %target, kind = kind.as_str(), "no bootstrap match");
            return Ok((Vec::new(), None));
        }

        let identifier = target.query_string();
        let path = rdap_path_for(target);
        Ok(self.rdap_client.collect(&bases, path, &identifier).await)
    }

    /// The registry for a document kind: injected if available, otherwise
    /// fetched fresh for this call.
    async fn registry_for(&self, kind: BootstrapKind) -> Result<Cow<'_, BootstrapRegistry>> {
        if let Some(registry) = self.registries.get(kind) {
            return Ok(Cow::Borrowed(registry));
        }
        let registry = fetch_registry(kind, self.config.timeout).await?;
        Ok(Cow::Owned(registry))
    }
}

impl Default for RegistrationResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_dispatch_paths() {
        let ip = QueryTarget::classify("8.8.8.8");
        assert_eq!(rdap_path_for(&ip), RdapPath::Ip);
        assert_eq!(bootstrap_kind_for(&ip), BootstrapKind::Ipv4);

        let ipv6 = QueryTarget::classify("2001:db8::1");
        assert_eq!(rdap_path_for(&ipv6), RdapPath::Ip);
        assert_eq!(bootstrap_kind_for(&ipv6), BootstrapKind::Ipv6);

        let asn = QueryTarget::classify("AS15169");
        assert_eq!(rdap_path_for(&asn), RdapPath::Autnum);
        assert_eq!(bootstrap_kind_for(&asn), BootstrapKind::Asn);

        let bare_asn = QueryTarget::classify("15169");
        assert_eq!(rdap_path_for(&bare_asn), RdapPath::Autnum);

        let domain = QueryTarget::classify("example.org");
        assert_eq!(rdap_path_for(&domain), RdapPath::Domain);
        assert_eq!(bootstrap_kind_for(&domain), BootstrapKind::Dns);
    }

    fn offline_registries() -> BootstrapRegistries {
        // Registries that match nothing, so no HTTP happens
        let empty = |kind| {
            BootstrapRegistry::from_value(kind, &json!({"services": []})).unwrap()
        };
        BootstrapRegistries::new()
            .with_asn(empty(BootstrapKind::Asn))
            .with_ipv4(empty(BootstrapKind::Ipv4))
            .with_ipv6(empty(BootstrapKind::Ipv6))
            .with_dns(empty(BootstrapKind::Dns))
    }

    #[tokio::test]
    async fn test_lookup_fails_when_everything_exhausted() {
        let config = LookupConfig::default()
            .with_servers(Vec::new())
            .with_rdap_fallback(true);
        let resolver = RegistrationResolver::with_config(config)
            .with_registries(offline_registries());

        let report = resolver.lookup("example.com").await;
        assert!(!report.success);
        assert!(report.error_message.is_some());
        // RDAP ran last and found nothing
        assert!(matches!(
            report.last_error,
            Some(RegDataError::Parse { .. })
        ));
    }

    #[tokio::test]
    async fn test_lookup_no_servers_without_fallback() {
        let config = LookupConfig::default()
            .with_servers(Vec::new())
            .with_rdap_fallback(false);
        let resolver = RegistrationResolver::with_config(config)
            .with_registries(offline_registries());

        let report = resolver.lookup("example.com").await;
        assert!(!report.success);
        assert!(matches!(
            report.last_error,
            Some(RegDataError::NoServersFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_force_rdap_skips_whois() {
        let config = LookupConfig::default().with_force_rdap(true);
        let resolver = RegistrationResolver::with_config(config)
            .with_registries(offline_registries());

        let report = resolver.lookup("example.com").await;
        assert!(!report.success);
        // WHOIS never ran: no candidate servers were even assembled
        assert!(report.servers.is_empty());
        assert!(matches!(
            report.last_error,
            Some(RegDataError::Parse { .. })
        ));
    }

    #[tokio::test]
    async fn test_registration_data_reports_no_match() {
        let resolver =
            RegistrationResolver::new().with_registries(offline_registries());
        let result = resolver.registration_data("8.8.8.8").await;
        assert!(result.is_err());
    }

    #[test]
    fn test_resolver_builder() {
        let resolver = RegistrationResolver::new()
            .with_server_table(ServerTable::empty())
            .with_registries(BootstrapRegistries::new());
        assert!(resolver.config().use_rdap);
        assert!(!resolver.config().force_rdap);
    }
}
