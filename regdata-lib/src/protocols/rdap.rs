//! RDAP client and referral walker (RFC 9082/9083).
//!
//! One lookup may touch several servers: the bootstrap-matched registry
//! answers first, and its document can carry `links` referring to a more
//! specific registrar server. The walker follows those referrals with an
//! explicit worklist, deduplicating by document identity so mutually
//! referring servers cannot loop it.

use std::time::Duration;

use serde_json::Value;

use crate::error::RegDataError;
use crate::Result;

/// RDAP object path segment for each resolution class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RdapPath {
    Ip,
    Autnum,
    Domain,
}

impl RdapPath {
    pub fn as_str(&self) -> &'static str {
        match self {
            RdapPath::Ip => "ip",
            RdapPath::Autnum => "autnum",
            RdapPath::Domain => "domain",
        }
    }
}

/// Join a bootstrap base URL with the object path and identifier.
pub fn join_url(base: &str, path: RdapPath, identifier: &str) -> String {
    format!(
        "{}/{}/{}",
        base.trim_end_matches('/'),
        path.as_str(),
        identifier
    )
}

/// Acceptance test for a fetched document.
///
/// ASN/IP documents must carry no `errorCode`/`error` field; domain
/// documents must carry a non-empty `ldhName`.
pub fn accept_document(document: &Value, path: RdapPath) -> bool {
    match path {
        RdapPath::Ip | RdapPath::Autnum => {
            document.get("errorCode").is_none() && document.get("error").is_none()
        }
        RdapPath::Domain => document
            .get("ldhName")
            .and_then(Value::as_str)
            .map(|name| !name.is_empty())
            .unwrap_or(false),
    }
}

/// Referral links worth following: every `links[]` entry whose `rel` is not
/// `"self"` and whose `type` is `application/rdap+json`.
pub fn referral_links(document: &Value) -> Vec<String> {
    let mut links = Vec::new();
    if let Some(Value::Array(entries)) = document.get("links") {
        for entry in entries {
            let rel = entry.get("rel").and_then(Value::as_str);
            let media_type = entry.get("type").and_then(Value::as_str);
            let href = entry.get("href").and_then(Value::as_str);
            if rel != Some("self")
                && media_type == Some("application/rdap+json")
                && href.map(|h| !h.is_empty()).unwrap_or(false)
            {
                links.push(href.unwrap_or_default().to_string());
            }
        }
    }
    links
}

/// Admit a fetched document into the accumulation list.
///
/// Returns the referral links to follow — non-empty only when the document
/// was accepted and is not structurally identical to one already collected
/// (the cycle guard).
pub fn absorb_document(documents: &mut Vec<Value>, document: Value, path: RdapPath) -> Vec<String> {
    if !accept_document(&document, path) {
        return Vec::new();
    }
    if documents.contains(&document) {
        return Vec::new();
    }
    let links = referral_links(&document);
    documents.push(document);
    links
}

/// RDAP HTTP client.
#[derive(Debug, Clone)]
pub struct RdapClient {
    http: reqwest::Client,
    timeout: Duration,
}

impl RdapClient {
    /// Create a client with the given per-request timeout.
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                RegDataError::internal(format!("failed to create RDAP HTTP client: {}", e))
            })?;
        Ok(Self { http, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// GET one RDAP URL and parse the JSON body, returning the HTTP status
    /// alongside it (acceptance is the walker's decision).
    async fn fetch(&self, url: &str) -> Result<(u16, Value)> {
        tracing::debug!(url, "fetching rdap document");
        let response = self
            .http
            .get(url)
            .header("Accept", "application/rdap+json")
            .send()
            .await
            .map_err(|e| RegDataError::http(url, format!("request failed: {}", e)))?;
        let status = response.status().as_u16();
        let document = response
            .json::<Value>()
            .await
            .map_err(|e| RegDataError::http(url, format!("invalid JSON body: {}", e)))?;
        Ok((status, document))
    }

    /// Walk one base URL and everything it refers to.
    ///
    /// Accepted documents land in `documents`; a network or decode failure
    /// terminates only that branch and is returned as the last error.
    pub async fn walk(
        &self,
        base: &str,
        path: RdapPath,
        identifier: &str,
        documents: &mut Vec<Value>,
    ) -> Option<RegDataError> {
        let mut last_error = None;
        let mut worklist = vec![join_url(base, path, identifier)];

        while let Some(url) = worklist.pop() {
            match self.fetch(&url).await {
                Ok((200, document)) => {
                    let links = absorb_document(documents, document, path);
                    // Reverse so the worklist pops referrals in document order
                    for link in links.into_iter().rev() {
                        worklist.push(link);
                    }
                }
                Ok((status, _)) => {
                    tracing::debug!(url, status, "rdap document not accepted");
                }
                Err(error) => {
                    tracing::debug!(url, %error, "rdap fetch failed");
                    last_error = Some(error);
                }
            }
        }

        last_error
    }

    /// Walk every matching bootstrap base URL, producing the flat list of
    /// accepted documents.
    pub async fn collect(
        &self,
        bases: &[String],
        path: RdapPath,
        identifier: &str,
    ) -> (Vec<Value>, Option<RegDataError>) {
        let mut documents = Vec::new();
        let mut last_error = None;
        for base in bases {
            if let Some(error) = self.walk(base, path, identifier, &mut documents).await {
                last_error = Some(error);
            }
        }
        (documents, last_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_join_url() {
        assert_eq!(
            join_url("https://rdap.arin.net/registry/", RdapPath::Ip, "8.8.8.8"),
            "https://rdap.arin.net/registry/ip/8.8.8.8"
        );
        assert_eq!(
            join_url("https://rdap.arin.net/registry", RdapPath::Autnum, "15169"),
            "https://rdap.arin.net/registry/autnum/15169"
        );
        assert_eq!(
            join_url(
                "https://rdap.verisign.com/com/v1",
                RdapPath::Domain,
                "example.com"
            ),
            "https://rdap.verisign.com/com/v1/domain/example.com"
        );
    }

    #[test]
    fn test_accept_rules_numeric_paths() {
        let ok = json!({"handle": "NET-8-8-8-0-1"});
        assert!(accept_document(&ok, RdapPath::Ip));
        assert!(accept_document(&ok, RdapPath::Autnum));

        let errored = json!({"errorCode": 404, "title": "Not Found"});
        assert!(!accept_document(&errored, RdapPath::Ip));

        let errored = json!({"error": "rate limited"});
        assert!(!accept_document(&errored, RdapPath::Autnum));
    }

    #[test]
    fn test_accept_rules_domain_path() {
        assert!(accept_document(
            &json!({"ldhName": "example.com"}),
            RdapPath::Domain
        ));
        assert!(!accept_document(&json!({"ldhName": ""}), RdapPath::Domain));
        assert!(!accept_document(
            &json!({"handle": "X", "status": ["active"]}),
            RdapPath::Domain
        ));
    }

    #[test]
    fn test_referral_links_filtering() {
        let document = json!({
            "links": [
                {"rel": "self", "type": "application/rdap+json", "href": "https://a.example/domain/x"},
                {"rel": "related", "type": "application/rdap+json", "href": "https://b.example/domain/x"},
                {"rel": "related", "type": "text/html", "href": "https://c.example/whois"},
                {"rel": "related", "type": "application/rdap+json"}
            ]
        });

        assert_eq!(
            referral_links(&document),
            vec!["https://b.example/domain/x".to_string()]
        );
    }

    #[test]
    fn test_cycle_guard_terminates_after_two_documents() {
        // Two registries whose documents refer to each other
        let doc_a = json!({
            "ldhName": "example.com",
            "handle": "A",
            "links": [{"rel": "related", "type": "application/rdap+json", "href": "https://b.example/domain/example.com"}]
        });
        let doc_b = json!({
            "ldhName": "example.com",
            "handle": "B",
            "links": [{"rel": "related", "type": "application/rdap+json", "href": "https://a.example/domain/example.com"}]
        });

        let mut documents = Vec::new();

        let links = absorb_document(&mut documents, doc_a.clone(), RdapPath::Domain);
        assert_eq!(links, vec!["https://b.example/domain/example.com"]);

        let links = absorb_document(&mut documents, doc_b, RdapPath::Domain);
        assert_eq!(links, vec!["https://a.example/domain/example.com"]);

        // The walker re-fetches A; structural dedup stops the traversal
        let links = absorb_document(&mut documents, doc_a, RdapPath::Domain);
        assert!(links.is_empty());
        assert_eq!(documents.len(), 2);
    }

    #[test]
    fn test_rejected_document_yields_no_links() {
        let mut documents = Vec::new();
        let rejected = json!({
            "errorCode": 404,
            "links": [{"rel": "related", "type": "application/rdap+json", "href": "https://x.example/ip/1.1.1.1"}]
        });
        assert!(absorb_document(&mut documents, rejected, RdapPath::Ip).is_empty());
        assert!(documents.is_empty());
    }

    #[tokio::test]
    async fn test_rdap_client_creation() {
        let client = RdapClient::new(Duration::from_secs(3));
        assert!(client.is_ok());
    }
}
