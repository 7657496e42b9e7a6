//! Geolocation convenience lookups via ip-api.com.
//!
//! This is a thin wrapper around a third-party JSON API, kept outside the
//! resolution engine: no normalization, no merging, just the decoded
//! response. See <https://ip-api.com/docs> for field lists.

use std::net::IpAddr;
use std::str::FromStr;
use std::time::Duration;

use serde_json::Value;

use crate::error::RegDataError;
use crate::Result;

/// Default field bitmask ip-api.com recommends for single lookups.
pub const DEFAULT_FIELDS: &str = "61439";

fn geo_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| RegDataError::internal(format!("failed to build HTTP client: {}", e)))
}

/// Look up one IP (or domain) with ip-api.com.
///
/// `fields` is either a numeric bitmask or a comma-separated field list;
/// None uses the service default.
pub async fn lookup_ip_api(
    query: &str,
    fields: Option<&str>,
    lang: &str,
    timeout: Duration,
) -> Result<Value> {
    let fields = fields.unwrap_or(DEFAULT_FIELDS);
    let url = format!(
        "http://ip-api.com/json/{}?fields={}&lang={}",
        query, fields, lang
    );

    tracing::debug!(query, "looking up via ip-api.com");

    let response = geo_client(timeout)?
        .get(&url)
        .send()
        .await
        .map_err(|e| RegDataError::http(&url, e.to_string()))?;
    let value = response
        .json::<Value>()
        .await
        .map_err(|e| RegDataError::http(&url, format!("invalid JSON body: {}", e)))?;
    Ok(value)
}

/// Batch-look up multiple IPs with ip-api.com.
///
/// Every entry must be a valid IP address; the batch endpoint does not
/// resolve domain names.
pub async fn batch_lookup_ip_api(
    ips: &[String],
    fields: Option<&str>,
    lang: &str,
    timeout: Duration,
) -> Result<Value> {
    for (index, ip) in ips.iter().enumerate() {
        if IpAddr::from_str(ip).is_err() {
            return Err(RegDataError::invalid_target(
                ip.clone(),
                format!("entry {} is not a valid IP address", index),
            ));
        }
    }

    let fields = fields.unwrap_or(DEFAULT_FIELDS);
    let url = format!("http://ip-api.com/batch?fields={}&lang={}", fields, lang);

    tracing::debug!(count = ips.len(), "batch lookup via ip-api.com");

    let response = geo_client(timeout)?
        .post(&url)
        .json(ips)
        .send()
        .await
        .map_err(|e| RegDataError::http(&url, e.to_string()))?;
    let value = response
        .json::<Value>()
        .await
        .map_err(|e| RegDataError::http(&url, format!("invalid JSON body: {}", e)))?;
    Ok(value)
}
