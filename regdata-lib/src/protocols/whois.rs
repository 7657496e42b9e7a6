//! Raw WHOIS wire protocol client and response parser.
//!
//! WHOIS is plaintext over TCP port 43: the client sends the identifier
//! followed by CRLF and reads until the peer closes the connection. There is
//! no framing, no declared charset, and no response structure beyond
//! convention — hence the statistical charset detection and the ad-hoc but
//! well-defined key/value parser here.

use std::time::Duration;

use encoding_rs::Encoding;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::error::RegDataError;
use crate::types::{DecodeErrorMode, LookupConfig, ParsedRecord};
use crate::Result;

/// Well-known WHOIS port.
pub const WHOIS_PORT: u16 = 43;

/// A parsed WHOIS response together with the raw bytes it came from.
#[derive(Debug, Clone)]
pub struct WhoisResponse {
    pub record: ParsedRecord,
    pub raw: Vec<u8>,
}

/// WHOIS client speaking the wire protocol directly.
#[derive(Debug, Clone)]
pub struct WhoisClient {
    /// Per-attempt timeout covering connect, send, and read-to-EOF
    timeout: Duration,
    /// Charset label for the outgoing query line
    encode_charset: String,
    /// Pinned decode charset; None means statistical detection per response
    decode_charset: Option<String>,
    /// How encode/decode failures are handled
    decode_errors: DecodeErrorMode,
}

impl WhoisClient {
    /// Create a client with default wire settings (UTF-8 out, auto-detect in,
    /// strict error handling).
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            encode_charset: "utf-8".to_string(),
            decode_charset: None,
            decode_errors: DecodeErrorMode::Strict,
        }
    }

    /// Create a client from a lookup configuration.
    pub fn from_config(config: &LookupConfig) -> Self {
        Self {
            timeout: config.timeout,
            encode_charset: config.encode_charset.clone(),
            decode_charset: config.decode_charset.clone(),
            decode_errors: config.decode_errors,
        }
    }

    /// Send one query to one server and read the raw response to EOF.
    ///
    /// The identifier is lower-cased and terminated with CRLF per the wire
    /// convention. An empty response body is an error.
    pub async fn raw_query(&self, host: &str, query: &str) -> Result<Vec<u8>> {
        let payload = self.encode_query(query)?;

        tracing::debug!(host, query, "sending whois query");

        let attempt = async {
            let mut stream = TcpStream::connect((host, WHOIS_PORT))
                .await
                .map_err(|e| RegDataError::connection(host, e.to_string()))?;
            stream
                .write_all(&payload)
                .await
                .map_err(|e| RegDataError::connection(host, format!("send failed: {}", e)))?;
            let mut raw = Vec::new();
            stream
                .read_to_end(&mut raw)
                .await
                .map_err(|e| RegDataError::connection(host, format!("receive failed: {}", e)))?;
            Ok::<_, RegDataError>(raw)
        };

        let raw = tokio::time::timeout(self.timeout, attempt)
            .await
            .map_err(|_| {
                RegDataError::timeout(format!("whois query to {}", host), self.timeout)
            })??;

        if raw.is_empty() {
            return Err(RegDataError::empty_response(host));
        }

        Ok(raw)
    }

    /// Query one server and parse the response into a record.
    ///
    /// A response with no parsed keys, or carrying an `ERROR`/`WHOIS ERROR`
    /// key, is a failed attempt for that server.
    pub async fn query_record(&self, host: &str, query: &str) -> Result<WhoisResponse> {
        let raw = self.raw_query(host, query).await?;
        let text = self.decode(&raw)?;
        let record = parse_response(&text);
        validate_record(&record, host)?;
        Ok(WhoisResponse { record, raw })
    }

    /// Encode the outgoing query line: lower-cased identifier plus CRLF.
    pub fn encode_query(&self, query: &str) -> Result<Vec<u8>> {
        let encoding = resolve_encoding(&self.encode_charset)?;
        let line = query.to_lowercase();
        let (encoded, _, had_errors) = encoding.encode(&line);
        if had_errors && self.decode_errors == DecodeErrorMode::Strict {
            return Err(RegDataError::decode(format!(
                "query '{}' is not representable in {}",
                line,
                encoding.name()
            )));
        }
        let mut payload = encoded.into_owned();
        payload.extend_from_slice(b"\r\n");
        Ok(payload)
    }

    /// Decode a raw response using the pinned charset, or statistical
    /// detection when none is pinned.
    pub fn decode(&self, raw: &[u8]) -> Result<String> {
        let encoding = match &self.decode_charset {
            Some(label) => resolve_encoding(label)?,
            None => detect_encoding(raw),
        };

        match self.decode_errors {
            DecodeErrorMode::Strict => encoding
                .decode_without_bom_handling_and_without_replacement(raw)
                .map(|text| text.into_owned())
                .ok_or_else(|| {
                    RegDataError::decode(format!(
                        "response is not valid {}",
                        encoding.name()
                    ))
                }),
            DecodeErrorMode::Replace => {
                Ok(encoding.decode_without_bom_handling(raw).0.into_owned())
            }
            DecodeErrorMode::Ignore => Ok(encoding
                .decode_without_bom_handling(raw)
                .0
                .replace('\u{FFFD}', "")),
        }
    }
}

fn resolve_encoding(label: &str) -> Result<&'static Encoding> {
    Encoding::for_label(label.as_bytes())
        .ok_or_else(|| RegDataError::decode(format!("unknown charset label '{}'", label)))
}

/// Statistical charset detection over the full response body.
fn detect_encoding(raw: &[u8]) -> &'static Encoding {
    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(raw, true);
    detector.guess(None, true)
}

/// Characters stripped from both ends of keys and values.
fn strip_field(text: &str) -> &str {
    text.trim_matches(|c: char| c.is_whitespace() || c == '<' || c == '>')
}

/// Parse a decoded WHOIS response into an ordered record.
///
/// Lines beginning with `%` or `#` are server comments. A line containing
/// `:` splits on the first colon; when the value side is empty, the
/// immediately following non-comment lines without a colon are collected as
/// continuation text. Keys are trimmed, upper-cased, and promote from scalar
/// to list on repetition.
pub fn parse_response(text: &str) -> ParsedRecord {
    let lines: Vec<&str> = text.split('\n').collect();
    let mut record = ParsedRecord::new();

    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];
        if line.starts_with('%') || line.starts_with('#') {
            i += 1;
            continue;
        }
        if let Some(colon) = line.find(':') {
            let key = strip_field(&line[..colon]).to_uppercase();
            let mut value = line[colon + 1..].to_string();
            if value.is_empty() {
                // Continuation block: runs until the next line with a colon
                // or end of input
                let mut collected = String::new();
                let mut j = i + 1;
                while j < lines.len() {
                    let next = lines[j];
                    if next.starts_with('%') || next.starts_with('#') {
                        j += 1;
                        continue;
                    }
                    if next.contains(':') {
                        break;
                    }
                    collected.push_str(strip_field(next));
                    collected.push('\n');
                    i = j;
                    j += 1;
                }
                value = collected;
            }
            record.insert(&key, strip_field(&value).to_string());
        }
        i += 1;
    }

    record
}

/// Check a parsed record for failure conditions.
pub fn validate_record(record: &ParsedRecord, host: &str) -> Result<()> {
    if record.is_empty() {
        return Err(RegDataError::parse(format!(
            "no whois data found in response from {}",
            host
        )));
    }
    if record.contains_key("ERROR") || record.contains_key("WHOIS ERROR") {
        return Err(RegDataError::protocol(host, "error found in whois data"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FieldValue;

    #[test]
    fn test_parse_basic_record() {
        let record = parse_response("Domain Name: EXAMPLE.COM\nRegistrar: Test Registrar\n");

        assert_eq!(record.len(), 2);
        assert_eq!(
            record.get("DOMAIN NAME"),
            Some(&FieldValue::Scalar("EXAMPLE.COM".to_string()))
        );
        assert_eq!(
            record.get("REGISTRAR"),
            Some(&FieldValue::Scalar("Test Registrar".to_string()))
        );
    }

    #[test]
    fn test_parse_skips_comment_lines() {
        let text = "% IANA WHOIS server\n# another comment\ndomain: EXAMPLE.COM\n% trailing\n";
        let record = parse_response(text);

        assert_eq!(record.len(), 1);
        assert_eq!(
            record.get("domain"),
            Some(&FieldValue::Scalar("EXAMPLE.COM".to_string()))
        );
    }

    #[test]
    fn test_parse_repeated_key_promotes_to_ordered_list() {
        let text = "Name Server: NS1.EXAMPLE.COM\nName Server: NS2.EXAMPLE.COM\nName Server: NS3.EXAMPLE.COM\n";
        let record = parse_response(text);

        assert_eq!(
            record.get("NAME SERVER"),
            Some(&FieldValue::List(vec![
                "NS1.EXAMPLE.COM".to_string(),
                "NS2.EXAMPLE.COM".to_string(),
                "NS3.EXAMPLE.COM".to_string(),
            ]))
        );
    }

    #[test]
    fn test_parse_continuation_lines() {
        let text = "address:\n123 Example Street\nSpringfield\ncountry: US\n";
        let record = parse_response(text);

        assert_eq!(
            record.get("ADDRESS"),
            Some(&FieldValue::Scalar(
                "123 Example Street\nSpringfield".to_string()
            ))
        );
        assert_eq!(record.get("COUNTRY"), Some(&FieldValue::Scalar("US".to_string())));
    }

    #[test]
    fn test_parse_strips_angle_brackets_and_whitespace() {
        let record = parse_response("  <Registrar>  :  <Acme Corp>  \n");
        assert_eq!(
            record.get("REGISTRAR"),
            Some(&FieldValue::Scalar("Acme Corp".to_string()))
        );
    }

    #[test]
    fn test_parse_handles_crlf_line_endings() {
        let record = parse_response("Domain Name: EXAMPLE.COM\r\nRegistrar: Acme\r\n");
        assert_eq!(
            record.get("DOMAIN NAME"),
            Some(&FieldValue::Scalar("EXAMPLE.COM".to_string()))
        );
    }

    #[test]
    fn test_parse_idempotent_on_single_value_records() {
        let record = parse_response("Domain Name: EXAMPLE.COM\nRegistrar: Test Registrar\n");

        // Re-serialize and re-parse: scalar values must survive unchanged
        let mut serialized = String::new();
        for (key, value) in record.iter() {
            if let FieldValue::Scalar(v) = value {
                serialized.push_str(&format!("{}: {}\n", key, v));
            }
        }
        let reparsed = parse_response(&serialized);
        assert_eq!(record, reparsed);
    }

    #[test]
    fn test_validate_record_failures() {
        let empty = ParsedRecord::new();
        assert!(matches!(
            validate_record(&empty, "whois.example"),
            Err(RegDataError::Parse { .. })
        ));

        let mut errored = ParsedRecord::new();
        errored.insert("ERROR", "no such domain".to_string());
        assert!(matches!(
            validate_record(&errored, "whois.example"),
            Err(RegDataError::Protocol { .. })
        ));

        let mut whois_errored = ParsedRecord::new();
        whois_errored.insert("WHOIS ERROR", "rate limited".to_string());
        assert!(validate_record(&whois_errored, "whois.example").is_err());

        let mut good = ParsedRecord::new();
        good.insert("DOMAIN NAME", "EXAMPLE.COM".to_string());
        assert!(validate_record(&good, "whois.example").is_ok());
    }

    #[test]
    fn test_encode_query_lowercases_and_terminates() {
        let client = WhoisClient::new(Duration::from_secs(5));
        let payload = client.encode_query("EXAMPLE.COM").unwrap();
        assert_eq!(payload, b"example.com\r\n");
    }

    #[test]
    fn test_decode_pinned_latin1() {
        let client = WhoisClient {
            timeout: Duration::from_secs(5),
            encode_charset: "utf-8".to_string(),
            decode_charset: Some("latin1".to_string()),
            decode_errors: DecodeErrorMode::Strict,
        };
        let text = client.decode(b"caf\xe9").unwrap();
        assert_eq!(text, "café");
    }

    #[test]
    fn test_decode_strict_rejects_invalid_pinned_utf8() {
        let client = WhoisClient {
            timeout: Duration::from_secs(5),
            encode_charset: "utf-8".to_string(),
            decode_charset: Some("utf-8".to_string()),
            decode_errors: DecodeErrorMode::Strict,
        };
        assert!(matches!(
            client.decode(b"caf\xe9"),
            Err(RegDataError::Decode { .. })
        ));
    }

    #[test]
    fn test_decode_replace_and_ignore_modes() {
        let replace = WhoisClient {
            timeout: Duration::from_secs(5),
            encode_charset: "utf-8".to_string(),
            decode_charset: Some("utf-8".to_string()),
            decode_errors: DecodeErrorMode::Replace,
        };
        assert_eq!(replace.decode(b"caf\xe9").unwrap(), "caf\u{FFFD}");

        let ignore = WhoisClient {
            timeout: Duration::from_secs(5),
            encode_charset: "utf-8".to_string(),
            decode_charset: Some("utf-8".to_string()),
            decode_errors: DecodeErrorMode::Ignore,
        };
        assert_eq!(ignore.decode(b"caf\xe9").unwrap(), "caf");
    }

    #[test]
    fn test_decode_autodetects_charset() {
        let client = WhoisClient::new(Duration::from_secs(5));
        // Plain ASCII detects cleanly regardless of guessed encoding
        assert_eq!(client.decode(b"domain: example.com\n").unwrap(), "domain: example.com\n");

        // A Latin-1 byte sequence must come back without replacement chars
        let text = client.decode(b"registrant: caf\xe9 SARL\n").unwrap();
        assert!(!text.contains('\u{FFFD}'));
        assert!(text.starts_with("registrant: caf"));
    }

    #[test]
    fn test_unknown_charset_label() {
        let client = WhoisClient {
            timeout: Duration::from_secs(5),
            encode_charset: "utf-8".to_string(),
            decode_charset: Some("no-such-charset".to_string()),
            decode_errors: DecodeErrorMode::Strict,
        };
        assert!(client.decode(b"x").is_err());
    }
}
