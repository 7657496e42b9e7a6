//! Error handling for registration data lookups.
//!
//! This module defines a comprehensive error type that covers all the different
//! ways a WHOIS/RDAP resolution can fail, from network issues to malformed
//! bootstrap documents.

use std::fmt;

/// Main error type for registration data operations.
///
/// Per-candidate and per-URL failures are represented by these variants and
/// recorded as the "last error" while the engine proceeds to the next
/// candidate; a resolution as a whole only fails once every candidate has
/// been exhausted.
#[derive(Debug, Clone)]
pub enum RegDataError {
    /// DNS/TCP/HTTP transport failures
    Connection { host: String, message: String },

    /// An attempt exceeded the caller-supplied timeout
    Timeout {
        operation: String,
        duration: std::time::Duration,
    },

    /// The peer closed the connection without sending any bytes
    EmptyResponse { host: String },

    /// No recognizable key/value structure in a response
    Parse { message: String },

    /// The server itself reported an error (`ERROR`/`WHOIS ERROR` key,
    /// RDAP `errorCode`/`error` field)
    Protocol { source: String, message: String },

    /// Charset detection/decoding failed under strict handling
    Decode { message: String },

    /// A bootstrap document had a malformed selector entry.
    /// Fatal for that document's service list only.
    BootstrapFormat { message: String },

    /// WHOIS discovery produced an empty candidate set (recoverable —
    /// the caller falls back to RDAP)
    NoServersFound { target: String },

    /// An RDAP or bootstrap HTTP request failed
    Http {
        url: String,
        message: String,
        status: Option<u16>,
    },

    /// The queried identifier could not be used for the requested path
    InvalidTarget { target: String, reason: String },

    /// Generic internal errors that don't fit other categories
    Internal { message: String },
}

impl RegDataError {
    /// Create a new connection error.
    pub fn connection<H: Into<String>, M: Into<String>>(host: H, message: M) -> Self {
        Self::Connection {
            host: host.into(),
            message: message.into(),
        }
    }

    /// Create a new timeout error.
    pub fn timeout<O: Into<String>>(operation: O, duration: std::time::Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a new empty response error.
    pub fn empty_response<H: Into<String>>(host: H) -> Self {
        Self::EmptyResponse { host: host.into() }
    }

    /// Create a new parse error.
    pub fn parse<M: Into<String>>(message: M) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Create a new server-reported protocol error.
    pub fn protocol<S: Into<String>, M: Into<String>>(source: S, message: M) -> Self {
        Self::Protocol {
            source: source.into(),
            message: message.into(),
        }
    }

    /// Create a new decode error.
    pub fn decode<M: Into<String>>(message: M) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Create a new bootstrap format error.
    pub fn bootstrap_format<M: Into<String>>(message: M) -> Self {
        Self::BootstrapFormat {
            message: message.into(),
        }
    }

    /// Create a new "no servers found" error.
    pub fn no_servers<T: Into<String>>(target: T) -> Self {
        Self::NoServersFound {
            target: target.into(),
        }
    }

    /// Create a new HTTP error.
    pub fn http<U: Into<String>, M: Into<String>>(url: U, message: M) -> Self {
        Self::Http {
            url: url.into(),
            message: message.into(),
            status: None,
        }
    }

    /// Create a new HTTP error with a status code.
    pub fn http_with_status<U: Into<String>, M: Into<String>>(
        url: U,
        message: M,
        status: u16,
    ) -> Self {
        Self::Http {
            url: url.into(),
            message: message.into(),
            status: Some(status),
        }
    }

    /// Create a new invalid target error.
    pub fn invalid_target<T: Into<String>, R: Into<String>>(target: T, reason: R) -> Self {
        Self::InvalidTarget {
            target: target.into(),
            reason: reason.into(),
        }
    }

    /// Create a new internal error.
    pub fn internal<M: Into<String>>(message: M) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Check if this error is recoverable at the candidate level.
    ///
    /// Recoverable errors let the resolver move on to the next WHOIS server
    /// or RDAP URL; only exhaustion of all candidates fails the resolution.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::InvalidTarget { .. } | Self::Internal { .. })
    }
}

impl fmt::Display for RegDataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connection { host, message } => {
                write!(f, "Connection error for '{}': {}", host, message)
            }
            Self::Timeout {
                operation,
                duration,
            } => {
                write!(f, "Timeout after {:?} during: {}", duration, operation)
            }
            Self::EmptyResponse { host } => {
                write!(f, "No data received from '{}'", host)
            }
            Self::Parse { message } => {
                write!(f, "Parse error: {}", message)
            }
            Self::Protocol { source, message } => {
                write!(f, "Error reported by '{}': {}", source, message)
            }
            Self::Decode { message } => {
                write!(f, "Decode error: {}", message)
            }
            Self::BootstrapFormat { message } => {
                write!(f, "Malformed bootstrap document: {}", message)
            }
            Self::NoServersFound { target } => {
                write!(f, "No whois servers found for '{}'", target)
            }
            Self::Http {
                url,
                message,
                status,
            } => {
                if let Some(code) = status {
                    write!(f, "HTTP error for '{}' (status {}): {}", url, code, message)
                } else {
                    write!(f, "HTTP error for '{}': {}", url, message)
                }
            }
            Self::InvalidTarget { target, reason } => {
                write!(f, "Invalid target '{}': {}", target, reason)
            }
            Self::Internal { message } => {
                write!(f, "Internal error: {}", message)
            }
        }
    }
}

impl std::error::Error for RegDataError {}

// Implement From conversions for common error types
impl From<reqwest::Error> for RegDataError {
    fn from(err: reqwest::Error) -> Self {
        let url = err
            .url()
            .map(|u| u.to_string())
            .unwrap_or_else(|| "<unknown>".to_string());
        if err.is_timeout() {
            Self::timeout(format!("HTTP request to {}", url), std::time::Duration::from_secs(0))
        } else if err.is_connect() {
            Self::connection(url, err.to_string())
        } else {
            Self::http(url, err.to_string())
        }
    }
}

impl From<serde_json::Error> for RegDataError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse {
            message: format!("JSON parsing failed: {}", err),
        }
    }
}

impl From<std::io::Error> for RegDataError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal {
            message: format!("I/O error: {}", err),
        }
    }
}
