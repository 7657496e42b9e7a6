//! # RegData Library
//!
//! A library for resolving ownership/registration metadata for domain names,
//! IP addresses, and Autonomous System Numbers over the legacy WHOIS text
//! protocol and the modern RDAP JSON protocol, normalized into one
//! structured record.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use regdata_lib::RegistrationResolver;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let resolver = RegistrationResolver::new();
//!     let report = resolver.lookup("example.com").await;
//!
//!     println!("success: {}", report.success);
//!     for (key, value) in &report.data {
//!         println!("{}: {}", key, value);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **WHOIS wire client**: raw TCP port 43 with server discovery via IANA
//!   referral and TLD heuristics
//! - **RDAP walker**: bootstrap-matched endpoints with recursive referral
//!   following and cycle avoidance
//! - **Structural merge**: repeated responses accumulate instead of
//!   overwriting
//! - **Normalization**: RDAP entities and vCards flattened into WHOIS-style
//!   keys
//! - **Configurable**: per-attempt timeouts, charsets, protocol ordering

// Re-export main public API types and functions
// This makes them available as regdata_lib::TypeName
pub use error::RegDataError;
pub use merge::{merge_at, merge_object, AccumulatedInfo};
pub use normalize::{flatten_entity, vcard_field_name, whois_view};
pub use resolver::{
    bootstrap_kind_for, rdap_path_for, BootstrapRegistries, RegistrationResolver,
};
pub use types::{
    DecodeErrorMode, FieldValue, LookupConfig, LookupReport, ParsedRecord, Protocol,
    QueryTarget, RecordSummary,
};

// Protocol building blocks stay reachable for callers composing their own
// resolution flows
pub use protocols::bootstrap::{
    domain_suffixes, fetch_registry, AsnRange, BootstrapKind, BootstrapRegistry,
    BootstrapService,
};
pub use protocols::discovery::{
    discover_servers, parse_iana_referral, static_candidates, ServerTable, IANA_HOST,
};
pub use protocols::rdap::{RdapClient, RdapPath};
pub use protocols::whois::{WhoisClient, WhoisResponse};

// Public modules
pub mod geo;
pub mod protocols;

// Internal modules - these are not part of the public API surface
mod error;
mod merge;
mod normalize;
mod resolver;
mod types;

// Type alias for convenience
pub type Result<T> = std::result::Result<T, RegDataError>;

// Library version and metadata
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const AUTHOR: &str = env!("CARGO_PKG_AUTHORS");
