//! Protocol implementations for registration data resolution.
//!
//! This module contains the pieces the resolver wires together: bootstrap
//! registry matching, WHOIS server discovery, the raw WHOIS wire client, and
//! the RDAP referral walker.

/// IANA bootstrap registry matching (RFC 7484)
pub mod bootstrap;

/// WHOIS server discovery (IANA referral + static table)
pub mod discovery;

/// RDAP client and referral walker
pub mod rdap;

/// Raw WHOIS wire protocol client and parser
pub mod whois;

// Re-export commonly used types
pub use bootstrap::{BootstrapKind, BootstrapRegistry, BootstrapService};
pub use discovery::ServerTable;
pub use rdap::{RdapClient, RdapPath};
pub use whois::{WhoisClient, WhoisResponse};
