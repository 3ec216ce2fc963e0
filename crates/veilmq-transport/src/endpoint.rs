// ============================================
// File: crates/veilmq-transport/src/endpoint.rs
// ============================================
//! # Endpoint Parsing
//!
//! ## Creation Reason
//! Sockets are addressed by endpoint strings like `tcp://127.0.0.1:9000`
//! or `tcp://*:9000`. This module parses and validates them once, at the
//! API boundary, so the connection code only sees well-formed endpoints.
//!
//! ## Main Functionality
//! - `Endpoint`: parsed scheme + host + port
//! - Wildcard host (`*`) resolution for bind addresses
//!
//! ## ⚠️ Important Note for Next Developer
//! - Only the `tcp` scheme is supported; reject everything else here
//!   rather than failing later with a confusing connect error
//! - Hostname resolution happens at connect time, not at parse time
//!
//! ## Last Modified
//! v0.1.0 - Initial endpoint parsing

use std::fmt;
use std::str::FromStr;

use crate::error::{Result, TransportError};

/// Scheme prefix for TCP endpoints.
const TCP_SCHEME: &str = "tcp://";

/// A parsed transport endpoint.
///
/// # Examples
/// ```
/// use veilmq_transport::endpoint::Endpoint;
///
/// let ep: Endpoint = "tcp://127.0.0.1:9000".parse().unwrap();
/// assert_eq!(ep.port(), 9000);
/// assert!(!ep.is_wildcard());
///
/// let bind: Endpoint = "tcp://*:9000".parse().unwrap();
/// assert!(bind.is_wildcard());
/// assert_eq!(bind.bind_authority(), "0.0.0.0:9000");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    host: String,
    port: u16,
}

impl Endpoint {
    /// Parses an endpoint string of the form `tcp://host:port`.
    ///
    /// The host may be an IP address, a hostname, or `*` to bind all
    /// interfaces.
    ///
    /// # Errors
    /// Returns `InvalidEndpoint` for an unsupported scheme, a missing
    /// host, or an unparseable port.
    pub fn parse(text: &str) -> Result<Self> {
        let authority = text.strip_prefix(TCP_SCHEME).ok_or_else(|| {
            TransportError::invalid_endpoint(text, "expected 'tcp://' scheme")
        })?;

        // Split on the last colon so IPv6 literals like [::1]:9000 work.
        let (host, port_text) = authority.rsplit_once(':').ok_or_else(|| {
            TransportError::invalid_endpoint(text, "expected 'host:port'")
        })?;
        if host.is_empty() {
            return Err(TransportError::invalid_endpoint(text, "empty host"));
        }

        let port = u16::from_str(port_text).map_err(|_| {
            TransportError::invalid_endpoint(text, format!("invalid port '{port_text}'"))
        })?;

        Ok(Self {
            host: host.to_string(),
            port,
        })
    }

    /// The host part as given (may be `*`).
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The port part.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Returns `true` if the host is the `*` bind wildcard.
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        self.host == "*"
    }

    /// The `host:port` authority for connecting.
    #[must_use]
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The `host:port` authority for binding, with `*` mapped to
    /// all interfaces.
    #[must_use]
    pub fn bind_authority(&self) -> String {
        if self.is_wildcard() {
            format!("0.0.0.0:{}", self.port)
        } else {
            self.authority()
        }
    }
}

impl FromStr for Endpoint {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{TCP_SCHEME}{}:{}", self.host, self.port)
    }
}

// ============================================
// Tests
// ============================================
