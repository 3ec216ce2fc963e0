// ============================================
// File: crates/veilmq-transport/src/error.rs
// ============================================
//! # Transport Error Types
//!
//! ## Creation Reason
//! Defines error types specific to transport layer operations:
//! endpoint parsing, TCP connection handling, and wire framing.
//!
//! ## Main Functionality
//! - `TransportError`: Primary error enum for transport operations
//! - Error conversion from system errors
//! - Categorization of retryable vs fatal errors
//!
//! ## Error Categories
//! 1. **Endpoint Errors**: Unparseable or unsupported endpoint strings
//! 2. **Network Errors**: Bind, connect, send/receive failures
//! 3. **Framing Errors**: Oversized or malformed wire payloads
//!
//! ## ⚠️ Important Note for Next Developer
//! - Network errors are often transient and retryable
//! - A peer closing mid-payload is `ConnectionClosed`, not `Io`
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

// ============================================
// Result Type Alias
// ============================================

/// Result type for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;

// ============================================
// TransportError
// ============================================

/// Transport layer error types.
///
/// # Categories
/// - **Endpoint**: Endpoint string parsing errors
/// - **Network**: Socket and connection errors
/// - **Framing**: Wire payload errors
#[derive(Error, Debug)]
pub enum TransportError {
    // ========================================
    // Endpoint Errors
    // ========================================

    /// Endpoint string could not be parsed.
    #[error("Invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint {
        /// The endpoint string as given
        endpoint: String,
        /// Why parsing failed
        reason: String,
    },

    // ========================================
    // Network Errors
    // ========================================

    /// Address already in use.
    #[error("Address {addr} already in use")]
    AddressInUse {
        /// The address that's in use
        addr: SocketAddr,
    },

    /// Connection attempt was refused.
    #[error("Connection refused by {addr}")]
    ConnectionRefused {
        /// The address that refused us
        addr: SocketAddr,
    },

    /// Permission denied for operation.
    #[error("Permission denied: {operation}")]
    PermissionDenied {
        /// What operation was denied
        operation: String,
    },

    /// Peer closed the connection.
    #[error("Connection closed by peer")]
    ConnectionClosed,

    // ========================================
    // Framing Errors
    // ========================================

    /// Payload is malformed or does not match its framing.
    #[error("Malformed payload: {reason}")]
    MalformedPayload {
        /// What's wrong with the payload
        reason: String,
    },

    /// Payload exceeds the size limit.
    #[error("Payload size {size} exceeds limit {max}")]
    PayloadTooLarge {
        /// Declared payload size
        size: usize,
        /// Configured limit
        max: usize,
    },

    // ========================================
    // Wrapped Errors
    // ========================================

    /// I/O error from the system.
    #[error("I/O error: {context}")]
    Io {
        /// What was happening when the error occurred
        context: String,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl TransportError {
    // ========================================
    // Convenience Constructors
    // ========================================

    /// Creates an `InvalidEndpoint` error.
    pub fn invalid_endpoint(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidEndpoint {
            endpoint: endpoint.into(),
            reason: reason.into(),
        }
    }

    /// Creates a `MalformedPayload` error.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedPayload {
            reason: reason.into(),
        }
    }

    /// Creates an `Io` error with context.
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Maps a bind failure to its specific variant where possible.
    pub fn from_bind(addr: SocketAddr, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::AddrInUse => Self::AddressInUse { addr },
            io::ErrorKind::PermissionDenied => Self::PermissionDenied {
                operation: format!("bind {addr}"),
            },
            _ => Self::io(format!("binding {addr}"), source),
        }
    }

    /// Maps a connect failure to its specific variant where possible.
    pub fn from_connect(addr: SocketAddr, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::ConnectionRefused => Self::ConnectionRefused { addr },
            io::ErrorKind::PermissionDenied => Self::PermissionDenied {
                operation: format!("connect {addr}"),
            },
            _ => Self::io(format!("connecting to {addr}"), source),
        }
    }

    // ========================================
    // Error Classification
    // ========================================

    /// Returns `true` if this error is transient and retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ConnectionRefused { .. } => true,
            Self::Io { source, .. } => matches!(
                source.kind(),
                io::ErrorKind::WouldBlock
                    | io::ErrorKind::Interrupted
                    | io::ErrorKind::TimedOut
            ),
            _ => false,
        }
    }

    /// Returns `true` if this is a connection-level error (as opposed
    /// to endpoint parsing or framing).
    #[must_use]
    pub const fn is_network_error(&self) -> bool {
        matches!(
            self,
            Self::AddressInUse { .. }
                | Self::ConnectionRefused { .. }
                | Self::PermissionDenied { .. }
                | Self::ConnectionClosed
                | Self::Io { .. }
        )
    }
}

// ============================================
// Error Conversions
// ============================================

impl From<io::Error> for TransportError {
    fn from(err: io::Error) -> Self {
        Self::Io {
            context: "unspecified I/O operation".into(),
            source: err,
        }
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TransportError::invalid_endpoint("udp://x", "unsupported scheme");
        assert!(err.to_string().contains("udp://x"));
        assert!(err.to_string().contains("unsupported scheme"));

        let err = TransportError::PayloadTooLarge {
            size: 100,
            max: 10,
        };
        assert!(err.to_string().contains("100"));
    }

    #[test]
    fn test_bind_error_mapping() {
        let addr: SocketAddr = "127.0.0.1:9000".parse().unwrap();
        let err = TransportError::from_bind(
            addr,
            io::Error::new(io::ErrorKind::AddrInUse, "in use"),
        );
        assert!(matches!(err, TransportError::AddressInUse { .. }));
        assert!(err.is_network_error());
    }

    #[test]
    fn test_connect_error_mapping() {
        let addr: SocketAddr = "127.0.0.1:9000".parse().unwrap();
        let err = TransportError::from_connect(
            addr,
            io::Error::new(io::ErrorKind::ConnectionRefused, "refused"),
        );
        assert!(matches!(err, TransportError::ConnectionRefused { .. }));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::WouldBlock, "would block");
        let transport_err: TransportError = io_err.into();
        assert!(transport_err.is_retryable());
    }
}
