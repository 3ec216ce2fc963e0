// ============================================
// File: crates/veilmq/src/error.rs
// ============================================
//! # Socket Error Types
//!
//! ## Creation Reason
//! Defines the errors surfaced by the public socket API: lifecycle
//! violations, missing configuration, and wrapped core/transport
//! failures.
//!
//! ## Main Functionality
//! - `SocketError`: Primary error enum for socket operations
//! - Conversions from `CoreError` and `TransportError`
//!
//! ## ⚠️ Important Note for Next Developer
//! - `AuthenticationRejected` is a LOCAL diagnostic only. It must never
//!   drive any bytes to the rejected peer; from the peer's view every
//!   rejection is indistinguishable silence
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use thiserror::Error;

use veilmq_core::CoreError;
use veilmq_transport::TransportError;

// ============================================
// Result Type Alias
// ============================================

/// Result type for socket operations.
pub type Result<T> = std::result::Result<T, SocketError>;

// ============================================
// SocketError
// ============================================

/// Errors surfaced by socket and authenticator operations.
#[derive(Error, Debug)]
pub enum SocketError {
    // ========================================
    // Configuration Errors
    // ========================================

    /// A required key was not configured before bind/connect.
    #[error("Missing key: {key} must be set before {operation}")]
    MissingKey {
        /// Which key is missing
        key: String,
        /// The operation that needed it
        operation: String,
    },

    /// Operation is not valid in the socket's current state.
    #[error("Invalid state: cannot {operation} while {state}")]
    InvalidState {
        /// The attempted operation
        operation: String,
        /// The state the socket is in
        state: String,
    },

    /// Operation is not valid for this socket's role.
    #[error("Role {role} does not support {operation}")]
    WrongRole {
        /// The socket's role
        role: String,
        /// The attempted operation
        operation: String,
    },

    // ========================================
    // Runtime Errors
    // ========================================

    /// Socket is not bound or connected.
    #[error("Socket not connected")]
    NotConnected,

    /// Socket has been closed.
    #[error("Socket closed")]
    Closed,

    /// The operation was interrupted by close on another task.
    #[error("Operation interrupted by close")]
    Interrupted,

    /// The remote server did not admit this socket's certificate.
    ///
    /// Only ever produced locally from a handshake timeout; the server
    /// sends nothing on rejection.
    #[error("Authentication rejected: no session established")]
    AuthenticationRejected,

    // ========================================
    // Wrapped Errors
    // ========================================

    /// Cryptographic or handshake failure.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Connection or framing failure.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl SocketError {
    // ========================================
    // Convenience Constructors
    // ========================================

    /// Creates a `MissingKey` error.
    pub fn missing_key(key: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::MissingKey {
            key: key.into(),
            operation: operation.into(),
        }
    }

    /// Creates an `InvalidState` error.
    pub fn invalid_state(operation: impl Into<String>, state: impl Into<String>) -> Self {
        Self::InvalidState {
            operation: operation.into(),
            state: state.into(),
        }
    }

    /// Creates a `WrongRole` error.
    pub fn wrong_role(role: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::WrongRole {
            role: role.into(),
            operation: operation.into(),
        }
    }

    // ========================================
    // Error Classification
    // ========================================

    /// Returns `true` for caller mistakes (wrong state, missing config)
    /// as opposed to runtime failures.
    #[must_use]
    pub const fn is_usage_error(&self) -> bool {
        matches!(
            self,
            Self::MissingKey { .. } | Self::InvalidState { .. } | Self::WrongRole { .. }
        )
    }

    /// Returns `true` if this error might indicate a hostile peer.
    #[must_use]
    pub fn is_suspicious(&self) -> bool {
        match self {
            Self::Core(e) => e.is_suspicious(),
            Self::Transport(e) => matches!(e, TransportError::MalformedPayload { .. }),
            _ => false,
        }
    }
}

// ============================================
// Tests
// ============================================
