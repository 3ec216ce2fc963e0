// ============================================
// File: crates/veilmq-core/src/error.rs
// ============================================
//! # Core Error Types
//!
//! ## Creation Reason
//! Defines error types for key handling, certificate parsing, and the
//! CURVE handshake in the veilmq core crate.
//!
//! ## Main Functionality
//! - `CoreError`: Primary error enum for key and handshake operations
//! - Convenience constructors and classification helpers
//!
//! ## Error Categories
//! 1. **Encoding Errors**: Z85 text that does not decode to key material
//! 2. **Crypto Errors**: Key generation, derivation, AEAD failures
//! 3. **Handshake Errors**: Malformed commands, failed key confirmation
//!
//! ## ⚠️ Important Note for Next Developer
//! - NEVER include key material in error messages
//! - A handshake failure must stay indistinguishable from the peer's
//!   point of view regardless of its cause (no rejection oracle)
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use thiserror::Error;

// ============================================
// Result Type Alias
// ============================================

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

// ============================================
// CoreError
// ============================================

/// Core error types for key and handshake operations.
///
/// # Security Note
/// Error messages are informative for local debugging without revealing
/// key material or whitelist contents.
#[derive(Error, Debug)]
pub enum CoreError {
    // ========================================
    // Encoding Errors
    // ========================================

    /// Key text is not a valid Z85 encoding of a 32-byte value.
    #[error("Invalid key encoding: {reason}")]
    InvalidKeyEncoding {
        /// Why decoding failed
        reason: String,
    },

    // ========================================
    // Cryptographic Errors
    // ========================================

    /// Failed to generate cryptographic key material.
    #[error("Key generation failed: {context}")]
    KeyGeneration {
        /// What key was being generated
        context: String,
    },

    /// Key derivation failed.
    #[error("Key derivation failed: {reason}")]
    KeyDerivation {
        /// Why derivation failed
        reason: String,
    },

    /// Encryption operation failed.
    #[error("Encryption failed: {context}")]
    Encryption {
        /// What was being encrypted
        context: String,
    },

    /// Decryption failed (authentication tag or counter mismatch).
    #[error("Decryption failed: authentication error")]
    Decryption,

    // ========================================
    // Handshake Errors
    // ========================================

    /// Handshake command is malformed or truncated.
    #[error("Malformed handshake command: {reason}")]
    MalformedCommand {
        /// What's wrong with the command
        reason: String,
    },

    /// Key confirmation failed during the handshake.
    #[error("Handshake failed: {reason}")]
    HandshakeFailed {
        /// Which step failed (local diagnostics only, never sent to peer)
        reason: String,
    },
}

impl CoreError {
    // ========================================
    // Convenience Constructors
    // ========================================

    /// Creates an `InvalidKeyEncoding` error.
    pub fn invalid_encoding(reason: impl Into<String>) -> Self {
        Self::InvalidKeyEncoding {
            reason: reason.into(),
        }
    }

    /// Creates a `KeyDerivation` error.
    pub fn key_derivation(reason: impl Into<String>) -> Self {
        Self::KeyDerivation {
            reason: reason.into(),
        }
    }

    /// Creates a `MalformedCommand` error.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedCommand {
            reason: reason.into(),
        }
    }

    /// Creates a `HandshakeFailed` error.
    pub fn handshake(reason: impl Into<String>) -> Self {
        Self::HandshakeFailed {
            reason: reason.into(),
        }
    }

    // ========================================
    // Error Classification
    // ========================================

    /// Returns `true` if this is a cryptographic error.
    #[must_use]
    pub const fn is_crypto_error(&self) -> bool {
        matches!(
            self,
            Self::KeyGeneration { .. }
                | Self::KeyDerivation { .. }
                | Self::Encryption { .. }
                | Self::Decryption
        )
    }

    /// Returns `true` if this error might indicate a hostile peer.
    ///
    /// These errors warrant additional logging/monitoring.
    #[must_use]
    pub const fn is_suspicious(&self) -> bool {
        matches!(
            self,
            Self::Decryption | Self::MalformedCommand { .. } | Self::HandshakeFailed { .. }
        )
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
        let err = CoreError::invalid_encoding("length 39, expected 40");
        assert!(err.to_string().contains("length 39"));

        let err = CoreError::Decryption;
        assert!(err.to_string().contains("authentication"));
    }

    #[test]
    fn test_error_classification() {
        assert!(CoreError::Decryption.is_crypto_error());
        assert!(CoreError::Decryption.is_suspicious());

        assert!(CoreError::malformed("truncated").is_suspicious());
        assert!(!CoreError::malformed("truncated").is_crypto_error());

        assert!(!CoreError::invalid_encoding("bad char").is_suspicious());
    }
}
