// ============================================
// File: crates/veilmq-core/src/keys.rs
// ============================================
//! # Cryptographic Key Types
//!
//! ## Creation Reason
//! Defines the key types used throughout veilmq with proper security
//! properties (zeroize on drop, redacting Debug impls).
//!
//! ## Main Functionality
//! - `PublicKey`: 32-byte X25519 public key, Z85 text form
//! - `KeyPair`: Long-term X25519 keypair for peer identity
//! - `Certificate`: One keypair plus its text encodings, immutable
//!
//! ## Key Lifecycle
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │  Certificate / KeyPair (long-term identity)                │
//! │  ├─ Generated once per server or client                    │
//! │  ├─ Public half shared as 40-char Z85 text                 │
//! │  └─ Private half never logged or transmitted               │
//! │                                                            │
//! │  Transient keypairs (per-connection, see handshake module) │
//! │  ├─ Generated fresh for each connection attempt            │
//! │  └─ Discarded once session keys are derived                │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Secret key material MUST stay out of Debug/Display/log output
//! - `Certificate` is a value type: no setters, no key rotation
//!
//! ## Last Modified
//! v0.1.0 - Initial key type definitions

use std::fmt;
use std::str::FromStr;

use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};

use crate::error::{CoreError, Result};
use crate::z85;

/// Size of an X25519 key in bytes.
pub const KEY_SIZE: usize = 32;

// ============================================
// PublicKey
// ============================================

/// An X25519 public key.
///
/// Safe to share publicly; this is the value the authenticator's key
/// whitelist stores and the handshake confirms ownership of. The text
/// form is 40 Z85 characters.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey([u8; KEY_SIZE]);

impl PublicKey {
    /// Creates a public key from raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Parses a public key from its 40-character Z85 text form.
    ///
    /// # Errors
    /// Returns `InvalidKeyEncoding` if the text is not a valid encoding
    /// of a 32-byte value.
    pub fn from_z85(text: &str) -> Result<Self> {
        Ok(Self(z85::decode_key(text)?))
    }

    /// Returns the raw public key bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }

    /// Returns the raw public key bytes (owned).
    #[must_use]
    pub const fn to_bytes(&self) -> [u8; KEY_SIZE] {
        self.0
    }

    /// Returns the 40-character Z85 text form.
    #[must_use]
    pub fn to_z85(&self) -> String {
        z85::encode_key(&self.0)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Show truncated hex for debugging
        write!(
            f,
            "PublicKey({:02x}{:02x}{:02x}{:02x}...)",
            self.0[0], self.0[1], self.0[2], self.0[3]
        )
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_z85())
    }
}

impl FromStr for PublicKey {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_z85(s)
    }
}

impl From<X25519PublicKey> for PublicKey {
    fn from(key: X25519PublicKey) -> Self {
        Self(key.to_bytes())
    }
}

impl From<PublicKey> for X25519PublicKey {
    fn from(key: PublicKey) -> Self {
        X25519PublicKey::from(key.0)
    }
}

impl Serialize for PublicKey {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_z85())
        } else {
            serializer.serialize_bytes(&self.0)
        }
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            Self::from_z85(&s).map_err(serde::de::Error::custom)
        } else {
            let bytes = <Vec<u8>>::deserialize(deserializer)?;
            if bytes.len() != KEY_SIZE {
                return Err(serde::de::Error::invalid_length(bytes.len(), &"32 bytes"));
            }
            let mut arr = [0u8; KEY_SIZE];
            arr.copy_from_slice(&bytes);
            Ok(Self(arr))
        }
    }
}

// ============================================
// KeyPair
// ============================================

/// Long-term X25519 keypair identifying one peer.
///
/// # Security
/// - The secret is zeroized on drop (via `x25519-dalek`)
/// - Never serialize or log the secret half
/// - Generated using the OS random number generator
///
/// # Example
/// ```
/// use veilmq_core::keys::KeyPair;
///
/// let server = KeyPair::generate();
/// let client = KeyPair::generate();
///
/// let shared_a = server.diffie_hellman(&client.public_key()).unwrap();
/// let shared_b = client.diffie_hellman(&server.public_key()).unwrap();
/// assert_eq!(shared_a, shared_b);
/// ```
#[derive(Clone)]
pub struct KeyPair {
    /// X25519 secret (private)
    secret: StaticSecret,
    /// Derived public key
    public: PublicKey,
}

impl KeyPair {
    /// Generates a new random keypair.
    ///
    /// Uses the operating system's secure random number generator.
    /// An unavailable OS RNG is fatal and non-retryable.
    #[must_use]
    pub fn generate() -> Self {
        let secret = StaticSecret::random_from_rng(OsRng);
        let public = PublicKey::from(X25519PublicKey::from(&secret));
        Self { secret, public }
    }

    /// Creates a keypair from raw secret bytes, deriving the public key.
    #[must_use]
    pub fn from_secret_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        let secret = StaticSecret::from(bytes);
        let public = PublicKey::from(X25519PublicKey::from(&secret));
        Self { secret, public }
    }

    /// Creates a keypair from the 40-character Z85 secret text.
    ///
    /// # Errors
    /// Returns `InvalidKeyEncoding` if the text does not decode to
    /// 32 bytes.
    pub fn from_secret_z85(text: &str) -> Result<Self> {
        Ok(Self::from_secret_bytes(z85::decode_key(text)?))
    }

    /// Returns the public key.
    #[must_use]
    pub const fn public_key(&self) -> PublicKey {
        self.public
    }

    /// Performs a Diffie-Hellman exchange with a peer's public key.
    ///
    /// # Errors
    /// Returns `KeyDerivation` if the peer key is a low-order point
    /// (the shared secret would not depend on our secret).
    pub fn diffie_hellman(&self, peer: &PublicKey) -> Result<[u8; KEY_SIZE]> {
        let shared = self.secret.diffie_hellman(&X25519PublicKey::from(*peer));
        if !shared.was_contributory() {
            return Err(CoreError::key_derivation(
                "peer supplied a low-order public key",
            ));
        }
        Ok(*shared.as_bytes())
    }

    /// Exports the raw secret bytes.
    ///
    /// # Security Warning
    /// Handle the returned bytes with extreme care; zero them after use.
    #[must_use]
    pub fn to_secret_bytes(&self) -> [u8; KEY_SIZE] {
        self.secret.to_bytes()
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print secret key material
        f.debug_struct("KeyPair")
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}

// ============================================
// Certificate
// ============================================

/// A peer identity: exactly one keypair, generated or parsed once,
/// immutable thereafter.
///
/// # Purpose
/// The configuration-surface form of a [`KeyPair`]: both halves are
/// available as 40-character Z85 text for wiring into sockets
/// (`set_private_key`, `set_curve_client`) and authenticator whitelists.
///
/// # Immutability
/// There is no key rotation; replacing an identity means creating a new
/// `Certificate`. Rotating keys mid-session would break in-flight
/// handshakes.
///
/// # Example
/// ```
/// use veilmq_core::keys::Certificate;
///
/// let cert = Certificate::generate();
/// let copy = Certificate::from_keys(&cert.public_key(), &cert.private_key()).unwrap();
/// assert_eq!(cert.public_key(), copy.public_key());
/// ```
pub struct Certificate {
    /// The underlying keypair.
    keypair: KeyPair,
    /// Advertised public key (derived on generate, as-given on parse).
    public: PublicKey,
}

impl Certificate {
    /// Generates a certificate with a fresh keypair.
    #[must_use]
    pub fn generate() -> Self {
        let keypair = KeyPair::generate();
        let public = keypair.public_key();
        Self { keypair, public }
    }

    /// Reconstructs a certificate from its text encodings.
    ///
    /// Validates that both texts are well-formed 40-character encodings
    /// of 32-byte values. The public text is stored as given; it is not
    /// cross-checked against the private key.
    ///
    /// # Errors
    /// Returns `InvalidKeyEncoding` if either text fails to decode.
    pub fn from_keys(public_text: &str, private_text: &str) -> Result<Self> {
        let public = PublicKey::from_z85(public_text)?;
        let keypair = KeyPair::from_secret_z85(private_text)?;
        Ok(Self { keypair, public })
    }

    /// Returns the public key in Z85 text form.
    #[must_use]
    pub fn public_key(&self) -> String {
        self.public.to_z85()
    }

    /// Returns the private key in Z85 text form.
    ///
    /// # Security Warning
    /// The returned text is secret material; pass it only to
    /// `set_private_key` or secure storage, never to logs.
    #[must_use]
    pub fn private_key(&self) -> String {
        z85::encode_key(&self.keypair.to_secret_bytes())
    }

    /// Returns the typed public key.
    #[must_use]
    pub const fn public(&self) -> PublicKey {
        self.public
    }

    /// Returns the underlying keypair.
    #[must_use]
    pub const fn keypair(&self) -> &KeyPair {
        &self.keypair
    }
}

impl fmt::Debug for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print private key material
        f.debug_struct("Certificate")
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypair_generation_unique() {
        let kp1 = KeyPair::generate();
        let kp2 = KeyPair::generate();

        assert_ne!(kp1.public_key(), kp2.public_key());
    }

    #[test]
    fn test_diffie_hellman_agreement() {
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();

        let shared_a = alice.diffie_hellman(&bob.public_key()).unwrap();
        let shared_b = bob.diffie_hellman(&alice.public_key()).unwrap();

        assert_eq!(shared_a, shared_b);
    }

    #[test]
    fn test_low_order_peer_rejected() {
        let alice = KeyPair::generate();
        // The identity point: shared secret would be all zeros.
        let low_order = PublicKey::from_bytes([0u8; KEY_SIZE]);

        assert!(matches!(
            alice.diffie_hellman(&low_order),
            Err(CoreError::KeyDerivation { .. })
        ));
    }

    #[test]
    fn test_certificate_roundtrip() {
        let cert = Certificate::generate();

        assert_eq!(cert.public_key().len(), 40);
        assert_eq!(cert.private_key().len(), 40);

        let restored = Certificate::from_keys(&cert.public_key(), &cert.private_key()).unwrap();
        assert_eq!(cert.public_key(), restored.public_key());
        assert_eq!(cert.private_key(), restored.private_key());
    }

    #[test]
    fn test_certificate_bad_text_rejected() {
        let cert = Certificate::generate();

        // Wrong length
        assert!(matches!(
            Certificate::from_keys("short", &cert.private_key()),
            Err(CoreError::InvalidKeyEncoding { .. })
        ));

        // Invalid character (comma not in alphabet)
        let bad = ",".repeat(40);
        assert!(matches!(
            Certificate::from_keys(&cert.public_key(), &bad),
            Err(CoreError::InvalidKeyEncoding { .. })
        ));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let cert = Certificate::generate();
        let debug = format!("{:?} {:?}", cert, cert.keypair());

        assert!(!debug.contains(&cert.private_key()));
    }

    #[test]
    fn test_public_key_text_roundtrip() {
        let kp = KeyPair::generate();
        let text = kp.public_key().to_z85();
        let parsed: PublicKey = text.parse().unwrap();

        assert_eq!(parsed, kp.public_key());
    }

    #[test]
    fn test_public_key_serde() {
        let kp = KeyPair::generate();
        let public = kp.public_key();

        let json = serde_json::to_string(&public).unwrap();
        assert!(json.contains(&public.to_z85()));

        let restored: PublicKey = serde_json::from_str(&json).unwrap();
        assert_eq!(public, restored);
    }
}
