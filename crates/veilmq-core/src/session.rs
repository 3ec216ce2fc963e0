// ============================================
// File: crates/veilmq-core/src/session.rs
// ============================================
//! # Session Encryption
//!
//! ## Creation Reason
//! Once the handshake completes, every payload on the connection is
//! protected by ChaCha20-Poly1305 under direction-separated session
//! keys. This module owns that per-direction cipher state.
//!
//! ## Main Functionality
//! - `SessionKey`: 32-byte key, zeroized on drop
//! - `SessionCrypto`: one direction's cipher with a strict counter
//! - `SessionPair`: the send/recv halves a finished handshake yields
//!
//! ## Message Format
//! ```text
//! ┌─────────────────┬──────────────────────────────┐
//! │ Counter (8B LE) │ Ciphertext + Poly1305 tag    │
//! └─────────────────┴──────────────────────────────┘
//! ```
//!
//! The counter doubles as the nonce (low 8 of 12 bytes) and as replay
//! protection: the receiver accepts exactly the counter it expects and
//! nothing else, so reordered or replayed records fail authentication.
//!
//! ## ⚠️ Important Note for Next Developer
//! - The direction label is authenticated as AAD; a record reflected
//!   back to its sender will not open
//! - `seal`/`open` take `&mut self` on purpose: counter state makes
//!   the cipher single-owner per direction
//!
//! ## Last Modified
//! v0.1.0 - Initial session encryption

use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    ChaCha20Poly1305, Nonce,
};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{CoreError, Result};
use crate::handshake::{NONCE_SIZE, TAG_SIZE};
use crate::keys::KEY_SIZE;

/// Size of the record counter prefix in bytes.
pub const COUNTER_SIZE: usize = 8;

/// Smallest well-formed record: counter + empty ciphertext + tag.
pub const MIN_RECORD_SIZE: usize = COUNTER_SIZE + TAG_SIZE;

// ============================================
// SessionKey
// ============================================

/// A 32-byte session key, zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SessionKey([u8; KEY_SIZE]);

impl SessionKey {
    /// Wraps raw key bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Returns the raw key bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SessionKey(REDACTED)")
    }
}

// ============================================
// Direction
// ============================================

/// Traffic direction a session key belongs to.
///
/// The direction label is mixed into every record as AAD, so the two
/// keys of a session can never be confused for each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Records sealed by the client, opened by the server.
    ClientToServer,
    /// Records sealed by the server, opened by the client.
    ServerToClient,
}

impl Direction {
    /// The AAD label authenticated with every record.
    #[must_use]
    pub const fn aad(self) -> &'static [u8] {
        match self {
            Self::ClientToServer => b"veilmq-c2s",
            Self::ServerToClient => b"veilmq-s2c",
        }
    }
}

// ============================================
// SessionCrypto
// ============================================

/// One direction's cipher state: key, direction label, record counter.
pub struct SessionCrypto {
    key: SessionKey,
    direction: Direction,
    counter: u64,
}

impl SessionCrypto {
    /// Creates cipher state for one direction, starting at counter 0.
    #[must_use]
    pub const fn new(key: SessionKey, direction: Direction) -> Self {
        Self {
            key,
            direction,
            counter: 0,
        }
    }

    /// Seals a payload into a record and advances the counter.
    ///
    /// # Errors
    /// Returns `Encryption` if the cipher fails or the counter space is
    /// exhausted.
    pub fn seal(&mut self, payload: &[u8]) -> Result<Vec<u8>> {
        let counter = self.counter;
        self.counter = counter.checked_add(1).ok_or_else(|| CoreError::Encryption {
            context: "record counter exhausted".into(),
        })?;

        let cipher =
            ChaCha20Poly1305::new_from_slice(self.key.as_bytes()).map_err(|_| {
                CoreError::Encryption {
                    context: "failed to create session cipher".into(),
                }
            })?;
        let ciphertext = cipher
            .encrypt(
                &make_nonce(counter),
                Payload {
                    msg: payload,
                    aad: self.direction.aad(),
                },
            )
            .map_err(|_| CoreError::Encryption {
                context: "record sealing failed".into(),
            })?;

        let mut record = Vec::with_capacity(COUNTER_SIZE + ciphertext.len());
        record.extend_from_slice(&counter.to_le_bytes());
        record.extend_from_slice(&ciphertext);
        Ok(record)
    }

    /// Opens a record and advances the counter.
    ///
    /// # Errors
    /// Returns `Decryption` if the record is too short, carries any
    /// counter other than the expected one, or fails authentication.
    pub fn open(&mut self, record: &[u8]) -> Result<Vec<u8>> {
        if record.len() < MIN_RECORD_SIZE {
            return Err(CoreError::Decryption);
        }

        let mut counter_bytes = [0u8; COUNTER_SIZE];
        counter_bytes.copy_from_slice(&record[..COUNTER_SIZE]);
        let counter = u64::from_le_bytes(counter_bytes);
        if counter != self.counter {
            // Replayed, reordered, or dropped record.
            return Err(CoreError::Decryption);
        }

        let cipher = ChaCha20Poly1305::new_from_slice(self.key.as_bytes())
            .map_err(|_| CoreError::Decryption)?;
        let payload = cipher
            .decrypt(
                &make_nonce(counter),
                Payload {
                    msg: &record[COUNTER_SIZE..],
                    aad: self.direction.aad(),
                },
            )
            .map_err(|_| CoreError::Decryption)?;

        self.counter = counter.checked_add(1).ok_or(CoreError::Decryption)?;
        Ok(payload)
    }
}

impl std::fmt::Debug for SessionCrypto {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCrypto")
            .field("key", &"REDACTED")
            .field("direction", &self.direction)
            .field("counter", &self.counter)
            .finish()
    }
}

/// Builds the 12-byte nonce for a record counter.
fn make_nonce(counter: u64) -> Nonce {
    let mut nonce = [0u8; NONCE_SIZE];
    nonce[..COUNTER_SIZE].copy_from_slice(&counter.to_le_bytes());
    Nonce::from(nonce)
}

// ============================================
// SessionPair
// ============================================

/// The two cipher halves a finished handshake yields for one peer.
#[derive(Debug)]
pub struct SessionPair {
    /// Cipher for records this peer sends.
    pub send: SessionCrypto,
    /// Cipher for records this peer receives.
    pub recv: SessionCrypto,
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    fn linked_pair() -> (SessionCrypto, SessionCrypto) {
        let key = [0x42u8; KEY_SIZE];
        (
            SessionCrypto::new(SessionKey::from_bytes(key), Direction::ClientToServer),
            SessionCrypto::new(SessionKey::from_bytes(key), Direction::ClientToServer),
        )
    }

    #[test]
    fn test_seal_open_roundtrip() {
        let (mut tx, mut rx) = linked_pair();
        for payload in [b"".as_slice(), b"hello", &[0u8; 4096]] {
            let record = tx.seal(payload).unwrap();
            assert_eq!(rx.open(&record).unwrap(), payload);
        }
    }

    #[test]
    fn test_counter_advances_per_record() {
        let (mut tx, mut rx) = linked_pair();
        let first = tx.seal(b"one").unwrap();
        let second = tx.seal(b"two").unwrap();
        assert_eq!(&first[..COUNTER_SIZE], &0u64.to_le_bytes());
        assert_eq!(&second[..COUNTER_SIZE], &1u64.to_le_bytes());
        assert_eq!(rx.open(&first).unwrap(), b"one");
        assert_eq!(rx.open(&second).unwrap(), b"two");
    }

    #[test]
    fn test_replay_rejected() {
        let (mut tx, mut rx) = linked_pair();
        let record = tx.seal(b"payload").unwrap();
        rx.open(&record).unwrap();
        assert!(matches!(rx.open(&record), Err(CoreError::Decryption)));
    }

    #[test]
    fn test_reorder_rejected() {
        let (mut tx, mut rx) = linked_pair();
        let first = tx.seal(b"one").unwrap();
        let second = tx.seal(b"two").unwrap();
        // Receiving the second record first must fail.
        assert!(matches!(rx.open(&second), Err(CoreError::Decryption)));
        // The expected record still opens.
        assert_eq!(rx.open(&first).unwrap(), b"one");
    }

    #[test]
    fn test_tampered_record_rejected() {
        let (mut tx, mut rx) = linked_pair();
        let mut record = tx.seal(b"payload").unwrap();
        let last = record.len() - 1;
        record[last] ^= 0x01;
        assert!(matches!(rx.open(&record), Err(CoreError::Decryption)));
    }

    #[test]
    fn test_direction_mismatch_rejected() {
        let key = [0x42u8; KEY_SIZE];
        let mut tx =
            SessionCrypto::new(SessionKey::from_bytes(key), Direction::ClientToServer);
        let mut rx =
            SessionCrypto::new(SessionKey::from_bytes(key), Direction::ServerToClient);
        let record = tx.seal(b"payload").unwrap();
        // Same key, wrong direction label: AAD mismatch.
        assert!(matches!(rx.open(&record), Err(CoreError::Decryption)));
    }

    #[test]
    fn test_truncated_record_rejected() {
        let (mut tx, mut rx) = linked_pair();
        let record = tx.seal(b"payload").unwrap();
        assert!(matches!(
            rx.open(&record[..MIN_RECORD_SIZE - 1]),
            Err(CoreError::Decryption)
        ));
    }

    #[test]
    fn test_debug_redacts_key() {
        let crypto = SessionCrypto::new(
            SessionKey::from_bytes([0xAA; KEY_SIZE]),
            Direction::ClientToServer,
        );
        let debug = format!("{crypto:?}");
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains("aa"));
    }
}
