// ============================================
// File: crates/veilmq-core/src/lib.rs
// ============================================
//! # VeilMQ Core - Certificates & CURVE Cryptography
//!
//! ## Creation Reason
//! Provides the key handling and cryptographic operations behind VeilMQ's
//! secure transport: certificates, Z85 key text, the CURVE handshake, and
//! session encryption. This crate is pure computation with no I/O.
//!
//! ## Main Functionality
//!
//! ### Keys Module ([`keys`])
//! - `PublicKey`, `KeyPair`, `Certificate`
//! - X25519 key generation and Diffie-Hellman
//!
//! ### Z85 Module ([`z85`])
//! - Printable key encoding (32 bytes ⇄ 40 characters)
//!
//! ### Handshake Module ([`handshake`])
//! - HELLO / WELCOME / INITIATE / READY wire commands
//! - `ClientHandshake` / `ServerHandshake` state machines
//!
//! ### Session Module ([`session`])
//! - Direction-separated ChaCha20-Poly1305 record encryption
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                   veilmq                            │
//! │                      │                              │
//! │           ┌──────────┴──────────┐                   │
//! │           ▼                     ▼                   │
//! │     veilmq-core          veilmq-transport           │
//! │     You are here                                    │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Security Guarantees
//! - **Confidentiality**: ChaCha20-Poly1305 authenticated encryption
//! - **Authenticity**: mutual key confirmation via X25519 + HKDF
//! - **Forward Secrecy**: transient key exchange per connection
//! - **Replay Protection**: strict record counters per direction
//!
//! ## ⚠️ Important Note for Next Developer
//! - ALL cryptographic code uses audited RustCrypto implementations
//! - NEVER implement custom crypto primitives
//! - ALL secret key types MUST zeroize on drop
//! - Private key material must never appear in logs or Debug output
//!
//! ## Last Modified
//! v0.1.0 - Initial implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod handshake;
pub mod keys;
pub mod session;
pub mod z85;

// Re-export commonly used items
pub use error::{CoreError, Result};
pub use handshake::{ClientHandshake, Command, ServerHandshake};
pub use keys::{Certificate, KeyPair, PublicKey, KEY_SIZE};
pub use session::{Direction, SessionCrypto, SessionKey, SessionPair};
pub use z85::ENCODED_KEY_LEN;
