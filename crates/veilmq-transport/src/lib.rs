// ============================================
// File: crates/veilmq-transport/src/lib.rs
// ============================================
//! # VeilMQ Transport - Wire Layer
//!
//! ## Creation Reason
//! Provides the byte-level plumbing under VeilMQ's secure sockets:
//! endpoint parsing, length-prefixed payload framing over TCP streams,
//! and the multi-frame message codec.
//!
//! ## Main Functionality
//!
//! ### Modules
//! - [`endpoint`]: `tcp://host:port` endpoint parsing
//! - [`wire`]: length-prefixed payload read/write
//! - [`codec`]: multi-frame message packing
//! - [`error`]: transport-specific error types
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                   veilmq                            │
//! │                      │                              │
//! │           ┌──────────┴──────────┐                   │
//! │           ▼                     ▼                   │
//! │     veilmq-core          veilmq-transport           │
//! │                          You are here ◄──           │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Data Flow
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  Message frames                                          │
//! │       │ codec::encode_frames                             │
//! │       ▼                                                  │
//! │  Single payload ──► session encryption (veilmq-core)     │
//! │       │                                                  │
//! │       ▼ wire::write_payload                              │
//! │  Length-prefixed bytes on the TCP stream                 │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - This crate never sees keys or plaintext policy; it moves bytes
//! - All peer-supplied lengths are validated before allocation
//!
//! ## Last Modified
//! v0.1.0 - Initial transport layer implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod codec;
pub mod endpoint;
pub mod error;
pub mod wire;

// Re-export primary types
pub use codec::{decode_frames, encode_frames};
pub use endpoint::Endpoint;
pub use error::{Result, TransportError};
pub use wire::{read_payload, write_payload, MAX_PAYLOAD_SIZE};
