// ============================================
// File: crates/veilmq/src/lib.rs
// ============================================
//! # VeilMQ - Authenticated Messaging Sockets
//!
//! ## Creation Reason
//! Provides mutually-authenticated, encrypted, role-typed message
//! sockets with whitelist access control: the public surface over the
//! `veilmq-core` cryptography and `veilmq-transport` wire layer.
//!
//! ## Main Functionality
//!
//! ### Access Control ([`auth`])
//! - `Authenticator`: whitelist/denylist policy + background decision loop
//!
//! ### Sockets ([`socket`], [`role`], [`context`])
//! - `SecureSocket`: lifecycle-checked, CURVE-secured sockets
//! - `Role`: push/pull, pub/sub, req/rep, dealer/router, pair
//! - `Context`: shared handle sockets and authenticators attach to
//!
//! ### Messages ([`message`])
//! - `Message`: atomic multi-frame exchange
//!
//! ## Usage Example
//! ```no_run
//! use veilmq::{Authenticator, Certificate, Context, Message, Role, SecureSocket};
//!
//! # async fn example() -> Result<(), veilmq::SocketError> {
//! let context = Context::new();
//!
//! // Server: only the client's key gets in.
//! let server_cert = Certificate::generate();
//! let client_cert = Certificate::generate();
//! let mut auth = Authenticator::new();
//! auth.allow_key_text(&client_cert.public_key())?;
//! auth.start(&context)?;
//!
//! let server = SecureSocket::create(&context, Role::Puller);
//! server.set_private_key(&server_cert.private_key())?;
//! server.set_curve_server()?;
//! server.bind("tcp://*:9000").await?;
//!
//! // Client: pins the server's public key.
//! let client = SecureSocket::create(&context, Role::Pusher);
//! client.set_private_key(&client_cert.private_key())?;
//! client.set_curve_client(&server_cert.public_key())?;
//! client.connect("tcp://127.0.0.1:9000").await?;
//!
//! let mut message = Message::new();
//! message.append(&b"helllo world!"[..]);
//! message.send(&client).await?;
//!
//! let received = Message::receive(&server).await?;
//! assert_eq!(received.text(), "helllo world!");
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                   veilmq                            │
//! │               You are here ◄──                      │
//! │           ┌──────────┴──────────┐                   │
//! │           ▼                     ▼                   │
//! │     veilmq-core          veilmq-transport           │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Security Model
//! - Certificates are X25519 keypairs; only public keys ever travel
//! - Admission is address OR key against a live whitelist, denylist
//!   entries win, and an unreachable authenticator rejects (fail-closed)
//! - A rejected peer observes silence, never a reason
//!
//! ## ⚠️ Important Note for Next Developer
//! - A `Context` must outlive every socket and authenticator created
//!   against it
//! - `close()` is the cancellation mechanism: it unblocks every
//!   pending `receive` with `Closed`
//!
//! ## Last Modified
//! v0.1.0 - Initial implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
pub mod context;
mod curve;
pub mod error;
pub mod message;
pub mod role;
pub mod socket;

// Re-export commonly used items
pub use auth::{Authenticator, Decision, DefaultPolicy, RejectReason};
pub use context::Context;
pub use error::{Result, SocketError};
pub use message::Message;
pub use role::Role;
pub use socket::SecureSocket;

// The certificate types come from the core crate; re-exported so most
// applications depend on this crate alone.
pub use veilmq_core::{Certificate, KeyPair, PublicKey};
