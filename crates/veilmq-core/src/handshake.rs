// ============================================
// File: crates/veilmq-core/src/handshake.rs
// ============================================
//! # CURVE Handshake
//!
//! ## Creation Reason
//! Implements the four-step mutual-authentication handshake that turns a
//! raw connection into an encrypted channel bound to both peers'
//! long-term X25519 keys.
//!
//! ## Main Functionality
//! - `Command`: wire encoding of HELLO / WELCOME / INITIATE / READY
//! - `ClientHandshake` / `ServerHandshake`: per-connection state machines
//! - Key schedule: HKDF-SHA256 over X25519 shared secrets
//!
//! ## Handshake Flow
//! ```text
//! Client                                          Server
//!   │                                               │
//!   │  HELLO: client transient key (clear) ───────► │
//!   │                                               │
//!   │                      derive k_welcome from    │
//!   │                      DH(st,ct) || DH(ss,ct)   │
//!   │                                               │
//!   │  ◄─────── WELCOME: server transient key +     │
//!   │           box[k_welcome](server static key)   │
//!   │                                               │
//!   │  open box, check server key == expected       │
//!   │                                               │
//!   │  INITIATE: box[k_ee](client static key ────►  │
//!   │            + vouch[k_cs](client transient))   │
//!   │                                               │
//!   │                      open box, open vouch,    │
//!   │                      confirm client identity, │
//!   │                      consult authenticator    │
//!   │                                               │
//!   │  ◄──────────── READY: box[k_ready]("READY")   │
//!   │                                               │
//!   │ ═══════════ Encrypted Channel ═══════════════ │
//! ```
//!
//! (ct/st = client/server transient keys, cs/ss = client/server static
//! keys; every box is ChaCha20-Poly1305 under an HKDF-derived single-use
//! key.)
//!
//! ## Security Properties
//! - **Mutual authentication**: WELCOME proves the server holds its
//!   static secret; the INITIATE vouch proves the client holds its own
//!   and binds it to this connection's transient key
//! - **Forward secrecy**: session keys mix the transient-transient DH
//! - **Rejection silence**: every failure is a local structured error;
//!   nothing about the cause is ever sent to the peer
//!
//! ## ⚠️ Important Note for Next Developer
//! - Each derived handshake key encrypts exactly one box; the zero nonce
//!   relies on that - never reuse a key for a second box
//! - Intermediate DH outputs are zeroized before returning
//!
//! ## Last Modified
//! v0.1.0 - Initial handshake implementation

use bytes::{BufMut, BytesMut};
use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    ChaCha20Poly1305, Nonce,
};
use hkdf::Hkdf;
use sha2::Sha256;
use tracing::{debug, trace};
use zeroize::Zeroize;

use crate::error::{CoreError, Result};
use crate::keys::{KeyPair, PublicKey, KEY_SIZE};
use crate::session::{Direction, SessionCrypto, SessionKey, SessionPair};

// ============================================
// Constants
// ============================================

/// HKDF salt for all handshake key derivation.
pub const HKDF_SALT: &[u8] = b"veilmq-v1";

/// Size of the Poly1305 authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

/// Size of the ChaCha20-Poly1305 nonce in bytes.
pub const NONCE_SIZE: usize = 12;

const INFO_WELCOME: &[u8] = b"veilmq-welcome";
const INFO_VOUCH: &[u8] = b"veilmq-vouch";
const INFO_INITIATE: &[u8] = b"veilmq-initiate";
const INFO_READY: &[u8] = b"veilmq-ready";
const INFO_SESSION: &[u8] = b"veilmq-session";

const READY_PAYLOAD: &[u8] = b"READY";

/// WELCOME identity box: 32-byte key + tag.
const WELCOME_BOX_SIZE: usize = KEY_SIZE + TAG_SIZE;
/// Vouch box: 32-byte transient key + tag.
const VOUCH_SIZE: usize = KEY_SIZE + TAG_SIZE;
/// INITIATE box: 32-byte static key + vouch + tag.
const INITIATE_BOX_SIZE: usize = KEY_SIZE + VOUCH_SIZE + TAG_SIZE;
/// READY box: "READY" + tag.
const READY_BOX_SIZE: usize = READY_PAYLOAD.len() + TAG_SIZE;

// ============================================
// Wire Commands
// ============================================

/// Command tags on the wire.
const TAG_HELLO: u8 = 0x01;
const TAG_WELCOME: u8 = 0x02;
const TAG_INITIATE: u8 = 0x03;
const TAG_READY: u8 = 0x04;

/// HELLO: opens the handshake with the client's transient key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hello {
    /// Client transient public key (clear).
    pub client_transient: PublicKey,
}

/// WELCOME: server transient key plus the sealed server identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Welcome {
    /// Server transient public key (clear).
    pub server_transient: PublicKey,
    /// box[k_welcome](server static public key).
    pub identity_box: Vec<u8>,
}

/// INITIATE: sealed client identity and vouch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Initiate {
    /// box[k_ee](client static public key || vouch).
    pub vouch_box: Vec<u8>,
}

/// READY: first box under the session key schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ready {
    /// box[k_ready]("READY").
    pub confirm_box: Vec<u8>,
}

/// A handshake command as read from or written to the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Client → server opening.
    Hello(Hello),
    /// Server → client identity proof.
    Welcome(Welcome),
    /// Client → server identity proof.
    Initiate(Initiate),
    /// Server → client confirmation.
    Ready(Ready),
}

impl Command {
    /// Encodes the command into its wire form: 1-byte tag + body.
    #[must_use]
    pub fn encode(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(1 + KEY_SIZE + INITIATE_BOX_SIZE);
        match self {
            Self::Hello(h) => {
                buf.put_u8(TAG_HELLO);
                buf.put_slice(h.client_transient.as_bytes());
            }
            Self::Welcome(w) => {
                buf.put_u8(TAG_WELCOME);
                buf.put_slice(w.server_transient.as_bytes());
                buf.put_slice(&w.identity_box);
            }
            Self::Initiate(i) => {
                buf.put_u8(TAG_INITIATE);
                buf.put_slice(&i.vouch_box);
            }
            Self::Ready(r) => {
                buf.put_u8(TAG_READY);
                buf.put_slice(&r.confirm_box);
            }
        }
        buf
    }

    /// Decodes a command from its wire form with strict length checks.
    ///
    /// # Errors
    /// Returns `MalformedCommand` on an unknown tag or a body whose
    /// length does not match the command exactly.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let (&tag, body) = data
            .split_first()
            .ok_or_else(|| CoreError::malformed("empty command"))?;

        match tag {
            TAG_HELLO => {
                let key = exact_key(body, "HELLO")?;
                Ok(Self::Hello(Hello {
                    client_transient: PublicKey::from_bytes(key),
                }))
            }
            TAG_WELCOME => {
                if body.len() != KEY_SIZE + WELCOME_BOX_SIZE {
                    return Err(CoreError::malformed(format!(
                        "WELCOME body length {}, expected {}",
                        body.len(),
                        KEY_SIZE + WELCOME_BOX_SIZE
                    )));
                }
                let mut key = [0u8; KEY_SIZE];
                key.copy_from_slice(&body[..KEY_SIZE]);
                Ok(Self::Welcome(Welcome {
                    server_transient: PublicKey::from_bytes(key),
                    identity_box: body[KEY_SIZE..].to_vec(),
                }))
            }
            TAG_INITIATE => {
                if body.len() != INITIATE_BOX_SIZE {
                    return Err(CoreError::malformed(format!(
                        "INITIATE body length {}, expected {}",
                        body.len(),
                        INITIATE_BOX_SIZE
                    )));
                }
                Ok(Self::Initiate(Initiate {
                    vouch_box: body.to_vec(),
                }))
            }
            TAG_READY => {
                if body.len() != READY_BOX_SIZE {
                    return Err(CoreError::malformed(format!(
                        "READY body length {}, expected {}",
                        body.len(),
                        READY_BOX_SIZE
                    )));
                }
                Ok(Self::Ready(Ready {
                    confirm_box: body.to_vec(),
                }))
            }
            other => Err(CoreError::malformed(format!(
                "unknown command tag 0x{other:02x}"
            ))),
        }
    }
}

fn exact_key(body: &[u8], command: &str) -> Result<[u8; KEY_SIZE]> {
    if body.len() != KEY_SIZE {
        return Err(CoreError::malformed(format!(
            "{command} body length {}, expected {KEY_SIZE}",
            body.len()
        )));
    }
    let mut key = [0u8; KEY_SIZE];
    key.copy_from_slice(body);
    Ok(key)
}

// ============================================
// Key Schedule
// ============================================

/// Derives a single-use 32-byte box key.
fn derive_key(ikm: &[u8], info: &[u8]) -> Result<[u8; KEY_SIZE]> {
    let hk = Hkdf::<Sha256>::new(Some(HKDF_SALT), ikm);
    let mut key = [0u8; KEY_SIZE];
    hk.expand(info, &mut key)
        .map_err(|_| CoreError::key_derivation("HKDF expansion failed"))?;
    Ok(key)
}

/// Expands the session input keying material into the two
/// direction-separated transport keys (client→server, server→client).
fn derive_session_keys(ikm: &[u8]) -> Result<([u8; KEY_SIZE], [u8; KEY_SIZE])> {
    let hk = Hkdf::<Sha256>::new(Some(HKDF_SALT), ikm);
    let mut okm = [0u8; KEY_SIZE * 2];
    hk.expand(INFO_SESSION, &mut okm)
        .map_err(|_| CoreError::key_derivation("HKDF expansion failed"))?;

    let mut c2s = [0u8; KEY_SIZE];
    let mut s2c = [0u8; KEY_SIZE];
    c2s.copy_from_slice(&okm[..KEY_SIZE]);
    s2c.copy_from_slice(&okm[KEY_SIZE..]);
    okm.zeroize();
    Ok((c2s, s2c))
}

/// Seals one box under a single-use key.
///
/// The zero nonce is sound because every key out of `derive_key` is
/// used for exactly one box.
fn seal_box(key: &[u8; KEY_SIZE], plaintext: &[u8]) -> Result<Vec<u8>> {
    let cipher = ChaCha20Poly1305::new_from_slice(key).map_err(|_| CoreError::Encryption {
        context: "failed to create box cipher".into(),
    })?;
    cipher
        .encrypt(
            &Nonce::from([0u8; NONCE_SIZE]),
            Payload {
                msg: plaintext,
                aad: &[],
            },
        )
        .map_err(|_| CoreError::Encryption {
            context: "box sealing failed".into(),
        })
}

/// Opens one box sealed by [`seal_box`].
fn open_box(key: &[u8; KEY_SIZE], ciphertext: &[u8]) -> Result<Vec<u8>> {
    let cipher = ChaCha20Poly1305::new_from_slice(key).map_err(|_| CoreError::Decryption)?;
    cipher
        .decrypt(
            &Nonce::from([0u8; NONCE_SIZE]),
            Payload {
                msg: ciphertext,
                aad: &[],
            },
        )
        .map_err(|_| CoreError::Decryption)
}

// ============================================
// Derived Session State
// ============================================

/// Session keys pending the READY confirmation.
struct PendingKeys {
    c2s: [u8; KEY_SIZE],
    s2c: [u8; KEY_SIZE],
    ready: [u8; KEY_SIZE],
}

impl PendingKeys {
    fn derive(dh_transient: &[u8; KEY_SIZE], dh_static: &[u8; KEY_SIZE]) -> Result<Self> {
        let mut ikm = [0u8; KEY_SIZE * 2];
        ikm[..KEY_SIZE].copy_from_slice(dh_transient);
        ikm[KEY_SIZE..].copy_from_slice(dh_static);

        let (c2s, s2c) = derive_session_keys(&ikm)?;
        let ready = derive_key(&ikm, INFO_READY)?;
        ikm.zeroize();
        Ok(Self { c2s, s2c, ready })
    }

    fn into_client_pair(mut self) -> SessionPair {
        let pair = SessionPair {
            send: SessionCrypto::new(SessionKey::from_bytes(self.c2s), Direction::ClientToServer),
            recv: SessionCrypto::new(SessionKey::from_bytes(self.s2c), Direction::ServerToClient),
        };
        self.c2s.zeroize();
        self.s2c.zeroize();
        self.ready.zeroize();
        pair
    }

    fn into_server_pair(mut self) -> SessionPair {
        let pair = SessionPair {
            send: SessionCrypto::new(SessionKey::from_bytes(self.s2c), Direction::ServerToClient),
            recv: SessionCrypto::new(SessionKey::from_bytes(self.c2s), Direction::ClientToServer),
        };
        self.c2s.zeroize();
        self.s2c.zeroize();
        self.ready.zeroize();
        pair
    }
}

// ============================================
// ClientHandshake
// ============================================

enum ClientState {
    Start,
    AwaitWelcome,
    AwaitReady(PendingKeys),
    Done,
}

/// Client side of the CURVE handshake.
///
/// # Usage
/// `hello()` → send; receive → `welcome()` → send; receive → `ready()`.
/// Any out-of-order call or failed verification is a `HandshakeFailed`
/// error and poisons the handshake.
pub struct ClientHandshake {
    local: KeyPair,
    transient: KeyPair,
    server_key: PublicKey,
    state: ClientState,
}

impl ClientHandshake {
    /// Creates a client handshake for one connection attempt.
    ///
    /// # Arguments
    /// * `local` - Client's long-term keypair
    /// * `server_key` - The server public key this client expects
    #[must_use]
    pub fn new(local: KeyPair, server_key: PublicKey) -> Self {
        Self {
            local,
            transient: KeyPair::generate(),
            server_key,
            state: ClientState::Start,
        }
    }

    /// Produces the opening HELLO command.
    ///
    /// # Errors
    /// Returns `HandshakeFailed` if called more than once.
    pub fn hello(&mut self) -> Result<Command> {
        if !matches!(self.state, ClientState::Start) {
            return Err(CoreError::handshake("HELLO already sent"));
        }
        self.state = ClientState::AwaitWelcome;
        trace!(transient = %self.transient.public_key(), "sending HELLO");
        Ok(Command::Hello(Hello {
            client_transient: self.transient.public_key(),
        }))
    }

    /// Processes WELCOME: authenticates the server, produces INITIATE.
    ///
    /// # Errors
    /// Returns `HandshakeFailed` if the identity box does not open under
    /// the expected server key or the revealed identity differs from it.
    pub fn welcome(&mut self, welcome: &Welcome) -> Result<Command> {
        if !matches!(self.state, ClientState::AwaitWelcome) {
            return Err(CoreError::handshake("WELCOME out of order"));
        }

        let mut dh_tt = self.transient.diffie_hellman(&welcome.server_transient)?;
        let mut dh_ts = self.transient.diffie_hellman(&self.server_key)?;

        // Open the server identity box under k_welcome.
        let mut welcome_ikm = [0u8; KEY_SIZE * 2];
        welcome_ikm[..KEY_SIZE].copy_from_slice(&dh_tt);
        welcome_ikm[KEY_SIZE..].copy_from_slice(&dh_ts);
        let k_welcome = derive_key(&welcome_ikm, INFO_WELCOME)?;
        welcome_ikm.zeroize();
        dh_ts.zeroize();

        let identity = open_box(&k_welcome, &welcome.identity_box)
            .map_err(|_| CoreError::handshake("server identity box did not open"))?;
        if identity.as_slice() != self.server_key.as_bytes() {
            return Err(CoreError::handshake("server identity mismatch"));
        }
        debug!(server = %self.server_key, "server identity confirmed");

        // Vouch: prove we own our static key and bind it to this
        // connection's transient key.
        let mut dh_ss = self.local.diffie_hellman(&self.server_key)?;
        let k_vouch = derive_key(&dh_ss, INFO_VOUCH)?;
        let vouch = seal_box(&k_vouch, self.transient.public_key().as_bytes())?;

        let k_initiate = derive_key(&dh_tt, INFO_INITIATE)?;
        let mut body = Vec::with_capacity(KEY_SIZE + VOUCH_SIZE);
        body.extend_from_slice(self.local.public_key().as_bytes());
        body.extend_from_slice(&vouch);
        let vouch_box = seal_box(&k_initiate, &body)?;

        let pending = PendingKeys::derive(&dh_tt, &dh_ss)?;
        dh_tt.zeroize();
        dh_ss.zeroize();

        self.state = ClientState::AwaitReady(pending);
        Ok(Command::Initiate(Initiate { vouch_box }))
    }

    /// Processes READY and yields the established session keys.
    ///
    /// # Errors
    /// Returns `HandshakeFailed` if the confirmation box does not open.
    pub fn ready(&mut self, ready: &Ready) -> Result<SessionPair> {
        let pending = match std::mem::replace(&mut self.state, ClientState::Done) {
            ClientState::AwaitReady(pending) => pending,
            _ => return Err(CoreError::handshake("READY out of order")),
        };

        let confirm = open_box(&pending.ready, &ready.confirm_box)
            .map_err(|_| CoreError::handshake("READY confirmation did not open"))?;
        if confirm != READY_PAYLOAD {
            return Err(CoreError::handshake("READY confirmation mismatch"));
        }

        debug!(server = %self.server_key, "handshake complete");
        Ok(pending.into_client_pair())
    }
}

// ============================================
// ServerHandshake
// ============================================

enum ServerState {
    AwaitHello,
    AwaitInitiate { client_transient: PublicKey },
    Accepted { pending: PendingKeys },
    Done,
}

/// Server side of the CURVE handshake.
///
/// # Usage
/// receive → `hello()` → send; receive → `initiate()` (returns the
/// confirmed client key for the authorization decision) → `ready()` →
/// send. The caller decides between `initiate()` and `ready()` whether
/// the client is admitted at all; a rejected client simply never
/// receives READY.
pub struct ServerHandshake {
    local: KeyPair,
    transient: KeyPair,
    state: ServerState,
}

impl ServerHandshake {
    /// Creates a server handshake for one inbound connection.
    #[must_use]
    pub fn new(local: KeyPair) -> Self {
        Self {
            local,
            transient: KeyPair::generate(),
            state: ServerState::AwaitHello,
        }
    }

    /// Processes HELLO and produces WELCOME.
    ///
    /// # Errors
    /// Returns `HandshakeFailed` out of order or `KeyDerivation` if the
    /// client transient key is a low-order point.
    pub fn hello(&mut self, hello: &Hello) -> Result<Command> {
        if !matches!(self.state, ServerState::AwaitHello) {
            return Err(CoreError::handshake("HELLO out of order"));
        }

        let mut dh_tt = self.transient.diffie_hellman(&hello.client_transient)?;
        let mut dh_st = self.local.diffie_hellman(&hello.client_transient)?;

        let mut welcome_ikm = [0u8; KEY_SIZE * 2];
        welcome_ikm[..KEY_SIZE].copy_from_slice(&dh_tt);
        welcome_ikm[KEY_SIZE..].copy_from_slice(&dh_st);
        let k_welcome = derive_key(&welcome_ikm, INFO_WELCOME)?;
        welcome_ikm.zeroize();
        dh_tt.zeroize();
        dh_st.zeroize();

        let identity_box = seal_box(&k_welcome, self.local.public_key().as_bytes())?;

        self.state = ServerState::AwaitInitiate {
            client_transient: hello.client_transient,
        };
        Ok(Command::Welcome(Welcome {
            server_transient: self.transient.public_key(),
            identity_box,
        }))
    }

    /// Processes INITIATE and returns the confirmed client public key.
    ///
    /// The caller must run the authorization decision on the returned
    /// key before calling [`Self::ready`].
    ///
    /// # Errors
    /// Returns `HandshakeFailed` if the box or vouch does not open, or
    /// the vouch does not bind the client's transient key.
    pub fn initiate(&mut self, initiate: &Initiate) -> Result<PublicKey> {
        let client_transient = match &self.state {
            ServerState::AwaitInitiate { client_transient } => *client_transient,
            _ => return Err(CoreError::handshake("INITIATE out of order")),
        };

        let mut dh_tt = self.transient.diffie_hellman(&client_transient)?;
        let k_initiate = derive_key(&dh_tt, INFO_INITIATE)?;

        let body = open_box(&k_initiate, &initiate.vouch_box)
            .map_err(|_| CoreError::handshake("INITIATE box did not open"))?;
        if body.len() != KEY_SIZE + VOUCH_SIZE {
            return Err(CoreError::handshake("INITIATE body length mismatch"));
        }

        let mut client_key_bytes = [0u8; KEY_SIZE];
        client_key_bytes.copy_from_slice(&body[..KEY_SIZE]);
        let client_key = PublicKey::from_bytes(client_key_bytes);

        // The vouch only opens if the peer holds the static secret
        // matching the key it just claimed.
        let mut dh_ss = self.local.diffie_hellman(&client_key)?;
        let k_vouch = derive_key(&dh_ss, INFO_VOUCH)?;
        let vouched = open_box(&k_vouch, &body[KEY_SIZE..])
            .map_err(|_| CoreError::handshake("vouch did not open"))?;
        if vouched.as_slice() != client_transient.as_bytes() {
            return Err(CoreError::handshake("vouch does not bind this connection"));
        }
        debug!(client = %client_key, "client identity confirmed");

        let pending = PendingKeys::derive(&dh_tt, &dh_ss)?;
        dh_tt.zeroize();
        dh_ss.zeroize();

        self.state = ServerState::Accepted { pending };
        Ok(client_key)
    }

    /// Produces READY and yields the established session keys.
    ///
    /// Call only after the authorization decision approved the client.
    ///
    /// # Errors
    /// Returns `HandshakeFailed` if called out of order.
    pub fn ready(&mut self) -> Result<(Command, SessionPair)> {
        let pending = match std::mem::replace(&mut self.state, ServerState::Done) {
            ServerState::Accepted { pending } => pending,
            _ => return Err(CoreError::handshake("READY out of order")),
        };

        let confirm_box = seal_box(&pending.ready, READY_PAYLOAD)?;
        let pair = pending.into_server_pair();
        Ok((Command::Ready(Ready { confirm_box }), pair))
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    fn run_client_server(
        client_local: KeyPair,
        expected_server: PublicKey,
        server_local: KeyPair,
    ) -> Result<(SessionPair, SessionPair, PublicKey)> {
        let mut client = ClientHandshake::new(client_local, expected_server);
        let mut server = ServerHandshake::new(server_local);

        let hello = match client.hello()? {
            Command::Hello(h) => h,
            other => panic!("expected HELLO, got {other:?}"),
        };
        let welcome = match server.hello(&hello)? {
            Command::Welcome(w) => w,
            other => panic!("expected WELCOME, got {other:?}"),
        };
        let initiate = match client.welcome(&welcome)? {
            Command::Initiate(i) => i,
            other => panic!("expected INITIATE, got {other:?}"),
        };
        let client_key = server.initiate(&initiate)?;
        let (ready, server_pair) = server.ready()?;
        let ready = match ready {
            Command::Ready(r) => r,
            other => panic!("expected READY, got {other:?}"),
        };
        let client_pair = client.ready(&ready)?;

        Ok((client_pair, server_pair, client_key))
    }

    #[test]
    fn test_full_handshake_establishes_matching_sessions() {
        let client_local = KeyPair::generate();
        let server_local = KeyPair::generate();
        let client_public = client_local.public_key();

        let (mut client_pair, mut server_pair, confirmed) =
            run_client_server(client_local, server_local.public_key(), server_local.clone())
                .unwrap();

        // Server learned the genuine client identity.
        assert_eq!(confirmed, client_public);

        // Client → server direction.
        let sealed = client_pair.send.seal(b"ping").unwrap();
        assert_eq!(server_pair.recv.open(&sealed).unwrap(), b"ping");

        // Server → client direction.
        let sealed = server_pair.send.seal(b"pong").unwrap();
        assert_eq!(client_pair.recv.open(&sealed).unwrap(), b"pong");
    }

    #[test]
    fn test_wrong_expected_server_key_fails() {
        let client_local = KeyPair::generate();
        let server_local = KeyPair::generate();
        let impostor = KeyPair::generate();

        // Client expects a different server than the one answering.
        let mut client = ClientHandshake::new(client_local, impostor.public_key());
        let mut server = ServerHandshake::new(server_local);

        let hello = match client.hello().unwrap() {
            Command::Hello(h) => h,
            other => panic!("expected HELLO, got {other:?}"),
        };
        let welcome = match server.hello(&hello).unwrap() {
            Command::Welcome(w) => w,
            other => panic!("expected WELCOME, got {other:?}"),
        };

        assert!(matches!(
            client.welcome(&welcome),
            Err(CoreError::HandshakeFailed { .. })
        ));
    }

    #[test]
    fn test_tampered_initiate_rejected() {
        let client_local = KeyPair::generate();
        let server_local = KeyPair::generate();

        let mut client = ClientHandshake::new(client_local, server_local.public_key());
        let mut server = ServerHandshake::new(server_local);

        let hello = match client.hello().unwrap() {
            Command::Hello(h) => h,
            other => panic!("expected HELLO, got {other:?}"),
        };
        let welcome = match server.hello(&hello).unwrap() {
            Command::Welcome(w) => w,
            other => panic!("expected WELCOME, got {other:?}"),
        };
        let mut initiate = match client.welcome(&welcome).unwrap() {
            Command::Initiate(i) => i,
            other => panic!("expected INITIATE, got {other:?}"),
        };

        initiate.vouch_box[0] ^= 0xFF;

        assert!(matches!(
            server.initiate(&initiate),
            Err(CoreError::HandshakeFailed { .. })
        ));
    }

    #[test]
    fn test_out_of_order_commands_rejected() {
        let mut client = ClientHandshake::new(KeyPair::generate(), KeyPair::generate().public_key());
        let ready = Ready {
            confirm_box: vec![0u8; READY_BOX_SIZE],
        };
        assert!(client.ready(&ready).is_err());

        let mut server = ServerHandshake::new(KeyPair::generate());
        assert!(server.ready().is_err());
    }

    #[test]
    fn test_command_codec_roundtrip() {
        let commands = [
            Command::Hello(Hello {
                client_transient: PublicKey::from_bytes([7u8; KEY_SIZE]),
            }),
            Command::Welcome(Welcome {
                server_transient: PublicKey::from_bytes([9u8; KEY_SIZE]),
                identity_box: vec![1u8; WELCOME_BOX_SIZE],
            }),
            Command::Initiate(Initiate {
                vouch_box: vec![2u8; INITIATE_BOX_SIZE],
            }),
            Command::Ready(Ready {
                confirm_box: vec![3u8; READY_BOX_SIZE],
            }),
        ];

        for command in commands {
            let wire = command.encode();
            assert_eq!(Command::decode(&wire).unwrap(), command);
        }
    }

    #[test]
    fn test_malformed_commands_rejected() {
        // Empty input
        assert!(matches!(
            Command::decode(&[]),
            Err(CoreError::MalformedCommand { .. })
        ));

        // Unknown tag
        assert!(matches!(
            Command::decode(&[0x7F, 0, 0]),
            Err(CoreError::MalformedCommand { .. })
        ));

        // Truncated HELLO
        let mut wire = vec![TAG_HELLO];
        wire.extend_from_slice(&[0u8; KEY_SIZE - 1]);
        assert!(matches!(
            Command::decode(&wire),
            Err(CoreError::MalformedCommand { .. })
        ));

        // Oversized READY
        let mut wire = vec![TAG_READY];
        wire.extend_from_slice(&vec![0u8; READY_BOX_SIZE + 1]);
        assert!(matches!(
            Command::decode(&wire),
            Err(CoreError::MalformedCommand { .. })
        ));
    }
}
