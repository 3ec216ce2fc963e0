// ============================================
// File: crates/veilmq/src/socket.rs
// ============================================
//! # Secure Sockets
//!
//! ## Creation Reason
//! The public socket surface: a role-typed, optionally CURVE-secured
//! message socket with the lifecycle
//! `Unconfigured → Configured → Bound|Connected → Closed`.
//!
//! ## Main Functionality
//! - `SecureSocket::create` + `set_private_key` / `set_curve_server` /
//!   `set_curve_client`: configuration, immutable once bound/connected
//! - `bind` / `connect`: endpoint attachment
//! - `send` / `receive` / `close`: message exchange
//!
//! ## Connection Architecture
//! ```text
//! ┌───────────────┐ accept ┌──────────────────────────────────┐
//! │ Accept loop   │ ─────► │ Per-connection task              │
//! │ (bound socket)│        │  handshake → admit / park        │
//! └───────────────┘        │  ┌──────────┐    ┌────────────┐  │
//!                          │  │ reader   │    │ writer     │  │
//!                          │  │ loop     │    │ loop       │  │
//!                          │  └────┬─────┘    └─────▲──────┘  │
//!                          └───────┼────────────────┼─────────┘
//!                                  ▼                │
//!                          inbound queue      per-peer queue
//!                            (receive)            (send)
//! ```
//!
//! ## Rejection Semantics
//! A peer the authenticator turns away is PARKED: its connection stays
//! open, without traffic, until the handshake window lapses or the
//! socket closes, then it is dropped. The rejected side observes only
//! silence, never a reason.
//!
//! ## ⚠️ Important Note for Next Developer
//! - Never hold the state lock across an await point
//! - `close()` must unblock every pending `receive` with `Closed`;
//!   the closed watch channel is what guarantees the wakeup
//! - Configuration calls are not thread-safe against each other on the
//!   same socket; the caller serializes them
//!
//! ## Last Modified
//! v0.1.0 - Initial socket implementation

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use dashmap::DashMap;
use parking_lot::RwLock;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{lookup_host, TcpListener, TcpStream};
use tokio::sync::{mpsc, watch, Mutex};
use tokio::time::timeout;
use tracing::{debug, info, trace, warn};

use veilmq_core::{KeyPair, PublicKey};
use veilmq_transport::{
    decode_frames, encode_frames, read_payload, write_payload, Endpoint, TransportError,
};

use crate::context::Context;
use crate::curve::{
    channel_halves, plain_admission, run_client, run_server, Opener, Sealer, Security,
    ServerOutcome,
};
use crate::error::{Result, SocketError};
use crate::role::Role;

/// How long a handshake may take before the connection is discarded.
/// Also bounds how long a rejected connection stays parked.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(30);

/// Depth of the shared inbound message queue.
const INBOUND_QUEUE_DEPTH: usize = 1024;

/// Depth of each peer's outbound message queue.
const OUTBOUND_QUEUE_DEPTH: usize = 64;

// ============================================
// Configuration
// ============================================

#[derive(Clone, Copy, PartialEq, Eq)]
enum CurveMode {
    Plain,
    Server,
    Client,
}

#[derive(Clone, Default)]
struct Config {
    local: Option<KeyPair>,
    server_key: Option<PublicKey>,
    mode: Option<CurveMode>,
}

impl Config {
    fn mode(&self) -> CurveMode {
        self.mode.unwrap_or(CurveMode::Plain)
    }

    fn security(&self, operation: &str) -> Result<Security> {
        match self.mode() {
            CurveMode::Plain => Ok(Security::Plain),
            CurveMode::Server => {
                let local = self
                    .local
                    .clone()
                    .ok_or_else(|| SocketError::missing_key("private key", operation))?;
                Ok(Security::CurveServer { local })
            }
            CurveMode::Client => {
                let local = self
                    .local
                    .clone()
                    .ok_or_else(|| SocketError::missing_key("private key", operation))?;
                let server_key = self
                    .server_key
                    .ok_or_else(|| SocketError::missing_key("server public key", operation))?;
                Ok(Security::CurveClient { local, server_key })
            }
        }
    }
}

// ============================================
// Lifecycle State
// ============================================

enum State {
    Idle(Config),
    Bound(Arc<Active>),
    Connected(Arc<Active>),
    Closed,
}

impl State {
    fn name(&self) -> &'static str {
        match self {
            Self::Idle(config) => {
                if config.local.is_some() || config.mode.is_some() {
                    "configured"
                } else {
                    "unconfigured"
                }
            }
            Self::Bound(_) => "bound",
            Self::Connected(_) => "connected",
            Self::Closed => "closed",
        }
    }
}

/// Why a blocking call was woken before producing a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Fault {
    None,
    /// Client handshake never completed; the server admitted nothing.
    Rejected,
}

// ============================================
// Active
// ============================================

/// Live I/O state shared by a bound or connected socket and its tasks.
struct Active {
    role: Role,
    local_addr: Option<SocketAddr>,
    peers: DashMap<u64, mpsc::Sender<Vec<Bytes>>>,
    next_peer_id: AtomicU64,
    cursor: AtomicUsize,
    inbound_tx: mpsc::Sender<Vec<Bytes>>,
    inbound_rx: Mutex<mpsc::Receiver<Vec<Bytes>>>,
    closed: watch::Sender<bool>,
    peer_count: watch::Sender<usize>,
    fault: watch::Sender<Fault>,
}

impl Active {
    fn new(role: Role, local_addr: Option<SocketAddr>) -> Arc<Self> {
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_QUEUE_DEPTH);
        Arc::new(Self {
            role,
            local_addr,
            peers: DashMap::new(),
            next_peer_id: AtomicU64::new(0),
            cursor: AtomicUsize::new(0),
            inbound_tx,
            inbound_rx: Mutex::new(inbound_rx),
            closed: watch::channel(false).0,
            peer_count: watch::channel(0).0,
            fault: watch::channel(Fault::None).0,
        })
    }

    fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    /// Signals every task and pending call, then drops all peer queues.
    fn close(&self) {
        self.closed.send_replace(true);
        self.peers.clear();
        self.peer_count.send_replace(0);
    }

    fn add_peer(&self) -> Option<(u64, mpsc::Receiver<Vec<Bytes>>)> {
        if self.is_closed() {
            return None;
        }
        let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE_DEPTH);
        let id = self.next_peer_id.fetch_add(1, Ordering::Relaxed);
        self.peers.insert(id, tx);
        // A pair socket holds exactly one live peer. Insert-then-check
        // keeps two racing attachments from both surviving.
        if self.role == Role::Pair && self.peers.len() > 1 {
            self.peers.remove(&id);
            debug!(peer_id = id, "pair socket already attached, refusing peer");
            return None;
        }
        self.peer_count.send_replace(self.peers.len());
        trace!(peer_id = id, peers = self.peers.len(), "peer attached");
        Some((id, rx))
    }

    fn remove_peer(&self, id: u64) {
        if self.peers.remove(&id).is_some() {
            self.peer_count.send_replace(self.peers.len());
            trace!(peer_id = id, peers = self.peers.len(), "peer detached");
        }
    }

    fn set_fault(&self, fault: Fault) {
        self.fault.send_replace(fault);
    }

    /// Resolves when the socket closes or faults; never otherwise.
    async fn interrupted(&self) -> SocketError {
        let mut closed = self.closed.subscribe();
        let mut fault = self.fault.subscribe();
        loop {
            if *closed.borrow() {
                return SocketError::Closed;
            }
            if *fault.borrow() == Fault::Rejected {
                return SocketError::AuthenticationRejected;
            }
            tokio::select! {
                changed = closed.changed() => {
                    if changed.is_err() {
                        return SocketError::Interrupted;
                    }
                }
                changed = fault.changed() => {
                    if changed.is_err() {
                        return SocketError::Interrupted;
                    }
                }
            }
        }
    }
}

// ============================================
// SecureSocket
// ============================================

/// A role-typed message socket with optional CURVE security.
///
/// Created against a [`Context`]; the context must outlive the socket.
/// `send`, `receive`, and `close` take `&self` and are safe to call
/// from concurrent tasks; configuration calls must be serialized by
/// the caller.
pub struct SecureSocket {
    context: Context,
    role: Role,
    state: RwLock<State>,
}

impl SecureSocket {
    /// Allocates a socket of the given role against the context.
    #[must_use]
    pub fn create(context: &Context, role: Role) -> Self {
        Self {
            context: context.clone(),
            role,
            state: RwLock::new(State::Idle(Config::default())),
        }
    }

    /// The socket's role.
    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    /// The current lifecycle state name, for diagnostics.
    #[must_use]
    pub fn state_name(&self) -> &'static str {
        self.state.read().name()
    }

    /// The locally bound address, once bound.
    ///
    /// Useful after binding port 0 to learn the assigned port.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        match &*self.state.read() {
            State::Bound(active) => active.local_addr,
            _ => None,
        }
    }

    // ========================================
    // Configuration
    // ========================================

    /// Stores the local identity key from its 40-character text form.
    ///
    /// # Errors
    /// Returns `InvalidKeyEncoding` on bad input or `InvalidState` once
    /// the socket is bound, connected, or closed.
    pub fn set_private_key(&self, private_key_text: &str) -> Result<()> {
        let mut state = self.state.write();
        let config = Self::config_mut(&mut state, "set_private_key")?;
        config.local = Some(KeyPair::from_secret_z85(private_key_text)?);
        Ok(())
    }

    /// Marks this socket as the responder side of the CURVE handshake.
    ///
    /// # Errors
    /// Returns `MissingKey` if no private key is set, `InvalidState`
    /// once bound/connected.
    pub fn set_curve_server(&self) -> Result<()> {
        let mut state = self.state.write();
        let config = Self::config_mut(&mut state, "set_curve_server")?;
        if config.local.is_none() {
            return Err(SocketError::missing_key("private key", "set_curve_server"));
        }
        config.mode = Some(CurveMode::Server);
        Ok(())
    }

    /// Marks this socket as the initiator side, pinned to the given
    /// server public key.
    ///
    /// # Errors
    /// Returns `MissingKey` if no private key is set,
    /// `InvalidKeyEncoding` if the server key text does not decode, or
    /// `InvalidState` once bound/connected.
    pub fn set_curve_client(&self, server_public_text: &str) -> Result<()> {
        let mut state = self.state.write();
        let config = Self::config_mut(&mut state, "set_curve_client")?;
        if config.local.is_none() {
            return Err(SocketError::missing_key("private key", "set_curve_client"));
        }
        config.server_key = Some(PublicKey::from_z85(server_public_text)?);
        config.mode = Some(CurveMode::Client);
        Ok(())
    }

    fn config_mut<'a>(state: &'a mut State, operation: &str) -> Result<&'a mut Config> {
        match state {
            State::Idle(config) => Ok(config),
            other => Err(SocketError::invalid_state(operation, other.name())),
        }
    }

    // ========================================
    // Attachment
    // ========================================

    /// Binds the socket and starts accepting connections.
    ///
    /// # Errors
    /// Returns `InvalidState` if not in a configurable state or
    /// configured as a curve client, `InvalidEndpoint` / `AddressInUse`
    /// / `PermissionDenied` from the transport.
    pub async fn bind(&self, endpoint: &str) -> Result<()> {
        let config = self.snapshot_config("bind")?;
        if config.mode() == CurveMode::Client {
            return Err(SocketError::invalid_state(
                "bind",
                "configured as curve client",
            ));
        }
        let security = config.security("bind")?;

        let parsed = Endpoint::parse(endpoint)?;
        let addr = resolve(&parsed.bind_authority(), endpoint).await?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| TransportError::from_bind(addr, e))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| TransportError::io("reading bound address", e))?;

        let active = Active::new(self.role, Some(local_addr));
        self.install(State::Bound(Arc::clone(&active)), "bind")?;

        info!(role = %self.role, %local_addr, curve = security.is_curve(), "socket bound");
        tokio::spawn(accept_loop(active, listener, security, self.context.clone()));
        Ok(())
    }

    /// Connects the socket to a remote endpoint.
    ///
    /// Returns once the TCP connection is up; the security handshake
    /// runs in the background. A client the server does not admit never
    /// completes it and observes only silence.
    ///
    /// # Errors
    /// Returns `InvalidState` if not in a configurable state or
    /// configured as a curve server, `InvalidEndpoint` /
    /// `ConnectionRefused` from the transport.
    pub async fn connect(&self, endpoint: &str) -> Result<()> {
        let config = self.snapshot_config("connect")?;
        if config.mode() == CurveMode::Server {
            return Err(SocketError::invalid_state(
                "connect",
                "configured as curve server",
            ));
        }
        let security = config.security("connect")?;

        let parsed = Endpoint::parse(endpoint)?;
        let addr = resolve(&parsed.authority(), endpoint).await?;
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| TransportError::from_connect(addr, e))?;

        let active = Active::new(self.role, None);
        self.install(State::Connected(Arc::clone(&active)), "connect")?;

        info!(role = %self.role, %addr, curve = security.is_curve(), "socket connected");
        tokio::spawn(connect_driver(active, stream, security));
        Ok(())
    }

    fn snapshot_config(&self, operation: &str) -> Result<Config> {
        match &*self.state.read() {
            State::Idle(config) => Ok(config.clone()),
            other => Err(SocketError::invalid_state(operation, other.name())),
        }
    }

    fn install(&self, next: State, operation: &str) -> Result<()> {
        let mut state = self.state.write();
        match &*state {
            State::Idle(_) => {
                *state = next;
                Ok(())
            }
            other => Err(SocketError::invalid_state(operation, other.name())),
        }
    }

    // ========================================
    // Messaging
    // ========================================

    /// Sends one multi-frame message per the role's distribution rules.
    ///
    /// Round-robin roles wait for a peer if none is attached yet; a
    /// publisher broadcasts to current subscribers and drops for slow
    /// or absent ones. An empty message is a no-op.
    ///
    /// # Errors
    /// Returns `WrongRole`, `NotConnected`, `Closed`, or
    /// `AuthenticationRejected` if this client's handshake was never
    /// admitted.
    pub async fn send(&self, frames: Vec<Bytes>) -> Result<()> {
        if !self.role.can_send() {
            return Err(SocketError::wrong_role(self.role.name(), "send"));
        }
        let active = self.active("send")?;
        if active.is_closed() {
            return Err(SocketError::Closed);
        }
        if frames.is_empty() {
            return Ok(());
        }

        if self.role.broadcasts() {
            // Slow subscribers lose messages rather than stall the rest.
            for peer in active.peers.iter() {
                let _ = peer.value().try_send(frames.clone());
            }
            return Ok(());
        }

        let mut frames = frames;
        let mut peer_count = active.peer_count.subscribe();
        loop {
            let ids: Vec<u64> = active.peers.iter().map(|entry| *entry.key()).collect();
            if ids.is_empty() {
                tokio::select! {
                    changed = peer_count.changed() => {
                        if changed.is_err() {
                            return Err(SocketError::Interrupted);
                        }
                    }
                    err = active.interrupted() => return Err(err),
                }
                continue;
            }

            let index = active.cursor.fetch_add(1, Ordering::Relaxed) % ids.len();
            let id = ids[index];
            let Some(tx) = active.peers.get(&id).map(|entry| entry.value().clone()) else {
                continue;
            };
            match tx.send(frames).await {
                Ok(()) => return Ok(()),
                Err(returned) => {
                    // Peer died between snapshot and send.
                    frames = returned.0;
                    active.remove_peer(id);
                }
            }
        }
    }

    /// Receives the next multi-frame message.
    ///
    /// Blocks until a message arrives, the socket is closed from
    /// another task, or this client's handshake is known to have never
    /// been admitted.
    ///
    /// # Errors
    /// Returns `WrongRole`, `NotConnected`, `Closed`, `Interrupted`,
    /// or `AuthenticationRejected`.
    pub async fn receive(&self) -> Result<Vec<Bytes>> {
        if !self.role.can_receive() {
            return Err(SocketError::wrong_role(self.role.name(), "receive"));
        }
        let active = self.active("receive")?;

        let mut rx = tokio::select! {
            guard = active.inbound_rx.lock() => guard,
            err = active.interrupted() => return Err(err),
        };
        tokio::select! {
            message = rx.recv() => message.ok_or(SocketError::Closed),
            err = active.interrupted() => Err(err),
        }
    }

    fn active(&self, operation: &str) -> Result<Arc<Active>> {
        match &*self.state.read() {
            State::Bound(active) | State::Connected(active) => Ok(Arc::clone(active)),
            State::Closed => Err(SocketError::Closed),
            State::Idle(_) => {
                trace!(operation, "socket not attached");
                Err(SocketError::NotConnected)
            }
        }
    }

    // ========================================
    // Shutdown
    // ========================================

    /// Closes the socket, releasing its transport resources.
    ///
    /// Unblocks every pending `receive` with `Closed`, stops the
    /// accept loop, and drops parked connections. Idempotent.
    pub fn close(&self) {
        let mut state = self.state.write();
        if let State::Bound(active) | State::Connected(active) = &*state {
            active.close();
            info!(role = %self.role, "socket closed");
        }
        *state = State::Closed;
    }
}

impl std::fmt::Debug for SecureSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureSocket")
            .field("role", &self.role)
            .field("state", &self.state_name())
            .finish()
    }
}

async fn resolve(authority: &str, endpoint: &str) -> Result<SocketAddr> {
    let mut addrs = lookup_host(authority)
        .await
        .map_err(|_| TransportError::invalid_endpoint(endpoint, "host did not resolve"))?;
    addrs
        .next()
        .ok_or_else(|| TransportError::invalid_endpoint(endpoint, "host did not resolve").into())
}

// ============================================
// Connection Tasks
// ============================================

/// Accepts connections until the socket closes.
async fn accept_loop(
    active: Arc<Active>,
    listener: TcpListener,
    security: Security,
    context: Context,
) {
    let mut closed = active.closed.subscribe();
    loop {
        tokio::select! {
            changed = closed.changed() => {
                if changed.is_err() || *closed.borrow() {
                    break;
                }
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, peer_addr)) => {
                    trace!(%peer_addr, "inbound connection");
                    tokio::spawn(serve_connection(
                        Arc::clone(&active),
                        context.clone(),
                        security.clone(),
                        stream,
                        peer_addr,
                    ));
                }
                Err(e) => {
                    warn!(error = %e, "accept failed");
                }
            }
        }
    }
    debug!("accept loop ended");
}

/// Admits or parks one inbound connection, then runs its I/O loops.
async fn serve_connection(
    active: Arc<Active>,
    context: Context,
    security: Security,
    mut stream: TcpStream,
    peer_addr: SocketAddr,
) {
    let hook = context.auth_hook();
    let session = match security {
        Security::Plain => {
            if !plain_admission(hook.as_ref(), peer_addr.ip()).await {
                park(&active, stream).await;
                return;
            }
            None
        }
        Security::CurveServer { local } => {
            match timeout(
                HANDSHAKE_TIMEOUT,
                run_server(&mut stream, local, hook, peer_addr.ip()),
            )
            .await
            {
                Ok(Ok(ServerOutcome::Admitted { session, .. })) => Some(*session),
                Ok(Ok(ServerOutcome::Rejected)) => {
                    park(&active, stream).await;
                    return;
                }
                Ok(Err(e)) => {
                    debug!(%peer_addr, error = %e, "handshake failed");
                    return;
                }
                Err(_) => {
                    debug!(%peer_addr, "handshake timed out");
                    return;
                }
            }
        }
        // bind() refuses curve-client configuration.
        Security::CurveClient { .. } => return,
    };
    run_connection(active, stream, session, peer_addr).await;
}

/// Holds a rejected connection open, without traffic, for the
/// handshake window, then drops it. A timed-out park is
/// indistinguishable on the wire from a handshake that stalled.
async fn park(active: &Active, stream: TcpStream) {
    let mut closed = active.closed.subscribe();
    let lapse = tokio::time::sleep(HANDSHAKE_TIMEOUT);
    tokio::pin!(lapse);
    while !*closed.borrow() {
        tokio::select! {
            () = &mut lapse => break,
            changed = closed.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }
    drop(stream);
}

/// Runs the client side of a connected socket's attachment.
async fn connect_driver(active: Arc<Active>, mut stream: TcpStream, security: Security) {
    let peer_addr = match stream.peer_addr() {
        Ok(addr) => addr,
        Err(e) => {
            debug!(error = %e, "peer address unavailable");
            return;
        }
    };
    let session = match security {
        Security::Plain => None,
        Security::CurveClient { local, server_key } => {
            match timeout(HANDSHAKE_TIMEOUT, run_client(&mut stream, local, server_key)).await {
                Ok(Ok(session)) => Some(session),
                Ok(Err(e)) => {
                    debug!(error = %e, "client handshake failed");
                    active.set_fault(Fault::Rejected);
                    return;
                }
                Err(_) => {
                    debug!("client handshake timed out: not admitted");
                    active.set_fault(Fault::Rejected);
                    return;
                }
            }
        }
        // connect() refuses curve-server configuration.
        Security::CurveServer { .. } => return,
    };
    run_connection(active, stream, session, peer_addr).await;
}

/// Reader/writer loops for one established connection.
async fn run_connection(
    active: Arc<Active>,
    stream: TcpStream,
    session: Option<veilmq_core::SessionPair>,
    peer_addr: SocketAddr,
) {
    let (sealer, mut opener) = channel_halves(session);
    let (mut read_half, write_half) = stream.into_split();

    let Some((peer_id, outbound_rx)) = active.add_peer() else {
        return;
    };
    tokio::spawn(write_loop(write_half, outbound_rx, sealer));

    let mut closed = active.closed.subscribe();
    loop {
        tokio::select! {
            changed = closed.changed() => {
                if changed.is_err() || *closed.borrow() {
                    break;
                }
            }
            record = read_payload(&mut read_half) => {
                let record = match record {
                    Ok(Some(record)) => record,
                    Ok(None) => {
                        debug!(%peer_addr, "peer disconnected");
                        break;
                    }
                    Err(e) => {
                        debug!(%peer_addr, error = %e, "read failed");
                        break;
                    }
                };
                let payload = match opener.open(&record) {
                    Ok(payload) => payload,
                    Err(e) => {
                        warn!(%peer_addr, error = %e, "dropping peer: undecipherable record");
                        break;
                    }
                };
                let frames = match decode_frames(&payload) {
                    Ok(frames) => frames,
                    Err(e) => {
                        warn!(%peer_addr, error = %e, "dropping peer: malformed message");
                        break;
                    }
                };
                if active.inbound_tx.send(frames).await.is_err() {
                    break;
                }
            }
        }
    }
    active.remove_peer(peer_id);
}

/// Drains one peer's outbound queue onto the wire.
async fn write_loop(
    mut half: OwnedWriteHalf,
    mut outbound_rx: mpsc::Receiver<Vec<Bytes>>,
    mut sealer: Sealer,
) {
    while let Some(frames) = outbound_rx.recv().await {
        let payload = encode_frames(&frames);
        let record = match sealer.seal(&payload) {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "sealing failed, dropping peer");
                break;
            }
        };
        if let Err(e) = write_payload(&mut half, &record).await {
            debug!(error = %e, "write failed");
            break;
        }
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use veilmq_core::Certificate;

    fn configured_server_socket() -> (Context, SecureSocket, Certificate) {
        let context = Context::new();
        let socket = SecureSocket::create(&context, Role::Puller);
        let cert = Certificate::generate();
        socket.set_private_key(&cert.private_key()).unwrap();
        socket.set_curve_server().unwrap();
        (context, socket, cert)
    }

    #[test]
    fn test_state_progression_names() {
        let context = Context::new();
        let socket = SecureSocket::create(&context, Role::Pusher);
        assert_eq!(socket.state_name(), "unconfigured");

        let cert = Certificate::generate();
        socket.set_private_key(&cert.private_key()).unwrap();
        assert_eq!(socket.state_name(), "configured");

        socket.close();
        assert_eq!(socket.state_name(), "closed");
    }

    #[test]
    fn test_curve_server_requires_private_key() {
        let context = Context::new();
        let socket = SecureSocket::create(&context, Role::Puller);
        assert!(matches!(
            socket.set_curve_server(),
            Err(SocketError::MissingKey { .. })
        ));
    }

    #[test]
    fn test_curve_client_requires_private_key() {
        let context = Context::new();
        let socket = SecureSocket::create(&context, Role::Pusher);
        let server = Certificate::generate();
        assert!(matches!(
            socket.set_curve_client(&server.public_key()),
            Err(SocketError::MissingKey { .. })
        ));
    }

    #[test]
    fn test_bad_key_text_rejected() {
        let context = Context::new();
        let socket = SecureSocket::create(&context, Role::Pusher);
        assert!(matches!(
            socket.set_private_key("tooshort"),
            Err(SocketError::Core(_))
        ));

        let cert = Certificate::generate();
        socket.set_private_key(&cert.private_key()).unwrap();
        assert!(matches!(
            socket.set_curve_client("not-z85-at-all!"),
            Err(SocketError::Core(_))
        ));
    }

    #[tokio::test]
    async fn test_configuration_frozen_after_bind() {
        let (_context, socket, cert) = configured_server_socket();
        socket.bind("tcp://127.0.0.1:0").await.unwrap();

        assert!(matches!(
            socket.set_private_key(&cert.private_key()),
            Err(SocketError::InvalidState { .. })
        ));
        assert!(matches!(
            socket.set_curve_server(),
            Err(SocketError::InvalidState { .. })
        ));
        assert!(matches!(
            socket.bind("tcp://127.0.0.1:0").await,
            Err(SocketError::InvalidState { .. })
        ));
        socket.close();
    }

    #[tokio::test]
    async fn test_curve_client_cannot_bind() {
        let context = Context::new();
        let socket = SecureSocket::create(&context, Role::Pusher);
        let cert = Certificate::generate();
        let server = Certificate::generate();
        socket.set_private_key(&cert.private_key()).unwrap();
        socket.set_curve_client(&server.public_key()).unwrap();

        assert!(matches!(
            socket.bind("tcp://127.0.0.1:0").await,
            Err(SocketError::InvalidState { .. })
        ));
    }

    #[tokio::test]
    async fn test_curve_server_cannot_connect() {
        let (_context, socket, _cert) = configured_server_socket();
        assert!(matches!(
            socket.connect("tcp://127.0.0.1:1").await,
            Err(SocketError::InvalidState { .. })
        ));
    }

    #[tokio::test]
    async fn test_wrong_role_checks() {
        let context = Context::new();
        let puller = SecureSocket::create(&context, Role::Puller);
        assert!(matches!(
            puller.send(vec![Bytes::from_static(b"x")]).await,
            Err(SocketError::WrongRole { .. })
        ));

        let pusher = SecureSocket::create(&context, Role::Pusher);
        assert!(matches!(
            pusher.receive().await,
            Err(SocketError::WrongRole { .. })
        ));
    }

    #[tokio::test]
    async fn test_send_before_attach_is_not_connected() {
        let context = Context::new();
        let socket = SecureSocket::create(&context, Role::Pusher);
        assert!(matches!(
            socket.send(vec![Bytes::from_static(b"x")]).await,
            Err(SocketError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_final() {
        let (_context, socket, _cert) = configured_server_socket();
        socket.bind("tcp://127.0.0.1:0").await.unwrap();
        socket.close();
        socket.close();

        assert!(matches!(socket.receive().await, Err(SocketError::Closed)));
    }

    #[tokio::test]
    async fn test_invalid_endpoint_surfaces() {
        let (_context, socket, _cert) = configured_server_socket();
        assert!(matches!(
            socket.bind("udp://127.0.0.1:0").await,
            Err(SocketError::Transport(TransportError::InvalidEndpoint { .. }))
        ));
    }

    #[tokio::test]
    async fn test_local_addr_reports_bound_port() {
        let (_context, socket, _cert) = configured_server_socket();
        socket.bind("tcp://127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();
        assert_ne!(addr.port(), 0);
        socket.close();
    }

    #[tokio::test(start_paused = true)]
    async fn test_park_releases_connection_after_window() {
        use tokio::io::AsyncReadExt;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let mut client = TcpStream::connect(addr).await.unwrap();
        let (inbound, _) = listener.accept().await.unwrap();

        let active = Active::new(Role::Puller, None);
        let parked = tokio::spawn(async move { park(&active, inbound).await });

        // The parked task ends on its own once the window lapses,
        // without anyone calling close().
        parked.await.unwrap();

        // The rejected peer sees the connection drop, never a byte.
        let mut buf = [0u8; 1];
        let read = client.read(&mut buf).await.unwrap();
        assert_eq!(read, 0);
    }

    #[tokio::test]
    async fn test_pair_admits_single_peer() {
        let context = Context::new();
        let pair = SecureSocket::create(&context, Role::Pair);
        pair.bind("tcp://127.0.0.1:0").await.unwrap();
        let endpoint = format!("tcp://127.0.0.1:{}", pair.local_addr().unwrap().port());

        let first = SecureSocket::create(&context, Role::Pair);
        first.connect(&endpoint).await.unwrap();
        first
            .send(vec![Bytes::from_static(b"one")])
            .await
            .unwrap();
        let got = pair.receive().await.unwrap();
        assert_eq!(got[0].as_ref(), b"one");

        // A second attachment is refused; its traffic never arrives.
        let second = SecureSocket::create(&context, Role::Pair);
        second.connect(&endpoint).await.unwrap();
        let _ = timeout(
            Duration::from_millis(200),
            second.send(vec![Bytes::from_static(b"two")]),
        )
        .await;
        let outcome = timeout(Duration::from_millis(300), pair.receive()).await;
        assert!(outcome.is_err(), "pair socket must hold a single peer");
        assert_eq!(pair.active("peers").unwrap().peers.len(), 1);

        second.close();
        first.close();
        pair.close();
    }
}
