// ============================================
// File: crates/veilmq/src/auth.rs
// ============================================
//! # Connection Authenticator
//!
//! ## Creation Reason
//! Servers need to gate inbound peers by network address and/or public
//! key. The authenticator owns that policy and a background decision
//! loop the transport consults on every inbound connection attempt.
//!
//! ## Main Functionality
//! - `Authenticator`: whitelist/denylist policy + Stopped/Running loop
//! - `Decision` / `RejectReason`: structured authorization outcomes
//! - `AuthQuery`: one in-flight question from an accepting socket
//!
//! ## Query Flow
//! ```text
//! ┌──────────────┐  AuthQuery (mpsc)  ┌─────────────────┐
//! │ Accepting    │ ─────────────────► │ Decision loop   │
//! │ socket task  │ ◄───────────────── │ (one per        │
//! └──────────────┘  Decision (oneshot)│  authenticator) │
//!                                     └────────┬────────┘
//!                                              │ reads
//!                                     ┌────────▼────────┐
//!                                     │ Policy (RwLock) │
//!                                     └─────────────────┘
//! ```
//!
//! ## Decision Algorithm
//! 1. Denylist match on address → reject (takes precedence)
//! 2. Non-empty whitelist → approve only on an address OR key match
//! 3. Empty whitelist → the configured default policy (accept unless
//!    `set_default_policy(Reject)` was called)
//!
//! ## ⚠️ Important Note for Next Developer
//! - Any failure to reach the decision loop is a REJECTION, never an
//!   approval (fail-closed)
//! - `stop()` drains in-flight queries before returning; a query is
//!   resolved, never dropped
//! - Rejection reasons stay local; nothing is ever sent to the peer
//!
//! ## Last Modified
//! v0.1.0 - Initial authenticator implementation

use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use veilmq_core::{z85, PublicKey};

use crate::context::Context;
use crate::error::{Result, SocketError};

/// Queue depth for pending authorization queries.
const QUERY_QUEUE_DEPTH: usize = 64;

// ============================================
// Decisions
// ============================================

/// Why a connection attempt was rejected.
///
/// Local diagnostics only; the rejected peer observes silence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The peer's address is on the denylist.
    AddressDenied,
    /// A whitelist exists and neither address nor key matched.
    NotWhitelisted,
    /// The default policy is reject and no whitelist entry applied.
    DefaultReject,
    /// The decision loop was unreachable (fail-closed).
    Unavailable,
}

/// Outcome of one authorization query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Admit the connection and continue the handshake.
    Approved,
    /// Terminate this handshake; other connections are unaffected.
    Rejected(RejectReason),
}

impl Decision {
    /// Returns `true` for an approval.
    #[must_use]
    pub const fn is_approved(&self) -> bool {
        matches!(self, Self::Approved)
    }
}

// ============================================
// AuthQuery
// ============================================

/// One authorization question raised by an accepting socket.
#[derive(Debug)]
pub struct AuthQuery {
    /// Peer network address.
    pub addr: IpAddr,
    /// Peer public key, once the handshake has confirmed it.
    /// Absent for plain (non-curve) sockets, which check address only.
    pub key: Option<PublicKey>,
    /// Where the decision goes.
    pub reply: oneshot::Sender<Decision>,
}

/// Sender half the transport uses to raise queries.
pub(crate) type AuthHook = mpsc::Sender<AuthQuery>;

/// Raises one query against a registered hook and awaits the decision.
///
/// Every channel failure maps to `Rejected(Unavailable)`: an
/// authenticator that cannot answer must never admit anyone.
pub(crate) async fn request_decision(
    hook: &AuthHook,
    addr: IpAddr,
    key: Option<PublicKey>,
) -> Decision {
    let (reply, answer) = oneshot::channel();
    let query = AuthQuery { addr, key, reply };
    if hook.send(query).await.is_err() {
        warn!(%addr, "authorization query dropped: decision loop gone");
        return Decision::Rejected(RejectReason::Unavailable);
    }
    match answer.await {
        Ok(decision) => decision,
        Err(_) => {
            warn!(%addr, "authorization reply dropped: decision loop gone");
            Decision::Rejected(RejectReason::Unavailable)
        }
    }
}

// ============================================
// Policy
// ============================================

/// What an empty whitelist means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DefaultPolicy {
    /// Admit peers no list speaks about (the historical default).
    #[default]
    Accept,
    /// Reject peers no list speaks about.
    Reject,
}

#[derive(Debug, Default)]
struct Policy {
    allowed_addrs: HashSet<IpAddr>,
    allowed_keys: HashSet<PublicKey>,
    denied_addrs: HashSet<IpAddr>,
    default_policy: DefaultPolicy,
}

impl Policy {
    fn decide(&self, addr: IpAddr, key: Option<&PublicKey>) -> Decision {
        if self.denied_addrs.contains(&addr) {
            return Decision::Rejected(RejectReason::AddressDenied);
        }

        let has_whitelist = !self.allowed_addrs.is_empty() || !self.allowed_keys.is_empty();
        if has_whitelist {
            if self.allowed_addrs.contains(&addr) {
                return Decision::Approved;
            }
            if let Some(key) = key {
                if self.allowed_keys.contains(key) {
                    return Decision::Approved;
                }
            }
            return Decision::Rejected(RejectReason::NotWhitelisted);
        }

        match self.default_policy {
            DefaultPolicy::Accept => Decision::Approved,
            DefaultPolicy::Reject => Decision::Rejected(RejectReason::DefaultReject),
        }
    }
}

// ============================================
// Authenticator
// ============================================

enum LoopState {
    Stopped,
    Running {
        context: Context,
        handle: JoinHandle<()>,
    },
}

/// Whitelist/denylist gatekeeper with a background decision loop.
///
/// # Lifecycle
/// `Stopped → start(context) → Running → stop() → Stopped`. Policy
/// mutation (`allow_*`, `deny_address`) is safe at any time, including
/// concurrently with running queries.
pub struct Authenticator {
    policy: Arc<RwLock<Policy>>,
    state: LoopState,
}

impl Authenticator {
    /// Creates a stopped authenticator with an empty policy.
    #[must_use]
    pub fn new() -> Self {
        Self {
            policy: Arc::new(RwLock::new(Policy::default())),
            state: LoopState::Stopped,
        }
    }

    // ========================================
    // Policy Configuration
    // ========================================

    /// Whitelists a peer address. Idempotent.
    pub fn allow_address(&self, addr: IpAddr) {
        self.policy.write().allowed_addrs.insert(addr);
        debug!(%addr, "address whitelisted");
    }

    /// Whitelists a peer public key. Idempotent.
    pub fn allow_key(&self, key: PublicKey) {
        self.policy.write().allowed_keys.insert(key);
        debug!(%key, "public key whitelisted");
    }

    /// Whitelists a peer public key given in its 40-character text form.
    ///
    /// # Errors
    /// Returns `InvalidKeyEncoding` if the text does not decode.
    pub fn allow_key_text(&self, key_text: &str) -> Result<()> {
        let key = PublicKey::from_bytes(z85::decode_key(key_text).map_err(SocketError::Core)?);
        self.allow_key(key);
        Ok(())
    }

    /// Denylists a peer address. Takes precedence over any whitelist
    /// entry for the same address. Idempotent.
    pub fn deny_address(&self, addr: IpAddr) {
        self.policy.write().denied_addrs.insert(addr);
        debug!(%addr, "address denylisted");
    }

    /// Sets what happens when no list matches and the whitelist is
    /// empty. Defaults to [`DefaultPolicy::Accept`].
    pub fn set_default_policy(&self, policy: DefaultPolicy) {
        self.policy.write().default_policy = policy;
    }

    /// Answers one query synchronously against the current policy.
    ///
    /// The decision loop goes through this; it is exposed for direct
    /// policy checks in tests and tooling.
    #[must_use]
    pub fn decide(&self, addr: IpAddr, key: Option<&PublicKey>) -> Decision {
        self.policy.read().decide(addr, key)
    }

    // ========================================
    // Lifecycle
    // ========================================

    /// Registers this authenticator's hook on the context and starts
    /// the decision loop.
    ///
    /// # Errors
    /// Returns `InvalidState` if already running or the context already
    /// has an authenticator registered.
    pub fn start(&mut self, context: &Context) -> Result<()> {
        if matches!(self.state, LoopState::Running { .. }) {
            return Err(SocketError::invalid_state("start", "running"));
        }

        let (tx, rx) = mpsc::channel(QUERY_QUEUE_DEPTH);
        context.register_auth_hook(tx)?;

        let policy = Arc::clone(&self.policy);
        let handle = tokio::spawn(decision_loop(policy, rx));

        self.state = LoopState::Running {
            context: context.clone(),
            handle,
        };
        info!("authenticator started");
        Ok(())
    }

    /// Deregisters the hook and drains in-flight queries.
    ///
    /// Every query already raised is resolved before this returns;
    /// none is dropped. Idempotent.
    pub async fn stop(&mut self) {
        let LoopState::Running { context, handle } =
            std::mem::replace(&mut self.state, LoopState::Stopped)
        else {
            return;
        };

        // Dropping the registered sender ends the loop once the last
        // in-flight query (and any clone held by an accepting socket)
        // has been answered.
        context.deregister_auth_hook();
        if handle.await.is_err() {
            warn!("decision loop ended abnormally");
        }
        info!("authenticator stopped");
    }

    /// Returns `true` while the decision loop is running.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        matches!(self.state, LoopState::Running { .. })
    }
}

impl Default for Authenticator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let policy = self.policy.read();
        f.debug_struct("Authenticator")
            .field("running", &self.is_running())
            .field("allowed_addrs", &policy.allowed_addrs.len())
            .field("allowed_keys", &policy.allowed_keys.len())
            .field("denied_addrs", &policy.denied_addrs.len())
            .finish()
    }
}

/// Consumes queries until every sender is gone, answering each against
/// the live policy.
async fn decision_loop(policy: Arc<RwLock<Policy>>, mut rx: mpsc::Receiver<AuthQuery>) {
    while let Some(query) = rx.recv().await {
        let decision = policy.read().decide(query.addr, query.key.as_ref());
        match decision {
            Decision::Approved => debug!(addr = %query.addr, "connection approved"),
            Decision::Rejected(reason) => {
                debug!(addr = %query.addr, ?reason, "connection rejected");
            }
        }
        // A dead requester already gave up on its handshake.
        let _ = query.reply.send(decision);
    }
    debug!("decision loop drained");
}

// ============================================
// Tests
// ============================================
