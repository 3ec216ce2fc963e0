// ============================================
// File: crates/veilmq/src/context.rs
// ============================================
//! # Context
//!
//! ## Creation Reason
//! Sockets and the authenticator need a shared rendezvous point: the
//! context owns the single authentication-hook slot every accepting
//! socket consults. It is cheap to clone and must outlive every socket
//! created against it.
//!
//! ## Main Functionality
//! - `Context::new` / `Clone`: shared process-wide handle
//! - Hook registration slot for exactly one `Authenticator`
//!
//! ## ⚠️ Important Note for Next Developer
//! - The hook slot is single-occupancy; a second registration is an
//!   `InvalidState` error, not a silent replacement
//! - Sockets snapshot the hook per connection attempt; deregistering
//!   affects new attempts, not ones already in flight
//!
//! ## Last Modified
//! v0.1.0 - Initial context implementation

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::auth::AuthHook;
use crate::error::{Result, SocketError};

/// Process-wide handle sockets and authenticators are created against.
///
/// Clones share the same underlying state.
#[derive(Clone, Default)]
pub struct Context {
    inner: Arc<ContextInner>,
}

#[derive(Default)]
struct ContextInner {
    auth_hook: RwLock<Option<AuthHook>>,
}

impl Context {
    /// Creates a fresh context with no authenticator attached.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs an authenticator's query hook.
    ///
    /// # Errors
    /// Returns `InvalidState` if a hook is already registered.
    pub(crate) fn register_auth_hook(&self, hook: AuthHook) -> Result<()> {
        let mut slot = self.inner.auth_hook.write();
        if slot.is_some() {
            return Err(SocketError::invalid_state(
                "register authenticator",
                "an authenticator is already attached",
            ));
        }
        *slot = Some(hook);
        debug!("authentication hook registered");
        Ok(())
    }

    /// Removes the query hook. New connection attempts stop consulting
    /// the authenticator; in-flight queries still resolve.
    pub(crate) fn deregister_auth_hook(&self) {
        if self.inner.auth_hook.write().take().is_some() {
            debug!("authentication hook deregistered");
        }
    }

    /// Snapshots the current hook, if any.
    pub(crate) fn auth_hook(&self) -> Option<AuthHook> {
        self.inner.auth_hook.read().clone()
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("authenticator", &self.inner.auth_hook.read().is_some())
            .finish()
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn test_single_hook_slot() {
        let context = Context::new();
        assert!(context.auth_hook().is_none());

        let (tx, _rx) = mpsc::channel(1);
        context.register_auth_hook(tx).unwrap();
        assert!(context.auth_hook().is_some());

        let (tx2, _rx2) = mpsc::channel(1);
        assert!(matches!(
            context.register_auth_hook(tx2),
            Err(SocketError::InvalidState { .. })
        ));

        context.deregister_auth_hook();
        assert!(context.auth_hook().is_none());
    }

    #[test]
    fn test_clones_share_state() {
        let context = Context::new();
        let clone = context.clone();

        let (tx, _rx) = mpsc::channel(1);
        context.register_auth_hook(tx).unwrap();
        assert!(clone.auth_hook().is_some());

        clone.deregister_auth_hook();
        assert!(context.auth_hook().is_none());
    }
}
