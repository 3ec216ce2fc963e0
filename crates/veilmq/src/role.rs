// ============================================
// File: crates/veilmq/src/role.rs
// ============================================
//! # Socket Roles
//!
//! ## Creation Reason
//! Every socket carries a role that fixes its traffic direction and
//! distribution pattern. The role is checked on every send/receive so
//! misuse fails fast with `WrongRole` instead of wedging a peer.
//!
//! ## Role Matrix
//! ```text
//! ┌────────────┬──────┬─────────┬───────────────────────┐
//! │ Role       │ Send │ Receive │ Distribution          │
//! ├────────────┼──────┼─────────┼───────────────────────┤
//! │ Requester  │  ✅  │   ✅    │ round-robin           │
//! │ Responder  │  ✅  │   ✅    │ round-robin           │
//! │ Pusher     │  ✅  │   ❌    │ round-robin           │
//! │ Puller     │  ❌  │   ✅    │ fair-queued           │
//! │ Publisher  │  ✅  │   ❌    │ broadcast             │
//! │ Subscriber │  ❌  │   ✅    │ fair-queued           │
//! │ Dealer     │  ✅  │   ✅    │ round-robin           │
//! │ Router     │  ✅  │   ✅    │ round-robin           │
//! │ Pair       │  ✅  │   ✅    │ single peer           │
//! └────────────┴──────┴─────────┴───────────────────────┘
//! ```
//!
//! ## Last Modified
//! v0.1.0 - Initial role definitions

use std::fmt;

/// Socket role: traffic direction and distribution pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Sends requests, receives replies.
    Requester,
    /// Receives requests, sends replies.
    Responder,
    /// One-way distributor to pullers.
    Pusher,
    /// One-way collector from pushers.
    Puller,
    /// Broadcasts to every connected subscriber.
    Publisher,
    /// Receives broadcasts from a publisher.
    Subscriber,
    /// Asynchronous round-robin sender/receiver.
    Dealer,
    /// Asynchronous receiver/addressed sender.
    Router,
    /// Exclusive two-party channel.
    Pair,
}

impl Role {
    /// Returns `true` if this role may send messages.
    #[must_use]
    pub const fn can_send(self) -> bool {
        !matches!(self, Self::Puller | Self::Subscriber)
    }

    /// Returns `true` if this role may receive messages.
    #[must_use]
    pub const fn can_receive(self) -> bool {
        !matches!(self, Self::Pusher | Self::Publisher)
    }

    /// Returns `true` if a send goes to every connected peer rather
    /// than to one.
    #[must_use]
    pub const fn broadcasts(self) -> bool {
        matches!(self, Self::Publisher)
    }

    /// Lowercase name for logs and error messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Requester => "requester",
            Self::Responder => "responder",
            Self::Pusher => "pusher",
            Self::Puller => "puller",
            Self::Publisher => "publisher",
            Self::Subscriber => "subscriber",
            Self::Dealer => "dealer",
            Self::Router => "router",
            Self::Pair => "pair",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_matrix() {
        assert!(Role::Pusher.can_send());
        assert!(!Role::Pusher.can_receive());

        assert!(!Role::Puller.can_send());
        assert!(Role::Puller.can_receive());

        assert!(Role::Publisher.can_send());
        assert!(!Role::Publisher.can_receive());

        assert!(!Role::Subscriber.can_send());
        assert!(Role::Subscriber.can_receive());

        for role in [
            Role::Requester,
            Role::Responder,
            Role::Dealer,
            Role::Router,
            Role::Pair,
        ] {
            assert!(role.can_send(), "{role} should send");
            assert!(role.can_receive(), "{role} should receive");
        }
    }

    #[test]
    fn test_only_publisher_broadcasts() {
        assert!(Role::Publisher.broadcasts());
        assert!(!Role::Pusher.broadcasts());
        assert!(!Role::Pair.broadcasts());
    }
}
