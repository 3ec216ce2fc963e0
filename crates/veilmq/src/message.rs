// ============================================
// File: crates/veilmq/src/message.rs
// ============================================
//! # Multi-Frame Messages
//!
//! ## Creation Reason
//! The unit of exchange is a message: an ordered sequence of opaque
//! binary frames delivered atomically. A message is a short-lived value
//! built for one send or filled by one receive.
//!
//! ## Main Functionality
//! - `Message::append` / `frames`: build and inspect the sequence
//! - `Message::send` / `Message::receive`: exchange through a socket
//! - `Message::text`: decode the first frame as UTF-8
//!
//! ## Last Modified
//! v0.1.0 - Initial message type

use bytes::Bytes;

use crate::error::Result;
use crate::socket::SecureSocket;

/// An ordered sequence of binary frames, sent and received atomically.
///
/// An empty message is valid; sending it is a no-op for most roles but
/// still exercises role and state checks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    frames: Vec<Bytes>,
}

impl Message {
    /// Creates an empty message.
    #[must_use]
    pub const fn new() -> Self {
        Self { frames: Vec::new() }
    }

    /// Appends one frame to the outgoing sequence.
    pub fn append(&mut self, frame: impl Into<Bytes>) {
        self.frames.push(frame.into());
    }

    /// The frames in order.
    #[must_use]
    pub fn frames(&self) -> &[Bytes] {
        &self.frames
    }

    /// Number of frames.
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Returns `true` if the message has no frames.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Decodes the first frame as UTF-8 text.
    ///
    /// Returns an empty string if there is no first frame or it is not
    /// valid UTF-8; a garbled payload is not an error at this layer.
    #[must_use]
    pub fn text(&self) -> String {
        self.frames
            .first()
            .and_then(|f| std::str::from_utf8(f).ok())
            .map(str::to_owned)
            .unwrap_or_default()
    }

    /// Sends this message through the socket, consuming it.
    ///
    /// # Errors
    /// Returns `WrongRole` if the socket's role cannot send,
    /// `NotConnected`/`Closed` per the socket's state.
    pub async fn send(self, socket: &SecureSocket) -> Result<()> {
        socket.send(self.frames).await
    }

    /// Receives the next message from the socket.
    ///
    /// Blocks until a full message arrives or the socket closes.
    ///
    /// # Errors
    /// Returns `WrongRole` if the socket's role cannot receive, or
    /// `Closed` if the socket is closed while waiting.
    pub async fn receive(socket: &SecureSocket) -> Result<Self> {
        let frames = socket.receive().await?;
        Ok(Self { frames })
    }
}

impl FromIterator<Bytes> for Message {
    fn from_iter<I: IntoIterator<Item = Bytes>>(iter: I) -> Self {
        Self {
            frames: iter.into_iter().collect(),
        }
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_preserves_order() {
        let mut message = Message::new();
        message.append(Bytes::from_static(b"first"));
        message.append(vec![1u8, 2, 3]);
        assert_eq!(message.len(), 2);
        assert_eq!(message.frames()[0].as_ref(), b"first");
        assert_eq!(message.frames()[1].as_ref(), &[1, 2, 3]);
    }

    #[test]
    fn test_text_decodes_first_frame() {
        let mut message = Message::new();
        message.append(Bytes::from_static(b"helllo world!"));
        message.append(Bytes::from_static(b"ignored"));
        assert_eq!(message.text(), "helllo world!");
    }

    #[test]
    fn test_text_tolerates_bad_input() {
        assert_eq!(Message::new().text(), "");

        let mut message = Message::new();
        message.append(vec![0xFF, 0xFE]);
        assert_eq!(message.text(), "");
    }

    #[test]
    fn test_empty_message_is_valid() {
        let message = Message::new();
        assert!(message.is_empty());
        assert_eq!(message.len(), 0);
    }
}
