// ============================================
// File: crates/veilmq-transport/src/wire.rs
// ============================================
//! # Wire Payload Framing
//!
//! ## Creation Reason
//! TCP is a byte stream; the protocol exchanges discrete payloads. This
//! module owns the length-prefix framing that turns one into the other,
//! for handshake commands and encrypted records alike.
//!
//! ## Payload Format
//! ```text
//! ┌──────────────────┬─────────────────────┐
//! │ Length (4B LE)   │ Payload bytes       │
//! └──────────────────┴─────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - A clean EOF on a payload boundary is `Ok(None)`; an EOF inside a
//!   payload is `ConnectionClosed`. Callers depend on the distinction
//! - The length check runs BEFORE allocation; never trust a declared
//!   length from the peer
//!
//! ## Last Modified
//! v0.1.0 - Initial wire framing

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::trace;

use crate::error::{Result, TransportError};

/// Hard upper bound on a single wire payload: 64 MiB.
pub const MAX_PAYLOAD_SIZE: usize = 64 * 1024 * 1024;

/// Size of the length prefix in bytes.
const PREFIX_SIZE: usize = 4;

/// Writes one length-prefixed payload and flushes.
///
/// # Errors
/// Returns `PayloadTooLarge` if the payload exceeds [`MAX_PAYLOAD_SIZE`],
/// or `Io` on a write failure.
pub async fn write_payload<W>(writer: &mut W, payload: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    if payload.len() > MAX_PAYLOAD_SIZE {
        return Err(TransportError::PayloadTooLarge {
            size: payload.len(),
            max: MAX_PAYLOAD_SIZE,
        });
    }

    let prefix = (payload.len() as u32).to_le_bytes();
    writer
        .write_all(&prefix)
        .await
        .map_err(|e| TransportError::io("writing payload length", e))?;
    writer
        .write_all(payload)
        .await
        .map_err(|e| TransportError::io("writing payload body", e))?;
    writer
        .flush()
        .await
        .map_err(|e| TransportError::io("flushing payload", e))?;
    trace!(len = payload.len(), "payload written");
    Ok(())
}

/// Reads one length-prefixed payload.
///
/// Returns `Ok(None)` on a clean EOF at a payload boundary.
///
/// # Errors
/// Returns `ConnectionClosed` if the peer hangs up mid-payload,
/// `MalformedPayload` if the declared length exceeds
/// [`MAX_PAYLOAD_SIZE`], or `Io` on a read failure.
pub async fn read_payload<R>(reader: &mut R) -> Result<Option<Vec<u8>>>
where
    R: AsyncRead + Unpin,
{
    let mut prefix = [0u8; PREFIX_SIZE];
    let mut filled = 0;

    // Fill the prefix manually: zero bytes before the first one means a
    // clean shutdown, EOF after it means the peer died mid-payload.
    while filled < PREFIX_SIZE {
        let n = reader
            .read(&mut prefix[filled..])
            .await
            .map_err(|e| TransportError::io("reading payload length", e))?;
        if n == 0 {
            if filled == 0 {
                return Ok(None);
            }
            return Err(TransportError::ConnectionClosed);
        }
        filled += n;
    }

    let len = u32::from_le_bytes(prefix) as usize;
    if len > MAX_PAYLOAD_SIZE {
        return Err(TransportError::malformed(format!(
            "declared payload length {len} exceeds limit {MAX_PAYLOAD_SIZE}"
        )));
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            TransportError::ConnectionClosed
        } else {
            TransportError::io("reading payload body", e)
        }
    })?;
    trace!(len, "payload read");
    Ok(Some(payload))
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn test_payload_roundtrip() {
        let (mut client, mut server) = tokio::io::duplex(1024);

        write_payload(&mut client, b"hello").await.unwrap();
        write_payload(&mut client, b"").await.unwrap();

        assert_eq!(read_payload(&mut server).await.unwrap().unwrap(), b"hello");
        assert_eq!(read_payload(&mut server).await.unwrap().unwrap(), b"");
    }

    #[tokio::test]
    async fn test_clean_eof_is_none() {
        let (mut client, mut server) = tokio::io::duplex(1024);
        write_payload(&mut client, b"last").await.unwrap();
        drop(client);

        assert_eq!(read_payload(&mut server).await.unwrap().unwrap(), b"last");
        assert!(read_payload(&mut server).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_eof_mid_prefix_is_closed() {
        let (mut client, mut server) = tokio::io::duplex(1024);
        client.write_all(&[1, 0]).await.unwrap();
        drop(client);

        assert!(matches!(
            read_payload(&mut server).await,
            Err(TransportError::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn test_eof_mid_body_is_closed() {
        let (mut client, mut server) = tokio::io::duplex(1024);
        // Declare 10 bytes but deliver 3.
        client.write_all(&10u32.to_le_bytes()).await.unwrap();
        client.write_all(&[1, 2, 3]).await.unwrap();
        drop(client);

        assert!(matches!(
            read_payload(&mut server).await,
            Err(TransportError::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn test_oversized_declared_length_rejected() {
        let (mut client, mut server) = tokio::io::duplex(1024);
        let oversized = (MAX_PAYLOAD_SIZE as u32) + 1;
        client.write_all(&oversized.to_le_bytes()).await.unwrap();

        assert!(matches!(
            read_payload(&mut server).await,
            Err(TransportError::MalformedPayload { .. })
        ));
    }

    #[tokio::test]
    async fn test_oversized_write_rejected() {
        let (mut client, _server) = tokio::io::duplex(1024);
        let payload = vec![0u8; MAX_PAYLOAD_SIZE + 1];
        assert!(matches!(
            write_payload(&mut client, &payload).await,
            Err(TransportError::PayloadTooLarge { .. })
        ));
    }
}
