// ============================================
// File: crates/veilmq-transport/src/codec.rs
// ============================================
//! # Multi-Frame Codec
//!
//! ## Creation Reason
//! A message is an ordered sequence of byte frames delivered as one
//! unit. This codec packs a frame sequence into a single payload before
//! encryption and unpacks it after decryption, so frame boundaries ride
//! inside the protected record.
//!
//! ## Encoding
//! ```text
//! ┌──────────────┬───────────────┬─────────┬───────────────┬─────────┐
//! │ Count (4B LE)│ Len #0 (4B LE)│ Frame #0│ Len #1 (4B LE)│ Frame #1│ ...
//! └──────────────┴───────────────┴─────────┴───────────────┴─────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Decode is strict: trailing bytes after the last frame are an
//!   error, not ignored padding
//! - Every declared length is bounds-checked against the remaining
//!   input before any slicing
//! - The declared frame count is bounded by the bytes actually present
//!   before the frame vector is allocated
//!
//! ## Last Modified
//! v0.1.0 - Initial frame codec

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Result, TransportError};

const LEN_SIZE: usize = 4;

/// Encodes a frame sequence into one payload.
#[must_use]
pub fn encode_frames(frames: &[Bytes]) -> Bytes {
    let body: usize = frames.iter().map(|f| LEN_SIZE + f.len()).sum();
    let mut buf = BytesMut::with_capacity(LEN_SIZE + body);
    buf.put_u32_le(frames.len() as u32);
    for frame in frames {
        buf.put_u32_le(frame.len() as u32);
        buf.put_slice(frame);
    }
    buf.freeze()
}

/// Decodes a payload back into its frame sequence.
///
/// # Errors
/// Returns `MalformedPayload` if the payload is truncated, a frame
/// length runs past the end, the declared count cannot fit in the
/// bytes present, or bytes remain after the last frame.
pub fn decode_frames(payload: &[u8]) -> Result<Vec<Bytes>> {
    let mut rest = payload;

    let count = read_len(&mut rest, "frame count")?;
    // Every frame costs at least its length prefix, so the input
    // itself bounds any honest count. Checked before allocation.
    if count > rest.len() / LEN_SIZE {
        return Err(TransportError::malformed(format!(
            "declared frame count {count} is implausible for {} bytes",
            rest.len()
        )));
    }

    let mut frames = Vec::with_capacity(count);
    for index in 0..count {
        let len = read_len(&mut rest, "frame length")?;
        if len > rest.len() {
            return Err(TransportError::malformed(format!(
                "frame {index} declares {len} bytes but only {} remain",
                rest.len()
            )));
        }
        frames.push(Bytes::copy_from_slice(&rest[..len]));
        rest = &rest[len..];
    }

    if !rest.is_empty() {
        return Err(TransportError::malformed(format!(
            "{} trailing bytes after last frame",
            rest.len()
        )));
    }
    Ok(frames)
}

fn read_len(rest: &mut &[u8], what: &str) -> Result<usize> {
    if rest.len() < LEN_SIZE {
        return Err(TransportError::malformed(format!("truncated {what}")));
    }
    let mut bytes = [0u8; LEN_SIZE];
    bytes.copy_from_slice(&rest[..LEN_SIZE]);
    *rest = &rest[LEN_SIZE..];
    Ok(u32::from_le_bytes(bytes) as usize)
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_frame_roundtrip() {
        let frames = vec![Bytes::from_static(b"helllo world!")];
        let payload = encode_frames(&frames);
        assert_eq!(decode_frames(&payload).unwrap(), frames);
    }

    #[test]
    fn test_multi_frame_roundtrip() {
        let frames = vec![
            Bytes::from_static(b"topic"),
            Bytes::new(),
            Bytes::from(vec![0xAB; 1000]),
        ];
        let payload = encode_frames(&frames);
        let decoded = decode_frames(&payload).unwrap();
        assert_eq!(decoded, frames);
    }

    #[test]
    fn test_empty_message_roundtrip() {
        let payload = encode_frames(&[]);
        assert!(decode_frames(&payload).unwrap().is_empty());
    }

    #[test]
    fn test_truncated_payload_rejected() {
        let frames = vec![Bytes::from_static(b"data")];
        let payload = encode_frames(&frames);
        for cut in [0, 3, payload.len() - 1] {
            assert!(matches!(
                decode_frames(&payload[..cut]),
                Err(TransportError::MalformedPayload { .. })
            ));
        }
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut payload = encode_frames(&[Bytes::from_static(b"data")]).to_vec();
        payload.push(0x00);
        assert!(matches!(
            decode_frames(&payload),
            Err(TransportError::MalformedPayload { .. })
        ));
    }

    #[test]
    fn test_overrunning_frame_length_rejected() {
        let mut buf = BytesMut::new();
        buf.put_u32_le(1);
        buf.put_u32_le(100); // declares 100 bytes, delivers 2
        buf.put_slice(&[1, 2]);
        assert!(matches!(
            decode_frames(&buf),
            Err(TransportError::MalformedPayload { .. })
        ));
    }

    #[test]
    fn test_implausible_frame_count_rejected() {
        let mut buf = BytesMut::new();
        buf.put_u32_le(u32::MAX);
        assert!(matches!(
            decode_frames(&buf),
            Err(TransportError::MalformedPayload { .. })
        ));
    }

    #[test]
    fn test_overdeclared_count_rejected_before_reading_frames() {
        // A tiny payload declaring millions of frames must fail the
        // count check itself, not a later per-frame length read.
        let mut buf = BytesMut::new();
        buf.put_u32_le(16_777_216);
        buf.put_u32_le(0);
        let err = decode_frames(&buf).unwrap_err();
        assert!(matches!(
            &err,
            TransportError::MalformedPayload { reason } if reason.contains("implausible")
        ));
    }

    #[test]
    fn test_count_at_capacity_of_input_accepted() {
        // Forty empty frames: the count exactly matches what the
        // remaining bytes can hold.
        let frames = vec![Bytes::new(); 40];
        let payload = encode_frames(&frames);
        assert_eq!(decode_frames(&payload).unwrap(), frames);
    }
}
