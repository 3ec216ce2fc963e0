// ============================================
// File: crates/veilmq-core/src/z85.rs
// ============================================
//! # Z85 Key Encoding
//!
//! ## Creation Reason
//! Keys cross configuration boundaries as text. Z85 packs 4 binary bytes
//! into 5 printable characters, so a 32-byte key is exactly 40 characters
//! with no padding and no characters that need quoting in shells or logs.
//!
//! ## Main Functionality
//! - `encode`: binary (multiple of 4 bytes) → printable text
//! - `decode`: printable text (multiple of 5 chars) → binary
//! - `decode_key`: strict 40-character → 32-byte key form
//!
//! ## Encoding Scheme
//! ```text
//! ┌──────────────┐      big-endian base-85      ┌───────────────┐
//! │ 4 bytes (u32)│ ───────────────────────────► │ 5 characters  │
//! └──────────────┘                              └───────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - The alphabet order is part of the wire contract - never reorder it
//! - Reject any 5-char group decoding above u32::MAX
//!
//! ## Last Modified
//! v0.1.0 - Initial Z85 implementation

use crate::error::{CoreError, Result};

// ============================================
// Alphabet
// ============================================

/// The 85-character Z85 alphabet.
const ALPHABET: &[u8; 85] =
    b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ.-:+=^!/*?&<>()[]{}@%$#";

/// Reverse lookup table: byte value → alphabet index, 0xFF for invalid.
const fn build_reverse_table() -> [u8; 256] {
    let mut table = [0xFFu8; 256];
    let mut i = 0;
    while i < 85 {
        table[ALPHABET[i] as usize] = i as u8;
        i += 1;
    }
    table
}

const REVERSE: [u8; 256] = build_reverse_table();

/// Base-85 place values for one 5-character group.
const DIVISORS: [u32; 5] = [85 * 85 * 85 * 85, 85 * 85 * 85, 85 * 85, 85, 1];

/// Length of an encoded 32-byte key.
pub const ENCODED_KEY_LEN: usize = 40;

// ============================================
// Encoding
// ============================================

/// Encodes binary data as Z85 text.
///
/// # Arguments
/// * `data` - Input bytes; length must be a multiple of 4
///
/// # Errors
/// Returns `InvalidKeyEncoding` if the length is not a multiple of 4.
pub fn encode(data: &[u8]) -> Result<String> {
    if data.len() % 4 != 0 {
        return Err(CoreError::invalid_encoding(format!(
            "binary length {} is not a multiple of 4",
            data.len()
        )));
    }

    let mut out = String::with_capacity(data.len() / 4 * 5);
    for chunk in data.chunks_exact(4) {
        let mut value = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        for divisor in DIVISORS {
            let index = (value / divisor) as usize;
            value %= divisor;
            out.push(ALPHABET[index] as char);
        }
    }
    Ok(out)
}

/// Decodes Z85 text back to binary data.
///
/// # Arguments
/// * `text` - Input text; length must be a multiple of 5
///
/// # Errors
/// Returns `InvalidKeyEncoding` if the length is wrong, a character is
/// outside the alphabet, or a 5-character group overflows 32 bits.
pub fn decode(text: &str) -> Result<Vec<u8>> {
    let bytes = text.as_bytes();
    if bytes.len() % 5 != 0 {
        return Err(CoreError::invalid_encoding(format!(
            "text length {} is not a multiple of 5",
            bytes.len()
        )));
    }

    let mut out = Vec::with_capacity(bytes.len() / 5 * 4);
    for chunk in bytes.chunks_exact(5) {
        let mut value: u64 = 0;
        for &c in chunk {
            let digit = REVERSE[c as usize];
            if digit == 0xFF {
                return Err(CoreError::invalid_encoding(format!(
                    "character {:?} is not in the Z85 alphabet",
                    c as char
                )));
            }
            value = value * 85 + u64::from(digit);
        }
        if value > u64::from(u32::MAX) {
            return Err(CoreError::invalid_encoding(
                "5-character group overflows 32 bits",
            ));
        }
        out.extend_from_slice(&(value as u32).to_be_bytes());
    }
    Ok(out)
}

/// Decodes a strict 40-character key encoding into 32 bytes.
///
/// # Errors
/// Returns `InvalidKeyEncoding` if the text is not exactly 40 valid
/// Z85 characters.
pub fn decode_key(text: &str) -> Result<[u8; 32]> {
    if text.len() != ENCODED_KEY_LEN {
        return Err(CoreError::invalid_encoding(format!(
            "key text length {}, expected {}",
            text.len(),
            ENCODED_KEY_LEN
        )));
    }
    let bytes = decode(text)?;
    let mut key = [0u8; 32];
    key.copy_from_slice(&bytes);
    Ok(key)
}

/// Encodes a 32-byte key as its 40-character text form.
#[must_use]
pub fn encode_key(key: &[u8; 32]) -> String {
    // A 32-byte input is always a multiple of 4.
    encode(key).unwrap_or_default()
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    /// Known-answer vector from the Z85 specification.
    const VECTOR_BINARY: [u8; 8] = [0x86, 0x4F, 0xD2, 0x6F, 0xB5, 0x59, 0xF7, 0x5B];
    const VECTOR_TEXT: &str = "HelloWorld";

    #[test]
    fn test_known_answer_encode() {
        assert_eq!(encode(&VECTOR_BINARY).unwrap(), VECTOR_TEXT);
    }

    #[test]
    fn test_known_answer_decode() {
        assert_eq!(decode(VECTOR_TEXT).unwrap(), VECTOR_BINARY);
    }

    #[test]
    fn test_key_roundtrip() {
        let key: [u8; 32] = core::array::from_fn(|i| i as u8);
        let text = encode_key(&key);
        assert_eq!(text.len(), ENCODED_KEY_LEN);
        assert_eq!(decode_key(&text).unwrap(), key);
    }

    #[test]
    fn test_all_zero_and_all_ff_keys() {
        for key in [[0x00u8; 32], [0xFFu8; 32]] {
            let text = encode_key(&key);
            assert_eq!(decode_key(&text).unwrap(), key);
        }
    }

    #[test]
    fn test_bad_length_rejected() {
        assert!(matches!(
            decode_key("tooshort"),
            Err(CoreError::InvalidKeyEncoding { .. })
        ));
        assert!(matches!(
            decode("abcd"),
            Err(CoreError::InvalidKeyEncoding { .. })
        ));
        assert!(matches!(
            encode(&[1, 2, 3]),
            Err(CoreError::InvalidKeyEncoding { .. })
        ));
    }

    #[test]
    fn test_invalid_character_rejected() {
        // Comma is not in the alphabet.
        let text = ",".repeat(ENCODED_KEY_LEN);
        assert!(matches!(
            decode_key(&text),
            Err(CoreError::InvalidKeyEncoding { .. })
        ));
    }

    #[test]
    fn test_overflow_group_rejected() {
        // "#####" decodes above u32::MAX.
        let text = "#".repeat(ENCODED_KEY_LEN);
        assert!(matches!(
            decode_key(&text),
            Err(CoreError::InvalidKeyEncoding { .. })
        ));
    }
}
