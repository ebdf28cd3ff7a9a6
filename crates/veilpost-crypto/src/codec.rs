//! Transport-text and UTF-8 codecs.
//!
//! Lossless conversions between raw bytes, base64 transport text, and UTF-8
//! strings. No knowledge of cryptography; key, nonce and ciphertext fields
//! all pass through here on their way into and out of an envelope.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::CodecError;

/// Encode raw bytes as base64 transport text.
pub fn bytes_to_text(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode base64 transport text back into raw bytes.
///
/// Round-trip identity holds for every byte sequence:
/// `text_to_bytes(&bytes_to_text(b)) == b`.
pub fn text_to_bytes(text: &str) -> Result<Vec<u8>, CodecError> {
    Ok(STANDARD.decode(text)?)
}

/// Encode a string as UTF-8 bytes.
pub fn utf8_encode(text: &str) -> Vec<u8> {
    text.as_bytes().to_vec()
}

/// Decode UTF-8 bytes into a string.
///
/// Invalid sequences are replaced with U+FFFD rather than rejected. On the
/// decrypt path the bytes are AEAD-authenticated and our own encrypt path
/// only accepts valid strings, so substitution can only ever affect payloads
/// produced by a foreign client, and it keeps rendering alive for those.
pub fn utf8_decode(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}
