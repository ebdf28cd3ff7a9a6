//! Error types for the encryption layer.
//!
//! Only the encrypt path and key construction surface errors; the decrypt
//! path reports failure as empty content by contract (see [`crate::cipher`]).

use thiserror::Error;

/// Errors constructing a [`crate::DeviceKeyPair`] from stored bytes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    /// Stored secret-key record has the wrong length for X25519.
    #[error("invalid secret key length: expected {expected} bytes, got {actual}")]
    InvalidLength {
        /// Required secret-key length.
        expected: usize,
        /// Length of the rejected record.
        actual: usize,
    },
}

/// Errors from the transport-text codec.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("invalid transport text: {0}")]
pub struct CodecError(#[from] base64::DecodeError);

/// Errors from the encrypt path.
///
/// Decryption has no error type: failures are swallowed to the empty string
/// so one bad message cannot block a conversation view.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CipherError {
    /// Recipient key from the directory is malformed; the send is refused
    /// rather than encrypting under a truncated or padded key.
    #[error("invalid recipient key: {reason}")]
    InvalidRecipientKey {
        /// What was wrong with the key material.
        reason: String,
    },
}
