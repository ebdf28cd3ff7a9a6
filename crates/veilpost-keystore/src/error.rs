//! Key store error type.

use thiserror::Error;

/// Errors from device-keypair persistence.
///
/// Storage denial is fatal to the encryption feature for the session:
/// callers must disable encrypted sending rather than fall back to
/// plaintext.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyStoreError {
    /// Secure storage could not be reached (platform denial, missing
    /// keychain service, or a failed storage task).
    #[error("secure storage unavailable: {reason}")]
    StorageUnavailable {
        /// Underlying platform failure.
        reason: String,
    },
}
