//! Device keypair for the message encryption scheme.
//!
//! One long-lived X25519 keypair per device. The secret key never leaves the
//! device; the public key is published to the server-side directory so other
//! parties can encrypt to this device.

use crypto_box::{PublicKey, SecretKey, aead::OsRng};

use crate::codec;
use crate::error::KeyError;

/// X25519 secret- and public-key length in bytes.
pub const KEY_SIZE: usize = 32;

/// The device's static asymmetric keypair.
///
/// Only the secret key is held; the matching public key is derived from it,
/// so the two can never drift apart. Immutable once created: rotation builds
/// a new pair and replaces the stored record wholesale.
#[derive(Clone)]
pub struct DeviceKeyPair {
    secret: SecretKey,
}

impl DeviceKeyPair {
    /// Generate a fresh keypair from the operating system CSPRNG.
    pub fn generate() -> Self {
        Self { secret: SecretKey::generate(&mut OsRng) }
    }

    /// Reconstruct a keypair from a stored secret-key record.
    ///
    /// Rejects any record that is not exactly [`KEY_SIZE`] bytes; callers
    /// must treat a rejected record as stale and regenerate, never truncate
    /// or pad.
    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        let secret: [u8; KEY_SIZE] = bytes
            .try_into()
            .map_err(|_| KeyError::InvalidLength { expected: KEY_SIZE, actual: bytes.len() })?;
        Ok(Self { secret: SecretKey::from(secret) })
    }

    /// Raw secret-key bytes, for persistence to secure storage only.
    pub fn secret_bytes(&self) -> [u8; KEY_SIZE] {
        self.secret.to_bytes()
    }

    /// The secret key, for key agreement inside this crate.
    pub(crate) fn secret_key(&self) -> &SecretKey {
        &self.secret
    }

    /// The matching public key.
    pub fn public_key(&self) -> PublicKey {
        self.secret.public_key()
    }

    /// Raw public-key bytes.
    pub fn public_key_bytes(&self) -> [u8; KEY_SIZE] {
        *self.secret.public_key().as_bytes()
    }

    /// Public key as transport text, the form used at envelope and directory
    /// boundaries.
    pub fn public_key_text(&self) -> String {
        codec::bytes_to_text(&self.public_key_bytes())
    }
}

impl std::fmt::Debug for DeviceKeyPair {
    /// Shows only the public half; the secret must not reach logs.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceKeyPair").field("public_key", &self.public_key_text()).finish()
    }
}
