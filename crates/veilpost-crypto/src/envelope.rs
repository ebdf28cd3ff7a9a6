//! Encrypted message envelope wire format.
//!
//! The envelope is what the persistence layer stores in place of a message
//! body. It is opaque to the server: every field is either a version literal
//! or transport text, and the plaintext appears in none of them.

use serde::{Deserialize, Serialize};

/// Current envelope wire-format version.
pub const ENVELOPE_VERSION: u32 = 1;

/// A single encrypted message, sealed once for each party that can read it.
///
/// Both ciphertext/nonce pairs carry the same plaintext; they differ only in
/// the key-agreement input (author-to-self vs author-to-recipient). Field
/// names follow the stored JSON representation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedEnvelope {
    /// Wire-format version; readers fall back to the legacy plaintext body
    /// for any value other than [`ENVELOPE_VERSION`].
    pub version: u32,

    /// Author's public key as transport text, required by the recipient for
    /// key agreement.
    pub sender_public_key: String,

    /// Ciphertext the author's own future reads decrypt.
    pub ciphertext_for_sender: String,

    /// Nonce paired with [`Self::ciphertext_for_sender`].
    pub nonce_for_sender: String,

    /// Ciphertext the recipient decrypts.
    pub ciphertext_for_recipient: String,

    /// Nonce paired with [`Self::ciphertext_for_recipient`].
    pub nonce_for_recipient: String,
}
