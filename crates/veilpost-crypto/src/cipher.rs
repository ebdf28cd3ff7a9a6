//! Message encryption and fail-safe decryption.
//!
//! Encrypt seals the plaintext twice, once to the recipient and once from
//! the author to themself, so both parties can decrypt the stored envelope
//! with nothing but their own device keypair.
//!
//! Decrypt is total: it returns the legacy plaintext body for pre-scheme
//! messages and the empty string for anything it cannot authenticate. It
//! never raises and never surfaces ciphertext, so a single corrupted message
//! cannot take down a conversation view.

use crypto_box::{
    ChaChaBox, PublicKey,
    aead::{Aead, AeadCore, OsRng},
};

use crate::codec;
use crate::envelope::{ENVELOPE_VERSION, EncryptedEnvelope};
use crate::error::CipherError;
use crate::keys::{DeviceKeyPair, KEY_SIZE};

/// XChaCha20-Poly1305 nonce length in bytes.
pub const NONCE_SIZE: usize = 24;

/// Which ciphertext/nonce pair a viewer is entitled to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Viewer {
    /// The viewer wrote the message; decrypt the self-sealed pair.
    Author,
    /// The viewer received the message; decrypt the recipient pair.
    Recipient,
}

/// Encrypt a message body for storage.
///
/// Draws two fresh nonces from the OS CSPRNG, seals the plaintext once to
/// the recipient and once author-to-self, and assembles a version-1
/// envelope. No side effects beyond consuming randomness.
///
/// # Errors
///
/// - `InvalidRecipientKey`: the directory-provided key text does not decode
///   to exactly [`KEY_SIZE`] bytes. The send must be refused; the key is
///   never truncated or padded.
pub fn encrypt(
    plaintext: &str,
    keys: &DeviceKeyPair,
    recipient_public_key_text: &str,
) -> Result<EncryptedEnvelope, CipherError> {
    let recipient_key = decode_public_key(recipient_public_key_text)
        .map_err(|reason| CipherError::InvalidRecipientKey { reason })?;

    let payload = codec::utf8_encode(plaintext);

    let (recipient_ciphertext, recipient_nonce) = seal(&payload, &recipient_key, keys);
    let (sender_ciphertext, sender_nonce) = seal(&payload, &keys.public_key(), keys);

    Ok(EncryptedEnvelope {
        version: ENVELOPE_VERSION,
        sender_public_key: keys.public_key_text(),
        ciphertext_for_sender: codec::bytes_to_text(&sender_ciphertext),
        nonce_for_sender: codec::bytes_to_text(&sender_nonce),
        ciphertext_for_recipient: codec::bytes_to_text(&recipient_ciphertext),
        nonce_for_recipient: codec::bytes_to_text(&recipient_nonce),
    })
}

/// Decrypt a stored message body for display.
///
/// Messages that predate the scheme carry no envelope (or an unknown
/// version) and return `legacy_body` verbatim. Every decryption failure
/// returns the empty string: wrong-length nonce, malformed sender key,
/// tampered ciphertext and wrong-role access all render as no content.
pub fn decrypt(
    envelope: Option<&EncryptedEnvelope>,
    legacy_body: &str,
    viewer: Viewer,
    keys: &DeviceKeyPair,
) -> String {
    let Some(envelope) = envelope else {
        return legacy_body.to_string();
    };
    if envelope.version != ENVELOPE_VERSION {
        return legacy_body.to_string();
    }

    open_envelope(envelope, viewer, keys).unwrap_or_default()
}

/// Seal a payload to one peer, returning the ciphertext and its fresh nonce.
fn seal(payload: &[u8], peer: &PublicKey, keys: &DeviceKeyPair) -> (Vec<u8>, [u8; NONCE_SIZE]) {
    let shared = ChaChaBox::new(peer, keys.secret_key());
    let nonce = ChaChaBox::generate_nonce(&mut OsRng);

    let Ok(ciphertext) = shared.encrypt(&nonce, payload) else {
        unreachable!("XChaCha20-Poly1305 encryption cannot fail with valid inputs");
    };

    (ciphertext, nonce.into())
}

/// Open the pair matching the viewer's role. `None` means empty content.
fn open_envelope(
    envelope: &EncryptedEnvelope,
    viewer: Viewer,
    keys: &DeviceKeyPair,
) -> Option<String> {
    let (ciphertext_text, nonce_text) = match viewer {
        Viewer::Author => (&envelope.ciphertext_for_sender, &envelope.nonce_for_sender),
        Viewer::Recipient => {
            (&envelope.ciphertext_for_recipient, &envelope.nonce_for_recipient)
        },
    };

    let nonce_bytes = codec::text_to_bytes(nonce_text).ok()?;
    let nonce: [u8; NONCE_SIZE] = nonce_bytes.as_slice().try_into().ok()?;

    // The sender pair was sealed self-to-self, so the author's own public
    // key is the peer; the recipient derives the same shared secret from
    // the author's published key.
    let peer_key = match viewer {
        Viewer::Author => keys.public_key(),
        Viewer::Recipient => decode_public_key(&envelope.sender_public_key).ok()?,
    };

    let ciphertext = codec::text_to_bytes(ciphertext_text).ok()?;

    let shared = ChaChaBox::new(&peer_key, keys.secret_key());
    let payload = shared.decrypt(&nonce.into(), ciphertext.as_slice()).ok()?;

    Some(codec::utf8_decode(&payload))
}

/// Decode public-key transport text, insisting on the exact X25519 length.
fn decode_public_key(text: &str) -> Result<PublicKey, String> {
    let bytes = codec::text_to_bytes(text).map_err(|e| e.to_string())?;
    let key: [u8; KEY_SIZE] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| format!("decoded to {} bytes, expected {KEY_SIZE}", bytes.len()))?;
    Ok(PublicKey::from(key))
}
