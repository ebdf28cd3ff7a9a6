//! Veilpost Message Encryption
//!
//! End-to-end encryption for direct-message bodies. Pure functions over a
//! long-lived device keypair; no storage or network access happens in this
//! crate.
//!
//! # Scheme
//!
//! Each device holds one static X25519 keypair. A message is sealed twice
//! with `crypto_box` (X25519 key agreement + XChaCha20-Poly1305 AEAD), once
//! for each party that must be able to read it later:
//!
//! ```text
//! plaintext
//!     │
//!     ├─ seal(recipient public key, my secret key) → recipient pair
//!     │
//!     └─ seal(my own public key,    my secret key) → sender pair
//!            │
//!            ▼
//! EncryptedEnvelope { version, sender key, both ciphertext/nonce pairs }
//! ```
//!
//! The self-to-self seal is what lets the author re-read their own sent
//! messages without storing plaintext or a second secret anywhere; it costs
//! one extra AEAD call per message.
//!
//! # Failure contract
//!
//! Encryption failures are reported to the caller so a send can be blocked.
//! Decryption failures are never errors: a malformed envelope, a wrong key,
//! or tampered ciphertext all decrypt to the empty string, so one corrupted
//! message cannot break rendering of a conversation, and ciphertext is never
//! shown to the user.
//!
//! # Known limitation
//!
//! One keypair per device; multi-device identities and key rotation with
//! forward secrecy are out of scope for this scheme.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod cipher;
pub mod codec;
pub mod envelope;
pub mod error;
pub mod keys;

pub use cipher::{NONCE_SIZE, Viewer, decrypt, encrypt};
pub use envelope::{ENVELOPE_VERSION, EncryptedEnvelope};
pub use error::{CipherError, CodecError, KeyError};
pub use keys::{DeviceKeyPair, KEY_SIZE};
