//! Veilpost Key Store
//!
//! Owns the device's one long-lived keypair: lazy generation on first use,
//! persistence in OS secure storage, and retrieval without re-prompting.
//!
//! The secret key never leaves the device. If secure storage is denied the
//! feature fails loudly ([`KeyStoreError::StorageUnavailable`]); there is no
//! silent fallback to an unencrypted path.
//!
//! Storage is injected through the [`SecretStore`] trait so protocol logic
//! stays testable with deterministic key material; production uses
//! [`KeyringStore`] over the platform keychain.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod error;
mod secret_store;
mod store;

pub use error::KeyStoreError;
pub use secret_store::{KeyringStore, MemoryStore, SecretStore};
pub use store::KeyStore;
