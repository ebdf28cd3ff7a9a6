//! Secure-storage backends for the secret-key record.
//!
//! One record, keyed by a fixed application-scoped identifier, overwritten
//! wholesale on replacement. The trait is synchronous; [`crate::KeyStore`]
//! moves calls onto a blocking thread.

use keyring::Entry;

use crate::error::KeyStoreError;

/// Application-scoped keychain service identifier.
const SERVICE: &str = "veilpost";

/// Keychain account under which the secret-key record lives.
const USER: &str = "device-secret-key";

/// Persistent storage for the device secret-key record.
///
/// Implementations must overwrite the record atomically from the caller's
/// point of view: a reader sees either the old record or the new one, never
/// a partial write.
pub trait SecretStore: Send + Sync + 'static {
    /// Read the stored record, `None` if absent.
    fn read(&self) -> Result<Option<Vec<u8>>, KeyStoreError>;

    /// Store a record, replacing any existing one.
    fn write(&self, bytes: &[u8]) -> Result<(), KeyStoreError>;

    /// Delete the record. Deleting an absent record is not an error.
    fn delete(&self) -> Result<(), KeyStoreError>;
}

/// OS keychain storage.
///
/// The keychain stores text, so the record is kept as transport-encoded
/// bytes. A record that no longer decodes is reported as absent so the key
/// store regenerates instead of failing the session.
#[derive(Debug, Clone, Default)]
pub struct KeyringStore;

impl KeyringStore {
    /// Create a store over the platform keychain.
    pub fn new() -> Self {
        Self
    }

    fn entry() -> Result<Entry, KeyStoreError> {
        Entry::new(SERVICE, USER)
            .map_err(|e| KeyStoreError::StorageUnavailable { reason: e.to_string() })
    }
}

impl SecretStore for KeyringStore {
    fn read(&self) -> Result<Option<Vec<u8>>, KeyStoreError> {
        match Self::entry()?.get_password() {
            Ok(text) => match veilpost_crypto::codec::text_to_bytes(&text) {
                Ok(bytes) => Ok(Some(bytes)),
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        "stored key record is not decodable, treating as absent"
                    );
                    Ok(None)
                },
            },
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(KeyStoreError::StorageUnavailable { reason: e.to_string() }),
        }
    }

    fn write(&self, bytes: &[u8]) -> Result<(), KeyStoreError> {
        let text = veilpost_crypto::codec::bytes_to_text(bytes);
        Self::entry()?
            .set_password(&text)
            .map_err(|e| KeyStoreError::StorageUnavailable { reason: e.to_string() })
    }

    fn delete(&self) -> Result<(), KeyStoreError> {
        match Self::entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(KeyStoreError::StorageUnavailable { reason: e.to_string() }),
        }
    }
}

/// In-memory storage for tests and local previews.
///
/// Clones share the same record, so a test can hold one handle for
/// inspection while the key store owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    record: std::sync::Arc<std::sync::Mutex<Option<Vec<u8>>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-seeded with a record.
    pub fn with_record(bytes: Vec<u8>) -> Self {
        let store = Self::default();
        *store.record.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = Some(bytes);
        store
    }

    /// Current record contents, for test assertions.
    pub fn stored(&self) -> Option<Vec<u8>> {
        self.record.lock().unwrap_or_else(std::sync::PoisonError::into_inner).clone()
    }
}

impl SecretStore for MemoryStore {
    fn read(&self) -> Result<Option<Vec<u8>>, KeyStoreError> {
        Ok(self.stored())
    }

    fn write(&self, bytes: &[u8]) -> Result<(), KeyStoreError> {
        *self.record.lock().unwrap_or_else(std::sync::PoisonError::into_inner) =
            Some(bytes.to_vec());
        Ok(())
    }

    fn delete(&self) -> Result<(), KeyStoreError> {
        *self.record.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_round_trips() {
        let store = MemoryStore::new();
        assert_eq!(store.read().unwrap(), None);

        store.write(&[1, 2, 3]).unwrap();
        assert_eq!(store.read().unwrap(), Some(vec![1, 2, 3]));

        store.write(&[4, 5]).unwrap();
        assert_eq!(store.read().unwrap(), Some(vec![4, 5]));

        store.delete().unwrap();
        assert_eq!(store.read().unwrap(), None);
    }

    #[test]
    fn memory_store_clones_share_the_record() {
        let store = MemoryStore::new();
        let handle = store.clone();

        store.write(&[9]).unwrap();
        assert_eq!(handle.stored(), Some(vec![9]));
    }

    #[test]
    fn deleting_absent_record_is_fine() {
        let store = MemoryStore::new();
        store.delete().unwrap();
    }
}
