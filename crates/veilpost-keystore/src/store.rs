//! Load-or-create device keypair logic.

use std::sync::Arc;

use tokio::sync::Mutex;
use veilpost_crypto::DeviceKeyPair;
use zeroize::Zeroize;

use crate::error::KeyStoreError;
use crate::secret_store::SecretStore;

/// Handle to the device's one persistent keypair.
///
/// Cheap to share behind an `Arc`; all callers observe the same pair.
pub struct KeyStore<S: SecretStore> {
    store: Arc<S>,
    /// Cached pair plus the serialization point for first-time loads.
    slot: Mutex<Option<DeviceKeyPair>>,
}

impl<S: SecretStore> KeyStore<S> {
    /// Create a key store over the given storage backend.
    pub fn new(store: S) -> Self {
        Self { store: Arc::new(store), slot: Mutex::new(None) }
    }

    /// Load the device keypair, generating and persisting one on first use.
    ///
    /// Concurrent callers are serialized through one lock, so two
    /// near-simultaneous first calls cannot each persist a different pair;
    /// every caller observes the same result. A stored record with the
    /// wrong length for the scheme is discarded and replaced. A fresh pair
    /// is persisted before it is returned, so a crash between generation
    /// and persistence cannot leave incompatible keys behind.
    ///
    /// Idempotent after the first call: later calls return the bit-identical
    /// pair from cache without touching storage.
    pub async fn load_or_create(&self) -> Result<DeviceKeyPair, KeyStoreError> {
        let mut slot = self.slot.lock().await;
        if let Some(pair) = slot.as_ref() {
            return Ok(pair.clone());
        }

        if let Some(mut record) = self.read_record().await? {
            let parsed = DeviceKeyPair::from_secret_bytes(&record);
            record.zeroize();
            match parsed {
                Ok(pair) => {
                    *slot = Some(pair.clone());
                    return Ok(pair);
                },
                Err(e) => {
                    tracing::warn!(error = %e, "discarding malformed device key record");
                },
            }
        }

        let pair = DeviceKeyPair::generate();
        self.write_record(pair.secret_bytes()).await?;
        tracing::debug!("generated and persisted new device keypair");

        *slot = Some(pair.clone());
        Ok(pair)
    }

    /// Delete the stored record and forget the cached pair.
    ///
    /// For explicit secret invalidation or a full local data reset; the next
    /// `load_or_create` starts over with a fresh pair.
    pub async fn invalidate(&self) -> Result<(), KeyStoreError> {
        let mut slot = self.slot.lock().await;
        *slot = None;

        let store = Arc::clone(&self.store);
        run_blocking(move || store.delete()).await
    }

    async fn read_record(&self) -> Result<Option<Vec<u8>>, KeyStoreError> {
        let store = Arc::clone(&self.store);
        run_blocking(move || store.read()).await
    }

    async fn write_record(
        &self,
        mut secret: [u8; veilpost_crypto::KEY_SIZE],
    ) -> Result<(), KeyStoreError> {
        let store = Arc::clone(&self.store);
        run_blocking(move || {
            let result = store.write(&secret);
            secret.zeroize();
            result
        })
        .await
    }
}

/// Run a keychain call on the blocking pool.
async fn run_blocking<T, F>(f: F) -> Result<T, KeyStoreError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, KeyStoreError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| KeyStoreError::StorageUnavailable { reason: e.to_string() })?
}

#[cfg(test)]
mod tests {
    use veilpost_crypto::KEY_SIZE;

    use super::*;
    use crate::secret_store::MemoryStore;

    /// Storage that always denies access.
    struct DeniedStore;

    impl SecretStore for DeniedStore {
        fn read(&self) -> Result<Option<Vec<u8>>, KeyStoreError> {
            Err(KeyStoreError::StorageUnavailable { reason: "denied".to_string() })
        }

        fn write(&self, _bytes: &[u8]) -> Result<(), KeyStoreError> {
            Err(KeyStoreError::StorageUnavailable { reason: "denied".to_string() })
        }

        fn delete(&self) -> Result<(), KeyStoreError> {
            Err(KeyStoreError::StorageUnavailable { reason: "denied".to_string() })
        }
    }

    #[tokio::test]
    async fn generates_and_persists_on_first_use() {
        let storage = MemoryStore::new();
        let key_store = KeyStore::new(storage.clone());

        let pair = key_store.load_or_create().await.unwrap();

        let record = storage.stored().unwrap();
        assert_eq!(record.len(), KEY_SIZE);
        assert_eq!(record, pair.secret_bytes());
    }

    #[tokio::test]
    async fn repeated_calls_return_bit_identical_pairs() {
        let key_store = KeyStore::new(MemoryStore::new());

        let first = key_store.load_or_create().await.unwrap();
        let second = key_store.load_or_create().await.unwrap();

        assert_eq!(first.secret_bytes(), second.secret_bytes());
        assert_eq!(first.public_key_bytes(), second.public_key_bytes());
    }

    #[tokio::test]
    async fn reuses_record_persisted_by_an_earlier_session() {
        let storage = MemoryStore::new();

        let pair = KeyStore::new(storage.clone()).load_or_create().await.unwrap();
        let reloaded = KeyStore::new(storage).load_or_create().await.unwrap();

        assert_eq!(reloaded.secret_bytes(), pair.secret_bytes());
    }

    #[tokio::test]
    async fn replaces_malformed_record() {
        let storage = MemoryStore::with_record(vec![0u8; 31]);
        let key_store = KeyStore::new(storage.clone());

        let pair = key_store.load_or_create().await.unwrap();

        let record = storage.stored().unwrap();
        assert_eq!(record.len(), KEY_SIZE);
        assert_eq!(record, pair.secret_bytes());
    }

    #[tokio::test]
    async fn concurrent_first_calls_observe_one_pair() {
        let storage = MemoryStore::new();
        let key_store = KeyStore::new(storage.clone());

        let (a, b) = tokio::join!(key_store.load_or_create(), key_store.load_or_create());
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_eq!(a.secret_bytes(), b.secret_bytes());
        assert_eq!(storage.stored().unwrap(), a.secret_bytes());
    }

    #[tokio::test]
    async fn storage_denial_propagates() {
        let key_store = KeyStore::new(DeniedStore);

        let err = key_store.load_or_create().await.unwrap_err();
        assert!(matches!(err, KeyStoreError::StorageUnavailable { .. }));
    }

    #[tokio::test]
    async fn invalidate_deletes_record_and_cache() {
        let storage = MemoryStore::new();
        let key_store = KeyStore::new(storage.clone());

        let first = key_store.load_or_create().await.unwrap();
        key_store.invalidate().await.unwrap();
        assert_eq!(storage.stored(), None);

        let second = key_store.load_or_create().await.unwrap();
        assert_ne!(first.secret_bytes(), second.secret_bytes());
    }
}
