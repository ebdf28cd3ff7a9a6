//! Per-session key lifecycle state machine.
//!
//! One controlling type owns every transition, and session identity is an
//! epoch counter: each await is followed by an epoch check, so a key-store
//! read or registration call that resolves after logout is discarded instead
//! of mutating state that now belongs to a different identity.

use tokio::sync::Mutex;
use veilpost_crypto::DeviceKeyPair;
use veilpost_keystore::{KeyStore, SecretStore};

use crate::directory::Directory;

/// Observable key lifecycle state for the current session.
#[derive(Debug, Clone)]
pub enum SessionState {
    /// No session active, no key material loaded.
    Idle,
    /// Key-store read and registration call in flight.
    Loading,
    /// Keypair available; registration attempted.
    Ready {
        /// The device keypair for this session.
        key_pair: DeviceKeyPair,
        /// False when registration failed transiently; the device can still
        /// decrypt and read, and [`KeySession::retry_registration`] applies.
        registered: bool,
    },
    /// Key store unavailable or registration permanently rejected.
    Error {
        /// What went wrong.
        reason: String,
    },
}

struct Inner {
    /// Bumped on every `end_session`; in-flight results from an older epoch
    /// are discarded.
    epoch: u64,
    state: SessionState,
}

/// Drives the key lifecycle for one authenticated session.
pub struct KeySession<S: SecretStore, D: Directory> {
    key_store: KeyStore<S>,
    directory: D,
    inner: Mutex<Inner>,
}

impl<S: SecretStore, D: Directory> KeySession<S, D> {
    /// Create a session controller over the given key store and directory.
    pub fn new(key_store: KeyStore<S>, directory: D) -> Self {
        Self {
            key_store,
            directory,
            inner: Mutex::new(Inner { epoch: 0, state: SessionState::Idle }),
        }
    }

    /// Current state snapshot.
    pub async fn state(&self) -> SessionState {
        self.inner.lock().await.state.clone()
    }

    /// Start the lifecycle for the active session.
    ///
    /// Loads (or creates) the device keypair, attempts registration, and
    /// returns the resulting state. Key-store failure and permanent
    /// registration rejection end in [`SessionState::Error`]; a transient
    /// registration failure still yields `Ready` with `registered: false`,
    /// because a device that cannot register can still read.
    pub async fn activate(&self) -> SessionState {
        let epoch = {
            let mut inner = self.inner.lock().await;
            inner.state = SessionState::Loading;
            inner.epoch
        };

        let key_pair = match self.key_store.load_or_create().await {
            Ok(pair) => pair,
            Err(e) => {
                tracing::warn!(error = %e, "key store unavailable, encryption disabled");
                return self.transition(epoch, SessionState::Error { reason: e.to_string() }).await;
            },
        };

        let registered = match self.register(&key_pair).await {
            Ok(registered) => registered,
            Err(reason) => {
                return self.transition(epoch, SessionState::Error { reason }).await;
            },
        };

        self.transition(epoch, SessionState::Ready { key_pair, registered }).await
    }

    /// Retry a registration that previously failed transiently.
    ///
    /// No-op outside `Ready { registered: false, .. }`.
    pub async fn retry_registration(&self) -> SessionState {
        let (epoch, key_pair) = {
            let inner = self.inner.lock().await;
            match &inner.state {
                SessionState::Ready { key_pair, registered: false } => {
                    (inner.epoch, key_pair.clone())
                },
                _ => return inner.state.clone(),
            }
        };

        match self.register(&key_pair).await {
            Ok(registered) => {
                self.transition(epoch, SessionState::Ready { key_pair, registered }).await
            },
            Err(reason) => self.transition(epoch, SessionState::Error { reason }).await,
        }
    }

    /// End the authenticated session.
    ///
    /// Returns to `Idle` and invalidates any in-flight work, so a new
    /// session starts the lifecycle fresh rather than reusing a result bound
    /// to the previous identity.
    pub async fn end_session(&self) {
        let mut inner = self.inner.lock().await;
        inner.epoch += 1;
        inner.state = SessionState::Idle;
        tracing::debug!(epoch = inner.epoch, "session ended, key lifecycle reset");
    }

    /// Register the public key, folding the non-fatal directory outcomes.
    ///
    /// `Ok(true)`: registered (or already registered / endpoint absent).
    /// `Ok(false)`: transient failure, retryable. `Err`: permanent rejection.
    async fn register(&self, key_pair: &DeviceKeyPair) -> Result<bool, String> {
        match self.directory.register(&key_pair.public_key_text()).await {
            Ok(outcome) => {
                tracing::debug!(?outcome, "public key registration completed");
                Ok(true)
            },
            Err(e) if e.is_transient() => {
                tracing::warn!(error = %e, "public key registration failed, retry later");
                Ok(false)
            },
            Err(e) => Err(e.to_string()),
        }
    }

    /// Commit a transition if the session is still the one that started it.
    async fn transition(&self, epoch: u64, next: SessionState) -> SessionState {
        let mut inner = self.inner.lock().await;
        if inner.epoch != epoch {
            tracing::debug!("discarding key lifecycle result from an ended session");
            return inner.state.clone();
        }
        inner.state = next;
        inner.state.clone()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex as StdMutex};

    use async_trait::async_trait;
    use tokio::sync::Notify;
    use veilpost_keystore::{KeyStoreError, MemoryStore};

    use super::*;
    use crate::directory::RegisterOutcome;
    use crate::error::RegistrationError;

    /// Directory stub that replays scripted responses, then accepts.
    #[derive(Default)]
    struct ScriptedDirectory {
        responses: StdMutex<VecDeque<Result<RegisterOutcome, RegistrationError>>>,
    }

    impl ScriptedDirectory {
        fn respond_with(
            responses: impl IntoIterator<Item = Result<RegisterOutcome, RegistrationError>>,
        ) -> Self {
            Self { responses: StdMutex::new(responses.into_iter().collect()) }
        }
    }

    #[async_trait]
    impl Directory for ScriptedDirectory {
        async fn register(
            &self,
            _public_key_text: &str,
        ) -> Result<RegisterOutcome, RegistrationError> {
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(RegisterOutcome::Accepted))
        }
    }

    /// Directory that blocks until the test releases it.
    struct GatedDirectory {
        entered: Arc<Notify>,
        release: Arc<Notify>,
    }

    #[async_trait]
    impl Directory for GatedDirectory {
        async fn register(
            &self,
            _public_key_text: &str,
        ) -> Result<RegisterOutcome, RegistrationError> {
            self.entered.notify_one();
            self.release.notified().await;
            Ok(RegisterOutcome::Accepted)
        }
    }

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

    fn session_with(
        directory: ScriptedDirectory,
    ) -> KeySession<MemoryStore, ScriptedDirectory> {
        KeySession::new(KeyStore::new(MemoryStore::new()), directory)
    }

    #[tokio::test]
    async fn activation_reaches_ready_and_registered() {
        let session = session_with(ScriptedDirectory::default());

        assert!(matches!(session.state().await, SessionState::Idle));
        let state = session.activate().await;
        assert!(matches!(state, SessionState::Ready { registered: true, .. }));
    }

    #[tokio::test]
    async fn conflict_and_not_found_are_non_fatal() {
        for outcome in [RegisterOutcome::Conflict, RegisterOutcome::NotFound] {
            let session = session_with(ScriptedDirectory::respond_with([Ok(outcome)]));
            let state = session.activate().await;
            assert!(matches!(state, SessionState::Ready { registered: true, .. }));
        }
    }

    #[tokio::test]
    async fn transient_failure_leaves_device_readable() {
        let session = session_with(ScriptedDirectory::respond_with([Err(
            RegistrationError::Network { reason: "timeout".to_string() },
        )]));

        let state = session.activate().await;
        assert!(matches!(state, SessionState::Ready { registered: false, .. }));

        // The scripted failure is consumed; the retry succeeds.
        let state = session.retry_registration().await;
        assert!(matches!(state, SessionState::Ready { registered: true, .. }));
    }

    #[tokio::test]
    async fn permanent_rejection_is_an_error() {
        let session = session_with(ScriptedDirectory::respond_with([Err(
            RegistrationError::Rejected { status: 401, reason: "unauthorized".to_string() },
        )]));

        let state = session.activate().await;
        assert!(matches!(state, SessionState::Error { .. }));
    }

    #[tokio::test]
    async fn key_store_denial_is_an_error() {
        let session =
            KeySession::new(KeyStore::new(DeniedStore), ScriptedDirectory::default());

        let state = session.activate().await;
        assert!(matches!(state, SessionState::Error { reason } if reason.contains("denied")));
    }

    #[tokio::test]
    async fn retry_outside_ready_unregistered_is_a_no_op() {
        let session = session_with(ScriptedDirectory::default());

        let state = session.retry_registration().await;
        assert!(matches!(state, SessionState::Idle));

        session.activate().await;
        let state = session.retry_registration().await;
        assert!(matches!(state, SessionState::Ready { registered: true, .. }));
    }

    #[tokio::test]
    async fn ending_the_session_discards_in_flight_registration() {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let directory =
            GatedDirectory { entered: Arc::clone(&entered), release: Arc::clone(&release) };

        let session = Arc::new(KeySession::new(KeyStore::new(MemoryStore::new()), directory));

        let task = tokio::spawn({
            let session = Arc::clone(&session);
            async move { session.activate().await }
        });

        // Wait until the registration call is in flight, then log out.
        entered.notified().await;
        session.end_session().await;
        release.notify_one();

        let returned = task.await.unwrap();
        assert!(matches!(returned, SessionState::Idle));
        assert!(matches!(session.state().await, SessionState::Idle));
    }

    #[tokio::test]
    async fn same_keypair_across_sessions() {
        let storage = MemoryStore::new();
        let session =
            KeySession::new(KeyStore::new(storage.clone()), ScriptedDirectory::default());

        let SessionState::Ready { key_pair: first, .. } = session.activate().await else {
            panic!("expected ready state");
        };

        session.end_session().await;

        let SessionState::Ready { key_pair: second, .. } = session.activate().await else {
            panic!("expected ready state");
        };

        // Session identity changes, device keypair does not.
        assert_eq!(first.secret_bytes(), second.secret_bytes());
        assert_eq!(storage.stored().unwrap(), first.secret_bytes());
    }
}
