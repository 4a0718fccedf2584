//! Credential and session lifecycle for one provider.
//!
//! A [`SessionManager`] is the sole owner of a provider's [`ProviderState`]
//! and credential. Remote-API pipelines use [`configure`](SessionManager::configure)
//! and [`restore_from_storage`](SessionManager::restore_from_storage); the
//! local-runtime pipeline uses [`bootstrap`](SessionManager::bootstrap).
//!
//! State is published as an immutable snapshot through [`ArcSwap`], so reads
//! never block. Mutating calls are serialized by a reentrancy guard: a second
//! `configure`/`bootstrap` while one is in flight fails with
//! [`GenError::Busy`].

use crate::error::GenError;
use crate::provider::{Device, TextGeneration};
use crate::storage::{credential_key, CredentialStore, MemoryStore};
use crate::types::ProviderState;
use arc_swap::ArcSwap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

/// Secret credential for one provider
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    value: String,
    provider: String,
    persisted: bool,
}

impl Credential {
    pub fn new(provider: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            provider: provider.into(),
            persisted: false,
        }
    }

    /// The secret itself
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Whether the credential was written to durable storage
    pub fn is_persisted(&self) -> bool {
        self.persisted
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("provider", &self.provider)
            .field("value", &"<redacted>")
            .field("persisted", &self.persisted)
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
struct Snapshot {
    state: ProviderState,
    credential: Option<Arc<Credential>>,
    device: Option<Device>,
}

/// Resets the in-flight flag when dropped
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Owns the credential and availability state of one provider.
pub struct SessionManager {
    provider: String,
    store: Arc<dyn CredentialStore>,
    snapshot: ArcSwap<Snapshot>,
    in_flight: AtomicBool,
    state_tx: watch::Sender<ProviderState>,
}

impl fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager")
            .field("provider", &self.provider)
            .field("state", &self.current_state())
            .finish()
    }
}

impl SessionManager {
    /// Create a session backed by the given credential store
    pub fn new(provider: impl Into<String>, store: Arc<dyn CredentialStore>) -> Self {
        let (state_tx, _) = watch::channel(ProviderState::Uninitialized);
        Self {
            provider: provider.into(),
            store,
            snapshot: ArcSwap::from_pointee(Snapshot::default()),
            in_flight: AtomicBool::new(false),
            state_tx,
        }
    }

    /// Create a session with a process-local store
    pub fn in_memory(provider: impl Into<String>) -> Self {
        Self::new(provider, Arc::new(MemoryStore::new()))
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Key under which the credential is persisted
    pub fn storage_key(&self) -> String {
        credential_key(&self.provider)
    }

    pub fn current_state(&self) -> ProviderState {
        self.snapshot.load().state
    }

    /// Current credential, if one is configured
    pub fn credential(&self) -> Option<Arc<Credential>> {
        self.snapshot.load().credential.clone()
    }

    /// Code path the local runtime was loaded on, after a successful bootstrap
    pub fn active_device(&self) -> Option<Device> {
        self.snapshot.load().device
    }

    /// Subscribe to state changes
    pub fn subscribe(&self) -> watch::Receiver<ProviderState> {
        self.state_tx.subscribe()
    }

    /// Validate, persist and activate a credential.
    ///
    /// Empty or whitespace-only values are rejected without contacting any
    /// backend. A storage failure does not prevent activation; the credential
    /// is then reported as not persisted. A degraded session stays degraded
    /// and nothing is written to storage.
    pub async fn configure(&self, value: impl Into<String>) -> Result<ProviderState, GenError> {
        let value = value.into();
        let _guard = self.enter("configure")?;

        let value = value.trim();
        if value.is_empty() {
            return Err(GenError::invalid_credential("Credential is empty"));
        }
        if self.current_state() == ProviderState::Degraded {
            tracing::warn!(
                "Ignoring credential for degraded provider {}",
                self.provider
            );
            return Ok(ProviderState::Degraded);
        }

        let mut credential = Credential::new(self.provider.clone(), value);
        match self.store.set(&self.storage_key(), credential.value()).await {
            Ok(()) => credential.persisted = true,
            Err(e) => {
                tracing::warn!(
                    "Failed to persist credential for provider {}: {}",
                    self.provider,
                    e
                );
            }
        }

        self.publish(Snapshot {
            state: ProviderState::Ready,
            credential: Some(Arc::new(credential)),
            device: None,
        });
        Ok(self.current_state())
    }

    /// Reconstruct the session from durable storage.
    ///
    /// Intended to run once at startup. A missing or unreadable entry leaves
    /// the session uninitialized.
    pub async fn restore_from_storage(&self) -> ProviderState {
        let Ok(_guard) = self.enter("restore") else {
            return self.current_state();
        };

        match self.store.get(&self.storage_key()).await {
            Ok(Some(value)) if !value.trim().is_empty() => {
                let mut credential = Credential::new(self.provider.clone(), value.trim());
                credential.persisted = true;
                self.publish(Snapshot {
                    state: ProviderState::Ready,
                    credential: Some(Arc::new(credential)),
                    device: None,
                });
            }
            Ok(_) => {
                tracing::debug!("No stored credential for provider {}", self.provider);
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to read stored credential for provider {}: {}",
                    self.provider,
                    e
                );
            }
        }

        self.current_state()
    }

    /// Load a local model runtime.
    ///
    /// Tries [`Device::Accelerated`] first and [`Device::Baseline`] second.
    /// Only when both fail does the session become [`ProviderState::Degraded`],
    /// which is sticky: later calls return it without retrying.
    pub async fn bootstrap(&self, runtime: &dyn TextGeneration) -> Result<ProviderState, GenError> {
        match self.current_state() {
            ProviderState::Ready | ProviderState::Degraded => return Ok(self.current_state()),
            ProviderState::Uninitialized | ProviderState::Initializing => {}
        }

        let _guard = self.enter("bootstrap")?;
        self.publish(Snapshot {
            state: ProviderState::Initializing,
            ..Snapshot::default()
        });

        let accelerated = runtime.load(Device::Accelerated).await;
        let loaded = match accelerated {
            Ok(()) => Ok(Device::Accelerated),
            Err(e) => {
                tracing::warn!(
                    "Accelerated load failed for provider {}, falling back to baseline: {}",
                    self.provider,
                    e
                );
                runtime.load(Device::Baseline).await.map(|()| Device::Baseline)
            }
        };

        match loaded {
            Ok(device) => self.publish(Snapshot {
                state: ProviderState::Ready,
                credential: None,
                device: Some(device),
            }),
            Err(e) => {
                tracing::error!(
                    "Failed to initialize provider {} on any device: {}",
                    self.provider,
                    e
                );
                self.publish(Snapshot {
                    state: ProviderState::Degraded,
                    ..Snapshot::default()
                });
            }
        }

        Ok(self.current_state())
    }

    /// Mark a credential as rejected by the provider.
    ///
    /// The session returns to [`ProviderState::Uninitialized`] only while
    /// `rejected` is still the active credential; a rejection that arrives
    /// after the credential was replaced is ignored. The stored entry is left
    /// untouched. Returns whether the session was reset.
    pub fn invalidate(&self, rejected: &Arc<Credential>) -> bool {
        let holds = |snapshot: &Snapshot| {
            snapshot.state == ProviderState::Ready
                && snapshot
                    .credential
                    .as_ref()
                    .is_some_and(|active| Arc::ptr_eq(active, rejected))
        };

        let previous = self.snapshot.rcu(|current| {
            if holds(current) {
                Arc::new(Snapshot::default())
            } else {
                Arc::clone(current)
            }
        });

        if !holds(&previous) {
            tracing::debug!(
                "Ignoring rejection of a credential no longer active for provider {}",
                self.provider
            );
            return false;
        }

        tracing::warn!("Credential for provider {} was rejected", self.provider);
        self.notify(previous.state);
        true
    }

    fn enter(&self, operation: &str) -> Result<InFlight<'_>, GenError> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| {
                GenError::busy(format!(
                    "{} rejected: another session update is in flight for provider {}",
                    operation, self.provider
                ))
            })?;
        Ok(InFlight(&self.in_flight))
    }

    fn publish(&self, next: Snapshot) {
        let previous = self.snapshot.load().state;
        if previous == ProviderState::Degraded && next.state != ProviderState::Degraded {
            return;
        }
        self.snapshot.store(Arc::new(next));
        self.notify(previous);
    }

    fn notify(&self, previous: ProviderState) {
        let state = self.current_state();
        self.state_tx.send_if_modified(|published| {
            if *published == state {
                return false;
            }
            tracing::info!("Provider {} state: {} -> {}", self.provider, previous, state);
            *published = state;
            true
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ProviderInfo, RawText, TextPayload};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Runtime whose load succeeds only on the listed devices
    #[derive(Debug)]
    struct ScriptedRuntime {
        working: Vec<Device>,
        attempts: Mutex<Vec<Device>>,
    }

    impl ScriptedRuntime {
        fn new(working: Vec<Device>) -> Self {
            Self {
                working,
                attempts: Mutex::new(Vec::new()),
            }
        }

        fn attempts(&self) -> Vec<Device> {
            self.attempts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TextGeneration for ScriptedRuntime {
        fn info(&self) -> Arc<ProviderInfo> {
            Arc::new(ProviderInfo {
                id: "scripted".to_string(),
                name: "Scripted".to_string(),
                model: "scripted".to_string(),
            })
        }

        async fn load(&self, device: Device) -> Result<(), GenError> {
            self.attempts.lock().unwrap().push(device);
            if self.working.contains(&device) {
                Ok(())
            } else {
                Err(GenError::not_initialized(format!("{} unavailable", device)))
            }
        }

        async fn generate_text(&self, _payload: TextPayload) -> Result<RawText, GenError> {
            Err(GenError::not_initialized("unused"))
        }
    }

    #[tokio::test]
    async fn test_configure_rejects_blank_credential() {
        let session = SessionManager::in_memory("runware");
        let err = session.configure("   ").await.unwrap_err();
        assert!(matches!(err, GenError::InvalidCredential(_)));
        assert_eq!(session.current_state(), ProviderState::Uninitialized);
        assert!(session.credential().is_none());
    }

    #[tokio::test]
    async fn test_configure_persists_and_restores() {
        let store: Arc<dyn CredentialStore> = Arc::new(MemoryStore::new());
        let session = SessionManager::new("runware", store.clone());
        let mut states = session.subscribe();

        let state = session.configure(" key-123 ").await.unwrap();
        assert_eq!(state, ProviderState::Ready);
        assert!(states.has_changed().unwrap());
        assert_eq!(*states.borrow_and_update(), ProviderState::Ready);

        let credential = session.credential().unwrap();
        assert_eq!(credential.value(), "key-123");
        assert!(credential.is_persisted());
        assert_eq!(
            store.get("runware-api-key").await.unwrap().as_deref(),
            Some("key-123")
        );

        let restored = SessionManager::new("runware", store);
        assert_eq!(restored.restore_from_storage().await, ProviderState::Ready);
        assert_eq!(restored.credential().unwrap().value(), "key-123");
    }

    #[tokio::test]
    async fn test_restore_without_entry_stays_uninitialized() {
        let session = SessionManager::in_memory("runware");
        assert_eq!(
            session.restore_from_storage().await,
            ProviderState::Uninitialized
        );
    }

    #[tokio::test]
    async fn test_invalidate_keeps_stored_entry() {
        let store: Arc<dyn CredentialStore> = Arc::new(MemoryStore::new());
        let session = SessionManager::new("runware", store.clone());
        session.configure("stale").await.unwrap();
        let mut states = session.subscribe();

        let rejected = session.credential().unwrap();
        assert!(session.invalidate(&rejected));
        assert_eq!(session.current_state(), ProviderState::Uninitialized);
        assert_eq!(*states.borrow_and_update(), ProviderState::Uninitialized);
        assert!(session.credential().is_none());
        assert!(store.get("runware-api-key").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_invalidate_ignores_replaced_credential() {
        let session = SessionManager::in_memory("runware");
        session.configure("old-key").await.unwrap();
        let old = session.credential().unwrap();

        session.configure("new-key").await.unwrap();
        assert!(!session.invalidate(&old));
        assert_eq!(session.current_state(), ProviderState::Ready);
        assert_eq!(session.credential().unwrap().value(), "new-key");

        // Same secret, different activation: still not the rejected one
        session.configure("old-key").await.unwrap();
        assert!(!session.invalidate(&old));
        assert_eq!(session.current_state(), ProviderState::Ready);
    }

    #[tokio::test]
    async fn test_configure_on_degraded_session_is_ignored() {
        let store: Arc<dyn CredentialStore> = Arc::new(MemoryStore::new());
        let session = SessionManager::new("local", store.clone());
        session.bootstrap(&ScriptedRuntime::new(vec![])).await.unwrap();

        assert_eq!(
            session.configure("key").await.unwrap(),
            ProviderState::Degraded
        );
        assert!(session.credential().is_none());
        assert!(store.get("local-api-key").await.unwrap().is_none());

        let err = session.configure("  ").await.unwrap_err();
        assert!(matches!(err, GenError::InvalidCredential(_)));
    }

    #[tokio::test]
    async fn test_bootstrap_prefers_accelerated() {
        let session = SessionManager::in_memory("local");
        let runtime = ScriptedRuntime::new(vec![Device::Accelerated, Device::Baseline]);

        let state = session.bootstrap(&runtime).await.unwrap();
        assert_eq!(state, ProviderState::Ready);
        assert_eq!(session.active_device(), Some(Device::Accelerated));
        assert_eq!(runtime.attempts(), vec![Device::Accelerated]);
    }

    #[tokio::test]
    async fn test_bootstrap_falls_back_to_baseline() {
        let session = SessionManager::in_memory("local");
        let runtime = ScriptedRuntime::new(vec![Device::Baseline]);

        let state = session.bootstrap(&runtime).await.unwrap();
        assert_eq!(state, ProviderState::Ready);
        assert_eq!(session.active_device(), Some(Device::Baseline));
        assert_eq!(
            runtime.attempts(),
            vec![Device::Accelerated, Device::Baseline]
        );

        // Already ready: no further load attempts
        session.bootstrap(&runtime).await.unwrap();
        assert_eq!(runtime.attempts().len(), 2);
    }

    #[tokio::test]
    async fn test_degraded_is_sticky() {
        let session = SessionManager::in_memory("local");
        let broken = ScriptedRuntime::new(vec![]);

        assert_eq!(
            session.bootstrap(&broken).await.unwrap(),
            ProviderState::Degraded
        );

        let healthy = ScriptedRuntime::new(vec![Device::Accelerated]);
        assert_eq!(
            session.bootstrap(&healthy).await.unwrap(),
            ProviderState::Degraded
        );
        assert!(healthy.attempts().is_empty());

        session.configure("key").await.unwrap();
        assert_eq!(session.current_state(), ProviderState::Degraded);
    }

    #[tokio::test]
    async fn test_reentrant_update_is_rejected() {
        let session = SessionManager::in_memory("runware");
        let guard = session.enter("test").unwrap();

        let err = session.configure("key").await.unwrap_err();
        assert!(matches!(err, GenError::Busy(_)));

        drop(guard);
        assert_eq!(
            session.configure("key").await.unwrap(),
            ProviderState::Ready
        );
    }
}
