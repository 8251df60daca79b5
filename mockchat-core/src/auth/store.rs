//! Mock session store backed by a key-value store

use super::model::{
    decode_registry, decode_session, encode_registry, encode_session, Identity, Session,
};
use crate::config::AuthConfig;
use crate::storage::KeyValueStore;
use crate::{Error, Result};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Storage key of the identity registry
pub const REGISTRY_KEY: &str = "users";
/// Storage key of the current session
pub const SESSION_KEY: &str = "user";

/// Holds the registered identities and at most one current session
///
/// Pass a handle to whatever needs it; there is no global instance.
pub struct SessionStore {
    storage: Arc<dyn KeyValueStore>,
    config: AuthConfig,
    /// Serializes registry read-modify-write cycles
    write_lock: Mutex<()>,
}

impl SessionStore {
    /// Create a store over `storage`
    pub fn new(storage: Arc<dyn KeyValueStore>, config: AuthConfig) -> Self {
        Self {
            storage,
            config,
            write_lock: Mutex::new(()),
        }
    }

    /// Register a new identity and sign it in
    pub async fn register(
        &self,
        display_name: impl Into<String>,
        email: impl Into<String>,
        secret: impl Into<String>,
    ) -> Result<Session> {
        let identity = Identity::new(display_name, email, secret);
        self.simulate_round_trip().await;

        let session = {
            let _guard = self.write_lock.lock();
            let mut users = self.load_registry()?;
            if users.iter().any(|u| u.email == identity.email) {
                info!("Registration rejected: {} already registered", identity.email);
                return Err(Error::AlreadyExists(identity.email));
            }

            let previous = self.storage.get(REGISTRY_KEY)?;
            let session = Session::from(&identity);
            users.push(identity);
            self.storage
                .set(REGISTRY_KEY, &encode_registry(&users)?)?;
            if let Err(e) = self.save_session(&session) {
                self.restore_registry(previous.as_deref());
                return Err(e);
            }
            session
        };

        info!("Registered and signed in {}", session.email);
        Ok(session)
    }

    /// Sign in with an exact email and secret match
    pub async fn authenticate(&self, email: &str, secret: &str) -> Result<Session> {
        self.simulate_round_trip().await;

        let users = self.load_registry()?;
        let Some(identity) = users.iter().find(|u| u.matches(email, secret)) else {
            info!("Authentication failed for {}", email);
            return Err(Error::InvalidCredentials);
        };

        let session = Session::from(identity);
        self.save_session(&session)?;
        info!("Signed in {}", session.email);
        Ok(session)
    }

    /// The persisted session, if any
    pub fn current_session(&self) -> Option<Session> {
        let raw = match self.storage.get(SESSION_KEY) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!("Failed to read session: {}", e);
                return None;
            }
        };

        match decode_session(SESSION_KEY, &raw) {
            Ok(session) => Some(session),
            Err(e) => {
                self.reset_key(SESSION_KEY, &e);
                None
            }
        }
    }

    /// Sign out. Calling this without a session does nothing.
    pub fn end_session(&self) -> Result<()> {
        if let Some(session) = self.current_session() {
            info!("Signed out {}", session.email);
        }
        self.storage.remove(SESSION_KEY)
    }

    /// Number of registered identities
    pub fn registered_count(&self) -> Result<usize> {
        Ok(self.load_registry()?.len())
    }

    async fn simulate_round_trip(&self) {
        let latency = self.config.latency();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }

    fn load_registry(&self) -> Result<Vec<Identity>> {
        let Some(raw) = self.storage.get(REGISTRY_KEY)? else {
            return Ok(Vec::new());
        };

        match decode_registry(REGISTRY_KEY, &raw) {
            Ok(users) => {
                debug!("Loaded {} registered identities", users.len());
                Ok(users)
            }
            Err(e @ Error::CorruptState { .. }) => {
                self.reset_key(REGISTRY_KEY, &e);
                // a session cannot outlive the registry it came from
                self.reset_key(SESSION_KEY, &e);
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    /// Put the registry back the way it was before a failed registration
    fn restore_registry(&self, previous: Option<&str>) {
        let restored = match previous {
            Some(raw) => self.storage.set(REGISTRY_KEY, raw),
            None => self.storage.remove(REGISTRY_KEY),
        };
        if let Err(e) = restored {
            warn!("Failed to restore '{}': {}", REGISTRY_KEY, e);
        }
    }

    fn save_session(&self, session: &Session) -> Result<()> {
        self.storage.set(SESSION_KEY, &encode_session(session)?)
    }

    /// Drop an undecodable value so the store starts over empty
    fn reset_key(&self, key: &str, cause: &Error) {
        warn!("Resetting '{}': {}", key, cause);
        if let Err(e) = self.storage.remove(key) {
            warn!("Failed to remove '{}': {}", key, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FileStore, MemoryStore};
    use std::time::Duration;
    use tempfile::TempDir;

    /// Accepts every write except to one key
    struct RefusingStore {
        inner: MemoryStore,
        refused: &'static str,
    }

    impl KeyValueStore for RefusingStore {
        fn get(&self, key: &str) -> Result<Option<String>> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<()> {
            if key == self.refused {
                return Err(Error::Internal("disk full".into()));
            }
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<()> {
            self.inner.remove(key)
        }
    }

    fn memory_store() -> (Arc<MemoryStore>, SessionStore) {
        let storage = Arc::new(MemoryStore::new());
        let store = SessionStore::new(storage.clone(), AuthConfig::default());
        (storage, store)
    }

    #[tokio::test]
    async fn test_register_then_authenticate() {
        let (_, store) = memory_store();

        let session = store.register("Ada", "ada@x.io", "pw1").await.unwrap();
        assert_eq!(session.display_name, "Ada");
        assert_eq!(store.current_session(), Some(session));

        let session = store.authenticate("ada@x.io", "pw1").await.unwrap();
        assert_eq!(session.display_name, "Ada");
        assert_eq!(session.email, "ada@x.io");
    }

    #[tokio::test]
    async fn test_wrong_secret_is_invalid_credentials() {
        let (_, store) = memory_store();
        store.register("Ada", "ada@x.io", "pw1").await.unwrap();
        store.end_session().unwrap();

        let err = store.authenticate("ada@x.io", "wrong").await.unwrap_err();
        assert!(matches!(err, Error::InvalidCredentials));
        assert_eq!(store.current_session(), None);
    }

    #[tokio::test]
    async fn test_authenticate_requires_exact_pair() {
        let (_, store) = memory_store();
        store.register("Ada", "ada@x.io", "pw1").await.unwrap();
        store.register("Bob", "bob@x.io", "pw2").await.unwrap();

        assert!(store.authenticate("bob@x.io", "pw2").await.is_ok());
        // secret of another identity
        assert!(store.authenticate("ada@x.io", "pw2").await.is_err());
        // no case folding
        assert!(store.authenticate("ADA@x.io", "pw1").await.is_err());
        assert!(store.authenticate("nobody@x.io", "pw1").await.is_err());
    }

    #[tokio::test]
    async fn test_duplicate_email_leaves_registry_unchanged() {
        let (storage, store) = memory_store();
        store.register("Ada", "ada@x.io", "pw1").await.unwrap();
        let before = storage.get(REGISTRY_KEY).unwrap();

        let err = store.register("Impostor", "ada@x.io", "other").await.unwrap_err();
        assert!(matches!(err, Error::AlreadyExists(ref email) if email == "ada@x.io"));
        assert_eq!(storage.get(REGISTRY_KEY).unwrap(), before);
        assert_eq!(store.registered_count().unwrap(), 1);
        assert_eq!(store.current_session().unwrap().display_name, "Ada");
    }

    #[tokio::test]
    async fn test_email_comparison_is_case_sensitive() {
        let (_, store) = memory_store();
        store.register("Ada", "ada@x.io", "pw1").await.unwrap();
        store.register("Ada Upper", "ADA@x.io", "pw1").await.unwrap();
        assert_eq!(store.registered_count().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_end_session_is_idempotent() {
        let (_, store) = memory_store();
        store.end_session().unwrap();

        store.register("Ada", "ada@x.io", "pw1").await.unwrap();
        store.end_session().unwrap();
        store.end_session().unwrap();
        assert_eq!(store.current_session(), None);

        // registry survives sign-out
        assert!(store.authenticate("ada@x.io", "pw1").await.is_ok());
    }

    #[tokio::test]
    async fn test_session_never_holds_secret() {
        let (storage, store) = memory_store();
        store.register("Ada", "ada@x.io", "pw1").await.unwrap();
        let raw = storage.get(SESSION_KEY).unwrap().unwrap();
        assert!(!raw.contains("pw1"));
    }

    #[tokio::test]
    async fn test_corrupt_registry_is_reset() {
        let (storage, store) = memory_store();
        storage.set(REGISTRY_KEY, "{{{ not json").unwrap();

        assert_eq!(store.registered_count().unwrap(), 0);
        assert_eq!(storage.get(REGISTRY_KEY).unwrap(), None);

        store.register("Ada", "ada@x.io", "pw1").await.unwrap();
        assert!(store.authenticate("ada@x.io", "pw1").await.is_ok());
    }

    #[tokio::test]
    async fn test_failed_session_write_rolls_back_registration() {
        let storage = Arc::new(RefusingStore {
            inner: MemoryStore::new(),
            refused: SESSION_KEY,
        });
        let store = SessionStore::new(storage.clone(), AuthConfig::default());

        let err = store.register("Ada", "ada@x.io", "pw1").await.unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
        assert_eq!(store.registered_count().unwrap(), 0);
        assert_eq!(storage.get(REGISTRY_KEY).unwrap(), None);

        // the same details are still free to register
        let err = store.register("Ada", "ada@x.io", "pw1").await.unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
    }

    #[tokio::test]
    async fn test_failed_session_write_keeps_earlier_identities() {
        let (storage, store) = memory_store();
        store.register("Ada", "ada@x.io", "pw1").await.unwrap();
        let before = storage.get(REGISTRY_KEY).unwrap();

        let refusing = Arc::new(RefusingStore {
            inner: MemoryStore::new(),
            refused: SESSION_KEY,
        });
        refusing
            .inner
            .set(REGISTRY_KEY, before.as_deref().unwrap())
            .unwrap();
        let store = SessionStore::new(refusing.clone(), AuthConfig::default());

        assert!(store.register("Bob", "bob@x.io", "pw2").await.is_err());
        assert_eq!(refusing.get(REGISTRY_KEY).unwrap(), before);
        assert_eq!(store.registered_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_registry_also_ends_session() {
        let (storage, store) = memory_store();
        store.register("Ada", "ada@x.io", "pw1").await.unwrap();
        storage.set(REGISTRY_KEY, "\"garbage\"").unwrap();

        assert_eq!(store.registered_count().unwrap(), 0);
        assert_eq!(store.current_session(), None);
        assert_eq!(crate::auth::route(&store), crate::auth::Route::Login);
    }

    #[tokio::test]
    async fn test_corrupt_session_reads_as_signed_out() {
        let (storage, store) = memory_store();
        storage.set(SESSION_KEY, "\"just a string\"").unwrap();

        assert_eq!(store.current_session(), None);
        assert_eq!(storage.get(SESSION_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn test_legacy_registry_is_upgraded_on_write() {
        let (storage, store) = memory_store();
        storage
            .set(
                REGISTRY_KEY,
                r#"[{"name":"Ada","email":"ada@x.io","password":"pw1"}]"#,
            )
            .unwrap();

        assert!(store.authenticate("ada@x.io", "pw1").await.is_ok());
        store.register("Bob", "bob@x.io", "pw2").await.unwrap();

        let raw = storage.get(REGISTRY_KEY).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["version"], 1);
        assert_eq!(value["users"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_state_survives_reopen_on_disk() {
        let temp_dir = TempDir::new().unwrap();
        let open = || {
            SessionStore::new(
                Arc::new(FileStore::new(temp_dir.path())),
                AuthConfig::default(),
            )
        };

        open().register("Ada", "ada@x.io", "pw1").await.unwrap();

        let reopened = open();
        assert_eq!(reopened.current_session().unwrap().email, "ada@x.io");
        reopened.end_session().unwrap();
        assert_eq!(open().current_session(), None);
        assert!(open().authenticate("ada@x.io", "pw1").await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency_is_simulated() {
        let storage = Arc::new(MemoryStore::new());
        let store = SessionStore::new(storage, AuthConfig { latency_ms: 250 });

        let start = tokio::time::Instant::now();
        store.register("Ada", "ada@x.io", "pw1").await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(250));
    }
}
