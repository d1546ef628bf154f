// --- File: crates/bookify_api/src/session.rs ---
//! Session context: the bearer token, where it is persisted, and who gets told
//! when it changes.
//!
//! The token is the only process-wide piece of client state. It is read as a
//! snapshot for every request, so a sign-out takes effect on the next call.

use bookify_common::BookifyError;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Durable storage for one token string under a fixed key.
pub trait TokenStore: Send + Sync {
    fn load(&self) -> Result<Option<String>, BookifyError>;
    fn save(&self, token: &str) -> Result<(), BookifyError>;
    fn clear(&self) -> Result<(), BookifyError>;
}

/// Keeps the token in a small JSON object on disk, `{"<key>": "<token>"}`.
///
/// Other keys in the same file are preserved.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
    key: String,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>, key: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            key: key.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> Result<Map<String, Value>, BookifyError> {
        if !self.path.exists() {
            return Ok(Map::new());
        }
        let raw = fs::read_to_string(&self.path)?;
        if raw.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str::<Value>(&raw)? {
            Value::Object(entries) => Ok(entries),
            _ => Err(BookifyError::Storage(format!(
                "token file {} does not contain a JSON object",
                self.path.display()
            ))),
        }
    }

    fn write_entries(&self, entries: &Map<String, Value>) -> Result<(), BookifyError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let serialized = serde_json::to_string_pretty(entries)?;
        fs::write(&self.path, serialized)?;
        Ok(())
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<String>, BookifyError> {
        let entries = self.read_entries()?;
        Ok(entries
            .get(&self.key)
            .and_then(Value::as_str)
            .filter(|token| !token.is_empty())
            .map(str::to_string))
    }

    fn save(&self, token: &str) -> Result<(), BookifyError> {
        let mut entries = self.read_entries()?;
        entries.insert(self.key.clone(), Value::String(token.to_string()));
        self.write_entries(&entries)
    }

    fn clear(&self) -> Result<(), BookifyError> {
        let mut entries = self.read_entries()?;
        if entries.remove(&self.key).is_none() {
            return Ok(());
        }
        if entries.is_empty() {
            fs::remove_file(&self.path)?;
            return Ok(());
        }
        self.write_entries(&entries)
    }
}

/// Non-durable store for tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<String>, BookifyError> {
        Ok(self.token.lock().unwrap_or_else(|p| p.into_inner()).clone())
    }

    fn save(&self, token: &str) -> Result<(), BookifyError> {
        *self.token.lock().unwrap_or_else(|p| p.into_inner()) = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), BookifyError> {
        *self.token.lock().unwrap_or_else(|p| p.into_inner()) = None;
        Ok(())
    }
}

/// Transitions of the session, broadcast to every subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn,
    /// The user logged out on purpose.
    SignedOut,
    /// The server rejected the stored token; view-state should be dropped.
    Invalidated,
}

const EVENT_CAPACITY: usize = 16;

pub struct Session {
    token: RwLock<Option<String>>,
    store: Arc<dyn TokenStore>,
    events: broadcast::Sender<SessionEvent>,
}

impl Session {
    /// Opens a session, restoring any token the store already holds.
    pub fn new(store: Arc<dyn TokenStore>) -> Result<Self, BookifyError> {
        let token = store.load()?;
        if token.is_some() {
            debug!("Restored stored session token");
        }
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(Self {
            token: RwLock::new(token),
            store,
            events,
        })
    }

    pub fn in_memory() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            token: RwLock::new(None),
            store: Arc::new(MemoryTokenStore::default()),
            events,
        }
    }

    /// Snapshot of the current token.
    pub fn token(&self) -> Option<String> {
        self.token.read().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn is_signed_in(&self) -> bool {
        self.token.read().unwrap_or_else(|p| p.into_inner()).is_some()
    }

    /// Persists a freshly issued token and announces the sign-in.
    pub fn set(&self, token: impl Into<String>) -> Result<(), BookifyError> {
        let token = token.into();
        self.store.save(&token)?;
        *self.token.write().unwrap_or_else(|p| p.into_inner()) = Some(token);
        info!("Session token stored");
        self.publish(SessionEvent::SignedIn);
        Ok(())
    }

    /// Drops the token after a deliberate logout.
    pub fn clear(&self) -> Result<(), BookifyError> {
        self.drop_token()?;
        self.publish(SessionEvent::SignedOut);
        Ok(())
    }

    /// Drops a token the server no longer accepts.
    pub fn invalidate(&self) -> Result<(), BookifyError> {
        self.drop_token()?;
        warn!("Session token invalidated");
        self.publish(SessionEvent::Invalidated);
        Ok(())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    fn drop_token(&self) -> Result<(), BookifyError> {
        // Memory first: the token must be gone for the next request even if the store fails.
        *self.token.write().unwrap_or_else(|p| p.into_inner()) = None;
        self.store.clear()
    }

    fn publish(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("signed_in", &self.is_signed_in())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn file_store_keeps_token_under_the_configured_key() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        let store = FileTokenStore::new(&path, "authToken");

        assert_eq!(store.load().unwrap(), None);
        store.save("abc123").unwrap();
        assert_eq!(store.load().unwrap(), Some("abc123".to_string()));

        let on_disk: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk["authToken"], "abc123");

        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
        assert!(!path.exists());
    }

    #[test]
    fn file_store_preserves_unrelated_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, r#"{"theme":"dark"}"#).unwrap();
        let store = FileTokenStore::new(&path, "authToken");

        store.save("t").unwrap();
        store.clear().unwrap();

        let on_disk: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk["theme"], "dark");
        assert!(on_disk.get("authToken").is_none());
    }

    #[test]
    fn corrupt_token_file_is_a_storage_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "[1,2,3]").unwrap();

        let err = FileTokenStore::new(&path, "authToken").load().unwrap_err();
        assert!(matches!(err, BookifyError::Storage(_)));
    }

    #[test]
    fn session_restores_token_from_store() {
        let session = Session::new(Arc::new(MemoryTokenStore::with_token("saved"))).unwrap();
        assert_eq!(session.token().as_deref(), Some("saved"));
        assert!(session.is_signed_in());
    }

    #[tokio::test]
    async fn session_broadcasts_transitions() {
        let session = Session::in_memory();
        let mut events = session.subscribe();

        session.set("fresh").unwrap();
        session.clear().unwrap();
        session.set("again").unwrap();
        session.invalidate().unwrap();

        assert_eq!(events.recv().await.unwrap(), SessionEvent::SignedIn);
        assert_eq!(events.recv().await.unwrap(), SessionEvent::SignedOut);
        assert_eq!(events.recv().await.unwrap(), SessionEvent::SignedIn);
        assert_eq!(events.recv().await.unwrap(), SessionEvent::Invalidated);
        assert!(!session.is_signed_in());
    }
}
