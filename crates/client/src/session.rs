//! Session state and cached credentials
//!
//! One `SessionState` per client holds the backend session id and the
//! cached token. The token is persisted through a `TokenStore` so a later
//! run can resume without logging in again.

use airshipui_common::{now_millis, Error, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Persisted credentials. `date` is the expiry in epoch millis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedToken {
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub date: i64,
}

impl CachedToken {
    pub fn is_valid_at(&self, now_ms: i64) -> bool {
        !self.token.is_empty() && self.date > now_ms
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(now_millis())
    }
}

/// Storage for the cached token
pub trait TokenStore: Send + Sync {
    fn load(&self) -> Result<Option<CachedToken>>;
    fn save(&self, token: &CachedToken) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// JSON file token store
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<CachedToken>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)?;
        match serde_json::from_str(&content) {
            Ok(token) => Ok(Some(token)),
            Err(e) => {
                warn!("Ignoring unreadable token cache {}: {}", self.path.display(), e);
                Ok(None)
            }
        }
    }

    fn save(&self, token: &CachedToken) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string(token)?;
        std::fs::write(&self.path, content)
            .map_err(|e| Error::TokenStore(format!("{}: {}", self.path.display(), e)))
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::TokenStore(format!("{}: {}", self.path.display(), e))),
        }
    }
}

/// In-memory token store
#[derive(Default)]
pub struct MemoryTokenStore {
    token: RwLock<Option<CachedToken>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: CachedToken) -> Self {
        Self {
            token: RwLock::new(Some(token)),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<CachedToken>> {
        Ok(self.token.read().clone())
    }

    fn save(&self, token: &CachedToken) -> Result<()> {
        *self.token.write() = Some(token.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.token.write() = None;
        Ok(())
    }
}

#[derive(Default)]
struct Inner {
    session_id: Option<String>,
    token: Option<CachedToken>,
}

/// Session id and credentials shared by the transport and the auth guard
pub struct SessionState {
    store: Arc<dyn TokenStore>,
    inner: RwLock<Inner>,
}

impl SessionState {
    /// Build the session, loading any cached token from `store`.
    pub fn init(store: Arc<dyn TokenStore>) -> Result<Arc<Self>> {
        let token = store.load()?;
        debug!("Session initialised, cached token present: {}", token.is_some());
        Ok(Arc::new(Self {
            store,
            inner: RwLock::new(Inner {
                session_id: None,
                token,
            }),
        }))
    }

    /// Forget in-memory state. The persisted token is left for the next run.
    pub fn teardown(&self) {
        let mut inner = self.inner.write();
        inner.session_id = None;
        inner.token = None;
    }

    pub fn session_id(&self) -> Option<String> {
        self.inner.read().session_id.clone()
    }

    pub fn set_session_id(&self, id: impl Into<String>) {
        self.inner.write().session_id = Some(id.into());
    }

    pub fn token(&self) -> Option<CachedToken> {
        self.inner.read().token.clone()
    }

    /// Bearer token to stamp on outgoing envelopes
    pub fn bearer(&self) -> Option<String> {
        self.inner.read().token.as_ref().map(|t| t.token.clone())
    }

    pub fn is_authenticated_at(&self, now_ms: i64) -> bool {
        self.inner
            .read()
            .token
            .as_ref()
            .is_some_and(|t| t.is_valid_at(now_ms))
    }

    /// Store a freshly approved token valid for `ttl_secs`.
    pub fn store_token(
        &self,
        token: impl Into<String>,
        refresh_token: Option<String>,
        ttl_secs: i64,
    ) -> Result<CachedToken> {
        let cached = CachedToken {
            token: token.into(),
            refresh_token,
            date: now_millis() + ttl_secs * 1000,
        };
        self.inner.write().token = Some(cached.clone());
        self.store.save(&cached)?;
        Ok(cached)
    }

    /// Replace only the refresh token. No-op without a cached token.
    pub fn update_refresh_token(&self, refresh_token: impl Into<String>) -> Result<()> {
        let updated = {
            let mut inner = self.inner.write();
            match inner.token.as_mut() {
                Some(token) => {
                    token.refresh_token = Some(refresh_token.into());
                    Some(token.clone())
                }
                None => None,
            }
        };
        match updated {
            Some(token) => self.store.save(&token),
            None => Ok(()),
        }
    }

    /// Drop the cached token in memory and in the store.
    pub fn clear_token(&self) -> Result<()> {
        self.inner.write().token = None;
        self.store.clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_store_round_trip_and_wire_shape() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("state/token.json"));
        assert!(store.load().unwrap().is_none());

        let token = CachedToken {
            token: "abc".to_string(),
            refresh_token: Some("r1".to_string()),
            date: 42,
        };
        store.save(&token).unwrap();
        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(raw, r#"{"token":"abc","refreshToken":"r1","date":42}"#);
        assert_eq!(store.load().unwrap(), Some(token));

        store.clear().unwrap();
        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_corrupt_cache_reads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(FileTokenStore::new(path).load().unwrap().is_none());
    }

    #[test]
    fn test_session_token_lifecycle() {
        let store = Arc::new(MemoryTokenStore::new());
        let session = SessionState::init(store.clone()).unwrap();
        assert!(!session.is_authenticated_at(now_millis()));

        // refresh without a token does nothing
        session.update_refresh_token("early").unwrap();
        assert!(session.token().is_none());

        session.store_token("t1", None, 3600).unwrap();
        assert!(session.is_authenticated_at(now_millis()));
        assert_eq!(session.bearer().as_deref(), Some("t1"));

        session.update_refresh_token("r2").unwrap();
        let persisted = store.load().unwrap().unwrap();
        assert_eq!(persisted.token, "t1");
        assert_eq!(persisted.refresh_token.as_deref(), Some("r2"));

        session.set_session_id("s-1");
        session.teardown();
        assert!(session.session_id().is_none());
        assert!(session.token().is_none());
        assert!(store.load().unwrap().is_some());

        session.clear_token().unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_expired_token_is_not_valid() {
        let token = CachedToken {
            token: "t".to_string(),
            refresh_token: None,
            date: 1_000,
        };
        assert!(token.is_valid_at(999));
        assert!(!token.is_valid_at(1_000));
        assert!(!token.is_valid_at(5_000));
    }
}
