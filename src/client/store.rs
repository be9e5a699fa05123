//! Durable storage for the client-side token pair.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::warn;

/// The token pair plus the absolute access-token expiry, as kept on the
/// client. `expires_at` is unix seconds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: i64,
}

/// Where the client persists its tokens between runs. Implementations are
/// best-effort: a failed write must not break the session that produced it.
pub trait TokenStore: Send + Sync {
    fn load(&self) -> Option<StoredTokens>;
    fn save(&self, tokens: &StoredTokens);
    fn clear(&self);
}

/// JSON file store, the desktop analogue of browser local storage.
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Option<StoredTokens> {
        let contents = std::fs::read_to_string(&self.path).ok()?;
        serde_json::from_str(&contents).ok()
    }

    fn save(&self, tokens: &StoredTokens) {
        let serialized = match serde_json::to_string(tokens) {
            Ok(serialized) => serialized,
            Err(err) => {
                warn!("Failed to serialize tokens: {err}");
                return;
            }
        };
        if let Err(err) = std::fs::write(&self.path, serialized) {
            warn!("Failed to persist tokens to {}: {err}", self.path.display());
        }
    }

    fn clear(&self) {
        if let Err(err) = std::fs::remove_file(&self.path) {
            if err.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to remove token file {}: {err}", self.path.display());
            }
        }
    }
}

/// In-memory store for tests and short-lived tools.
#[derive(Default)]
pub struct MemoryTokenStore {
    tokens: Mutex<Option<StoredTokens>>,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Option<StoredTokens> {
        self.tokens.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn save(&self, tokens: &StoredTokens) {
        *self.tokens.lock().unwrap_or_else(|e| e.into_inner()) = Some(tokens.clone());
    }

    fn clear(&self) {
        *self.tokens.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> StoredTokens {
        StoredTokens {
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            expires_at: 1_700_000_000,
        }
    }

    #[test]
    fn memory_store_round_trips() {
        let store = MemoryTokenStore::new();
        assert!(store.load().is_none());

        store.save(&sample());
        assert_eq!(store.load(), Some(sample()));

        store.clear();
        assert!(store.load().is_none());
    }

    #[test]
    fn file_store_round_trips() {
        let path = std::env::temp_dir().join(format!("orbit-auth-test-{}.json", std::process::id()));
        let store = FileTokenStore::new(path.clone());

        store.save(&sample());
        assert_eq!(store.load(), Some(sample()));

        store.clear();
        assert!(store.load().is_none());
        assert!(!path.exists());
    }

    #[test]
    fn file_store_ignores_corrupt_contents() {
        let path =
            std::env::temp_dir().join(format!("orbit-auth-corrupt-{}.json", std::process::id()));
        std::fs::write(&path, "not json").expect("write corrupt file");

        let store = FileTokenStore::new(path.clone());
        assert!(store.load().is_none());

        store.clear();
    }
}
