//! Token store: the single holder of persisted identity state
//!
//! Wraps a [`KeyValueStorage`] and owns the three identity keys (access
//! token, refresh token, cached user record). Reads and writes never fail
//! from the caller's point of view: a broken backend is logged and treated
//! as an absent value.

use crate::storage::KeyValueStorage;
use crate::types::{TokenPair, User};
use std::sync::Arc;
use tracing::warn;

const ACCESS_TOKEN_KEY: &str = "accessToken";
const REFRESH_TOKEN_KEY: &str = "refreshToken";
const USER_KEY: &str = "user";

/// Persisted access/refresh token and cached user holder
#[derive(Clone)]
pub struct TokenStore {
    storage: Arc<dyn KeyValueStorage>,
}

impl TokenStore {
    /// Create a store over the given storage backend
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self { storage }
    }

    /// Current access token, if one is stored
    pub fn access_token(&self) -> Option<String> {
        self.read(ACCESS_TOKEN_KEY)
    }

    /// Current refresh token, if one is stored
    pub fn refresh_token(&self) -> Option<String> {
        self.read(REFRESH_TOKEN_KEY)
    }

    /// Persist both tokens, overwriting any prior pair
    pub fn set_tokens(&self, pair: &TokenPair) {
        self.write(ACCESS_TOKEN_KEY, &pair.access_token);
        self.write(REFRESH_TOKEN_KEY, &pair.refresh_token);
    }

    /// Last cached user record, if one is stored and still parseable
    pub fn user(&self) -> Option<User> {
        let raw = self.read(USER_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(error) => {
                warn!(%error, "cached user record is not parseable");
                None
            }
        }
    }

    /// Cache the user record alongside the tokens
    pub fn set_user(&self, user: &User) {
        match serde_json::to_string(user) {
            Ok(raw) => self.write(USER_KEY, &raw),
            Err(error) => warn!(%error, "unable to serialize user record"),
        }
    }

    /// Remove all stored identity data (tokens and cached user)
    pub fn clear(&self) {
        for key in [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY] {
            if let Err(error) = self.storage.remove(key) {
                warn!(key, %error, "unable to clear stored value");
            }
        }
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.storage.get(key) {
            Ok(value) => value,
            Err(error) => {
                warn!(key, %error, "unable to read stored value");
                None
            }
        }
    }

    fn write(&self, key: &str, value: &str) {
        if let Err(error) = self.storage.set(key, value) {
            warn!(key, %error, "unable to persist value");
        }
    }
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore")
            .field("access_token", &self.access_token().is_some())
            .field("refresh_token", &self.refresh_token().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::mock::MockStorage;
    use crate::storage::{MemoryStorage, StorageError};

    fn store() -> TokenStore {
        TokenStore::new(Arc::new(MemoryStorage::new()))
    }

    fn sample_user() -> User {
        User {
            id: 1,
            username: "emilys".into(),
            email: "emily@example.com".into(),
            first_name: "Emily".into(),
            last_name: "Johnson".into(),
            gender: "female".into(),
            image: String::new(),
        }
    }

    #[test]
    fn set_tokens_overwrites_prior_pair() {
        let store = store();
        assert!(store.access_token().is_none());

        store.set_tokens(&TokenPair {
            access_token: "a1".into(),
            refresh_token: "r1".into(),
        });
        store.set_tokens(&TokenPair {
            access_token: "a2".into(),
            refresh_token: "r2".into(),
        });

        assert_eq!(store.access_token().as_deref(), Some("a2"));
        assert_eq!(store.refresh_token().as_deref(), Some("r2"));
    }

    #[test]
    fn clear_removes_tokens_and_user() {
        let store = store();
        store.set_tokens(&TokenPair {
            access_token: "a".into(),
            refresh_token: "r".into(),
        });
        store.set_user(&sample_user());

        store.clear();

        assert!(store.access_token().is_none());
        assert!(store.refresh_token().is_none());
        assert!(store.user().is_none());
    }

    #[test]
    fn user_record_round_trips() {
        let store = store();
        let user = sample_user();
        store.set_user(&user);
        assert_eq!(store.user(), Some(user));
    }

    #[test]
    fn broken_backend_degrades_to_absence() {
        let mut storage = MockStorage::new();
        storage
            .expect_get()
            .returning(|_| Err(StorageError::Unavailable("disk on fire".into())));
        storage
            .expect_set()
            .returning(|_, _| Err(StorageError::Unavailable("disk on fire".into())));
        storage
            .expect_remove()
            .returning(|_| Err(StorageError::Unavailable("disk on fire".into())));

        let store = TokenStore::new(Arc::new(storage));

        // None of these may panic or propagate the storage failure.
        store.set_tokens(&TokenPair {
            access_token: "a".into(),
            refresh_token: "r".into(),
        });
        assert!(store.access_token().is_none());
        assert!(store.refresh_token().is_none());
        assert!(store.user().is_none());
        store.clear();
    }

    #[test]
    fn corrupt_user_blob_reads_as_absent() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set("user", "{not json").unwrap();
        let store = TokenStore::new(storage);
        assert!(store.user().is_none());
    }
}
