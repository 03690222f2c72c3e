//! In-memory token store — useful for testing and ephemeral sessions.

use mlstudio_core::error::StoreError;
use mlstudio_core::token::TokenStore;
use std::sync::Mutex;

/// Holds the token in process memory only; lost on exit.
pub struct InMemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self {
            token: Mutex::new(None),
        }
    }

    /// Start with a token already persisted (simulates a previous run).
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Option<String>>, StoreError> {
        self.token
            .lock()
            .map_err(|_| StoreError::Storage("token lock poisoned".into()))
    }
}

impl Default for InMemoryTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenStore for InMemoryTokenStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn load(&self) -> Result<Option<String>, StoreError> {
        Ok(self.lock()?.clone())
    }

    fn save(&self, token: &str) -> Result<(), StoreError> {
        *self.lock()? = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        *self.lock()? = None;
        Ok(())
    }
}
