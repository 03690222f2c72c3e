//! TokenStore trait — where the session token survives process restarts.
//!
//! Exactly one opaque token is persisted under a fixed key. Calls are
//! synchronous so logout can reset everything without yielding.
//!
//! Implementations: in-memory (tests, ephemeral sessions) and file-backed.

use crate::error::StoreError;

pub trait TokenStore: Send + Sync {
    /// The store name (e.g., "memory", "file").
    fn name(&self) -> &str;

    /// Read the persisted token, if any.
    fn load(&self) -> Result<Option<String>, StoreError>;

    /// Persist a token, replacing any previous one.
    fn save(&self, token: &str) -> Result<(), StoreError>;

    /// Remove the persisted token. Clearing an empty store is not an error.
    fn clear(&self) -> Result<(), StoreError>;
}
