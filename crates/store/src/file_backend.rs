//! File-based token store — one small JSON document on disk.
//!
//! Storage location: `~/.mlstudio/session.json` unless configured otherwise
//!
//! ```json
//! { "token": "<opaque>", "saved_at": "2025-03-01T10:15:30Z" }
//! ```
//!
//! The token survives restarts until an explicit logout or a failed
//! hydration clears it. On unix the file is owner-only (0600).

use chrono::{DateTime, Utc};
use mlstudio_core::error::StoreError;
use mlstudio_core::token::TokenStore;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Serialize, Deserialize)]
struct TokenRecord {
    token: String,
    saved_at: DateTime<Utc>,
}

/// A token store backed by a JSON file.
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    /// Create a store at the given path. The file is created on first save.
    pub fn new(path: PathBuf) -> Self {
        debug!(path = %path.display(), "File token store opened");
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn name(&self) -> &str {
        "file"
    }

    fn load(&self) -> Result<Option<String>, StoreError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StoreError::Storage(format!(
                    "Failed to read {}: {e}",
                    self.path.display()
                )));
            }
        };

        if content.trim().is_empty() {
            return Ok(None);
        }

        let record: TokenRecord = serde_json::from_str(&content).map_err(|e| {
            warn!(path = %self.path.display(), error = %e, "Corrupted token file");
            StoreError::Corrupted(e.to_string())
        })?;

        debug!(saved_at = %record.saved_at, "Loaded persisted token");
        Ok(Some(record.token))
    }

    fn save(&self, token: &str) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Storage(format!("Failed to create token directory: {e}"))
            })?;
        }

        let record = TokenRecord {
            token: token.to_string(),
            saved_at: Utc::now(),
        };
        let content = serde_json::to_string_pretty(&record)
            .map_err(|e| StoreError::Storage(format!("Failed to serialize token: {e}")))?;

        write_private(&self.path, content.as_bytes())
            .map_err(|e| StoreError::Storage(format!("Failed to write token file: {e}")))?;

        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Storage(format!(
                "Failed to remove token file: {e}"
            ))),
        }
    }
}

/// Write `content`, readable by the owner only on unix.
fn write_private(path: &Path, content: &[u8]) -> std::io::Result<()> {
    use std::io::Write;

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    std::os::unix::fs::OpenOptionsExt::mode(&mut options, 0o600);

    let mut file = options.open(path)?;
    // `mode` only applies when the file is created
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }
    file.write_all(content)
}
