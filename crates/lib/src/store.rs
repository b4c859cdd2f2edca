//! Durable chat store: the whole session state in one JSON document on disk.
//!
//! The store is a best-effort mirror of in-memory state: callers log a
//! failed save and carry on; they never roll back. Malformed or missing data
//! reads as absent so startup can fall back to a fresh conversation.

use std::path::{Path, PathBuf};

use crate::chat::SessionState;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// File-backed store for [`SessionState`].
#[derive(Debug, Clone)]
pub struct ChatStore {
    path: PathBuf,
}

impl ChatStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the saved state. Missing file, unreadable file, malformed JSON,
    /// or an empty conversation list all come back as None.
    pub fn load(&self) -> Option<SessionState> {
        if !self.path.exists() {
            return None;
        }
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(s) => s,
            Err(e) => {
                log::warn!("failed to read chats from {}: {}", self.path.display(), e);
                return None;
            }
        };
        let state: SessionState = match serde_json::from_str(&raw) {
            Ok(s) => s,
            Err(e) => {
                log::warn!("malformed chats in {}: {}", self.path.display(), e);
                return None;
            }
        };
        if state.conversations.is_empty() {
            return None;
        }
        Some(state)
    }

    /// Rewrite the whole document. Creates parent directories on first save.
    pub fn save(&self, state: &SessionState) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(state)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}
