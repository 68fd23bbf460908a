//! Session history persistence

use super::key::{SessionKey, SESSION_EXTENSION};
use super::message::Message;
use crate::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Storage for session transcripts, one full message array per key
pub trait HistoryStore: Send + Sync {
    /// Keys of all persisted sessions, in storage order
    fn list(&self) -> Result<Vec<SessionKey>>;

    /// Load the full history of a persisted session
    fn load(&self, key: &SessionKey) -> Result<Vec<Message>>;

    /// Replace the stored history of `key` with `messages`
    fn save(&self, key: &SessionKey, messages: &[Message]) -> Result<()>;

    /// Whether a session with this key is already stored
    fn exists(&self, key: &SessionKey) -> bool;
}

/// Stores each session as `<chat_history_path>/<key>` holding a JSON array
#[derive(Debug, Clone)]
pub struct JsonDirStore {
    dir: PathBuf,
}

impl JsonDirStore {
    /// Create a store rooted at the chat history directory
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &SessionKey) -> Result<PathBuf> {
        key.file_name()
            .map(|name| self.dir.join(name))
            .ok_or_else(|| {
                Error::Validation("the new_session sentinel has no backing file".to_string())
            })
    }
}

impl HistoryStore for JsonDirStore {
    fn list(&self) -> Result<Vec<SessionKey>> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut keys = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if !name.ends_with(SESSION_EXTENSION) {
                continue;
            }
            match SessionKey::parse(&name) {
                Ok(key) => keys.push(key),
                Err(e) => warn!("Skipping unusable session file {}: {}", name, e),
            }
        }
        Ok(keys)
    }

    fn load(&self, key: &SessionKey) -> Result<Vec<Message>> {
        let path = self.path_for(key)?;
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::NotFound(format!("session {}", key)));
            }
            Err(e) => return Err(e.into()),
        };

        let messages: Vec<Message> =
            serde_json::from_str(&content).map_err(|e| Error::Parse {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        debug!("Loaded {} messages from {}", messages.len(), path.display());
        Ok(messages)
    }

    fn save(&self, key: &SessionKey, messages: &[Message]) -> Result<()> {
        let path = self.path_for(key)?;
        std::fs::create_dir_all(&self.dir)?;
        let content = serde_json::to_string_pretty(messages).map_err(|e| Error::Parse {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        std::fs::write(&path, content)?;
        debug!("Saved {} messages to {}", messages.len(), path.display());
        Ok(())
    }

    fn exists(&self, key: &SessionKey) -> bool {
        self.path_for(key).map(|p| p.exists()).unwrap_or(false)
    }
}
