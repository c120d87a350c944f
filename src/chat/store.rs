use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use thiserror::Error;
use tokio::fs;

use super::Conversation;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("could not locate a data directory for conversations")]
    NoDataDir,
    #[error("no such conversation: {0}")]
    NotFound(String),
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// File-backed conversation store: one JSON document per conversation
/// under the user data directory.
pub struct ChatStore {
    dir: PathBuf,
}

impl ChatStore {
    /// Open the store at the default location
    /// (`<data_dir>/kaiwa/conversations`), creating it if needed.
    pub async fn open_default() -> Result<Self, StoreError> {
        let dir = dirs::data_dir()
            .ok_or(StoreError::NoDataDir)?
            .join("kaiwa")
            .join("conversations");
        Self::open(dir).await
    }

    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await.map_err(|source| StoreError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    /// Load every conversation, newest update first. Unreadable files are
    /// skipped with a warning so one corrupt entry never hides the rest.
    pub async fn list(&self) -> Result<Vec<Conversation>, StoreError> {
        let mut entries = fs::read_dir(&self.dir).await.map_err(|source| StoreError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let mut conversations = Vec::new();
        loop {
            let entry = entries.next_entry().await.map_err(|source| StoreError::Io {
                path: self.dir.clone(),
                source,
            })?;
            let Some(entry) = entry else { break };

            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            match Self::load_path(&path).await {
                Ok(conversation) => conversations.push(conversation),
                Err(e) => tracing::warn!("Skipping conversation file {}: {}", path.display(), e),
            }
        }

        conversations.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(conversations)
    }

    #[allow(dead_code)]
    pub async fn load(&self, id: &str) -> Result<Conversation, StoreError> {
        let path = self.path_for(id);
        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Self::load_path(&path).await
    }

    /// Create and persist a new conversation. The display name may be
    /// empty; the sidebar derives a title in that case.
    pub async fn create(&self, name: &str) -> Result<Conversation, StoreError> {
        let id = self.allocate_id().await;
        let conversation = Conversation::new(id, name.trim().to_string());
        self.save(&conversation).await?;
        Ok(conversation)
    }

    pub async fn save(&self, conversation: &Conversation) -> Result<(), StoreError> {
        let path = self.path_for(&conversation.id);
        let json = serde_json::to_string_pretty(conversation).map_err(|source| StoreError::Parse {
            path: path.clone(),
            source,
        })?;
        fs::write(&path, json)
            .await
            .map_err(|source| StoreError::Io { path, source })
    }

    pub async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let path = self.path_for(id);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(source) if source.kind() == io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(id.to_string()))
            }
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }

    async fn load_path(path: &Path) -> Result<Conversation, StoreError> {
        let json = fs::read_to_string(path).await.map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&json).map_err(|source| StoreError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Millisecond-stamped ids; bump until free in case two chats are
    /// created inside the same millisecond.
    async fn allocate_id(&self) -> String {
        let mut millis = Utc::now().timestamp_millis();
        loop {
            let id = format!("chat-{millis}");
            if !fs::try_exists(self.path_for(&id)).await.unwrap_or(false) {
                return id;
            }
            millis += 1;
        }
    }

    /// Ids map to file names; strip anything that is not a plain
    /// filename character so a caller-supplied id cannot leave the
    /// store directory.
    fn path_for(&self, id: &str) -> PathBuf {
        let safe: String = id
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
            .collect();
        self.dir.join(format!("{safe}.json"))
    }
}
