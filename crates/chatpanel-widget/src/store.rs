//! Local key/value store backing anonymous sessions.
//!
//! The browser's local storage becomes a small JSON file of string keys to
//! string values. Only the session key is ever written.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::warn;

use crate::WidgetError;

/// Key holding the anonymous session identifier.
pub const SESSION_STORAGE_KEY: &str = "trkChatSession";

/// Reserved for conversation history. Never written: history lives only in
/// memory and resets with each widget.
pub const HISTORY_STORAGE_KEY: &str = "trkChatHistory";

/// Store file format.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoreFile {
    version: u32,
    entries: HashMap<String, String>,
}

impl Default for StoreFile {
    fn default() -> Self {
        Self {
            version: 1,
            entries: HashMap::new(),
        }
    }
}

/// File-backed local storage.
#[derive(Debug)]
pub struct LocalStore {
    path: PathBuf,
    data: StoreFile,
}

impl LocalStore {
    /// Load the store from the default or specified path.
    ///
    /// If the file doesn't exist, starts empty.
    pub async fn load(path: Option<PathBuf>) -> Result<Self, WidgetError> {
        let path = path.unwrap_or_else(Self::default_path);
        let data = Self::read(&path).await?;
        Ok(Self { path, data })
    }

    /// Like [`LocalStore::load`], but a file that is not valid JSON is
    /// treated as empty. The next [`LocalStore::set`] overwrites it.
    pub async fn load_or_reset(path: Option<PathBuf>) -> Result<Self, WidgetError> {
        let path = path.unwrap_or_else(Self::default_path);
        let data = match Self::read(&path).await {
            Ok(data) => data,
            Err(WidgetError::Json(e)) => {
                warn!(error = %e, path = %path.display(), "local store is corrupt, starting empty");
                StoreFile::default()
            }
            Err(e) => return Err(e),
        };
        Ok(Self { path, data })
    }

    async fn read(path: &Path) -> Result<StoreFile, WidgetError> {
        if !fs::try_exists(path).await? {
            return Ok(StoreFile::default());
        }
        let content = fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Get the default store path.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("chatpanel")
            .join("storage.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.data.entries.get(key).map(|s| s.as_str())
    }

    /// Set a value and persist to disk.
    pub async fn set(&mut self, key: &str, value: &str) -> Result<(), WidgetError> {
        self.data
            .entries
            .insert(key.to_string(), value.to_string());
        self.save().await
    }

    /// Write a sibling `.tmp` file, then rename it over the store.
    async fn save(&self) -> Result<(), WidgetError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut tmp_name = self.path.file_name().unwrap_or_default().to_os_string();
        tmp_name.push(".tmp");
        let tmp_path = self.path.with_file_name(tmp_name);

        let content = serde_json::to_string_pretty(&self.data)?;
        let mut file = fs::File::create(&tmp_path).await?;
        file.write_all(content.as_bytes()).await?;
        file.sync_all().await?;
        drop(file);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            fs::set_permissions(&tmp_path, perms).await?;
        }

        fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }
}
